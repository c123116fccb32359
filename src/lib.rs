//! Read-through request cache with mutation-driven invalidation.
//!
//! [`cache::CacheLayer`] sits between callers and a [`api::transport::Transport`].
//! Repeated requests are served from an in-memory store, mutations patch the
//! cached listings that embed the changed record, and clearing operations drop
//! entries wholesale or by endpoint.

pub mod api;
pub mod app;
pub mod cache;
pub mod commands;
pub mod config;
pub mod logging;
