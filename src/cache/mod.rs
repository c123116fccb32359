//! Generic request cache for endpoint responses.
//!
//! This module provides a transport-agnostic caching mechanism that:
//! - Derives deterministic keys from an endpoint and its params
//! - Serves repeated requests from an in-memory store (read-through)
//! - Patches cached listings in place when a mutation is reported
//! - Tracks whether any request is in flight
//!
//! Nothing expires on its own; entries leave the store only through the
//! clearing operations.

mod invalidate;
mod key;
mod layer;
mod loading;
mod result;
mod storage;

pub use invalidate::{ApprovalChange, InvalidationReport, MutationEvent};
pub use key::cache_key;
pub use layer::CacheLayer;
pub use result::{CacheResult, CacheSource};
pub use storage::{CacheStorage, MemoryStorage, NoopStorage};
