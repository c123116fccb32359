//! Cache layer that orchestrates caching logic with transport calls.

use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::invalidate::{invalidate, InvalidationReport, MutationEvent};
use super::key::{cache_key, encode_params};
use super::loading::RequestTracker;
use super::result::CacheResult;
use super::storage::{CacheStorage, CachedEntry, NoopStorage};
use crate::api::endpoint::RegisteredEndpoint;
use crate::api::transport::Transport;

/// Cache layer that manages caching logic and transport calls.
///
/// The store is handed in by whoever owns it and may be shared with other
/// layers. Every request goes through the layer's [`RequestTracker`], which
/// backs [`CacheLayer::loading`].
#[derive(Clone)]
pub struct CacheLayer {
  transport: Arc<dyn Transport>,
  storage: Arc<dyn CacheStorage>,
  tracker: RequestTracker,
}

impl CacheLayer {
  /// Create a new cache layer over the given transport and store.
  pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      transport,
      storage,
      tracker: RequestTracker::new(),
    }
  }

  /// Create a cache layer with no store; every fetch goes to the transport.
  pub fn without_store(transport: Arc<dyn Transport>) -> Self {
    Self::new(transport, Arc::new(NoopStorage))
  }

  /// Whether any request issued through this layer is in flight.
  pub fn loading(&self) -> bool {
    self.tracker.loading()
  }

  pub fn is_cache_enabled(&self) -> bool {
    self.storage.is_enabled()
  }

  /// Read-through fetch that also reports where the data came from.
  ///
  /// 1. Derive the cache key from endpoint and params
  /// 2. On hit, decode the stored payload without touching the transport
  /// 3. On miss, call the transport, decode the payload, then store it
  ///
  /// Concurrent misses for the same key are not deduplicated: each one reaches
  /// the transport and the last write wins.
  pub async fn fetch<D, P>(
    &self,
    endpoint: RegisteredEndpoint,
    params: Option<&P>,
  ) -> Result<CacheResult<D>>
  where
    D: DeserializeOwned,
    P: Serialize + ?Sized,
  {
    self
      .tracker
      .wrap(async {
        let params = encode_params(params)?;
        let key = cache_key(endpoint, params.as_ref());
        self.read_through(endpoint, &key, params.as_ref()).await
      })
      .await
  }

  async fn read_through<D: DeserializeOwned>(
    &self,
    endpoint: RegisteredEndpoint,
    key: &str,
    params: Option<&Value>,
  ) -> Result<CacheResult<D>> {
    if let Some(cached) = self.storage.get(key)? {
      tracing::debug!(%key, "cache hit");
      let data = decode(key, cached.payload)?;
      return Ok(CacheResult::from_cache(data, cached.cached_at));
    }

    tracing::debug!(%key, "cache miss");
    let payload = self.transport.fetch(endpoint, params).await?;
    let data = decode(key, payload.clone())?;
    self.storage.set(key, CachedEntry::new(payload))?;

    Ok(CacheResult::from_network(data))
  }

  /// Read-through fetch returning only the data.
  pub async fn fetch_with_cache<D, P>(
    &self,
    endpoint: RegisteredEndpoint,
    params: Option<&P>,
  ) -> Result<D>
  where
    D: DeserializeOwned,
    P: Serialize + ?Sized,
  {
    Ok(self.fetch(endpoint, params).await?.data)
  }

  /// Always call the transport. The store is neither read nor written.
  pub async fn fetch_without_cache<D, P>(
    &self,
    endpoint: RegisteredEndpoint,
    params: Option<&P>,
  ) -> Result<D>
  where
    D: DeserializeOwned,
    P: Serialize + ?Sized,
  {
    self
      .tracker
      .wrap(async {
        let params = encode_params(params)?;
        let payload = self.transport.fetch(endpoint, params.as_ref()).await?;
        decode(endpoint.as_str(), payload)
      })
      .await
  }

  /// Patch cached copies of the record changed by a mutation on `endpoint`.
  pub fn update_cache_when_checked(
    &self,
    endpoint: RegisteredEndpoint,
    event: &MutationEvent,
  ) -> Result<InvalidationReport> {
    invalidate(self.storage.as_ref(), endpoint, event)
  }

  /// Drop every cached entry.
  pub fn clear_cache(&self) -> Result<()> {
    if !self.storage.is_enabled() {
      return Ok(());
    }

    self.storage.clear()?;
    tracing::info!("cache cleared");
    Ok(())
  }

  /// Drop every entry whose key starts with one of the endpoint names.
  ///
  /// This is a raw prefix match, so an endpoint whose name is a prefix of
  /// another endpoint's name also clears the longer one.
  pub fn clear_cache_by_endpoint(&self, endpoints: &[RegisteredEndpoint]) -> Result<usize> {
    let prefixes: Vec<&str> = endpoints.iter().map(|e| e.as_str()).collect();
    self.clear_cache_by_prefixes(&prefixes)
  }

  /// Drop every entry whose key starts with any of `prefixes`.
  pub fn clear_cache_by_prefixes(&self, prefixes: &[&str]) -> Result<usize> {
    if !self.storage.is_enabled() {
      return Ok(0);
    }

    let removed = self
      .storage
      .remove_where(&|key| prefixes.iter().any(|prefix| key.starts_with(*prefix)))?;

    tracing::info!(?prefixes, removed, "cleared cache entries by prefix");
    Ok(removed)
  }

  /// Keys currently held by the store.
  pub fn cache_keys(&self) -> Result<Vec<String>> {
    self.storage.keys()
  }
}

fn decode<D: DeserializeOwned>(key: &str, payload: Value) -> Result<D> {
  serde_json::from_value(payload).map_err(|e| eyre!("Failed to decode response for {}: {}", key, e))
}
