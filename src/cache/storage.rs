//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// A single cached response.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry {
  /// The response payload as returned by the transport
  pub payload: Value,
  /// When the payload was first stored
  pub cached_at: DateTime<Utc>,
}

impl CachedEntry {
  pub fn new(payload: Value) -> Self {
    Self {
      payload,
      cached_at: Utc::now(),
    }
  }
}

/// Trait for cache storage backends.
///
/// The store is shared between the cache layer and whoever owns it, so every
/// method takes `&self` and implementations handle their own locking.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under `key`.
  fn get(&self, key: &str) -> Result<Option<CachedEntry>>;

  /// Insert or replace the entry stored under `key`.
  fn set(&self, key: &str, entry: CachedEntry) -> Result<()>;

  /// Check whether `key` is present.
  fn has(&self, key: &str) -> Result<bool>;

  /// Remove `key`, returning whether it was present.
  fn remove(&self, key: &str) -> Result<bool>;

  /// Run `patch` on the entry under `key` while holding the store's lock.
  ///
  /// Returns what `patch` returned, or false when the key is absent. `patch`
  /// must leave the entry untouched when it returns false.
  fn update(&self, key: &str, patch: &mut dyn FnMut(&mut CachedEntry) -> bool) -> Result<bool>;

  /// Remove every entry whose key satisfies `matches`, in one step.
  fn remove_where(&self, matches: &dyn Fn(&str) -> bool) -> Result<usize>;

  /// All stored keys, in key order.
  fn keys(&self) -> Result<Vec<String>>;

  /// Replace the contents with an empty map.
  fn clear(&self) -> Result<()>;

  /// False for backends that stand in for a missing store.
  fn is_enabled(&self) -> bool {
    true
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when no store was provisioned - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<CachedEntry>> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _entry: CachedEntry) -> Result<()> {
    Ok(()) // Discard
  }

  fn has(&self, _key: &str) -> Result<bool> {
    Ok(false)
  }

  fn remove(&self, _key: &str) -> Result<bool> {
    Ok(false)
  }

  fn update(&self, _key: &str, _patch: &mut dyn FnMut(&mut CachedEntry) -> bool) -> Result<bool> {
    Ok(false)
  }

  fn remove_where(&self, _matches: &dyn Fn(&str) -> bool) -> Result<usize> {
    Ok(0)
  }

  fn keys(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }

  fn is_enabled(&self) -> bool {
    false
  }
}

/// In-memory cache storage keyed by cache key.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<BTreeMap<String, CachedEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> Result<usize> {
    Ok(self.lock()?.len())
  }

  fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, CachedEntry>>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<CachedEntry>> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn set(&self, key: &str, entry: CachedEntry) -> Result<()> {
    self.lock()?.insert(key.to_string(), entry);
    Ok(())
  }

  fn has(&self, key: &str) -> Result<bool> {
    Ok(self.lock()?.contains_key(key))
  }

  fn remove(&self, key: &str) -> Result<bool> {
    Ok(self.lock()?.remove(key).is_some())
  }

  fn update(&self, key: &str, patch: &mut dyn FnMut(&mut CachedEntry) -> bool) -> Result<bool> {
    Ok(self.lock()?.get_mut(key).is_some_and(|entry| patch(entry)))
  }

  fn remove_where(&self, matches: &dyn Fn(&str) -> bool) -> Result<usize> {
    let mut entries = self.lock()?;
    let before = entries.len();
    entries.retain(|key, _| !matches(key.as_str()));
    Ok(before - entries.len())
  }

  fn keys(&self) -> Result<Vec<String>> {
    Ok(self.lock()?.keys().cloned().collect())
  }

  fn clear(&self) -> Result<()> {
    *self.lock()? = BTreeMap::new();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_set_get_remove() {
    let storage = MemoryStorage::new();
    storage.set("employees", CachedEntry::new(json!([]))).unwrap();

    assert!(storage.has("employees").unwrap());
    assert_eq!(storage.get("employees").unwrap().unwrap().payload, json!([]));
    assert!(storage.remove("employees").unwrap());
    assert!(!storage.remove("employees").unwrap());
    assert!(storage.get("employees").unwrap().is_none());
  }

  #[test]
  fn test_set_replaces_entry() {
    let storage = MemoryStorage::new();
    storage.set("k", CachedEntry::new(json!(1))).unwrap();
    storage.set("k", CachedEntry::new(json!(2))).unwrap();

    assert_eq!(storage.len().unwrap(), 1);
    assert_eq!(storage.get("k").unwrap().unwrap().payload, json!(2));
  }

  #[test]
  fn test_keys_are_sorted() {
    let storage = MemoryStorage::new();
    storage.set("b", CachedEntry::new(json!(null))).unwrap();
    storage.set("a", CachedEntry::new(json!(null))).unwrap();

    assert_eq!(storage.keys().unwrap(), vec!["a", "b"]);
  }

  #[test]
  fn test_clear_empties_store() {
    let storage = MemoryStorage::new();
    storage.set("a", CachedEntry::new(json!(null))).unwrap();
    storage.clear().unwrap();

    assert_eq!(storage.len().unwrap(), 0);
    assert!(storage.is_enabled());
  }

  #[test]
  fn test_update_patches_in_place_and_skips_missing_keys() {
    let storage = MemoryStorage::new();
    storage.set("k", CachedEntry::new(json!({ "n": 1 }))).unwrap();
    let cached_at = storage.get("k").unwrap().unwrap().cached_at;

    let changed = storage
      .update("k", &mut |entry| {
        entry.payload["n"] = json!(2);
        true
      })
      .unwrap();
    assert!(changed);
    assert_eq!(storage.get("k").unwrap().unwrap().payload, json!({ "n": 2 }));
    assert_eq!(storage.get("k").unwrap().unwrap().cached_at, cached_at);

    let mut called = false;
    let changed = storage
      .update("missing", &mut |_| {
        called = true;
        true
      })
      .unwrap();
    assert!(!changed);
    assert!(!called);
    assert!(!storage.has("missing").unwrap());
  }

  #[test]
  fn test_remove_where() {
    let storage = MemoryStorage::new();
    for key in ["ab", "ac", "b"] {
      storage.set(key, CachedEntry::new(json!(null))).unwrap();
    }

    let removed = storage.remove_where(&|key| key.starts_with('a')).unwrap();

    assert_eq!(removed, 2);
    assert_eq!(storage.keys().unwrap(), vec!["b"]);
  }

  #[test]
  fn test_noop_storage_never_holds_anything() {
    let storage = NoopStorage;
    storage.set("a", CachedEntry::new(json!(1))).unwrap();

    assert!(!storage.update("a", &mut |_| true).unwrap());
    assert_eq!(storage.remove_where(&|_| true).unwrap(), 0);
    assert!(storage.get("a").unwrap().is_none());
    assert!(!storage.has("a").unwrap());
    assert!(storage.keys().unwrap().is_empty());
    assert!(!storage.is_enabled());
  }
}
