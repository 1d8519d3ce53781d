//! The in-memory resource cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;

use super::locks::KeyLocks;
use super::traits::{storage_key, CacheEntry, CacheKey};
use crate::error::ApiError;

/// A stored entry. Values are kept serialized so entries of different types
/// can live in one map; the serialized form is also what mutation snapshots
/// capture and restore, making rollback byte-for-byte.
#[derive(Debug, Clone)]
pub(crate) struct StoredEntry {
  value: Value,
  fetched_at: DateTime<Utc>,
  stale_after: Duration,
  invalidated: bool,
}

impl StoredEntry {
  fn is_fresh(&self, now: DateTime<Utc>) -> bool {
    !self.invalidated && now - self.fetched_at <= self.stale_after
  }
}

/// Keyed cache of fetched server resources.
///
/// Process-wide singleton (shared via `Arc`), created in `main` and injected
/// into the components that use it. There is no eviction policy: entries are
/// superseded by newer fetches and the key space is bounded by what the user
/// visits.
pub struct ResourceCache {
  entries: Mutex<HashMap<String, StoredEntry>>,
  locks: KeyLocks,
  /// Freshness window applied to entries stored without an explicit one.
  stale_after: Duration,
}

impl Default for ResourceCache {
  fn default() -> Self {
    Self::new()
  }
}

impl ResourceCache {
  pub fn new() -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      locks: KeyLocks::new(),
      stale_after: Duration::minutes(5),
    }
  }

  /// Set the default freshness window.
  pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
    self.stale_after = stale_after;
    self
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<String, StoredEntry>> {
    match self.entries.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }

  /// Get the cached entry for `key`, fresh or not.
  pub fn get<K, T>(&self, key: &K) -> Result<Option<CacheEntry<T>>, ApiError>
  where
    K: CacheKey,
    T: DeserializeOwned,
  {
    let storage_key = storage_key(key);
    let entry = match self.entries().get(&storage_key) {
      Some(entry) => entry.clone(),
      None => return Ok(None),
    };

    let fresh = entry.is_fresh(Utc::now());
    let fetched_at = entry.fetched_at;
    let value: T = serde_json::from_value(entry.value)
      .map_err(|e| ApiError::Internal(format!("failed to decode cached {}: {}", key.kind(), e)))?;

    Ok(Some(CacheEntry {
      value,
      fetched_at,
      fresh,
    }))
  }

  /// Store a confirmed server value, resetting freshness.
  pub fn store<K, T>(&self, key: &K, value: &T) -> Result<(), ApiError>
  where
    K: CacheKey,
    T: Serialize,
  {
    let encoded = serde_json::to_value(value)
      .map_err(|e| ApiError::Internal(format!("failed to encode {}: {}", key.kind(), e)))?;

    self.entries().insert(
      storage_key(key),
      StoredEntry {
        value: encoded,
        fetched_at: Utc::now(),
        stale_after: self.stale_after,
        invalidated: false,
      },
    );

    Ok(())
  }

  /// Fetch with cache-first strategy and request de-duplication.
  ///
  /// 1. If a fresh entry exists, return it immediately.
  /// 2. Otherwise queue on the per-key lock. Whoever gets the lock first
  ///    runs the loader; everyone behind it finds the freshly stored value
  ///    on recheck and never hits the network.
  pub async fn fetch<K, T, F, Fut>(&self, key: &K, loader: F) -> Result<T, ApiError>
  where
    K: CacheKey,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
  {
    if let Some(entry) = self.get::<K, T>(key)? {
      if entry.fresh {
        return Ok(entry.value);
      }
    }

    let _guard = self.locks.acquire(&storage_key(key)).await;

    // Recheck under the lock: a concurrent fetch may have loaded it already.
    if let Some(entry) = self.get::<K, T>(key)? {
      if entry.fresh {
        return Ok(entry.value);
      }
    }

    tracing::debug!(key = %key.describe(), "cache miss, loading");
    let value = loader().await?;
    self.store(key, &value)?;

    Ok(value)
  }

  /// Mark the entry at `key` stale, forcing the next fetch to reload.
  pub fn invalidate<K: CacheKey>(&self, key: &K) {
    if let Some(entry) = self.entries().get_mut(&storage_key(key)) {
      entry.invalidated = true;
    }
  }

  /// Mark every entry of the given resource kind stale.
  pub fn invalidate_kind(&self, kind: &str) {
    let prefix = format!("{}:", kind);
    for (key, entry) in self.entries().iter_mut() {
      if key.starts_with(&prefix) {
        entry.invalidated = true;
      }
    }
  }

  /// Apply a pure transform to the cached value without touching the
  /// network. Freshness metadata is left as-is: the result is a speculative
  /// layer over the last confirmed value, not a confirmation.
  ///
  /// Returns the transformed value, or `None` if nothing is cached at `key`.
  pub fn set_local<K, T>(
    &self,
    key: &K,
    transform: impl FnOnce(T) -> T,
  ) -> Result<Option<T>, ApiError>
  where
    K: CacheKey,
    T: Serialize + DeserializeOwned,
  {
    let storage_key = storage_key(key);
    let mut entries = self.entries();

    let entry = match entries.get_mut(&storage_key) {
      Some(entry) => entry,
      None => return Ok(None),
    };

    let current: T = serde_json::from_value(entry.value.clone())
      .map_err(|e| ApiError::Internal(format!("failed to decode cached {}: {}", key.kind(), e)))?;
    let next = transform(current);
    entry.value = serde_json::to_value(&next)
      .map_err(|e| ApiError::Internal(format!("failed to encode {}: {}", key.kind(), e)))?;

    Ok(Some(next))
  }

  /// Capture the raw entry at `key` for a later rollback.
  pub(crate) fn snapshot(&self, storage_key: &str) -> Option<StoredEntry> {
    self.entries().get(storage_key).cloned()
  }

  /// Restore a previously captured entry, metadata included.
  pub(crate) fn restore(&self, storage_key: &str, entry: StoredEntry) {
    self.entries().insert(storage_key.to_string(), entry);
  }

  /// Acquire the per-key write lock. Shared by fetch de-duplication and the
  /// mutation controller so loads and mutations on one key never interleave.
  pub(crate) async fn lock_key(&self, storage_key: &str) -> OwnedMutexGuard<()> {
    self.locks.acquire(storage_key).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  struct TestKey(&'static str, &'static str);

  impl CacheKey for TestKey {
    fn kind(&self) -> &'static str {
      self.0
    }
    fn param_hash(&self) -> String {
      self.1.to_string()
    }
    fn describe(&self) -> String {
      format!("{} {}", self.0, self.1)
    }
  }

  #[tokio::test]
  async fn test_fresh_hit_skips_loader() {
    let cache = ResourceCache::new();
    let key = TestKey("blog-detail", "a");
    let calls = Arc::new(AtomicU32::new(0));

    for _ in 0..2 {
      let calls = calls.clone();
      let value: u32 = cache
        .fetch(&key, || {
          let calls = calls.clone();
          async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
          }
        })
        .await
        .unwrap();
      assert_eq!(value, 7);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_stale_entry_reloads() {
    let cache = ResourceCache::new().with_stale_after(Duration::zero());
    let key = TestKey("blog-detail", "a");
    let calls = Arc::new(AtomicU32::new(0));

    for expected in [1u32, 2] {
      let calls = calls.clone();
      let value: u32 = cache
        .fetch(&key, || {
          let calls = calls.clone();
          async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) }
        })
        .await
        .unwrap();
      assert_eq!(value, expected);
    }
  }

  #[tokio::test]
  async fn test_concurrent_fetches_deduplicate() {
    let cache = Arc::new(ResourceCache::new());
    let calls = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..5 {
      let cache = cache.clone();
      let calls = calls.clone();
      handles.push(tokio::spawn(async move {
        cache
          .fetch(&TestKey("notifications", "p0"), || {
            let calls = calls.clone();
            async move {
              calls.fetch_add(1, Ordering::SeqCst);
              tokio::time::sleep(std::time::Duration::from_millis(10)).await;
              Ok(42u32)
            }
          })
          .await
          .unwrap()
      }));
    }

    for handle in handles {
      assert_eq!(handle.await.unwrap(), 42);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_invalidate_forces_reload() {
    let cache = ResourceCache::new();
    let key = TestKey("blog-page", "p0");
    let calls = Arc::new(AtomicU32::new(0));

    let load = |calls: Arc<AtomicU32>| async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) };

    let first: u32 = cache.fetch(&key, || load(calls.clone())).await.unwrap();
    assert_eq!(first, 1);

    cache.invalidate(&key);
    let second: u32 = cache.fetch(&key, || load(calls.clone())).await.unwrap();
    assert_eq!(second, 2);
  }

  #[tokio::test]
  async fn test_invalidate_kind_marks_all_pages() {
    let cache = ResourceCache::new();
    cache.store(&TestKey("blog-page", "p0"), &1u32).unwrap();
    cache.store(&TestKey("blog-page", "p1"), &2u32).unwrap();
    cache.store(&TestKey("blog-detail", "a"), &3u32).unwrap();

    cache.invalidate_kind("blog-page");

    assert!(!cache.get::<_, u32>(&TestKey("blog-page", "p0")).unwrap().unwrap().fresh);
    assert!(!cache.get::<_, u32>(&TestKey("blog-page", "p1")).unwrap().unwrap().fresh);
    assert!(cache.get::<_, u32>(&TestKey("blog-detail", "a")).unwrap().unwrap().fresh);
  }

  #[tokio::test]
  async fn test_set_local_transforms_in_place() {
    let cache = ResourceCache::new();
    let key = TestKey("blog-detail", "a");
    cache.store(&key, &10u32).unwrap();

    let next = cache.set_local(&key, |n: u32| n + 1).unwrap();
    assert_eq!(next, Some(11));

    let entry = cache.get::<_, u32>(&key).unwrap().unwrap();
    assert_eq!(entry.value, 11);
    // Still counts as fresh: speculative layers don't reset freshness.
    assert!(entry.fresh);
  }

  #[tokio::test]
  async fn test_set_local_without_entry_is_none() {
    let cache = ResourceCache::new();
    let next = cache.set_local(&TestKey("blog-detail", "missing"), |n: u32| n + 1).unwrap();
    assert_eq!(next, None);
  }

  #[tokio::test]
  async fn test_snapshot_restore_roundtrip() {
    let cache = ResourceCache::new();
    let key = TestKey("blog-detail", "a");
    cache.store(&key, &vec![1u32, 2, 3]).unwrap();

    let storage = storage_key(&key);
    let snapshot = cache.snapshot(&storage).unwrap();

    cache.set_local(&key, |mut v: Vec<u32>| {
      v.push(4);
      v
    })
    .unwrap();
    cache.restore(&storage, snapshot);

    let entry = cache.get::<_, Vec<u32>>(&key).unwrap().unwrap();
    assert_eq!(entry.value, vec![1, 2, 3]);
  }
}
