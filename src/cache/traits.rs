//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};

/// Trait for cache keys.
///
/// A key is a composite of a resource kind and its identifying parameters
/// (e.g., kind "blog-detail" + slug). The kind stays in the storage key as a
/// plain prefix so whole families of entries can be invalidated together;
/// the parameters are hashed for a stable, fixed-length suffix.
pub trait CacheKey {
  /// Resource kind this key belongs to (e.g., "blog-page", "notifications").
  fn kind(&self) -> &'static str;

  /// Stable hash of the identifying parameters.
  fn param_hash(&self) -> String;

  /// Human-readable description for logging.
  fn describe(&self) -> String;
}

/// Full storage key for a cache entry: `kind:param_hash`.
pub fn storage_key<K: CacheKey>(key: &K) -> String {
  format!("{}:{}", key.kind(), key.param_hash())
}

/// A decoded cache entry, as seen by readers.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  /// The cached value. Either the last confirmed server value or a pending
  /// speculative value layered on top of it.
  pub value: T,
  /// When the value was last confirmed by a fetch or a server echo.
  pub fetched_at: DateTime<Utc>,
  /// False once the freshness window elapsed or the entry was invalidated.
  pub fresh: bool,
}
