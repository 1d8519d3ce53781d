//! Per-key async locks.
//!
//! One lock per storage key serializes everything that writes a given entry:
//! concurrent fetches of an uncached key queue behind the first loader
//! (request de-duplication), and a second optimistic mutation cannot snapshot
//! an unconfirmed speculative value as its rollback target.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A map of per-key async mutexes.
///
/// Locks are created lazily and never evicted; the key space is bounded by
/// the resources the user actually visits.
#[derive(Default)]
pub struct KeyLocks {
  inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Acquire the lock for `key`, waiting if another task holds it.
  pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
    let lock = {
      let mut map = match self.inner.lock() {
        Ok(map) => map,
        Err(poisoned) => poisoned.into_inner(),
      };
      map
        .entry(key.to_string())
        .or_insert_with(|| Arc::new(AsyncMutex::new(())))
        .clone()
    };

    lock.lock_owned().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  #[tokio::test]
  async fn test_same_key_serializes() {
    let locks = Arc::new(KeyLocks::new());
    let running = Arc::new(AtomicU32::new(0));
    let max_seen = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..4 {
      let locks = locks.clone();
      let running = running.clone();
      let max_seen = max_seen.clone();
      handles.push(tokio::spawn(async move {
        let _guard = locks.acquire("blog-detail:abc").await;
        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
        max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        running.fetch_sub(1, Ordering::SeqCst);
      }));
    }
    for handle in handles {
      handle.await.unwrap();
    }

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_different_keys_do_not_block() {
    let locks = KeyLocks::new();
    let _a = locks.acquire("a").await;
    // Must not deadlock: "b" is an independent lock.
    let _b = locks.acquire("b").await;
  }
}
