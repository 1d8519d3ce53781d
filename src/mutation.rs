//! Optimistic mutation controller.
//!
//! Every user-initiated write goes through the same three-phase protocol:
//!
//! 1. Speculate: snapshot the cached value at the target key and apply the
//!    speculative transform locally, so the UI reflects the change with
//!    zero latency.
//! 2. Commit: run the remote call.
//! 3. Reconcile: on success, replace the entry with the server's echo
//!    when the endpoint returns the updated resource, otherwise invalidate
//!    the key so the next read refetches. On failure, restore the snapshot
//!    and surface a `MutationError` carrying the remote error kind.
//!
//! Entry into the speculative phase is guarded by the cache's per-key lock:
//! a second mutation on the same key waits for the first to reconcile, so it
//! can never capture an unconfirmed speculative value as its rollback target.
//! Mutations are queued, never rejected, and never retried automatically.

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::cache::{storage_key, CacheKey, ResourceCache};
use crate::error::{ApiError, MutationError};

/// Lifecycle of a single mutation. Transitions are linear; `Reconciled` and
/// `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
  Idle,
  Speculating,
  Committing,
  Reconciled,
  RolledBack,
}

/// What the remote endpoint gave back for reconciliation.
pub enum Reconcile<T> {
  /// The endpoint returned the updated resource: it becomes the confirmed
  /// cache value.
  Replace(T),
  /// The endpoint returned no body (204) or a value of a different shape:
  /// the target key is invalidated so the next read refetches.
  Invalidate,
}

/// Runs optimistic mutations against the shared resource cache.
#[derive(Clone)]
pub struct MutationController {
  cache: Arc<ResourceCache>,
}

impl MutationController {
  pub fn new(cache: Arc<ResourceCache>) -> Self {
    Self { cache }
  }

  /// Perform one optimistic mutation against the value cached at `key`.
  ///
  /// `speculate` must be a pure transform of the cached value. `remote` is
  /// invoked exactly once; its `Reconcile` result decides whether the cache
  /// ends up holding the server echo or a stale-marked entry.
  ///
  /// Returns the value the cache holds after reconciliation (server echo, or
  /// the speculative value when the key was invalidated instead).
  pub async fn perform<K, T, Fut>(
    &self,
    key: &K,
    speculate: impl FnOnce(T) -> T,
    remote: impl FnOnce() -> Fut,
  ) -> Result<T, MutationError>
  where
    K: CacheKey,
    T: Serialize + DeserializeOwned,
    Fut: Future<Output = Result<Reconcile<T>, ApiError>>,
  {
    let storage_key = storage_key(key);
    let mut phase = MutationPhase::Idle;
    tracing::trace!(key = %key.describe(), ?phase, "mutation queued");

    // Guard on Speculating entry: waits out any in-flight mutation or load
    // on the same key.
    let _guard = self.cache.lock_key(&storage_key).await;

    let snapshot = self
      .cache
      .snapshot(&storage_key)
      .ok_or(MutationError::MissingTarget)?;

    phase = MutationPhase::Speculating;
    tracing::debug!(key = %key.describe(), ?phase, "applying speculative update");

    let speculative = self
      .cache
      .set_local(key, speculate)
      .map_err(|e| MutationError::Internal(e.to_string()))?
      .ok_or(MutationError::MissingTarget)?;

    phase = MutationPhase::Committing;
    tracing::trace!(key = %key.describe(), ?phase, "committing to server");
    let outcome = remote().await;

    match outcome {
      Ok(Reconcile::Replace(server_value)) => {
        self
          .cache
          .store(key, &server_value)
          .map_err(|e| MutationError::Internal(e.to_string()))?;
        phase = MutationPhase::Reconciled;
        tracing::debug!(key = %key.describe(), ?phase, "reconciled with server echo");
        Ok(server_value)
      }
      Ok(Reconcile::Invalidate) => {
        self.cache.invalidate(key);
        phase = MutationPhase::Reconciled;
        tracing::debug!(key = %key.describe(), ?phase, "reconciled by invalidation");
        Ok(speculative)
      }
      Err(err) => {
        self.cache.restore(&storage_key, snapshot);
        phase = MutationPhase::RolledBack;
        tracing::warn!(key = %key.describe(), ?phase, error = %err, "mutation rolled back");
        Err(MutationError::RolledBack(err))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Likeable {
    liked: bool,
    like_count: u32,
  }

  struct TestKey(&'static str);

  impl CacheKey for TestKey {
    fn kind(&self) -> &'static str {
      "blog-detail"
    }
    fn param_hash(&self) -> String {
      self.0.to_string()
    }
    fn describe(&self) -> String {
      format!("blog {}", self.0)
    }
  }

  fn seeded() -> (Arc<ResourceCache>, MutationController) {
    let cache = Arc::new(ResourceCache::new());
    cache
      .store(
        &TestKey("a"),
        &Likeable {
          liked: false,
          like_count: 5,
        },
      )
      .unwrap();
    let controller = MutationController::new(cache.clone());
    (cache, controller)
  }

  fn like(mut value: Likeable) -> Likeable {
    value.liked = true;
    value.like_count += 1;
    value
  }

  #[tokio::test]
  async fn test_success_replaces_with_server_echo() {
    let (cache, controller) = seeded();

    // Server says another client liked concurrently: count corrected to 7.
    let echo = Likeable {
      liked: true,
      like_count: 7,
    };
    let result = controller
      .perform(&TestKey("a"), like, || {
        let echo = echo.clone();
        async move { Ok(Reconcile::Replace(echo)) }
      })
      .await
      .unwrap();

    assert_eq!(result, echo);
    let cached = cache.get::<_, Likeable>(&TestKey("a")).unwrap().unwrap();
    assert_eq!(cached.value, echo);
    assert!(cached.fresh);
  }

  #[tokio::test]
  async fn test_invalidate_outcome_marks_entry_stale() {
    let (cache, controller) = seeded();

    let result = controller
      .perform(&TestKey("a"), like, || async { Ok(Reconcile::Invalidate) })
      .await
      .unwrap();

    assert_eq!(
      result,
      Likeable {
        liked: true,
        like_count: 6
      }
    );
    // Speculative value stands but is marked stale, forcing a refetch.
    let cached = cache.get::<_, Likeable>(&TestKey("a")).unwrap().unwrap();
    assert_eq!(cached.value, result);
    assert!(!cached.fresh);
  }

  #[tokio::test]
  async fn test_failure_rolls_back_to_snapshot() {
    let (cache, controller) = seeded();
    let before = cache
      .get::<_, Likeable>(&TestKey("a"))
      .unwrap()
      .unwrap()
      .value;

    let err = controller
      .perform(&TestKey("a"), like, || async {
        Err::<Reconcile<Likeable>, _>(ApiError::Server { status: 500 })
      })
      .await
      .unwrap_err();

    assert!(matches!(
      err,
      MutationError::RolledBack(ApiError::Server { status: 500 })
    ));
    let after = cache
      .get::<_, Likeable>(&TestKey("a"))
      .unwrap()
      .unwrap()
      .value;
    assert_eq!(after, before);
  }

  #[tokio::test]
  async fn test_missing_target_is_rejected() {
    let cache = Arc::new(ResourceCache::new());
    let controller = MutationController::new(cache);

    let err = controller
      .perform(&TestKey("missing"), like, || async {
        Ok(Reconcile::Invalidate)
      })
      .await
      .unwrap_err();

    assert!(matches!(err, MutationError::MissingTarget));
  }

  #[tokio::test]
  async fn test_serialized_mutations_do_not_lose_updates() {
    let (cache, controller) = seeded();

    // First mutation commits: server confirms count 6.
    controller
      .perform(&TestKey("a"), like, || async {
        Ok(Reconcile::Replace(Likeable {
          liked: true,
          like_count: 6,
        }))
      })
      .await
      .unwrap();

    // Second mutation fails: its rollback must restore the *first's*
    // committed result, not the pre-first value.
    let unlike = |mut value: Likeable| {
      value.liked = false;
      value.like_count -= 1;
      value
    };
    controller
      .perform(&TestKey("a"), unlike, || async {
        Err::<Reconcile<Likeable>, _>(ApiError::Network("connection reset".into()))
      })
      .await
      .unwrap_err();

    let cached = cache
      .get::<_, Likeable>(&TestKey("a"))
      .unwrap()
      .unwrap()
      .value;
    assert_eq!(
      cached,
      Likeable {
        liked: true,
        like_count: 6
      }
    );
  }

  #[tokio::test]
  async fn test_concurrent_mutations_on_one_key_serialize() {
    let (cache, controller) = seeded();

    // Both increment by one; the second snapshots only after the first
    // reconciles. If both fail, the cache must end where it started; if both
    // succeed (as here, via Invalidate), both increments must be visible.
    let bump = |mut value: Likeable| {
      value.like_count += 1;
      value
    };

    let first = {
      let controller = controller.clone();
      tokio::spawn(async move {
        controller
          .perform(&TestKey("a"), bump, || async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(Reconcile::Invalidate)
          })
          .await
      })
    };
    let second = {
      let controller = controller.clone();
      tokio::spawn(async move {
        controller
          .perform(&TestKey("a"), bump, || async { Ok(Reconcile::Invalidate) })
          .await
      })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let cached = cache
      .get::<_, Likeable>(&TestKey("a"))
      .unwrap()
      .unwrap()
      .value;
    assert_eq!(cached.like_count, 7);
  }
}
