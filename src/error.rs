//! Error taxonomy for the platform client.
//!
//! `ApiError` classifies every outbound-call failure at a single choke point
//! (see `api::ApiClient`); `MutationError` is what an optimistic mutation
//! surfaces after its speculative state has been rolled back.

use thiserror::Error;

/// Classified failure of a remote call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// No response was received (connect failure, timeout, broken transport).
  #[error("network error: {0}")]
  Network(String),

  /// The backend rejected the credentials (401).
  #[error("not authenticated")]
  Unauthorized,

  /// The backend refused the operation (403).
  #[error("forbidden")]
  Forbidden,

  /// The resource does not exist (404). Passed through silently for the
  /// caller to handle contextually.
  #[error("not found")]
  NotFound,

  /// The backend failed (5xx).
  #[error("server error (status {status})")]
  Server { status: u16 },

  /// A 4xx with a structured error payload from the backend.
  #[error("{message} [{code}]")]
  Domain { code: String, message: String },

  /// The local session token is past its validity window. Detected before
  /// the network call is made.
  #[error("session token expired")]
  TokenExpired,

  /// Client-side bookkeeping failure (serialization, poisoned lock).
  #[error("internal client error: {0}")]
  Internal(String),
}

impl ApiError {
  /// Whether this error means the session is no longer usable.
  pub fn is_auth_failure(&self) -> bool {
    matches!(self, ApiError::Unauthorized | ApiError::TokenExpired)
  }

  /// Whether the failure should be surfaced as a transient toast
  /// (network and server faults; everything else is handled contextually).
  pub fn is_transient(&self) -> bool {
    matches!(self, ApiError::Network(_) | ApiError::Server { .. })
  }
}

/// Failure of an optimistic mutation.
///
/// By the time one of these is returned, the cache has already been restored
/// to its pre-mutation snapshot; the caller only decides presentation.
#[derive(Debug, Error)]
pub enum MutationError {
  /// The remote call failed; the speculative value was rolled back.
  #[error("change was undone: {0}")]
  RolledBack(#[source] ApiError),

  /// There was no cached value to mutate at the target key.
  #[error("nothing cached to update")]
  MissingTarget,

  /// Cache bookkeeping failed before or after the remote call.
  #[error("internal mutation error: {0}")]
  Internal(String),
}

impl MutationError {
  /// The underlying remote error kind, when the mutation reached the network.
  pub fn api_error(&self) -> Option<&ApiError> {
    match self {
      MutationError::RolledBack(err) => Some(err),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_auth_failures() {
    assert!(ApiError::Unauthorized.is_auth_failure());
    assert!(ApiError::TokenExpired.is_auth_failure());
    assert!(!ApiError::NotFound.is_auth_failure());
  }

  #[test]
  fn test_transient_kinds() {
    assert!(ApiError::Network("timeout".into()).is_transient());
    assert!(ApiError::Server { status: 502 }.is_transient());
    assert!(!ApiError::Forbidden.is_transient());
    assert!(!ApiError::Domain {
      code: "BLOG_LOCKED".into(),
      message: "blog is locked".into()
    }
    .is_transient());
  }
}
