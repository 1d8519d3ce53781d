//! Session store: the single source of truth for "who is logged in".
//!
//! Holds the bearer token and the user profile. Written only by login,
//! logout, and profile-refresh events; the view layer reads, never writes.
//! The token is persisted as a single file under the user data dir and
//! re-validated opportunistically (on startup and on 401), never by a
//! background timer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;

use crate::platform::types::{Profile, ProfilePatch};

/// Tokens with less than this much validity left are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 5 * 60;

#[derive(Debug, Default)]
struct SessionState {
  token: Option<String>,
  profile: Option<Profile>,
  authenticated: bool,
}

/// Outcome of the startup bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
  /// No stored token; start logged out.
  NoToken,
  /// A stored token was expired (or undecodable) and has been cleared,
  /// without any network call.
  Expired,
  /// The stored token is locally valid: the session is optimistically
  /// authenticated and the caller must confirm it with a profile fetch,
  /// rolling back to logged-out on failure.
  PendingConfirm,
}

/// Process-wide identity state, shared via `Arc` and injected at
/// construction.
pub struct SessionStore {
  state: Mutex<SessionState>,
  token_path: PathBuf,
  /// Re-armed on login; disarmed after the first 401 teardown so a burst of
  /// failing requests invalidates the session exactly once.
  invalidation_armed: AtomicBool,
}

impl SessionStore {
  pub fn new(token_path: PathBuf) -> Self {
    Self {
      state: Mutex::new(SessionState::default()),
      token_path,
      invalidation_armed: AtomicBool::new(false),
    }
  }

  /// Default token file location, e.g. `~/.local/share/tavern/token`.
  pub fn default_token_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("tavern").join("token"))
  }

  fn state(&self) -> MutexGuard<'_, SessionState> {
    match self.state.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }

  pub fn token(&self) -> Option<String> {
    self.state().token.clone()
  }

  pub fn profile(&self) -> Option<Profile> {
    self.state().profile.clone()
  }

  pub fn is_authenticated(&self) -> bool {
    self.state().authenticated
  }

  /// Establish a session from a login response and persist the token.
  pub fn login(&self, token: String, profile: Profile) -> Result<()> {
    self.persist_token(&token)?;

    let mut state = self.state();
    state.token = Some(token);
    state.profile = Some(profile);
    state.authenticated = true;
    drop(state);

    self.invalidation_armed.store(true, Ordering::SeqCst);
    tracing::info!("session established");
    Ok(())
  }

  /// Clear the session and durable storage. Idempotent: calling twice is the
  /// same as calling once.
  pub fn logout(&self) -> Result<()> {
    {
      let mut state = self.state();
      state.token = None;
      state.profile = None;
      state.authenticated = false;
    }

    match std::fs::remove_file(&self.token_path) {
      Ok(()) => {}
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => {
        return Err(eyre!(
          "Failed to clear token file {}: {}",
          self.token_path.display(),
          e
        ))
      }
    }

    Ok(())
  }

  /// Shallow-merge fields into the loaded profile. No-op when logged out.
  pub fn merge_profile(&self, patch: ProfilePatch) {
    let mut state = self.state();
    let profile = match state.profile.as_mut() {
      Some(profile) => profile,
      None => return,
    };

    if let Some(email) = patch.email {
      profile.email = email;
    }
    if patch.display_name.is_some() {
      profile.display_name = patch.display_name;
    }
    if patch.avatar_url.is_some() {
      profile.avatar_url = patch.avatar_url;
    }
  }

  /// Replace the profile after a confirming fetch.
  pub fn confirm_profile(&self, profile: Profile) {
    let mut state = self.state();
    state.profile = Some(profile);
    state.authenticated = state.token.is_some();
  }

  /// Restore a session from durable storage at process start.
  ///
  /// Expiry is checked locally (decode + compare with a safety margin);
  /// no network call is made here.
  pub fn bootstrap(&self) -> Result<Bootstrap> {
    let token = match self.read_persisted_token()? {
      Some(token) => token,
      None => return Ok(Bootstrap::NoToken),
    };

    if !token_is_usable(&token, Utc::now()) {
      tracing::info!("stored token expired, clearing session");
      self.logout()?;
      return Ok(Bootstrap::Expired);
    }

    let mut state = self.state();
    state.token = Some(token);
    state.authenticated = true;
    drop(state);

    self.invalidation_armed.store(true, Ordering::SeqCst);
    Ok(Bootstrap::PendingConfirm)
  }

  /// Whether the current token will still be valid past the safety margin.
  pub fn token_valid(&self) -> bool {
    match self.token() {
      Some(token) => token_is_usable(&token, Utc::now()),
      None => false,
    }
  }

  /// One-shot guard for the 401 teardown. Returns true exactly once per
  /// established session.
  pub fn mark_invalidated(&self) -> bool {
    self.invalidation_armed.swap(false, Ordering::SeqCst)
  }

  fn persist_token(&self, token: &str) -> Result<()> {
    if let Some(parent) = self.token_path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create data directory: {}", e))?;
    }

    std::fs::write(&self.token_path, token).map_err(|e| {
      eyre!(
        "Failed to write token file {}: {}",
        self.token_path.display(),
        e
      )
    })
  }

  fn read_persisted_token(&self) -> Result<Option<String>> {
    match std::fs::read_to_string(&self.token_path) {
      Ok(token) => {
        let token = token.trim().to_string();
        Ok(if token.is_empty() { None } else { Some(token) })
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(eyre!(
        "Failed to read token file {}: {}",
        self.token_path.display(),
        e
      )),
    }
  }
}

#[derive(Deserialize)]
struct TokenClaims {
  exp: i64,
}

/// Decode the JWT `exp` claim without verifying the signature. The backend
/// remains the authority; this only avoids sending calls that are certain to
/// be rejected.
fn decode_expiry(token: &str) -> Result<DateTime<Utc>> {
  let payload = token
    .split('.')
    .nth(1)
    .ok_or_else(|| eyre!("Token is not a JWT"))?;

  let bytes = URL_SAFE_NO_PAD
    .decode(payload)
    .map_err(|e| eyre!("Failed to decode token payload: {}", e))?;

  let claims: TokenClaims =
    serde_json::from_slice(&bytes).map_err(|e| eyre!("Failed to parse token claims: {}", e))?;

  DateTime::from_timestamp(claims.exp, 0).ok_or_else(|| eyre!("Token exp out of range"))
}

/// True when the token has more than the safety margin of validity left.
/// Undecodable tokens count as unusable.
pub fn token_is_usable(token: &str, now: DateTime<Utc>) -> bool {
  match decode_expiry(token) {
    Ok(expiry) => expiry - now > Duration::seconds(EXPIRY_MARGIN_SECS),
    Err(_) => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn make_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"42","exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
  }

  fn profile() -> Profile {
    Profile {
      id: 42,
      username: "aldric".into(),
      email: "aldric@example.com".into(),
      display_name: None,
      avatar_url: None,
    }
  }

  fn store_in(dir: &Path) -> SessionStore {
    SessionStore::new(dir.join("token"))
  }

  #[test]
  fn test_login_persists_and_authenticates() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    let token = make_token((Utc::now() + Duration::hours(1)).timestamp());
    store.login(token.clone(), profile()).unwrap();

    assert!(store.is_authenticated());
    assert_eq!(store.token(), Some(token.clone()));
    assert_eq!(std::fs::read_to_string(dir.path().join("token")).unwrap(), token);
  }

  #[test]
  fn test_logout_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    let token = make_token((Utc::now() + Duration::hours(1)).timestamp());
    store.login(token, profile()).unwrap();

    store.logout().unwrap();
    store.logout().unwrap();

    assert!(!store.is_authenticated());
    assert_eq!(store.token(), None);
    assert!(!dir.path().join("token").exists());
  }

  #[test]
  fn test_bootstrap_without_token() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    assert_eq!(store.bootstrap().unwrap(), Bootstrap::NoToken);
    assert!(!store.is_authenticated());
  }

  #[test]
  fn test_bootstrap_with_valid_token_pends_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let token = make_token((Utc::now() + Duration::hours(2)).timestamp());
    std::fs::write(dir.path().join("token"), &token).unwrap();

    let store = store_in(dir.path());
    assert_eq!(store.bootstrap().unwrap(), Bootstrap::PendingConfirm);
    assert!(store.is_authenticated());
    assert_eq!(store.profile(), None);

    // Confirming fetch arrives.
    store.confirm_profile(profile());
    assert_eq!(store.profile().unwrap().username, "aldric");
  }

  #[test]
  fn test_bootstrap_with_nearly_expired_token_clears_storage() {
    let dir = tempfile::tempdir().unwrap();
    // 60 seconds left: inside the 5 minute margin.
    let token = make_token((Utc::now() + Duration::seconds(60)).timestamp());
    std::fs::write(dir.path().join("token"), &token).unwrap();

    let store = store_in(dir.path());
    assert_eq!(store.bootstrap().unwrap(), Bootstrap::Expired);
    assert!(!store.is_authenticated());
    assert_eq!(store.token(), None);
    assert!(!dir.path().join("token").exists());
  }

  #[test]
  fn test_bootstrap_with_garbage_token_clears_storage() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("token"), "not-a-jwt").unwrap();

    let store = store_in(dir.path());
    assert_eq!(store.bootstrap().unwrap(), Bootstrap::Expired);
    assert!(!dir.path().join("token").exists());
  }

  #[test]
  fn test_merge_profile_is_noop_when_logged_out() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    store.merge_profile(ProfilePatch {
      display_name: Some("Aldric the Bold".into()),
      ..Default::default()
    });

    assert_eq!(store.profile(), None);
  }

  #[test]
  fn test_merge_profile_shallow_merges() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    let token = make_token((Utc::now() + Duration::hours(1)).timestamp());
    store.login(token, profile()).unwrap();

    store.merge_profile(ProfilePatch {
      display_name: Some("Aldric the Bold".into()),
      ..Default::default()
    });

    let merged = store.profile().unwrap();
    assert_eq!(merged.display_name.as_deref(), Some("Aldric the Bold"));
    // Untouched fields survive.
    assert_eq!(merged.email, "aldric@example.com");
  }

  #[test]
  fn test_mark_invalidated_fires_once_per_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    let token = make_token((Utc::now() + Duration::hours(1)).timestamp());
    store.login(token.clone(), profile()).unwrap();

    assert!(store.mark_invalidated());
    assert!(!store.mark_invalidated());

    // A fresh login re-arms the guard.
    store.login(token, profile()).unwrap();
    assert!(store.mark_invalidated());
  }

  #[test]
  fn test_token_usability_margin() {
    let now = Utc::now();
    let expiring = make_token((now + Duration::seconds(240)).timestamp());
    let healthy = make_token((now + Duration::seconds(360)).timestamp());

    assert!(!token_is_usable(&expiring, now));
    assert!(token_is_usable(&healthy, now));
  }
}
