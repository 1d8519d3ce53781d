//! HTTP client for the platform API.
//!
//! All outbound calls go through `ApiClient`, which attaches bearer auth,
//! applies a uniform timeout, classifies failures into `ApiError`, and owns
//! the central 401 handling: session teardown plus a single
//! `SessionInvalidated` event per established session, never one per failing
//! request.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

use crate::config::Config;
use crate::error::ApiError;
use crate::event::{Event, SessionEvent, Toast};
use crate::session::{token_is_usable, SessionStore};

/// Whether an endpoint requires an established session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
  /// Auth endpoints: no token attached, no fail-fast expiry check.
  Public,
  /// Everything else: token attached when present; a locally expired token
  /// fails fast without a network call.
  Authed,
}

/// Structured error payload the backend attaches to domain-level 4xx.
#[derive(Debug, Deserialize)]
struct DomainErrorBody {
  code: Option<String>,
  message: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
  session: Arc<SessionStore>,
  events: mpsc::UnboundedSender<Event>,
}

impl ApiClient {
  pub fn new(
    config: &Config,
    session: Arc<SessionStore>,
    events: mpsc::UnboundedSender<Event>,
  ) -> color_eyre::Result<Self> {
    use color_eyre::eyre::eyre;

    let mut base_url = Url::parse(&config.platform.url)
      .map_err(|e| eyre!("Invalid platform URL {}: {}", config.platform.url, e))?;
    // Keep a trailing slash so Url::join treats the base as a directory.
    if !base_url.path().ends_with('/') {
      base_url.set_path(&format!("{}/", base_url.path()));
    }

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      session,
      events,
    })
  }

  pub fn session(&self) -> &Arc<SessionStore> {
    &self.session
  }

  /// GET an authed JSON resource.
  pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    let response = self
      .send(Method::GET, path, None::<&()>, Access::Authed)
      .await?;
    decode_body(response).await
  }

  /// POST, expecting the updated resource back.
  pub async fn post_json<B: Serialize, T: DeserializeOwned>(
    &self,
    path: &str,
    body: Option<&B>,
    access: Access,
  ) -> Result<T, ApiError> {
    let response = self.send(Method::POST, path, body, access).await?;
    decode_body(response).await
  }

  /// POST, expecting no body back (204).
  pub async fn post_no_content<B: Serialize>(
    &self,
    path: &str,
    body: Option<&B>,
  ) -> Result<(), ApiError> {
    self.send(Method::POST, path, body, Access::Authed).await?;
    Ok(())
  }

  /// PUT, expecting the updated resource back.
  pub async fn put_json<B: Serialize, T: DeserializeOwned>(
    &self,
    path: &str,
    body: Option<&B>,
  ) -> Result<T, ApiError> {
    let response = self.send(Method::PUT, path, body, Access::Authed).await?;
    decode_body(response).await
  }

  /// DELETE, expecting the updated resource back.
  pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    let response = self
      .send(Method::DELETE, path, None::<&()>, Access::Authed)
      .await?;
    decode_body(response).await
  }

  /// DELETE, expecting no body back (204).
  pub async fn delete_no_content(&self, path: &str) -> Result<(), ApiError> {
    self
      .send(Method::DELETE, path, None::<&()>, Access::Authed)
      .await?;
    Ok(())
  }

  /// Issue one request and classify the outcome. Side effects:
  /// - 401 and local token expiry tear the session down (once),
  /// - network and server faults surface a transient toast,
  /// - 404 passes through silently for the caller to handle contextually.
  async fn send<B: Serialize>(
    &self,
    method: Method,
    path: &str,
    body: Option<&B>,
    access: Access,
  ) -> Result<reqwest::Response, ApiError> {
    let url = self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| ApiError::Internal(format!("invalid request path {}: {}", path, e)))?;

    let mut request = self.http.request(method.clone(), url);

    if access == Access::Authed {
      if let Some(token) = self.session.token() {
        if !token_is_usable(&token, Utc::now()) {
          tracing::info!(%path, "token expired locally, skipping network call");
          let err = ApiError::TokenExpired;
          self.tear_down_session();
          return Err(err);
        }
        request = request.bearer_auth(token);
      }
    }

    if let Some(body) = body {
      request = request.json(body);
    }

    let response = match request.send().await {
      Ok(response) => response,
      Err(e) => {
        let reason = if e.is_timeout() {
          "request timed out".to_string()
        } else {
          e.to_string()
        };
        let err = ApiError::Network(reason);
        tracing::warn!(%method, %path, error = %err, "request failed");
        self.report_transient(&err);
        return Err(err);
      }
    };

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let err = classify_failure(status, response).await;
    tracing::warn!(%method, %path, %status, error = %err, "request rejected");

    match &err {
      ApiError::Unauthorized => self.tear_down_session(),
      _ if err.is_transient() => self.report_transient(&err),
      _ => {}
    }

    Err(err)
  }

  /// Central auth teardown. The `SessionInvalidated` event fires at most
  /// once per established session, so a burst of failing requests produces
  /// one teardown and one redirect to the auth view.
  fn tear_down_session(&self) {
    if let Err(e) = self.session.logout() {
      tracing::error!(error = %e, "failed to clear session storage");
    }
    if self.session.mark_invalidated() {
      let _ = self.events.send(Event::Session(SessionEvent::Invalidated));
    }
  }

  fn report_transient(&self, err: &ApiError) {
    let _ = self.events.send(Event::Toast(Toast::error(err.to_string())));
  }
}

/// Map a non-success response to an `ApiError`.
async fn classify_failure(status: StatusCode, response: reqwest::Response) -> ApiError {
  match status {
    StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
    StatusCode::FORBIDDEN => ApiError::Forbidden,
    StatusCode::NOT_FOUND => ApiError::NotFound,
    s if s.is_server_error() => ApiError::Server {
      status: s.as_u16(),
    },
    s => {
      // Remaining 4xx: prefer the backend's structured payload.
      let fallback_message = s
        .canonical_reason()
        .unwrap_or("request rejected")
        .to_string();
      match response.json::<DomainErrorBody>().await {
        Ok(body) => ApiError::Domain {
          code: body.code.unwrap_or_else(|| s.as_u16().to_string()),
          message: body.message.unwrap_or(fallback_message),
        },
        Err(_) => ApiError::Domain {
          code: s.as_u16().to_string(),
          message: fallback_message,
        },
      }
    }
  }
}

async fn decode_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
  response
    .json::<T>()
    .await
    .map_err(|e| ApiError::Internal(format!("failed to decode response body: {}", e)))
}
