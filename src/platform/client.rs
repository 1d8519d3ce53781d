//! Typed endpoint wrappers over the raw API client.

use crate::api::{Access, ApiClient};
use crate::error::ApiError;

use super::types::{
  BlogDetail, BlogSummary, Comment, HomebrewSummary, LoginRequest, LoginResponse, NewComment,
  Notification, Page, Profile, UnreadCount,
};

/// Platform API client. Stateless beyond the underlying `ApiClient`; the
/// session it authenticates with lives in the injected `SessionStore`.
#[derive(Clone)]
pub struct PlatformClient {
  api: ApiClient,
}

impl PlatformClient {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  pub fn api(&self) -> &ApiClient {
    &self.api
  }

  /// Authenticate and establish the session. The only public endpoint.
  pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
    let request = LoginRequest {
      email: email.to_string(),
      password: password.to_string(),
    };

    let response: LoginResponse = self
      .api
      .post_json("/auth/login", Some(&request), Access::Public)
      .await?;

    // The session store is the single writer for identity state.
    self
      .api
      .session()
      .login(response.token.clone(), response.user.clone())
      .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(response)
  }

  pub async fn current_profile(&self) -> Result<Profile, ApiError> {
    self.api.get_json("/users/me").await
  }

  pub async fn blogs(&self, page: u32, size: u32) -> Result<Page<BlogSummary>, ApiError> {
    self
      .api
      .get_json(&format!("/blogs?page={}&size={}", page, size))
      .await
  }

  pub async fn blog(&self, slug: &str) -> Result<BlogDetail, ApiError> {
    self.api.get_json(&format!("/blogs/{}", slug)).await
  }

  /// Like or unlike a blog post. Returns the updated post.
  pub async fn set_liked(&self, slug: &str, liked: bool) -> Result<BlogDetail, ApiError> {
    let path = format!("/blogs/{}/like", slug);
    if liked {
      self.api.post_json(&path, None::<&()>, Access::Authed).await
    } else {
      self.api.delete_json(&path).await
    }
  }

  /// Archive or unarchive a blog post. Returns the updated post.
  pub async fn set_archived(&self, slug: &str, archived: bool) -> Result<BlogDetail, ApiError> {
    let path = if archived {
      format!("/blogs/{}/archive", slug)
    } else {
      format!("/blogs/{}/unarchive", slug)
    };
    self.api.put_json(&path, None::<&()>).await
  }

  pub async fn comments(&self, slug: &str) -> Result<Vec<Comment>, ApiError> {
    self.api.get_json(&format!("/blogs/{}/comments", slug)).await
  }

  /// Post a comment. Returns the created comment.
  pub async fn add_comment(&self, slug: &str, body: &str) -> Result<Comment, ApiError> {
    let request = NewComment {
      body: body.to_string(),
    };
    self
      .api
      .post_json(
        &format!("/blogs/{}/comments", slug),
        Some(&request),
        Access::Authed,
      )
      .await
  }

  /// Delete a comment. 204 on success.
  pub async fn delete_comment(&self, slug: &str, comment_id: u64) -> Result<(), ApiError> {
    self
      .api
      .delete_no_content(&format!("/blogs/{}/comments/{}", slug, comment_id))
      .await
  }

  pub async fn notifications(&self, page: u32, size: u32) -> Result<Page<Notification>, ApiError> {
    self
      .api
      .get_json(&format!("/notifications?page={}&size={}", page, size))
      .await
  }

  pub async fn unread_count(&self) -> Result<UnreadCount, ApiError> {
    self.api.get_json("/notifications/unread-count").await
  }

  /// Mark one notification read. 204 on success.
  pub async fn mark_notification_read(&self, id: u64) -> Result<(), ApiError> {
    self
      .api
      .post_no_content(&format!("/notifications/{}/read", id), None::<&()>)
      .await
  }

  /// Mark every notification read. 204 on success.
  pub async fn mark_all_read(&self) -> Result<(), ApiError> {
    self
      .api
      .post_no_content("/notifications/read-all", None::<&()>)
      .await
  }

  pub async fn homebrew(&self, page: u32, size: u32) -> Result<Page<HomebrewSummary>, ApiError> {
    self
      .api
      .get_json(&format!("/homebrew?page={}&size={}", page, size))
      .await
  }
}
