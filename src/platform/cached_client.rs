//! Platform client with transparent caching and optimistic mutations.
//!
//! Reads go through the resource cache (fresh hits never touch the network,
//! concurrent loads de-duplicate); writes go through the mutation controller
//! so every like, comment, archive and mark-read follows the same
//! speculate / commit / reconcile protocol.

use std::sync::Arc;

use chrono::Utc;

use crate::cache::ResourceCache;
use crate::error::{ApiError, MutationError};
use crate::mutation::{MutationController, Reconcile};

use super::client::PlatformClient;
use super::keys::ResourceKey;
use super::types::{
  BlogDetail, BlogSummary, Comment, HomebrewSummary, LoginResponse, Notification, Page, Profile,
  UnreadCount,
};

#[derive(Clone)]
pub struct CachedPlatformClient {
  inner: PlatformClient,
  cache: Arc<ResourceCache>,
  mutations: MutationController,
}

impl CachedPlatformClient {
  pub fn new(inner: PlatformClient, cache: Arc<ResourceCache>) -> Self {
    let mutations = MutationController::new(cache.clone());
    Self {
      inner,
      cache,
      mutations,
    }
  }

  // --------------------------------------------------------------------
  // Uncached passthroughs
  // --------------------------------------------------------------------

  pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
    self.inner.login(email, password).await
  }

  pub async fn current_profile(&self) -> Result<Profile, ApiError> {
    self.inner.current_profile().await
  }

  // --------------------------------------------------------------------
  // Cached reads
  // --------------------------------------------------------------------

  pub async fn blogs(&self, page: u32, size: u32) -> Result<Page<BlogSummary>, ApiError> {
    self
      .cache
      .fetch(&ResourceKey::BlogPage { page, size }, || {
        self.inner.blogs(page, size)
      })
      .await
  }

  pub async fn blog(&self, slug: &str) -> Result<BlogDetail, ApiError> {
    self
      .cache
      .fetch(
        &ResourceKey::BlogDetail {
          slug: slug.to_string(),
        },
        || self.inner.blog(slug),
      )
      .await
  }

  pub async fn comments(&self, slug: &str) -> Result<Vec<Comment>, ApiError> {
    self
      .cache
      .fetch(
        &ResourceKey::BlogComments {
          slug: slug.to_string(),
        },
        || self.inner.comments(slug),
      )
      .await
  }

  pub async fn notifications(&self, page: u32, size: u32) -> Result<Page<Notification>, ApiError> {
    self
      .cache
      .fetch(&ResourceKey::Notifications { page, size }, || {
        self.inner.notifications(page, size)
      })
      .await
  }

  pub async fn unread_count(&self) -> Result<UnreadCount, ApiError> {
    self
      .cache
      .fetch(&ResourceKey::UnreadCount, || self.inner.unread_count())
      .await
  }

  pub async fn homebrew(&self, page: u32, size: u32) -> Result<Page<HomebrewSummary>, ApiError> {
    self
      .cache
      .fetch(&ResourceKey::HomebrewPage { page, size }, || {
        self.inner.homebrew(page, size)
      })
      .await
  }

  /// Force the next read of `key` to refetch.
  pub fn invalidate(&self, key: &ResourceKey) {
    self.cache.invalidate(key);
  }

  // --------------------------------------------------------------------
  // Cache peeks: current values for rendering, fresh or not. Views read
  // these after a mutation settles instead of mutating anything themselves.
  // --------------------------------------------------------------------

  pub fn peek_blogs(&self, page: u32, size: u32) -> Option<Page<BlogSummary>> {
    self
      .cache
      .get(&ResourceKey::BlogPage { page, size })
      .ok()
      .flatten()
      .map(|entry| entry.value)
  }

  pub fn peek_blog(&self, slug: &str) -> Option<BlogDetail> {
    self
      .cache
      .get(&ResourceKey::BlogDetail {
        slug: slug.to_string(),
      })
      .ok()
      .flatten()
      .map(|entry| entry.value)
  }

  pub fn peek_comments(&self, slug: &str) -> Option<Vec<Comment>> {
    self
      .cache
      .get(&ResourceKey::BlogComments {
        slug: slug.to_string(),
      })
      .ok()
      .flatten()
      .map(|entry| entry.value)
  }

  pub fn peek_notifications(&self, page: u32, size: u32) -> Option<Page<Notification>> {
    self
      .cache
      .get(&ResourceKey::Notifications { page, size })
      .ok()
      .flatten()
      .map(|entry| entry.value)
  }

  pub fn peek_homebrew(&self, page: u32, size: u32) -> Option<Page<HomebrewSummary>> {
    self
      .cache
      .get(&ResourceKey::HomebrewPage { page, size })
      .ok()
      .flatten()
      .map(|entry| entry.value)
  }

  // --------------------------------------------------------------------
  // Optimistic mutations
  // --------------------------------------------------------------------

  /// Like or unlike a blog post. The cached detail flips immediately; the
  /// server echo becomes the confirmed value. List pages carry like counts,
  /// so they are invalidated once the mutation commits.
  pub async fn set_liked(&self, slug: &str, liked: bool) -> Result<BlogDetail, MutationError> {
    let key = ResourceKey::BlogDetail {
      slug: slug.to_string(),
    };

    let result = self
      .mutations
      .perform(
        &key,
        move |mut blog: BlogDetail| {
          if blog.liked != liked {
            blog.liked = liked;
            blog.like_count = if liked {
              blog.like_count + 1
            } else {
              blog.like_count.saturating_sub(1)
            };
          }
          blog
        },
        || async {
          self
            .inner
            .set_liked(slug, liked)
            .await
            .map(Reconcile::Replace)
        },
      )
      .await?;

    self.cache.invalidate_kind(ResourceKey::BLOG_PAGE);
    Ok(result)
  }

  /// Archive or unarchive a blog post.
  pub async fn set_archived(
    &self,
    slug: &str,
    archived: bool,
  ) -> Result<BlogDetail, MutationError> {
    let key = ResourceKey::BlogDetail {
      slug: slug.to_string(),
    };

    let result = self
      .mutations
      .perform(
        &key,
        move |mut blog: BlogDetail| {
          blog.archived = archived;
          blog
        },
        || async {
          self
            .inner
            .set_archived(slug, archived)
            .await
            .map(Reconcile::Replace)
        },
      )
      .await?;

    self.cache.invalidate_kind(ResourceKey::BLOG_PAGE);
    Ok(result)
  }

  /// Add a comment. A provisional comment appears in the cached list
  /// immediately; since the endpoint returns only the created comment, the
  /// list is invalidated on success rather than patched.
  pub async fn add_comment(
    &self,
    slug: &str,
    author: &str,
    body: &str,
  ) -> Result<Vec<Comment>, MutationError> {
    let key = ResourceKey::BlogComments {
      slug: slug.to_string(),
    };
    let provisional = Comment {
      id: 0,
      author: author.to_string(),
      body: body.to_string(),
      created_at: Utc::now(),
    };

    let result = self
      .mutations
      .perform(
        &key,
        move |mut comments: Vec<Comment>| {
          comments.push(provisional);
          comments
        },
        || async {
          self
            .inner
            .add_comment(slug, body)
            .await
            .map(|_| Reconcile::Invalidate)
        },
      )
      .await?;

    // Comment counts appear in list views.
    self.cache.invalidate_kind(ResourceKey::BLOG_PAGE);
    Ok(result)
  }

  /// Delete a comment from the cached list, confirming with the backend.
  pub async fn delete_comment(
    &self,
    slug: &str,
    comment_id: u64,
  ) -> Result<Vec<Comment>, MutationError> {
    let key = ResourceKey::BlogComments {
      slug: slug.to_string(),
    };

    let result = self
      .mutations
      .perform(
        &key,
        move |mut comments: Vec<Comment>| {
          comments.retain(|comment| comment.id != comment_id);
          comments
        },
        || async {
          self
            .inner
            .delete_comment(slug, comment_id)
            .await
            .map(|_| Reconcile::Invalidate)
        },
      )
      .await?;

    self.cache.invalidate_kind(ResourceKey::BLOG_PAGE);
    Ok(result)
  }

  /// Mark one notification read on the cached page.
  pub async fn mark_notification_read(
    &self,
    page: u32,
    size: u32,
    id: u64,
  ) -> Result<Page<Notification>, MutationError> {
    let key = ResourceKey::Notifications { page, size };

    let result = self
      .mutations
      .perform(
        &key,
        move |mut notifications: Page<Notification>| {
          for notification in &mut notifications.content {
            if notification.id == id {
              notification.read = true;
            }
          }
          notifications
        },
        || async {
          self
            .inner
            .mark_notification_read(id)
            .await
            .map(|_| Reconcile::Invalidate)
        },
      )
      .await?;

    self.cache.invalidate(&ResourceKey::UnreadCount);
    Ok(result)
  }

  /// Mark every notification read.
  pub async fn mark_all_read(
    &self,
    page: u32,
    size: u32,
  ) -> Result<Page<Notification>, MutationError> {
    let key = ResourceKey::Notifications { page, size };

    let result = self
      .mutations
      .perform(
        &key,
        |mut notifications: Page<Notification>| {
          for notification in &mut notifications.content {
            notification.read = true;
          }
          notifications
        },
        || async { self.inner.mark_all_read().await.map(|_| Reconcile::Invalidate) },
      )
      .await?;

    // Other cached pages still hold unread flags.
    self.cache.invalidate_kind(ResourceKey::NOTIFICATIONS);
    self.cache.invalidate(&ResourceKey::UnreadCount);
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ApiClient;
  use crate::config::{Config, PlatformConfig};
  use crate::error::MutationError;
  use crate::session::SessionStore;
  use base64::engine::general_purpose::URL_SAFE_NO_PAD;
  use base64::Engine;
  use chrono::Duration as ChronoDuration;
  use serde_json::json;
  use std::time::Duration;
  use tempfile::TempDir;
  use tokio::sync::mpsc;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  struct Harness {
    client: CachedPlatformClient,
    _rx: mpsc::UnboundedReceiver<crate::event::Event>,
    _dir: TempDir,
  }

  async fn harness(server: &MockServer) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(SessionStore::new(dir.path().join("token")));

    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let exp = (Utc::now() + ChronoDuration::hours(1)).timestamp();
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"42","exp":{}}}"#, exp));
    session
      .login(
        format!("{}.{}.signature", header, payload),
        Profile {
          id: 42,
          username: "aldric".into(),
          email: "aldric@example.com".into(),
          display_name: None,
          avatar_url: None,
        },
      )
      .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let config = Config {
      platform: PlatformConfig {
        url: server.uri(),
        email: "aldric@example.com".into(),
      },
      title: None,
      page_size: 20,
      request_timeout_secs: 2,
      stale_after_secs: 300,
    };

    let api = ApiClient::new(&config, session, tx).unwrap();
    let client = CachedPlatformClient::new(PlatformClient::new(api), Arc::new(ResourceCache::new()));
    Harness {
      client,
      _rx: rx,
      _dir: dir,
    }
  }

  fn blog_json(liked: bool, like_count: u32) -> serde_json::Value {
    json!({
      "slug": "gm-tips", "title": "GM Tips", "author": "aldric",
      "body": "Roll with it.", "createdAt": "2026-07-01T09:00:00Z",
      "updatedAt": null, "likeCount": like_count, "liked": liked,
      "archived": false
    })
  }

  async fn mount_blog(server: &MockServer) {
    Mock::given(method("GET"))
      .and(path("/blogs/gm-tips"))
      .respond_with(ResponseTemplate::new(200).set_body_json(blog_json(false, 5)))
      .mount(server)
      .await;
  }

  #[tokio::test]
  async fn test_like_is_visible_before_the_server_confirms() {
    let server = MockServer::start().await;
    mount_blog(&server).await;
    // Server echoes a corrected count: another client liked concurrently.
    Mock::given(method("POST"))
      .and(path("/blogs/gm-tips/like"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(blog_json(true, 7))
          .set_delay(Duration::from_millis(100)),
      )
      .mount(&server)
      .await;

    let h = harness(&server).await;
    let before = h.client.blog("gm-tips").await.unwrap();
    assert_eq!((before.liked, before.like_count), (false, 5));

    let task = {
      let client = h.client.clone();
      tokio::spawn(async move { client.set_liked("gm-tips", true).await })
    };

    // The speculative value lands well before the server responds.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let speculative = h.client.peek_blog("gm-tips").unwrap();
    assert_eq!((speculative.liked, speculative.like_count), (true, 6));

    task.await.unwrap().unwrap();
    let confirmed = h.client.peek_blog("gm-tips").unwrap();
    assert_eq!((confirmed.liked, confirmed.like_count), (true, 7));
  }

  #[tokio::test]
  async fn test_failed_like_reverts_the_cached_value() {
    let server = MockServer::start().await;
    mount_blog(&server).await;
    Mock::given(method("POST"))
      .and(path("/blogs/gm-tips/like"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let h = harness(&server).await;
    let before = h.client.blog("gm-tips").await.unwrap();

    let err = h.client.set_liked("gm-tips", true).await.unwrap_err();
    assert!(matches!(
      err,
      MutationError::RolledBack(ApiError::Server { status: 500 })
    ));

    let after = h.client.peek_blog("gm-tips").unwrap();
    assert_eq!(after, before);
  }

  #[tokio::test]
  async fn test_add_comment_speculates_then_invalidates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/blogs/gm-tips/comments"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
        "id": 1, "author": "mira", "body": "Nice one",
        "createdAt": "2026-07-02T10:00:00Z"
      }])))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/blogs/gm-tips/comments"))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({
        "id": 2, "author": "aldric", "body": "Thanks!",
        "createdAt": "2026-07-02T11:00:00Z"
      })))
      .mount(&server)
      .await;

    let h = harness(&server).await;
    h.client.comments("gm-tips").await.unwrap();

    let comments = h
      .client
      .add_comment("gm-tips", "aldric", "Thanks!")
      .await
      .unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[1].body, "Thanks!");

    // The endpoint returned only the created comment, so the cached list is
    // marked stale for the next read.
    let entry = h
      .client
      .cache
      .get::<_, Vec<Comment>>(&ResourceKey::BlogComments {
        slug: "gm-tips".into(),
      })
      .unwrap()
      .unwrap();
    assert!(!entry.fresh);
  }

  #[tokio::test]
  async fn test_mark_notification_read_clears_unread_counter_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/notifications"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "content": [{"id": 9, "message": "Mira commented on GM Tips",
                     "link": "/blogs/gm-tips", "createdAt": "2026-08-01T12:00:00Z",
                     "read": false}],
        "totalPages": 1, "totalElements": 1
      })))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/notifications/unread-count"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 1})))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/notifications/9/read"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    let h = harness(&server).await;
    h.client.notifications(0, 20).await.unwrap();
    h.client.unread_count().await.unwrap();

    let page = h.client.mark_notification_read(0, 20, 9).await.unwrap();
    assert!(page.content[0].read);

    let counter = h
      .client
      .cache
      .get::<_, UnreadCount>(&ResourceKey::UnreadCount)
      .unwrap()
      .unwrap();
    assert!(!counter.fresh);
  }
}
