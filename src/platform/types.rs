//! Domain types for the platform's REST API.
//!
//! The backend speaks camelCase JSON; list endpoints are paginated as
//! `{ content, totalPages, totalElements }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub content: Vec<T>,
  pub total_pages: u32,
  pub total_elements: u64,
}

impl<T> Page<T> {
  pub fn empty() -> Self {
    Self {
      content: Vec::new(),
      total_pages: 0,
      total_elements: 0,
    }
  }
}

/// The logged-in user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub id: u64,
  pub username: String,
  pub email: String,
  pub display_name: Option<String>,
  pub avatar_url: Option<String>,
}

/// Partial profile fields for shallow merging after a profile refresh.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
  pub email: Option<String>,
  pub display_name: Option<String>,
  pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
  pub token: String,
  pub user: Profile,
}

/// Blog post as it appears in list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogSummary {
  pub slug: String,
  pub title: String,
  pub author: String,
  pub created_at: DateTime<Utc>,
  pub like_count: u32,
  pub comment_count: u32,
  pub archived: bool,
}

/// Full blog post, the target of like/archive mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogDetail {
  pub slug: String,
  pub title: String,
  pub author: String,
  pub body: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: Option<DateTime<Utc>>,
  pub like_count: u32,
  pub liked: bool,
  pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: u64,
  pub author: String,
  pub body: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
  pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: u64,
  pub message: String,
  pub link: Option<String>,
  pub created_at: DateTime<Utc>,
  pub read: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
  pub count: u64,
}

/// Homebrew catalog entry (opaque summary; read-only in this client).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomebrewSummary {
  pub id: u64,
  pub name: String,
  pub category: String,
  pub author: String,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_page_deserializes_backend_shape() {
    let json = r#"{
      "content": [{"id": 1, "message": "Aldric liked your post", "link": null,
                   "createdAt": "2026-08-01T12:00:00Z", "read": false}],
      "totalPages": 3,
      "totalElements": 41
    }"#;

    let page: Page<Notification> = serde_json::from_str(json).unwrap();
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_elements, 41);
    assert_eq!(page.content.len(), 1);
    assert!(!page.content[0].read);
  }

  #[test]
  fn test_blog_detail_roundtrips_camel_case() {
    let json = r#"{
      "slug": "gm-tips", "title": "GM Tips", "author": "aldric",
      "body": "Roll with it.", "createdAt": "2026-07-01T09:00:00Z",
      "updatedAt": null, "likeCount": 5, "liked": false, "archived": false
    }"#;

    let blog: BlogDetail = serde_json::from_str(json).unwrap();
    assert_eq!(blog.like_count, 5);

    let back = serde_json::to_value(&blog).unwrap();
    assert_eq!(back["likeCount"], 5);
    assert_eq!(back["createdAt"], "2026-07-01T09:00:00Z");
  }
}
