//! Cache keys for platform resources.

use sha2::{Digest, Sha256};

use crate::cache::CacheKey;

/// Composite key for every server resource the client caches.
///
/// The kind names double as invalidation prefixes: archiving a blog
/// invalidates every `blog-page` entry in one sweep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKey {
  /// One page of the blog list
  BlogPage { page: u32, size: u32 },
  /// A blog post by slug
  BlogDetail { slug: String },
  /// All comments of a blog post
  BlogComments { slug: String },
  /// One page of the notification list
  Notifications { page: u32, size: u32 },
  /// The unread-notification counter
  UnreadCount,
  /// One page of the homebrew catalog
  HomebrewPage { page: u32, size: u32 },
}

impl ResourceKey {
  /// Kind name used as the storage-key prefix.
  pub const BLOG_PAGE: &'static str = "blog-page";
  pub const BLOG_DETAIL: &'static str = "blog-detail";
  pub const BLOG_COMMENTS: &'static str = "blog-comments";
  pub const NOTIFICATIONS: &'static str = "notifications";
  pub const UNREAD_COUNT: &'static str = "unread-count";
  pub const HOMEBREW_PAGE: &'static str = "homebrew-page";

  fn params(&self) -> String {
    match self {
      Self::BlogPage { page, size } => format!("{}:{}", page, size),
      Self::BlogDetail { slug } => normalize_slug(slug),
      Self::BlogComments { slug } => normalize_slug(slug),
      Self::Notifications { page, size } => format!("{}:{}", page, size),
      Self::UnreadCount => String::new(),
      Self::HomebrewPage { page, size } => format!("{}:{}", page, size),
    }
  }
}

impl CacheKey for ResourceKey {
  fn kind(&self) -> &'static str {
    match self {
      Self::BlogPage { .. } => Self::BLOG_PAGE,
      Self::BlogDetail { .. } => Self::BLOG_DETAIL,
      Self::BlogComments { .. } => Self::BLOG_COMMENTS,
      Self::Notifications { .. } => Self::NOTIFICATIONS,
      Self::UnreadCount => Self::UNREAD_COUNT,
      Self::HomebrewPage { .. } => Self::HOMEBREW_PAGE,
    }
  }

  fn param_hash(&self) -> String {
    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(self.params().as_bytes());
    hex::encode(hasher.finalize())
  }

  fn describe(&self) -> String {
    match self {
      Self::BlogPage { page, .. } => format!("blog list page {}", page),
      Self::BlogDetail { slug } => format!("blog {}", slug),
      Self::BlogComments { slug } => format!("comments of {}", slug),
      Self::Notifications { page, .. } => format!("notifications page {}", page),
      Self::UnreadCount => "unread count".to_string(),
      Self::HomebrewPage { page, .. } => format!("homebrew page {}", page),
    }
  }
}

/// Normalize slugs for consistent hashing.
/// Trims whitespace and lowercases for case-insensitive matching.
fn normalize_slug(slug: &str) -> String {
  slug.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage_key;

  #[test]
  fn test_storage_keys_carry_kind_prefix() {
    let key = storage_key(&ResourceKey::BlogPage { page: 0, size: 20 });
    assert!(key.starts_with("blog-page:"));
  }

  #[test]
  fn test_slug_normalization() {
    let a = ResourceKey::BlogDetail {
      slug: " GM-Tips ".into(),
    };
    let b = ResourceKey::BlogDetail {
      slug: "gm-tips".into(),
    };
    assert_eq!(a.param_hash(), b.param_hash());
  }

  #[test]
  fn test_distinct_pages_hash_differently() {
    let a = ResourceKey::BlogPage { page: 0, size: 20 };
    let b = ResourceKey::BlogPage { page: 1, size: 20 };
    assert_ne!(storage_key(&a), storage_key(&b));
  }

  #[test]
  fn test_same_params_different_kinds_do_not_collide() {
    let a = storage_key(&ResourceKey::BlogDetail {
      slug: "gm-tips".into(),
    });
    let b = storage_key(&ResourceKey::BlogComments {
      slug: "gm-tips".into(),
    });
    assert_ne!(a, b);
  }
}
