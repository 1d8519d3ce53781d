//! In-memory server-resource cache.
//!
//! This module provides a platform-agnostic caching mechanism that:
//! - Keys entries by resource kind + identifying parameters
//! - Tracks staleness per entry and supports manual invalidation
//! - Collapses concurrent fetches of the same key into one network call
//! - Exposes `set_local` for speculative, network-free transforms
//!   (used by the optimistic mutation controller)

mod locks;
mod store;
mod traits;

pub use locks::KeyLocks;
pub use store::ResourceCache;
pub use traits::{storage_key, CacheEntry, CacheKey};
