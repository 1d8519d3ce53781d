//! Typed access to the platform's REST API, with caching and optimistic
//! mutations layered on top.

pub mod cached_client;
pub mod client;
pub mod keys;
pub mod types;
