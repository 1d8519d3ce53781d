//! Remote resource client: the single choke point for outbound calls.

mod client;

pub use client::{Access, ApiClient};
