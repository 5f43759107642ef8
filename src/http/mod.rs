//! HTTP access to the provider: a TTL response cache with a retry policy on top.

pub mod cache;
pub mod error;
pub mod retry;
pub mod session;
