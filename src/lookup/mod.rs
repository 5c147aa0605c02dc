//! Username lookup module

pub mod client;
pub mod response;
pub mod retry;
pub mod validator;

// Re-export main functionality
pub use client::{HttpTransport, ProfileClient, RawResponse, Transport};
pub use retry::{BoundedRetry, RetryForever, RetryPolicy};
pub use validator::UsernameValidator;

use crate::types::LookupResult;
use async_trait::async_trait;

/// Trait for username lookup backends.
///
/// Implementations absorb transient failures themselves: a returned result is
/// always conclusive unless the retry policy gave up, in which case it carries
/// [`crate::types::LookupStatus::TransientError`].
#[async_trait]
pub trait NameLookup: Send + Sync {
    /// Look up a single username through `proxy`
    async fn check_name(&self, proxy: &str, name: &str) -> LookupResult;

    /// Look up an ordered batch of usernames through `proxy`.
    ///
    /// Returns one result per input name, in input order.
    async fn check_batch(&self, proxy: &str, batch: &[String]) -> Vec<LookupResult>;

    /// Get the method name
    fn method_name(&self) -> &'static str;
}
