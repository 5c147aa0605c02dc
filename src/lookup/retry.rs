//! Retry strategies for lookup requests

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, SniperError};

/// Decides whether, and after how long, a failed attempt is retried
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Delay before the next attempt, or `None` to give up.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    fn next_delay(&self, attempt: u32, error: &SniperError) -> Option<Duration>;
}

/// Retry transient failures forever with a fixed delay.
///
/// Partial results are unusable, so a lookup never gives up; the remote
/// service is expected to recover from rate limiting on its own.
#[derive(Debug, Clone, Copy)]
pub struct RetryForever {
    delay: Duration,
}

impl RetryForever {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl RetryPolicy for RetryForever {
    fn next_delay(&self, _attempt: u32, _error: &SniperError) -> Option<Duration> {
        Some(self.delay)
    }
}

/// Retry with a fixed delay, giving up after `max_attempts` attempts
#[derive(Debug, Clone, Copy)]
pub struct BoundedRetry {
    delay: Duration,
    max_attempts: u32,
}

impl BoundedRetry {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: max_attempts.max(1),
        }
    }
}

impl RetryPolicy for BoundedRetry {
    fn next_delay(&self, attempt: u32, _error: &SniperError) -> Option<Duration> {
        (attempt < self.max_attempts).then_some(self.delay)
    }
}

/// Run `op` until it succeeds, a non-transient error occurs, or `policy` gives up.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, F, Fut>(policy: &dyn RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt = attempt.saturating_add(1);
        let error = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => e,
            Err(e) => return Err(e),
        };

        match policy.next_delay(attempt, &error) {
            Some(delay) => {
                tracing::debug!(
                    operation = %operation,
                    attempt = attempt,
                    delay_ms = %delay.as_millis(),
                    error = %error,
                    "Lookup attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                tracing::warn!(
                    operation = %operation,
                    attempts = attempt,
                    error = %error,
                    "Giving up on lookup"
                );
                return Err(error);
            }
        }
    }
}
