//! Bounded retry for transient media platform failures.

use std::future::Future;
use std::time::Duration;

/// Errors that can be classified as worth another attempt.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

/// Retry bounds. `max_attempts` counts every attempt, the first included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Sleep between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 10, delay: Duration::from_millis(500) }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the attempt
/// budget is spent. The last error is returned in the latter two cases.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    "operation failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(error = %e, attempts = attempt, "operation failed after all retry attempts");
                } else {
                    tracing::debug!(error = %e, "operation failed with permanent error");
                }
                return Err(e);
            }
        }
    }
}
