use crate::utils::error::Result;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

/// Runs `f` until it succeeds, fails with a non-retryable error, or the policy
/// runs out of attempts. The last error is returned.
pub async fn retry<T, F, Fut>(operation: &str, policy: &RetryPolicy, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                tracing::warn!(
                    "⚠️ {} failed, attempt {} of {}: {}",
                    operation,
                    attempt,
                    attempts,
                    e
                );
                if attempt >= attempts {
                    tracing::error!("Failed to run {} after {} attempts: {}", operation, attempts, e);
                    return Err(e);
                }
                attempt += 1;
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
}

/// Same as [`retry`] but falls back to `default` instead of returning the error.
pub async fn retry_or<T, F, Fut>(operation: &str, policy: &RetryPolicy, default: T, f: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match retry(operation, policy, f).await {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("{} fell back to default: {}", operation, e);
            default
        }
    }
}
