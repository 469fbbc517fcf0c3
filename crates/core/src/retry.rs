//! Retry-with-timeout for storage calls.
//!
//! Each attempt is bounded by [`RetryPolicy::attempt_timeout`]; transient
//! failures and timeouts are retried with exponential backoff until
//! [`RetryPolicy::max_attempts`] is reached, after which the failure
//! escalates to [`CoreError::Internal`].

use std::future::Future;
use std::time::Duration;

use crate::error::CoreError;
use crate::storage::StorageError;

/// Tunable parameters for retrying storage operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Time allowed for a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Calculate the next backoff delay, clamped to [`RetryPolicy::max_delay`].
pub fn next_delay(current: Duration, policy: &RetryPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_delay)
}

/// Run `op` under `policy`.
///
/// `operation` names the call in logs and error messages.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Transient(format!(
                "timed out after {}ms",
                policy.attempt_timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts.max(1) => {
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying storage operation",
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, policy);
            }
            Err(err) if err.is_retryable() => {
                return Err(CoreError::Internal(format!(
                    "{operation} failed after {attempt} attempt(s): {err}"
                )));
            }
            Err(err) => return Err(err.into()),
        }
    }
}
