//! Bounded exponential backoff.

use atelier_error::RetryableError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, warn};

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_backoff_factor() -> f64 {
    1.5
}

fn default_max_delay_ms() -> u64 {
    10_000
}

/// Backoff between attempts: `min(base · factor^attempt, max)`.
///
/// # Examples
///
/// ```
/// use atelier_rate_limit::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.delay(0), Duration::from_millis(2_000));
/// assert_eq!(policy.delay(1), Duration::from_millis(3_000));
/// assert_eq!(policy.delay(2), Duration::from_millis(4_500));
/// assert_eq!(policy.delay(10), Duration::from_millis(10_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Multiplier applied per attempt
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Upper bound on any single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(base_delay_ms: u64, backoff_factor: f64, max_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            backoff_factor,
            max_delay_ms,
        }
    }

    /// Delay after failed attempt number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.base_delay_ms as f64 * self.backoff_factor.max(1.0).powi(exponent);
        let capped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Delay sequence for attempts 0, 1, 2, …
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let policy = *self;
        (0u32..).map(move |attempt| policy.delay(attempt))
    }
}

/// Run `operation` up to `max_attempts` times, sleeping per `policy` between attempts.
///
/// `operation` receives the 0-based attempt number. Errors that are not retryable are
/// returned immediately. When attempts run out the last retryable error is returned.
/// A `max_attempts` of zero behaves like one.
#[tracing::instrument(skip(policy, operation))]
pub async fn retry_with_policy<T, E, F, Fut>(
    policy: &RetryPolicy,
    max_attempts: u32,
    mut operation: F,
) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let retries = max_attempts.saturating_sub(1) as usize;
    let strategy = policy.delays().take(retries);
    let mut attempt = 0u32;

    Retry::spawn(strategy, || {
        let current = attempt;
        attempt += 1;
        let fut = operation(current);
        async move {
            match fut.await {
                Ok(value) => Ok(value),
                Err(e) if e.is_retryable() => {
                    warn!(attempt = current, error = %e, "Transient failure");
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
                Err(e) => {
                    debug!(attempt = current, error = %e, "Permanent failure");
                    Err(RetryError::Permanent(e))
                }
            }
        }
    })
    .await
}
