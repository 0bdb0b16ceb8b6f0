//! Retry with Exponential Backoff
//!
//! Generic retry wrapper for async operations. Every failure is retried until
//! the attempt budget is spent; there is no error classification and no
//! jitter. The delay before retry `n` (1-based) is
//! `min(initial_delay * backoff_factor^n, max_delay)`. A provider's
//! retry-after hint can stretch a delay, never past `max_delay`.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::constants::retry as retry_constants;
use crate::types::{ClientClass, Result};

/// Retry budget and delay curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first call; total calls are `max_retries + 1`
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl RetryPolicy {
    pub fn standard() -> Self {
        Self {
            max_retries: retry_constants::standard::MAX_RETRIES,
            initial_delay_ms: retry_constants::standard::INITIAL_DELAY_MS,
            max_delay_ms: retry_constants::standard::MAX_DELAY_MS,
            backoff_factor: retry_constants::standard::BACKOFF_FACTOR,
        }
    }

    pub fn mobile() -> Self {
        Self {
            max_retries: retry_constants::mobile::MAX_RETRIES,
            initial_delay_ms: retry_constants::mobile::INITIAL_DELAY_MS,
            max_delay_ms: retry_constants::mobile::MAX_DELAY_MS,
            backoff_factor: retry_constants::mobile::BACKOFF_FACTOR,
        }
    }

    pub fn for_client(client: ClientClass) -> Self {
        match client {
            ClientClass::Standard => Self::standard(),
            ClientClass::Mobile => Self::mobile(),
        }
    }

    /// Total calls the policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay slept before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.min(i32::MAX as u32) as i32;
        let raw_ms = self.initial_delay_ms as f64 * self.backoff_factor.powi(exponent);
        let capped_ms = raw_ms.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_secs_f64(capped_ms / 1000.0)
    }

    /// Delay before retry `retry`, stretched to a provider hint when given
    pub fn delay_with_hint(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let scheduled = self.delay_for(retry);
        match hint {
            Some(hint) => scheduled.max(hint.min(Duration::from_millis(self.max_delay_ms))),
            None => scheduled,
        }
    }

    /// Full delay schedule, one entry per retry
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_retries).map(|retry| self.delay_for(retry))
    }
}

/// Run `operation` until it succeeds or the policy's budget is spent.
///
/// The closure receives the 1-based attempt number. The last error is
/// returned unchanged once retries are exhausted.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff_observed(policy, operation_name, operation, |_, _| {}).await
}

/// Like [`retry_with_backoff`], reporting `(retry, delay)` before each sleep
pub async fn retry_with_backoff_observed<T, F, Fut, O>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
    mut on_retry: O,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    O: FnMut(u32, Duration),
{
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt > policy.max_retries {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %err,
                        "Retry budget exhausted"
                    );
                    return Err(err);
                }

                let delay = policy.delay_with_hint(attempt, err.retry_after());
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Attempt failed, backing off"
                );
                on_retry(attempt, delay);
                sleep(delay).await;
            }
        }
    }
}
