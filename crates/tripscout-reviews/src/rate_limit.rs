//! Rate limiting and retry utilities for outbound provider calls.
//!
//! [`RateLimiter`] spaces out dispatches to the review-detail provider so
//! consecutive calls start at least `min_interval` apart. [`retry_with_backoff`]
//! retries transient HTTP failures (429, network errors, 5xx) with jittered
//! exponential backoff under a [`RetryPolicy`]. Non-retriable errors
//! propagate immediately.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ProviderError;

/// Serializes task dispatch to a minimum inter-start spacing.
///
/// Tasks are admitted in FIFO order through a fair async mutex that guards
/// the last dispatch time. Only the dispatch is serialized: once a task has
/// started, the next waiter may start as soon as the interval elapses, even
/// if the earlier task is still running. A task failing has no effect on
/// the tasks queued behind it.
///
/// Construct one per process and share it with `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits for the next dispatch slot, then runs `task` and returns its output.
    ///
    /// The first task ever scheduled starts immediately.
    pub async fn schedule<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire_slot().await;
        task().await
    }

    async fn acquire_slot(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// How many times, and how patiently, a transient failure is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// No retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }
}

/// Returns `true` if `err` represents a transient condition worth retrying.
///
/// Retriable:
/// - [`ProviderError::RateLimited`]: HTTP 429.
/// - [`ProviderError::Http`]: network-level failure (connection reset, timeout).
/// - [`ProviderError::UnexpectedStatus`] with a 5xx status.
///
/// Everything else (404, 4xx, malformed bodies, bad base URLs) is returned
/// immediately.
pub(crate) fn is_retriable(err: &ProviderError) -> bool {
    match err {
        ProviderError::RateLimited { .. } | ProviderError::Http(_) => true,
        ProviderError::UnexpectedStatus { status, .. } => *status >= 500,
        ProviderError::Deserialize { .. }
        | ProviderError::NotFound { .. }
        | ProviderError::Timeout { .. }
        | ProviderError::InvalidBaseUrl { .. } => false,
    }
}

/// Executes `operation` with jittered exponential backoff on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 500`:
///
/// | Attempt | Sleep before next attempt    |
/// |---------|------------------------------|
/// | 1       | 500 ms × 2⁰ ± 25 % jitter    |
/// | 2       | 500 ms × 2¹ ± 25 % jitter    |
/// | 3       | 500 ms × 2² ± 25 % jitter    |
///
/// Delay is capped at 30 s. With `max_retries = 2` the operation runs at
/// most 3 times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    const MAX_DELAY_MS: u64 = 30_000;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient provider error, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
