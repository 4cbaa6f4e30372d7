//! Bounded retry around calls to the external analysis service
//!
//! Wraps a fallible async operation with exponential backoff, clearing both
//! rate-limiter windows before every attempt and tripping the limiter's
//! cooldown when the service signals quota exhaustion.

use std::future::Future;
use std::sync::Arc;

use tokio::time::{sleep, Duration};

use crate::rate_limiter::RateLimiter;

/// Classification seam between the retry loop and the remote error type
///
/// The analysis-service error enum implements this so the executor can
/// decide without inspecting error strings.
pub trait RetryClass {
    /// Transient condition worth another attempt
    fn is_retryable(&self) -> bool;

    /// Quota/overload signal that should trip the limiter cooldown
    fn is_quota(&self) -> bool;

    /// Error reported when the rate limiter denied every attempt
    fn rate_limited() -> Self;
}

/// Retry policy
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first
    pub max_retries: u32,
    /// Backoff before the first retry, in milliseconds
    pub initial_backoff_ms: u64,
    /// Exponential growth factor per attempt
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Executes remote calls under admission control with bounded retry
pub struct RetryExecutor {
    limiter: Arc<RateLimiter>,
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self::with_config(limiter, RetryConfig::default())
    }

    pub fn with_config(limiter: Arc<RateLimiter>, config: RetryConfig) -> Self {
        Self { limiter, config }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Run `op`, retrying transient failures with exponential backoff
    ///
    /// Both limiter buckets must grant before each attempt; a denied grant
    /// consumes an attempt and backs off like any other transient failure.
    /// A quota-class error marks the limiter exhausted before the next
    /// attempt. After the budget is spent the last error is returned,
    /// never swallowed. `op` is called at most `max_retries + 1` times.
    pub async fn execute<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: RetryClass,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut last_error: Option<E> = None;

        for attempt in 0..=self.config.max_retries {
            if !self.limiter.acquire_all().await {
                log::warn!(
                    "rate limiter denied attempt {}/{}",
                    attempt + 1,
                    self.config.max_retries + 1
                );
                last_error = Some(E::rate_limited());
                if attempt < self.config.max_retries {
                    self.backoff(attempt).await;
                }
                continue;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if e.is_quota() {
                        self.limiter.mark_all_exhausted().await;
                    }
                    if !e.is_retryable() || attempt == self.config.max_retries {
                        return Err(e);
                    }
                    log::debug!(
                        "attempt {}/{} failed, backing off",
                        attempt + 1,
                        self.config.max_retries + 1
                    );
                    last_error = Some(e);
                    self.backoff(attempt).await;
                }
            }
        }

        // Only reachable when the final attempt was denied admission; the
        // op-error path returns inside the loop.
        Err(last_error.unwrap_or_else(E::rate_limited))
    }

    async fn backoff(&self, attempt: u32) {
        let wait_ms = self.config.initial_backoff_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        sleep(Duration::from_millis(wait_ms as u64)).await;
    }
}
