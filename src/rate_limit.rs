//! Rate limiter and backoff controller for the primary provider
//!
//! A single shared gate guards every call to the primary provider. The gate
//! is a single-slot throttle, not a token bucket: concurrent callers queue on
//! the lock and are released one at a time, each re-measuring the minimum
//! interval against the timestamp the previous caller stamped.

use crate::constants::{MAX_RETRY_ATTEMPTS, MIN_REQUEST_INTERVAL_SECS, RETRY_BASE_DELAY_SECS};
use crate::error::ProviderError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Serializes outbound primary-provider calls and retries rate-limited ones
pub struct RateLimiter {
    min_interval: Duration,
    base_delay: Duration,
    max_attempts: u32,
    /// Start time of the last call released through the gate
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with the engine's default spacing and retry policy
    pub fn new() -> Self {
        Self::with_policy(
            Duration::from_secs(MIN_REQUEST_INTERVAL_SECS),
            Duration::from_secs(RETRY_BASE_DELAY_SECS),
            MAX_RETRY_ATTEMPTS,
        )
    }

    /// Creates a limiter with a custom policy
    pub fn with_policy(min_interval: Duration, base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            min_interval,
            base_delay,
            max_attempts,
            last_call: Mutex::new(None),
        }
    }

    /// Blocks until the minimum interval since the previous gated call has
    /// elapsed, then stamps the new call's start time.
    ///
    /// The lock is held across the sleep so a queued caller always measures
    /// against the freshest timestamp.
    async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }

        *last_call = Some(Instant::now());
    }

    /// Sleeps for the minimum interval, as an explicit pause between two
    /// related calls on top of the gate itself.
    pub async fn pause(&self) {
        sleep(self.min_interval).await;
    }

    /// Runs a gated operation, retrying on rate-limit responses with
    /// exponential backoff.
    ///
    /// Each attempt passes through the gate. On `RateLimited` the controller
    /// sleeps `base_delay * 2^attempt` (attempt zero-indexed) before the next
    /// try; the backoff sleep happens outside the gate lock so unrelated
    /// work keeps flowing. After the final attempt `RateLimited` surfaces to
    /// the caller. Any other error propagates immediately.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        for attempt in 0..self.max_attempts {
            self.acquire().await;

            match op().await {
                Ok(value) => return Ok(value),
                Err(ProviderError::RateLimited) if attempt + 1 < self.max_attempts => {
                    let delay = self.base_delay * 2u32.pow(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_secs = delay.as_secs(),
                        "provider rate limited, backing off"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(ProviderError::RateLimited)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
