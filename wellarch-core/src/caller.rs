//! Rate-limited, concurrency-bounded, retrying provider calls.
//!
//! One [`RateLimitedCaller`] is built per process and shared by every pillar
//! evaluation, so its limits hold across the whole assessment rather than per
//! pillar.
//!
//! ```text
//! attempt n ──▶ token bucket (≤ admission_wait) ──▶ semaphore permit
//!     ▲                                                │
//!     │                          timeout(call_timeout, op())
//!     │                                                │
//!     └──── on error: release permit, sleep(n × backoff) ◀┘
//! ```

use std::future::Future;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::LimitsConfig;
use crate::error::ProviderError;

/// Shared gate in front of every language-model call.
pub struct RateLimitedCaller {
    limiter: DefaultDirectRateLimiter,
    permits: Semaphore,
    max_concurrent: usize,
    attempts: u32,
    backoff: Duration,
    call_timeout: Duration,
    admission_wait: Duration,
}

impl RateLimitedCaller {
    pub fn new(limits: &LimitsConfig) -> Self {
        let rate = NonZeroU32::new(limits.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let max_concurrent = limits.max_concurrent.max(1);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate)),
            permits: Semaphore::new(max_concurrent),
            max_concurrent,
            attempts: limits.retry_attempts.max(1),
            backoff: limits.retry_backoff(),
            call_timeout: limits.call_timeout(),
            admission_wait: limits.admission_wait(),
        }
    }

    /// Maximum number of operations allowed in flight.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Operations currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Run `op` under the shared limits.
    ///
    /// `op` is invoked once per attempt. Every attempt takes its own token
    /// and permit; the permit is released before the backoff sleep. Every
    /// error kind is retried the same way; only after the last attempt fails
    /// does the caller see [`ProviderError::RetriesExhausted`].
    pub async fn call<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut last_error = None;
        for attempt in 1..=self.attempts {
            self.admit(operation).await;
            let permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| ProviderError::Request("rate limiter closed".to_string()))?;

            let started = Instant::now();
            let outcome = match tokio::time::timeout(self.call_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(self.call_timeout)),
            };
            let latency_ms = started.elapsed().as_millis() as u64;
            drop(permit);

            match outcome {
                Ok(value) => {
                    info!(op = operation, attempt, latency_ms, success = true, "provider call");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        op = operation,
                        attempt,
                        latency_ms,
                        success = false,
                        error = %e,
                        "provider call"
                    );
                    last_error = Some(e);
                    if attempt < self.attempts {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        Err(ProviderError::RetriesExhausted {
            operation: operation.to_string(),
            attempts: self.attempts,
            last: Box::new(
                last_error.unwrap_or_else(|| ProviderError::Request("no attempt made".into())),
            ),
        })
    }

    /// Wait for a token, but never longer than the admission limit.
    async fn admit(&self, operation: &str) {
        if tokio::time::timeout(self.admission_wait, self.limiter.until_ready())
            .await
            .is_err()
        {
            debug!(
                op = operation,
                waited_ms = self.admission_wait.as_millis() as u64,
                "token bucket empty, admitting anyway"
            );
        }
    }
}
