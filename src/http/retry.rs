//! Retry with exponential backoff for the provider request.
//!
//! Only transient failures are retried (see [`RetrievalError::is_transient`]);
//! a permanent failure such as a 400 surfaces on the attempt that produced it.

use crate::http::error::RetrievalError;
use log::{error, info, warn};
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    /// Seconds to wait after the first failed attempt; doubles after each further failure.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_factor: backoff_factor.max(0.0),
        }
    }

    /// Wait after the `attempt`-th failure (1-based): `backoff_factor * 2^(attempt - 1)` seconds.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        Duration::from_secs_f64(self.backoff_factor * 2f64.powi(exponent))
    }

    /// Runs `operation` until it succeeds, fails permanently, or `max_attempts` is reached.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, RetrievalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RetrievalError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("Request succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    error!("All {} attempts failed, last error: {}", attempt, e);
                    return Err(RetrievalError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "Attempt {} of {} failed ({}), retrying in {:?}",
                        attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
