//! Retrying chat calls that time out or lose their connection
//!
//! Any other error is returned on the first failure. Deep research is never
//! retried; a lost research task is reported as a failed domain instead.

use crate::{LLMError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Delay {
    Fixed(Duration),
    Exponential {
        initial: Duration,
        max: Duration,
        factor: f64,
    },
}

/// How many times to attempt a call and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Delay,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::converse_default()
    }
}

impl RetryPolicy {
    /// `max_attempts` tries (including the first), `delay` apart
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Delay::Fixed(delay),
        }
    }

    /// Waits grow by `factor` from `initial`, capped at `max`
    pub fn exponential(max_attempts: u32, initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Delay::Exponential {
                initial,
                max,
                factor,
            },
        }
    }

    /// One retry after a 3 second pause
    pub fn converse_default() -> Self {
        Self::fixed(2, Duration::from_secs(3))
    }

    /// Millisecond waits, for tests
    pub fn fast() -> Self {
        Self::exponential(3, Duration::from_millis(10), Duration::from_millis(100), 2.0)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before retry number `retry` (1-based)
    fn delay_before(&self, retry: u32) -> Duration {
        match self.delay {
            Delay::Fixed(delay) => delay,
            Delay::Exponential {
                initial,
                max,
                factor,
            } => {
                let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
                let secs = initial.as_secs_f64() * factor.powi(exponent);
                Duration::from_secs_f64(secs.clamp(0.0, max.as_secs_f64()))
            }
        }
    }

    /// Run `call` until it succeeds, fails with a non-transient error, or
    /// the attempts run out; the last error is returned
    pub async fn execute<F, Fut, T>(&self, label: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let error = match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("[{}] succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !is_transient(&error) {
                return Err(error);
            }
            if attempt >= self.max_attempts {
                warn!("[{}] giving up after {} attempt(s): {}", label, attempt, error);
                return Err(error);
            }

            let wait = self.delay_before(attempt);
            warn!(
                "[{}] attempt {}/{} failed ({}), retrying in {:?}",
                label, attempt, self.max_attempts, error, wait
            );
            sleep(wait).await;
            attempt += 1;
        }
    }
}

fn is_transient(error: &LLMError) -> bool {
    error.is_timeout_or_disconnect()
}
