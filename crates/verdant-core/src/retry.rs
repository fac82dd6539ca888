//! Retry policy shared by every outbound call.
//!
//! Errors report their own retryability through [`Retryable`]; the policy
//! owns the attempt budget and the exponential backoff schedule.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retryability classification for an outbound failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Temporary,
    Permanent,
}

/// Implemented by error types that can be fed to [`RetryPolicy::run`].
pub trait Retryable {
    fn kind(&self) -> ErrorKind;
}

/// Attempt budget plus exponential backoff (`base * 2^(n-1)`, capped at `max_delay`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never below 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(4), Duration::from_secs(10))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// A policy that retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned
    /// unchanged so callers keep its classification.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempt = 1;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if err.kind() == ErrorKind::Permanent {
                warn!("{label}: permanent failure on attempt {attempt}: {err}");
                return Err(err);
            }

            if attempt >= self.max_attempts {
                warn!(
                    "{label}: giving up after {attempt}/{} attempts: {err}",
                    self.max_attempts
                );
                return Err(err);
            }

            let delay = self.delay_after(attempt);
            warn!(
                "{label}: attempt {attempt}/{} failed ({err}), retrying in {}ms",
                self.max_attempts,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
