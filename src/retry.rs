//! Bounded retry with per-failure delay selection
//!
//! Network calls and persistence writes share this loop. Generic failures
//! wait a fixed delay; rate-limited failures wait the server-directed
//! duration (or a fallback). Both count against the same attempt budget.

use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why a single attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// HTTP 429; `retry_after` is the server-provided wait, if any
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Timeout, connection failure, unexpected status, or a failed write
    #[error("{0}")]
    Transient(String),

    /// The upstream quota ran out; no further attempt may be issued
    #[error("upstream quota exhausted")]
    QuotaExhausted,
}

/// Terminal failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("{what} failed after {attempts} attempts: {last}")]
    Exhausted {
        what: String,
        attempts: u32,
        last: AttemptError,
    },

    #[error("{what} not issued: upstream quota exhausted")]
    QuotaExhausted { what: String },
}

/// Attempt budget and delay strategy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
    rate_limit_fallback: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration, rate_limit_fallback: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
            rate_limit_fallback,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.retry_delay(),
            config.rate_limit_fallback(),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// How long to wait before the attempt following `error`
    pub fn delay_for(&self, error: &AttemptError) -> Duration {
        match error {
            AttemptError::RateLimited { retry_after } => {
                retry_after.unwrap_or(self.rate_limit_fallback)
            }
            AttemptError::Transient(_) | AttemptError::QuotaExhausted => self.retry_delay,
        }
    }

    /// Runs `op` until it succeeds or the attempt budget is spent
    ///
    /// `op` receives the 1-based attempt number. No delay follows the
    /// final attempt.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut attempt = 1;
        loop {
            let error = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::QuotaExhausted) => {
                    return Err(RetryError::QuotaExhausted {
                        what: what.to_string(),
                    })
                }
                Err(error) => error,
            };

            if attempt >= self.max_attempts {
                return Err(RetryError::Exhausted {
                    what: what.to_string(),
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = self.delay_for(&error);
            tracing::warn!(
                "{} attempt {}/{} failed: {}; retrying in {:?}",
                what,
                attempt,
                self.max_attempts,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Parses a `Retry-After` header value given in (possibly fractional) seconds
///
/// Negative, non-finite and out-of-range values yield `None`, so the caller
/// falls back to its configured delay.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}
