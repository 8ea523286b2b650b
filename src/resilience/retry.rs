//! Retry with exponential backoff
//!
//! A retried operation moves through `Attempting(1) .. Attempting(n)` and
//! ends in exactly one of: success, [`CacheError::Cancelled`], or
//! [`CacheError::RetryExhausted`] carrying the last failure.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{BoxError, CacheError, Result};

// == Retry Policy ==
/// Retry policy with exponential backoff
///
/// The delay before attempt `k + 1` is `base_delay * multiplier^(k - 1)`,
/// optionally capped by `max_delay`.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    /// Default: 3
    pub max_attempts: u32,

    /// Delay before the second attempt
    /// Default: 100ms
    pub base_delay: Duration,

    /// Multiplier for exponential backoff
    /// Default: 2.0
    pub multiplier: f64,

    /// Upper bound for a single delay
    /// Default: none
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
            max_delay: None,
        }
    }

    /// Caps every backoff delay at `max_delay`.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Rejects a zero attempt budget and non-positive or non-finite multipliers.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(CacheError::InvalidArgument(
                "max_attempts must be positive".to_string(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(CacheError::InvalidArgument(format!(
                "backoff multiplier must be a positive number, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }

    /// Delay to wait after failed attempt `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);

        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

// == Retry Loop ==
/// Runs `operation` until it succeeds, the policy's attempts run out, or
/// `cancel` fires.
///
/// Cancellation is checked before every attempt and interrupts backoff
/// sleeps. An operation failing with [`CacheError::Cancelled`] or
/// [`CacheError::InvalidArgument`] ends the retry loop immediately with that
/// outcome; any other failure is retried and reported as
/// [`CacheError::ComputationFailed`].
pub async fn retry_async<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<BoxError>,
{
    policy.validate()?;

    let mut attempt: u32 = 1;
    loop {
        if cancel.is_cancelled() {
            debug!(attempt, "retry cancelled before attempt");
            return Err(CacheError::Cancelled);
        }

        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => match CacheError::computation(e) {
                err @ CacheError::ComputationFailed(_) => err,
                // Neither outcome changes on another attempt.
                err @ (CacheError::Cancelled | CacheError::InvalidArgument(_)) => {
                    return Err(err)
                }
                other => CacheError::ComputationFailed(Box::new(other)),
            },
        };

        if attempt >= policy.max_attempts {
            warn!(attempts = attempt, error = %err, "all retry attempts failed");
            return Err(CacheError::RetryExhausted {
                attempts: attempt,
                last: Box::new(err),
            });
        }

        let delay = policy.delay_after(attempt);
        warn!(
            "Operation failed (attempt {}/{}), retrying in {:?}: {}",
            attempt, policy.max_attempts, delay, err
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CacheError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
