//! Retry policy for outbound API calls.
//!
//! Delays grow geometrically: the wait before retry `k` (1-based) is
//! `initial_delay * backoff_multiplier^(k-1)`.

use std::time::Duration;

use thiserror::Error;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default wait before the first retry.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
/// Default growth factor between retries.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryPolicyError {
    #[error("initial delay must be greater than zero")]
    ZeroDelay,
    #[error("backoff multiplier must be at least 2 (got {0})")]
    MultiplierTooSmall(u32),
    #[error("backoff delay overflows before retry {0}")]
    ScheduleOverflow(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    backoff_multiplier: u32,
}

impl RetryPolicy {
    /// Build a policy, rejecting parameters that would not strictly increase
    /// the delay, including schedules whose last delay is not representable.
    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        backoff_multiplier: u32,
    ) -> Result<Self, RetryPolicyError> {
        if initial_delay.is_zero() {
            return Err(RetryPolicyError::ZeroDelay);
        }
        if backoff_multiplier < 2 {
            return Err(RetryPolicyError::MultiplierTooSmall(backoff_multiplier));
        }
        let policy = Self {
            max_retries,
            initial_delay,
            backoff_multiplier,
        };
        // The last delay is the largest; if it fits, every earlier one does.
        if max_retries > 0 && policy.delay_for_retry(max_retries).is_none() {
            return Err(RetryPolicyError::ScheduleOverflow(max_retries));
        }
        Ok(policy)
    }

    /// A policy that never retries.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_multiplier(&self) -> u32 {
        self.backoff_multiplier
    }

    /// Upper bound on attempts for one call.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry number `retry` (1-based). Returns `None` for retry 0
    /// or past the retry bound.
    pub fn delay_for_retry(&self, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            return None;
        }
        let factor = self.backoff_multiplier.checked_pow(retry - 1)?;
        self.initial_delay.checked_mul(factor)
    }

    /// The full backoff schedule, one entry per allowed retry.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_retries).filter_map(move |k| self.delay_for_retry(k))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}
