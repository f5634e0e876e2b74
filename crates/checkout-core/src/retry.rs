//! # Retry Policy
//!
//! The single retry/backoff policy applied to widget initialization.
//! Submission and confirmation are never retried automatically:
//! re-submitting a payment artifact risks duplicate charges.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential-backoff policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum automatic retries after the initial attempt; exhausting
    /// them surfaces the failure
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Ceiling applied to the computed delay
    pub cap_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, cap_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            cap_delay,
        }
    }

    /// Backoff before retrying after the given zero-based failed attempt:
    /// `base * 2^attempt`, capped at `cap_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2_u32.saturating_pow(attempt));
        exp.min(self.cap_delay)
    }

    /// Whether another automatic retry is allowed after `attempt`
    /// failures so far.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    /// Three automatic retries, 1s base, 5s cap: the
    /// widget-initialization defaults.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            cap_delay: Duration::from_millis(5000),
        }
    }
}

/// Per-session retry bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    /// Failed attempts so far; never exceeds the policy's `max_attempts`
    pub attempt: u32,
}

impl RetryState {
    pub fn record_failure(&mut self) {
        self.attempt += 1;
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_sequence() {
        let policy = RetryPolicy::new(
            3,
            Duration::from_millis(1000),
            Duration::from_millis(5000),
        );

        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        // Cap kicks in from the fourth delay onward
        assert_eq!(policy.delay_for(3), Duration::from_millis(5000));
        assert_eq!(policy.delay_for(10), Duration::from_millis(5000));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        // The third retry is the last; a fourth failure is terminal
        assert!(!policy.allows_retry(3));
    }

    #[test]
    fn test_retry_state() {
        let mut state = RetryState::default();
        state.record_failure();
        state.record_failure();
        assert_eq!(state.attempt, 2);
        state.reset();
        assert_eq!(state.attempt, 0);
    }
}
