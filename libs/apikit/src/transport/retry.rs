//! Retry policy for transport failures.
//!
//! `max_attempts` counts every attempt including the first one, so a policy with
//! `max_attempts = 1` never retries. Waits grow by a factor of 1.5 starting at
//! `period` and never exceed `max_period`.

use std::time::Duration;

const BACKOFF_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before the first retry.
    pub period: Duration,
    /// Upper bound for any single wait.
    pub max_period: Duration,
    /// Total attempts per call, including the initial one.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(10), 5)
    }
}

impl RetryPolicy {
    pub const fn new(period: Duration, max_period: Duration, max_attempts: u32) -> Self {
        Self {
            period,
            max_period,
            max_attempts,
        }
    }

    /// A policy that makes exactly one attempt.
    pub const fn never() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 1)
    }

    /// Fresh per-call state.
    pub fn retryer(&self) -> Retryer {
        Retryer {
            policy: *self,
            attempt: 1,
        }
    }
}

/// Per-call retry state. Not shared between calls.
#[derive(Debug, Clone)]
pub struct Retryer {
    policy: RetryPolicy,
    attempt: u32,
}

impl Retryer {
    /// Number of the attempt currently in flight, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Wait before the next attempt, or `None` once attempts are exhausted.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_attempts {
            return None;
        }
        let exponent = i32::try_from(self.attempt - 1).unwrap_or(i32::MAX);
        self.attempt += 1;

        let base = self.policy.period.as_nanos() as f64;
        let wait = (base * BACKOFF_MULTIPLIER.powi(exponent)).round();
        let capped = wait.min(self.policy.max_period.as_nanos() as f64);
        Some(Duration::from_nanos(capped as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_grow_geometrically_and_are_capped() {
        let policy = RetryPolicy::new(Duration::from_millis(100), Duration::from_millis(300), 6);
        let mut retryer = policy.retryer();

        let waits: Vec<_> = std::iter::from_fn(|| retryer.next_backoff()).collect();
        assert_eq!(
            waits,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(150),
                Duration::from_millis(225),
                Duration::from_millis(300),
                Duration::from_millis(300),
            ]
        );
        assert_eq!(retryer.attempt(), 6);
    }

    #[test]
    fn max_attempts_counts_the_initial_call() {
        let tick = Duration::from_millis(1);
        let mut single = RetryPolicy::new(tick, tick, 1).retryer();
        assert_eq!(single.next_backoff(), None);

        let mut zero = RetryPolicy::new(tick, tick, 0).retryer();
        assert_eq!(zero.next_backoff(), None);

        let mut never = RetryPolicy::never().retryer();
        assert_eq!(never.next_backoff(), None);
    }

    #[test]
    fn each_call_gets_independent_state() {
        let policy = RetryPolicy::new(Duration::from_millis(10), Duration::from_secs(1), 2);
        let mut first = policy.retryer();
        assert!(first.next_backoff().is_some());
        assert!(first.next_backoff().is_none());

        let mut second = policy.retryer();
        assert!(second.next_backoff().is_some());
    }
}
