//! Backoff for retryable jobs.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with jitter and a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total deliveries allowed, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Whether a job that just failed its `attempt`-th delivery (zero based) may run again.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }

    /// Delay before redelivering a job that failed its `attempt`-th delivery.
    ///
    /// `base * 2^attempt`, capped at `max_delay`, plus up to half again of jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)));
        let capped = exp.min(self.max_delay);
        let jitter_ms = (capped.as_millis() / 2) as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        capped + Duration::from_millis(jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        }
    }

    #[test]
    fn test_attempt_budget() {
        let p = policy();
        assert!(p.allows_retry(0));
        assert!(p.allows_retry(1));
        assert!(!p.allows_retry(2));
        assert!(!RetryPolicy { max_attempts: 0, ..p }.allows_retry(0));
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let p = policy();
        for (attempt, floor) in [(0u32, 100u64), (1, 200), (2, 400), (3, 800), (4, 1000), (30, 1000)] {
            let delay = p.delay_for(attempt).as_millis() as u64;
            assert!(
                delay >= floor && delay <= floor + floor / 2,
                "attempt {attempt}: {delay}ms outside [{floor}, {}]",
                floor + floor / 2
            );
        }
    }

    #[test]
    fn test_zero_base_has_no_delay() {
        let p = RetryPolicy {
            base_delay: Duration::ZERO,
            ..policy()
        };
        assert_eq!(p.delay_for(5), Duration::ZERO);
    }
}
