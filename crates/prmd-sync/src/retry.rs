//! Retry budget and exponential backoff

use std::time::Duration;

/// Default number of attempts for fetches and writes.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Bounded retry with exponential backoff.
///
/// The delay after failed attempt `n` (1-based) is `base_delay * 2^(n-1)`.
/// No delay follows the last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay to wait after attempt `attempt` failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Whether another attempt may follow attempt `attempt`.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// All delays a run can wait through when every attempt fails.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).map(|attempt| self.delay_after(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let delays: Vec<_> = policy.schedule().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn test_default_matches_one_two_four_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_large_attempts_saturate() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert_eq!(policy.delay_after(40), Duration::from_secs(u64::from(u32::MAX)));
    }

    #[test]
    fn test_allows_retry_after() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
    }

    #[test]
    fn test_single_attempt_has_no_schedule() {
        let policy = RetryPolicy::new(1, Duration::from_secs(1));
        assert_eq!(policy.schedule().count(), 0);
    }
}
