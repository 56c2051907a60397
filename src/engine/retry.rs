//! Retry pass backoff
//!
//! Binary exponential backoff with jitter between retry passes:
//! - delay = base · 2^(pass-1), capped at `max_delay`
//! - ±25% jitter when enabled
//! - passes bounded by `max_retries`

use crate::engine::state::DEFAULT_MAX_RETRIES;
use std::time::Duration;

/// Base delay before the first retry pass (1 second)
pub const BASE_DELAY_MS: u64 = 1000;

/// Maximum delay cap (16 seconds)
pub const MAX_DELAY_MS: u64 = 16000;

/// Bounded retry policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: BASE_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: max_delay_ms.max(base_delay_ms),
            jitter: true,
        }
    }

    /// No waiting between passes
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter: false,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before retry pass number `pass` (1-based)
    pub fn delay_for(&self, pass: u32) -> Duration {
        let exponent = pass.saturating_sub(1).min(31);
        let exponential = self.base_delay_ms.saturating_mul(2u64.pow(exponent));
        let delay_ms = exponential.min(self.max_delay_ms);

        let final_delay = if self.jitter && delay_ms > 0 {
            let jitter = (delay_ms / 4) as f64;
            let offset = (rand::random::<f64>() * 2.0 - 1.0) * jitter;
            ((delay_ms as f64) + offset).max(0.0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }

    /// Upper bound on total backoff across every pass, before jitter
    pub fn max_total_wait(&self) -> Duration {
        let total: u64 = (1..=self.max_retries)
            .map(|pass| {
                let exponent = pass.saturating_sub(1).min(31);
                self.base_delay_ms
                    .saturating_mul(2u64.pow(exponent))
                    .min(self.max_delay_ms)
            })
            .sum();
        Duration::from_millis(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_without_jitter() {
        let policy = RetryPolicy::default().without_jitter();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(6), Duration::from_millis(16000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(16000));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.delay_for(2).as_millis();
            assert!((1500..=2500).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn test_immediate() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert_eq!(policy.max_total_wait(), Duration::ZERO);
    }

    #[test]
    fn test_max_total_wait() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_total_wait(), Duration::from_millis(3000));

        let capped = RetryPolicy::new(6, 1000, 4000);
        assert_eq!(capped.max_total_wait(), Duration::from_millis(1000 + 2000 + 4000 * 4));
    }
}
