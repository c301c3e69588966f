//! Configuration for the prefetch engine.
//!
//! All knobs are clamped into safe ranges when a run starts, so callers
//! can pass whatever the UI collected without pre-validating.

use std::time::Duration;

/// Default number of concurrent fetch workers.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Minimum number of concurrent fetch workers.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum number of concurrent fetch workers.
///
/// Public tile servers rate-limit aggressively; more workers than this
/// mostly produces 429s.
pub const MAX_CONCURRENCY: usize = 16;

/// Default number of retries after a transient failure.
pub const DEFAULT_RETRY_LIMIT: u32 = 2;

/// Maximum number of retries after a transient failure.
pub const MAX_RETRY_LIMIT: u32 = 5;

/// Default base delay for linear retry backoff, in milliseconds.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;

/// Maximum base delay for linear retry backoff, in milliseconds.
pub const MAX_RETRY_BASE_DELAY_MS: u64 = 5_000;

/// Tuning knobs for a prefetch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Number of concurrent fetch workers, clamped to `[1, 16]`.
    pub concurrency: usize,
    /// Retries after a transient failure, clamped to `[0, 5]`.
    pub retry_limit: u32,
    /// Base delay for linear backoff in milliseconds, clamped to `[0, 5000]`.
    ///
    /// Attempt `n` waits `base * n` before retrying.
    pub retry_base_delay_ms: u64,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

impl PrefetchConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with every field clamped into its valid range.
    pub fn clamped(&self) -> Self {
        Self {
            concurrency: self.concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY),
            retry_limit: self.retry_limit.min(MAX_RETRY_LIMIT),
            retry_base_delay_ms: self.retry_base_delay_ms.min(MAX_RETRY_BASE_DELAY_MS),
        }
    }

    /// Backoff delay before retry attempt `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms * attempt as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PrefetchConfig::default();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.retry_limit, DEFAULT_RETRY_LIMIT);
        assert_eq!(config.retry_base_delay_ms, DEFAULT_RETRY_BASE_DELAY_MS);
    }

    #[test]
    fn test_clamped_limits_concurrency() {
        let config = PrefetchConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert_eq!(config.clamped().concurrency, MIN_CONCURRENCY);

        let config = PrefetchConfig {
            concurrency: 100,
            ..Default::default()
        };
        assert_eq!(config.clamped().concurrency, MAX_CONCURRENCY);
    }

    #[test]
    fn test_clamped_limits_retries_and_delay() {
        let config = PrefetchConfig {
            retry_limit: 50,
            retry_base_delay_ms: 60_000,
            ..Default::default()
        };
        let clamped = config.clamped();
        assert_eq!(clamped.retry_limit, MAX_RETRY_LIMIT);
        assert_eq!(clamped.retry_base_delay_ms, MAX_RETRY_BASE_DELAY_MS);
    }

    #[test]
    fn test_clamped_preserves_valid_values() {
        let config = PrefetchConfig {
            concurrency: 4,
            retry_limit: 1,
            retry_base_delay_ms: 100,
        };
        assert_eq!(config.clamped(), config);
    }

    #[test]
    fn test_backoff_is_linear() {
        let config = PrefetchConfig {
            retry_base_delay_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.backoff_delay(1), Duration::from_millis(250));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(500));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(750));
    }

    #[test]
    fn test_zero_base_delay_means_no_wait() {
        let config = PrefetchConfig {
            retry_base_delay_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.backoff_delay(3), Duration::ZERO);
    }
}
