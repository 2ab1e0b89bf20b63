//! Retry schedule for a single provider call.

use std::time::Duration;

use broadside_common::config::RetryConfig;

/// Capped exponential backoff with a fixed attempt ceiling.
///
/// The computed wait for attempt `n` is `min(base * 2^(n - 1), max)`; a
/// provider-supplied `Retry-After` hint takes precedence over the computed
/// value.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    /// Total attempt ceiling, including the first try.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetrySchedule {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: Duration::from_secs(config.base_backoff_secs),
            max_backoff: Duration::from_secs(config.max_backoff_secs),
        }
    }
}

impl RetrySchedule {
    /// Backoff before the retry following attempt `attempt` (1-indexed).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        if exponent >= 63 {
            return self.max_backoff;
        }
        let multiplier = 1u64 << exponent;
        let base_secs = self.base_backoff.as_secs();
        Duration::from_secs(
            base_secs
                .saturating_mul(multiplier)
                .min(self.max_backoff.as_secs()),
        )
    }
}

/// Parse a `Retry-After: <seconds>` header value.
#[must_use]
pub(crate) fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
