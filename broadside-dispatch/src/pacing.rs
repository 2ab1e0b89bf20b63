//! Aggregate message-issuance pacing.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Reserves issue slots so the fleet-wide send rate never exceeds the
/// configured messages-per-second ceiling, regardless of how many
/// concurrency permits are free.
///
/// Each caller reserves the next free slot under the lock and then sleeps
/// until its slot arrives; slots are spaced one inter-message interval
/// apart.
#[derive(Debug)]
pub struct RatePacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RatePacer {
    /// A pacer for the given ceiling. Non-positive ceilings disable
    /// pacing.
    #[must_use]
    pub fn new(messages_per_second: f64) -> Self {
        let interval = if messages_per_second > 0.0 && messages_per_second.is_finite() {
            Duration::from_secs_f64(1.0 / messages_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Reserve the next issue slot and return how long to wait for it.
    fn reserve(&self) -> Duration {
        if self.interval.is_zero() {
            return Duration::ZERO;
        }

        let now = Instant::now();
        let mut next_slot = self.next_slot.lock();
        let slot = match *next_slot {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        *next_slot = Some(slot + self.interval);
        slot - now
    }

    /// Wait for the next issue slot.
    pub async fn acquire(&self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_spaced_one_interval_apart() {
        let pacer = RatePacer::new(10.0); // 100ms interval

        let first = pacer.reserve();
        assert_eq!(first, Duration::ZERO);

        // Immediate follow-up reservations queue behind the first slot.
        let second = pacer.reserve();
        let third = pacer.reserve();
        assert!(second > Duration::ZERO);
        assert!(second <= Duration::from_millis(100));
        assert!(third > second);
        assert!(third <= Duration::from_millis(200));
    }

    #[test]
    fn aggregate_rate_is_bounded_by_the_ceiling() {
        let pacer = RatePacer::new(100.0); // 10ms interval
        let waits: Vec<Duration> = (0..10).map(|_| pacer.reserve()).collect();
        // The tenth reservation is at least 9 intervals out, no matter how
        // fast the callers arrived.
        assert!(waits[9] >= Duration::from_millis(80));
    }

    #[test]
    fn zero_and_infinite_ceilings_disable_pacing() {
        for ceiling in [0.0, -1.0, f64::INFINITY] {
            let pacer = RatePacer::new(ceiling);
            assert_eq!(pacer.reserve(), Duration::ZERO);
            assert_eq!(pacer.reserve(), Duration::ZERO);
        }
    }

    #[tokio::test]
    async fn acquire_returns_immediately_for_the_first_caller() {
        let pacer = RatePacer::new(1.0);
        let started = Instant::now();
        pacer.acquire().await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
