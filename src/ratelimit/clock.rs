//! Time sources for the limiter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::Utc;

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock anchored at construction and advanced monotonically.
///
/// Steps of the system clock after construction (NTP corrections, manual
/// changes) do not move this clock backwards.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    anchor_millis: u64,
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            // Pre-epoch wall clocks are clamped rather than wrapped.
            anchor_millis: Utc::now().timestamp_millis().max(0) as u64,
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        self.anchor_millis + self.anchor.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and the simulator to drive windows deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    /// Set the absolute time.
    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Move the clock forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);

        clock.advance(250);
        assert_eq!(clock.now_millis(), 1_250);

        clock.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock::new().now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_system_clock_never_goes_backwards() {
        let clock = SystemClock::new();
        let mut previous = clock.now_millis();
        for _ in 0..1_000 {
            let now = clock.now_millis();
            assert!(now >= previous);
            previous = now;
        }
    }
}
