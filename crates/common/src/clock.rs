//! Clock capabilities for the wall-clock driven trackers.
//!
//! Rep debouncing and calorie integration both depend on real elapsed time.
//! Every component that needs "now" takes a [`Clock`] instead of reading the
//! system time directly, so tests can drive the state machines with a
//! [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the current time, in fractional seconds.
///
/// Timestamps from a single clock must be non-decreasing; the trackers
/// compare successive readings and assume monotonic time.
pub trait Clock: Send + Sync {
    /// Current time in seconds.
    fn now_secs(&self) -> f64;
}

/// Wall clock reporting seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        micros_to_secs(chrono::Utc::now().timestamp_micros().max(0) as u64)
    }
}

/// A manually advanced clock with microsecond resolution.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start_secs`.
    pub fn new(start_secs: f64) -> Self {
        Self {
            micros: AtomicU64::new(secs_to_micros(start_secs)),
        }
    }

    /// Jump to an absolute time.
    pub fn set_secs(&self, secs: f64) {
        self.micros.store(secs_to_micros(secs), Ordering::SeqCst);
    }

    /// Move the clock forward by `secs`.
    pub fn advance_secs(&self, secs: f64) {
        self.micros
            .fetch_add(secs_to_micros(secs), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        micros_to_secs(self.micros.load(Ordering::SeqCst))
    }
}

fn secs_to_micros(secs: f64) -> u64 {
    (secs.max(0.0) * 1_000_000.0).round() as u64
}

fn micros_to_secs(micros: u64) -> f64 {
    micros as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_epoch_based() {
        // Anything after 2020-01-01.
        assert!(SystemClock.now_secs() > 1_577_836_800.0);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(10.0);
        clock.advance_secs(0.25);
        assert!((clock.now_secs() - 10.25).abs() < 1e-9);
        clock.set_secs(3600.0);
        assert!((clock.now_secs() - 3600.0).abs() < 1e-9);
    }

    #[test]
    fn test_manual_clock_clamps_negative_start() {
        let clock = ManualClock::new(-5.0);
        assert_eq!(clock.now_secs(), 0.0);
    }
}
