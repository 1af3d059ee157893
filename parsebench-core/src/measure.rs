//! Wall-Clock Timing
//!
//! Monotonic timing on top of `std::time::Instant`, reported in milliseconds.

use std::time::Duration;

/// Monotonic instant
#[derive(Debug, Clone, Copy)]
pub struct Instant {
    instant: std::time::Instant,
}

impl Instant {
    /// Capture current instant
    #[inline(always)]
    pub fn now() -> Self {
        Self {
            instant: std::time::Instant::now(),
        }
    }

    /// Compute elapsed time since this instant
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }
}

/// Timer for a single timed region
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time in milliseconds
    #[inline(always)]
    pub fn stop_ms(&self) -> f64 {
        duration_ms(self.start.elapsed())
    }
}

/// Convert a duration to fractional milliseconds
#[inline]
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
