//! Time source abstraction for the transition tracker.
//!
//! The tracker stamps records and the resolver measures elapsed time through
//! the [`TimeSource`] trait, so the daemon can run on a monotonic clock while
//! tests step a [`ManualTimeSource`] through exact elapsed values.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Trait for abstracting time operations.
pub trait TimeSource: Send + Sync {
    /// Current time in seconds. Only differences between readings are meaningful.
    fn now(&self) -> f64;
}

/// Monotonic clock measuring seconds since the source was created.
pub struct MonotonicTimeSource {
    origin: Instant,
}

impl MonotonicTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTimeSource {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually driven clock for tests and scripted scenarios.
///
/// Time only moves when [`set`](Self::set) or [`advance`](Self::advance) is
/// called, which makes elapsed-time boundaries exact.
pub struct ManualTimeSource {
    current: Mutex<f64>,
}

impl ManualTimeSource {
    /// Create a clock reading `start` seconds.
    pub fn new(start: f64) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Jump to an absolute reading.
    pub fn set(&self, seconds: f64) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = seconds;
    }

    /// Move forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) += seconds;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> f64 {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
