//! Brightness resolver.
//!
//! A Hue bridge reports brightness as though every transition completed
//! instantly: right after a raise starts it already claims the target, and
//! right after a stop it keeps reporting the old target for a few seconds.
//! Reading that value back to compute the next transition would make a
//! dim-stop-dim sequence jump.
//!
//! The resolver substitutes a locally computed estimate while a record's
//! guard window is active (sweep time plus a settle buffer for moving records,
//! the settle buffer alone for stopped ones). Once the window has elapsed the
//! bridge value is trusted again and the record is pruned.

use std::sync::Arc;

use crate::constants::DEFAULT_SETTLE_BUFFER;
use crate::tracker::{TransitionRecord, TransitionTracker};

/// Outcome of a single resolution, kept for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// No record for the id; the reported value is used as-is.
    Untracked(f64),
    /// The guard window has elapsed; the record was pruned.
    Expired(f64),
    /// Guard active and the light is stopped; the frozen value is used.
    Held(f64),
    /// Guard active and the light is moving; the extrapolated value is used.
    Predicted(f64),
}

impl Resolution {
    pub fn brightness(self) -> f64 {
        match self {
            Resolution::Untracked(value)
            | Resolution::Expired(value)
            | Resolution::Held(value)
            | Resolution::Predicted(value) => value,
        }
    }
}

/// Decides whether to trust a reported brightness or predict one.
pub struct BrightnessResolver {
    tracker: Arc<TransitionTracker>,
    settle_buffer: f64,
    debug_enabled: bool,
}

impl BrightnessResolver {
    pub fn new(tracker: Arc<TransitionTracker>) -> Self {
        Self {
            tracker,
            settle_buffer: DEFAULT_SETTLE_BUFFER,
            debug_enabled: false,
        }
    }

    pub fn with_settle_buffer(mut self, settle_buffer: f64) -> Self {
        self.settle_buffer = settle_buffer.max(0.0);
        self
    }

    pub fn with_debug(mut self, debug_enabled: bool) -> Self {
        self.debug_enabled = debug_enabled;
        self
    }

    pub fn tracker(&self) -> &Arc<TransitionTracker> {
        &self.tracker
    }

    pub fn settle_buffer(&self) -> f64 {
        self.settle_buffer
    }

    /// The brightness to use as the starting point for the next command on `id`.
    ///
    /// Always returns a value in [0, 100].
    pub fn resolve(&self, id: &str, reported: f64) -> f64 {
        self.resolve_detailed(id, reported).brightness()
    }

    /// Like [`resolve`](Self::resolve), but reports which branch was taken.
    pub fn resolve_detailed(&self, id: &str, reported: f64) -> Resolution {
        let reported = clamp_brightness(reported);

        let Some(record) = self.tracker.get(id) else {
            return Resolution::Untracked(reported);
        };

        let elapsed = (self.tracker.now() - record.timestamp).max(0.0);

        if elapsed > record.guard_seconds(self.settle_buffer) {
            self.tracker.prune_if_unchanged(id, record.timestamp);
            return Resolution::Expired(reported);
        }

        let resolution = Self::within_guard(&record, elapsed);

        if self.debug_enabled {
            match resolution {
                Resolution::Held(held) => log_debug!(
                    "CACHE [{id}]: Guard active (stationary). Ignoring reported {reported:.1}%, holding {held:.1}%"
                ),
                Resolution::Predicted(predicted) => log_debug!(
                    "CACHE [{id}]: Guard active ({}). Ignoring reported {reported:.1}%, predicted {predicted:.1}%",
                    record.direction.as_str()
                ),
                _ => {}
            }
        }

        resolution
    }

    fn within_guard(record: &TransitionRecord, elapsed: f64) -> Resolution {
        if record.direction.is_moving() {
            Resolution::Predicted(clamp_brightness(record.predict(elapsed)))
        } else {
            Resolution::Held(clamp_brightness(record.start_brightness))
        }
    }
}

/// Clamp into the [0, 100] brightness range; NaN becomes 0.
pub fn clamp_brightness(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
