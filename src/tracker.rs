//! Transition tracker: last-known transition metadata per light or group.
//!
//! Every raise, lower and stop command overwrites the record for its target.
//! Records are removed lazily by the resolver once their guard window has
//! elapsed, or in bulk by [`TransitionTracker::prune_expired`] before a batch
//! of commands.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::constants::MIN_SWEEP;
use crate::time_source::TimeSource;

/// Direction of the transition a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    /// Stopped or idle. The record freezes the brightness it was written with.
    None,
}

impl Direction {
    pub fn is_moving(self) -> bool {
        self != Direction::None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::None => "none",
        }
    }
}

/// Snapshot of one tracked transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Clock reading (seconds) when the record was written
    pub timestamp: f64,
    /// Brightness at the moment the record was written (0-100)
    pub start_brightness: f64,
    /// Commanded destination, or the frozen value for stopped records (0-100)
    pub target_brightness: f64,
    pub direction: Direction,
    /// Full 0-100% sweep duration in seconds
    pub sweep_seconds: f64,
}

impl TransitionRecord {
    /// Seconds after `timestamp` during which reported brightness is not trusted.
    pub fn guard_seconds(&self, settle_buffer: f64) -> f64 {
        if self.direction.is_moving() {
            self.sweep_seconds + settle_buffer
        } else {
            settle_buffer
        }
    }

    /// Linear estimate of the brightness `elapsed` seconds after the record
    /// was written, never passing the target.
    pub fn predict(&self, elapsed: f64) -> f64 {
        let rate = 100.0 / self.sweep_seconds.max(MIN_SWEEP);
        let delta = rate * elapsed.max(0.0);

        match self.direction {
            Direction::Up => (self.start_brightness + delta).min(self.target_brightness),
            Direction::Down => (self.start_brightness - delta).max(self.target_brightness),
            Direction::None => self.start_brightness,
        }
    }
}

/// Keyed store of transition records with an explicit lifecycle.
///
/// One coarse lock guards the whole map, so a write is never seen half-done
/// and concurrent callers cannot interleave inside a single operation.
pub struct TransitionTracker {
    records: Mutex<HashMap<String, TransitionRecord>>,
    clock: Arc<dyn TimeSource>,
}

impl TransitionTracker {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
        }
    }

    // Records are plain data, so a panic elsewhere cannot leave one half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, TransitionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current reading of the tracker's clock.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Store or overwrite the record for `id`, stamped with the current time.
    pub fn record(
        &self,
        id: &str,
        start_brightness: f64,
        target_brightness: f64,
        direction: Direction,
        sweep_seconds: f64,
    ) {
        let record = TransitionRecord {
            timestamp: self.clock.now(),
            start_brightness,
            target_brightness,
            direction,
            sweep_seconds,
        };
        self.lock().insert(id.to_string(), record);
    }

    /// Read-only lookup.
    pub fn get(&self, id: &str) -> Option<TransitionRecord> {
        self.lock().get(id).copied()
    }

    /// Remove the record for `id`.
    pub fn prune(&self, id: &str) {
        self.lock().remove(id);
    }

    /// Remove the record for `id` only if it is still the one written at
    /// `timestamp`. Returns whether a record was removed.
    pub fn prune_if_unchanged(&self, id: &str, timestamp: f64) -> bool {
        let mut records = self.lock();
        match records.get(id) {
            Some(record) if record.timestamp == timestamp => {
                records.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Drop every record whose guard window has elapsed. Returns how many were removed.
    pub fn prune_expired(&self, settle_buffer: f64) -> usize {
        let now = self.clock.now();
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| now - record.timestamp <= record.guard_seconds(settle_buffer));
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget everything (daemon shutdown).
    pub fn clear(&self) {
        self.lock().clear();
    }
}
