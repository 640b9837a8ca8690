//! Transition command builder, stop handler and batch command handlers.
//!
//! The dimmer is the only component that both talks to the bridge and writes
//! the transition tracker. Every brightness command follows the same shape:
//! read what the bridge reports, run it through the [`BrightnessResolver`],
//! issue the device command, then record what was asked for. Bridge failures
//! are logged and swallowed here; the tracker is updated optimistically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bridge::{
    AttributePayload, LightBridge, LightBridgeExt, LightTarget, ResourceState, TransitionCommand,
    kelvin_to_mirek, mirek_to_kelvin,
};
use crate::constants::{
    BRIGHTNESS_EPSILON, DEFAULT_MAX_BRIGHTNESS, DEFAULT_MIN_BRIGHTNESS, DEFAULT_MIN_STEP,
    DEFAULT_SWEEP_TIME, MIN_SWEEP, NOMINAL_SWEEP,
};
use crate::resolver::{BrightnessResolver, clamp_brightness};
use crate::tracker::Direction;

/// Tunables the dimmer reads on every command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimmerSettings {
    /// Default full-sweep duration in seconds
    pub sweep_time: f64,
    /// Smallest brightness change worth sending
    pub min_step: f64,
    /// Emit CALC/CACHE/STOP decision lines
    pub debug_enabled: bool,
}

impl Default for DimmerSettings {
    fn default() -> Self {
        Self {
            sweep_time: DEFAULT_SWEEP_TIME,
            min_step: DEFAULT_MIN_STEP,
            debug_enabled: false,
        }
    }
}

/// What `begin_transition` decided for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionPlan {
    pub target: String,
    pub start: f64,
    pub goal: f64,
    pub duration_ms: u64,
    /// True when the change was below the minimum step and nothing was sent.
    pub skipped: bool,
}

/// Static attributes requested by a `set` command.
///
/// `min_brightness`, `max_brightness` and `color_temp_kelvin` count as absent
/// unless strictly positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeRequest {
    #[serde(default)]
    pub brightness: Option<f64>,
    #[serde(default)]
    pub min_brightness: Option<f64>,
    #[serde(default)]
    pub max_brightness: Option<f64>,
    #[serde(default)]
    pub color_temp_kelvin: Option<u32>,
}

impl AttributeRequest {
    fn normalized(&self) -> Self {
        Self {
            brightness: self.brightness.map(clamp_brightness),
            min_brightness: self.min_brightness.filter(|&v| v > 0.0),
            max_brightness: self.max_brightness.filter(|&v| v > 0.0),
            color_temp_kelvin: self.color_temp_kelvin.filter(|&k| k > 0),
        }
    }

    fn has_clamp(&self) -> bool {
        self.min_brightness.is_some() || self.max_brightness.is_some()
    }

    fn is_empty(&self) -> bool {
        self.brightness.is_none() && !self.has_clamp() && self.color_temp_kelvin.is_none()
    }
}

/// Brightness and colour temperature as reported by a `get` command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightAttributes {
    pub brightness: f64,
    pub color_temp_kelvin: Option<u32>,
}

pub struct Dimmer<B: LightBridge> {
    bridge: B,
    resolver: BrightnessResolver,
    settings: DimmerSettings,
}

impl<B: LightBridge> Dimmer<B> {
    pub fn new(bridge: B, resolver: BrightnessResolver, settings: DimmerSettings) -> Self {
        Self {
            bridge,
            resolver,
            settings,
        }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn resolver(&self) -> &BrightnessResolver {
        &self.resolver
    }

    pub fn settings(&self) -> &DimmerSettings {
        &self.settings
    }

    /// Start a transition from `current` to `goal` and record it.
    ///
    /// Changes smaller than the minimum step are skipped entirely: no command
    /// is sent and the existing record is left as it is. Brightness values are
    /// clamped to [0, 100] and the sweep is floored at the minimum sweep.
    pub fn begin_transition(
        &self,
        target: &LightTarget,
        current: f64,
        goal: f64,
        sweep_seconds: f64,
        direction: Direction,
    ) -> TransitionPlan {
        let sweep_seconds = sweep_seconds.max(MIN_SWEEP);
        let current = clamp_brightness(current);
        let goal = clamp_brightness(goal);

        let key = target.key();
        let distance = (goal - current).abs();
        let duration_ms = (distance * sweep_seconds * 10.0).round() as u64;

        if self.settings.debug_enabled {
            log_debug!("CALC [{key}]: {current:.1}% -> {goal:.1}% | Dur: {duration_ms}ms");
        }

        let mut plan = TransitionPlan {
            target: key,
            start: current,
            goal,
            duration_ms,
            skipped: false,
        };

        if distance < self.settings.min_step {
            plan.skipped = true;
            return plan;
        }

        let on = match direction {
            Direction::Up => Some(true),
            Direction::Down if goal == 0.0 => Some(false),
            _ => None,
        };
        let command = TransitionCommand {
            brightness: goal,
            duration_ms,
            on,
        };

        if let Err(e) = self.bridge.send_transition_command(target, &command) {
            log_warning!("Transition command failed for {target}: {e}");
        }

        self.resolver
            .tracker()
            .record(&plan.target, current, goal, direction, sweep_seconds);

        plan
    }

    /// Halt `target` where it is and lock the halt position in.
    ///
    /// Returns the brightness the light is believed to have stopped at.
    pub fn stop(&self, target: &LightTarget, reported: f64) -> f64 {
        self.send_stop(target);
        self.lock_halt(target, reported)
    }

    fn send_stop(&self, target: &LightTarget) {
        if let Err(e) = self.bridge.send_stop_command(target) {
            log_warning!("Stop command failed for {target}: {e}");
        }
    }

    /// Freeze `target` at its resolved brightness.
    fn lock_halt(&self, target: &LightTarget, reported: f64) -> f64 {
        let key = target.key();
        let halted = self.resolver.resolve(&key, reported);
        self.resolver
            .tracker()
            .record(&key, halted, halted, Direction::None, NOMINAL_SWEEP);

        if self.settings.debug_enabled {
            log_debug!("STOP [{key}]: Halted at {halted:.1}%");
        }

        halted
    }

    /// Raise each target towards `limit` (default 100%).
    pub fn raise(
        &self,
        targets: &[LightTarget],
        sweep: Option<f64>,
        limit: Option<f64>,
    ) -> Vec<TransitionPlan> {
        self.transition_batch(
            targets,
            Direction::Up,
            sweep,
            limit.unwrap_or(DEFAULT_MAX_BRIGHTNESS),
        )
    }

    /// Lower each target towards `limit` (default 0%, which also switches it off).
    pub fn lower(
        &self,
        targets: &[LightTarget],
        sweep: Option<f64>,
        limit: Option<f64>,
    ) -> Vec<TransitionPlan> {
        self.transition_batch(
            targets,
            Direction::Down,
            sweep,
            limit.unwrap_or(DEFAULT_MIN_BRIGHTNESS),
        )
    }

    fn transition_batch(
        &self,
        targets: &[LightTarget],
        direction: Direction,
        sweep: Option<f64>,
        limit: f64,
    ) -> Vec<TransitionPlan> {
        self.prune_expired();

        let sweep = sweep.unwrap_or(self.settings.sweep_time);

        targets
            .iter()
            .map(|target| {
                let reported = self.bridge.current_reported_brightness(target);
                let current = self.resolver.resolve(&target.key(), reported);
                self.begin_transition(target, current, limit, sweep, direction)
            })
            .collect()
    }

    /// Stop every target, returning the locked brightness per target key.
    pub fn stop_all(&self, targets: &[LightTarget]) -> BTreeMap<String, f64> {
        self.prune_expired();

        targets
            .iter()
            .map(|target| {
                // Read after the stop so the bridge has a chance to report the halt
                self.send_stop(target);
                let reported = self.bridge.current_reported_brightness(target);
                (target.key(), self.lock_halt(target, reported))
            })
            .collect()
    }

    /// Write static brightness and/or colour temperature.
    ///
    /// Groups are written light by light so the values stick even while the
    /// lights are off. Returns how many lights accepted a payload.
    pub fn set_attributes(&self, targets: &[LightTarget], request: &AttributeRequest) -> usize {
        let request = request.normalized();
        if request.is_empty() {
            log_warning!("set called with no attributes to set");
            return 0;
        }

        self.prune_expired();

        let mut written = 0;
        for target in targets {
            let brightness = match request.brightness {
                Some(explicit) => Some(explicit),
                None if request.has_clamp() => {
                    let (current, _) = self.current_brightness(target);
                    clamp_to_bounds(current, request.min_brightness, request.max_brightness)
                }
                None => None,
            };

            let light_ids = self.destination_lights(target);
            if light_ids.is_empty() {
                log_warning!("No lights found for {target}");
                continue;
            }

            for light_id in light_ids {
                let payload = AttributePayload {
                    brightness,
                    mirek: request
                        .color_temp_kelvin
                        .and_then(|kelvin| self.mirek_for(&light_id, kelvin)),
                };
                if payload.is_empty() {
                    continue;
                }

                match self.bridge.apply_attributes(&light_id, &payload) {
                    Ok(()) => written += 1,
                    Err(e) => log_error!("set failed for light/{light_id}: {e}"),
                }
            }
        }

        written
    }

    /// Read brightness (tracker-aware) and colour temperature for each target.
    pub fn get_attributes(&self, targets: &[LightTarget]) -> BTreeMap<String, LightAttributes> {
        self.prune_expired();

        targets
            .iter()
            .map(|target| {
                let attributes = if target.is_group() {
                    self.group_attributes(target)
                } else {
                    let (brightness, state) = self.current_brightness(target);
                    LightAttributes {
                        brightness,
                        color_temp_kelvin: state.and_then(|s| s.color_temp_kelvin()),
                    }
                };

                (
                    target.key(),
                    LightAttributes {
                        brightness: round_tenth(attributes.brightness),
                        ..attributes
                    },
                )
            })
            .collect()
    }

    /// Forget all tracked transitions.
    pub fn clear(&self) {
        self.resolver.tracker().clear();
    }

    fn prune_expired(&self) {
        let removed = self
            .resolver
            .tracker()
            .prune_expired(self.resolver.settle_buffer());
        if removed > 0 && self.settings.debug_enabled {
            log_debug!("CACHE: Pruned {removed} expired record(s)");
        }
    }

    /// Resolved brightness, falling back to the raw dimming level when the
    /// resolved value is effectively zero (light off, nothing tracked).
    fn current_brightness(&self, target: &LightTarget) -> (f64, Option<ResourceState>) {
        let state = match self.bridge.resource_state(target) {
            Ok(state) => Some(state),
            Err(e) => {
                log_warning!("Failed to read state for {target}: {e}");
                None
            }
        };

        let reported = state.as_ref().map_or(0.0, ResourceState::reported_brightness);
        let resolved = self.resolver.resolve(&target.key(), reported);

        if resolved < BRIGHTNESS_EPSILON {
            let raw = state.as_ref().and_then(|s| s.brightness).unwrap_or(0.0);
            (clamp_brightness(raw), state)
        } else {
            (resolved, state)
        }
    }

    fn destination_lights(&self, target: &LightTarget) -> Vec<String> {
        if !target.is_group() {
            return vec![target.id.clone()];
        }
        match self.bridge.group_members(&target.id) {
            Ok(members) => members,
            Err(e) => {
                log_warning!("Failed to resolve members of {target}: {e}");
                Vec::new()
            }
        }
    }

    fn mirek_for(&self, light_id: &str, kelvin: u32) -> Option<u32> {
        let light = LightTarget::light(light_id);
        let state = match self.bridge.resource_state(&light) {
            Ok(state) => state,
            Err(e) => {
                log_warning!("Failed to read state for {light}: {e}, skipping colour temperature");
                return None;
            }
        };

        if !state.supports_color_temperature {
            log_warning!(
                "{light} does not support colour temperature, sending other attributes only"
            );
            return None;
        }

        let (min_kelvin, max_kelvin) = state.kelvin_range();
        Some(kelvin_to_mirek(kelvin.clamp(min_kelvin, max_kelvin)))
    }

    fn group_attributes(&self, target: &LightTarget) -> LightAttributes {
        let mut brightnesses = Vec::new();
        let mut mireks = Vec::new();

        for light_id in self.destination_lights(target) {
            match self.bridge.resource_state(&LightTarget::light(&light_id)) {
                Ok(state) => {
                    brightnesses.extend(state.brightness);
                    mireks.extend(state.mirek.filter(|&m| m > 0));
                }
                Err(e) => log_warning!("Failed to read attributes for light/{light_id}: {e}"),
            }
        }

        let brightness = if brightnesses.is_empty() {
            0.0
        } else {
            brightnesses.iter().sum::<f64>() / brightnesses.len() as f64
        };

        let color_temp_kelvin = (!mireks.is_empty()).then(|| {
            let average = mireks.iter().map(|&m| m as f64).sum::<f64>() / mireks.len() as f64;
            mirek_to_kelvin(average.round() as u32)
        });

        LightAttributes {
            brightness,
            color_temp_kelvin,
        }
    }
}

/// Apply optional bounds to `current`. Returns the new value only when it
/// moves by more than the brightness epsilon.
fn clamp_to_bounds(current: f64, min: Option<f64>, max: Option<f64>) -> Option<f64> {
    let mut clamped = current;
    if let Some(min) = min {
        clamped = clamped.max(min);
    }
    if let Some(max) = max {
        clamped = clamped.min(max);
    }
    let clamped = clamp_brightness(clamped);
    ((clamped - current).abs() > BRIGHTNESS_EPSILON).then_some(clamped)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{MirekSchema, MockLightBridge};
    use crate::time_source::ManualTimeSource;
    use crate::tracker::TransitionTracker;
    use std::sync::Arc;

    fn dimmer_with(bridge: MockLightBridge) -> (Arc<ManualTimeSource>, Dimmer<MockLightBridge>) {
        let clock = Arc::new(ManualTimeSource::new(0.0));
        let tracker = Arc::new(TransitionTracker::new(clock.clone()));
        let resolver = BrightnessResolver::new(tracker);
        (
            clock,
            Dimmer::new(bridge, resolver, DimmerSettings::default()),
        )
    }

    fn on_at(brightness: f64) -> ResourceState {
        ResourceState {
            on: true,
            brightness: Some(brightness),
            ..Default::default()
        }
    }

    fn ct_light(mirek: u32) -> ResourceState {
        ResourceState {
            on: true,
            brightness: Some(50.0),
            mirek: Some(mirek),
            mirek_schema: Some(MirekSchema {
                minimum: 153,
                maximum: 454,
            }),
            supports_color_temperature: true,
        }
    }

    #[test]
    fn test_begin_transition_sends_then_records() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_send_transition_command()
            .withf(|target, command| {
                target.key() == "light/a"
                    && command.brightness == 100.0
                    && command.duration_ms == 2500
                    && command.on == Some(true)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        let plan =
            dimmer.begin_transition(&LightTarget::light("a"), 50.0, 100.0, 5.0, Direction::Up);

        assert!(!plan.skipped);
        assert_eq!(plan.duration_ms, 2500);
        let record = dimmer.resolver().tracker().get("light/a").unwrap();
        assert_eq!(record.start_brightness, 50.0);
        assert_eq!(record.target_brightness, 100.0);
        assert_eq!(record.direction, Direction::Up);
    }

    #[test]
    fn test_begin_transition_skips_small_steps() {
        let mut bridge = MockLightBridge::new();
        bridge.expect_send_transition_command().times(0);

        let (_clock, dimmer) = dimmer_with(bridge);
        let tracker = dimmer.resolver().tracker().clone();
        tracker.record("light/a", 10.0, 99.8, Direction::Up, 5.0);
        let before = tracker.get("light/a");

        let plan =
            dimmer.begin_transition(&LightTarget::light("a"), 99.8, 100.0, 5.0, Direction::Up);

        assert!(plan.skipped);
        assert_eq!(tracker.get("light/a"), before);
    }

    #[test]
    fn test_lower_to_zero_switches_off() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_send_transition_command()
            .withf(|_, command| command.brightness == 0.0 && command.on == Some(false))
            .times(1)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        dimmer.begin_transition(&LightTarget::light("a"), 60.0, 0.0, 5.0, Direction::Down);
    }

    #[test]
    fn test_lower_to_nonzero_leaves_power_alone() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_send_transition_command()
            .withf(|_, command| command.on.is_none())
            .times(1)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        dimmer.begin_transition(&LightTarget::light("a"), 60.0, 20.0, 5.0, Direction::Down);
    }

    #[test]
    fn test_failed_command_still_records() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_send_transition_command()
            .returning(|_, _| Err(anyhow::anyhow!("bridge unreachable")));

        let (_clock, dimmer) = dimmer_with(bridge);
        dimmer.begin_transition(&LightTarget::light("a"), 0.0, 100.0, 5.0, Direction::Up);
        assert!(dimmer.resolver().tracker().get("light/a").is_some());
    }

    #[test]
    fn test_stop_locks_predicted_position() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_send_transition_command()
            .returning(|_, _| Ok(()));
        bridge
            .expect_send_stop_command()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("timeout")));

        let (clock, dimmer) = dimmer_with(bridge);
        let target = LightTarget::light("a");
        dimmer.begin_transition(&target, 0.0, 100.0, 5.0, Direction::Up);

        clock.set(2.5);
        let halted = dimmer.stop(&target, 100.0);
        assert_eq!(halted, 50.0);

        let record = dimmer.resolver().tracker().get("light/a").unwrap();
        assert_eq!(record.direction, Direction::None);
        assert_eq!(record.start_brightness, 50.0);
        assert_eq!(record.target_brightness, 50.0);
        assert_eq!(record.sweep_seconds, NOMINAL_SWEEP);

        clock.set(3.5);
        assert_eq!(dimmer.resolver().resolve("light/a", 0.0), 50.0);
    }

    #[test]
    fn test_raise_uses_resolved_start_and_defaults() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_resource_state()
            .returning(|_| Ok(on_at(30.0)));
        bridge
            .expect_send_transition_command()
            .withf(|_, command| command.brightness == 100.0 && command.duration_ms == 3500)
            .times(1)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        let plans = dimmer.raise(&[LightTarget::light("a")], None, None);

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].start, 30.0);
        assert_eq!(plans[0].goal, 100.0);
    }

    #[test]
    fn test_lower_floors_sweep_and_clamps_limit() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_resource_state()
            .returning(|_| Ok(on_at(80.0)));
        bridge
            .expect_send_transition_command()
            .withf(|_, command| command.brightness == 0.0 && command.duration_ms == 80)
            .times(1)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        let plans = dimmer.lower(&[LightTarget::light("a")], Some(0.0), Some(-20.0));
        assert_eq!(plans[0].goal, 0.0);

        let record = dimmer.resolver().tracker().get("light/a").unwrap();
        assert_eq!(record.sweep_seconds, MIN_SWEEP);
    }

    #[test]
    fn test_raise_prunes_expired_records_first() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_resource_state()
            .returning(|_| Ok(on_at(100.0)));
        bridge.expect_send_transition_command().times(0);

        let (clock, dimmer) = dimmer_with(bridge);
        let tracker = dimmer.resolver().tracker().clone();
        tracker.record("light/stale", 0.0, 100.0, Direction::Up, 5.0);

        clock.set(30.0);
        dimmer.raise(&[LightTarget::light("a")], None, None);
        assert!(tracker.get("light/stale").is_none());
    }

    #[test]
    fn test_begin_transition_clamps_degenerate_input() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_send_transition_command()
            .withf(|_, command| command.brightness == 100.0 && command.duration_ms == 80)
            .times(2)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        let target = LightTarget::light("a");

        for sweep in [0.0, -5.0] {
            let plan = dimmer.begin_transition(&target, 20.0, 150.0, sweep, Direction::Up);
            assert_eq!(plan.goal, 100.0);
            assert_eq!(plan.duration_ms, 80);

            let record = dimmer.resolver().tracker().get("light/a").unwrap();
            assert_eq!(record.sweep_seconds, MIN_SWEEP);
            assert_eq!(record.target_brightness, 100.0);
            assert_eq!(dimmer.resolver().resolve("light/a", 100.0), 20.0);
        }
    }

    #[test]
    fn test_begin_transition_clamps_start_below_zero() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_send_transition_command()
            .withf(|_, command| command.brightness == 40.0 && command.duration_ms == 2000)
            .times(1)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        let plan =
            dimmer.begin_transition(&LightTarget::light("a"), -10.0, 40.0, 5.0, Direction::Up);

        assert_eq!(plan.start, 0.0);
        let record = dimmer.resolver().tracker().get("light/a").unwrap();
        assert_eq!(record.start_brightness, 0.0);
    }

    #[test]
    fn test_stop_all_sends_stop_before_reading() {
        let mut sequence = mockall::Sequence::new();
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_send_stop_command()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));
        bridge
            .expect_resource_state()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(on_at(61.0)));

        let (_clock, dimmer) = dimmer_with(bridge);
        let halted = dimmer.stop_all(&[LightTarget::light("a")]);
        assert_eq!(halted.get("light/a"), Some(&61.0));
    }

    #[test]
    fn test_stop_all_reads_reported_brightness() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_resource_state()
            .returning(|_| Ok(on_at(42.0)));
        bridge.expect_send_stop_command().times(2).returning(|_| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        let halted = dimmer.stop_all(&[LightTarget::light("a"), LightTarget::group("g")]);

        assert_eq!(halted.get("light/a"), Some(&42.0));
        assert_eq!(halted.get("grouped_light/g"), Some(&42.0));
        assert_eq!(dimmer.resolver().tracker().len(), 2);
    }

    #[test]
    fn test_set_without_attributes_sends_nothing() {
        let mut bridge = MockLightBridge::new();
        bridge.expect_apply_attributes().times(0);

        let (_clock, dimmer) = dimmer_with(bridge);
        let request = AttributeRequest {
            min_brightness: Some(0.0),
            color_temp_kelvin: Some(0),
            ..Default::default()
        };
        assert_eq!(dimmer.set_attributes(&[LightTarget::light("a")], &request), 0);
    }

    #[test]
    fn test_set_clamps_to_min_brightness() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_resource_state()
            .returning(|_| Ok(on_at(10.0)));
        bridge
            .expect_apply_attributes()
            .withf(|id, payload| id == "a" && payload.brightness == Some(25.0))
            .times(1)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        let request = AttributeRequest {
            min_brightness: Some(25.0),
            ..Default::default()
        };
        assert_eq!(dimmer.set_attributes(&[LightTarget::light("a")], &request), 1);
    }

    #[test]
    fn test_set_clamp_within_bounds_sends_nothing() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_resource_state()
            .returning(|_| Ok(on_at(50.0)));
        bridge.expect_apply_attributes().times(0);

        let (_clock, dimmer) = dimmer_with(bridge);
        let request = AttributeRequest {
            min_brightness: Some(20.0),
            max_brightness: Some(80.0),
            ..Default::default()
        };
        assert_eq!(dimmer.set_attributes(&[LightTarget::light("a")], &request), 0);
    }

    #[test]
    fn test_set_clamp_uses_raw_level_when_off() {
        let mut bridge = MockLightBridge::new();
        bridge.expect_resource_state().returning(|_| {
            Ok(ResourceState {
                on: false,
                brightness: Some(90.0),
                ..Default::default()
            })
        });
        bridge
            .expect_apply_attributes()
            .withf(|_, payload| payload.brightness == Some(60.0))
            .times(1)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        let request = AttributeRequest {
            max_brightness: Some(60.0),
            ..Default::default()
        };
        dimmer.set_attributes(&[LightTarget::light("a")], &request);
    }

    #[test]
    fn test_set_color_temperature_is_clamped_to_light_range() {
        let mut bridge = MockLightBridge::new();
        bridge.expect_resource_state().returning(|_| Ok(ct_light(366)));
        // 1800 K is below the light's 2203 K minimum (454 mirek)
        bridge
            .expect_apply_attributes()
            .withf(|_, payload| payload.mirek == Some(454) && payload.brightness.is_none())
            .times(1)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        let request = AttributeRequest {
            color_temp_kelvin: Some(1800),
            ..Default::default()
        };
        assert_eq!(dimmer.set_attributes(&[LightTarget::light("a")], &request), 1);
    }

    #[test]
    fn test_set_skips_color_temperature_on_unsupported_light() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_resource_state()
            .returning(|_| Ok(on_at(50.0)));
        bridge
            .expect_apply_attributes()
            .withf(|_, payload| payload.brightness == Some(70.0) && payload.mirek.is_none())
            .times(1)
            .returning(|_, _| Ok(()));

        let (_clock, dimmer) = dimmer_with(bridge);
        let request = AttributeRequest {
            brightness: Some(70.0),
            color_temp_kelvin: Some(3000),
            ..Default::default()
        };
        dimmer.set_attributes(&[LightTarget::light("a")], &request);
    }

    #[test]
    fn test_set_fans_out_to_group_members() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_group_members()
            .withf(|id| id == "g")
            .returning(|_| Ok(vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]));
        bridge
            .expect_apply_attributes()
            .times(3)
            .returning(|id, _| {
                if id == "m2" {
                    Err(anyhow::anyhow!("light unreachable"))
                } else {
                    Ok(())
                }
            });

        let (_clock, dimmer) = dimmer_with(bridge);
        let request = AttributeRequest {
            brightness: Some(40.0),
            ..Default::default()
        };
        assert_eq!(dimmer.set_attributes(&[LightTarget::group("g")], &request), 2);
    }

    #[test]
    fn test_set_on_empty_group_sends_nothing() {
        let mut bridge = MockLightBridge::new();
        bridge.expect_group_members().returning(|_| Ok(Vec::new()));
        bridge.expect_apply_attributes().times(0);

        let (_clock, dimmer) = dimmer_with(bridge);
        let request = AttributeRequest {
            brightness: Some(40.0),
            ..Default::default()
        };
        assert_eq!(dimmer.set_attributes(&[LightTarget::group("g")], &request), 0);
    }

    #[test]
    fn test_get_light_attributes_prefers_tracked_value() {
        let mut bridge = MockLightBridge::new();
        bridge.expect_resource_state().returning(|_| Ok(ct_light(250)));

        let (clock, dimmer) = dimmer_with(bridge);
        dimmer
            .resolver()
            .tracker()
            .record("light/a", 0.0, 100.0, Direction::Up, 3.0);
        clock.set(1.0);

        let attributes = dimmer.get_attributes(&[LightTarget::light("a")]);
        let light = attributes.get("light/a").unwrap();
        assert_eq!(light.brightness, 33.3);
        assert_eq!(light.color_temp_kelvin, Some(4000));
    }

    #[test]
    fn test_get_group_attributes_averages_members() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_group_members()
            .returning(|_| Ok(vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]));
        bridge.expect_resource_state().returning(|target| match target.id.as_str() {
            "m1" => Ok(ResourceState {
                brightness: Some(20.0),
                mirek: Some(200),
                ..Default::default()
            }),
            "m2" => Ok(ResourceState {
                brightness: Some(50.0),
                mirek: Some(300),
                ..Default::default()
            }),
            _ => Err(anyhow::anyhow!("light unreachable")),
        });

        let (_clock, dimmer) = dimmer_with(bridge);
        let attributes = dimmer.get_attributes(&[LightTarget::group("g")]);
        let group = attributes.get("grouped_light/g").unwrap();
        assert_eq!(group.brightness, 35.0);
        assert_eq!(group.color_temp_kelvin, Some(4000));
    }

    #[test]
    fn test_clamp_to_bounds() {
        assert_eq!(clamp_to_bounds(10.0, Some(25.0), None), Some(25.0));
        assert_eq!(clamp_to_bounds(90.0, None, Some(60.0)), Some(60.0));
        assert_eq!(clamp_to_bounds(25.05, Some(25.1), None), None);
        assert_eq!(clamp_to_bounds(50.0, Some(20.0), Some(80.0)), None);
    }
}
