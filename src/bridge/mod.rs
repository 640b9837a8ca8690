//! Bridge abstraction layer for issuing light commands.
//!
//! The dimmer talks to lights only through the [`LightBridge`] trait, which
//! covers reading a resource's state, starting and stopping a brightness
//! transition, resolving a group to its member lights, and writing static
//! attributes. [`clip::ClipBridge`] implements it over the Hue CLIP v2 API;
//! tests substitute mocks or in-memory fakes.
//!
//! ## Resource addressing
//!
//! Targets are addressed as `<kind>/<resource-id>`, where `kind` is `light`
//! or `grouped_light`. That string doubles as the transition tracker key.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{DEFAULT_MAX_COLOR_TEMP_KELVIN, DEFAULT_MIN_COLOR_TEMP_KELVIN};

pub mod clip;

/// Kind of bridge resource a target refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Light,
    GroupedLight,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Light => "light",
            ResourceKind::GroupedLight => "grouped_light",
        }
    }

    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "light" => Some(ResourceKind::Light),
            "grouped_light" => Some(ResourceKind::GroupedLight),
            _ => None,
        }
    }
}

/// A single light or light group on the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LightTarget {
    pub kind: ResourceKind,
    pub id: String,
}

impl LightTarget {
    pub fn light(id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Light,
            id: id.into(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::GroupedLight,
            id: id.into(),
        }
    }

    /// Parse `light/<id>` or `grouped_light/<id>`.
    pub fn parse(value: &str) -> Option<Self> {
        let (kind, id) = value.split_once('/')?;
        let kind = ResourceKind::parse(kind.trim())?;
        let id = id.trim();
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(Self {
            kind,
            id: id.to_string(),
        })
    }

    /// Tracker key for this target.
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn is_group(&self) -> bool {
        self.kind == ResourceKind::GroupedLight
    }
}

impl fmt::Display for LightTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.id)
    }
}

/// Valid mirek range published by a colour-temperature capable light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirekSchema {
    pub minimum: u32,
    pub maximum: u32,
}

/// Last state the bridge reported for a resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState {
    pub on: bool,
    /// Raw dimming level in percent. The bridge keeps it while the light is off.
    pub brightness: Option<f64>,
    pub mirek: Option<u32>,
    pub mirek_schema: Option<MirekSchema>,
    pub supports_color_temperature: bool,
}

impl ResourceState {
    /// Brightness as the rest of the system sees it: 0 when off or unknown.
    pub fn reported_brightness(&self) -> f64 {
        if self.on {
            self.brightness.unwrap_or(0.0)
        } else {
            0.0
        }
    }

    /// Supported colour temperature range in kelvin, (min, max).
    pub fn kelvin_range(&self) -> (u32, u32) {
        match self.mirek_schema {
            Some(schema) if schema.minimum > 0 && schema.maximum >= schema.minimum => (
                mirek_to_kelvin(schema.maximum),
                mirek_to_kelvin(schema.minimum),
            ),
            _ => (DEFAULT_MIN_COLOR_TEMP_KELVIN, DEFAULT_MAX_COLOR_TEMP_KELVIN),
        }
    }

    /// Current colour temperature in kelvin, if the light reports one.
    pub fn color_temp_kelvin(&self) -> Option<u32> {
        self.mirek.filter(|&m| m > 0).map(mirek_to_kelvin)
    }
}

/// A brightness transition to hand to the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCommand {
    pub brightness: f64,
    pub duration_ms: u64,
    /// `Some(true)` to switch on first, `Some(false)` to switch off at the end.
    pub on: Option<bool>,
}

/// Static attributes written to a single light.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirek: Option<u32>,
}

impl AttributePayload {
    pub fn is_empty(&self) -> bool {
        self.brightness.is_none() && self.mirek.is_none()
    }
}

/// Narrow capability interface to a light bridge.
///
/// Implementations report failures as errors; the dimmer logs them and keeps
/// its in-memory state regardless.
#[cfg_attr(any(test, feature = "testing-support"), mockall::automock)]
pub trait LightBridge {
    /// Query the current state of a light or group.
    fn resource_state(&self, target: &LightTarget) -> Result<ResourceState>;

    /// Start a brightness transition.
    fn send_transition_command(
        &self,
        target: &LightTarget,
        command: &TransitionCommand,
    ) -> Result<()>;

    /// Halt any running brightness transition where it is.
    fn send_stop_command(&self, target: &LightTarget) -> Result<()>;

    /// Resolve a group to the ids of its member lights.
    fn group_members(&self, group_id: &str) -> Result<Vec<String>>;

    /// Write static attributes to one light.
    fn apply_attributes(&self, light_id: &str, payload: &AttributePayload) -> Result<()>;
}

/// Conveniences layered over every [`LightBridge`].
pub trait LightBridgeExt: LightBridge {
    /// Best-effort current brightness: 0.0 if off, unknown or unreachable.
    fn current_reported_brightness(&self, target: &LightTarget) -> f64 {
        match self.resource_state(target) {
            Ok(state) => state.reported_brightness(),
            Err(e) => {
                log_warning!("Failed to read brightness for {target}: {e}");
                0.0
            }
        }
    }
}

impl<B: LightBridge + ?Sized> LightBridgeExt for B {}

pub fn mirek_to_kelvin(mirek: u32) -> u32 {
    (1_000_000.0 / mirek.max(1) as f64).round() as u32
}

pub fn kelvin_to_mirek(kelvin: u32) -> u32 {
    (1_000_000.0 / kelvin.max(1) as f64).round() as u32
}
