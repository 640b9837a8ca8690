//! Configuration system for huedimmer.
//!
//! Settings live in `huedimmer.toml`, found in `$XDG_CONFIG_HOME/huedimmer/`
//! unless `--config <dir>` points elsewhere. A commented default file is
//! written on first run.
//!
//! ```toml
//! #[Bridge]
//! bridge_host = "192.168.1.2"   # Hue bridge address
//! application_key = ""          # CLIP v2 application key
//! request_timeout_ms = 3000     # Bridge HTTP timeout (100-60000) ms
//!
//! #[Transitions]
//! sweep_time = 5.0              # Seconds for a full 0-100% sweep (0.1-3600)
//! settle_buffer = 2.0           # Extra guard seconds after a transition (0-60)
//! min_step = 0.4                # Smallest brightness change worth sending (0-10)
//!
//! [aliases]
//! kitchen = "light/3f1c0c2e-..."
//! living_room = "grouped_light/9a0e..."
//! ```
//!
//! Every field is optional in the file; accessors fall back to the constants
//! in [`crate::constants`]. The bridge address and key are only required by
//! the daemon, which checks them through [`Config::bridge_credentials`].

pub mod builder;
pub mod loading;
pub mod validation;

use anyhow::{Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::bridge::LightTarget;
use crate::constants::*;
use crate::dimmer::DimmerSettings;

pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Address of the Hue bridge, optionally with an `http(s)://` prefix
    pub bridge_host: Option<String>,
    /// CLIP v2 application key (the `hue-application-key` header)
    pub application_key: Option<String>,
    pub sweep_time: Option<f64>,    // seconds for a full 0-100% sweep
    pub settle_buffer: Option<f64>, // extra guard seconds after a transition
    pub min_step: Option<f64>,      // percent
    pub request_timeout_ms: Option<u64>,
    /// Friendly names for targets, e.g. `kitchen = "light/<id>"`
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration using the module's load function
    pub fn load() -> Result<Self> {
        load()
    }

    /// Load from path using the module's load_from_path function
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        load_from_path(path)
    }

    /// Get configuration path using the module's get_config_path function
    pub fn get_config_path() -> Result<PathBuf> {
        get_config_path()
    }

    pub fn sweep_time(&self) -> f64 {
        self.sweep_time.unwrap_or(DEFAULT_SWEEP_TIME)
    }

    pub fn settle_buffer(&self) -> f64 {
        self.settle_buffer.unwrap_or(DEFAULT_SETTLE_BUFFER)
    }

    pub fn min_step(&self) -> f64 {
        self.min_step.unwrap_or(DEFAULT_MIN_STEP)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    pub fn dimmer_settings(&self, debug_enabled: bool) -> DimmerSettings {
        DimmerSettings {
            sweep_time: self.sweep_time(),
            min_step: self.min_step(),
            debug_enabled,
        }
    }

    /// Bridge host and application key, or an error naming what is missing.
    pub fn bridge_credentials(&self) -> Result<(&str, &str)> {
        let host = self
            .bridge_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty());
        let key = self
            .application_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        match (host, key) {
            (Some(host), Some(key)) => Ok((host, key)),
            (None, _) => bail!("bridge_host is not set in the configuration"),
            (_, None) => bail!("application_key is not set in the configuration"),
        }
    }

    /// Resolve `light/<id>`, `grouped_light/<id>` or a configured alias.
    pub fn resolve_target(&self, name: &str) -> Option<LightTarget> {
        let name = name.trim();
        LightTarget::parse(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|target| LightTarget::parse(target))
        })
    }

    /// Resolve every name, logging and skipping the ones that do not resolve.
    pub fn resolve_targets(&self, names: &[String]) -> Vec<LightTarget> {
        names
            .iter()
            .filter_map(|name| {
                let target = self.resolve_target(name);
                if target.is_none() {
                    log_warning!("Unknown target '{name}', skipping");
                }
                target
            })
            .collect()
    }

    pub fn log_config(&self) {
        log_block_start!("Loaded configuration");

        if let Some(host) = self.bridge_host.as_deref() {
            log_indented!("Bridge: {host}");
        }
        log_indented!(
            "Sweep time: {:.1}s, settle buffer: {:.1}s",
            self.sweep_time(),
            self.settle_buffer()
        );
        log_indented!("Minimum step: {:.1}%", self.min_step());
        log_indented!(
            "Request timeout: {}ms",
            self.request_timeout().as_millis()
        );

        if !self.aliases.is_empty() {
            log_indented!(
                "Aliases: {}",
                self.aliases.keys().cloned().collect::<Vec<_>>().join(", ")
            );
        }
    }
}
