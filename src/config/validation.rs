//! Configuration validation functionality.
//!
//! Rejects out-of-range tuning values and aliases that do not name a light or
//! group, so problems surface at startup rather than on the first command.

use anyhow::{Result, bail};

use super::Config;
use crate::bridge::LightTarget;
use crate::constants::*;

/// Validate every field that is present.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(sweep) = config.sweep_time
        && !(MINIMUM_SWEEP_TIME..=MAXIMUM_SWEEP_TIME).contains(&sweep)
    {
        bail!(
            "sweep_time ({sweep} s) must be between {MINIMUM_SWEEP_TIME} and {MAXIMUM_SWEEP_TIME} seconds"
        );
    }

    if let Some(settle) = config.settle_buffer
        && !(MINIMUM_SETTLE_BUFFER..=MAXIMUM_SETTLE_BUFFER).contains(&settle)
    {
        bail!(
            "settle_buffer ({settle} s) must be between {MINIMUM_SETTLE_BUFFER} and {MAXIMUM_SETTLE_BUFFER} seconds"
        );
    }

    if let Some(step) = config.min_step
        && !(MINIMUM_MIN_STEP..=MAXIMUM_MIN_STEP).contains(&step)
    {
        bail!("min_step ({step}%) must be between {MINIMUM_MIN_STEP} and {MAXIMUM_MIN_STEP} percent");
    }

    if let Some(timeout) = config.request_timeout_ms
        && !(MINIMUM_REQUEST_TIMEOUT_MS..=MAXIMUM_REQUEST_TIMEOUT_MS).contains(&timeout)
    {
        bail!(
            "request_timeout_ms ({timeout} ms) must be between {MINIMUM_REQUEST_TIMEOUT_MS} and {MAXIMUM_REQUEST_TIMEOUT_MS} milliseconds"
        );
    }

    if let Some(host) = config.bridge_host.as_deref()
        && host.trim().is_empty()
    {
        bail!("bridge_host must not be empty");
    }

    validate_aliases(config)
}

fn validate_aliases(config: &Config) -> Result<()> {
    for (name, target) in &config.aliases {
        if name.trim().is_empty() || name.contains('/') {
            bail!("Alias name '{name}' must be non-empty and must not contain '/'");
        }
        if LightTarget::parse(target).is_none() {
            bail!(
                "Alias '{name}' points to '{target}', expected \"light/<id>\" or \"grouped_light/<id>\""
            );
        }
    }
    Ok(())
}
