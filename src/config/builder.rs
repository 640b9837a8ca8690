//! Default configuration file creation.
//!
//! The default file carries every tunable with its default value and a short
//! aligned comment, plus commented-out bridge credentials and alias examples
//! the user fills in.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::constants::*;

/// Write a commented default `huedimmer.toml` to `path`.
pub fn create_default_config(path: &PathBuf) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    fs::write(path, default_config_content())
        .with_context(|| format!("Failed to write default config to {}", path.display()))
}

pub(crate) fn default_config_content() -> String {
    let settings = ConfigBuilder::new()
        .add_section("Bridge")
        .add_commented_setting(
            "bridge_host",
            "\"192.168.1.2\"",
            "Hue bridge address (required by the daemon)",
        )
        .add_commented_setting(
            "application_key",
            "\"<key>\"",
            "CLIP v2 application key (required by the daemon)",
        )
        .add_setting(
            "request_timeout_ms",
            &DEFAULT_REQUEST_TIMEOUT_MS.to_string(),
            &format!(
                "Bridge HTTP timeout ({MINIMUM_REQUEST_TIMEOUT_MS}-{MAXIMUM_REQUEST_TIMEOUT_MS}) ms"
            ),
        )
        .add_section("Transitions")
        .add_setting(
            "sweep_time",
            &format!("{DEFAULT_SWEEP_TIME:.1}"),
            &format!(
                "Seconds for a full 0-100% sweep ({MINIMUM_SWEEP_TIME}-{MAXIMUM_SWEEP_TIME})"
            ),
        )
        .add_setting(
            "settle_buffer",
            &format!("{DEFAULT_SETTLE_BUFFER:.1}"),
            &format!(
                "Extra guard seconds after a transition ({MINIMUM_SETTLE_BUFFER}-{MAXIMUM_SETTLE_BUFFER})"
            ),
        )
        .add_setting(
            "min_step",
            &DEFAULT_MIN_STEP.to_string(),
            &format!(
                "Smallest brightness change worth sending ({MINIMUM_MIN_STEP}-{MAXIMUM_MIN_STEP})%"
            ),
        )
        .build();

    // Tables must follow all top-level keys
    format!(
        "{settings}\n\n\
         #[Aliases] Friendly names usable in place of \"light/<id>\" or \"grouped_light/<id>\"\n\
         [aliases]\n\
         # kitchen = \"light/3f1c0c2e-0000-0000-0000-000000000000\"\n\
         # living_room = \"grouped_light/9a0e0000-0000-0000-0000-000000000000\"\n"
    )
}

struct ConfigBuilder {
    entries: Vec<EntryType>,
}

enum EntryType {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(EntryType::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(EntryType::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    /// A setting written commented out, for values with no usable default.
    fn add_commented_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(EntryType::Setting {
            line: format!("# {key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        // Align every comment one column past the longest setting line
        let width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                EntryType::Setting { line, .. } => Some(line.len()),
                EntryType::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        for entry in self.entries {
            match entry {
                EntryType::Section(title) => {
                    if !result.is_empty() {
                        result.push(String::new());
                    }
                    result.push(title);
                }
                EntryType::Setting { line, comment } => {
                    result.push(format!("{line:<width$}{comment}"));
                }
            }
        }

        result.join("\n")
    }
}
