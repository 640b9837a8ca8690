//! Daemon coordinator that owns the transition tracker for its whole lifetime.
//!
//! Startup loads the configuration, builds the CLIP v2 bridge client and the
//! tracker/resolver/dimmer stack, installs signal handlers, and then serves
//! IPC requests until a shutdown signal arrives. On shutdown the socket file is
//! removed and all tracked transitions are forgotten.
//!
//! The `Daemon` struct uses a builder pattern:
//! - Normal startup: `Daemon::new(debug_enabled).run()`
//! - Embedded/tests: `Daemon::new(true).without_headers().with_socket_path(path).run()`

use anyhow::{Context, Result, bail};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::bridge::LightBridge;
use crate::bridge::clip::ClipBridge;
use crate::config::{Config, loading::private_path};
use crate::dimmer::Dimmer;
use crate::ipc::{self, IpcClient, IpcSocketServer, Request, Response};
use crate::logger::Log;
use crate::resolver::BrightnessResolver;
use crate::signals::setup_signal_handler;
use crate::time_source::MonotonicTimeSource;
use crate::tracker::TransitionTracker;

/// Builder for configuring and running the daemon.
pub struct Daemon {
    debug_enabled: bool,
    show_headers: bool,
    socket_path: Option<PathBuf>,
}

impl Daemon {
    /// Create a new runner with defaults matching normal run
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            show_headers: true,
            socket_path: None,
        }
    }

    /// Skip the version header
    pub fn without_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    /// Listen on a specific socket instead of the runtime-dir default
    pub fn with_socket_path(mut self, path: PathBuf) -> Self {
        self.socket_path = Some(path);
        self
    }

    /// Execute the daemon until SIGINT/SIGTERM/SIGHUP.
    pub fn run(self) -> Result<()> {
        if self.show_headers {
            log_version!();
        }
        Log::set_timestamps(true);

        let config = Config::load()?;
        config.log_config();

        let (host, key) = config.bridge_credentials().with_context(|| {
            format!(
                "Edit {} to configure the bridge",
                Config::get_config_path()
                    .map(|p| private_path(&p))
                    .unwrap_or_else(|_| "huedimmer.toml".to_string())
            )
        })?;
        let bridge = ClipBridge::new(host, key, config.request_timeout(), self.debug_enabled)?;

        let tracker = Arc::new(TransitionTracker::new(Arc::new(MonotonicTimeSource::new())));
        let resolver = BrightnessResolver::new(tracker)
            .with_settle_buffer(config.settle_buffer())
            .with_debug(self.debug_enabled);
        let dimmer = Dimmer::new(bridge, resolver, config.dimmer_settings(self.debug_enabled));

        let socket_path = match self.socket_path {
            Some(path) => path,
            None => {
                if IpcClient::is_running() {
                    bail!("Another huedimmer daemon is already running");
                }
                ipc::socket_path()?
            }
        };

        let signal_state = setup_signal_handler(self.debug_enabled)?;
        let server = IpcSocketServer::new(socket_path)?;
        log_block_start!("Listening on {}", private_path(server.socket_path()));

        let result = server.run(
            signal_state.running.clone(),
            |request| handle_request(&dimmer, &config, request),
            self.debug_enabled,
        );

        dimmer.clear();
        signal_state.close();

        log_block_start!("Daemon stopped");
        log_end!();

        result
    }
}

/// Resolve a request's targets and run it against the dimmer.
pub fn handle_request<B: LightBridge>(
    dimmer: &Dimmer<B>,
    config: &Config,
    request: Request,
) -> Response {
    let targets = config.resolve_targets(request.targets());
    if targets.is_empty() {
        return Response::failure("No valid targets");
    }

    log_block_start!(
        "{}: {}",
        request.name(),
        targets
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    match request {
        Request::Raise { sweep, limit, .. } => {
            Response::success(dimmer.raise(&targets, sweep, limit))
        }
        Request::Lower { sweep, limit, .. } => {
            Response::success(dimmer.lower(&targets, sweep, limit))
        }
        Request::Stop { .. } => Response::success(dimmer.stop_all(&targets)),
        Request::Set { attributes, .. } => {
            let written = dimmer.set_attributes(&targets, &attributes);
            Response::success(json!({ "lights_written": written }))
        }
        Request::Get { .. } => Response::success(dimmer.get_attributes(&targets)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{MockLightBridge, ResourceState};
    use crate::dimmer::DimmerSettings;
    use crate::time_source::ManualTimeSource;

    fn dimmer_with(bridge: MockLightBridge) -> Dimmer<MockLightBridge> {
        let clock = Arc::new(ManualTimeSource::new(0.0));
        let tracker = Arc::new(TransitionTracker::new(clock));
        Dimmer::new(
            bridge,
            BrightnessResolver::new(tracker),
            DimmerSettings::default(),
        )
    }

    fn config_with_alias() -> Config {
        let mut config = Config::default();
        config
            .aliases
            .insert("kitchen".to_string(), "light/3f1c".to_string());
        config
    }

    #[test]
    fn test_request_without_valid_targets_fails() {
        let dimmer = dimmer_with(MockLightBridge::new());
        let response = handle_request(
            &dimmer,
            &config_with_alias(),
            Request::Stop {
                targets: vec!["garage".to_string()],
            },
        );
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("No valid targets"));
    }

    #[test]
    fn test_stop_request_resolves_alias() {
        let mut bridge = MockLightBridge::new();
        bridge
            .expect_send_stop_command()
            .withf(|target| target.key() == "light/3f1c")
            .times(1)
            .returning(|_| Ok(()));
        bridge.expect_resource_state().returning(|_| {
            Ok(ResourceState {
                on: true,
                brightness: Some(37.0),
                ..Default::default()
            })
        });

        let dimmer = dimmer_with(bridge);
        let response = handle_request(
            &dimmer,
            &config_with_alias(),
            Request::Stop {
                targets: vec!["kitchen".to_string()],
            },
        );

        assert!(response.ok);
        assert_eq!(response.result, Some(json!({ "light/3f1c": 37.0 })));
    }

    #[test]
    fn test_raise_request_returns_plans() {
        let mut bridge = MockLightBridge::new();
        bridge.expect_resource_state().returning(|_| {
            Ok(ResourceState {
                on: true,
                brightness: Some(20.0),
                ..Default::default()
            })
        });
        bridge
            .expect_send_transition_command()
            .times(1)
            .returning(|_, _| Ok(()));

        let dimmer = dimmer_with(bridge);
        let response = handle_request(
            &dimmer,
            &Config::default(),
            Request::Raise {
                targets: vec!["light/a".to_string()],
                sweep: Some(2.0),
                limit: Some(70.0),
            },
        );

        assert!(response.ok);
        let plans = response.result.unwrap();
        assert_eq!(plans[0]["target"], "light/a");
        assert_eq!(plans[0]["duration_ms"], 1000);
        assert_eq!(plans[0]["skipped"], false);
    }
}
