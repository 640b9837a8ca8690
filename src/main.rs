//! Main application entry point.
//!
//! Parses the command line and either runs the daemon or sends one command to
//! an already running daemon and prints its answer:
//!
//! - `huedimmer [--debug] [--config <dir>] [--log <file>]` runs the daemon
//! - `huedimmer raise|lower|stop|set|get <targets...> [options]` talks to it

use anyhow::{Result, bail};

use huedimmer::Daemon;
use huedimmer::args::{self, CliAction, ParsedArgs};
use huedimmer::config;
use huedimmer::constants::EXIT_FAILURE;
use huedimmer::ipc::{IpcClient, Request};
use huedimmer::logger::Log;
use huedimmer::{log_debug, log_end, log_error_exit, log_pipe, log_warning};

fn main() {
    let parsed = ParsedArgs::parse(std::env::args());

    let result = match parsed.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError(message) => {
            log_pipe!();
            log_warning!("{message}");
            args::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Run {
            debug_enabled,
            config_dir,
            log_file,
        } => run_daemon(debug_enabled, config_dir, log_file),
        CliAction::Send {
            debug_enabled,
            request,
        } => send_request(debug_enabled, request),
    };

    if let Err(e) = result {
        log_error_exit!("{e:#}");
        log_end!();
        std::process::exit(EXIT_FAILURE);
    }
}

fn run_daemon(debug_enabled: bool, config_dir: Option<String>, log_file: Option<String>) -> Result<()> {
    config::set_config_dir(config_dir)?;

    // Held until the daemon returns so buffered lines reach the file
    let _log_guard = match log_file {
        Some(path) => Some(Log::start_file_logging(path)?),
        None => None,
    };

    Daemon::new(debug_enabled).run()
}

fn send_request(debug_enabled: bool, request: Request) -> Result<()> {
    if debug_enabled {
        log_debug!("Sending {} request", request.name());
    }

    let response = IpcClient::connect()?.send(&request)?;

    if !response.ok {
        bail!(
            "Daemon rejected {}: {}",
            request.name(),
            response.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    if let Some(result) = response.result {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}
