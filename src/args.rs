//! Command-line argument parsing and processing.
//!
//! With no command the binary runs the daemon. The `raise`, `lower`, `stop`,
//! `set` and `get` commands are one-shot clients: they are turned into an IPC
//! [`Request`] and sent to the running daemon.

use std::str::FromStr;

use crate::dimmer::AttributeRequest;
use crate::ipc::Request;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the long-lived daemon
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        log_file: Option<String>,
    },
    /// Send a single request to the running daemon
    Send {
        debug_enabled: bool,
        request: Request,
    },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to invalid arguments and exit
    ShowHelpDueToError(String),
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

/// Options that only some commands accept.
#[derive(Debug, Default)]
struct CommandOptions {
    sweep: Option<f64>,
    limit: Option<f64>,
    brightness: Option<f64>,
    min_brightness: Option<f64>,
    max_brightness: Option<f64>,
    color_temp_kelvin: Option<u32>,
}

impl CommandOptions {
    fn has_transition_options(&self) -> bool {
        self.sweep.is_some() || self.limit.is_some()
    }

    fn has_attribute_options(&self) -> bool {
        self.brightness.is_some()
            || self.min_brightness.is_some()
            || self.max_brightness.is_some()
            || self.color_temp_kelvin.is_some()
    }
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// # Arguments
    /// * `args` - Iterator over command-line arguments (typically from std::env::args())
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let action = match parse_action(args) {
            Ok(action) => action,
            Err(message) => CliAction::ShowHelpDueToError(message),
        };
        ParsedArgs { action }
    }
}

fn parse_action<I, S>(args: I) -> Result<CliAction, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut debug_enabled = false;
    let mut config_dir: Option<String> = None;
    let mut log_file: Option<String> = None;
    let mut command: Option<String> = None;
    let mut targets: Vec<String> = Vec::new();
    let mut options = CommandOptions::default();

    let mut args = args.into_iter().skip(1).map(|s| s.as_ref().to_string());

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(CliAction::ShowHelp),
            "--version" | "-V" | "-v" => return Ok(CliAction::ShowVersion),
            "--debug" | "-d" => debug_enabled = true,
            "--config" | "-c" => config_dir = Some(take_value(&arg, args.next())?),
            "--log" | "-l" => log_file = Some(take_value(&arg, args.next())?),
            "--sweep" | "-s" => options.sweep = Some(take_number(&arg, args.next())?),
            "--limit" => options.limit = Some(take_number(&arg, args.next())?),
            "--brightness" | "-b" => options.brightness = Some(take_number(&arg, args.next())?),
            "--min" => options.min_brightness = Some(take_number(&arg, args.next())?),
            "--max" => options.max_brightness = Some(take_number(&arg, args.next())?),
            "--ct" => options.color_temp_kelvin = Some(take_number(&arg, args.next())?),
            flag if flag.starts_with('-') => return Err(format!("Unknown option: {flag}")),
            _ if command.is_none() => command = Some(arg),
            _ => targets.push(arg),
        }
    }

    let Some(command) = command else {
        if options.has_transition_options() || options.has_attribute_options() {
            return Err("Command options given without a command".to_string());
        }
        return Ok(CliAction::Run {
            debug_enabled,
            config_dir,
            log_file,
        });
    };

    if config_dir.is_some() || log_file.is_some() {
        return Err(format!(
            "--config and --log apply to the daemon, not to '{command}'"
        ));
    }
    if targets.is_empty() {
        return Err(format!("'{command}' needs at least one target"));
    }

    let is_transition = matches!(command.as_str(), "raise" | "lower");
    if options.has_transition_options() && !is_transition {
        return Err("--sweep and --limit are only valid for raise and lower".to_string());
    }
    if options.has_attribute_options() && command != "set" {
        return Err("--brightness, --min, --max and --ct are only valid for set".to_string());
    }

    let request = match command.as_str() {
        "raise" => Request::Raise {
            targets,
            sweep: options.sweep,
            limit: options.limit,
        },
        "lower" => Request::Lower {
            targets,
            sweep: options.sweep,
            limit: options.limit,
        },
        "stop" => Request::Stop { targets },
        "set" => {
            if !options.has_attribute_options() {
                return Err("set needs --brightness, --min, --max or --ct".to_string());
            }
            Request::Set {
                targets,
                attributes: AttributeRequest {
                    brightness: options.brightness,
                    min_brightness: options.min_brightness,
                    max_brightness: options.max_brightness,
                    color_temp_kelvin: options.color_temp_kelvin,
                },
            }
        }
        "get" => Request::Get { targets },
        other => return Err(format!("Unknown command: {other}")),
    };

    Ok(CliAction::Send {
        debug_enabled,
        request,
    })
}

fn take_value(flag: &str, value: Option<String>) -> Result<String, String> {
    value
        .filter(|v| !v.starts_with('-') || v.parse::<f64>().is_ok())
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn take_number<T: FromStr>(flag: &str, value: Option<String>) -> Result<T, String> {
    let value = take_value(flag, value)?;
    value
        .parse()
        .map_err(|_| format!("Invalid value for {flag}: {value}"))
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("huedimmer [OPTIONS]                 Run the daemon");
    log_indented!("huedimmer <COMMAND> <TARGETS...> [OPTIONS]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-l, --log <file>       Write daemon output to a file");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("raise <targets>        Fade up  [--sweep <s>] [--limit <pct>]");
    log_indented!("lower <targets>        Fade down [--sweep <s>] [--limit <pct>]");
    log_indented!("stop <targets>         Halt a running fade where it is");
    log_indented!("set <targets>          [--brightness <pct>] [--min <pct>] [--max <pct>] [--ct <K>]");
    log_indented!("get <targets>          Print brightness and colour temperature");
    log_block_start!("Targets:");
    log_indented!("light/<id>, grouped_light/<id>, or an alias from huedimmer.toml");
    log_end!();
}
