//! Structured logging system with visual formatting.
//!
//! This module provides the box-drawing log output used by both the daemon and
//! the one-shot client. Every macro renders one [`Line`] shape through
//! [`Log::render`], so the layout of each kind of line lives in one place.
//!
//! The logger supports runtime enable/disable functionality for quiet operation
//! during tests, an optional wall-clock timestamp prefix for the long-running
//! daemon, and routing to a file when `--log` is given.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

// Prefix every line with [HH:MM:SS] (daemon mode)
static TIMESTAMPS_ENABLED: AtomicBool = AtomicBool::new(false);

// Channel for routing output to file when --log is active
static LOG_CHANNEL: OnceLock<Option<Sender<LogMessage>>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Shape of a single log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// `┃` followed by `┣ message`
    BlockStart,
    /// `┣ message`
    Decorated,
    /// `┃   message`
    Indented,
    /// `┃`
    Pipe,
    /// `┏ huedimmer vX.Y.Z ━━╸`
    Version,
    /// `╹`
    End,
    /// `┣[LEVEL] message`
    Level(Level),
    /// `┃` followed by `┗[ERROR] message`
    ErrorExit,
}

/// Semantic level tags, rendered with an ANSI colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Debug,
    Warning,
    Error,
    Critical,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "\x1b[32mINFO\x1b[0m",
            Level::Debug => "\x1b[32mDEBUG\x1b[0m",
            Level::Warning => "\x1b[33mWARNING\x1b[0m",
            Level::Error => "\x1b[31mERROR\x1b[0m",
            Level::Critical => "\x1b[31mCRITICAL\x1b[0m",
        }
    }
}

/// Main logging interface providing structured output formatting.
///
/// ## Logging Conventions
///
/// - **`log_block_start!`** opens a new conceptual block (daemon started, config
///   loaded, a batch of commands). Related lines follow with `log_decorated!` or
///   `log_indented!`.
/// - **`log_decorated!`** continues a block or prints a short status line.
/// - **`log_indented!`** lists details belonging to the previous line.
/// - **`log_pipe!`** inserts vertical spacing before a levelled message that
///   starts its own block. Not for use at the end of a block.
/// - **`log_version!`** / **`log_end!`** open and close the whole output.
/// - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!`**
///   carry a coloured `[LEVEL]` tag.
/// - **`log_error_exit!`** terminates the flow with `┗[ERROR]`.
pub struct Log;

impl Log {
    /// Enable or disable logging temporarily.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Enable or disable the `[HH:MM:SS]` prefix on every line.
    pub fn set_timestamps(enabled: bool) {
        TIMESTAMPS_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Start file logging to the specified path.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(Some(tx.clone()))
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => {
                        file.write_all(text.as_bytes())?;
                    }
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Timestamp prefix for the current line, empty unless timestamps are enabled.
    pub fn get_timestamp_prefix() -> String {
        if TIMESTAMPS_ENABLED.load(Ordering::SeqCst) {
            format!("[{}] ", chrono::Local::now().format("%H:%M:%S"))
        } else {
            String::new()
        }
    }

    /// Render one line (including the trailing newline) without writing it.
    pub fn render(line: Line, prefix: &str, message: &str) -> String {
        match line {
            Line::BlockStart => format!("{prefix}┃\n{prefix}┣ {message}\n"),
            Line::Decorated => format!("{prefix}┣ {message}\n"),
            Line::Indented => format!("{prefix}┃   {message}\n"),
            Line::Pipe => format!("{prefix}┃\n"),
            Line::Version => format!(
                "{prefix}┏ huedimmer v{} ━━╸\n",
                env!("CARGO_PKG_VERSION")
            ),
            Line::End => format!("{prefix}╹\n"),
            Line::Level(level) => format!("{prefix}┣[{}] {message}\n", level.tag()),
            Line::ErrorExit => {
                format!("{prefix}┃\n{prefix}┗[{}] {message}\n", Level::Error.tag())
            }
        }
    }

    /// Render and write a line if logging is enabled. Used by the macros.
    pub fn emit(line: Line, message: &str) {
        if Self::is_enabled() {
            let prefix = Self::get_timestamp_prefix();
            write_output(&Self::render(line, &prefix, message));
        }
    }
}

/// Guard for file logging that ensures clean shutdown.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        // LOG_CHANNEL stays installed; the process exits after the daemon stops
    }
}

/// Strip `ESC [ ... m` colour sequences for file output.
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

// Public function that routes output (needed by macros)
pub fn write_output(text: &str) {
    if let Some(Some(tx)) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

// # Logging Macros

#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($line:expr, $fmt:literal $($arg:tt)*) => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::Log::emit($line, &format!($fmt $($arg)*));
        }
    }};
    ($line:expr, $expr:expr) => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::Log::emit($line, &format!("{}", $expr));
        }
    }};
}

/// Log a decorated message, typically as part of an existing block.
#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)+) => { $crate::__log_line!($crate::logger::Line::Decorated, $($arg)+) };
}

/// Log an indented message for sub-items or details within a block.
#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)+) => { $crate::__log_line!($crate::logger::Line::Indented, $($arg)+) };
}

/// Log a block start message, initiating a new conceptual block of information.
#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)+) => { $crate::__log_line!($crate::logger::Line::BlockStart, $($arg)+) };
}

/// Log a visual pipe separator for vertical spacing.
#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::logger::Log::emit($crate::logger::Line::Pipe, "")
    };
}

/// Log the application version header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::logger::Log::emit($crate::logger::Line::Version, "")
    };
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {
        $crate::logger::Log::emit($crate::logger::Line::End, "")
    };
}

/// Log an informational message with a green `[INFO]` tag.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => {
        $crate::__log_line!($crate::logger::Line::Level($crate::logger::Level::Info), $($arg)+)
    };
}

/// Log a debug/operational message with a green `[DEBUG]` tag.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => {
        $crate::__log_line!($crate::logger::Line::Level($crate::logger::Level::Debug), $($arg)+)
    };
}

/// Log a warning message with a yellow `[WARNING]` tag.
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)+) => {
        $crate::__log_line!($crate::logger::Line::Level($crate::logger::Level::Warning), $($arg)+)
    };
}

/// Log an error message with a red `[ERROR]` tag.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => {
        $crate::__log_line!($crate::logger::Line::Level($crate::logger::Level::Error), $($arg)+)
    };
}

/// Log a critical message with a red `[CRITICAL]` tag.
#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)+) => {
        $crate::__log_line!($crate::logger::Line::Level($crate::logger::Level::Critical), $($arg)+)
    };
}

/// Log a terminating error, closing the box with `┗`.
#[macro_export]
macro_rules! log_error_exit {
    ($($arg:tt)+) => { $crate::__log_line!($crate::logger::Line::ErrorExit, $($arg)+) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes() {
        let colored = "┣[\x1b[33mWARNING\x1b[0m] light unreachable";
        assert_eq!(strip_ansi_codes(colored), "┣[WARNING] light unreachable");
    }

    #[test]
    fn test_strip_ansi_keeps_plain_text() {
        assert_eq!(strip_ansi_codes("┃   sweep 5.0s"), "┃   sweep 5.0s");
    }

    #[test]
    fn test_render_shapes() {
        assert_eq!(Log::render(Line::Decorated, "", "ready"), "┣ ready\n");
        assert_eq!(Log::render(Line::Indented, "", "x"), "┃   x\n");
        assert_eq!(Log::render(Line::BlockStart, "", "go"), "┃\n┣ go\n");
        assert_eq!(Log::render(Line::End, "", ""), "╹\n");
        assert_eq!(
            strip_ansi_codes(&Log::render(Line::ErrorExit, "", "boom")),
            "┃\n┗[ERROR] boom\n"
        );
    }

    #[test]
    fn test_render_with_prefix() {
        let line = Log::render(Line::Level(Level::Debug), "[12:00:00] ", "CALC");
        assert_eq!(strip_ansi_codes(&line), "[12:00:00] ┣[DEBUG] CALC\n");
    }
}
