//! Signal handling for the daemon.
//!
//! SIGINT, SIGTERM and SIGHUP all request a graceful shutdown: a background
//! thread clears the shared `running` flag, which the IPC accept loop polls.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM},
    iterator::{Handle, Signals},
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

/// Signal handling state shared between threads
pub struct SignalState {
    /// Atomic flag indicating if the application should keep running
    pub running: Arc<AtomicBool>,
    handle: Handle,
}

impl SignalState {
    /// Stop listening for signals and let the handler thread exit.
    pub fn close(&self) {
        self.handle.close();
    }
}

/// Set up signal handling for the daemon.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));

    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGHUP]).context("failed to register signal handlers")?;
    let handle = signals.handle();

    let running_clone = running.clone();
    thread::spawn(move || {
        for sig in signals.forever() {
            log_pipe!();
            log_info!("{}", shutdown_message(sig, debug_enabled));
            running_clone.store(false, Ordering::SeqCst);
        }
    });

    Ok(SignalState { running, handle })
}

fn shutdown_message(sig: i32, debug_enabled: bool) -> &'static str {
    match sig {
        SIGINT if debug_enabled => "Received SIGINT (Ctrl+C), initiating graceful shutdown...",
        SIGINT => "Received interrupt signal, initiating graceful shutdown...",
        SIGTERM => "Received termination request, initiating graceful shutdown...",
        SIGHUP => "Received hangup signal, initiating graceful shutdown...",
        _ => "Received shutdown signal, initiating graceful shutdown...",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_messages() {
        assert!(shutdown_message(SIGINT, true).contains("SIGINT"));
        assert!(shutdown_message(SIGINT, false).contains("interrupt"));
        assert!(shutdown_message(SIGTERM, false).contains("termination"));
        assert!(shutdown_message(SIGHUP, false).contains("hangup"));
    }
}
