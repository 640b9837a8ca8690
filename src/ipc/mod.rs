//! IPC between the daemon and one-shot command-line invocations.
//!
//! The daemon owns the transition tracker, so every brightness command has to
//! reach it. Commands travel over a Unix domain socket as single JSON lines
//! (see [`protocol`]).

use anyhow::Result;
use nix::unistd::getuid;
use std::path::PathBuf;

use crate::constants::SOCKET_FILE_NAME;

pub mod client;
pub mod protocol;
pub mod server;

pub use client::IpcClient;
pub use protocol::{Request, Response};
pub use server::IpcSocketServer;

/// Get the socket path for the daemon.
///
/// - Primary: `$XDG_RUNTIME_DIR/huedimmer.sock`
/// - Fallback: `/run/user/{uid}/huedimmer.sock`
pub fn socket_path() -> Result<PathBuf> {
    let runtime_dir = if let Ok(xdg_runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(xdg_runtime_dir)
    } else {
        PathBuf::from(format!("/run/user/{}", getuid()))
    };

    Ok(runtime_dir.join(SOCKET_FILE_NAME))
}
