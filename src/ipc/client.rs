//! IPC client used by the one-shot command-line actions.

use anyhow::{Context, Result, bail};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use super::protocol::{Request, Response};
use super::socket_path;
use crate::constants::IPC_CLIENT_TIMEOUT_MS;

/// A single connection to the running daemon.
pub struct IpcClient {
    stream: UnixStream,
    reader: BufReader<UnixStream>,
}

impl IpcClient {
    /// Connect to the daemon socket at the default location.
    pub fn connect() -> Result<Self> {
        let socket_path = socket_path().context("Failed to get IPC socket path")?;
        Self::connect_to(&socket_path)
    }

    pub fn connect_to(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).with_context(|| {
            format!(
                "Failed to connect to huedimmer socket at {:?}. Is the daemon running?",
                socket_path
            )
        })?;

        // Bridge round-trips for a whole batch happen before the reply
        stream
            .set_read_timeout(Some(Duration::from_millis(IPC_CLIENT_TIMEOUT_MS)))
            .context("Failed to set read timeout on IPC socket")?;

        let reader = BufReader::new(
            stream
                .try_clone()
                .context("Failed to clone stream for reader")?,
        );

        Ok(Self { stream, reader })
    }

    /// Send one request and wait for its response.
    pub fn send(&mut self, request: &Request) -> Result<Response> {
        let json_line = serde_json::to_string(request).context("Failed to serialize request")?;
        self.stream
            .write_all(format!("{json_line}\n").as_bytes())
            .context("Failed to send request to daemon")?;
        self.stream.flush().context("Failed to flush request")?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .context("Failed to read response from daemon")?;

        if line.trim().is_empty() {
            bail!("Connection closed by daemon without a response");
        }

        serde_json::from_str(line.trim())
            .with_context(|| format!("Failed to parse response JSON: {}", line.trim()))
    }

    /// Quick connectivity test without keeping a connection.
    pub fn is_running() -> bool {
        socket_path()
            .map(|path| path.exists() && UnixStream::connect(&path).is_ok())
            .unwrap_or(false)
    }
}
