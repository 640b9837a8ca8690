//! Unix socket server for the daemon side of the IPC protocol.
//!
//! Connections are accepted in non-blocking mode so the loop can notice the
//! shutdown flag; each accepted client is then served synchronously: one
//! request line in, one response line out. Serving clients one at a time
//! serializes every command the daemon runs.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::protocol::{Request, Response};
use crate::constants::{IPC_POLL_INTERVAL_MS, IPC_READ_TIMEOUT_MS};

pub struct IpcSocketServer {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl IpcSocketServer {
    /// Bind a listener at `socket_path`, replacing a stale socket file.
    pub fn new(socket_path: PathBuf) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        listener
            .set_nonblocking(true)
            .context("Failed to set socket to non-blocking mode")?;

        Ok(Self {
            socket_path,
            listener,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Serve clients until `running` is cleared, then remove the socket file.
    pub fn run<F>(self, running: Arc<AtomicBool>, mut handler: F, debug_enabled: bool) -> Result<()>
    where
        F: FnMut(Request) -> Response,
    {
        if debug_enabled {
            log_debug!("IPC server listening on {:?}", self.socket_path);
        }

        while running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    let started = Instant::now();
                    if let Err(e) = serve_client(stream, &mut handler) {
                        log_warning!("IPC client error: {e:#}");
                    } else if debug_enabled {
                        log_debug!("IPC client served ({}ms)", started.elapsed().as_millis());
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(IPC_POLL_INTERVAL_MS));
                }
                Err(e) => {
                    if debug_enabled {
                        log_debug!("Error accepting client connection: {e}");
                    }
                    thread::sleep(Duration::from_millis(IPC_POLL_INTERVAL_MS));
                }
            }
        }

        if debug_enabled {
            log_debug!("IPC server shutting down");
        }

        self.cleanup()
    }

    /// Remove the socket file.
    fn cleanup(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .with_context(|| format!("Failed to remove socket file: {:?}", self.socket_path))?;
        }
        Ok(())
    }
}

/// Read one request line, run it, and write the response line.
fn serve_client<F>(stream: UnixStream, handler: &mut F) -> Result<()>
where
    F: FnMut(Request) -> Response,
{
    // Accepted sockets may inherit non-blocking mode from the listener
    stream
        .set_nonblocking(false)
        .context("Failed to set client stream to blocking mode")?;
    stream
        .set_read_timeout(Some(Duration::from_millis(IPC_READ_TIMEOUT_MS)))
        .context("Failed to set read timeout on client stream")?;

    let mut reader = BufReader::new(
        stream
            .try_clone()
            .context("Failed to clone stream for reader")?,
    );
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read request from client")?;

    let response = match serde_json::from_str::<Request>(line.trim()) {
        Ok(request) => handler(request),
        Err(e) => Response::failure(format!("Invalid request: {e}")),
    };

    let json_line = serde_json::to_string(&response).context("Failed to serialize response")?;
    let mut writer = stream;
    writer
        .write_all(format!("{json_line}\n").as_bytes())
        .context("Failed to write response to client")?;
    writer.flush().context("Failed to flush response")?;
    Ok(())
}
