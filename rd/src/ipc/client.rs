//! IPC client for communicating with the daemon
//!
//! Provides a simple interface for the CLI to send control messages to the
//! daemon via Unix Domain Socket.

use std::path::PathBuf;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use keywordstore::TrackedKeyword;

use super::get_socket_path;
use super::messages::{DaemonMessage, DaemonResponse};

/// Default timeout for IPC operations
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum message size; matches the listener side
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Client for communicating with the daemon via IPC
#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl Default for DaemonClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DaemonClient {
    /// Create a new client with the default socket path
    pub fn new() -> Self {
        Self {
            socket_path: get_socket_path(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a client with a custom socket path (for testing)
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the daemon socket exists
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Check if daemon is alive and get its version
    pub async fn ping(&self) -> Result<String> {
        debug!("DaemonClient: pinging daemon");
        let response = self.send_message(DaemonMessage::Ping).await?;
        match response {
            DaemonResponse::Pong { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    /// Request daemon to shutdown gracefully
    pub async fn shutdown(&self) -> Result<()> {
        debug!("DaemonClient: requesting daemon shutdown");
        self.expect_ok(DaemonMessage::Shutdown).await
    }

    /// Start the scheduler (no-op when already running)
    pub async fn start(&self, interval_ms: Option<u64>) -> Result<()> {
        debug!(?interval_ms, "DaemonClient: starting scheduler");
        self.expect_ok(DaemonMessage::Start { interval_ms }).await
    }

    /// Stop the scheduler without stopping the daemon
    pub async fn stop(&self) -> Result<()> {
        debug!("DaemonClient: stopping scheduler");
        self.expect_ok(DaemonMessage::Stop).await
    }

    /// Change the polling interval
    pub async fn set_interval(&self, interval_ms: u64) -> Result<()> {
        debug!(interval_ms, "DaemonClient: setting interval");
        self.expect_ok(DaemonMessage::SetInterval { interval_ms }).await
    }

    /// Get the scheduler's interval (ms) and running flag
    pub async fn get_state(&self) -> Result<(u64, bool)> {
        debug!("DaemonClient: querying state");
        let response = self.send_message(DaemonMessage::GetState).await?;
        match response {
            DaemonResponse::State { interval_ms, running } => Ok((interval_ms, running)),
            other => Err(unexpected(other)),
        }
    }

    /// Get the pending rotation order, next keyword first
    pub async fn get_queue(&self) -> Result<Vec<TrackedKeyword>> {
        debug!("DaemonClient: querying queue");
        let response = self.send_message(DaemonMessage::GetQueue).await?;
        match response {
            DaemonResponse::Queue { keywords } => Ok(keywords),
            other => Err(unexpected(other)),
        }
    }

    /// Ask the daemon to re-read the tracked keyword set.
    ///
    /// Callers treat this as best-effort after a keyword mutation: the
    /// daemon re-reads the set at every tick anyway, so a missed refresh
    /// only delays the pickup.
    pub async fn refresh(&self) -> Result<()> {
        debug!("DaemonClient: requesting rotation refresh");
        self.expect_ok(DaemonMessage::Refresh).await
    }

    async fn expect_ok(&self, msg: DaemonMessage) -> Result<()> {
        let response = self.send_message(msg).await?;
        match response {
            DaemonResponse::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Send a message to the daemon and wait for response
    async fn send_message(&self, msg: DaemonMessage) -> Result<DaemonResponse> {
        debug!(?self.socket_path, ?msg, "DaemonClient: sending message");

        // Connect with timeout
        let stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to daemon socket")?;

        self.send_on_stream(stream, msg).await
    }

    /// Send message on an existing stream (extracted for testing)
    async fn send_on_stream(&self, mut stream: UnixStream, msg: DaemonMessage) -> Result<DaemonResponse> {
        let msg_json = serde_json::to_string(&msg).context("Failed to serialize message")?;

        if msg_json.len() > MAX_MESSAGE_SIZE {
            return Err(eyre::eyre!("Message too large: {} bytes", msg_json.len()));
        }

        // Send message with newline
        tokio::time::timeout(self.timeout, async {
            stream
                .write_all(msg_json.as_bytes())
                .await
                .context("Failed to write message")?;
            stream.write_all(b"\n").await.context("Failed to write newline")?;
            stream.flush().await.context("Failed to flush stream")?;
            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Write timeout")??;

        // Read response with size limit
        let mut reader = BufReader::new(&mut stream);
        let mut response_line = String::new();

        tokio::time::timeout(self.timeout, async {
            let bytes_read = reader
                .read_line(&mut response_line)
                .await
                .context("Failed to read response")?;

            if bytes_read > MAX_MESSAGE_SIZE {
                return Err(eyre::eyre!("Response too large: {} bytes", bytes_read));
            }

            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Read timeout")??;

        let response: DaemonResponse =
            serde_json::from_str(response_line.trim()).context("Failed to parse daemon response")?;

        debug!(?response, "DaemonClient: received response");
        Ok(response)
    }
}

fn unexpected(response: DaemonResponse) -> eyre::Report {
    match response {
        DaemonResponse::Error { message } => eyre::eyre!("Daemon error: {}", message),
        other => eyre::eyre!("Unexpected response: {:?}", other),
    }
}
