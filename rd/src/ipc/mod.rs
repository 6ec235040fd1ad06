//! Inter-Process Communication for daemon control
//!
//! This module provides Unix Domain Socket-based IPC between the CLI and the
//! daemon. The CLI uses it to reconfigure the scheduler (interval, start,
//! stop), inspect its state and pending queue, and nudge it to re-read the
//! keyword set after a mutation - instead of waiting for the next tick's
//! re-read to notice.

use std::path::PathBuf;

pub mod client;
pub mod listener;
pub mod messages;

pub use client::DaemonClient;
pub use listener::{cleanup_socket, create_listener, create_listener_at, read_message, send_response};
pub use messages::{DaemonMessage, DaemonResponse};

/// Get the socket path for daemon IPC
///
/// Uses the same base directory as the daemon's PID file.
pub fn get_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("rankdaemon")
        .join("daemon.sock")
}
