//! IPC message types for daemon communication
//!
//! Simple JSON-over-newline protocol. Each message is a single line of JSON
//! followed by `\n`.

use serde::{Deserialize, Serialize};

use keywordstore::TrackedKeyword;

/// Messages from CLI to Daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DaemonMessage {
    /// Ping to check if daemon is alive
    Ping,

    /// Request daemon to stop gracefully
    Shutdown,

    /// Start the scheduler; no-op when already running. Without an interval
    /// the previously configured one applies.
    Start { interval_ms: Option<u64> },

    /// Stop the scheduler without stopping the daemon
    Stop,

    /// Change the polling interval (clamped to the floor by the scheduler)
    SetInterval { interval_ms: u64 },

    /// Query the current interval and running flag
    GetState,

    /// Query the pending rotation order, next keyword first
    GetQueue,

    /// Re-read the tracked keyword set into the rotation
    Refresh,
}

/// Responses from Daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DaemonResponse {
    /// Acknowledgment
    Ok,

    /// Pong response to ping
    Pong { version: String },

    /// Scheduler state
    State { interval_ms: u64, running: bool },

    /// Pending rotation order
    Queue { keywords: Vec<TrackedKeyword> },

    /// Error response
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_serialize() {
        let msg = DaemonMessage::Ping;
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"Ping"}"#);
    }

    #[test]
    fn test_start_with_interval_serialize() {
        let msg = DaemonMessage::Start {
            interval_ms: Some(5_000),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"Start","interval_ms":5000}"#);
    }

    #[test]
    fn test_set_interval_deserialize() {
        let json = r#"{"type":"SetInterval","interval_ms":30000}"#;
        let msg: DaemonMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, DaemonMessage::SetInterval { interval_ms: 30_000 });
    }

    #[test]
    fn test_state_response_serialize() {
        let resp = DaemonResponse::State {
            interval_ms: 60_000,
            running: true,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"type":"State","interval_ms":60000,"running":true}"#);
    }

    #[test]
    fn test_queue_response_roundtrip() {
        use chrono::Utc;

        let resp = DaemonResponse::Queue {
            keywords: vec![TrackedKeyword {
                id: 7,
                keyword: "coffee beans".to_string(),
                target_url: "shop.example.com".to_string(),
                last_rank: Some(2),
                last_checked_at: None,
                created_at: Utc::now(),
            }],
        };

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: DaemonResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(resp, parsed);
    }

    #[test]
    fn test_roundtrip_all_messages() {
        let messages = vec![
            DaemonMessage::Ping,
            DaemonMessage::Shutdown,
            DaemonMessage::Start { interval_ms: None },
            DaemonMessage::Start { interval_ms: Some(1_000) },
            DaemonMessage::Stop,
            DaemonMessage::SetInterval { interval_ms: 15_000 },
            DaemonMessage::GetState,
            DaemonMessage::GetQueue,
            DaemonMessage::Refresh,
        ];

        for msg in messages {
            let json = serde_json::to_string(&msg).unwrap();
            let parsed: DaemonMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(msg, parsed);
        }
    }

    #[test]
    fn test_roundtrip_all_responses() {
        let responses = vec![
            DaemonResponse::Ok,
            DaemonResponse::Pong {
                version: "v1.2.3".to_string(),
            },
            DaemonResponse::State {
                interval_ms: 1_000,
                running: false,
            },
            DaemonResponse::Queue { keywords: vec![] },
            DaemonResponse::Error {
                message: "test error".to_string(),
            },
        ];

        for resp in responses {
            let json = serde_json::to_string(&resp).unwrap();
            let parsed: DaemonResponse = serde_json::from_str(&json).unwrap();
            assert_eq!(resp, parsed);
        }
    }
}
