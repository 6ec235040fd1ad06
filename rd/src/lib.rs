//! RankDaemon - search ranking monitor
//!
//! A local daemon that periodically checks where tracked (keyword, target
//! URL) pairs rank in a search engine's paid results, records each observed
//! rank over time, and exposes a small IPC control surface for changing the
//! check cadence and inspecting the pending work order.
//!
//! # Core Concepts
//!
//! - **Round-robin rotation**: one keyword is checked per tick; the rotation
//!   snapshot is re-read from the store every tick, so additions and
//!   removals are always picked up
//! - **One check in flight**: a single owned timer task drives ticks;
//!   reconfiguration is cancel-then-rearm, never two timers
//! - **Absence is signal**: "not found in ads" is persisted like any rank
//! - **Failures are tick-local**: a failed fetch or persist skips one
//!   observation and never stops the scheduler
//!
//! # Modules
//!
//! - [`scheduler`] - polling scheduler and rotation state
//! - [`extract`] - page data contracts and the rank extraction rule
//! - [`fetcher`] - PageFetcher contract and the Browserless-backed fetcher
//! - [`ipc`] - Unix-socket JSON-line control surface
//! - [`daemon`] - PID file and process management
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod daemon;
pub mod extract;
pub mod fetcher;
pub mod ipc;
pub mod scheduler;

// Re-export commonly used types
pub use config::{Config, FetcherConfig, StorageConfig};
pub use extract::{ExtractedPage, ResultEntry, rank_of};
pub use fetcher::{BrowserFetcher, FetchError, PageFetcher};
pub use ipc::{DaemonClient, DaemonMessage, DaemonResponse};
pub use scheduler::{DEFAULT_INTERVAL_MS, MIN_INTERVAL_MS, Scheduler, SchedulerConfig, SchedulerState};
