//! Polling scheduler for rank checks
//!
//! Drives one check per tick against a round-robin rotation of tracked
//! keywords, with an operator-adjustable interval and safe reconfiguration
//! (cancel-then-rearm, never two timers).

mod config;
mod core;
mod rotation;

pub use config::{DEFAULT_INTERVAL_MS, MIN_INTERVAL_MS, SchedulerConfig};
pub use core::Scheduler;
pub use rotation::{Rotation, SchedulerState};
