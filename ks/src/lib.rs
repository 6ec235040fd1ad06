//! KeywordStore - persistent store for tracked keywords and rank observations
//!
//! Backs the rank monitor daemon with a single SQLite database holding the
//! tracked (keyword, target URL) pairs and an append-only log of observed
//! ranks. The daemon writes one observation per completed check, whether or
//! not a rank was found; absence is recorded, not skipped.
//!
//! # Architecture
//!
//! ```text
//! keywords           rankings
//! ├── id             ├── id
//! ├── keyword        ├── keyword_id ──► keywords.id (CASCADE)
//! ├── target_url     ├── rank (NULL = not found)
//! ├── last_rank      └── checked_at
//! ├── last_checked_at
//! └── created_at
//! ```
//!
//! # Example
//!
//! ```ignore
//! use keywordstore::KeywordStore;
//!
//! let store = KeywordStore::open("rankdaemon.db")?;
//! let kw = store.add("coffee beans", "shop.example.com")?;
//! store.record_observation(kw.id, Some(3))?;
//! let rows = store.history(50)?;
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{KeywordStore, ObservationRow, RankObservation, StoreStats, TrackedKeyword};
