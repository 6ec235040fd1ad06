//! Core KeywordStore implementation

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

/// A (keyword, target URL fragment) pair under monitoring.
///
/// `last_rank`/`last_checked_at` are mutated only by the daemon after a
/// completed check; `None` for `last_rank` means never found or never checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedKeyword {
    pub id: i64,
    pub keyword: String,
    /// Substring expected in a matching result's displayed URL or title
    pub target_url: String,
    pub last_rank: Option<u32>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One observed rank for a keyword at a point in time. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankObservation {
    pub id: i64,
    pub keyword_id: i64,
    /// 1-based position in the ads section; `None` = not found that cycle
    pub rank: Option<u32>,
    pub checked_at: DateTime<Utc>,
}

/// An observation joined with its keyword, for the history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRow {
    pub id: i64,
    pub keyword_id: i64,
    pub keyword: String,
    pub target_url: String,
    pub rank: Option<u32>,
    pub checked_at: DateTime<Utc>,
}

/// Row counts for the `ks stats` command
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    pub keyword_count: usize,
    pub observation_count: usize,
}

/// SQLite-backed store for tracked keywords and their rank history
pub struct KeywordStore {
    conn: Mutex<Connection>,
}

impl KeywordStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create store directory")?;
        }

        let conn =
            Connection::open(path).context(format!("Failed to open store at {}", path.display()))?;
        Self::init_schema(&conn)?;

        tracing::debug!("Opened keyword store at {}", path.display());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory store (tests, dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory store")?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;

             CREATE TABLE IF NOT EXISTS keywords (
                 id              INTEGER PRIMARY KEY AUTOINCREMENT,
                 keyword         TEXT NOT NULL,
                 target_url      TEXT NOT NULL,
                 last_rank       INTEGER,
                 last_checked_at TEXT,
                 created_at      TEXT NOT NULL
             );

             CREATE TABLE IF NOT EXISTS rankings (
                 id         INTEGER PRIMARY KEY AUTOINCREMENT,
                 keyword_id INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
                 rank       INTEGER,
                 checked_at TEXT NOT NULL
             );

             CREATE INDEX IF NOT EXISTS idx_rankings_keyword ON rankings(keyword_id, checked_at);",
        )
        .context("Failed to create store schema")
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("keyword store mutex poisoned")
    }

    /// All tracked keywords in insertion order. This is the rotation order.
    pub fn list(&self) -> Result<Vec<TrackedKeyword>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, keyword, target_url, last_rank, last_checked_at, created_at
             FROM keywords ORDER BY id",
        )?;
        let rows = stmt.query_map([], keyword_from_row)?;

        let mut keywords = Vec::new();
        for row in rows {
            keywords.push(row?);
        }
        Ok(keywords)
    }

    /// Add a single tracked keyword
    pub fn add(&self, keyword: &str, target_url: &str) -> Result<TrackedKeyword> {
        let created_at = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO keywords (keyword, target_url, created_at) VALUES (?1, ?2, ?3)",
            params![keyword, target_url, created_at.to_rfc3339()],
        )
        .context("Failed to insert keyword")?;

        let id = conn.last_insert_rowid();
        tracing::info!("Added keyword {id}: {keyword} -> {target_url}");

        Ok(TrackedKeyword {
            id,
            keyword: keyword.to_string(),
            target_url: target_url.to_string(),
            last_rank: None,
            last_checked_at: None,
            created_at,
        })
    }

    /// Add many keywords in a single transaction
    pub fn add_bulk(&self, items: &[(String, String)]) -> Result<Vec<TrackedKeyword>> {
        let created_at = Utc::now();
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut added = Vec::with_capacity(items.len());
        for (keyword, target_url) in items {
            tx.execute(
                "INSERT INTO keywords (keyword, target_url, created_at) VALUES (?1, ?2, ?3)",
                params![keyword, target_url, created_at.to_rfc3339()],
            )
            .context("Failed to insert keyword")?;
            added.push(TrackedKeyword {
                id: tx.last_insert_rowid(),
                keyword: keyword.clone(),
                target_url: target_url.clone(),
                last_rank: None,
                last_checked_at: None,
                created_at,
            });
        }

        tx.commit()?;
        tracing::info!("Added {} keywords", added.len());
        Ok(added)
    }

    /// Delete keywords by id, cascading their observations. Returns the
    /// number of keywords actually deleted.
    pub fn delete_bulk(&self, ids: &[i64]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut deleted = 0usize;
        for id in ids {
            deleted += tx
                .execute("DELETE FROM keywords WHERE id = ?1", params![id])
                .context("Failed to delete keyword")?;
        }

        tx.commit()?;
        tracing::info!("Deleted {deleted} keywords");
        Ok(deleted)
    }

    /// Append one observation and update the keyword's last-known state.
    ///
    /// Both writes happen in one transaction; `rank = None` (not found) is a
    /// valid observation and is stored as NULL.
    pub fn record_observation(&self, keyword_id: i64, rank: Option<u32>) -> Result<()> {
        let checked_at = Utc::now();
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO rankings (keyword_id, rank, checked_at) VALUES (?1, ?2, ?3)",
            params![keyword_id, rank, checked_at.to_rfc3339()],
        )
        .context("Failed to insert observation")?;

        let updated = tx.execute(
            "UPDATE keywords SET last_rank = ?1, last_checked_at = ?2 WHERE id = ?3",
            params![rank, checked_at.to_rfc3339(), keyword_id],
        )?;
        if updated == 0 {
            return Err(eyre::eyre!("Keyword {} not found", keyword_id));
        }

        tx.commit()?;
        Ok(())
    }

    /// All observations for one keyword, oldest first
    pub fn observations_for(&self, keyword_id: i64) -> Result<Vec<RankObservation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, keyword_id, rank, checked_at FROM rankings
             WHERE keyword_id = ?1 ORDER BY checked_at, id",
        )?;
        let rows = stmt.query_map(params![keyword_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, Option<u32>>(2)?, row.get::<_, String>(3)?))
        })?;

        let mut observations = Vec::new();
        for row in rows {
            let (id, keyword_id, rank, checked_at) = row?;
            observations.push(RankObservation {
                id,
                keyword_id,
                rank,
                checked_at: parse_timestamp(&checked_at)?,
            });
        }
        Ok(observations)
    }

    /// Observations joined with their keyword, most recent first
    pub fn history(&self, limit: usize) -> Result<Vec<ObservationRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT r.id, r.keyword_id, k.keyword, k.target_url, r.rank, r.checked_at
             FROM rankings r JOIN keywords k ON k.id = r.keyword_id
             ORDER BY r.checked_at DESC, r.id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<u32>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut history = Vec::new();
        for row in rows {
            let (id, keyword_id, keyword, target_url, rank, checked_at) = row?;
            history.push(ObservationRow {
                id,
                keyword_id,
                keyword,
                target_url,
                rank,
                checked_at: parse_timestamp(&checked_at)?,
            });
        }
        Ok(history)
    }

    /// Row counts across both tables
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn();
        let keyword_count: i64 = conn.query_row("SELECT COUNT(*) FROM keywords", [], |r| r.get(0))?;
        let observation_count: i64 = conn.query_row("SELECT COUNT(*) FROM rankings", [], |r| r.get(0))?;
        Ok(StoreStats {
            keyword_count: keyword_count as usize,
            observation_count: observation_count as usize,
        })
    }
}

fn keyword_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrackedKeyword> {
    let last_checked_at: Option<String> = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(TrackedKeyword {
        id: row.get(0)?,
        keyword: row.get(1)?,
        target_url: row.get(2)?,
        last_rank: row.get(3)?,
        // Timestamps we wrote ourselves; a parse failure means a corrupt row
        last_checked_at: last_checked_at.as_deref().and_then(|s| parse_timestamp(s).ok()),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
            })?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .context(format!("Invalid timestamp in store: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_parent_dir() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("nested").join("store.db");

        let store = KeywordStore::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_add_and_list_in_insertion_order() {
        let store = KeywordStore::open_in_memory().unwrap();

        let a = store.add("first keyword", "a.example.com").unwrap();
        let b = store.add("second keyword", "b.example.com").unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, a.id);
        assert_eq!(all[1].id, b.id);
        assert_eq!(all[0].keyword, "first keyword");
        assert_eq!(all[0].last_rank, None);
        assert_eq!(all[0].last_checked_at, None);
    }

    #[test]
    fn test_add_bulk() {
        let store = KeywordStore::open_in_memory().unwrap();

        let items = vec![
            ("kw one".to_string(), "one.example.com".to_string()),
            ("kw two".to_string(), "two.example.com".to_string()),
            ("kw three".to_string(), "three.example.com".to_string()),
        ];
        let added = store.add_bulk(&items).unwrap();
        assert_eq!(added.len(), 3);

        let all = store.list().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].target_url, "three.example.com");
    }

    #[test]
    fn test_record_observation_updates_keyword() {
        let store = KeywordStore::open_in_memory().unwrap();
        let kw = store.add("coffee", "shop.example.com").unwrap();

        store.record_observation(kw.id, Some(3)).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all[0].last_rank, Some(3));
        assert!(all[0].last_checked_at.is_some());

        let observations = store.observations_for(kw.id).unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].rank, Some(3));
    }

    #[test]
    fn test_record_not_found_observation() {
        let store = KeywordStore::open_in_memory().unwrap();
        let kw = store.add("coffee", "shop.example.com").unwrap();

        store.record_observation(kw.id, Some(2)).unwrap();
        store.record_observation(kw.id, None).unwrap();

        // Absence is a real observation: appended and reflected in last_rank
        let observations = store.observations_for(kw.id).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[1].rank, None);

        let all = store.list().unwrap();
        assert_eq!(all[0].last_rank, None);
        assert!(all[0].last_checked_at.is_some());
    }

    #[test]
    fn test_record_observation_unknown_keyword_fails() {
        let store = KeywordStore::open_in_memory().unwrap();
        assert!(store.record_observation(999, Some(1)).is_err());
    }

    #[test]
    fn test_delete_bulk_cascades_observations() {
        let store = KeywordStore::open_in_memory().unwrap();
        let a = store.add("keep", "keep.example.com").unwrap();
        let b = store.add("drop", "drop.example.com").unwrap();
        store.record_observation(b.id, Some(1)).unwrap();

        let deleted = store.delete_bulk(&[b.id, 12345]).unwrap();
        assert_eq!(deleted, 1);

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, a.id);

        assert!(store.observations_for(b.id).unwrap().is_empty());
        assert_eq!(store.stats().unwrap().observation_count, 0);
    }

    #[test]
    fn test_history_is_most_recent_first() {
        let store = KeywordStore::open_in_memory().unwrap();
        let a = store.add("alpha", "alpha.example.com").unwrap();
        let b = store.add("beta", "beta.example.com").unwrap();

        store.record_observation(a.id, Some(5)).unwrap();
        store.record_observation(b.id, None).unwrap();
        store.record_observation(a.id, Some(4)).unwrap();

        let rows = store.history(10).unwrap();
        assert_eq!(rows.len(), 3);
        // Same-timestamp rows fall back to id order, newest insert first
        assert_eq!(rows[0].keyword, "alpha");
        assert_eq!(rows[0].rank, Some(4));
        assert_eq!(rows[2].rank, Some(5));

        let limited = store.history(2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_stats() {
        let store = KeywordStore::open_in_memory().unwrap();
        let kw = store.add("coffee", "shop.example.com").unwrap();
        store.record_observation(kw.id, Some(1)).unwrap();
        store.record_observation(kw.id, Some(2)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.keyword_count, 1);
        assert_eq!(stats.observation_count, 2);
    }

    #[test]
    fn test_reopen_preserves_data() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("store.db");

        {
            let store = KeywordStore::open(&db_path).unwrap();
            store.add("persisted", "p.example.com").unwrap();
        }

        let store = KeywordStore::open(&db_path).unwrap();
        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].keyword, "persisted");
    }
}
