//! Disk-backed deduplication index keyed by `order_id`.
//!
//! Schema is installed through `rusqlite_migration`, the same embedded-
//! migrations pattern the original coverage store used: a directory of
//! versioned SQL scripts baked into the binary via `include_dir`.

use std::path::PathBuf;

use include_dir::{include_dir, Dir};
use lazy_static::lazy_static;
use rusqlite::Connection;
use rusqlite_migration::Migrations;

use crate::error::Result;

static MIGRATIONS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/migrations");

lazy_static! {
    static ref MIGRATIONS: Migrations<'static> =
        Migrations::from_directory(&MIGRATIONS_DIR).unwrap();
}

/// Persistent, keyed set of seen `order_id`s. Not reset between runs:
/// the index grows across invocations, providing cross-run
/// deduplication (an open question in the source spec, resolved here
/// as "no eviction" — documented, not silently assumed).
pub struct DedupIndex {
    conn: Connection,
}

impl DedupIndex {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(&path)?;
        MIGRATIONS.to_latest(&mut conn)?;
        Ok(DedupIndex { conn })
    }

    /// `true` if `order_id` has already been marked seen.
    pub fn is_duplicate(&self, order_id: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM seen WHERE order_id = ?1 LIMIT 1")?;
        Ok(stmt.exists([order_id])?)
    }

    pub fn mark_seen(&self, order_id: &str) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT OR IGNORE INTO seen (order_id) VALUES (?1)")?;
        stmt.execute([order_id])?;
        Ok(())
    }

    /// Test-and-insert: returns `true` if `order_id` was new (and is now
    /// marked seen), `false` if it was already a duplicate.
    pub fn admit(&self, order_id: &str) -> Result<bool> {
        if self.is_duplicate(order_id)? {
            return Ok(false);
        }
        self.mark_seen(order_id)?;
        Ok(true)
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fresh_order_id_is_not_a_duplicate() {
        let dir = TempDir::new().unwrap();
        let index = DedupIndex::open(dir.path().join("dedup/order_id.db")).unwrap();
        assert!(!index.is_duplicate("ORD-1").unwrap());
    }

    #[test]
    fn marked_order_id_is_a_duplicate() {
        let dir = TempDir::new().unwrap();
        let index = DedupIndex::open(dir.path().join("dedup/order_id.db")).unwrap();
        index.mark_seen("ORD-1").unwrap();
        assert!(index.is_duplicate("ORD-1").unwrap());
    }

    #[test]
    fn admit_is_test_and_insert() {
        let dir = TempDir::new().unwrap();
        let index = DedupIndex::open(dir.path().join("dedup/order_id.db")).unwrap();
        assert!(index.admit("ORD-7").unwrap());
        assert!(!index.admit("ORD-7").unwrap());
    }

    #[test]
    fn survives_across_instances_on_same_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dedup/order_id.db");

        let index = DedupIndex::open(&path).unwrap();
        index.mark_seen("ORD-9").unwrap();
        index.close().unwrap();

        let reopened = DedupIndex::open(&path).unwrap();
        assert!(reopened.is_duplicate("ORD-9").unwrap());
    }
}
