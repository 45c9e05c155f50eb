//! SQLite offline document cache
//!
//! Keeps a local copy of every collection a live query has observed so
//! that listeners can still be answered without connectivity.
//!
//! ## Multi-session sharing
//!
//! The cache file runs in WAL journal mode with a busy timeout, so several
//! processes (tabs, windows) pointed at the same data directory can read
//! and write it concurrently. The cache is unbounded: nothing is evicted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::Value;

use crate::query::QuerySpec;
use crate::record::Record;
use crate::storage::error::{CacheError, CacheResult};
use crate::storage::schema::{init_schema, needs_init};

/// How long to wait on a lock held by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Document counts held by the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of distinct collections
    pub collections: usize,
    /// Total number of cached documents
    pub documents: usize,
}

/// Local persistent cache of remote documents
pub struct OfflineCache {
    conn: Connection,
    path: Option<PathBuf>,
}

impl OfflineCache {
    /// Open or create the cache file at `path`
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn =
            Connection::open(path).map_err(|e| CacheError::from_open(e, path.to_path_buf()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // journal_mode returns the resulting mode as a row
        let _mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| CacheError::from_open(e, path.to_path_buf()))?;

        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory cache (for testing)
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Location of the cache file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replace the cached contents of a collection
    ///
    /// Runs in a transaction so readers never see a half-written collection.
    pub fn replace_collection(&mut self, collection: &str, records: &[Record]) -> CacheResult<()> {
        let now = Utc::now().timestamp_millis();
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM documents WHERE collection = ?", params![collection])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO documents (collection, id, data, updated_at) VALUES (?, ?, ?, ?)",
            )?;
            for record in records {
                let data = encode_fields(record)?;
                stmt.execute(params![collection, record.id, data, now])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Load every cached document of a collection, ordered by id
    pub fn load_collection(&self, collection: &str) -> CacheResult<Vec<Record>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, data FROM documents WHERE collection = ? ORDER BY id")?;

        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, data) = row?;
            let value: Value =
                serde_json::from_str(&data).map_err(|source| CacheError::CorruptDocument {
                    collection: collection.to_string(),
                    id: id.clone(),
                    source,
                })?;
            if let Some(record) = Record::from_value(id, value) {
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Answer a query from cached documents only
    pub fn query(&self, spec: &QuerySpec) -> CacheResult<Vec<Record>> {
        let records = self.load_collection(&spec.collection)?;
        Ok(spec.evaluate(records))
    }

    /// Count cached collections and documents
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let (collections, documents): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(DISTINCT collection), COUNT(*) FROM documents",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(CacheStats {
            collections: collections.max(0) as usize,
            documents: documents.max(0) as usize,
        })
    }

    /// Drop every cached document
    pub fn clear(&self) -> CacheResult<()> {
        self.conn.execute("DELETE FROM documents", [])?;
        Ok(())
    }
}

fn encode_fields(record: &Record) -> CacheResult<String> {
    Ok(serde_json::to_string(&record.fields)?)
}
