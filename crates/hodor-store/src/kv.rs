// kv.rs — SQLite-backed key-value store.
//
// All values live in one table keyed by (bucket, key). Buckets keep job ids
// and release keys in separate namespaces so they can never collide.
// Every get/set runs in its own transaction and callers may treat a
// returned set as durable.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
  bucket TEXT NOT NULL,
  key TEXT NOT NULL,
  value BLOB NOT NULL,
  PRIMARY KEY (bucket, key)
);
"#;

/// Key namespace inside the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Job id → encoded JobStatus.
    Jobs,
    /// Release key → latest successfully installed tag.
    Tags,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Jobs => "jobs",
            Bucket::Tags => "tags",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transactional key-value store shared by request threads and the worker.
pub struct KvStore {
    conn: Mutex<Connection>,
}

impl KvStore {
    /// Open (or create) a store file. Creates the parent directory if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )?;
        tracing::debug!(path = %path.display(), "opened status store");
        Self::with_connection(conn)
    }

    /// A store that lives only as long as this value.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Read the value under `key`, or `StoreError::NotFound`.
    pub fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value: Option<Vec<u8>> = tx
            .query_row(
                "SELECT value FROM kv WHERE bucket = ?1 AND key = ?2",
                params![bucket.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        tx.commit()?;

        value.ok_or_else(|| StoreError::NotFound {
            bucket,
            key: key.to_string(),
        })
    }

    /// Write (or overwrite) the value under `key`.
    pub fn set(&self, bucket: Bucket, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO kv (bucket, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(bucket, key) DO UPDATE SET value = excluded.value",
            params![bucket.as_str(), key, value],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}
