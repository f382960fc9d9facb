use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};

mod schema;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded writing {key}")]
    QuotaExceeded { key: String },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Key-value port behind which the comment history is persisted.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process store. Clones share the same entries, so dropping one app and
/// building another over a clone behaves like a page reload.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl SqliteStore {
    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.open_for_port()?;
        conn.query_row(
            "SELECT value FROM kv_entries WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|err| classify(err, key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.open_for_port()?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .map(|_| ())
        .map_err(|err| classify(err, key))
    }
}

impl SqliteStore {
    fn open_for_port(&self) -> Result<Connection, StorageError> {
        self.connect()
            .map_err(|err| StorageError::Unavailable(format!("{err:#}")))
    }
}

fn classify(err: rusqlite::Error, key: &str) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DiskFull => StorageError::QuotaExceeded {
                key: key.to_string(),
            },
            ErrorCode::CannotOpen
            | ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked => StorageError::Unavailable(err.to_string()),
            _ => StorageError::Backend(err.to_string()),
        },
        _ => StorageError::Backend(err.to_string()),
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<SqliteStore> {
    let db_path = &paths.database_path;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "comment storage ready");
    Ok(SqliteStore {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.busy_timeout(Duration::from_secs(5))
        .context("setting busy timeout")?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_row| Ok(()))
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn init_store() -> anyhow::Result<(TempDir, SqliteStore)> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted(temp.path());
        paths.ensure_directories()?;
        let store = init(&paths, &StorageOptions::default())?;
        Ok((temp, store))
    }

    #[test]
    fn memory_store_clones_share_entries() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let reloaded = store.clone();
        store.set("k", "v")?;
        assert_eq!(reloaded.get("k")?.as_deref(), Some("v"));
        assert_eq!(reloaded.get("missing")?, None);
        Ok(())
    }

    #[test]
    fn memory_store_enforces_quota() -> anyhow::Result<()> {
        let store = MemoryStore::with_quota(8);
        store.set("ab", "cd")?;
        assert_matches!(
            store.set("key", "too long"),
            Err(StorageError::QuotaExceeded { ref key }) if key == "key"
        );
        // overwriting an existing key only counts the new value
        store.set("ab", "cdef")?;
        assert_eq!(store.raw("ab").as_deref(), Some("cdef"));
        Ok(())
    }

    #[test]
    fn sqlite_store_round_trips_and_overwrites() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        assert_eq!(store.get("comments_post_1")?, None);
        store.set("comments_post_1", "[]")?;
        store.set("comments_post_1", "[1]")?;
        store.set("comments_post_2", "[2]")?;
        assert_eq!(store.get("comments_post_1")?.as_deref(), Some("[1]"));
        assert_eq!(store.get("comments_post_2")?.as_deref(), Some("[2]"));
        Ok(())
    }

    #[test]
    fn sqlite_store_persists_across_handles() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted(temp.path());
        let options = StorageOptions::default();
        init(&paths, &options)?.set("key", "value")?;
        let reopened = init(&paths, &options)?;
        assert_eq!(reopened.get("key")?.as_deref(), Some("value"));
        Ok(())
    }
}
