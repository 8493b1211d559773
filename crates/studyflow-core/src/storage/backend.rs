//! Durable key-value byte stores.
//!
//! The repository only needs `get`/`set` by string key; backends are opaque
//! byte buckets and never interpret the values they hold.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

use super::data_dir;
use crate::error::{CoreError, StorageError};

/// Key-value byte store the state repository persists into.
pub trait StorageBackend {
    /// Read the bytes stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// All keys currently stored, sorted.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// In-process store, optionally capped like a browser storage quota.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, Vec<u8>>,
    capacity: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once keys plus values exceed `bytes`.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity: Some(bytes),
        }
    }

    /// Change the quota; `None` removes it.
    pub fn set_capacity(&mut self, capacity: Option<usize>) {
        self.capacity = capacity;
    }

    /// Bytes currently used by keys and values.
    pub fn used(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if let Some(capacity) = self.capacity {
            let replaced = self.entries.get(key).map_or(0, |v| key.len() + v.len());
            let available = capacity.saturating_sub(self.used() - replaced);
            let needed = key.len() + value.len();
            if needed > available {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// SQLite-backed store using a single `kv` table.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open the store at `<data dir>/studyflow.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open_default() -> Result<Self, CoreError> {
        let path = data_dir()?.join("studyflow.db");
        Ok(Self::open(&path)?)
    }

    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let backend = Self { conn };
        backend.migrate()?;
        Ok(backend)
    }

    /// Open an in-memory store.
    pub fn open_memory() -> Result<Self, StorageError> {
        let backend = Self {
            conn: Connection::open_in_memory()?,
        };
        backend.migrate()?;
        Ok(backend)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value BLOB NOT NULL
            );",
        )
    }
}

impl StorageBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_roundtrip() {
        let mut backend = MemoryBackend::new();
        assert!(backend.get("a").unwrap().is_none());
        backend.set("a", b"hello").unwrap();
        assert_eq!(backend.get("a").unwrap().unwrap(), b"hello");
        backend.set("a", b"bye").unwrap();
        assert_eq!(backend.get("a").unwrap().unwrap(), b"bye");
        assert_eq!(backend.keys().unwrap(), vec!["a"]);
    }

    #[test]
    fn memory_backend_enforces_quota() {
        let mut backend = MemoryBackend::with_capacity(10);
        backend.set("k", b"12345").unwrap();
        // Replacing counts only the delta against the old value.
        backend.set("k", b"123456789").unwrap();
        let err = backend.set("other", b"x").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(backend.get("k").unwrap().unwrap(), b"123456789");
    }

    #[test]
    fn sqlite_backend_roundtrip() {
        let mut backend = SqliteBackend::open_memory().unwrap();
        backend.set("b", b"two").unwrap();
        backend.set("a", b"one").unwrap();
        backend.set("a", b"uno").unwrap();
        assert_eq!(backend.get("a").unwrap().unwrap(), b"uno");
        assert_eq!(backend.keys().unwrap(), vec!["a", "b"]);
        assert!(backend.get("c").unwrap().is_none());
    }

    #[test]
    fn sqlite_backend_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let mut backend = SqliteBackend::open(&path).unwrap();
            backend.set("state", b"{}").unwrap();
        }
        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.get("state").unwrap().unwrap(), b"{}");
    }
}
