//! SQLite storage backend.
//!
//! rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. Every write runs in its own transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, VaultError};
use crate::migration;
use crate::traits::{BackendCapabilities, StorageBackend};

/// SQLite-backed key/value storage.
///
/// Values are stored as plain blobs, so this backend never reports
/// platform-secured storage.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    persistent: bool,
}

impl SqliteBackend {
    /// Open (or create) a database file and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            persistent: true,
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            persistent: false,
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| VaultError::StorageUnavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| VaultError::StorageUnavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            secure: false,
            persistent: self.persistent,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM entries WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let key = key.to_string();
        let value = value.to_vec();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![key, value, migration::now_millis()],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM entries WHERE key = ?1", params![key])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let backend = SqliteBackend::open_memory().unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);

        backend.set("k", b"first").await.unwrap();
        backend.set("k", b"second").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(b"second".to_vec()));

        backend.delete("k").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
        backend.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");

        {
            let backend = SqliteBackend::open(&path).unwrap();
            assert!(backend.capabilities().persistent);
            backend.set("wallet/index", b"[]").await.unwrap();
        }

        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(
            backend.get("wallet/index").await.unwrap(),
            Some(b"[]".to_vec())
        );
        assert!(!backend.capabilities().secure);
    }
}
