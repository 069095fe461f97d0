//! SQLite key/value store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use super::traits::{PersistentStore, StoreMap};
use crate::error::{Result, VaultError};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS kv (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"#;

/// A [`PersistentStore`] on a single SQLite table.
///
/// Each `set` runs in one transaction, so batches are atomic. Queries run
/// on the blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_conn(&conn)?;
            f(&mut guard)
        })
        .await?
    }
}

/// Lock the database connection, returning an error if the mutex is poisoned.
fn lock_conn(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| VaultError::Storage("SQLite connection poisoned".to_string()))
}

#[async_trait]
impl PersistentStore for SqliteStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreMap> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?")?;
            let mut found = StoreMap::new();
            for key in keys {
                let text: Option<String> =
                    stmt.query_row([&key], |row| row.get(0)).optional()?;
                if let Some(text) = text {
                    let value = serde_json::from_str(&text).map_err(|e| {
                        VaultError::Storage(format!("Corrupt value for {}: {}", key, e))
                    })?;
                    found.insert(key, value);
                }
            }
            Ok(found)
        })
        .await
    }

    async fn set(&self, entries: StoreMap) -> Result<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for (key, value) in &entries {
                tx.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    (key, serde_json::to_string(value)?),
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for key in &keys {
                tx.execute("DELETE FROM kv WHERE key = ?", [key])?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    fn atomic_batches(&self) -> bool {
        true
    }
}
