use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use nova_core::time::{iso8601, now_unix_millis};

use crate::error::Result;
use crate::schema;

/// String-keyed blob storage. Values are opaque text (JSON in practice).
///
/// Writes take `&mut self`; hosts that share a store across tasks wrap it
/// in a mutex.
pub trait KvStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
    /// Returns whether the key existed.
    fn delete(&mut self, key: &str) -> Result<bool>;
    /// All keys in lexical order.
    fn keys(&self) -> Result<Vec<String>>;
    /// Flush pending writes to durable storage. No-op by default.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// When `key` was last written, as an ISO-8601 string.
    pub fn updated_at(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT updated_at FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn checkpoint_truncate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, iso8601(now_unix_millis())],
        )?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let n = self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(n > 0)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn flush(&mut self) -> Result<()> {
        self.checkpoint_truncate()
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if let Err(e) = self.checkpoint_truncate() {
            tracing::warn!("WAL checkpoint on close failed: {e}");
        }
    }
}

/// Process-local store for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    entries: BTreeMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &mut dyn KvStore) {
        assert_eq!(store.get("missing").unwrap(), None);

        store.put("b", "2").unwrap();
        store.put("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.put("a", "one").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("one"));
        assert_eq!(store.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert_eq!(store.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_sqlite_kv_contract() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        exercise(&mut store);
    }

    #[test]
    fn test_memory_kv_contract() {
        let mut store = MemoryKv::new();
        exercise(&mut store);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_updated_at_recorded() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.updated_at("k").unwrap(), None);
        store.put("k", "v").unwrap();
        let ts = store.updated_at("k").unwrap().unwrap();
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_metadata() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get_metadata("schema_version").unwrap().as_deref(), Some("1"));
        store.set_metadata("owner", "nova").unwrap();
        assert_eq!(store.get_metadata("owner").unwrap().as_deref(), Some("nova"));
        assert_eq!(store.get_metadata("nope").unwrap(), None);
    }
}
