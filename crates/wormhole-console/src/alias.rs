//! Persistent agent alias store
//!
//! A small embedded key/value table: `alias:<agent-id>` → label. Aliases
//! are display-only (prompt and listings); routing always uses the agent
//! id. Operations block on the SQLite connection but are thread-safe.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use wormhole_core::AgentId;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value BLOB NOT NULL)";

/// Errors from the alias store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("alias store: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Embedded KV store holding operator-assigned agent labels.
pub struct AliasStore {
    conn: Mutex<Connection>,
}

impl AliasStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Store an opaque value under `key`.
    pub fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("alias store lock poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Fetch the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.conn.lock().expect("alias store lock poisoned");
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Assign a label to an agent.
    pub fn set_alias(&self, id: &AgentId, label: &str) -> Result<(), StoreError> {
        self.put(&alias_key(id), label.as_bytes())
    }

    /// Look up an agent's label. Lookup failures degrade to "no alias".
    pub fn alias(&self, id: &AgentId) -> Option<String> {
        match self.get(&alias_key(id)) {
            Ok(Some(bytes)) => {
                let label = String::from_utf8_lossy(&bytes).into_owned();
                if label.is_empty() {
                    None
                } else {
                    Some(label)
                }
            }
            Ok(None) => None,
            Err(err) => {
                tracing::debug!("alias lookup for {} failed: {}", id, err);
                None
            }
        }
    }
}

fn alias_key(id: &AgentId) -> String {
    format!("alias:{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> AliasStore {
        AliasStore::open(dir.path().join("aliases.db")).unwrap()
    }

    #[test]
    fn test_alias_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = AgentId::new("agent-1");

        assert!(store.alias(&id).is_none());
        store.set_alias(&id, "web-box").unwrap();
        assert_eq!(store.alias(&id).as_deref(), Some("web-box"));
    }

    #[test]
    fn test_alias_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = AgentId::new("agent-1");

        store.set_alias(&id, "old").unwrap();
        store.set_alias(&id, "new").unwrap();
        assert_eq!(store.alias(&id).as_deref(), Some("new"));
    }

    #[test]
    fn test_aliases_are_keyed_per_agent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.set_alias(&AgentId::new("a"), "first").unwrap();
        store.set_alias(&AgentId::new("b"), "second").unwrap();
        assert_eq!(store.alias(&AgentId::new("a")).as_deref(), Some("first"));
        assert_eq!(store.alias(&AgentId::new("b")).as_deref(), Some("second"));
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aliases.db");
        {
            let store = AliasStore::open(&path).unwrap();
            store.set_alias(&AgentId::new("a"), "durable").unwrap();
        }
        let store = AliasStore::open(&path).unwrap();
        assert_eq!(store.alias(&AgentId::new("a")).as_deref(), Some("durable"));
    }

    #[test]
    fn test_raw_kv_is_opaque_bytes() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.put("blob", &[0u8, 159, 146, 150]).unwrap();
        assert_eq!(store.get("blob").unwrap().unwrap(), vec![0u8, 159, 146, 150]);
        assert!(store.get("missing").unwrap().is_none());
    }
}
