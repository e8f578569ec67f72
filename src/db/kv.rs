use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

/// Failures of the key-value layer. Callers above it decide whether a failure
/// is surfaced or only logged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failed")]
    Backend(#[from] rusqlite::Error),
    #[error("stored value for `{key}` is not valid JSON")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize value for `{key}`")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
}

/// Device-local string key-value store. Values are opaque strings; callers
/// own their serialization.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

/// The single store instance is shared between the book manager and the
/// passcode vault on the one UI thread.
pub type SharedStore = Rc<dyn KeyValueStore>;

/// `kv` table inside the application SQLite file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl KeyValueStore for SqliteStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Upsert so the whole value is replaced in one statement.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-process store. `fail_writes` lets tests simulate a storage device that
/// accepts reads but rejects every write.
#[derive(Default)]
pub struct MemoryStore {
    items: RefCell<HashMap<String, String>>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            Err(StoreError::Unavailable("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn sqlite_store_round_trips_and_overwrites() {
        let store = open_in_memory().unwrap();
        assert_eq!(store.get_item("@missing").unwrap(), None);

        store.set_item("@books", "[]").unwrap();
        store.set_item("@books", "[1]").unwrap();
        assert_eq!(store.get_item("@books").unwrap().as_deref(), Some("[1]"));

        store.remove_item("@books").unwrap();
        assert_eq!(store.get_item("@books").unwrap(), None);
    }

    #[test]
    fn remove_of_missing_key_is_not_an_error() {
        let store = open_in_memory().unwrap();
        store.remove_item("@nothing").unwrap();
    }

    #[test]
    fn memory_store_can_reject_writes() {
        let store = MemoryStore::new();
        store.set_item("a", "1").unwrap();
        store.set_fail_writes(true);

        let err = store.set_item("a", "2").unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.get_item("a").unwrap().as_deref(), Some("1"));
    }
}
