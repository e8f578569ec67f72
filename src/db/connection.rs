use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use log::info;
use rusqlite::Connection;

use super::kv::SqliteStore;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".bookshelf";
/// SQLite file name stored inside the application data directory.
pub const DB_FILE_NAME: &str = "bookshelf.sqlite";

/// Ensure the database file exists inside `data_dir`, create the key-value
/// table lazily, and return a store wrapping the live connection.
pub fn ensure_schema(data_dir: &Path) -> Result<SqliteStore> {
    fs::create_dir_all(data_dir).context("failed to create data directory")?;

    let db_path = data_dir.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path).context("failed to open SQLite database")?;
    create_tables(&conn)?;

    info!(
        "event=store_open module=db status=ok path={}",
        db_path.display()
    );
    Ok(SqliteStore::new(conn))
}

/// Same schema on a private in-memory database.
#[cfg(test)]
pub(crate) fn open_in_memory() -> Result<SqliteStore> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    create_tables(&conn)?;
    Ok(SqliteStore::new(conn))
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create kv table")?;
    Ok(())
}

/// Resolve `~/.bookshelf`, the data directory used when none is configured.
pub fn default_data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::KeyValueStore;

    #[test]
    fn ensure_schema_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");

        let store = ensure_schema(&data_dir).unwrap();
        store.set_item("k", "v").unwrap();

        assert!(data_dir.join(DB_FILE_NAME).exists());
    }

    #[test]
    fn ensure_schema_is_idempotent_and_keeps_values() {
        let dir = tempfile::tempdir().unwrap();

        let store = ensure_schema(dir.path()).unwrap();
        store.set_item("k", "v").unwrap();
        drop(store);

        let reopened = ensure_schema(dir.path()).unwrap();
        assert_eq!(reopened.get_item("k").unwrap().as_deref(), Some("v"));
    }
}
