//! Persistence module split across logical submodules. The application only
//! ever needs a string key-value store, so the SQLite file holds a single
//! `kv` table and everything above it speaks in keys and serialized values.

mod connection;
mod kv;

pub use connection::{default_data_dir, ensure_schema, DB_FILE_NAME};
#[cfg(test)]
pub(crate) use connection::open_in_memory;
pub use kv::{KeyValueStore, MemoryStore, SharedStore, SqliteStore, StoreError};
