//! Core library surface for the Bookshelf TUI application.
//!
//! The `bin` target wires these pieces together; keeping them in a library
//! lets the integration tests drive the same book manager and auth gate the
//! terminal uses.
pub mod auth;
pub mod books;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod state;
pub mod ui;

/// Persistence entry points used by `main.rs` to open the store.
pub use db::{ensure_schema, KeyValueStore, SharedStore};

/// Gate and session types.
pub use auth::{AuthGate, AuthStatus, LocalAuthenticator, PasscodeVault, Session};

/// The book manager and its domain types.
pub use books::{BookError, BookStore, BOOKS_KEY};
pub use models::{Book, BookDraft};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
