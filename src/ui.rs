//! Ratatui front-end: the auth gate screen, the book list, and the modal
//! form and confirmation popups layered on top of it.

mod app;
mod challenge;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use challenge::TerminalAuthenticator;
pub use terminal::{read_secret, run_app};
