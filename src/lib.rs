//! folio-ssh: a personal portfolio served as a terminal app over SSH.

pub mod error;
pub mod profile;
pub mod server;
pub mod tui;
pub mod types;
