//! Domain types for folio-ssh.
//!
//! Menu entries are process-wide and read-only; everything session-scoped
//! lives in [`crate::tui::state`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// MENU
// ============================================================================

/// What activating a menu entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    /// Open this URL with the host's browser opener.
    Link(&'static str),
    /// Purely informational; activating it does nothing.
    Info(&'static str),
}

/// One line of the checkbox menu.
///
/// Order in the menu slice defines the index the selection points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry {
    /// Text shown after the checkbox.
    pub label: &'static str,
    /// What Enter does on this entry.
    pub action: EntryAction,
}

impl MenuEntry {
    /// Entry that opens `url` when activated.
    pub const fn link(label: &'static str, url: &'static str) -> Self {
        MenuEntry {
            label,
            action: EntryAction::Link(url),
        }
    }

    /// Entry that only displays information.
    pub const fn info(label: &'static str, text: &'static str) -> Self {
        MenuEntry {
            label,
            action: EntryAction::Info(text),
        }
    }

    /// URL to open, if this entry is a link.
    pub fn url(&self) -> Option<&'static str> {
        match self.action {
            EntryAction::Link(url) => Some(url),
            EntryAction::Info(_) => None,
        }
    }
}

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

/// Listener settings, assembled from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Address the SSH listener binds to.
    pub addr: SocketAddr,
    /// OpenSSH-format private host key. Generated if missing.
    pub host_key_path: PathBuf,
    /// How long in-flight sessions get to finish after shutdown starts.
    pub grace_period: Duration,
    /// Drop connections with no traffic for this long.
    pub idle_timeout: Duration,
}

impl Default for ServeConfig {
    fn default() -> Self {
        ServeConfig {
            addr: SocketAddr::from(([0, 0, 0, 0], 22)),
            host_key_path: PathBuf::from(".ssh/id_ed25519"),
            grace_period: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(3600),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
