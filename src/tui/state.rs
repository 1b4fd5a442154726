//! TUI state algebra: pure types, zero effects.
//!
//! One [`App`] exists per connected session and is owned by that session's
//! loop. Nothing here is shared between sessions except the `'static` menu.

use crate::profile::MENU;
use crate::types::MenuEntry;

use super::theme::Styles;

// ============================================================================
// SESSION EVENTS
// ============================================================================

/// Everything the session loop can receive from the transport.
///
/// The transport holds the sending half. Dropping it is how a disconnect
/// reaches the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Raw bytes typed by the visitor.
    Input(Vec<u8>),
    /// The visitor's terminal changed size.
    Resize { width: u16, height: u16 },
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

/// Per-session model.
#[derive(Debug, Clone, PartialEq)]
pub struct App {
    /// Terminal width in cells, as last reported.
    pub width: u16,
    /// Terminal height in cells, as last reported.
    pub height: u16,
    /// Index of the highlighted entry. Always within the menu.
    pub selected: usize,
    /// Style handles bound at session start.
    pub styles: Styles,
    /// Read-only menu this session navigates.
    pub menu: &'static [MenuEntry],
}

// ============================================================================
// ACTIONS
// ============================================================================

/// Semantic input, decoded from raw keys or resize notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// New terminal geometry.
    Resize { width: u16, height: u16 },
    /// Highlight the previous entry.
    MoveUp,
    /// Highlight the next entry.
    MoveDown,
    /// Activate the highlighted entry.
    Enter,
    /// End the session.
    Quit,
}

// ============================================================================
// EFFECTS
// ============================================================================

/// Side effect requested by a pure transition.
///
/// Pure code never executes these; it only describes them.
/// The session loop interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Hand a URL to the host's browser opener. Fire-and-forget.
    OpenUrl { url: String },
    /// Terminate the session.
    Quit,
}

// ============================================================================
// CONSTRUCTORS
// ============================================================================

impl App {
    /// Session model over the default menu, first entry highlighted.
    pub fn new(width: u16, height: u16, styles: Styles) -> Self {
        App::with_menu(width, height, styles, &MENU)
    }

    /// Session model over an arbitrary menu.
    pub fn with_menu(width: u16, height: u16, styles: Styles, menu: &'static [MenuEntry]) -> Self {
        App {
            width,
            height,
            selected: 0,
            styles,
            menu,
        }
    }

    /// The highlighted entry, if the menu is non-empty.
    pub fn current(&self) -> Option<&'static MenuEntry> {
        self.menu.get(self.selected)
    }
}

// ============================================================================
// TESTS
// ============================================================================
