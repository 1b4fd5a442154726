//! Pure state transitions: (App, Action) → (App, Option<Effect>).
//!
//! This is the core logic of the TUI. Fully testable without a terminal.
//! Every action has a defined transition; none of them can fail.

use crate::types::EntryAction;

use super::state::{Action, App, Effect};

/// Pure state transition function.
///
/// Returns the next model and, optionally, a side effect for the session
/// loop to carry out.
pub fn update(app: App, action: &Action) -> (App, Option<Effect>) {
    match *action {
        Action::Resize { width, height } => (App { width, height, ..app }, None),
        Action::MoveUp => {
            let selected = app.selected.saturating_sub(1);
            (App { selected, ..app }, None)
        }
        Action::MoveDown => {
            let len = app.menu.len();
            let selected = if len == 0 { 0 } else { (app.selected + 1).min(len - 1) };
            (App { selected, ..app }, None)
        }
        Action::Enter => {
            let effect = app.current().and_then(|entry| match entry.action {
                EntryAction::Link(url) => Some(Effect::OpenUrl {
                    url: url.to_string(),
                }),
                EntryAction::Info(_) => None,
            });
            (app, effect)
        }
        Action::Quit => (app, Some(Effect::Quit)),
    }
}

/// Fold a sequence of actions, collecting the effects they produce.
///
/// Stops at the first [`Effect::Quit`]: a terminated session processes
/// nothing further.
pub fn update_all<'a>(
    mut app: App,
    actions: impl IntoIterator<Item = &'a Action>,
) -> (App, Vec<Effect>) {
    let mut effects = Vec::new();
    for action in actions {
        let (next, effect) = update(app, action);
        app = next;
        if let Some(effect) = effect {
            let quit = effect == Effect::Quit;
            effects.push(effect);
            if quit {
                break;
            }
        }
    }
    (app, effects)
}

// ============================================================================
// TESTS
// ============================================================================
