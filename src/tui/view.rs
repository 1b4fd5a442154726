//! Pure rendering: map App state to one text block per frame.
//!
//! `view()` builds the block (state in, text out). `render()` places it on
//! the frame behind the main container's left margin; the only effect is
//! Frame::render_widget() which writes to the terminal buffer.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

use crate::profile::{ABOUT_BODY, ABOUT_GREETING, ABOUT_GREETING_END, NAME};

use super::state::App;
use super::theme::Styles;

/// Footer hints, in display order.
const HINTS: [&str; 3] = ["j/k, up/down: navigate", "enter: choose", "q, ctrl+c: quit"];

// ============================================================================
// DISPATCH
// ============================================================================

/// Draw the current frame.
pub fn render(app: &App, frame: &mut Frame) {
    let area = content_area(frame.area(), app.styles.margin_left);
    let paragraph = Paragraph::new(view(app)).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// The whole frame as a single block of styled lines.
///
/// About paragraph, checkbox list and footer, separated by blank lines,
/// with one blank line above and two below.
pub fn view(app: &App) -> Text<'static> {
    let mut lines = vec![Line::default()];
    lines.extend(about(&app.styles));
    lines.push(Line::default());
    lines.extend(checklist(app));
    lines.push(Line::default());
    lines.push(footer(&app.styles));
    lines.push(Line::default());
    lines.push(Line::default());
    Text::from(lines)
}

/// Area left after the main container's margin.
fn content_area(area: Rect, margin_left: u16) -> Rect {
    let margin = margin_left.min(area.width);
    Rect {
        x: area.x + margin,
        width: area.width - margin,
        ..area
    }
}

// ============================================================================
// BLOCKS
// ============================================================================

fn about(styles: &Styles) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(ABOUT_GREETING, styles.about),
        Span::styled(NAME, styles.name),
        Span::styled(ABOUT_GREETING_END, styles.about),
    ])];
    lines.extend(
        ABOUT_BODY
            .iter()
            .map(|text| Line::from(Span::styled(*text, styles.about))),
    );
    lines
}

fn checklist(app: &App) -> Vec<Line<'static>> {
    app.menu
        .iter()
        .enumerate()
        .map(|(i, entry)| checkbox(&app.styles, entry.label, i == app.selected))
        .collect()
}

fn checkbox(styles: &Styles, label: &'static str, checked: bool) -> Line<'static> {
    if checked {
        Line::from(Span::styled(format!("[x] {label}"), styles.checkbox))
    } else {
        Line::from(format!("[ ] {label}"))
    }
}

fn footer(styles: &Styles) -> Line<'static> {
    let mut spans = Vec::with_capacity(HINTS.len() * 2);
    for (i, hint) in HINTS.iter().enumerate() {
        if i > 0 {
            spans.push(styles.separator.clone());
        }
        spans.push(Span::styled(*hint, styles.subtle));
    }
    Line::from(spans)
}

// ============================================================================
// TESTS
// ============================================================================
