//! Fixed palette and per-session style bindings.
//!
//! The palette is expressed in xterm-256 indices. Each session resolves it
//! once, at start, against the colour depth its terminal advertises:
//! - Magenta (213): the selected checkbox
//! - Gray (246, bold): the about paragraph
//! - Blue (33, bold): the author's name
//! - Dim gray (241): footer hints
//! - Near black (236): separator dots

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

// ============================================================================
// PALETTE
// ============================================================================

pub const PALETTE_CHECKBOX: u8 = 213;
pub const PALETTE_ABOUT: u8 = 246;
pub const PALETTE_NAME: u8 = 33;
pub const PALETTE_SUBTLE: u8 = 241;
pub const PALETTE_DOT: u8 = 236;

/// Glyph between footer hints.
pub const SEPARATOR: &str = " • ";

/// Left margin of the main container, in cells.
pub const MAIN_MARGIN_LEFT: u16 = 2;

// ============================================================================
// COLOR PROFILE
// ============================================================================

/// How many colours the session's terminal can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorProfile {
    /// 24-bit colour.
    TrueColor,
    /// xterm 256-colour palette.
    Ansi256,
    /// The 16 basic ANSI colours.
    Ansi16,
    /// No colour at all; bold and friends still apply.
    Ascii,
}

impl ColorProfile {
    /// Guess the profile from the TERM value sent with the pty request.
    pub fn from_term(term: &str) -> Self {
        let term = term.trim().to_ascii_lowercase();
        if term.is_empty() || term == "dumb" {
            ColorProfile::Ascii
        } else if term.contains("truecolor") || term.contains("24bit") || term.contains("direct") {
            ColorProfile::TrueColor
        } else if term.contains("256color") {
            ColorProfile::Ansi256
        } else {
            ColorProfile::Ansi16
        }
    }

    /// Map a palette index to a colour this profile can display.
    ///
    /// None means "leave the foreground alone".
    pub fn color(self, index: u8) -> Option<Color> {
        match self {
            ColorProfile::TrueColor | ColorProfile::Ansi256 => Some(Color::Indexed(index)),
            ColorProfile::Ansi16 => Some(nearest_ansi16(index)),
            ColorProfile::Ascii => None,
        }
    }
}

// ============================================================================
// STYLE BINDINGS
// ============================================================================

/// Style handles bound to one session.
///
/// Resolved once when the session starts; never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Styles {
    /// Left margin applied to the whole frame.
    pub margin_left: u16,
    pub about: Style,
    pub name: Style,
    pub checkbox: Style,
    pub subtle: Style,
    /// Pre-styled separator glyph.
    pub separator: Span<'static>,
}

impl Styles {
    /// Bind the fixed palette for a terminal with the given profile.
    pub fn resolve(profile: ColorProfile) -> Self {
        let fg = |index: u8| match profile.color(index) {
            Some(color) => Style::new().fg(color),
            None => Style::new(),
        };

        Styles {
            margin_left: MAIN_MARGIN_LEFT,
            about: fg(PALETTE_ABOUT).add_modifier(Modifier::BOLD),
            name: fg(PALETTE_NAME).add_modifier(Modifier::BOLD),
            checkbox: fg(PALETTE_CHECKBOX).remove_modifier(Modifier::BOLD),
            subtle: fg(PALETTE_SUBTLE),
            separator: Span::styled(SEPARATOR, fg(PALETTE_DOT)),
        }
    }
}

impl Default for Styles {
    fn default() -> Self {
        Styles::resolve(ColorProfile::Ansi256)
    }
}

// ============================================================================
// 256 -> 16 COLOUR REDUCTION
// ============================================================================

/// xterm default RGB values for the 16 basic colours, in index order.
const ANSI16: [(Color, (u8, u8, u8)); 16] = [
    (Color::Black, (0, 0, 0)),
    (Color::Red, (205, 0, 0)),
    (Color::Green, (0, 205, 0)),
    (Color::Yellow, (205, 205, 0)),
    (Color::Blue, (0, 0, 238)),
    (Color::Magenta, (205, 0, 205)),
    (Color::Cyan, (0, 205, 205)),
    (Color::Gray, (229, 229, 229)),
    (Color::DarkGray, (127, 127, 127)),
    (Color::LightRed, (255, 0, 0)),
    (Color::LightGreen, (0, 255, 0)),
    (Color::LightYellow, (255, 255, 0)),
    (Color::LightBlue, (92, 92, 255)),
    (Color::LightMagenta, (255, 0, 255)),
    (Color::LightCyan, (0, 255, 255)),
    (Color::White, (255, 255, 255)),
];

/// RGB of an xterm-256 palette entry.
fn xterm_rgb(index: u8) -> (u8, u8, u8) {
    const CUBE: [u8; 6] = [0, 95, 135, 175, 215, 255];
    match index {
        0..=15 => ANSI16[index as usize].1,
        16..=231 => {
            let i = index - 16;
            (
                CUBE[(i / 36) as usize],
                CUBE[((i / 6) % 6) as usize],
                CUBE[(i % 6) as usize],
            )
        }
        _ => {
            let level = 8 + 10 * (index - 232);
            (level, level, level)
        }
    }
}

fn nearest_ansi16(index: u8) -> Color {
    if index < 16 {
        return ANSI16[index as usize].0;
    }
    let (r, g, b) = xterm_rgb(index);
    let distance = |(cr, cg, cb): (u8, u8, u8)| {
        let dr = i32::from(r) - i32::from(cr);
        let dg = i32::from(g) - i32::from(cg);
        let db = i32::from(b) - i32::from(cb);
        dr * dr + dg * dg + db * db
    };
    ANSI16
        .iter()
        .min_by_key(|(_, rgb)| distance(*rgb))
        .map(|(color, _)| *color)
        .unwrap_or(Color::Reset)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_detection() {
        assert_eq!(ColorProfile::from_term("xterm-256color"), ColorProfile::Ansi256);
        assert_eq!(ColorProfile::from_term("xterm-direct"), ColorProfile::TrueColor);
        assert_eq!(ColorProfile::from_term("vt100"), ColorProfile::Ansi16);
        assert_eq!(ColorProfile::from_term("dumb"), ColorProfile::Ascii);
        assert_eq!(ColorProfile::from_term(""), ColorProfile::Ascii);
    }

    #[test]
    fn ansi256_keeps_palette_indices() {
        let styles = Styles::resolve(ColorProfile::Ansi256);
        assert_eq!(styles.checkbox.fg, Some(Color::Indexed(PALETTE_CHECKBOX)));
        assert_eq!(styles.name.fg, Some(Color::Indexed(PALETTE_NAME)));
        assert_eq!(styles.separator.style.fg, Some(Color::Indexed(PALETTE_DOT)));
    }

    #[test]
    fn emphasis_styles_are_bold() {
        let styles = Styles::default();
        assert!(styles.about.add_modifier.contains(Modifier::BOLD));
        assert!(styles.name.add_modifier.contains(Modifier::BOLD));
        assert!(styles.checkbox.sub_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn ascii_drops_colours_but_keeps_bold() {
        let styles = Styles::resolve(ColorProfile::Ascii);
        assert_eq!(styles.about.fg, None);
        assert_eq!(styles.subtle, Style::new());
        assert!(styles.about.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn ansi16_reduces_to_named_colours() {
        assert_eq!(ColorProfile::Ansi16.color(196), Some(Color::LightRed));
        assert_eq!(ColorProfile::Ansi16.color(PALETTE_SUBTLE), Some(Color::DarkGray));
        assert_eq!(ColorProfile::Ansi16.color(4), Some(Color::Blue));
        for index in [PALETTE_CHECKBOX, PALETTE_ABOUT, PALETTE_NAME, PALETTE_DOT] {
            assert!(!matches!(
                ColorProfile::Ansi16.color(index),
                Some(Color::Indexed(_)) | None
            ));
        }
    }

    #[test]
    fn grayscale_ramp_rgb() {
        assert_eq!(xterm_rgb(232), (8, 8, 8));
        assert_eq!(xterm_rgb(255), (238, 238, 238));
        assert_eq!(xterm_rgb(16), (0, 0, 0));
        assert_eq!(xterm_rgb(231), (255, 255, 255));
    }

    #[test]
    fn margin_is_two_cells() {
        assert_eq!(Styles::default().margin_left, 2);
    }
}
