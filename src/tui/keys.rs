//! Decode raw terminal input bytes into crossterm key events.
//!
//! Over SSH there is no local tty for crossterm to read from; the visitor's
//! keystrokes arrive as the bytes their terminal emits. This is the reverse
//! of what a terminal does when it encodes keys:
//!
//! | Bytes | Key |
//! |-------|-----|
//! | `ESC [ A` / `ESC O A` | Up (B down, C right, D left) |
//! | `ESC [ 1 ; m A` | Up with modifiers `m - 1` (1 shift, 2 alt, 4 ctrl) |
//! | `ESC [ n ~` | Home/Insert/Delete/End/PageUp/PageDown/F5-F12 |
//! | `ESC x` | Alt+x |
//! | `0x01..=0x1a` | Ctrl+a..z (except Tab, LF, CR) |
//! | `CR`, `LF`, `CR LF` | Enter |
//! | `DEL`, `BS` | Backspace |
//!
//! Sequences split across reads are held until the rest arrives. A lone ESC
//! at the end of a read is the Escape key.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const ESC: u8 = 0x1b;

/// Longest CSI sequence we wait for before giving up on it.
const MAX_CSI_LEN: usize = 32;

/// Stateful decoder for one session's input stream.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
}

/// Result of decoding at the head of the buffer.
enum Parsed {
    /// A key, and how many bytes it used.
    Key(KeyEvent, usize),
    /// Bytes that do not decode to a key we report.
    Skip(usize),
    /// The buffer ends mid-sequence.
    Incomplete,
}

impl KeyDecoder {
    pub fn new() -> Self {
        KeyDecoder::default()
    }

    /// Append input and return every complete key it finishes.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<KeyEvent> {
        self.pending.extend_from_slice(bytes);

        let mut keys = Vec::new();
        let mut consumed = 0;
        while consumed < self.pending.len() {
            match parse(&self.pending[consumed..]) {
                Parsed::Key(key, used) => {
                    keys.push(key);
                    consumed += used;
                }
                Parsed::Skip(used) => consumed += used,
                Parsed::Incomplete => break,
            }
        }
        self.pending.drain(..consumed);
        keys
    }

    /// Bytes held back waiting for the rest of a sequence.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent::new(code, modifiers)
}

fn parse(buf: &[u8]) -> Parsed {
    match buf[0] {
        ESC => parse_escape(buf),
        b'\r' => {
            // CR LF from clients that translate Enter counts once.
            let used = if buf.get(1) == Some(&b'\n') { 2 } else { 1 };
            Parsed::Key(key(KeyCode::Enter, KeyModifiers::NONE), used)
        }
        b'\n' => Parsed::Key(key(KeyCode::Enter, KeyModifiers::NONE), 1),
        b'\t' => Parsed::Key(key(KeyCode::Tab, KeyModifiers::NONE), 1),
        0x7f | 0x08 => Parsed::Key(key(KeyCode::Backspace, KeyModifiers::NONE), 1),
        0x00 => Parsed::Key(key(KeyCode::Char(' '), KeyModifiers::CONTROL), 1),
        b @ 0x01..=0x1a => {
            let c = (b - 1 + b'a') as char;
            Parsed::Key(key(KeyCode::Char(c), KeyModifiers::CONTROL), 1)
        }
        0x1c..=0x1f => Parsed::Skip(1),
        _ => parse_char(buf),
    }
}

fn parse_char(buf: &[u8]) -> Parsed {
    let width = match buf[0] {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Parsed::Skip(1),
    };
    // A lead byte not followed by continuation bytes is noise.
    let tail = &buf[1..buf.len().min(width)];
    if tail.iter().any(|b| !(0x80..=0xbf).contains(b)) {
        return Parsed::Skip(1);
    }
    if buf.len() < width {
        return Parsed::Incomplete;
    }
    match std::str::from_utf8(&buf[..width]).ok().and_then(|s| s.chars().next()) {
        Some(c) => {
            let modifiers = if c.is_uppercase() {
                KeyModifiers::SHIFT
            } else {
                KeyModifiers::NONE
            };
            Parsed::Key(key(KeyCode::Char(c), modifiers), width)
        }
        None => Parsed::Skip(1),
    }
}

fn parse_escape(buf: &[u8]) -> Parsed {
    match buf.get(1) {
        None | Some(&ESC) => Parsed::Key(key(KeyCode::Esc, KeyModifiers::NONE), 1),
        Some(b'[') => parse_csi(buf),
        Some(b'O') => parse_ss3(buf),
        Some(_) => match parse(&buf[1..]) {
            Parsed::Key(mut inner, used) => {
                inner.modifiers |= KeyModifiers::ALT;
                Parsed::Key(inner, used + 1)
            }
            Parsed::Skip(used) => Parsed::Skip(used + 1),
            Parsed::Incomplete => Parsed::Incomplete,
        },
    }
}

/// `ESC O x`: application cursor mode arrows and F1-F4.
fn parse_ss3(buf: &[u8]) -> Parsed {
    let Some(&final_byte) = buf.get(2) else {
        return Parsed::Incomplete;
    };
    match final_code(final_byte) {
        Some(code) => Parsed::Key(key(code, KeyModifiers::NONE), 3),
        None => Parsed::Skip(3),
    }
}

/// `ESC [ params final`.
fn parse_csi(buf: &[u8]) -> Parsed {
    let Some(offset) = buf[2..].iter().position(|b| (0x40..=0x7e).contains(b)) else {
        return if buf.len() >= MAX_CSI_LEN {
            Parsed::Skip(buf.len())
        } else {
            Parsed::Incomplete
        };
    };
    let end = 2 + offset;
    let used = end + 1;
    let params: Vec<u16> = std::str::from_utf8(&buf[2..end])
        .unwrap_or_default()
        .split(';')
        .map(|p| p.parse().unwrap_or(0))
        .collect();
    let modifiers = params.get(1).copied().map(csi_modifiers).unwrap_or(KeyModifiers::NONE);

    let code = match buf[end] {
        b'~' => tilde_code(params.first().copied().unwrap_or(0)),
        b'Z' => Some(KeyCode::BackTab),
        other => final_code(other),
    };
    match code {
        Some(code) => Parsed::Key(key(code, modifiers), used),
        None => Parsed::Skip(used),
    }
}

fn final_code(byte: u8) -> Option<KeyCode> {
    match byte {
        b'A' => Some(KeyCode::Up),
        b'B' => Some(KeyCode::Down),
        b'C' => Some(KeyCode::Right),
        b'D' => Some(KeyCode::Left),
        b'H' => Some(KeyCode::Home),
        b'F' => Some(KeyCode::End),
        b'P' => Some(KeyCode::F(1)),
        b'Q' => Some(KeyCode::F(2)),
        b'R' => Some(KeyCode::F(3)),
        b'S' => Some(KeyCode::F(4)),
        _ => None,
    }
}

fn tilde_code(n: u16) -> Option<KeyCode> {
    match n {
        1 | 7 => Some(KeyCode::Home),
        2 => Some(KeyCode::Insert),
        3 => Some(KeyCode::Delete),
        4 | 8 => Some(KeyCode::End),
        5 => Some(KeyCode::PageUp),
        6 => Some(KeyCode::PageDown),
        11..=15 => Some(KeyCode::F((n - 10) as u8)),
        17..=21 => Some(KeyCode::F((n - 11) as u8)),
        23 | 24 => Some(KeyCode::F((n - 12) as u8)),
        _ => None,
    }
}

/// CSI modifier parameter is 1 + bitmask (1 shift, 2 alt, 4 ctrl).
fn csi_modifiers(param: u16) -> KeyModifiers {
    let bits = param.saturating_sub(1);
    let mut modifiers = KeyModifiers::NONE;
    if bits & 1 != 0 {
        modifiers |= KeyModifiers::SHIFT;
    }
    if bits & 2 != 0 {
        modifiers |= KeyModifiers::ALT;
    }
    if bits & 4 != 0 {
        modifiers |= KeyModifiers::CONTROL;
    }
    modifiers
}

// ============================================================================
// TESTS
// ============================================================================
