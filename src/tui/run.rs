//! TUI effects boundary: session loop, terminal lifecycle, key mapping.
//!
//! This is the only TUI module with side effects. It wires the pure layers
//! (state, update, view) to a remote terminal: frames go out through
//! ratatui's crossterm backend into a [`ChannelWriter`], input arrives as
//! [`SessionEvent`]s from the transport.
//! Kept minimal: all intelligence lives in the pure layers.
//!
//! One loop runs per session. Its only await point is the next event;
//! update and render run synchronously in between.

use std::io::{self, Write};
use std::process::Stdio;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::Rect;
use ratatui::{Terminal, TerminalOptions, Viewport};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::keys::KeyDecoder;
use super::state::{Action, App, Effect, SessionEvent};
use super::update::update_all;
use super::view::render;

// ============================================================================
// KEY MAPPING
// ============================================================================

/// Map a decoded key event to a semantic Action.
///
/// Returns None for keys that don't map to any action.
pub fn map_key(key: KeyEvent) -> Option<Action> {
    // Ctrl+C always quits
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    // Modified keys (ctrl+k, alt+q, shift+up) are not bindings.
    if !key.modifiers.is_empty() {
        return None;
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
        KeyCode::Enter => Some(Action::Enter),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    }
}

// ============================================================================
// RESOURCE OPENER
// ============================================================================

/// Opens URLs on behalf of a session.
///
/// Must return without waiting for the opener to finish; whatever happens
/// afterwards is never reported back to the session.
pub trait Launcher: Send + Sync {
    fn open(&self, url: &str);
}

/// Launches the host's default browser opener.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, url: &str) {
        let mut command = opener_command(url);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match command.spawn() {
            Ok(mut child) => {
                let url = url.to_string();
                // Reap the child so it never lingers as a zombie.
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if status.success() => debug!(%url, "opened url"),
                        Ok(status) => debug!(%url, %status, "browser opener failed"),
                        Err(error) => debug!(%url, %error, "browser opener lost"),
                    }
                });
            }
            Err(error) => warn!(%url, %error, "could not launch browser opener"),
        }
    }
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("open");
    command.arg(url);
    command
}

#[cfg(windows)]
fn opener_command(url: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("cmd");
    command.args(["/C", "start", "", url]);
    command
}

#[cfg(not(any(target_os = "macos", windows)))]
fn opener_command(url: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("xdg-open");
    command.arg(url);
    command
}

// ============================================================================
// TERMINAL LIFECYCLE
// ============================================================================

/// `io::Write` sink that ships each flushed frame to the transport.
///
/// Bytes accumulate until ratatui flushes; the flushed batch is queued on an
/// unbounded channel so drawing never waits on the network.
#[derive(Debug)]
pub struct ChannelWriter {
    buffer: Vec<u8>,
    frames: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChannelWriter {
    pub fn new(frames: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        ChannelWriter {
            buffer: Vec::new(),
            frames,
        }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let frame = std::mem::take(&mut self.buffer);
        self.frames
            .send(frame)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "session output closed"))
    }
}

/// Largest area ever handed to ratatui. Clients choose their own geometry
/// and the frame buffers are allocated from it.
pub const MAX_VIEWPORT_WIDTH: u16 = 500;
pub const MAX_VIEWPORT_HEIGHT: u16 = 300;

/// Render area for a reported geometry.
fn viewport(width: u16, height: u16) -> Rect {
    Rect::new(
        0,
        0,
        width.min(MAX_VIEWPORT_WIDTH),
        height.min(MAX_VIEWPORT_HEIGHT),
    )
}

/// Put the remote terminal into full-screen mode.
///
/// The viewport is fixed to the reported geometry: the backend has no local
/// tty to query.
fn setup_terminal<W: Write>(
    mut writer: W,
    width: u16,
    height: u16,
) -> io::Result<Terminal<CrosstermBackend<W>>> {
    writer.execute(EnterAlternateScreen)?;
    writer.execute(Hide)?;
    let backend = CrosstermBackend::new(writer);
    Terminal::with_options(
        backend,
        TerminalOptions {
            viewport: Viewport::Fixed(viewport(width, height)),
        },
    )
}

/// Hand the remote terminal back in the state we found it.
fn restore_terminal<W: Write>(terminal: &mut Terminal<CrosstermBackend<W>>) -> io::Result<()> {
    let writer = terminal.backend_mut();
    writer.execute(Show)?;
    writer.execute(LeaveAlternateScreen)?;
    Ok(())
}

// ============================================================================
// SESSION LOOP
// ============================================================================

/// Why a session loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The visitor quit.
    Quit,
    /// The transport went away.
    Disconnected,
}

/// Run one session on a remote terminal written through `writer`.
///
/// Enters the alternate screen, runs [`run_session`], then restores the
/// terminal even if the loop failed.
pub async fn run_terminal<W: Write>(
    writer: W,
    app: App,
    events: &mut mpsc::Receiver<SessionEvent>,
    launcher: &dyn Launcher,
) -> io::Result<SessionEnd> {
    let mut terminal = setup_terminal(writer, app.width, app.height)?;
    let outcome = run_session(&mut terminal, app, events, launcher).await;
    let restored = restore_terminal(&mut terminal);
    let (_, end) = outcome?;
    restored?;
    Ok(end)
}

/// Drive one session until the visitor quits or the transport disconnects.
///
/// Each event is decoded into actions, folded through the pure update, and
/// followed by a redraw. Effects run in order; `Quit` ends the loop and
/// anything after it is never processed. Returns the final model.
pub async fn run_session<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    events: &mut mpsc::Receiver<SessionEvent>,
    launcher: &dyn Launcher,
) -> Result<(App, SessionEnd), B::Error> {
    let mut decoder = KeyDecoder::new();

    loop {
        terminal.draw(|frame| render(&app, frame))?;

        // Block on next event from the transport
        let Some(event) = events.recv().await else {
            return Ok((app, SessionEnd::Disconnected));
        };

        let actions: Vec<Action> = match event {
            SessionEvent::Input(bytes) => decoder.feed(&bytes).into_iter().filter_map(map_key).collect(),
            SessionEvent::Resize { width, height } => {
                terminal.resize(viewport(width, height))?;
                vec![Action::Resize { width, height }]
            }
        };

        let (next, effects) = update_all(app, &actions);
        app = next;

        for effect in effects {
            match effect {
                Effect::OpenUrl { url } => launcher.open(&url),
                Effect::Quit => return Ok((app, SessionEnd::Quit)),
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use ratatui::backend::TestBackend;

    use crate::profile::{GITHUB_URL, LINKEDIN_URL};
    use crate::tui::theme::Styles;

    #[derive(Default)]
    struct RecordingLauncher {
        opened: Mutex<Vec<String>>,
    }

    impl Launcher for RecordingLauncher {
        fn open(&self, url: &str) {
            self.opened.lock().unwrap().push(url.to_string());
        }
    }

    impl RecordingLauncher {
        fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    fn fixed_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        Terminal::with_options(
            TestBackend::new(width, height),
            TerminalOptions {
                viewport: Viewport::Fixed(Rect::new(0, 0, width, height)),
            },
        )
        .unwrap()
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol().to_string())
            .collect()
    }

    fn input(bytes: &[u8]) -> SessionEvent {
        SessionEvent::Input(bytes.to_vec())
    }

    // -- Key mapping --

    #[test]
    fn ctrl_c_maps_to_quit() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(key), Some(Action::Quit));
    }

    #[test]
    fn q_maps_to_quit() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map_key(key), Some(Action::Quit));
    }

    #[test]
    fn vim_keys_map_to_movement() {
        let j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
        let k = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::NONE);
        assert_eq!(map_key(j), Some(Action::MoveDown));
        assert_eq!(map_key(k), Some(Action::MoveUp));
    }

    #[test]
    fn arrow_keys_map_to_movement() {
        let up = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        let down = KeyEvent::new(KeyCode::Down, KeyModifiers::NONE);
        assert_eq!(map_key(up), Some(Action::MoveUp));
        assert_eq!(map_key(down), Some(Action::MoveDown));
    }

    #[test]
    fn enter_maps_to_enter_action() {
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(map_key(key), Some(Action::Enter));
    }

    #[test]
    fn unmapped_key_returns_none() {
        for code in [KeyCode::Char('z'), KeyCode::Esc, KeyCode::Char('Q'), KeyCode::Tab] {
            assert_eq!(map_key(KeyEvent::new(code, KeyModifiers::NONE)), None);
        }
    }

    #[test]
    fn modified_bindings_are_ignored() {
        let combos = [
            (KeyCode::Char('k'), KeyModifiers::CONTROL),
            (KeyCode::Char('q'), KeyModifiers::CONTROL),
            (KeyCode::Char('q'), KeyModifiers::ALT),
            (KeyCode::Char('j'), KeyModifiers::ALT),
            (KeyCode::Up, KeyModifiers::SHIFT),
            (KeyCode::Down, KeyModifiers::CONTROL),
            (KeyCode::Enter, KeyModifiers::ALT),
        ];
        for (code, modifiers) in combos {
            assert_eq!(map_key(KeyEvent::new(code, modifiers)), None, "{modifiers:?} {code:?}");
        }
    }

    #[test]
    fn decoded_modified_keys_are_ignored() {
        let mut decoder = KeyDecoder::new();
        // ctrl+k, ctrl+q, alt+q, alt+j, shift+up
        let keys = decoder.feed(b"\x0b\x11\x1bq\x1bj\x1b[1;2A");
        assert_eq!(keys.len(), 5);
        assert!(keys.into_iter().filter_map(map_key).next().is_none());
    }

    // -- Channel writer --

    #[test]
    fn writer_ships_on_flush_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut writer = ChannelWriter::new(tx);
        writer.write_all(b"abc").unwrap();
        assert!(rx.try_recv().is_err());
        writer.flush().unwrap();
        assert_eq!(rx.try_recv().unwrap(), b"abc".to_vec());
        writer.flush().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn writer_reports_closed_transport() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut writer = ChannelWriter::new(tx);
        writer.write_all(b"x").unwrap();
        assert_eq!(writer.flush().unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    // -- Session loop --

    #[tokio::test]
    async fn disconnect_ends_session() {
        let mut terminal = fixed_terminal(80, 30);
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(input(b"j")).await.unwrap();
        drop(tx);

        let launcher = RecordingLauncher::default();
        let app = App::new(80, 30, Styles::default());
        let (app, end) = run_session(&mut terminal, app, &mut rx, &launcher)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Disconnected);
        assert_eq!(app.selected, 1);
        assert!(screen(&terminal).contains("[x] GitHub"));
    }

    #[tokio::test]
    async fn enter_opens_selected_url_and_keeps_running() {
        let mut terminal = fixed_terminal(80, 30);
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(input(b"jj\r")).await.unwrap();
        tx.send(input(b"\x1b[A\r")).await.unwrap();
        drop(tx);

        let launcher = RecordingLauncher::default();
        let app = App::new(80, 30, Styles::default());
        let (app, end) = run_session(&mut terminal, app, &mut rx, &launcher)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Disconnected);
        assert_eq!(app.selected, 1);
        assert_eq!(launcher.opened(), vec![LINKEDIN_URL, GITHUB_URL]);
    }

    #[tokio::test]
    async fn quit_stops_processing_further_events() {
        let mut terminal = fixed_terminal(80, 30);
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(input(b"jqj\r")).await.unwrap();
        tx.send(input(b"j")).await.unwrap();

        let launcher = RecordingLauncher::default();
        let app = App::new(80, 30, Styles::default());
        let (app, end) = run_session(&mut terminal, app, &mut rx, &launcher)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Quit);
        assert_eq!(app.selected, 1);
        assert!(launcher.opened().is_empty());
        // The second event is still queued: nothing read it.
        assert_eq!(rx.try_recv().unwrap(), input(b"j"));
    }

    #[tokio::test]
    async fn ctrl_c_quits() {
        let mut terminal = fixed_terminal(80, 30);
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(input(&[0x03])).await.unwrap();

        let launcher = RecordingLauncher::default();
        let app = App::new(80, 30, Styles::default());
        let (_, end) = run_session(&mut terminal, app, &mut rx, &launcher)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::Quit);
    }

    #[tokio::test]
    async fn resize_updates_geometry_and_redraws() {
        let mut terminal = fixed_terminal(80, 30);
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(input(b"jj")).await.unwrap();
        tx.send(SessionEvent::Resize {
            width: 40,
            height: 30,
        })
        .await
        .unwrap();
        drop(tx);

        let launcher = RecordingLauncher::default();
        let app = App::new(80, 30, Styles::default());
        let (app, _) = run_session(&mut terminal, app, &mut rx, &launcher)
            .await
            .unwrap();

        assert_eq!((app.width, app.height), (40, 30));
        assert_eq!(app.selected, 2);
        assert!(!screen(&terminal).trim().is_empty());
        assert!(screen(&terminal).contains("[x] Linkedin"));
    }

    #[test]
    fn viewport_is_capped_but_small_sizes_pass_through() {
        assert_eq!(viewport(80, 24), Rect::new(0, 0, 80, 24));
        assert_eq!(viewport(0, 0), Rect::new(0, 0, 0, 0));
        assert_eq!(
            viewport(u16::MAX, u16::MAX),
            Rect::new(0, 0, MAX_VIEWPORT_WIDTH, MAX_VIEWPORT_HEIGHT)
        );
    }

    #[tokio::test]
    async fn huge_resize_keeps_session_running() {
        // Backend large enough for the capped viewport.
        let mut terminal = Terminal::with_options(
            TestBackend::new(MAX_VIEWPORT_WIDTH, MAX_VIEWPORT_HEIGHT),
            TerminalOptions {
                viewport: Viewport::Fixed(Rect::new(0, 0, 80, 30)),
            },
        )
        .unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(SessionEvent::Resize {
            width: u16::MAX,
            height: u16::MAX,
        })
        .await
        .unwrap();
        tx.send(input(b"j")).await.unwrap();
        drop(tx);

        let launcher = RecordingLauncher::default();
        let app = App::new(80, 30, Styles::default());
        let (app, end) = run_session(&mut terminal, app, &mut rx, &launcher)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Disconnected);
        assert_eq!((app.width, app.height), (u16::MAX, u16::MAX));
        assert_eq!(app.selected, 1);
        assert_eq!(
            terminal.get_frame().area(),
            Rect::new(0, 0, MAX_VIEWPORT_WIDTH, MAX_VIEWPORT_HEIGHT)
        );
        assert!(screen(&terminal).contains("[x] GitHub"));
    }

    #[tokio::test]
    async fn huge_initial_geometry_is_served() {
        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(input(b"q")).await.unwrap();

        let launcher = RecordingLauncher::default();
        let app = App::new(u16::MAX, u16::MAX, Styles::default());
        let end = run_terminal(ChannelWriter::new(frames_tx), app, &mut rx, &launcher)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::Quit);
        assert!(frames_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unknown_input_is_ignored() {
        let mut terminal = fixed_terminal(80, 30);
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(input(b"xyz\x1b[5~\t")).await.unwrap();
        drop(tx);

        let launcher = RecordingLauncher::default();
        let start = App::new(80, 30, Styles::default());
        let (app, end) = run_session(&mut terminal, start.clone(), &mut rx, &launcher)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::Disconnected);
        assert_eq!(app, start);
    }

    #[tokio::test]
    async fn run_terminal_wraps_session_in_alternate_screen() {
        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(input(b"q")).await.unwrap();

        let launcher = RecordingLauncher::default();
        let app = App::new(80, 30, Styles::default());
        let end = run_terminal(ChannelWriter::new(frames_tx), app, &mut rx, &launcher)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::Quit);

        let mut output = Vec::new();
        while let Ok(frame) = frames_rx.try_recv() {
            output.extend(frame);
        }
        let output = String::from_utf8_lossy(&output);
        let enter = output.find("\x1b[?1049h").expect("enters alternate screen");
        let leave = output.rfind("\x1b[?1049l").expect("leaves alternate screen");
        assert!(enter < leave);
        assert!(output.contains("Resume / CV"));
    }
}
