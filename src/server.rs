//! SSH front end: listener, host key, per-connection handler, shutdown.
//!
//! Each accepted TCP connection gets its own russh session and
//! [`SessionHandler`]. A `shell` (or `exec`) request on a channel that asked
//! for a pty starts one TUI loop for that channel; keystrokes and resizes are
//! forwarded to it as [`SessionEvent`]s and its frames are written back to
//! the channel.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use russh::server::{Auth, Config, Handle, Handler, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use russh_keys::key::KeyPair;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{ServeError, SessionError};
use crate::tui::run::{run_terminal, ChannelWriter, Launcher};
use crate::tui::state::{App, SessionEvent};
use crate::tui::theme::{ColorProfile, Styles};
use crate::types::ServeConfig;

/// Pending input events per channel before the transport waits.
const EVENT_BUFFER: usize = 64;

const NO_PTY_MESSAGE: &[u8] = b"Requires an active PTY\r\n";

// ============================================================================
// HOST KEY
// ============================================================================

/// Load the host key, generating an Ed25519 key first if the file is missing.
pub fn load_or_create_host_key(path: &Path) -> Result<KeyPair, ServeError> {
    if !path.exists() {
        generate_host_key(path)?;
        info!(path = %path.display(), "generated new host key");
    }
    russh_keys::load_secret_key(path, None).map_err(|source| ServeError::HostKey {
        path: path.to_path_buf(),
        source,
    })
}

fn generate_host_key(path: &Path) -> Result<(), ServeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ServeError::HostKeyDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let generation_error = |source| ServeError::HostKeyGeneration {
        path: path.to_path_buf(),
        source,
    };
    let key = ssh_key::PrivateKey::random(
        &mut ssh_key::rand_core::OsRng,
        ssh_key::Algorithm::Ed25519,
    )
    .map_err(generation_error)?;
    key.write_openssh_file(path, ssh_key::LineEnding::LF)
        .map_err(generation_error)
}

// ============================================================================
// LISTENER
// ============================================================================

/// Serve sessions until `shutdown` resolves.
///
/// Startup failures (host key, bind) are returned. After `shutdown`, no new
/// connections are accepted and open ones get `config.grace_period` to end
/// before they are aborted. An overrun is logged, not returned.
pub async fn serve(
    config: ServeConfig,
    launcher: Arc<dyn Launcher>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), ServeError> {
    let ssh_config = ssh_config(&config)?;
    let listener = TcpListener::bind(config.addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: config.addr,
            source,
        })?;
    let local_addr = listener.local_addr().unwrap_or(config.addr);
    info!(addr = %local_addr, "starting SSH server");

    accept_loop(listener, ssh_config, launcher, config.grace_period, shutdown).await;
    Ok(())
}

fn ssh_config(config: &ServeConfig) -> Result<Arc<Config>, ServeError> {
    let key = load_or_create_host_key(&config.host_key_path)?;
    Ok(Arc::new(Config {
        keys: vec![key],
        inactivity_timeout: Some(config.idle_timeout),
        ..Default::default()
    }))
}

async fn accept_loop(
    listener: TcpListener,
    ssh_config: Arc<Config>,
    launcher: Arc<dyn Launcher>,
    grace_period: Duration,
    shutdown: impl Future<Output = ()>,
) {
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let handler = SessionHandler::new(Some(peer), launcher.clone());
                    connections.spawn(serve_connection(ssh_config.clone(), stream, handler));
                }
                Err(error) => warn!(%error, "failed to accept connection"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    info!(open = connections.len(), "stopping SSH server");
    let aborted = drain(&mut connections, grace_period).await;
    if aborted > 0 {
        warn!(
            aborted,
            grace = ?grace_period,
            "sessions still open after grace period; closed them"
        );
    }
}

/// Wait up to `grace` for every task to finish, then abort the rest.
///
/// Returns how many tasks had to be aborted.
async fn drain(tasks: &mut JoinSet<()>, grace: Duration) -> usize {
    let finished = tokio::time::timeout(grace, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if finished.is_ok() {
        return 0;
    }
    let remaining = tasks.len();
    tasks.shutdown().await;
    remaining
}

async fn serve_connection(ssh_config: Arc<Config>, stream: TcpStream, handler: SessionHandler) {
    let session = match russh::server::run_stream(ssh_config, stream, handler).await {
        Ok(session) => session,
        Err(error) => {
            debug!(%error, "ssh handshake failed");
            return;
        }
    };
    if let Err(error) = session.await {
        debug!(%error, "ssh connection ended with error");
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(%error, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}

// ============================================================================
// CONNECTION HANDLER
// ============================================================================

#[derive(Debug, Clone)]
struct PtyInfo {
    term: String,
    width: u16,
    height: u16,
}

#[derive(Debug, Default)]
struct ChannelState {
    pty: Option<PtyInfo>,
    /// Present while a TUI loop runs on this channel.
    events: Option<mpsc::Sender<SessionEvent>>,
}

/// russh handler for one TCP connection.
pub struct SessionHandler {
    peer: Option<SocketAddr>,
    user: Option<String>,
    connected_at: Instant,
    launcher: Arc<dyn Launcher>,
    channels: HashMap<ChannelId, ChannelState>,
    /// Channel tasks. Dropping the handler aborts whatever is still running.
    tasks: JoinSet<()>,
}

impl SessionHandler {
    pub fn new(peer: Option<SocketAddr>, launcher: Arc<dyn Launcher>) -> Self {
        SessionHandler {
            peer,
            user: None,
            connected_at: Instant::now(),
            launcher,
            channels: HashMap::new(),
            tasks: JoinSet::new(),
        }
    }

    fn peer(&self) -> String {
        self.peer.map_or_else(|| "unknown".to_string(), |p| p.to_string())
    }

    /// Start the TUI on `channel`, or turn the visitor away if no pty.
    fn start(&mut self, channel: ChannelId, session: &mut Session) {
        let peer = self.peer();
        let user = self.user.clone().unwrap_or_default();
        let handle = session.handle();
        let launcher = self.launcher.clone();
        while self.tasks.try_join_next().is_some() {}
        let state = self.channels.entry(channel).or_default();

        if state.events.is_some() {
            debug!(%peer, "channel already running a session");
            return;
        }

        let Some(pty) = state.pty.clone() else {
            warn!(%peer, %user, "shell requested without a pty");
            session.channel_success(channel);
            self.tasks.spawn(reject_without_pty(handle, channel));
            return;
        };

        info!(
            %peer,
            %user,
            term = %pty.term,
            width = pty.width,
            height = pty.height,
            "session started"
        );

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        state.events = Some(tx);
        let styles = Styles::resolve(ColorProfile::from_term(&pty.term));
        let app = App::new(pty.width, pty.height, styles);

        session.channel_success(channel);
        self.tasks.spawn(serve_shell(handle, channel, app, rx, launcher));
    }

    async fn forward(&mut self, channel: ChannelId, event: SessionEvent) {
        let Some(state) = self.channels.get_mut(&channel) else {
            return;
        };
        let Some(events) = &state.events else {
            return;
        };
        if events.send(event).await.is_err() {
            // The loop already ended (visitor quit).
            state.events = None;
        }
    }
}

impl Drop for SessionHandler {
    fn drop(&mut self) {
        info!(
            peer = %self.peer(),
            user = self.user.as_deref().unwrap_or(""),
            duration = ?self.connected_at.elapsed(),
            "connection closed"
        );
    }
}

#[async_trait]
impl Handler for SessionHandler {
    type Error = SessionError;

    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        self.user = Some(user.to_string());
        Ok(Auth::Accept)
    }

    async fn auth_password(&mut self, user: &str, _password: &str) -> Result<Auth, Self::Error> {
        self.user = Some(user.to_string());
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        self.channels.insert(channel.id(), ChannelState::default());
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let state = self.channels.entry(channel).or_default();
        state.pty = Some(PtyInfo {
            term: term.to_string(),
            width: clamp_dimension(col_width),
            height: clamp_dimension(row_height),
        });
        session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.start(channel, session);
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        _data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.start(channel, session);
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.forward(channel, SessionEvent::Input(data.to_vec())).await;
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        let width = clamp_dimension(col_width);
        let height = clamp_dimension(row_height);
        if let Some(pty) = self.channels.get_mut(&channel).and_then(|s| s.pty.as_mut()) {
            pty.width = width;
            pty.height = height;
        }
        self.forward(channel, SessionEvent::Resize { width, height }).await;
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        // No more input can arrive: end the loop.
        if let Some(state) = self.channels.get_mut(&channel) {
            state.events = None;
        }
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.channels.remove(&channel);
        Ok(())
    }
}

/// SSH sizes are `u32`; the terminal model uses `u16`.
fn clamp_dimension(cells: u32) -> u16 {
    u16::try_from(cells).unwrap_or(u16::MAX)
}

// ============================================================================
// CHANNEL TASKS
// ============================================================================

/// Run the TUI on one channel, then close it.
async fn serve_shell(
    handle: Handle,
    channel: ChannelId,
    app: App,
    mut events: mpsc::Receiver<SessionEvent>,
    launcher: Arc<dyn Launcher>,
) {
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let output = handle.clone();
    let forward = tokio::spawn(async move {
        while let Some(frame) = frames_rx.recv().await {
            if output.data(channel, CryptoVec::from_slice(&frame)).await.is_err() {
                break;
            }
        }
    });

    let outcome = run_terminal(
        ChannelWriter::new(frames_tx),
        app,
        &mut events,
        launcher.as_ref(),
    )
    .await;

    // The writer is gone, so the forwarder ends once the last frame is out.
    let _ = forward.await;

    let exit_status = match outcome {
        Ok(end) => {
            debug!(?end, "session loop finished");
            0
        }
        Err(error) => {
            debug!(%error, "session loop failed");
            1
        }
    };
    let _ = handle.exit_status_request(channel, exit_status).await;
    let _ = handle.close(channel).await;
}

async fn reject_without_pty(handle: Handle, channel: ChannelId) {
    let _ = handle
        .data(channel, CryptoVec::from_slice(NO_PTY_MESSAGE))
        .await;
    let _ = handle.exit_status_request(channel, 1).await;
    let _ = handle.close(channel).await;
}

// ============================================================================
// TESTS
// ============================================================================
