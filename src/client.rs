//! Async lobby session manager.
//!
//! [`LobbyClient`] owns at most one live lobby channel at a time. The
//! channel's key is re-resolved on every mode or playback change; when the
//! key changes, the old channel is torn down, local chat state is cleared,
//! and a new channel is opened and joined. Each connected channel is driven
//! by a background session loop task that communicates with the handle via
//! an unbounded MPSC channel; host-facing [`LobbyEvent`]s are emitted on a
//! bounded channel returned from [`LobbyClient::new`].
//!
//! # Example
//!
//! ```rust,ignore
//! let connector = WebSocketConnector::new("wss://lobby.example.com");
//! let config = LobbyConfig::new(Username::generate());
//! let (mut client, mut events) = LobbyClient::new(connector, config);
//!
//! // Nothing playing yet — joins the "general" lobby.
//! client.update_playback(None).await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         LobbyEvent::MessageReceived { message } => { /* … */ }
//!         LobbyEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::event::LobbyEvent;
use crate::identity::Username;
use crate::playback::PlaybackState;
use crate::protocol::{ChatMessage, ClientEvent, ServerEvent};
use crate::reconcile::{RosterEntry, SessionState};
use crate::resolver::{resolve_playback, LobbyKey, LobbyMode};
use crate::transport::{Connector, Transport};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for tearing down a session loop.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Format of the outbound message timestamp (2-digit hour and minute,
/// local clock). Display-only; the server never interprets it.
const TIMESTAMP_FORMAT: &str = "%H:%M";

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`LobbyClient`].
///
/// The only required field is the username; all others have sensible
/// defaults.
///
/// # Example
///
/// ```
/// use listen_lobby_client::client::LobbyConfig;
/// use listen_lobby_client::identity::Username;
/// use listen_lobby_client::resolver::LobbyMode;
///
/// let config = LobbyConfig::new(Username::new("Teal-Otter-417"))
///     .with_initial_mode(LobbyMode::Artist)
///     .with_event_channel_capacity(512);
/// assert_eq!(config.username.as_str(), "Teal-Otter-417");
/// ```
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Display name announced in the join handshake and on sent messages.
    pub username: Username,
    /// Lobby mode active before the first `set_mode` call.
    pub initial_mode: LobbyMode,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up with incoming events, non-terminal
    /// events are dropped (with a warning logged) to avoid blocking the
    /// session loop. The `Disconnected` event is always delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Timeout for the graceful teardown of a session loop.
    ///
    /// On every lobby switch (and on [`LobbyClient::shutdown`]) the old
    /// loop is given this much time to close its transport and emit its
    /// final `Disconnected` event. If the timeout expires the task is
    /// aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl LobbyConfig {
    /// Create a new configuration with the given username and defaults.
    pub fn new(username: Username) -> Self {
        Self {
            username,
            initial_mode: LobbyMode::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Create a configuration with a freshly generated random username.
    pub fn generate() -> Self {
        Self::new(Username::generate())
    }

    /// Set the lobby mode active before the first `set_mode` call.
    #[must_use]
    pub fn with_initial_mode(mut self, mode: LobbyMode) -> Self {
        self.initial_mode = mode;
        self
    }

    /// Set the capacity of the bounded event channel.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for graceful session teardown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Active session ──────────────────────────────────────────────────

/// Bookkeeping for the one live lobby session.
struct ActiveSession {
    key: LobbyKey,
    generation: u64,
    cmd_tx: mpsc::UnboundedSender<ClientEvent>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

// ── Client handle ───────────────────────────────────────────────────

/// Session manager for song/artist-keyed chat lobbies.
///
/// State machine: `Disconnected` or `Connected(key)`. A key change from a
/// connected state always runs teardown → clear → connect → join, in that
/// order; a change to the already-connected key is a no-op. Connection
/// failures leave the client `Disconnected` and are not retried here —
/// retry policy belongs to the transport or the host.
pub struct LobbyClient<C: Connector> {
    connector: C,
    username: Username,
    mode: LobbyMode,
    playback: Option<PlaybackState>,
    state: Arc<SessionState>,
    event_tx: mpsc::Sender<LobbyEvent>,
    session: Option<ActiveSession>,
    shutdown_timeout: Duration,
}

impl<C: Connector> LobbyClient<C> {
    /// Create a client handle and its event receiver.
    ///
    /// The client starts disconnected; call
    /// [`update_playback`](Self::update_playback) (with `None` for "nothing
    /// playing") to join the first lobby.
    #[must_use = "the event receiver must be used to receive lobby events"]
    pub fn new(connector: C, config: LobbyConfig) -> (Self, mpsc::Receiver<LobbyEvent>) {
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<LobbyEvent>(capacity);

        let client = Self {
            connector,
            username: config.username,
            mode: config.initial_mode,
            playback: None,
            state: Arc::new(SessionState::new()),
            event_tx,
            session: None,
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Lobby selection ─────────────────────────────────────────────

    /// Switch between Song and Artist lobbies.
    ///
    /// Re-resolves the lobby key against the last playback snapshot and
    /// transitions if the key changed. Persisting the mode across reloads
    /// is the host's job, via a [`SessionContext`](crate::store::SessionContext).
    ///
    /// # Errors
    ///
    /// Returns a transport error when a required new channel cannot be
    /// opened; the client is left disconnected.
    pub async fn set_mode(&mut self, mode: LobbyMode) -> Result<()> {
        self.mode = mode;
        self.sync_lobby().await
    }

    /// Feed the latest now-playing snapshot (`None` = nothing playing).
    ///
    /// Updates that do not change the resolved lobby key — position ticks,
    /// play/pause — never touch the transport.
    ///
    /// # Errors
    ///
    /// Returns a transport error when a required new channel cannot be
    /// opened; the client is left disconnected.
    pub async fn update_playback(&mut self, playback: Option<PlaybackState>) -> Result<()> {
        self.playback = playback;
        self.sync_lobby().await
    }

    /// Re-resolve the lobby key and reconcile the active session with it.
    async fn sync_lobby(&mut self) -> Result<()> {
        let key = resolve_playback(self.mode, self.playback.as_ref());
        self.ensure_session(key).await
    }

    /// Transition to `key`: no-op when it matches the connected session,
    /// otherwise teardown → clear → connect → join.
    async fn ensure_session(&mut self, key: LobbyKey) -> Result<()> {
        // Only a *connected* session short-circuits: after a server-side
        // close the next key resolution may open a fresh channel, even to
        // the same key.
        if self.state.is_connected() && self.session.as_ref().is_some_and(|s| s.key == key) {
            debug!(key = %key, "already in lobby, ignoring key change");
            return Ok(());
        }

        // Invalidate the outgoing session before anything else, so events
        // still in flight from it are stale by the time they could apply.
        let generation = self.state.begin_session();
        self.teardown_current().await;
        self.state.clear().await;

        debug!(key = %key, "connecting to lobby");
        let transport = self.connector.connect(&key).await?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        // Queue the join handshake so the session loop picks it up as the
        // very first outgoing message. This cannot fail: the channel was
        // just created.
        let join = ClientEvent::Join {
            username: self.username.as_str().to_string(),
            song_id: self
                .playback
                .as_ref()
                .and_then(|state| state.track_id.clone()),
            artist: self
                .playback
                .as_ref()
                .and_then(|state| state.primary_artist())
                .map(str::to_string),
        };
        let _ = cmd_tx.send(join);

        self.state.mark_connected(generation);
        let task = tokio::spawn(session_loop(
            transport,
            key.clone(),
            generation,
            cmd_rx,
            self.event_tx.clone(),
            Arc::clone(&self.state),
            shutdown_rx,
        ));

        self.session = Some(ActiveSession {
            key,
            generation,
            cmd_tx,
            shutdown_tx: Some(shutdown_tx),
            task,
        });

        Ok(())
    }

    // ── Outbound chat ───────────────────────────────────────────────

    /// Send a chat message to the current lobby.
    ///
    /// A no-op when `text` is empty or whitespace-only, or when no session
    /// is connected. The message is **not** appended to the local log —
    /// it arrives back through `new-message`, which keeps the server as
    /// the single source of ordering truth.
    pub fn send_chat(&self, text: &str) {
        if text.trim().is_empty() {
            debug!("ignoring empty chat message");
            return;
        }
        let Some(session) = &self.session else {
            debug!("no lobby session, dropping chat message");
            return;
        };

        let message = ChatMessage {
            user: self.username.as_str().to_string(),
            message: text.to_string(),
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        };
        if session.cmd_tx.send(ClientEvent::SendMessage(message)).is_err() {
            debug!("session loop gone, dropping chat message");
        }
    }

    // ── Teardown ────────────────────────────────────────────────────

    /// Leave the current lobby and stop the session loop.
    ///
    /// Clears the recorded key, so a later
    /// [`update_playback`](Self::update_playback) starts a clean session
    /// rather than assuming a stale connection is still valid.
    pub async fn shutdown(&mut self) {
        debug!("LobbyClient: shutdown requested");
        self.state.begin_session();
        self.teardown_current().await;
    }

    /// Tear down the active session, awaiting the loop with a timeout and
    /// aborting it if it does not exit in time. Always completes before
    /// any subsequent connect is issued.
    async fn teardown_current(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        debug!(key = %session.key, "tearing down lobby session");

        if let Some(tx) = session.shutdown_tx.take() {
            let _ = tx.send(());
        }

        match tokio::time::timeout(self.shutdown_timeout, &mut session.task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => {
                warn!("session loop terminated with join error: {join_err}");
            }
            Err(_) => {
                warn!("session loop did not exit within timeout; aborting task");
                session.task.abort();
                if let Err(join_err) = (&mut session.task).await {
                    debug!("session loop aborted: {join_err}");
                }
            }
        }

        self.state.mark_disconnected(session.generation);
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Returns `true` while a lobby channel is believed to be connected.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Key of the current lobby session, if one exists.
    pub fn current_key(&self) -> Option<&LobbyKey> {
        self.session.as_ref().map(|session| &session.key)
    }

    /// Browser-style path for the current lobby (`/lobby/<key>`), if
    /// connected. Cosmetic state reflection only.
    pub fn lobby_path(&self) -> Option<String> {
        self.current_key().map(LobbyKey::lobby_path)
    }

    /// The active lobby mode.
    pub fn mode(&self) -> LobbyMode {
        self.mode
    }

    /// This session's display name.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// The last playback snapshot fed to the client.
    pub fn playback(&self) -> Option<&PlaybackState> {
        self.playback.as_ref()
    }

    /// Snapshot of the current online-user roster.
    pub async fn roster(&self) -> Vec<RosterEntry> {
        self.state.roster().await
    }

    /// Snapshot of the current message log.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.messages().await
    }
}

impl<C: Connector> std::fmt::Debug for LobbyClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyClient")
            .field("username", &self.username)
            .field("mode", &self.mode)
            .field("connected", &self.is_connected())
            .field("key", &self.session.as_ref().map(|s| s.key.as_str()))
            .finish()
    }
}

impl<C: Connector> Drop for LobbyClient<C> {
    fn drop(&mut self) {
        // `Drop` is synchronous so we cannot await a graceful teardown.
        // The only safe action is to abort the session loop, which causes
        // its future to be dropped immediately. The shutdown oneshot is
        // intentionally *not* sent here: it would trigger a graceful path
        // that awaits `transport.close()`, and there is no executor
        // context to drive it inside `Drop`.
        if let Some(session) = self.session.take() {
            session.task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Background loop driving one lobby channel via `tokio::select!`.
///
/// Exits when:
/// - The shutdown signal fires (lobby switch or client shutdown)
/// - The command channel closes (client handle dropped)
/// - The transport returns `None` (server closed the channel)
/// - A transport error occurs
async fn session_loop(
    mut transport: impl Transport,
    key: LobbyKey,
    generation: u64,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientEvent>,
    event_tx: mpsc::Sender<LobbyEvent>,
    state: Arc<SessionState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!(key = %key, "session loop started");

    emit_event(&event_tx, LobbyEvent::Connected { key: key.clone() }).await;

    loop {
        tokio::select! {
            // Branch 1: outgoing event from the client handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(event) => {
                        match event.encode() {
                            Ok(json) => {
                                if let Err(e) = transport.send(json).await {
                                    error!("transport send error: {e}");
                                    emit_disconnected(
                                        &event_tx,
                                        &state,
                                        generation,
                                        &key,
                                        Some(format!("transport send error: {e}")),
                                    ).await;
                                    break;
                                }
                            }
                            Err(e) => {
                                error!("failed to serialize client event: {e}");
                                // Serialization errors are programming bugs; don't kill the loop.
                            }
                        }
                    }
                    // Command channel closed — client handle dropped.
                    None => {
                        debug!("command channel closed, shutting down session loop");
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &state, generation, &key, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            // Branch 2: shutdown signal (lobby switch or client shutdown)
            _ = &mut shutdown_rx => {
                debug!(key = %key, "shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &state, generation, &key, Some("session closed".into())).await;
                break;
            }

            // Branch 3: incoming event from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        if let Some(event) = ServerEvent::decode_lossy(&text) {
                            // The reconciler rejects events from stale
                            // generations; only applied mutations are
                            // forwarded to the host.
                            if let Some(applied) = state.apply(generation, event).await {
                                emit_event(&event_tx, applied).await;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(
                            &event_tx,
                            &state,
                            generation,
                            &key,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    // Channel closed cleanly by the server.
                    None => {
                        debug!(key = %key, "lobby channel closed by server");
                        emit_disconnected(&event_tx, &state, generation, &key, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!(key = %key, "session loop exited");
}

/// Emit an event to the event channel. If the channel is full, log a
/// warning and drop the event to avoid blocking the session loop.
async fn emit_event(event_tx: &mpsc::Sender<LobbyEvent>, event: LobbyEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit a [`Disconnected`](LobbyEvent::Disconnected) event and update state.
///
/// Uses `send().await` (blocking) instead of `try_send` because
/// `Disconnected` is the session's terminal event and must never be
/// silently dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<LobbyEvent>,
    state: &SessionState,
    generation: u64,
    key: &LobbyKey,
    reason: Option<String>,
) {
    state.mark_disconnected(generation);
    let event = LobbyEvent::Disconnected {
        key: key.clone(),
        reason,
    };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::error::LobbyError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    // ── Mock connector & transport ──────────────────────────────────

    /// A silent mock transport bound to one lobby key. Records sent
    /// envelopes; `close()` appends to the shared op log. Inbound-event
    /// behavior is exercised by the integration tests.
    struct MockTransport {
        key: String,
        sent: Arc<StdMutex<Vec<(String, String)>>>,
        ops: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), LobbyError> {
            self.sent.lock().unwrap().push((self.key.clone(), message));
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, LobbyError>> {
            // Stay silent and open until the session loop shuts down.
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), LobbyError> {
            self.ops.lock().unwrap().push(format!("disconnect:{}", self.key));
            Ok(())
        }
    }

    /// A mock connector with a shared connect/disconnect op log for
    /// ordering assertions.
    struct MockConnector {
        refuse: HashSet<String>,
        sent: Arc<StdMutex<Vec<(String, String)>>>,
        ops: Arc<StdMutex<Vec<String>>>,
    }

    impl MockConnector {
        fn new() -> Self {
            Self {
                refuse: HashSet::new(),
                sent: Arc::new(StdMutex::new(Vec::new())),
                ops: Arc::new(StdMutex::new(Vec::new())),
            }
        }

        fn refuse(mut self, key: &str) -> Self {
            self.refuse.insert(key.to_string());
            self
        }

        fn sent(&self) -> Arc<StdMutex<Vec<(String, String)>>> {
            Arc::clone(&self.sent)
        }

        fn ops(&self) -> Arc<StdMutex<Vec<String>>> {
            Arc::clone(&self.ops)
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Channel = MockTransport;

        async fn connect(&self, key: &LobbyKey) -> std::result::Result<MockTransport, LobbyError> {
            self.ops.lock().unwrap().push(format!("connect:{key}"));
            if self.refuse.contains(key.as_str()) {
                return Err(LobbyError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "scripted connect failure",
                )));
            }
            Ok(MockTransport {
                key: key.as_str().to_string(),
                sent: Arc::clone(&self.sent),
                ops: Arc::clone(&self.ops),
            })
        }
    }

    fn playing(track_id: &str, artists: &str) -> PlaybackState {
        PlaybackState {
            track_id: Some(track_id.to_string()),
            artist_names: Some(artists.to_string()),
            is_playing: true,
            ..Default::default()
        }
    }

    fn test_config() -> LobbyConfig {
        LobbyConfig::new(Username::new("Teal-Otter-417"))
            .with_shutdown_timeout(Duration::from_millis(200))
    }

    fn decode_sent(sent: &[(String, String)]) -> Vec<(String, ClientEvent)> {
        sent.iter()
            .map(|(key, json)| (key.clone(), serde_json::from_str(json).unwrap()))
            .collect()
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn config_defaults() {
        let config = LobbyConfig::new(Username::new("Red-Fox-1"));
        assert_eq!(config.initial_mode, LobbyMode::Song);
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn event_channel_capacity_is_clamped_to_one() {
        let config = LobbyConfig::generate().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[tokio::test]
    async fn first_playback_update_joins_and_sends_join() {
        let connector = MockConnector::new();
        let sent = connector.sent();
        let (mut client, mut events) = LobbyClient::new(connector, test_config());

        client
            .update_playback(Some(playing("abc123", "Radiohead")))
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert!(matches!(event, LobbyEvent::Connected { ref key } if key.as_str() == "abc123"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        {
            let sent = decode_sent(&sent.lock().unwrap());
            assert_eq!(sent.len(), 1);
            let (key, join) = &sent[0];
            assert_eq!(key, "abc123");
            if let ClientEvent::Join { username, song_id, artist } = join {
                assert_eq!(username, "Teal-Otter-417");
                assert_eq!(song_id.as_deref(), Some("abc123"));
                assert_eq!(artist.as_deref(), Some("Radiohead"));
            } else {
                panic!("expected Join, got {join:?}");
            }
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn unchanged_key_is_a_no_op() {
        let connector = MockConnector::new();
        let sent = connector.sent();
        let ops = connector.ops();
        let (mut client, mut events) = LobbyClient::new(connector, test_config());

        let state = playing("abc123", "Radiohead");
        client.update_playback(Some(state.clone())).await.unwrap();
        let _ = events.recv().await; // Connected

        // Same key again — progress-only churn must not reconnect.
        let mut tick = state;
        tick.position_ms = 30_000;
        client.update_playback(Some(tick)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            ops.lock().unwrap().clone(),
            ["connect:abc123"],
            "expected exactly one connect"
        );
        assert_eq!(sent.lock().unwrap().len(), 1, "expected exactly one join");

        client.shutdown().await;
    }

    #[tokio::test]
    async fn key_change_tears_down_before_connecting() {
        let connector = MockConnector::new();
        let ops = connector.ops();
        let (mut client, mut events) = LobbyClient::new(connector, test_config());

        client.update_playback(Some(playing("songX", "A"))).await.unwrap();
        let _ = events.recv().await; // Connected songX
        client.update_playback(Some(playing("songY", "A"))).await.unwrap();

        let log = ops.lock().unwrap().clone();
        assert_eq!(
            log,
            ["connect:songX", "disconnect:songX", "connect:songY"],
            "teardown of the old channel must be issued before the new connect"
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn mode_change_reresolves_key() {
        let connector = MockConnector::new();
        let ops = connector.ops();
        let (mut client, mut events) = LobbyClient::new(connector, test_config());

        client.update_playback(Some(playing("abc123", "Daft Punk, Pharrell Williams"))).await.unwrap();
        let _ = events.recv().await;
        assert_eq!(client.current_key().unwrap().as_str(), "abc123");

        client.set_mode(LobbyMode::Artist).await.unwrap();
        assert_eq!(client.current_key().unwrap().as_str(), "Daft%20Punk");
        assert_eq!(client.lobby_path().unwrap(), "/lobby/Daft%20Punk");

        let log = ops.lock().unwrap().clone();
        assert_eq!(
            log,
            ["connect:abc123", "disconnect:abc123", "connect:Daft%20Punk"]
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn send_chat_emits_one_send_message_without_local_echo() {
        let connector = MockConnector::new();
        let sent = connector.sent();
        let (mut client, mut events) = LobbyClient::new(connector, test_config());

        client.update_playback(None).await.unwrap();
        let _ = events.recv().await; // Connected general

        client.send_chat("hello");
        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let sent = decode_sent(&sent.lock().unwrap());
            assert_eq!(sent.len(), 2); // join + send-message
            if let (_, ClientEvent::SendMessage(msg)) = &sent[1] {
                assert_eq!(msg.user, "Teal-Otter-417");
                assert_eq!(msg.message, "hello");
                assert!(!msg.timestamp.is_empty());
            } else {
                panic!("expected SendMessage, got {:?}", sent[1]);
            }
        }
        // Send never mutates the local log; only the new-message echo does.
        assert!(client.messages().await.is_empty());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn empty_and_whitespace_sends_are_no_ops() {
        let connector = MockConnector::new();
        let sent = connector.sent();
        let (mut client, mut events) = LobbyClient::new(connector, test_config());

        client.update_playback(None).await.unwrap();
        let _ = events.recv().await;

        client.send_chat("");
        client.send_chat("   ");
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(sent.lock().unwrap().len(), 1, "only the join may be sent");

        client.shutdown().await;
    }

    #[tokio::test]
    async fn send_chat_without_session_is_a_no_op() {
        let connector = MockConnector::new();
        let sent = connector.sent();
        let (client, _events) = LobbyClient::new(connector, test_config());

        client.send_chat("hello");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connect_failure_leaves_client_disconnected() {
        let connector = MockConnector::new().refuse("general");
        let (mut client, _events) = LobbyClient::new(connector, test_config());

        let result = client.update_playback(None).await;
        assert!(matches!(result, Err(LobbyError::Io(_))));
        assert!(!client.is_connected());
        assert!(client.current_key().is_none());
    }

    #[tokio::test]
    async fn shutdown_clears_key_and_allows_rejoin() {
        let connector = MockConnector::new();
        let ops = connector.ops();
        let (mut client, mut events) = LobbyClient::new(connector, test_config());

        client.update_playback(None).await.unwrap();
        let _ = events.recv().await; // Connected
        assert!(client.is_connected());

        client.shutdown().await;
        assert!(!client.is_connected());
        assert!(client.current_key().is_none());

        // Re-mount starts a clean session.
        client.update_playback(None).await.unwrap();
        assert!(client.is_connected());

        let log = ops.lock().unwrap().clone();
        assert_eq!(
            log,
            ["connect:general", "disconnect:general", "connect:general"]
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let connector = MockConnector::new();
        let (mut client, mut events) = LobbyClient::new(connector, test_config());

        client.update_playback(None).await.unwrap();
        let _ = events.recv().await;

        client.shutdown().await;
        client.shutdown().await; // should not panic
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let connector = MockConnector::new();
        let (mut client, mut events) = LobbyClient::new(connector, test_config());

        client.update_playback(None).await.unwrap();
        let _ = events.recv().await;

        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("LobbyClient"));
        assert!(debug_str.contains("general"));

        client.shutdown().await;
    }
}
