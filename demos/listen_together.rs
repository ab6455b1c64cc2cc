//! # Listen Together Example
//!
//! Demonstrates a complete lobby client lifecycle:
//!
//! 1. Load the session identity (username + lobby mode) from a session store
//! 2. Connect to a lobby server via WebSocket, starting in `general`
//! 3. Simulate now-playing changes from the keyboard and watch the client
//!    hop between song/artist lobbies
//! 4. Chat, and render roster/history updates as they arrive
//! 5. Shut down gracefully on Ctrl+C
//!
//! ## Running
//!
//! ```sh
//! # Start a lobby server on localhost:4040, then:
//! cargo run --example listen_together
//!
//! # Override the server URL:
//! LOBBY_SERVER_URL=ws://my-server:4040 cargo run --example listen_together
//! ```
//!
//! ## Commands
//!
//! - `/song <track-id>` — simulate a track change
//! - `/artist <name>` — simulate an artist change (keeps the track id)
//! - `/stop` — simulate "nothing playing"
//! - `/mode song|artist` — switch lobby mode
//! - anything else — send it as a chat message

use listen_lobby_client::{
    LobbyClient, LobbyConfig, LobbyEvent, LobbyMode, MemoryStore, PlaybackState, SessionContext,
    WebSocketConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Default server URL when `LOBBY_SERVER_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:4040";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Initialize tracing. Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Session context ─────────────────────────────────────────────
    // A browser shell would back this with session storage; the demo uses
    // an in-memory store, so every run gets a fresh identity.
    let store = MemoryStore::new();
    let mut ctx = SessionContext::load_or_init(&store);
    tracing::info!("you are {} (mode: {})", ctx.username, ctx.mode.as_str());

    // ── Connect ─────────────────────────────────────────────────────
    let url = std::env::var("LOBBY_SERVER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    tracing::info!("lobby server: {url}");

    let connector = WebSocketConnector::new(url);
    let config = LobbyConfig::new(ctx.username.clone()).with_initial_mode(ctx.mode);
    let (mut client, mut event_rx) = LobbyClient::new(connector, config);

    // Nothing playing yet — this joins the "general" lobby.
    let mut playback: Option<PlaybackState> = None;
    client.update_playback(playback.clone()).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            // Branch 1: events from the lobby session.
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::info!("event channel closed, exiting");
                    break;
                };
                match event {
                    LobbyEvent::Connected { key } => {
                        tracing::info!("joined lobby {} ({})", key, key.lobby_path());
                    }
                    LobbyEvent::RosterUpdated { users } => {
                        let names: Vec<&str> =
                            users.iter().map(|entry| entry.name.as_str()).collect();
                        tracing::info!("{} online: {}", names.len(), names.join(", "));
                    }
                    LobbyEvent::HistoryReplaced { messages } => {
                        for message in &messages {
                            println!("[{}] {}: {}", message.timestamp, message.user, message.message);
                        }
                        tracing::info!("backlog of {} message(s) loaded", messages.len());
                    }
                    LobbyEvent::MessageReceived { message } => {
                        println!("[{}] {}: {}", message.timestamp, message.user, message.message);
                    }
                    LobbyEvent::Disconnected { key, reason } => {
                        tracing::info!(
                            "left lobby {} ({})",
                            key,
                            reason.as_deref().unwrap_or("server closed the channel")
                        );
                    }
                }
            }

            // Branch 2: keyboard input — commands or chat.
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                if let Some(track_id) = line.strip_prefix("/song ") {
                    let state = playback.get_or_insert_with(PlaybackState::default);
                    state.track_id = Some(track_id.trim().to_string());
                    state.is_playing = true;
                    client.update_playback(playback.clone()).await?;
                } else if let Some(artist) = line.strip_prefix("/artist ") {
                    let state = playback.get_or_insert_with(PlaybackState::default);
                    state.artist_names = Some(artist.trim().to_string());
                    state.is_playing = true;
                    client.update_playback(playback.clone()).await?;
                } else if line.trim() == "/stop" {
                    playback = None;
                    client.update_playback(None).await?;
                } else if let Some(mode) = line.strip_prefix("/mode ") {
                    match LobbyMode::parse(mode.trim()) {
                        Some(mode) => {
                            ctx.set_mode(mode, &store);
                            client.set_mode(mode).await?;
                        }
                        None => tracing::warn!("unknown mode: {mode} (use song|artist)"),
                    }
                } else {
                    client.send_chat(&line);
                }
            }

            // Branch 3: Ctrl+C — graceful shutdown.
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    client.shutdown().await;
    tracing::info!("goodbye");
    Ok(())
}
