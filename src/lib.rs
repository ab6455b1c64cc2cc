//! # Listen Lobby Client
//!
//! Transport-agnostic Rust client for listen-together chat lobbies keyed by
//! the currently playing track.
//!
//! Users listening to the same song (or the same artist) share a chat lobby.
//! The lobby key is re-resolved from every now-playing update; when it
//! changes, this crate tears down the old channel, clears local chat state,
//! opens the new channel, and performs the join handshake — exactly one live
//! lobby session per client at any time.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement the [`Transport`] and
//!   [`transport::Connector`] traits for any backend
//! - **Wire-compatible** — event names and payload shapes match the lobby
//!   server exactly (`join`, `send-message`, `online-users`, `chat-history`,
//!   `new-message`)
//! - **WebSocket built-in** — default `transport-websocket` feature provides
//!   [`WebSocketConnector`] and its per-lobby [`WebSocketTransport`] channels
//! - **Event-driven** — receive typed [`LobbyEvent`]s via a channel
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let connector = WebSocketConnector::new("wss://lobby.example.com");
//! let (mut client, mut events) = LobbyClient::new(connector, LobbyConfig::generate());
//!
//! // Nothing playing yet — joins the "general" lobby.
//! client.update_playback(None).await?;
//! client.send_chat("hello!");
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         LobbyEvent::MessageReceived { message } => println!("{}: {}", message.user, message.message),
//!         LobbyEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

pub mod error;
pub mod event;
pub mod identity;
pub mod playback;
pub mod protocol;
pub mod reconcile;
pub mod resolver;
pub mod store;
pub mod transport;

#[cfg(feature = "tokio-runtime")]
pub mod client;

#[cfg(feature = "transport-websocket")]
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use error::LobbyError;
pub use event::LobbyEvent;
pub use identity::Username;
pub use playback::PlaybackState;
pub use protocol::{ChatMessage, ClientEvent, ServerEvent};
pub use reconcile::RosterEntry;
pub use resolver::{resolve, LobbyKey, LobbyMode};
pub use store::{MemoryStore, SessionContext, SessionStore};
pub use transport::Transport;

#[cfg(feature = "tokio-runtime")]
pub use client::{LobbyClient, LobbyConfig};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
