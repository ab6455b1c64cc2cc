//! Transport abstraction for the lobby chat protocol.
//!
//! The [`Transport`] trait defines a bidirectional text message channel for
//! one lobby. The protocol uses JSON text envelopes, so every transport
//! implementation must handle message framing internally (e.g., WebSocket
//! frames, length-prefixed TCP, QUIC streams).
//!
//! Unlike a single long-lived connection, lobby channels are opened and
//! closed as the resolved lobby key changes, so channel setup IS part of
//! the core's contract: the [`Connector`] trait turns a [`LobbyKey`] into a
//! fresh connected [`Transport`]. How a connector maps keys to endpoints
//! (one URL per key, a multiplexed sub-channel of a shared connection, an
//! in-process pair for tests) is the implementation's choice, as long as
//! events within one channel are delivered in order.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use listen_lobby_client::error::LobbyError;
//! use listen_lobby_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), LobbyError> {
//!         // Send the JSON text envelope over your transport
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, LobbyError>> {
//!         // Receive the next JSON text envelope
//!         // Return None when the channel is closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), LobbyError> {
//!         // Gracefully shut down the channel
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::LobbyError;
use crate::resolver::LobbyKey;

/// A bidirectional text message channel addressing one lobby.
///
/// Implementors shuttle serialized JSON envelopes between the client and
/// server. Each call to [`send`](Transport::send) transmits one complete
/// envelope; each call to [`recv`](Transport::recv) returns one.
///
/// # Object Safety
///
/// This trait is object-safe, so `Box<dyn Transport>` works for dynamic
/// dispatch.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it
/// is used inside `tokio::select!`. If `recv` is cancelled before
/// completion, calling it again must not lose data. Channel-based
/// implementations (e.g., wrapping `mpsc::Receiver`) are naturally
/// cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text envelope to the server.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::TransportSend`] if the message could not be
    /// sent (e.g., connection broken, write buffer full).
    async fn send(&mut self, message: String) -> Result<(), LobbyError>;

    /// Receive the next JSON text envelope from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))` — a complete message was received
    /// - `Some(Err(e))` — a transport error occurred (e.g., [`LobbyError::TransportReceive`])
    /// - `None` — the channel was closed cleanly by the server
    ///
    /// # Cancel Safety
    ///
    /// This method **MUST** be cancel-safe (see [trait documentation](Transport)).
    async fn recv(&mut self) -> Option<Result<String, LobbyError>>;

    /// Close the channel gracefully.
    ///
    /// After calling this method, subsequent calls to [`send`](Transport::send)
    /// and [`recv`](Transport::recv) may return errors or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations
    /// should still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), LobbyError>;
}

/// Opens a fresh [`Transport`] channel for a lobby key.
///
/// The session manager calls this once per lobby transition, always after
/// the previous channel's teardown has been issued. Connectors do not
/// retry: reconnection and backoff policy, if any, belong to the transport
/// layer or the host, not to the core.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport type this connector produces.
    type Channel: Transport;

    /// Open a channel addressed by `key`.
    ///
    /// # Errors
    ///
    /// Returns a transport-level error when the channel cannot be opened;
    /// the session manager surfaces it once and stays disconnected.
    async fn connect(&self, key: &LobbyKey) -> Result<Self::Channel, LobbyError>;
}
