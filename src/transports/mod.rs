//! Transport implementations for the lobby chat protocol.
//!
//! This module provides concrete [`Transport`](crate::Transport) and
//! [`Connector`](crate::transport::Connector) implementations behind
//! feature gates. Enable the corresponding Cargo feature to pull in a
//! transport:
//!
//! | Feature                | Types                                          |
//! |------------------------|------------------------------------------------|
//! | `transport-websocket`  | [`WebSocketTransport`], [`WebSocketConnector`] |
//!
//! # Example
//!
//! ```rust,ignore
//! # async fn example() -> Result<(), listen_lobby_client::LobbyError> {
//! use listen_lobby_client::transport::Connector;
//! use listen_lobby_client::{LobbyKey, Transport, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new("ws://localhost:4040");
//! let mut channel = connector.connect(&LobbyKey::general()).await?;
//! channel.send(r#"{"event":"join","data":{"username":"Teal-Otter-417","songId":null,"artist":null}}"#.to_string()).await?;
//!
//! if let Some(Ok(msg)) = channel.recv().await {
//!     println!("server said: {msg}");
//! }
//!
//! channel.close().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};
