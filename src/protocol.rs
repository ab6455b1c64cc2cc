//! Wire-compatible event types for the lobby chat protocol.
//!
//! Every event crosses the transport as one JSON text envelope of the form
//! `{"event": "<name>", "data": <payload>}`. The event names and payload
//! field spellings (including `songId`) match the remote lobby server
//! exactly and must not be renamed.
//!
//! Outbound events are [`ClientEvent`]; inbound events are [`ServerEvent`].
//! Inbound decoding is deliberately tolerant: a snapshot payload that is not
//! the expected sequence degrades to an empty sequence instead of failing the
//! session (see [`ServerEvent::decode_lossy`]).

use serde::{Deserialize, Serialize};

// ── Chat messages ───────────────────────────────────────────────────

/// A single chat message as it appears on the wire.
///
/// Messages are immutable once created. Ordering is arrival order as
/// delivered by the server, never the sender's clock; `timestamp` is an
/// opaque display string. Servers may attach extra fields (e.g. storage
/// ids) — unknown fields are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the sender.
    pub user: String,
    /// Message body.
    pub message: String,
    /// Sender-formatted local time, for display only.
    pub timestamp: String,
}

// ── Events ──────────────────────────────────────────────────────────

/// Event types sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Join handshake, sent once immediately after a lobby channel opens.
    ///
    /// Both `songId` and `artist` are carried regardless of the active
    /// lobby mode; the remote ignores whichever it does not need.
    #[serde(rename = "join")]
    Join {
        /// The client's per-session display name.
        username: String,
        /// Track id of the currently playing song, if any.
        #[serde(rename = "songId")]
        song_id: Option<String>,
        /// Canonical (first, trimmed) artist name, if any.
        artist: Option<String>,
    },
    /// A chat message from this client.
    ///
    /// The message is not echoed into local state on send; it comes back
    /// through [`ServerEvent::NewMessage`], which keeps the server as the
    /// single source of ordering truth.
    #[serde(rename = "send-message")]
    SendMessage(ChatMessage),
}

/// Event types sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full roster snapshot — always a complete replacement, never a diff.
    #[serde(rename = "online-users")]
    OnlineUsers(Vec<String>),
    /// Full message backlog, sent after join — replaces the local log wholesale.
    #[serde(rename = "chat-history")]
    ChatHistory(Vec<ChatMessage>),
    /// A single new message, appended in arrival order.
    #[serde(rename = "new-message")]
    NewMessage(ChatMessage),
}

impl ClientEvent {
    /// Encode this event as its wire envelope.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::Serialization`](crate::error::LobbyError) when
    /// the payload cannot be represented as JSON.
    pub fn encode(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Raw envelope used for the tolerant decode path.
#[derive(Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl ServerEvent {
    /// Decode an inbound wire envelope, degrading instead of failing.
    ///
    /// Rules:
    /// - An `online-users` or `chat-history` payload that is not the
    ///   expected sequence is treated as an empty sequence (logged).
    /// - A malformed `new-message` payload is dropped (logged).
    /// - An unknown event name or unparseable envelope yields `None`.
    ///
    /// Nothing in this path returns an error — a misbehaving server must
    /// never take down the session loop.
    pub fn decode_lossy(text: &str) -> Option<Self> {
        let raw: RawEvent = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("unparseable server envelope: {e}");
                return None;
            }
        };

        match raw.event.as_str() {
            "online-users" => Some(Self::OnlineUsers(
                serde_json::from_value(raw.data).unwrap_or_else(|e| {
                    tracing::warn!("malformed online-users payload, treating as empty: {e}");
                    Vec::new()
                }),
            )),
            "chat-history" => Some(Self::ChatHistory(
                serde_json::from_value(raw.data).unwrap_or_else(|e| {
                    tracing::warn!("malformed chat-history payload, treating as empty: {e}");
                    Vec::new()
                }),
            )),
            "new-message" => match serde_json::from_value(raw.data) {
                Ok(msg) => Some(Self::NewMessage(msg)),
                Err(e) => {
                    tracing::warn!("malformed new-message payload, dropping: {e}");
                    None
                }
            },
            other => {
                tracing::debug!("ignoring unknown server event: {other}");
                None
            }
        }
    }
}
