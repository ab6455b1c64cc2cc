//! Typed events delivered to the host application.
//!
//! [`LobbyEvent`]s arrive on the bounded channel returned by
//! [`LobbyClient::new`](crate::LobbyClient::new). Roster and history events
//! mirror what the reconciler has already applied to the client's local
//! state, so a host can either consume the events or poll the accessors.

use crate::protocol::ChatMessage;
use crate::reconcile::RosterEntry;
use crate::resolver::LobbyKey;

/// Events emitted by the lobby session manager.
#[derive(Debug, Clone)]
pub enum LobbyEvent {
    /// A lobby channel opened and the join handshake was queued.
    Connected {
        /// Key of the lobby that connected.
        key: LobbyKey,
    },
    /// The server replaced the online-user roster.
    RosterUpdated {
        /// Complete replacement snapshot, in server order.
        users: Vec<RosterEntry>,
    },
    /// The server replaced the message backlog (sent shortly after join).
    HistoryReplaced {
        /// Complete replacement log, in server order.
        messages: Vec<ChatMessage>,
    },
    /// A single new chat message arrived.
    MessageReceived {
        /// The appended message.
        message: ChatMessage,
    },
    /// A lobby session ended — torn down locally, closed by the server, or
    /// failed at the transport layer.
    Disconnected {
        /// Key of the lobby that disconnected.
        key: LobbyKey,
        /// Human-readable reason, `None` for a clean server-side close.
        reason: Option<String>,
    },
}
