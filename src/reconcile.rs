//! Roster and chat-history reconciliation.
//!
//! The server is the sole source of truth for lobby membership and message
//! ordering. Reconciliation is therefore simple: `online-users` and
//! `chat-history` replace local state wholesale, `new-message` appends in
//! arrival order. There is no merging, no dedup, and no reordering by
//! timestamp.
//!
//! Every lobby session is stamped with a monotonically increasing
//! generation. Events are applied only while their session's generation is
//! still current; anything arriving from a torn-down session is discarded
//! before it can touch state that now belongs to the next lobby.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::event::LobbyEvent;
use crate::protocol::{ChatMessage, ServerEvent};

/// One entry in the online-user roster.
///
/// `render_key` is a local-only identity minted fresh on every snapshot, so
/// presentation layers can key list items without assuming server names are
/// unique. It never crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Local-only rendering identity, fresh per snapshot.
    pub render_key: Uuid,
    /// Username as reported by the server.
    pub name: String,
}

impl RosterEntry {
    fn new(name: String) -> Self {
        Self {
            render_key: Uuid::new_v4(),
            name,
        }
    }
}

/// Shared state between the client handle and the per-session loops.
///
/// Generation bookkeeping lives here so that the reconciler can reject
/// stale events without consulting the session manager.
pub(crate) struct SessionState {
    /// Generation of the most recently started session. Zero before the
    /// first session.
    current_generation: AtomicU64,
    /// Generation of the connected session, zero while disconnected.
    connected_generation: AtomicU64,
    roster: Mutex<Vec<RosterEntry>>,
    messages: Mutex<Vec<ChatMessage>>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            current_generation: AtomicU64::new(0),
            connected_generation: AtomicU64::new(0),
            roster: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Allocate the next session generation, invalidating all prior ones.
    pub(crate) fn begin_session(&self) -> u64 {
        self.current_generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.current_generation.load(Ordering::Acquire) == generation
    }

    /// Record that the session with `generation` reached the transport.
    pub(crate) fn mark_connected(&self, generation: u64) {
        if self.is_current(generation) {
            self.connected_generation.store(generation, Ordering::Release);
        }
    }

    /// Record that the session with `generation` lost its transport. A
    /// newer session's connected flag is left untouched.
    pub(crate) fn mark_disconnected(&self, generation: u64) {
        let _ = self.connected_generation.compare_exchange(
            generation,
            0,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub(crate) fn is_connected(&self) -> bool {
        let connected = self.connected_generation.load(Ordering::Acquire);
        connected != 0 && connected == self.current_generation.load(Ordering::Acquire)
    }

    /// Wipe roster and message log. Called between teardown of one lobby
    /// and connect of the next, so the new lobby starts empty until its
    /// own snapshots arrive.
    pub(crate) async fn clear(&self) {
        self.roster.lock().await.clear();
        self.messages.lock().await.clear();
    }

    /// Current roster snapshot.
    pub(crate) async fn roster(&self) -> Vec<RosterEntry> {
        self.roster.lock().await.clone()
    }

    /// Current message log.
    pub(crate) async fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().await.clone()
    }

    /// Apply one inbound event on behalf of the session stamped with
    /// `generation`.
    ///
    /// Returns the host-facing event when the mutation was applied, `None`
    /// when the event was stale and discarded. The generation check happens
    /// under the same lock as the mutation, so a concurrent lobby switch
    /// can never interleave between check and write.
    pub(crate) async fn apply(&self, generation: u64, event: ServerEvent) -> Option<LobbyEvent> {
        match event {
            ServerEvent::OnlineUsers(names) => {
                let users: Vec<RosterEntry> = names.into_iter().map(RosterEntry::new).collect();
                let mut roster = self.roster.lock().await;
                if !self.is_current(generation) {
                    tracing::debug!("discarding stale online-users snapshot");
                    return None;
                }
                *roster = users.clone();
                Some(LobbyEvent::RosterUpdated { users })
            }
            ServerEvent::ChatHistory(history) => {
                let mut messages = self.messages.lock().await;
                if !self.is_current(generation) {
                    tracing::debug!("discarding stale chat-history snapshot");
                    return None;
                }
                *messages = history.clone();
                Some(LobbyEvent::HistoryReplaced { messages: history })
            }
            ServerEvent::NewMessage(message) => {
                let mut messages = self.messages.lock().await;
                if !self.is_current(generation) {
                    tracing::debug!("discarding stale new-message");
                    return None;
                }
                messages.push(message.clone());
                Some(LobbyEvent::MessageReceived { message })
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
