#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for listen-lobby client integration tests.
//!
//! Provides a [`MockConnector`] that hands out one mock transport per
//! lobby-key connect. Transports are either *scripted* (a fixed list of
//! inbound messages, then silence) or *driven* (the test holds a sender and
//! pushes inbound messages at will). All connects, closes, and outbound
//! envelopes are recorded for ordering assertions.
//!
//! `MockConnector` is a cheap clone over shared state: keep a clone in the
//! test as a probe after moving the original into the client.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use listen_lobby_client::protocol::{ChatMessage, ServerEvent};
use listen_lobby_client::resolver::LobbyKey;
use listen_lobby_client::transport::Connector;
use listen_lobby_client::{LobbyError, Transport};

// ── Mock transport ──────────────────────────────────────────────────

enum TransportSource {
    /// Scripted responses consumed in order; hangs once exhausted.
    Scripted(VecDeque<Option<Result<String, LobbyError>>>),
    /// Inbound messages pushed by the test through a channel sender.
    Driven(mpsc::UnboundedReceiver<String>),
}

/// A mock transport bound to one lobby key.
///
/// Outbound envelopes are recorded as `(key, json)` pairs in the shared
/// `sent` log; `close()` appends `disconnect:<key>` to the shared op log.
pub struct MockTransport {
    key: String,
    source: TransportSource,
    sent: Arc<StdMutex<Vec<(String, String)>>>,
    ops: Arc<StdMutex<Vec<String>>>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), LobbyError> {
        self.sent.lock().unwrap().push((self.key.clone(), message));
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, LobbyError>> {
        match &mut self.source {
            TransportSource::Scripted(incoming) => {
                if let Some(item) = incoming.pop_front() {
                    // An explicit `None` entry signals a clean close;
                    // `Some(result)` delivers the scripted message or error.
                    item
                } else {
                    // All scripted messages delivered — hang so the session
                    // loop stays alive until the next lobby switch.
                    std::future::pending().await
                }
            }
            TransportSource::Driven(rx) => rx.recv().await.map(Ok),
        }
    }

    async fn close(&mut self) -> Result<(), LobbyError> {
        self.ops
            .lock()
            .unwrap()
            .push(format!("disconnect:{}", self.key));
        Ok(())
    }
}

// ── Mock connector ──────────────────────────────────────────────────

enum ConnectPlan {
    Scripted(Vec<Option<Result<String, LobbyError>>>),
    Driven(mpsc::UnboundedReceiver<String>),
    Refuse,
}

/// A [`Connector`] serving pre-registered plans per lobby key.
///
/// Connecting to a key without a registered plan yields an empty scripted
/// transport (silent, stays open). Plans queue per key, so reconnects to
/// the same key consume plans in registration order.
#[derive(Clone)]
pub struct MockConnector {
    inner: Arc<Shared>,
}

struct Shared {
    plans: StdMutex<HashMap<String, VecDeque<ConnectPlan>>>,
    sent: Arc<StdMutex<Vec<(String, String)>>>,
    ops: Arc<StdMutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                plans: StdMutex::new(HashMap::new()),
                sent: Arc::new(StdMutex::new(Vec::new())),
                ops: Arc::new(StdMutex::new(Vec::new())),
            }),
        }
    }

    fn push_plan(&self, key: &str, plan: ConnectPlan) {
        self.inner
            .plans
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(plan);
    }

    /// Script the next connect to `key` with raw inbound items.
    pub fn script(&self, key: &str, incoming: Vec<Option<Result<String, LobbyError>>>) {
        self.push_plan(key, ConnectPlan::Scripted(incoming));
    }

    /// Script the next connect to `key` with inbound messages, all `Ok`.
    pub fn script_ok(&self, key: &str, incoming: Vec<String>) {
        self.script(
            key,
            incoming.into_iter().map(|text| Some(Ok(text))).collect(),
        );
    }

    /// Register a test-driven transport for the next connect to `key`.
    /// Returns the sender the test pushes inbound messages through;
    /// dropping it reads as a clean server-side close.
    pub fn driven(&self, key: &str) -> mpsc::UnboundedSender<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push_plan(key, ConnectPlan::Driven(rx));
        tx
    }

    /// Make the next connect to `key` fail.
    pub fn refuse(&self, key: &str) {
        self.push_plan(key, ConnectPlan::Refuse);
    }

    /// All outbound envelopes so far, as `(key, json)` pairs.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// The connect/disconnect op log so far.
    pub fn ops(&self) -> Vec<String> {
        self.inner.ops.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Channel = MockTransport;

    async fn connect(&self, key: &LobbyKey) -> Result<MockTransport, LobbyError> {
        self.inner
            .ops
            .lock()
            .unwrap()
            .push(format!("connect:{key}"));

        let plan = self
            .inner
            .plans
            .lock()
            .unwrap()
            .get_mut(key.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or(ConnectPlan::Scripted(Vec::new()));

        let source = match plan {
            ConnectPlan::Scripted(incoming) => TransportSource::Scripted(incoming.into()),
            ConnectPlan::Driven(rx) => TransportSource::Driven(rx),
            ConnectPlan::Refuse => {
                return Err(LobbyError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "scripted connect failure",
                )));
            }
        };

        Ok(MockTransport {
            key: key.as_str().to_string(),
            source,
            sent: Arc::clone(&self.inner.sent),
            ops: Arc::clone(&self.inner.ops),
        })
    }
}

// ── JSON helper functions ───────────────────────────────────────────

/// Build a chat message with a fixed display timestamp.
pub fn chat_msg(user: &str, body: &str) -> ChatMessage {
    ChatMessage {
        user: user.to_string(),
        message: body.to_string(),
        timestamp: "12:00".to_string(),
    }
}

/// Wire envelope for an `online-users` roster snapshot.
pub fn online_users_json(names: &[&str]) -> String {
    serde_json::to_string(&ServerEvent::OnlineUsers(
        names.iter().map(|name| name.to_string()).collect(),
    ))
    .expect("online_users_json serialization")
}

/// Wire envelope for a `chat-history` backlog.
pub fn chat_history_json(messages: &[ChatMessage]) -> String {
    serde_json::to_string(&ServerEvent::ChatHistory(messages.to_vec()))
        .expect("chat_history_json serialization")
}

/// Wire envelope for a single `new-message`.
pub fn new_message_json(message: &ChatMessage) -> String {
    serde_json::to_string(&ServerEvent::NewMessage(message.clone()))
        .expect("new_message_json serialization")
}
