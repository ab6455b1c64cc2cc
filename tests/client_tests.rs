#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration-style client tests for the listen-lobby client.
//!
//! Uses the shared `MockConnector` from `tests/common` to script or drive
//! per-lobby transports and verify the session manager's behavior: key
//! transitions, join handshakes, roster/history reconciliation, stale-event
//! discard, and outbound send semantics.

mod common;

use std::time::Duration;

use listen_lobby_client::protocol::{ChatMessage, ClientEvent};
use listen_lobby_client::reconcile::RosterEntry;
use listen_lobby_client::{
    LobbyClient, LobbyConfig, LobbyError, LobbyEvent, LobbyKey, LobbyMode, PlaybackState, Username,
};
use tokio::sync::mpsc;

use common::{chat_history_json, chat_msg, new_message_json, online_users_json, MockConnector};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn test_config() -> LobbyConfig {
    LobbyConfig::new(Username::new("Teal-Otter-417"))
        .with_shutdown_timeout(Duration::from_millis(200))
}

fn playing(track_id: &str, artists: &str) -> PlaybackState {
    PlaybackState {
        track_id: Some(track_id.to_string()),
        artist_names: Some(artists.to_string()),
        is_playing: true,
        ..Default::default()
    }
}

/// Start a client over a fresh mock connector, returning a connector probe
/// alongside the client and its event receiver.
fn start_client(
    connector: MockConnector,
) -> (
    LobbyClient<MockConnector>,
    mpsc::Receiver<LobbyEvent>,
    MockConnector,
) {
    let probe = connector.clone();
    let (client, events) = LobbyClient::new(connector, test_config());
    (client, events, probe)
}

/// Receive the next event, failing the test after a bounded wait.
async fn next_event(events: &mut mpsc::Receiver<LobbyEvent>) -> LobbyEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for a lobby event")
        .expect("event channel closed")
}

async fn expect_connected(events: &mut mpsc::Receiver<LobbyEvent>) -> LobbyKey {
    match next_event(events).await {
        LobbyEvent::Connected { key } => key,
        other => panic!("expected Connected, got {other:?}"),
    }
}

async fn expect_disconnected(
    events: &mut mpsc::Receiver<LobbyEvent>,
) -> (LobbyKey, Option<String>) {
    match next_event(events).await {
        LobbyEvent::Disconnected { key, reason } => (key, reason),
        other => panic!("expected Disconnected, got {other:?}"),
    }
}

async fn expect_roster(events: &mut mpsc::Receiver<LobbyEvent>) -> Vec<RosterEntry> {
    match next_event(events).await {
        LobbyEvent::RosterUpdated { users } => users,
        other => panic!("expected RosterUpdated, got {other:?}"),
    }
}

async fn expect_history(events: &mut mpsc::Receiver<LobbyEvent>) -> Vec<ChatMessage> {
    match next_event(events).await {
        LobbyEvent::HistoryReplaced { messages } => messages,
        other => panic!("expected HistoryReplaced, got {other:?}"),
    }
}

async fn expect_message(events: &mut mpsc::Receiver<LobbyEvent>) -> ChatMessage {
    match next_event(events).await {
        LobbyEvent::MessageReceived { message } => message,
        other => panic!("expected MessageReceived, got {other:?}"),
    }
}

/// Decode every recorded outbound envelope.
fn decode_sent(probe: &MockConnector) -> Vec<(String, ClientEvent)> {
    probe
        .sent()
        .into_iter()
        .map(|(key, json)| {
            let event = serde_json::from_str(&json).expect("outbound envelope parses");
            (key, event)
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════
// Join handshake and key idempotence
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn joining_a_lobby_sends_exactly_one_join() {
    let connector = MockConnector::new();
    connector.script_ok(
        "abc123",
        vec![
            online_users_json(&["Teal-Otter-417"]),
            chat_history_json(&[]),
        ],
    );
    let (mut client, mut events, probe) = start_client(connector);

    client
        .update_playback(Some(playing("abc123", "Radiohead")))
        .await
        .unwrap();

    let key = expect_connected(&mut events).await;
    assert_eq!(key.as_str(), "abc123");
    let _ = expect_roster(&mut events).await;
    let _ = expect_history(&mut events).await;

    // Progress-only churn: same track, new position. Must be a no-op.
    let mut tick = playing("abc123", "Radiohead");
    tick.position_ms = 45_000;
    client.update_playback(Some(tick)).await.unwrap();
    client
        .update_playback(Some(playing("abc123", "Radiohead")))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(probe.ops(), ["connect:abc123"]);
    let sent = decode_sent(&probe);
    assert_eq!(sent.len(), 1, "expected exactly one outbound join");
    assert!(matches!(sent[0].1, ClientEvent::Join { .. }));

    client.shutdown().await;
}

#[tokio::test]
async fn join_carries_username_song_and_artist() {
    let (mut client, mut events, probe) = start_client(MockConnector::new());

    client
        .update_playback(Some(playing("abc123", "Daft Punk, Pharrell Williams")))
        .await
        .unwrap();
    let _ = expect_connected(&mut events).await;

    tokio::time::sleep(Duration::from_millis(50)).await;

    let sent = decode_sent(&probe);
    let (key, join) = &sent[0];
    assert_eq!(key, "abc123");
    match join {
        ClientEvent::Join {
            username,
            song_id,
            artist,
        } => {
            assert_eq!(username, "Teal-Otter-417");
            assert_eq!(song_id.as_deref(), Some("abc123"));
            // Both fields travel regardless of mode; the remote picks.
            assert_eq!(artist.as_deref(), Some("Daft Punk"));
        }
        other => panic!("expected Join, got {other:?}"),
    }

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Key transitions
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn switching_keys_tears_down_before_connecting() {
    let (mut client, mut events, probe) = start_client(MockConnector::new());

    client
        .update_playback(Some(playing("songX", "A")))
        .await
        .unwrap();
    let _ = expect_connected(&mut events).await;

    client
        .update_playback(Some(playing("songY", "A")))
        .await
        .unwrap();
    let (gone, _) = expect_disconnected(&mut events).await;
    assert_eq!(gone.as_str(), "songX");
    let key = expect_connected(&mut events).await;
    assert_eq!(key.as_str(), "songY");

    assert_eq!(
        probe.ops(),
        ["connect:songX", "disconnect:songX", "connect:songY"],
        "the old channel must be torn down before the new connect is issued"
    );

    client.shutdown().await;
}

#[tokio::test]
async fn history_resets_on_lobby_switch() {
    let connector = MockConnector::new();
    connector.script_ok("songX", vec![chat_history_json(&[chat_msg("A", "earlier")])]);
    let song_y = connector.driven("songY");
    let (mut client, mut events, _probe) = start_client(connector);

    client
        .update_playback(Some(playing("songX", "A")))
        .await
        .unwrap();
    let _ = expect_connected(&mut events).await;
    let history = expect_history(&mut events).await;
    assert_eq!(history.len(), 1);
    assert_eq!(client.messages().await.len(), 1);

    // Switch: the log must be empty until the new lobby's backlog arrives.
    client
        .update_playback(Some(playing("songY", "A")))
        .await
        .unwrap();
    let _ = expect_disconnected(&mut events).await;
    let _ = expect_connected(&mut events).await;
    assert!(client.messages().await.is_empty());

    song_y
        .send(chat_history_json(&[chat_msg("B", "fresh")]))
        .unwrap();
    let history = expect_history(&mut events).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].message, "fresh");
    assert_eq!(client.messages().await.len(), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn nothing_playing_falls_back_to_general() {
    let (mut client, mut events, _probe) = start_client(MockConnector::new());

    client
        .update_playback(Some(playing("abc123", "Radiohead")))
        .await
        .unwrap();
    let _ = expect_connected(&mut events).await;

    client.update_playback(None).await.unwrap();
    let _ = expect_disconnected(&mut events).await;
    let key = expect_connected(&mut events).await;
    assert!(key.is_general());
    assert_eq!(client.lobby_path().as_deref(), Some("/lobby/general"));

    client.shutdown().await;
}

#[tokio::test]
async fn artist_mode_switch_reconnects_to_escaped_artist_key() {
    let (mut client, mut events, _probe) = start_client(MockConnector::new());

    client
        .update_playback(Some(playing("abc123", "Daft Punk, Pharrell Williams")))
        .await
        .unwrap();
    let _ = expect_connected(&mut events).await;

    client.set_mode(LobbyMode::Artist).await.unwrap();
    let _ = expect_disconnected(&mut events).await;
    let key = expect_connected(&mut events).await;
    assert_eq!(key.as_str(), "Daft%20Punk");

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Roster reconciliation
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn roster_snapshots_replace_never_merge() {
    let connector = MockConnector::new();
    let server = connector.driven("general");
    let (mut client, mut events, _probe) = start_client(connector);

    client.update_playback(None).await.unwrap();
    let _ = expect_connected(&mut events).await;

    server.send(online_users_json(&["A", "B"])).unwrap();
    let roster = expect_roster(&mut events).await;
    assert_eq!(roster.len(), 2);

    server.send(online_users_json(&["C"])).unwrap();
    let roster = expect_roster(&mut events).await;
    let names: Vec<&str> = roster.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, vec!["C"]);

    let names: Vec<String> = client
        .roster()
        .await
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, vec!["C"]);

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Stale-event discard
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn late_message_for_a_previous_lobby_is_discarded() {
    let connector = MockConnector::new();
    let song_x = connector.driven("songX");
    let song_y = connector.driven("songY");
    let (mut client, mut events, _probe) = start_client(connector);

    // Connect to songX and receive an empty backlog.
    client
        .update_playback(Some(playing("songX", "A")))
        .await
        .unwrap();
    let _ = expect_connected(&mut events).await;
    song_x.send(chat_history_json(&[])).unwrap();
    let _ = expect_history(&mut events).await;

    // Switch to songY before any songX message arrives.
    client
        .update_playback(Some(playing("songY", "A")))
        .await
        .unwrap();
    let _ = expect_disconnected(&mut events).await;
    let _ = expect_connected(&mut events).await;

    // A delayed songX message shows up after the switch. Its channel is
    // gone; nothing may leak into songY's log.
    let _ = song_x.send(new_message_json(&chat_msg("A", "too late")));

    let quiet = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
    assert!(
        quiet.is_err(),
        "no event should surface for the stale message"
    );
    assert!(client.messages().await.is_empty());

    // The new lobby still works.
    song_y
        .send(new_message_json(&chat_msg("B", "current")))
        .unwrap();
    let message = expect_message(&mut events).await;
    assert_eq!(message.message, "current");
    assert_eq!(client.messages().await.len(), 1);

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Outbound send
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn send_round_trip_has_a_single_source_of_ordering_truth() {
    let connector = MockConnector::new();
    let server = connector.driven("general");
    let (mut client, mut events, probe) = start_client(connector);

    client.update_playback(None).await.unwrap();
    let _ = expect_connected(&mut events).await;

    client.send_chat("hello");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let sent = decode_sent(&probe);
    assert_eq!(sent.len(), 2); // join + send-message
    match &sent[1].1 {
        ClientEvent::SendMessage(msg) => {
            assert_eq!(msg.user, "Teal-Otter-417");
            assert_eq!(msg.message, "hello");
        }
        other => panic!("expected SendMessage, got {other:?}"),
    }

    // Send never writes the local log directly…
    assert!(client.messages().await.is_empty());

    // …only the server echo does.
    server
        .send(new_message_json(&chat_msg("Teal-Otter-417", "hello")))
        .unwrap();
    let message = expect_message(&mut events).await;
    assert_eq!(message.message, "hello");
    assert_eq!(client.messages().await.len(), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn empty_and_whitespace_sends_emit_nothing() {
    let (mut client, mut events, probe) = start_client(MockConnector::new());

    client.update_playback(None).await.unwrap();
    let _ = expect_connected(&mut events).await;

    client.send_chat("");
    client.send_chat("   ");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let sent = decode_sent(&probe);
    assert_eq!(sent.len(), 1, "only the join may be sent");
    assert!(matches!(sent[0].1, ClientEvent::Join { .. }));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Failure paths
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn connect_failure_is_surfaced_once_and_not_retried() {
    let connector = MockConnector::new();
    connector.refuse("general");
    let (mut client, mut events, probe) = start_client(connector);

    let result = client.update_playback(None).await;
    assert!(matches!(result, Err(LobbyError::Io(_))));
    assert!(!client.is_connected());
    assert!(client.current_key().is_none());
    assert_eq!(probe.ops(), ["connect:general"]);

    // The host may try again later; the next attempt opens a fresh channel.
    client.update_playback(None).await.unwrap();
    let _ = expect_connected(&mut events).await;
    assert!(client.is_connected());

    client.shutdown().await;
}

#[tokio::test]
async fn server_close_disconnects_and_allows_reconnect_to_same_key() {
    let connector = MockConnector::new();
    // First connect: the server closes the channel immediately.
    connector.script("general", vec![None]);
    let (mut client, mut events, _probe) = start_client(connector);

    client.update_playback(None).await.unwrap();
    let _ = expect_connected(&mut events).await;
    let (key, reason) = expect_disconnected(&mut events).await;
    assert!(key.is_general());
    assert!(reason.is_none(), "clean server close carries no reason");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!client.is_connected());

    // The same resolved key must reconnect now that the session is dead.
    client.update_playback(None).await.unwrap();
    let _ = expect_connected(&mut events).await;
    assert!(client.is_connected());

    client.shutdown().await;
}

#[tokio::test]
async fn malformed_inbound_events_degrade_without_killing_the_session() {
    let connector = MockConnector::new();
    let server = connector.driven("general");
    let (mut client, mut events, _probe) = start_client(connector);

    client.update_playback(None).await.unwrap();
    let _ = expect_connected(&mut events).await;

    // Not a sequence — degrades to an empty backlog.
    server
        .send(r#"{"event":"chat-history","data":"nonsense"}"#.to_string())
        .unwrap();
    let history = expect_history(&mut events).await;
    assert!(history.is_empty());

    // Not even an envelope — ignored entirely.
    server.send("garbage".to_string()).unwrap();

    // The session is still alive and ordered.
    server
        .send(new_message_json(&chat_msg("A", "still here")))
        .unwrap();
    let message = expect_message(&mut events).await;
    assert_eq!(message.message, "still here");

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Shutdown
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn shutdown_disconnects_and_clears_the_recorded_key() {
    let (mut client, mut events, _probe) = start_client(MockConnector::new());

    client.update_playback(None).await.unwrap();
    let _ = expect_connected(&mut events).await;
    assert!(client.is_connected());

    client.shutdown().await;
    let (key, _) = expect_disconnected(&mut events).await;
    assert!(key.is_general());
    assert!(!client.is_connected());
    assert!(client.current_key().is_none());
    assert!(client.lobby_path().is_none());
}
