//! WebSocket transport for lobby channels, using `tokio-tungstenite`.
//!
//! [`WebSocketConnector`] opens one WebSocket per lobby key under a base
//! URL: the channel for key `k` lives at `<base>/lobby/<k>`. Every connect
//! yields a [`WebSocketTransport`] that carries the protocol's JSON text
//! envelopes as WebSocket text frames until the session manager tears it
//! down on the next key change. Both `ws://` and `wss://` base URLs are
//! supported — TLS is handled transparently via
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature is
//! enabled (it is enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), listen_lobby_client::LobbyError> {
//! use listen_lobby_client::transport::Connector;
//! use listen_lobby_client::{LobbyKey, Transport, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new("ws://localhost:4040");
//! let mut channel = connector.connect(&LobbyKey::general()).await?;
//! channel
//!     .send(r#"{"event":"join","data":{"username":"Teal-Otter-417","songId":null,"artist":null}}"#.to_string())
//!     .await?;
//!
//! if let Some(Ok(envelope)) = channel.recv().await {
//!     println!("server said: {envelope}");
//! }
//!
//! channel.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::LobbyError;
use crate::resolver::LobbyKey;
use crate::transport::{Connector, Transport};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// ── Connector ───────────────────────────────────────────────────────

/// Opens one WebSocket per lobby key under a base URL.
///
/// The channel address for key `k` is `<base>/lobby/<k>`. Lobby keys are
/// already URL-safe (track ids are alphanumeric; artist keys come out of
/// the resolver percent-escaped), so they are appended verbatim.
///
/// # Example
///
/// ```
/// use listen_lobby_client::transports::WebSocketConnector;
/// use listen_lobby_client::resolver::LobbyKey;
///
/// let connector = WebSocketConnector::new("wss://lobby.example.com/");
/// assert_eq!(
///     connector.channel_url(&LobbyKey::general()),
///     "wss://lobby.example.com/lobby/general"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    base_url: String,
    connect_timeout: Option<Duration>,
}

impl WebSocketConnector {
    /// Create a connector rooted at `base_url` (trailing slashes trimmed).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            connect_timeout: None,
        }
    }

    /// Bound each channel-open attempt by `timeout`.
    ///
    /// Without this, a connect that never completes hangs until the OS
    /// gives up on the underlying TCP connection.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// The WebSocket URL addressing the lobby with the given key.
    pub fn channel_url(&self, key: &LobbyKey) -> String {
        format!("{}/lobby/{}", self.base_url, key)
    }

    async fn open(&self, key: &LobbyKey) -> Result<WebSocketTransport, LobbyError> {
        let url = self.channel_url(key);
        tracing::debug!(key = %key, url = %url, "opening lobby channel");

        let (stream, _response) = tokio_tungstenite::connect_async(&url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            LobbyError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(key = %key, "lobby channel established");

        Ok(WebSocketTransport {
            key: key.clone(),
            stream,
            closed: false,
        })
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Channel = WebSocketTransport;

    async fn connect(&self, key: &LobbyKey) -> Result<WebSocketTransport, LobbyError> {
        match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.open(key))
                .await
                .map_err(|_| LobbyError::Timeout)?,
            None => self.open(key).await,
        }
    }
}

// ── Channel ─────────────────────────────────────────────────────────

/// One lobby channel carried over a WebSocket connection.
///
/// Produced by [`WebSocketConnector::connect`] — one instance per joined
/// lobby, closed and replaced whenever the resolved lobby key changes.
/// Each protocol envelope maps to one WebSocket text frame.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method is cancel-safe. Dropping the future
/// returned by `recv` before it completes will not consume or lose any
/// frames, making it safe to use inside `tokio::select!`.
#[derive(Debug)]
pub struct WebSocketTransport {
    key: LobbyKey,
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Key of the lobby this channel is addressed to.
    pub fn key(&self) -> &LobbyKey {
        &self.key
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), LobbyError> {
        if self.closed {
            return Err(LobbyError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| LobbyError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, LobbyError>> {
        loop {
            let frame = match self.stream.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    return Some(Err(LobbyError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match frame {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(_) => {
                    tracing::debug!(key = %self.key, "lobby channel closed by server");
                    return None;
                }
                Message::Binary(_) => {
                    // The lobby protocol is text-only.
                    tracing::warn!(key = %self.key, "skipping binary frame on lobby channel");
                }
                // tungstenite answers pings itself; raw frames never surface
                // from the read half.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), LobbyError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::debug!(key = %self.key, "leaving lobby channel");
        self.stream
            .close(None)
            .await
            .map_err(|e| LobbyError::TransportSend(e.to_string()))
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{ClientEvent, ServerEvent};
    use crate::resolver::{resolve, LobbyMode};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    #[test]
    fn channel_url_appends_lobby_key() {
        let connector = WebSocketConnector::new("ws://localhost:4040///");
        assert_eq!(
            connector.channel_url(&LobbyKey::general()),
            "ws://localhost:4040/lobby/general"
        );

        let artist_key = resolve(LobbyMode::Artist, None, Some("Daft Punk"));
        assert_eq!(
            connector.channel_url(&artist_key),
            "ws://localhost:4040/lobby/Daft%20Punk"
        );
    }

    /// Serve exactly one lobby connection, returning a connector rooted at
    /// the server plus a receiver for the request path the client asked for.
    async fn serve_one_lobby<F, Fut>(
        handler: F,
    ) -> (WebSocketConnector, tokio::sync::oneshot::Receiver<String>)
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (path_tx, path_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut requested = String::new();
            let ws = tokio_tungstenite::accept_hdr_async(
                tcp,
                |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    requested = req.uri().path().to_string();
                    Ok(resp)
                },
            )
            .await
            .unwrap();
            let _ = path_tx.send(requested);
            handler(ws).await;
        });

        (WebSocketConnector::new(format!("ws://{addr}")), path_rx)
    }

    #[tokio::test]
    async fn connect_requests_the_per_key_channel_path() {
        let (connector, path_rx) = serve_one_lobby(|mut ws| async move {
            let _ = ws.close(None).await;
        })
        .await;

        let key = resolve(LobbyMode::Song, Some("abc123"), None);
        let mut channel = connector.connect(&key).await.unwrap();
        assert_eq!(path_rx.await.unwrap(), "/lobby/abc123");
        assert_eq!(channel.key().as_str(), "abc123");

        // The server side is already gone; a failed close handshake is fine.
        let _ = channel.close().await;
    }

    #[tokio::test]
    async fn join_and_backlog_round_trip_over_websocket() {
        let (connector, _path_rx) = serve_one_lobby(|mut ws| async move {
            // Expect the join handshake, then serve an empty backlog and
            // close the channel.
            let frame = ws.next().await.unwrap().unwrap();
            let join: ClientEvent = serde_json::from_str(frame.to_text().unwrap()).unwrap();
            assert!(matches!(join, ClientEvent::Join { .. }));

            let backlog = serde_json::to_string(&ServerEvent::ChatHistory(Vec::new())).unwrap();
            ws.send(Message::Text(backlog.into())).await.unwrap();
            let _ = ws.close(None).await;
        })
        .await;

        let mut channel = connector.connect(&LobbyKey::general()).await.unwrap();
        let join = ClientEvent::Join {
            username: "Teal-Otter-417".into(),
            song_id: None,
            artist: None,
        };
        channel
            .send(serde_json::to_string(&join).unwrap())
            .await
            .unwrap();

        let envelope = channel.recv().await.unwrap().unwrap();
        assert_eq!(
            ServerEvent::decode_lossy(&envelope),
            Some(ServerEvent::ChatHistory(Vec::new()))
        );

        // The server closed the channel after the backlog.
        assert!(channel.recv().await.is_none());
    }

    #[tokio::test]
    async fn binary_frames_are_skipped_on_the_lobby_channel() {
        let (connector, _path_rx) = serve_one_lobby(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            let roster = serde_json::to_string(&ServerEvent::OnlineUsers(vec![
                "Teal-Otter-417".to_string(),
            ]))
            .unwrap();
            ws.send(Message::Text(roster.into())).await.unwrap();
            let _ = ws.close(None).await;
        })
        .await;

        let mut channel = connector.connect(&LobbyKey::general()).await.unwrap();

        // The binary frame is skipped; the roster snapshot behind it lands.
        let envelope = channel.recv().await.unwrap().unwrap();
        assert_eq!(
            ServerEvent::decode_lossy(&envelope),
            Some(ServerEvent::OnlineUsers(vec!["Teal-Otter-417".to_string()]))
        );
    }

    #[tokio::test]
    async fn send_on_a_left_lobby_fails_as_closed() {
        let (connector, _path_rx) = serve_one_lobby(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut channel = connector.connect(&LobbyKey::general()).await.unwrap();
        channel.close().await.unwrap();
        // A second close is a no-op.
        channel.close().await.unwrap();

        let err = channel.send("{}".to_string()).await.unwrap_err();
        assert!(matches!(err, LobbyError::TransportClosed));
    }

    #[tokio::test]
    async fn connect_failure_maps_to_io() {
        let connector = WebSocketConnector::new("ws://127.0.0.1:1");
        let err = connector
            .connect(&LobbyKey::general())
            .await
            .unwrap_err();
        assert!(matches!(err, LobbyError::Io(_)));
    }

    #[tokio::test]
    async fn connect_timeout_elapses() {
        // Non-routable address; the timeout fires before any TCP error.
        let connector = WebSocketConnector::new("ws://192.0.2.1:1")
            .with_connect_timeout(Duration::from_millis(50));
        let err = connector
            .connect(&LobbyKey::general())
            .await
            .unwrap_err();
        assert!(matches!(err, LobbyError::Timeout));
    }
}
