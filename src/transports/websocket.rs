//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! [`WebSocketConnector`] opens a [`WebSocketTransport`] per connection
//! attempt. The transport translates tungstenite frames into
//! [`TransportEvent`]s, including the close code the reconnect policy needs:
//!
//! - a close frame yields its code (or `1005` when it carries none)
//! - a stream that ends or fails without a close frame yields `1006`
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature is enabled
//! (it is enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), party_game_client::PartyError> {
//! use party_game_client::{Transport, TransportEvent, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:8080/ws/lobby").await?;
//! transport.send(r#"{"type":"start","msg":{}}"#.to_string()).await?;
//!
//! if let TransportEvent::Message(text) = transport.recv().await {
//!     println!("received: {text}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::error::UrlError;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::error::PartyError;
use crate::transport::{CloseCode, Connector, Transport, TransportEvent};

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a single WebSocket connection.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: the only state carried across
/// calls is the pending close code recorded after an error, and it is taken
/// before any await point.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
    /// Close code owed to the caller after an `Error` event.
    pending_close: Option<CloseCode>,
}

impl WebSocketTransport {
    /// Establish a new WebSocket connection to the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::Unsupported`] if the URL scheme cannot be served
    /// by this build (not `ws://`, or `wss://` without TLS support), and
    /// [`PartyError::Io`] for every other connection failure. I/O error kinds
    /// are preserved; other failures map to
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, PartyError> {
        tracing::debug!(url = %url, "connecting to WebSocket server");

        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(map_connect_error)?;

        tracing::info!(url = %url, "WebSocket connection established");

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
            pending_close: None,
        }
    }

    /// Establish a new WebSocket connection with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::Timeout`] if the deadline elapses, or any error
    /// that [`connect`](Self::connect) may return.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, PartyError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| PartyError::Timeout)?
    }
}

fn map_connect_error(e: WsError) -> PartyError {
    match e {
        WsError::Url(url @ (UrlError::UnsupportedUrlScheme | UrlError::TlsFeatureNotEnabled)) => {
            PartyError::Unsupported(url.to_string())
        }
        WsError::Io(io) => PartyError::Io(io),
        other => PartyError::Io(std::io::Error::other(other)),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), PartyError> {
        if self.closed {
            return Err(PartyError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| PartyError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> TransportEvent {
        if let Some(code) = self.pending_close.take() {
            return TransportEvent::Closed(code);
        }

        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "WebSocket stream failed");
                    self.pending_close = Some(CloseCode::ABNORMAL);
                    return TransportEvent::Error(e.to_string());
                }
                // Stream ended without a close frame.
                None => return TransportEvent::Closed(CloseCode::ABNORMAL),
            };

            match msg {
                Message::Text(text) => return TransportEvent::Message(text.to_string()),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    let code = frame.map_or(CloseCode::NO_STATUS, |f| CloseCode(u16::from(f.code)));
                    return TransportEvent::Closed(code);
                }
                Message::Ping(_) => {
                    tracing::debug!("received WebSocket ping (auto-pong handled by tungstenite)");
                }
                Message::Pong(_) => {
                    tracing::debug!("received WebSocket pong (ignored)");
                }
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), PartyError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| PartyError::TransportSend(e.to_string()))
    }
}

/// A [`Connector`] that opens a fresh [`WebSocketTransport`] per attempt.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    timeout: Option<Duration>,
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every connection attempt by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&mut self, url: &str) -> Result<WebSocketTransport, PartyError> {
        match self.timeout {
            Some(timeout) => WebSocketTransport::connect_with_timeout(url, timeout).await,
            None => WebSocketTransport::connect(url).await,
        }
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
        assert_send::<WebSocketConnector>();
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1").await.unwrap_err();
        assert!(matches!(err, PartyError::Io(_)));
    }

    #[tokio::test]
    async fn non_websocket_scheme_is_unsupported() {
        let err = WebSocketTransport::connect("http://example.invalid/ws/room")
            .await
            .unwrap_err();
        assert!(matches!(err, PartyError::Unsupported(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn connector_timeout_is_applied() {
        let mut connector = WebSocketConnector::new().with_timeout(Duration::from_millis(50));
        let err = connector.connect("ws://192.0.2.1:1").await.unwrap_err();
        assert!(matches!(err, PartyError::Timeout));
    }

    // ── Mock-stream helpers ──────────────────────────────────────────────

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns the address to connect to.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}/ws/test-room")
    }

    // ── Mock-stream tests ────────────────────────────────────────────────

    #[tokio::test]
    async fn recv_yields_text_then_clean_close() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"start","body":null}"#.into()))
                .await
                .unwrap();
            ws.close(Some(CloseFrame {
                code: WsCloseCode::Normal,
                reason: "".into(),
            }))
            .await
            .unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await,
            TransportEvent::Message(r#"{"type":"start","body":null}"#.into())
        );
        assert_eq!(transport.recv().await, TransportEvent::Closed(CloseCode::NORMAL));
    }

    #[tokio::test]
    async fn close_frame_without_code_reports_no_status() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(transport.recv().await, TransportEvent::Closed(CloseCode::NO_STATUS));
    }

    #[tokio::test]
    async fn dropped_connection_reports_abnormal_close() {
        let url = start_mock_server(|ws| async move {
            // Tear down the TCP stream without a closing handshake.
            drop(ws);
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        // Either a bare end-of-stream or an error followed by the close.
        loop {
            match transport.recv().await {
                TransportEvent::Error(_) => {}
                TransportEvent::Closed(code) => {
                    assert_eq!(code, CloseCode::ABNORMAL);
                    break;
                }
                TransportEvent::Message(m) => panic!("unexpected frame {m}"),
            }
        }
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text("after_binary".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await,
            TransportEvent::Message("after_binary".into())
        );
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url = start_mock_server(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("late".to_string()).await.unwrap_err();
        assert!(matches!(err, PartyError::TransportClosed));
    }

    #[tokio::test]
    async fn connector_send_round_trip() {
        let url = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketConnector::new().connect(&url).await.unwrap();
        transport.send("echo".to_string()).await.unwrap();
        assert_eq!(transport.recv().await, TransportEvent::Message("echo".into()));
    }
}
