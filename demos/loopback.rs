//! # Loopback Example
//!
//! Shows how to implement [`Connector`] and [`Transport`] with in-process
//! channels, and plays a short round against a scripted fake server:
//!
//! - the player sends a guess, which the server echoes back as a `guess`
//! - the player starts the game; the server deals a noun and a hint
//! - the server closes the room with a normal close, which ends the session
//!
//! Useful for exercising UI code without a real game server.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback
//! ```

use std::time::Duration;

use async_trait::async_trait;
use party_game_client::{
    CloseCode, ConnectionStatus, Connector, PartyClient, PartyConfig, PartyError,
    PresentationEvent, RoomId, Transport, TransportEvent,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: A channel-backed transport
// ─────────────────────────────────────────────────────────────────────

/// Client half of one loopback socket.
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Server half of one loopback socket.
pub struct LoopbackServer {
    /// Frames the client sent.
    pub rx: mpsc::UnboundedReceiver<String>,
    /// Events delivered to the client.
    pub tx: mpsc::UnboundedSender<TransportEvent>,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), PartyError> {
        self.tx
            .send(message)
            .map_err(|e| PartyError::TransportSend(e.to_string()))
    }

    /// A server half dropped without a close behaves like a lost connection.
    async fn recv(&mut self) -> TransportEvent {
        self.rx
            .recv()
            .await
            .unwrap_or(TransportEvent::Closed(CloseCode::ABNORMAL))
    }

    async fn close(&mut self) -> Result<(), PartyError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: A connector that hands each new socket's server half to the fake server
// ─────────────────────────────────────────────────────────────────────

pub struct LoopbackConnector {
    accepted: mpsc::UnboundedSender<LoopbackServer>,
}

#[async_trait]
impl Connector for LoopbackConnector {
    type Transport = LoopbackTransport;

    async fn connect(&mut self, url: &str) -> Result<LoopbackTransport, PartyError> {
        tracing::info!("loopback connect to {url}");
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();

        self.accepted
            .send(LoopbackServer {
                rx: server_rx,
                tx: server_tx,
            })
            .map_err(|_| PartyError::TransportClosed)?;

        Ok(LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: A scripted game server
// ─────────────────────────────────────────────────────────────────────

fn frame(kind: &str, body: Value) -> TransportEvent {
    TransportEvent::Message(json!({"type": kind, "body": body}).to_string())
}

async fn serve(mut server: LoopbackServer) {
    while let Some(text) = server.rx.recv().await {
        tracing::info!("server received: {text}");
        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };

        let replies = match request.get("type").and_then(Value::as_str) {
            Some("message") => {
                let guess = request
                    .pointer("/msg/message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                vec![frame(
                    "guess",
                    json!({"text": guess, "isCorrect": guess == "owl", "noun": "owl"}),
                )]
            }
            Some("start") => vec![
                frame("start", Value::Null),
                frame("noun", json!({"text": "owl"})),
                frame("hint", json!({"noun": {"type": "animal"}, "text": "hoots at night"})),
                frame("action", json!({"body": "Rustacean joined", "player": {"name": "rustacean"}})),
                TransportEvent::Closed(CloseCode::NORMAL),
            ],
            _ => Vec::new(),
        };

        for reply in replies {
            if server.tx.send(reply).is_err() {
                return;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 4: Wire the client to the fake server
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(server) = accepted_rx.recv().await {
            tokio::spawn(serve(server));
        }
    });

    let config = PartyConfig::new("loopback", RoomId::new("demo-room")?)
        .with_start_delay(Duration::from_millis(500));
    let (mut client, mut event_rx) = PartyClient::start_with_events(
        LoopbackConnector {
            accepted: accepted_tx,
        },
        config,
    );

    client.send_message("a cat?")?;
    client.start_game()?;

    // ── Read events until the server closes the room ────────────────
    let mut events_seen = 0;
    while let Some(event) = event_rx.recv().await {
        events_seen += 1;
        match &event {
            PresentationEvent::ConnectionStatus(status) => {
                tracing::info!("status: {}", status.message());
                if *status == ConnectionStatus::Disconnected {
                    break;
                }
            }
            other => tracing::info!("event: {other:?}"),
        }
    }

    client.shutdown().await;
    tracing::info!("Done, saw {events_seen} event(s)");
    Ok(())
}
