//! # Terminal Client Example
//!
//! Plays a party-game room from the terminal:
//!
//! 1. Connect to the room's WebSocket endpoint
//! 2. Log hints, guesses, notifications and status changes as they arrive
//! 3. Send every line typed on stdin as a chat message
//! 4. `/start` starts the game, `/quit` (or Ctrl+C) leaves
//!
//! ## Running
//!
//! ```sh
//! # Start the game server on localhost:8080, then:
//! cargo run --example terminal_client
//!
//! # Override the host and the page path the room is taken from:
//! PARTY_HOST=my-server:8080 PARTY_PATH=/game/blue-otter cargo run --example terminal_client
//! ```

use party_game_client::{
    ConnectionStatus, PartyClient, PartyConfig, PresentationEvent, PresentationSink, RoomId,
    WebSocketConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Default host when `PARTY_HOST` is not set.
const DEFAULT_HOST: &str = "localhost:8080";

/// Default page path when `PARTY_PATH` is not set.
const DEFAULT_PATH: &str = "/game/lobby";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for connection-level detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let host = std::env::var("PARTY_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let path = std::env::var("PARTY_PATH").unwrap_or_else(|_| DEFAULT_PATH.to_string());
    let room = RoomId::from_path(&path)?;

    let config = PartyConfig::new(host, room);
    tracing::info!("Joining {}", config.endpoint());

    let mut client = PartyClient::start(WebSocketConnector::new(), TerminalSink, config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // ── Input loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim() == "/quit" => break,
                    Some(line) if line.trim() == "/start" => client.start_game()?,
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => client.send_message(line)?,
                    None => break,
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, leaving room");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}

/// Logs every presentation effect under a per-kind target.
struct TerminalSink;

impl PresentationSink for TerminalSink {
    fn present(&mut self, event: PresentationEvent) {
        match event {
            PresentationEvent::ConnectionStatus(ConnectionStatus::Error) => {
                tracing::warn!("{}", ConnectionStatus::Error.message());
            }
            PresentationEvent::ConnectionStatus(status) => {
                tracing::info!(target: "status", "{}", status.message());
            }
            PresentationEvent::ShowHint { noun_type, text } => {
                tracing::info!(target: "hint", "({noun_type}) {text}");
            }
            PresentationEvent::PrependGuess(text) => tracing::info!(target: "guess", "{text}"),
            PresentationEvent::Notify(notification) => {
                tracing::info!(target: "notify", "{}", notification.message);
            }
            PresentationEvent::Alert(text) => tracing::warn!(target: "alert", "{text}"),
            PresentationEvent::SetCurrentNoun(noun) => tracing::info!(target: "noun", "{noun}"),
            PresentationEvent::AppendPlayerBadge(alias) => {
                tracing::info!(target: "player", "{alias}");
            }
            PresentationEvent::SpinnerVisible(true) => {
                tracing::info!(target: "status", "waiting for the game");
            }
            PresentationEvent::SpinnerVisible(false) | PresentationEvent::StartControlVisible(_) => {}
        }
    }
}
