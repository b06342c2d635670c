#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for party-game client integration tests.
//!
//! Provides a scripted [`MockConnector`], the [`MockTransport`] it hands out,
//! a [`RecordingSink`], a tracing initializer, and helpers that build server
//! envelope JSON.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use party_game_client::{
    CloseCode, Connector, PartyError, PresentationEvent, PresentationSink, Transport,
    TransportEvent,
};
use serde_json::json;
use tokio::sync::mpsc;

// ── MockConnector ───────────────────────────────────────────────────

/// One scripted connection attempt.
pub enum Attempt {
    /// Open a socket that yields these events, then stays silent.
    Open(Vec<TransportEvent>),
    /// Open a socket driven live through a [`ServerHandle`].
    Live(mpsc::UnboundedReceiver<TransportEvent>),
    /// Fail with an I/O error (retry-eligible).
    Refused,
    /// Fail with [`PartyError::Unsupported`].
    Unsupported,
}

/// Inspection handles shared between a [`MockConnector`] and the test.
#[derive(Clone, Default)]
pub struct Probe {
    pub connects: Arc<AtomicUsize>,
    pub urls: Arc<StdMutex<Vec<String>>>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closes: Arc<AtomicUsize>,
}

impl Probe {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Sent frames parsed as JSON.
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }
}

/// Hands out one [`MockTransport`] per scripted attempt. Once the script is
/// exhausted every further attempt is refused.
pub struct MockConnector {
    attempts: VecDeque<Attempt>,
    probe: Probe,
}

impl MockConnector {
    pub fn new(attempts: Vec<Attempt>) -> (Self, Probe) {
        let probe = Probe::default();
        let connector = Self {
            attempts: VecDeque::from(attempts),
            probe: probe.clone(),
        };
        (connector, probe)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&mut self, url: &str) -> Result<MockTransport, PartyError> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        self.probe.urls.lock().unwrap().push(url.to_owned());

        let (script, live) = match self.attempts.pop_front() {
            Some(Attempt::Open(events)) => (events, None),
            Some(Attempt::Live(rx)) => (Vec::new(), Some(rx)),
            Some(Attempt::Unsupported) => {
                return Err(PartyError::Unsupported("mock environment".into()))
            }
            Some(Attempt::Refused) | None => {
                return Err(PartyError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                )))
            }
        };

        Ok(MockTransport {
            script: VecDeque::from(script),
            live,
            sent: Arc::clone(&self.probe.sent),
            closes: Arc::clone(&self.probe.closes),
        })
    }
}

// ── MockTransport ───────────────────────────────────────────────────

/// Yields scripted events first, then live ones, then blocks forever.
pub struct MockTransport {
    script: VecDeque<TransportEvent>,
    live: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    sent: Arc<StdMutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), PartyError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        if let Some(event) = self.script.pop_front() {
            return event;
        }
        if let Some(rx) = self.live.as_mut() {
            if let Some(event) = rx.recv().await {
                return event;
            }
        }
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), PartyError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Server side of an [`Attempt::Live`] socket.
pub struct ServerHandle {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl ServerHandle {
    pub fn pair() -> (Self, Attempt) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, Attempt::Live(rx))
    }

    pub fn push(&self, text: impl Into<String>) {
        self.tx.send(TransportEvent::Message(text.into())).unwrap();
    }

    pub fn error(&self, reason: &str) {
        self.tx.send(TransportEvent::Error(reason.to_owned())).unwrap();
    }

    pub fn close(&self, code: CloseCode) {
        self.tx.send(TransportEvent::Closed(code)).unwrap();
    }
}

// ── RecordingSink ───────────────────────────────────────────────────

/// A [`PresentationSink`] whose recorded events stay readable from the test.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<StdMutex<Vec<PresentationEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PresentationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<PresentationEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl PresentationSink for RecordingSink {
    fn present(&mut self, event: PresentationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ── Tracing ─────────────────────────────────────────────────────────

/// Route client logs to the test harness. Set `RUST_LOG=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// ── Server envelope helpers ─────────────────────────────────────────

pub fn message(text: String) -> TransportEvent {
    TransportEvent::Message(text)
}

pub fn hint_json(noun_type: &str, text: &str) -> String {
    json!({"type": "hint", "body": {"noun": {"type": noun_type}, "text": text}}).to_string()
}

pub fn guess_json(text: &str, is_correct: bool, noun: &str) -> String {
    json!({"type": "guess", "body": {"text": text, "isCorrect": is_correct, "noun": noun}})
        .to_string()
}

pub fn noun_json(text: &str) -> String {
    json!({"type": "noun", "body": {"text": text}}).to_string()
}

pub fn action_json(body: &str, player: &str) -> String {
    json!({"type": "action", "body": {"body": body, "player": {"name": player}}}).to_string()
}

pub fn start_json() -> String {
    json!({"type": "start", "body": null}).to_string()
}
