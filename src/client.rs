//! Async client for a party-game session.
//!
//! [`PartyClient`] is a thin handle that talks to a background session task
//! over an unbounded MPSC channel. The session task is the Connection Manager:
//! it is the only owner of the socket, drives the
//! [`ConnectionMachine`](crate::connection::ConnectionMachine), decodes
//! inbound frames, routes them, and runs both timers (reconnect and paced
//! start). Everything happens on that one task, so no state is shared beyond
//! two atomics exposing a status snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! let room = RoomId::from_path("/game/blue-otter")?;
//! let config = PartyConfig::new("localhost:8080", room);
//! let (client, mut events) = PartyClient::start_with_events(WebSocketConnector::new(), config);
//!
//! client.send_message("is it alive?")?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         PresentationEvent::PrependGuess(text) => { /* … */ }
//!         PresentationEvent::ConnectionStatus(status) => println!("{}", status.message()),
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::action::{Intent, OutboundAction, DEFAULT_START_DELAY};
use crate::connection::{
    endpoint, CloseOutcome, ConnectionMachine, ConnectionState, ReconnectPolicy, RoomId,
};
use crate::error::{PartyError, Result};
use crate::protocol::decode;
use crate::router::Router;
use crate::sink::{ChannelSink, ConnectionStatus, PresentationEvent, PresentationSink};
use crate::transport::{CloseCode, Connector, Transport, TransportEvent};

/// Default capacity of the bounded presentation event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`PartyClient`] session.
///
/// # Example
///
/// ```
/// use party_game_client::client::PartyConfig;
/// use party_game_client::connection::RoomId;
/// use std::time::Duration;
///
/// let room = RoomId::from_path("/game/blue-otter").unwrap();
/// let config = PartyConfig::new("localhost:8080", room)
///     .with_max_reconnect_attempts(3)
///     .with_start_delay(Duration::from_millis(500));
/// assert_eq!(config.endpoint(), "ws://localhost:8080/ws/blue-otter");
/// ```
#[derive(Debug, Clone)]
pub struct PartyConfig {
    /// Server host (and optional port) the page was served from.
    pub host: String,
    /// Room the session is scoped to. Fixed for the session's lifetime.
    pub room: RoomId,
    /// Bounded automatic reconnection. Defaults to **5** attempts, **2 s** apart.
    pub reconnect: ReconnectPolicy,
    /// Pacing delay before a start request is transmitted. Defaults to **2 s**.
    pub start_delay: Duration,
    /// Capacity of the presentation channel created by
    /// [`PartyClient::start_with_events`].
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`PartyClient::shutdown`] waits for the session task before
    /// aborting it. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl PartyConfig {
    pub fn new(host: impl Into<String>, room: RoomId) -> Self {
        Self {
            host: host.into(),
            room,
            reconnect: ReconnectPolicy::default(),
            start_delay: DEFAULT_START_DELAY,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// The room-scoped socket URL.
    pub fn endpoint(&self) -> String {
        endpoint(&self.host, &self.room)
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect.delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// A zero timeout aborts the session task immediately.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// Status snapshot published by the session task.
struct SharedState {
    connection: AtomicU8,
    reconnect_attempts: AtomicU32,
    running: AtomicBool,
}

impl SharedState {
    fn new() -> Self {
        Self {
            connection: AtomicU8::new(ConnectionState::Disconnected as u8),
            reconnect_attempts: AtomicU32::new(0),
            running: AtomicBool::new(true),
        }
    }
}

/// Requests from the handle to the session task.
#[derive(Debug)]
enum Command {
    Connect,
    Intent(Intent),
}

/// Timer expiries delivered back to the session task.
#[derive(Debug)]
enum Timer {
    Reconnect { attempt: u32 },
    Transmit(String),
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to a running party-game session.
///
/// Created via [`PartyClient::start`] (or one of its variants), which spawns
/// the session task and immediately issues the first connect. Public methods
/// queue a command and return without waiting for the network.
pub struct PartyClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state: Arc<SharedState>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl PartyClient {
    /// Start a session with the standard router, reporting to `sink`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<C, S>(connector: C, sink: S, config: PartyConfig) -> Self
    where
        C: Connector,
        S: PresentationSink,
    {
        Self::start_with_router(connector, sink, Router::default(), config)
    }

    /// Start a session whose presentation effects arrive on a channel.
    #[must_use = "the event receiver must be used to receive presentation events"]
    pub fn start_with_events<C: Connector>(
        connector: C,
        config: PartyConfig,
    ) -> (Self, mpsc::Receiver<PresentationEvent>) {
        let (sink, events) = ChannelSink::new(config.event_channel_capacity);
        (Self::start(connector, sink, config), events)
    }

    /// Start a session with a custom [`Router`].
    pub fn start_with_router<C, S>(connector: C, sink: S, router: Router, config: PartyConfig) -> Self
    where
        C: Connector,
        S: PresentationSink,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel::<Timer>();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = Arc::new(SharedState::new());
        let session = Session {
            connector,
            transport: None,
            sink,
            router,
            machine: ConnectionMachine::new(config.reconnect),
            url: config.endpoint(),
            start_delay: config.start_delay,
            timer_tx,
            shared: Arc::clone(&state),
        };

        // Connect on startup, ahead of anything the caller queues.
        let _ = cmd_tx.send(Command::Connect);

        let task = tokio::spawn(session_loop(session, cmd_rx, timer_rx, shutdown_rx));

        Self {
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Ask for a connection. A no-op while a socket is pending or open.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::NotConnected`] if the session has shut down.
    pub fn connect(&self) -> Result<()> {
        self.send(Command::Connect)
    }

    /// Hand a user intent to the Outbound Action Builder.
    ///
    /// Sending is fire-and-forget: if no socket is open when the envelope is
    /// due, it is logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::NotConnected`] if the session has shut down.
    pub fn submit(&self, intent: Intent) -> Result<()> {
        self.send(Command::Intent(intent))
    }

    /// Start the game: optimistic UI now, `start` envelope after the pacing delay.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::NotConnected`] if the session has shut down.
    pub fn start_game(&self) -> Result<()> {
        self.submit(Intent::StartGame)
    }

    /// Send a chat line.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::NotConnected`] if the session has shut down.
    pub fn send_message(&self, message: impl Into<String>) -> Result<()> {
        self.submit(Intent::SendMessage(message.into()))
    }

    /// Shut down the session, closing the socket and stopping the background task.
    ///
    /// Pending timers are not cancelled; they fire into a closed session and
    /// do nothing.
    pub async fn shutdown(&mut self) {
        debug!("PartyClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session task terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session task did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session task aborted: {join_err}");
                    }
                }
            }
        }

        self.state.running.store(false, Ordering::Release);
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Last connection state published by the session task.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.connection.load(Ordering::Acquire))
    }

    /// Reconnect attempts spent so far this session.
    pub fn reconnect_attempts(&self) -> u32 {
        self.state.reconnect_attempts.load(Ordering::Acquire)
    }

    /// Returns `true` until the session task has exited.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    fn send(&self, cmd: Command) -> Result<()> {
        if !self.is_running() {
            return Err(PartyError::NotConnected);
        }
        self.cmd_tx.send(cmd).map_err(|_| PartyError::NotConnected)
    }
}

impl std::fmt::Debug for PartyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartyClient")
            .field("state", &self.state())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for PartyClient {
    fn drop(&mut self) {
        // No executor is available here to drive a graceful close.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session task ────────────────────────────────────────────────────

/// The Connection Manager. Owns the socket exclusively.
struct Session<C: Connector, S> {
    connector: C,
    transport: Option<C::Transport>,
    sink: S,
    router: Router,
    machine: ConnectionMachine,
    url: String,
    start_delay: Duration,
    timer_tx: mpsc::UnboundedSender<Timer>,
    shared: Arc<SharedState>,
}

impl<C: Connector, S: PresentationSink> Session<C, S> {
    async fn connect(&mut self) {
        if !self.machine.begin_connect() {
            return;
        }
        self.publish();
        debug!(url = %self.url, "opening connection");

        match self.connector.connect(&self.url).await {
            Ok(transport) => {
                self.transport = Some(transport);
                let status = self.machine.on_open();
                self.sink.connection_status(status);
            }
            Err(PartyError::Unsupported(reason)) => {
                let status = self.machine.on_unsupported(&reason);
                self.sink.connection_status(status);
            }
            // A refused connection surfaces like a browser socket does:
            // an error, then an abnormal close.
            Err(e) => {
                let status = self.machine.on_error(&e.to_string());
                self.sink.connection_status(status);
                self.on_close(CloseCode::ABNORMAL);
            }
        }
        self.publish();
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(text) => match decode(&text) {
                Ok(envelope) => {
                    self.router.route(&envelope, &mut self.sink);
                }
                Err(e) => {
                    warn!("dropping inbound frame: {e}");
                }
            },
            TransportEvent::Error(reason) => {
                let status = self.machine.on_error(&reason);
                self.sink.connection_status(status);
            }
            TransportEvent::Closed(code) => {
                self.transport = None;
                self.on_close(code);
            }
        }
    }

    fn on_close(&mut self, code: CloseCode) {
        let outcome = self.machine.on_close(code);
        self.sink.connection_status(ConnectionStatus::Disconnected);
        if let CloseOutcome::Reconnect { attempt, delay } = outcome {
            self.schedule(delay, Timer::Reconnect { attempt });
        }
        self.publish();
    }

    async fn submit(&mut self, intent: Intent) {
        let action = match OutboundAction::build(intent, self.start_delay) {
            Ok(action) => action,
            Err(e) => {
                error!("failed to build outbound envelope: {e}");
                return;
            }
        };

        if action.optimistic_start {
            self.sink.set_start_control_visible(false);
            self.sink.set_spinner_visible(true);
        }

        if action.delay.is_zero() {
            self.transmit(action.wire).await;
        } else {
            self.schedule(action.delay, Timer::Transmit(action.wire));
        }
    }

    async fn transmit(&mut self, wire: String) {
        let Some(transport) = self.transport.as_mut() else {
            warn!(state = ?self.machine.state(), "no open connection, dropping outbound envelope");
            return;
        };
        if let Err(e) = transport.send(wire).await {
            // The receive side reports the close that follows.
            let status = self.machine.on_error(&e.to_string());
            self.sink.connection_status(status);
        }
    }

    /// Fire `timer` back into the session after `delay`. Never cancelled.
    fn schedule(&self, delay: Duration, timer: Timer) {
        let tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(timer).is_err() {
                debug!("timer fired after session ended");
            }
        });
    }

    async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("error closing transport: {e}");
            }
            self.machine.on_close(CloseCode::NORMAL);
            self.sink.connection_status(ConnectionStatus::Disconnected);
            self.publish();
        }
    }

    fn publish(&self) {
        self.shared
            .connection
            .store(self.machine.state() as u8, Ordering::Release);
        self.shared
            .reconnect_attempts
            .store(self.machine.retries().count(), Ordering::Release);
    }
}

/// Wait for the next event from the socket, or forever when there is none.
async fn next_event<T: Transport>(transport: &mut Option<T>) -> TransportEvent {
    match transport {
        Some(transport) => transport.recv().await,
        None => std::future::pending().await,
    }
}

/// Background session loop.
///
/// Exits when the handle is dropped (command channel closed) or
/// [`PartyClient::shutdown`] is called. Socket closes never end the loop:
/// a manual [`PartyClient::connect`] can still revive the session.
async fn session_loop<C: Connector, S: PresentationSink>(
    mut session: Session<C, S>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut timer_rx: mpsc::UnboundedReceiver<Timer>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    debug!("session loop started");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Connect) => session.connect().await,
                    Some(Command::Intent(intent)) => session.submit(intent).await,
                    None => {
                        debug!("command channel closed, shutting down session loop");
                        session.close().await;
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                session.close().await;
                break;
            }

            Some(timer) = timer_rx.recv() => {
                match timer {
                    Timer::Reconnect { attempt } => {
                        debug!(attempt, "reconnect timer fired");
                        session.connect().await;
                    }
                    Timer::Transmit(wire) => session.transmit(wire).await,
                }
            }

            event = next_event(&mut session.transport) => {
                session.on_transport_event(event);
            }
        }
    }

    session.shared.running.store(false, Ordering::Release);
    debug!("session loop exited");
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
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
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    // ── Mock connector ──────────────────────────────────────────────

    /// One scripted connection attempt.
    enum Attempt {
        Open(Vec<TransportEvent>),
        Refused,
        Unsupported,
    }

    struct MockTransport {
        incoming: VecDeque<TransportEvent>,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), PartyError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> TransportEvent {
            match self.incoming.pop_front() {
                Some(event) => event,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> std::result::Result<(), PartyError> {
            Ok(())
        }
    }

    struct MockConnector {
        attempts: VecDeque<Attempt>,
        connects: Arc<AtomicUsize>,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Transport = MockTransport;

        async fn connect(&mut self, _url: &str) -> std::result::Result<MockTransport, PartyError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            match self.attempts.pop_front() {
                Some(Attempt::Open(events)) => Ok(MockTransport {
                    incoming: events.into(),
                    sent: Arc::clone(&self.sent),
                }),
                Some(Attempt::Unsupported) => Err(PartyError::Unsupported("no sockets".into())),
                Some(Attempt::Refused) | None => Err(PartyError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                ))),
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn start(
        attempts: Vec<Attempt>,
    ) -> (
        PartyClient,
        mpsc::Receiver<PresentationEvent>,
        Arc<AtomicUsize>,
        Arc<StdMutex<Vec<String>>>,
    ) {
        let connects = Arc::new(AtomicUsize::new(0));
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let connector = MockConnector {
            attempts: attempts.into(),
            connects: Arc::clone(&connects),
            sent: Arc::clone(&sent),
        };
        let config = PartyConfig::new("localhost:8080", RoomId::new("test-room").unwrap());
        let (client, events) = PartyClient::start_with_events(connector, config);
        (client, events, connects, sent)
    }

    fn drain(events: &mut mpsc::Receiver<PresentationEvent>) -> Vec<PresentationEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    fn status(s: ConnectionStatus) -> PresentationEvent {
        PresentationEvent::ConnectionStatus(s)
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn connects_on_start_and_reports_connected() {
        let (mut client, mut events, connects, _sent) = start(vec![Attempt::Open(vec![])]);

        assert_eq!(events.recv().await.unwrap(), status(ConnectionStatus::Connected));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ConnectionState::Open);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_connect_keeps_one_socket() {
        let (mut client, mut events, connects, _sent) = start(vec![
            Attempt::Open(vec![]),
            Attempt::Open(vec![]),
        ]);
        client.connect().unwrap();
        client.connect().unwrap();

        assert_eq!(events.recv().await.unwrap(), status(ConnectionStatus::Connected));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn six_abnormal_closes_spend_five_retries() {
        let attempts = (0..6)
            .map(|_| Attempt::Open(vec![TransportEvent::Closed(CloseCode::ABNORMAL)]))
            .collect();
        let (mut client, mut events, connects, _sent) = start(attempts);

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(connects.load(Ordering::SeqCst), 6);
        assert_eq!(client.reconnect_attempts(), 5);
        assert_eq!(client.state(), ConnectionState::Closed);

        let seen = drain(&mut events);
        let opened = seen.iter().filter(|e| **e == status(ConnectionStatus::Connected)).count();
        let closed = seen
            .iter()
            .filter(|e| **e == status(ConnectionStatus::Disconnected))
            .count();
        assert_eq!((opened, closed), (6, 6));

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_waits_fixed_delay() {
        let (mut client, _events, connects, _sent) = start(vec![
            Attempt::Open(vec![TransportEvent::Closed(CloseCode::ABNORMAL)]),
            Attempt::Open(vec![]),
        ]);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(client.state(), ConnectionState::Open);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn clean_close_is_terminal() {
        let (mut client, mut events, connects, _sent) =
            start(vec![Attempt::Open(vec![TransportEvent::Closed(CloseCode::NORMAL)])]);

        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(client.reconnect_attempts(), 0);
        assert_eq!(
            drain(&mut events),
            vec![
                status(ConnectionStatus::Connected),
                status(ConnectionStatus::Disconnected)
            ]
        );

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn error_then_abnormal_close_reports_both() {
        let (mut client, mut events, _connects, _sent) = start(vec![
            Attempt::Open(vec![
                TransportEvent::Error("reset".into()),
                TransportEvent::Closed(CloseCode::ABNORMAL),
            ]),
            Attempt::Open(vec![]),
        ]);

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(
            drain(&mut events),
            vec![
                status(ConnectionStatus::Connected),
                status(ConnectionStatus::Error),
                status(ConnectionStatus::Disconnected),
                status(ConnectionStatus::Connected),
            ]
        );
        assert_eq!(client.reconnect_attempts(), 1);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refused_connect_is_retried() {
        let (mut client, mut events, connects, _sent) =
            start(vec![Attempt::Refused, Attempt::Open(vec![])]);

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(
            drain(&mut events),
            vec![
                status(ConnectionStatus::Error),
                status(ConnectionStatus::Disconnected),
                status(ConnectionStatus::Connected),
            ]
        );

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_transport_is_reported_once_and_not_retried() {
        let (mut client, mut events, connects, _sent) = start(vec![Attempt::Unsupported]);
        client.connect().unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(drain(&mut events), vec![status(ConnectionStatus::Unsupported)]);
        assert_eq!(client.state(), ConnectionState::Closed);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_game_is_optimistic_then_paced() {
        let (mut client, mut events, _connects, sent) = start(vec![Attempt::Open(vec![])]);
        assert_eq!(events.recv().await.unwrap(), status(ConnectionStatus::Connected));

        client.start_game().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            drain(&mut events),
            vec![
                PresentationEvent::StartControlVisible(false),
                PresentationEvent::SpinnerVisible(true),
            ]
        );
        assert!(sent.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let messages = sent.lock().unwrap().clone();
        assert_eq!(messages.len(), 1);
        let wire: serde_json::Value = serde_json::from_str(&messages[0]).unwrap();
        assert_eq!(wire, serde_json::json!({"type": "start", "msg": {}}));

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn send_message_goes_out_immediately() {
        let (mut client, mut events, _connects, sent) = start(vec![Attempt::Open(vec![])]);
        assert_eq!(events.recv().await.unwrap(), status(ConnectionStatus::Connected));

        client.send_message("a tall building").unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let messages = sent.lock().unwrap().clone();
        assert_eq!(
            messages,
            vec![r#"{"type":"message","msg":{"message":"a tall building"}}"#.to_string()]
        );

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn send_without_socket_is_dropped_silently() {
        let (mut client, _events, _connects, sent) = start(vec![Attempt::Unsupported]);

        client.send_message("anyone there?").unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(sent.lock().unwrap().is_empty());
        assert!(client.is_running());

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frame_does_not_stop_dispatch() {
        let (mut client, mut events, _connects, _sent) = start(vec![Attempt::Open(vec![
            TransportEvent::Message("{not json".into()),
            TransportEvent::Message(r#"{"type":"noun","body":{"text":"owl"}}"#.into()),
        ])]);

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            drain(&mut events),
            vec![
                status(ConnectionStatus::Connected),
                PresentationEvent::Alert("Your noun is \"owl\"".into()),
                PresentationEvent::SetCurrentNoun("owl".into()),
            ]
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn not_connected_error_after_shutdown() {
        let (mut client, _events, _connects, _sent) = start(vec![Attempt::Open(vec![])]);
        client.shutdown().await;

        assert!(!client.is_running());
        assert!(matches!(client.send_message("late"), Err(PartyError::NotConnected)));
        assert!(matches!(client.connect(), Err(PartyError::NotConnected)));
    }

    #[tokio::test]
    async fn shutdown_reports_disconnected() {
        let (mut client, mut events, _connects, _sent) = start(vec![Attempt::Open(vec![])]);
        assert_eq!(events.recv().await.unwrap(), status(ConnectionStatus::Connected));

        client.shutdown().await;

        assert_eq!(events.recv().await.unwrap(), status(ConnectionStatus::Disconnected));
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let (mut client, _events, _connects, _sent) = start(vec![Attempt::Open(vec![])]);
        client.shutdown().await;
        client.shutdown().await;
    }

    #[tokio::test]
    async fn config_defaults() {
        let config = PartyConfig::new("example.com", RoomId::new("r1").unwrap());
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.delay, Duration::from_secs(2));
        assert_eq!(config.start_delay, Duration::from_secs(2));
        assert_eq!(config.event_channel_capacity, DEFAULT_EVENT_CHANNEL_CAPACITY);
        assert_eq!(config.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);
        assert_eq!(config.endpoint(), "ws://example.com/ws/r1");
    }

    #[tokio::test]
    async fn event_channel_capacity_is_clamped_to_one() {
        let config = PartyConfig::new("example.com", RoomId::new("r1").unwrap())
            .with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let (mut client, _events, _connects, _sent) = start(vec![Attempt::Open(vec![])]);
        let debug = format!("{client:?}");
        assert!(debug.contains("PartyClient"));
        client.shutdown().await;
    }
}
