//! Connection lifecycle: room addressing and the reconnect state machine.
//!
//! [`ConnectionMachine`] is a plain, synchronous state machine. It owns no
//! socket and no timers; it decides what should happen next and the session
//! loop in [`client`](crate::client) carries it out. Keeping the decisions
//! here makes every transition testable without a runtime.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──open──▶ Open ──close──▶ Closed
//!                               ▲                                  │
//!                               └──── abnormal close, budget left ─┘
//! ```
//!
//! `Closed` is terminal after a clean close, after the retry budget is spent,
//! or when the transport is unsupported.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{PartyError, Result};
use crate::sink::ConnectionStatus;
use crate::transport::CloseCode;

/// Default cap on automatic reconnect attempts per session.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default fixed delay before each reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

// ── Room addressing ─────────────────────────────────────────────────

/// The game room this session is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Use `id` verbatim as the room identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::InvalidRoom`] if `id` is empty or contains `/`.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.contains('/') {
            return Err(PartyError::InvalidRoom(id));
        }
        Ok(Self(id))
    }

    /// Derive the room from the final segment of a page path, e.g.
    /// `/game/blue-otter` → `blue-otter`.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::InvalidRoom`] if the final segment is empty
    /// (an empty path or one ending in `/`).
    pub fn from_path(path: &str) -> Result<Self> {
        match path.rsplit('/').next() {
            Some(segment) if !segment.is_empty() => Ok(Self(segment.to_owned())),
            _ => Err(PartyError::InvalidRoom(path.to_owned())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The room-scoped socket endpoint: `ws://<host>/ws/<room>`.
pub fn endpoint(host: &str, room: &RoomId) -> String {
    format!("ws://{host}/ws/{room}")
}

// ── State ───────────────────────────────────────────────────────────

/// Lifecycle state of the single logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Open = 2,
    Closed = 3,
}

impl ConnectionState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::Closed,
            _ => Self::Disconnected,
        }
    }
}

/// Reconnect attempts made since session start.
///
/// Never reset by a successful open: the budget applies to the whole
/// session, not to each outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounter {
    count: u32,
    cap: u32,
}

impl RetryCounter {
    pub fn new(cap: u32) -> Self {
        Self { count: 0, cap }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_exhausted(&self) -> bool {
        self.count >= self.cap
    }

    /// Spend one attempt, returning its 1-based number, or `None` once the
    /// cap is reached.
    pub fn try_increment(&mut self) -> Option<u32> {
        if self.is_exhausted() {
            return None;
        }
        self.count += 1;
        Some(self.count)
    }
}

/// How the session recovers from abnormal closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    /// Fixed; there is no backoff growth.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Why a closed connection will not be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// The peer closed with a non-abnormal code.
    CleanClose(CloseCode),
    /// An abnormal close arrived with no retry budget left.
    RetriesExhausted,
}

/// What the session loop must do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Schedule a connect after `delay`.
    Reconnect { attempt: u32, delay: Duration },
    /// Stay closed; the user has to reload to recover.
    Terminal(TerminalReason),
}

// ── Machine ─────────────────────────────────────────────────────────

/// The Connection Manager's decision logic.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    /// A socket handle exists (pending or open) and has not been cleared.
    socket_live: bool,
    unsupported: bool,
    retries: RetryCounter,
    delay: Duration,
}

impl ConnectionMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            socket_live: false,
            unsupported: false,
            retries: RetryCounter::new(policy.max_attempts),
            delay: policy.delay,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retries(&self) -> RetryCounter {
        self.retries
    }

    /// Whether a socket handle is currently held.
    pub fn has_socket(&self) -> bool {
        self.socket_live
    }

    /// Claim the socket slot for a new connection attempt.
    ///
    /// Returns `false` (a no-op) while a socket is pending or open, and
    /// forever after the transport was found unsupported.
    pub fn begin_connect(&mut self) -> bool {
        if self.unsupported {
            debug!("connect ignored: transport unsupported");
            return false;
        }
        if self.socket_live {
            debug!(state = ?self.state, "connect ignored: socket already live");
            return false;
        }
        self.socket_live = true;
        self.state = ConnectionState::Connecting;
        true
    }

    pub fn on_open(&mut self) -> ConnectionStatus {
        info!(retries = self.retries.count(), "connection open");
        self.state = ConnectionState::Open;
        ConnectionStatus::Connected
    }

    /// Errors only report; the close that follows drives the state.
    pub fn on_error(&mut self, reason: &str) -> ConnectionStatus {
        warn!(state = ?self.state, "transport error: {reason}");
        ConnectionStatus::Error
    }

    /// Clear the socket and decide whether to reconnect.
    pub fn on_close(&mut self, code: CloseCode) -> CloseOutcome {
        info!(%code, "connection closed");
        self.state = ConnectionState::Closed;
        self.socket_live = false;

        if !code.is_abnormal() {
            return CloseOutcome::Terminal(TerminalReason::CleanClose(code));
        }
        match self.retries.try_increment() {
            Some(attempt) => {
                debug!(attempt, delay = ?self.delay, "scheduling reconnect");
                CloseOutcome::Reconnect {
                    attempt,
                    delay: self.delay,
                }
            }
            None => {
                warn!(
                    attempts = self.retries.count(),
                    "reconnect budget exhausted; staying closed"
                );
                CloseOutcome::Terminal(TerminalReason::RetriesExhausted)
            }
        }
    }

    /// The environment cannot provide the transport. Permanent.
    pub fn on_unsupported(&mut self, reason: &str) -> ConnectionStatus {
        warn!("transport unsupported: {reason}");
        self.unsupported = true;
        self.socket_live = false;
        self.state = ConnectionState::Closed;
        ConnectionStatus::Unsupported
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

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

    #[test]
    fn room_from_last_path_segment() {
        assert_eq!(RoomId::from_path("/game/blue-otter").unwrap().as_str(), "blue-otter");
        assert_eq!(RoomId::from_path("lobby").unwrap().as_str(), "lobby");
    }

    #[test]
    fn room_rejects_empty_segment() {
        assert!(matches!(RoomId::from_path("/game/"), Err(PartyError::InvalidRoom(_))));
        assert!(matches!(RoomId::from_path(""), Err(PartyError::InvalidRoom(_))));
        assert!(RoomId::new("a/b").is_err());
    }

    #[test]
    fn endpoint_is_room_scoped() {
        let room = RoomId::new("abc").unwrap();
        assert_eq!(endpoint("localhost:8080", &room), "ws://localhost:8080/ws/abc");
    }

    #[test]
    fn initial_state_is_disconnected() {
        let machine = ConnectionMachine::default();
        assert_eq!(machine.state(), ConnectionState::Disconnected);
        assert!(!machine.has_socket());
        assert_eq!(machine.retries().count(), 0);
    }

    #[test]
    fn second_connect_while_pending_or_open_is_noop() {
        let mut machine = ConnectionMachine::default();
        assert!(machine.begin_connect());
        assert!(!machine.begin_connect());
        assert_eq!(machine.state(), ConnectionState::Connecting);

        machine.on_open();
        assert!(!machine.begin_connect());
        assert_eq!(machine.state(), ConnectionState::Open);
    }

    #[test]
    fn error_does_not_change_state() {
        let mut machine = ConnectionMachine::default();
        machine.begin_connect();
        machine.on_open();
        assert_eq!(machine.on_error("reset"), ConnectionStatus::Error);
        assert_eq!(machine.state(), ConnectionState::Open);
        assert!(machine.has_socket());
    }

    #[test]
    fn six_abnormal_closes_schedule_exactly_five_reconnects() {
        let mut machine = ConnectionMachine::default();
        let mut scheduled = Vec::new();

        for _ in 0..6 {
            assert!(machine.begin_connect());
            if let CloseOutcome::Reconnect { attempt, delay } = machine.on_close(CloseCode::ABNORMAL)
            {
                assert_eq!(delay, Duration::from_secs(2));
                scheduled.push(attempt);
            }
        }

        assert_eq!(scheduled, vec![1, 2, 3, 4, 5]);
        assert_eq!(machine.retries().count(), 5);
        assert!(machine.retries().is_exhausted());
        assert_eq!(
            machine.on_close(CloseCode::ABNORMAL),
            CloseOutcome::Terminal(TerminalReason::RetriesExhausted)
        );
    }

    #[test]
    fn successful_open_does_not_reset_budget() {
        let mut machine = ConnectionMachine::default();
        for _ in 0..5 {
            machine.begin_connect();
            machine.on_open();
            assert!(matches!(
                machine.on_close(CloseCode::ABNORMAL),
                CloseOutcome::Reconnect { .. }
            ));
        }
        machine.begin_connect();
        machine.on_open();
        assert_eq!(
            machine.on_close(CloseCode::ABNORMAL),
            CloseOutcome::Terminal(TerminalReason::RetriesExhausted)
        );
    }

    #[test]
    fn clean_close_never_reconnects() {
        for retries_spent in 0..=5 {
            let mut machine = ConnectionMachine::default();
            for _ in 0..retries_spent {
                machine.begin_connect();
                machine.on_close(CloseCode::ABNORMAL);
            }
            machine.begin_connect();
            for code in [CloseCode::NORMAL, CloseCode::GOING_AWAY, CloseCode(4000)] {
                assert_eq!(
                    machine.on_close(code),
                    CloseOutcome::Terminal(TerminalReason::CleanClose(code))
                );
            }
            assert_eq!(machine.retries().count(), retries_spent);
        }
    }

    #[test]
    fn close_clears_socket_handle() {
        let mut machine = ConnectionMachine::default();
        machine.begin_connect();
        machine.on_close(CloseCode::NORMAL);
        assert_eq!(machine.state(), ConnectionState::Closed);
        assert!(!machine.has_socket());
        // A manual connect after a terminal close is allowed.
        assert!(machine.begin_connect());
    }

    #[test]
    fn unsupported_is_permanent() {
        let mut machine = ConnectionMachine::default();
        machine.begin_connect();
        assert_eq!(machine.on_unsupported("no sockets"), ConnectionStatus::Unsupported);
        assert_eq!(machine.state(), ConnectionState::Closed);
        assert!(!machine.begin_connect());
        assert_eq!(machine.retries().count(), 0);
    }

    #[test]
    fn custom_policy_is_honoured() {
        let mut machine = ConnectionMachine::new(ReconnectPolicy {
            max_attempts: 1,
            delay: Duration::from_millis(10),
        });
        machine.begin_connect();
        assert_eq!(
            machine.on_close(CloseCode::ABNORMAL),
            CloseOutcome::Reconnect {
                attempt: 1,
                delay: Duration::from_millis(10)
            }
        );
        machine.begin_connect();
        assert!(matches!(
            machine.on_close(CloseCode::ABNORMAL),
            CloseOutcome::Terminal(_)
        ));
    }

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closed,
        ] {
            assert_eq!(ConnectionState::from_u8(state as u8), state);
        }
    }
}
