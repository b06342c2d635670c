//! Presentation sink: everything the client core asks the UI to show.
//!
//! The core never renders anything itself. Status changes and handler effects
//! are reported through [`PresentationSink`], which a UI layer implements.
//! [`ChannelSink`] is the ready-made implementation that turns every call
//! into a [`PresentationEvent`] on a bounded channel, for UIs that prefer to
//! pull events from their own loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Connection status text reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// The socket opened.
    Connected,
    /// The transport reported a fault. A close usually follows.
    Error,
    /// The socket closed (a reconnect may still be scheduled).
    Disconnected,
    /// The environment cannot provide the transport. Terminal.
    Unsupported,
}

impl ConnectionStatus {
    /// User-facing status line.
    pub fn message(self) -> &'static str {
        match self {
            Self::Connected => "Connected to host.",
            Self::Error => "Uh oh, something went wrong.",
            Self::Disconnected => "Connection to host closed.",
            Self::Unsupported => "WebSockets are not supported in this environment.",
        }
    }
}

/// Screen corner a notification pops up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPosition {
    TopRight,
    BottomRight,
}

/// A transient, self-dismissing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub position: NotificationPosition,
    /// How long the notification stays visible.
    pub timeout: Duration,
}

/// One effect the client core asks of the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEvent {
    /// Replace the connection status line.
    ConnectionStatus(ConnectionStatus),
    /// Reveal the active hint: the noun's category and the hint text.
    ShowHint { noun_type: String, text: String },
    /// Prepend a guess to the running guess log. The log is unbounded.
    PrependGuess(String),
    Notify(Notification),
    /// Blocking-style modal alert.
    Alert(String),
    /// Persistently display the player's secret noun.
    SetCurrentNoun(String),
    /// Append a badge to the player badge list. Badges are never
    /// deduplicated or removed.
    AppendPlayerBadge(String),
    SpinnerVisible(bool),
    StartControlVisible(bool),
}

/// Receives presentation effects from the client core.
///
/// Only [`present`](PresentationSink::present) is required; the remaining
/// methods are shorthands used by the router and the session loop. Calls come
/// from the session task only, one at a time, in the order the underlying
/// events occurred.
pub trait PresentationSink: Send + 'static {
    fn present(&mut self, event: PresentationEvent);

    fn connection_status(&mut self, status: ConnectionStatus) {
        self.present(PresentationEvent::ConnectionStatus(status));
    }

    fn show_hint(&mut self, noun_type: &str, text: &str) {
        self.present(PresentationEvent::ShowHint {
            noun_type: noun_type.to_owned(),
            text: text.to_owned(),
        });
    }

    fn prepend_guess(&mut self, text: &str) {
        self.present(PresentationEvent::PrependGuess(text.to_owned()));
    }

    fn notify(&mut self, notification: Notification) {
        self.present(PresentationEvent::Notify(notification));
    }

    fn alert(&mut self, text: &str) {
        self.present(PresentationEvent::Alert(text.to_owned()));
    }

    fn set_current_noun(&mut self, text: &str) {
        self.present(PresentationEvent::SetCurrentNoun(text.to_owned()));
    }

    fn append_player_badge(&mut self, alias: &str) {
        self.present(PresentationEvent::AppendPlayerBadge(alias.to_owned()));
    }

    fn set_spinner_visible(&mut self, visible: bool) {
        self.present(PresentationEvent::SpinnerVisible(visible));
    }

    fn set_start_control_visible(&mut self, visible: bool) {
        self.present(PresentationEvent::StartControlVisible(visible));
    }
}

/// Records every call in order. Handy for tests and headless replays.
impl PresentationSink for Vec<PresentationEvent> {
    fn present(&mut self, event: PresentationEvent) {
        self.push(event);
    }
}

/// A [`PresentationSink`] that forwards events over a bounded channel.
///
/// When the receiver cannot keep up, events are dropped with a warning so the
/// session loop never blocks on the UI.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<PresentationEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver its events arrive on.
    ///
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PresentationEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl PresentationSink for ChannelSink {
    fn present(&mut self, event: PresentationEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("presentation channel full, dropping event: {dropped:?}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("presentation channel closed, receiver dropped");
            }
        }
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
    fn vec_sink_records_calls_in_order() {
        let mut sink: Vec<PresentationEvent> = Vec::new();
        sink.set_start_control_visible(false);
        sink.set_spinner_visible(true);
        sink.append_player_badge("AL");
        assert_eq!(
            sink,
            vec![
                PresentationEvent::StartControlVisible(false),
                PresentationEvent::SpinnerVisible(true),
                PresentationEvent::AppendPlayerBadge("AL".into()),
            ]
        );
    }

    #[tokio::test]
    async fn channel_sink_forwards_events() {
        let (mut sink, mut rx) = ChannelSink::new(8);
        sink.connection_status(ConnectionStatus::Connected);
        sink.alert("Your noun is \"owl\"");

        assert_eq!(
            rx.recv().await.unwrap(),
            PresentationEvent::ConnectionStatus(ConnectionStatus::Connected)
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            PresentationEvent::Alert("Your noun is \"owl\"".into())
        );
    }

    #[tokio::test]
    async fn channel_sink_drops_when_full() {
        let (mut sink, mut rx) = ChannelSink::new(0);
        sink.prepend_guess("first");
        sink.prepend_guess("second");

        assert_eq!(
            rx.recv().await.unwrap(),
            PresentationEvent::PrependGuess("first".into())
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (mut sink, rx) = ChannelSink::new(4);
        drop(rx);
        sink.set_spinner_visible(false);
    }

    #[test]
    fn status_messages_are_distinct() {
        let all = [
            ConnectionStatus::Connected,
            ConnectionStatus::Error,
            ConnectionStatus::Disconnected,
            ConnectionStatus::Unsupported,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a.message(), b.message());
            }
        }
    }
}
