//! Message Router: dispatches inbound envelopes to handlers by type tag.
//!
//! [`Router`] is an open dispatch table. [`Router::default`] knows the five
//! tags the game server sends today; [`Router::register`] adds (or replaces)
//! handlers for anything else. Envelopes with no registered handler fall
//! through to a log-only default arm.
//!
//! Handlers only produce presentation effects. They never see the connection.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::{ActionBody, EnvelopeKind, GuessBody, HintBody, InboundEnvelope, NounBody};
use crate::sink::{Notification, NotificationPosition, PresentationSink};

/// How long the "correct answer" notification stays up.
pub const CORRECT_GUESS_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

/// How long an action notification stays up.
pub const ACTION_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(1);

/// Handles one envelope type.
///
/// Any `Fn(&InboundEnvelope, &mut dyn PresentationSink) -> Result<()>` closure
/// is a handler.
pub trait Handler: Send + 'static {
    /// # Errors
    ///
    /// Return an error when the envelope body does not have the shape this
    /// handler expects. The router logs it and moves on.
    fn handle(&self, envelope: &InboundEnvelope, sink: &mut dyn PresentationSink) -> Result<()>;
}

impl<F> Handler for F
where
    F: Fn(&InboundEnvelope, &mut dyn PresentationSink) -> Result<()> + Send + 'static,
{
    fn handle(&self, envelope: &InboundEnvelope, sink: &mut dyn PresentationSink) -> Result<()> {
        self(envelope, sink)
    }
}

/// Result of routing one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Exactly one handler ran to completion.
    Handled(EnvelopeKind),
    /// No handler is registered for this tag; only a log entry was written.
    Unhandled(String),
    /// The handler refused the body; it was logged and dropped.
    Rejected(String),
}

/// Tag-keyed dispatch table.
pub struct Router {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl Router {
    /// A router with no handlers; every envelope takes the default arm.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `kind`, replacing any previous one.
    #[must_use]
    pub fn register(mut self, kind: impl Into<String>, handler: impl Handler) -> Self {
        self.handlers.insert(kind.into(), Box::new(handler));
        self
    }

    pub fn handles(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Dispatch `envelope` to the handler for its tag.
    pub fn route(
        &self,
        envelope: &InboundEnvelope,
        sink: &mut dyn PresentationSink,
    ) -> RouteOutcome {
        let tag = envelope.tag();
        let Some(handler) = self.handlers.get(tag) else {
            warn!(tag, "no handler for envelope type, ignoring");
            return RouteOutcome::Unhandled(tag.to_owned());
        };

        debug!(tag, "routing envelope");
        match handler.handle(envelope, sink) {
            Ok(()) => RouteOutcome::Handled(envelope.kind()),
            Err(e) => {
                warn!(tag, "dropping envelope: {e}");
                RouteOutcome::Rejected(tag.to_owned())
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::empty()
            .register(EnvelopeKind::Hint.as_str(), on_hint)
            .register(EnvelopeKind::Guess.as_str(), on_guess)
            .register(EnvelopeKind::Noun.as_str(), on_noun)
            .register(EnvelopeKind::Action.as_str(), on_action)
            .register(EnvelopeKind::Start.as_str(), on_start)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("Router").field("handlers", &tags).finish()
    }
}

// ── Standard handlers ───────────────────────────────────────────────

fn on_hint(envelope: &InboundEnvelope, sink: &mut dyn PresentationSink) -> Result<()> {
    let hint: HintBody = envelope.body_as()?;
    sink.set_spinner_visible(false);
    sink.show_hint(&hint.noun.kind, &hint.text);
    Ok(())
}

fn on_guess(envelope: &InboundEnvelope, sink: &mut dyn PresentationSink) -> Result<()> {
    let guess: GuessBody = envelope.body_as()?;
    sink.prepend_guess(&guess.text);
    if guess.is_correct {
        sink.notify(Notification {
            message: format!("The correct answer is \"{}\"", guess.noun),
            position: NotificationPosition::BottomRight,
            timeout: CORRECT_GUESS_NOTIFICATION_TIMEOUT,
        });
    }
    Ok(())
}

fn on_noun(envelope: &InboundEnvelope, sink: &mut dyn PresentationSink) -> Result<()> {
    let noun: NounBody = envelope.body_as()?;
    sink.alert(&format!("Your noun is \"{}\"", noun.text));
    sink.set_current_noun(&noun.text);
    Ok(())
}

fn on_action(envelope: &InboundEnvelope, sink: &mut dyn PresentationSink) -> Result<()> {
    let action: ActionBody = envelope.body_as()?;
    sink.notify(Notification {
        message: action.body,
        position: NotificationPosition::TopRight,
        timeout: ACTION_NOTIFICATION_TIMEOUT,
    });
    sink.append_player_badge(&badge_alias(&action.player.name));
    Ok(())
}

/// Mirrors the optimistic transition the local start intent applies.
fn on_start(_envelope: &InboundEnvelope, sink: &mut dyn PresentationSink) -> Result<()> {
    sink.set_start_control_visible(false);
    sink.set_spinner_visible(true);
    Ok(())
}

/// First two characters of a player name, uppercased.
pub fn badge_alias(name: &str) -> String {
    name.chars().take(2).collect::<String>().to_uppercase()
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
    use crate::protocol::decode;
    use crate::sink::PresentationEvent;

    fn route_text(router: &Router, text: &str) -> (RouteOutcome, Vec<PresentationEvent>) {
        let mut sink: Vec<PresentationEvent> = Vec::new();
        let envelope = decode(text).unwrap();
        let outcome = router.route(&envelope, &mut sink);
        (outcome, sink)
    }

    #[test]
    fn default_router_knows_server_tags() {
        let router = Router::default();
        for tag in ["hint", "guess", "noun", "action", "start"] {
            assert!(router.handles(tag), "missing handler for {tag}");
        }
        assert!(!router.handles("message"));
    }

    #[test]
    fn hint_hides_spinner_and_reveals_hint() {
        let (outcome, events) = route_text(
            &Router::default(),
            r#"{"type":"hint","body":{"noun":{"type":"animal"},"text":"purrs"}}"#,
        );
        assert_eq!(outcome, RouteOutcome::Handled(EnvelopeKind::Hint));
        assert_eq!(
            events,
            vec![
                PresentationEvent::SpinnerVisible(false),
                PresentationEvent::ShowHint {
                    noun_type: "animal".into(),
                    text: "purrs".into()
                },
            ]
        );
    }

    #[test]
    fn correct_guess_logs_and_notifies_once() {
        let (outcome, events) = route_text(
            &Router::default(),
            r#"{"type":"guess","body":{"text":"cat","isCorrect":true,"noun":"cat"}}"#,
        );
        assert_eq!(outcome, RouteOutcome::Handled(EnvelopeKind::Guess));
        assert_eq!(
            events,
            vec![
                PresentationEvent::PrependGuess("cat".into()),
                PresentationEvent::Notify(Notification {
                    message: "The correct answer is \"cat\"".into(),
                    position: NotificationPosition::BottomRight,
                    timeout: Duration::from_secs(5),
                }),
            ]
        );
    }

    #[test]
    fn wrong_guess_only_logs() {
        let (_, events) = route_text(
            &Router::default(),
            r#"{"type":"guess","body":{"text":"dog","isCorrect":false,"noun":""}}"#,
        );
        assert_eq!(events, vec![PresentationEvent::PrependGuess("dog".into())]);
    }

    #[test]
    fn noun_alerts_and_persists() {
        let (_, events) = route_text(
            &Router::default(),
            r#"{"type":"noun","body":{"text":"lighthouse"}}"#,
        );
        assert_eq!(
            events,
            vec![
                PresentationEvent::Alert("Your noun is \"lighthouse\"".into()),
                PresentationEvent::SetCurrentNoun("lighthouse".into()),
            ]
        );
    }

    #[test]
    fn action_notifies_and_appends_badge() {
        let (outcome, events) = route_text(
            &Router::default(),
            r#"{"type":"action","body":{"body":"Alice played a card","player":{"name":"alice"}}}"#,
        );
        assert_eq!(outcome, RouteOutcome::Handled(EnvelopeKind::Action));
        assert_eq!(
            events,
            vec![
                PresentationEvent::Notify(Notification {
                    message: "Alice played a card".into(),
                    position: NotificationPosition::TopRight,
                    timeout: Duration::from_secs(1),
                }),
                PresentationEvent::AppendPlayerBadge("AL".into()),
            ]
        );
    }

    #[test]
    fn repeated_actions_accumulate_badges() {
        let router = Router::default();
        let mut sink: Vec<PresentationEvent> = Vec::new();
        let text = r#"{"type":"action","body":{"body":"joined","player":{"name":"bo"}}}"#;
        for _ in 0..3 {
            router.route(&decode(text).unwrap(), &mut sink);
        }
        let badges = sink
            .iter()
            .filter(|e| **e == PresentationEvent::AppendPlayerBadge("BO".into()))
            .count();
        assert_eq!(badges, 3);
    }

    #[test]
    fn start_hides_control_and_shows_spinner() {
        let (_, events) = route_text(&Router::default(), r#"{"type":"start","body":null}"#);
        assert_eq!(
            events,
            vec![
                PresentationEvent::StartControlVisible(false),
                PresentationEvent::SpinnerVisible(true),
            ]
        );
    }

    #[test]
    fn unknown_type_is_log_only() {
        let (outcome, events) = route_text(
            &Router::default(),
            r#"{"type":"scoreboard","body":{"alice":3}}"#,
        );
        assert_eq!(outcome, RouteOutcome::Unhandled("scoreboard".into()));
        assert!(events.is_empty());
    }

    #[test]
    fn malformed_body_is_rejected_without_effects() {
        let (outcome, events) =
            route_text(&Router::default(), r#"{"type":"action","body":{"body":"x"}}"#);
        assert_eq!(outcome, RouteOutcome::Rejected("action".into()));
        assert!(events.is_empty());
    }

    #[test]
    fn registered_closure_handles_new_tag() {
        let router = Router::default().register(
            "scoreboard",
            |env: &InboundEnvelope, sink: &mut dyn PresentationSink| -> Result<()> {
                sink.alert(&env.body().to_string());
                Ok(())
            },
        );
        let (outcome, events) =
            route_text(&router, r#"{"type":"scoreboard","body":{"alice":3}}"#);
        assert_eq!(
            outcome,
            RouteOutcome::Handled(EnvelopeKind::Other("scoreboard".into()))
        );
        assert_eq!(events, vec![PresentationEvent::Alert(r#"{"alice":3}"#.into())]);
    }

    #[test]
    fn badge_alias_uses_first_two_chars() {
        assert_eq!(badge_alias("alice"), "AL");
        assert_eq!(badge_alias("z"), "Z");
        assert_eq!(badge_alias(""), "");
        assert_eq!(badge_alias("élodie"), "ÉL");
    }
}
