//! Outbound Action Builder: turns user intents into outbound envelopes.
//!
//! The user-intent source (buttons, key bindings, a terminal prompt) hands
//! the client an [`Intent`]. [`OutboundAction::build`] encodes the envelope
//! and says how the session should send it: immediately, or after a pacing
//! delay with the optimistic "starting" UI applied up front.

use std::time::Duration;

use crate::error::Result;
use crate::protocol::{EnvelopeKind, MessagePayload, OutboundEnvelope, StartPayload};

/// Default client-side pacing before a start request is transmitted.
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(2);

/// A structured request from the user-intent source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Ask the server to start the game.
    StartGame,
    /// Send a chat line (a hint from the presenter, a guess from anyone else).
    SendMessage(String),
}

/// An encoded envelope plus the instructions for sending it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundAction {
    pub envelope: OutboundEnvelope,
    /// Wire text of `envelope`.
    pub wire: String,
    /// Wait this long before transmitting. Zero means send now.
    pub delay: Duration,
    /// Hide the start control and show the spinner before transmitting.
    pub optimistic_start: bool,
}

impl OutboundAction {
    /// Build the outbound action for `intent`. `start_delay` paces
    /// [`Intent::StartGame`]; messages always go out immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::Serialization`](crate::PartyError::Serialization)
    /// if the payload cannot be encoded.
    pub fn build(intent: Intent, start_delay: Duration) -> Result<Self> {
        let (envelope, delay, optimistic_start) = match intent {
            Intent::StartGame => (
                OutboundEnvelope::new(EnvelopeKind::Start.as_str(), &StartPayload {})?,
                start_delay,
                true,
            ),
            Intent::SendMessage(message) => (
                OutboundEnvelope::new(EnvelopeKind::Message.as_str(), &MessagePayload { message })?,
                Duration::ZERO,
                false,
            ),
        };
        let wire = envelope.to_wire()?;
        Ok(Self {
            envelope,
            wire,
            delay,
            optimistic_start,
        })
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
    use serde_json::json;

    #[test]
    fn start_game_is_paced_and_optimistic() {
        let action = OutboundAction::build(Intent::StartGame, DEFAULT_START_DELAY).unwrap();
        assert_eq!(action.envelope.kind(), EnvelopeKind::Start);
        assert_eq!(action.delay, Duration::from_secs(2));
        assert!(action.optimistic_start);

        let wire: serde_json::Value = serde_json::from_str(&action.wire).unwrap();
        assert_eq!(wire, json!({"type": "start", "msg": {}}));
    }

    #[test]
    fn send_message_goes_out_immediately() {
        let action = OutboundAction::build(
            Intent::SendMessage("is it bigger than a breadbox?".into()),
            DEFAULT_START_DELAY,
        )
        .unwrap();
        assert_eq!(action.delay, Duration::ZERO);
        assert!(!action.optimistic_start);

        let wire: serde_json::Value = serde_json::from_str(&action.wire).unwrap();
        assert_eq!(
            wire,
            json!({"type": "message", "msg": {"message": "is it bigger than a breadbox?"}})
        );
    }

    #[test]
    fn empty_message_is_still_well_formed() {
        let action = OutboundAction::build(Intent::SendMessage(String::new()), Duration::ZERO)
            .unwrap();
        assert_eq!(action.envelope.msg(), &json!({"message": ""}));
    }

    #[test]
    fn custom_start_delay_is_used() {
        let action = OutboundAction::build(Intent::StartGame, Duration::from_millis(250)).unwrap();
        assert_eq!(action.delay, Duration::from_millis(250));
    }
}
