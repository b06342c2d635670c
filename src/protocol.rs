//! Wire-compatible envelope types for the party-game protocol.
//!
//! Every frame is one JSON object carrying a `type` tag and a payload. The
//! payload field is named differently in each direction and both names are
//! part of the server contract:
//!
//! - outbound (client → server): `{"type": <tag>, "msg": <object>}`
//! - inbound (server → client): `{"type": <tag>, "body": <object>}`
//!
//! [`encode`] and [`decode`] are the only places that touch wire text.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PartyError, Result};

// ── Type tags ───────────────────────────────────────────────────────

/// Known envelope type tags plus an open arm for tags the server adds later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    /// Game start (both directions).
    Start,
    /// Free-text chat line (outbound only).
    Message,
    /// A hint given by the presenter.
    Hint,
    /// A guess made by any player.
    Guess,
    /// The secret noun assigned to this player.
    Noun,
    /// Free-text game action by a player.
    Action,
    /// Any tag this client does not know about.
    Other(String),
}

impl EnvelopeKind {
    /// The wire tag for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Message => "message",
            Self::Hint => "hint",
            Self::Guess => "guess",
            Self::Noun => "noun",
            Self::Action => "action",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for EnvelopeKind {
    fn from(tag: &str) -> Self {
        match tag {
            "start" => Self::Start,
            "message" => Self::Message,
            "hint" => Self::Hint,
            "guess" => Self::Guess,
            "noun" => Self::Noun,
            "action" => Self::Action,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Envelopes ───────────────────────────────────────────────────────

/// An envelope sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    #[serde(rename = "type")]
    kind: String,
    msg: serde_json::Value,
}

impl OutboundEnvelope {
    /// Build an outbound envelope from a tag and any serializable payload.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::Serialization`] if `payload` cannot be turned into JSON.
    pub fn new(kind: impl Into<String>, payload: &impl Serialize) -> Result<Self> {
        Ok(Self {
            kind: kind.into(),
            msg: serde_json::to_value(payload)?,
        })
    }

    pub fn kind(&self) -> EnvelopeKind {
        EnvelopeKind::from(self.kind.as_str())
    }

    pub fn tag(&self) -> &str {
        &self.kind
    }

    pub fn msg(&self) -> &serde_json::Value {
        &self.msg
    }

    /// Serialize to a single text frame.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::Serialization`] on serializer failure.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// An envelope received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    kind: String,
    /// The server sends `null` for bodiless tags such as `start`.
    #[serde(default)]
    body: serde_json::Value,
}

impl InboundEnvelope {
    pub fn new(kind: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            body,
        }
    }

    pub fn kind(&self) -> EnvelopeKind {
        EnvelopeKind::from(self.kind.as_str())
    }

    pub fn tag(&self) -> &str {
        &self.kind
    }

    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// Interpret the body as the typed payload for this tag.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::InvalidPayload`] if the body does not have the
    /// expected shape.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.body).map_err(|source| PartyError::InvalidPayload {
            kind: self.kind.clone(),
            source,
        })
    }
}

// ── Codec ───────────────────────────────────────────────────────────

/// Encode an outbound envelope as wire text: `{"type": kind, "msg": payload}`.
///
/// # Errors
///
/// Returns [`PartyError::Serialization`] if `payload` cannot be serialized.
pub fn encode(kind: &str, payload: &impl Serialize) -> Result<String> {
    OutboundEnvelope::new(kind, payload)?.to_wire()
}

/// Decode wire text into an inbound envelope.
///
/// Anything that is not a JSON object with a string `type` field is rejected.
///
/// # Errors
///
/// Returns [`PartyError::Decode`] for malformed text.
pub fn decode(text: &str) -> Result<InboundEnvelope> {
    serde_json::from_str(text).map_err(PartyError::Decode)
}

// ── Outbound payloads ───────────────────────────────────────────────

/// Payload of an outbound `start` envelope. Serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPayload {}

/// Payload of an outbound `message` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub message: String,
}

// ── Inbound bodies ──────────────────────────────────────────────────

/// The category of a noun (person, place, thing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NounCategory {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Body of an inbound `hint` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintBody {
    pub noun: NounCategory,
    pub text: String,
}

/// Body of an inbound `guess` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessBody {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    /// The revealed noun; only meaningful when `is_correct` is set.
    #[serde(default)]
    pub noun: String,
}

/// Body of an inbound `noun` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NounBody {
    pub text: String,
}

/// The acting player of an `action` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingPlayer {
    pub name: String,
}

/// Body of an inbound `action` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBody {
    pub body: String,
    pub player: ActingPlayer,
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
    fn encode_start_uses_msg_field() {
        let text = encode("start", &StartPayload {}).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"type": "start", "msg": {}}));
    }

    #[test]
    fn encode_message_wraps_text() {
        let text = encode(
            "message",
            &MessagePayload {
                message: "is it a cat?".into(),
            },
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"type": "message", "msg": {"message": "is it a cat?"}})
        );
    }

    #[test]
    fn message_payload_survives_msg_to_body_swap() {
        // A server echoing the envelope moves `msg` into `body`.
        let wire = encode(
            "message",
            &MessagePayload {
                message: "hello room".into(),
            },
        )
        .unwrap();
        let outbound: serde_json::Value = serde_json::from_str(&wire).unwrap();
        let echoed = json!({"type": outbound["type"], "body": outbound["msg"]}).to_string();

        let inbound = decode(&echoed).unwrap();
        let payload: MessagePayload = inbound.body_as().unwrap();
        assert_eq!(payload.message, "hello room");
        assert_eq!(inbound.kind(), EnvelopeKind::Message);
    }

    #[test]
    fn decode_reads_type_and_body() {
        let env = decode(r#"{"type":"noun","body":{"text":"lighthouse"}}"#).unwrap();
        assert_eq!(env.kind(), EnvelopeKind::Noun);
        assert_eq!(env.body()["text"], "lighthouse");
    }

    #[test]
    fn decode_accepts_null_and_missing_body() {
        let env = decode(r#"{"type":"start","body":null}"#).unwrap();
        assert!(env.body().is_null());
        let env = decode(r#"{"type":"start"}"#).unwrap();
        assert!(env.body().is_null());
    }

    #[test]
    fn decode_rejects_malformed_text() {
        assert!(matches!(decode("not json"), Err(PartyError::Decode(_))));
        assert!(matches!(decode(r#"{"body":{}}"#), Err(PartyError::Decode(_))));
        assert!(matches!(decode(r#"{"type":7}"#), Err(PartyError::Decode(_))));
        assert!(matches!(decode("[1,2]"), Err(PartyError::Decode(_))));
    }

    #[test]
    fn unknown_tags_are_preserved() {
        let env = decode(r#"{"type":"scoreboard","body":{}}"#).unwrap();
        assert_eq!(env.kind(), EnvelopeKind::Other("scoreboard".into()));
        assert_eq!(env.kind().as_str(), "scoreboard");
    }

    #[test]
    fn guess_body_reads_camel_case_flag() {
        let env = decode(r#"{"type":"guess","body":{"text":"cat","isCorrect":true,"noun":"cat"}}"#)
            .unwrap();
        let guess: GuessBody = env.body_as().unwrap();
        assert!(guess.is_correct);
        assert_eq!(guess.noun, "cat");
    }

    #[test]
    fn hint_body_shape_mismatch_is_invalid_payload() {
        let env = decode(r#"{"type":"hint","body":{"text":"meows"}}"#).unwrap();
        let err = env.body_as::<HintBody>().unwrap_err();
        assert!(matches!(err, PartyError::InvalidPayload { ref kind, .. } if kind == "hint"));
    }

    #[test]
    fn kind_round_trips_through_tag() {
        for tag in ["start", "message", "hint", "guess", "noun", "action"] {
            assert_eq!(EnvelopeKind::from(tag).as_str(), tag);
            assert!(!matches!(EnvelopeKind::from(tag), EnvelopeKind::Other(_)));
        }
    }
}
