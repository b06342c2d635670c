//! Envelope codec and routing tests against wire-shaped JSON.
//!
//! Each test goes through the public `encode` / `decode` / `Router` API the
//! way the session loop does, without a connection.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]

use party_game_client::protocol::MessagePayload;
use party_game_client::{
    decode, encode, EnvelopeKind, PartyError, PresentationEvent, RouteOutcome, Router,
};
use serde_json::{json, Value};

/// Re-label an outbound frame the way the server echoes it back.
fn server_echo(wire: &str) -> String {
    let mut frame: Value = serde_json::from_str(wire).unwrap();
    let object = frame.as_object_mut().unwrap();
    let msg = object.remove("msg").unwrap();
    object.insert("body".into(), msg);
    frame.to_string()
}

#[test]
fn message_payload_survives_msg_to_body_swap() {
    for text in ["", "hello", "multi\nline", "quotes \" and unicode ☃"] {
        let wire = encode("message", &MessagePayload { message: text.into() }).unwrap();
        let inbound = decode(&server_echo(&wire)).unwrap();

        assert_eq!(inbound.kind(), EnvelopeKind::Message);
        let payload: MessagePayload = inbound.body_as().unwrap();
        assert_eq!(payload.message, text);
    }
}

#[test]
fn every_known_frame_hits_exactly_one_handler() {
    let router = Router::default();
    let frames = [
        (json!({"type": "hint", "body": {"noun": {"type": "place"}, "text": "salty"}}), EnvelopeKind::Hint),
        (json!({"type": "guess", "body": {"text": "sea", "isCorrect": false}}), EnvelopeKind::Guess),
        (json!({"type": "noun", "body": {"text": "ocean"}}), EnvelopeKind::Noun),
        (json!({"type": "action", "body": {"body": "hi", "player": {"name": "Q"}}}), EnvelopeKind::Action),
        (json!({"type": "start"}), EnvelopeKind::Start),
    ];

    for (frame, kind) in frames {
        let mut sink: Vec<PresentationEvent> = Vec::new();
        let envelope = decode(&frame.to_string()).unwrap();
        assert_eq!(router.route(&envelope, &mut sink), RouteOutcome::Handled(kind));
        assert!(!sink.is_empty());
    }
}

#[test]
fn unrecognized_type_takes_fallback() {
    let router = Router::default();
    for tag in ["message", "scoreboard", ""] {
        let mut sink: Vec<PresentationEvent> = Vec::new();
        let envelope = decode(&json!({"type": tag, "body": {}}).to_string()).unwrap();
        assert_eq!(
            router.route(&envelope, &mut sink),
            RouteOutcome::Unhandled(tag.to_owned())
        );
        assert!(sink.is_empty());
    }
}

#[test]
fn unparseable_frames_are_decode_errors() {
    for text in ["", "{", "[]", "42", r#"{"body":{}}"#, r#"{"type":7}"#] {
        assert!(
            matches!(decode(text), Err(PartyError::Decode(_))),
            "expected decode error for {text:?}"
        );
    }
}

#[test]
fn extra_fields_are_tolerated() {
    let envelope =
        decode(r#"{"type":"noun","body":{"text":"owl","rarity":"rare"},"seq":9}"#).unwrap();
    let mut sink: Vec<PresentationEvent> = Vec::new();
    assert_eq!(
        Router::default().route(&envelope, &mut sink),
        RouteOutcome::Handled(EnvelopeKind::Noun)
    );
}
