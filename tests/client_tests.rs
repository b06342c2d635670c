//! Integration-style client tests for the party-game client.
//!
//! Uses the scripted `MockConnector` from `tests/common` to drive
//! `PartyClient` through connection lifecycles and server envelopes, and
//! checks what reaches the presentation sink and the wire.
//!
//! Timer-dependent tests run on a paused clock so reconnect and start pacing
//! resolve instantly and deterministically.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]

mod common;

use std::time::Duration;

use party_game_client::sink::NotificationPosition;
use party_game_client::{
    CloseCode, ConnectionState, ConnectionStatus, Notification, PartyClient, PartyConfig,
    PartyError, PresentationEvent, RoomId, Router, TransportEvent,
};
use serde_json::json;
use tokio_test::assert_ok;

use common::{
    action_json, guess_json, hint_json, init_tracing, message, noun_json, start_json, Attempt, MockConnector,
    Probe, RecordingSink, ServerHandle,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn config() -> PartyConfig {
    PartyConfig::new("localhost:8080", RoomId::from_path("/game/blue-otter").unwrap())
}

fn start(attempts: Vec<Attempt>) -> (PartyClient, RecordingSink, Probe) {
    init_tracing();
    let (connector, probe) = MockConnector::new(attempts);
    let sink = RecordingSink::default();
    let client = PartyClient::start(connector, sink.clone(), config());
    (client, sink, probe)
}

fn status(s: ConnectionStatus) -> PresentationEvent {
    PresentationEvent::ConnectionStatus(s)
}

fn abnormal_session() -> Attempt {
    Attempt::Open(vec![TransportEvent::Closed(CloseCode::ABNORMAL)])
}

/// Let the session task and any due timers run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// ════════════════════════════════════════════════════════════════════
// Connection lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn connects_to_room_scoped_endpoint() {
    let (mut client, sink, probe) = start(vec![Attempt::Open(vec![])]);
    settle().await;

    assert_eq!(
        *probe.urls.lock().unwrap(),
        vec!["ws://localhost:8080/ws/blue-otter".to_string()]
    );
    assert_eq!(sink.events(), vec![status(ConnectionStatus::Connected)]);
    assert_eq!(client.state(), ConnectionState::Open);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn six_consecutive_abnormal_closes_schedule_five_reconnects() {
    let (mut client, sink, probe) = start((0..6).map(|_| abnormal_session()).collect());

    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(probe.connects(), 6, "initial connect plus five retries");
    assert_eq!(client.reconnect_attempts(), 5);
    assert_eq!(client.state(), ConnectionState::Closed);

    let disconnects = sink
        .events()
        .into_iter()
        .filter(|e| *e == status(ConnectionStatus::Disconnected))
        .count();
    assert_eq!(disconnects, 6);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn refused_attempts_share_the_same_budget() {
    // Every attempt is refused; the connector's script is empty.
    let (mut client, _sink, probe) = start(vec![]);

    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(probe.connects(), 6);
    assert_eq!(client.reconnect_attempts(), 5);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reconnects_are_spaced_by_fixed_delay() {
    let (mut client, _sink, probe) = start((0..3).map(|_| abnormal_session()).collect());

    settle().await;
    assert_eq!(probe.connects(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(probe.connects(), 2);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(probe.connects(), 3);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn clean_close_never_reconnects_even_with_budget_spent() {
    let (server, live) = ServerHandle::pair();
    let (mut client, sink, probe) = start(vec![abnormal_session(), abnormal_session(), live]);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(probe.connects(), 3);
    assert_eq!(client.reconnect_attempts(), 2);

    server.close(CloseCode::GOING_AWAY);
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(probe.connects(), 3);
    assert_eq!(client.reconnect_attempts(), 2);
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(
        sink.events().last(),
        Some(&status(ConnectionStatus::Disconnected))
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn repeated_connect_yields_one_socket() {
    let (mut client, _sink, probe) = start(vec![Attempt::Open(vec![]), Attempt::Open(vec![])]);

    assert_ok!(client.connect());
    assert_ok!(client.connect());
    settle().await;
    assert_ok!(client.connect());
    settle().await;

    assert_eq!(probe.connects(), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_connect_after_clean_close_opens_new_socket() {
    let (mut client, sink, probe) = start(vec![
        Attempt::Open(vec![TransportEvent::Closed(CloseCode::NORMAL)]),
        Attempt::Open(vec![]),
    ]);
    settle().await;
    assert_eq!(client.state(), ConnectionState::Closed);

    assert_ok!(client.connect());
    settle().await;

    assert_eq!(probe.connects(), 2);
    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(
        sink.events(),
        vec![
            status(ConnectionStatus::Connected),
            status(ConnectionStatus::Disconnected),
            status(ConnectionStatus::Connected),
        ]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unsupported_transport_is_reported_once() {
    let (mut client, sink, probe) = start(vec![Attempt::Unsupported]);
    assert_ok!(client.connect());

    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(probe.connects(), 1);
    assert_eq!(sink.events(), vec![status(ConnectionStatus::Unsupported)]);
    assert_eq!(
        ConnectionStatus::Unsupported.message(),
        "WebSockets are not supported in this environment."
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transport_error_reports_without_changing_state() {
    let (server, live) = ServerHandle::pair();
    let (mut client, sink, _probe) = start(vec![live]);
    settle().await;

    server.error("connection reset");
    settle().await;

    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(
        sink.take(),
        vec![
            status(ConnectionStatus::Connected),
            status(ConnectionStatus::Error)
        ]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_socket_and_rejects_further_calls() {
    let (mut client, sink, probe) = start(vec![Attempt::Open(vec![])]);
    settle().await;

    client.shutdown().await;

    assert_eq!(probe.closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(sink.events().last(), Some(&status(ConnectionStatus::Disconnected)));
    assert!(matches!(client.start_game(), Err(PartyError::NotConnected)));
}

// ════════════════════════════════════════════════════════════════════
// Inbound dispatch
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn correct_guess_logs_once_and_notifies_once() {
    let (mut client, sink, _probe) = start(vec![Attempt::Open(vec![message(guess_json(
        "cat", true, "cat",
    ))])]);
    settle().await;

    let events = sink.events();
    let guesses: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, PresentationEvent::PrependGuess(_)))
        .collect();
    assert_eq!(guesses, vec![&PresentationEvent::PrependGuess("cat".into())]);

    let notifications: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            PresentationEvent::Notify(n) => Some(n),
            _ => None,
        })
        .collect();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].message.contains("\"cat\""));
    assert_eq!(notifications[0].position, NotificationPosition::BottomRight);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn action_notifies_and_appends_badge() {
    let (mut client, sink, _probe) = start(vec![Attempt::Open(vec![message(action_json(
        "Alice played a card",
        "alice",
    ))])]);
    settle().await;

    assert_eq!(
        sink.events(),
        vec![
            status(ConnectionStatus::Connected),
            PresentationEvent::Notify(Notification {
                message: "Alice played a card".into(),
                position: NotificationPosition::TopRight,
                timeout: Duration::from_secs(1),
            }),
            PresentationEvent::AppendPlayerBadge("AL".into()),
        ]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_frame_is_dropped_and_dispatch_continues() {
    let (mut client, sink, _probe) = start(vec![Attempt::Open(vec![
        message("not json at all".into()),
        message(r#"{"type":"hint"}"#.into()),
        message(hint_json("animal", "purrs")),
    ])]);
    settle().await;

    assert_eq!(
        sink.events(),
        vec![
            status(ConnectionStatus::Connected),
            PresentationEvent::SpinnerVisible(false),
            PresentationEvent::ShowHint {
                noun_type: "animal".into(),
                text: "purrs".into()
            },
        ]
    );
    assert_eq!(client.state(), ConnectionState::Open);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_type_is_ignored() {
    let (mut client, sink, _probe) = start(vec![Attempt::Open(vec![
        message(json!({"type": "scoreboard", "body": {"alice": 3}}).to_string()),
        message(noun_json("lighthouse")),
    ])]);
    settle().await;

    assert_eq!(
        sink.events(),
        vec![
            status(ConnectionStatus::Connected),
            PresentationEvent::Alert("Your noun is \"lighthouse\"".into()),
            PresentationEvent::SetCurrentNoun("lighthouse".into()),
        ]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn inbound_frames_are_handled_in_arrival_order() {
    let (server, live) = ServerHandle::pair();
    let (mut client, sink, _probe) = start(vec![live]);
    settle().await;
    sink.take();

    for name in ["ada", "bo", "cy"] {
        server.push(action_json("joined", name));
    }
    settle().await;

    let badges: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            PresentationEvent::AppendPlayerBadge(alias) => Some(alias),
            _ => None,
        })
        .collect();
    assert_eq!(badges, vec!["AD", "BO", "CY"]);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn custom_router_handles_new_tag() {
    let (connector, _probe) = MockConnector::new(vec![Attempt::Open(vec![message(
        json!({"type": "round", "body": 3}).to_string(),
    )])]);
    let sink = RecordingSink::default();
    let router = Router::default().register(
        "round",
        |env: &party_game_client::InboundEnvelope,
         sink: &mut dyn party_game_client::PresentationSink|
         -> party_game_client::Result<()> {
            let round: u32 = env.body_as()?;
            sink.alert(&format!("Round {round}"));
            Ok(())
        },
    );
    let mut client = PartyClient::start_with_router(connector, sink.clone(), router, config());
    settle().await;

    assert_eq!(
        sink.events().last(),
        Some(&PresentationEvent::Alert("Round 3".into()))
    );

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Outbound actions
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn start_game_applies_optimistic_ui_then_sends_after_delay() {
    let (mut client, sink, probe) = start(vec![Attempt::Open(vec![])]);
    settle().await;
    sink.take();

    assert_ok!(client.start_game());
    settle().await;

    assert_eq!(
        sink.take(),
        vec![
            PresentationEvent::StartControlVisible(false),
            PresentationEvent::SpinnerVisible(true),
        ]
    );
    assert!(probe.sent().is_empty());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(probe.sent().is_empty());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(probe.sent_json(), vec![json!({"type": "start", "msg": {}})]);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn server_start_mirrors_optimistic_transition() {
    let (mut client, sink, _probe) = start(vec![Attempt::Open(vec![message(start_json())])]);
    settle().await;

    assert_eq!(
        sink.events(),
        vec![
            status(ConnectionStatus::Connected),
            PresentationEvent::StartControlVisible(false),
            PresentationEvent::SpinnerVisible(true),
        ]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn messages_are_sent_in_submission_order() {
    let (mut client, _sink, probe) = start(vec![Attempt::Open(vec![])]);
    settle().await;

    for line in ["is it alive?", "does it fly?", "owl"] {
        assert_ok!(client.send_message(line));
    }
    settle().await;

    assert_eq!(
        probe.sent_json(),
        vec![
            json!({"type": "message", "msg": {"message": "is it alive?"}}),
            json!({"type": "message", "msg": {"message": "does it fly?"}}),
            json!({"type": "message", "msg": {"message": "owl"}}),
        ]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn message_while_closed_is_dropped_not_queued() {
    let (mut client, _sink, probe) = start(vec![
        Attempt::Open(vec![TransportEvent::Closed(CloseCode::ABNORMAL)]),
        Attempt::Open(vec![]),
    ]);
    settle().await;
    assert_eq!(client.state(), ConnectionState::Closed);

    assert_ok!(client.send_message("lost"));
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(client.state(), ConnectionState::Open);

    assert_ok!(client.send_message("kept"));
    settle().await;

    assert_eq!(
        probe.sent_json(),
        vec![json!({"type": "message", "msg": {"message": "kept"}})]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn paced_start_is_sent_exactly_once() {
    let (mut client, _sink, probe) = start(vec![Attempt::Open(vec![])]);
    settle().await;
    assert_ok!(client.start_game());
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(probe.sent().len(), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn start_with_events_delivers_over_channel() {
    let (connector, _probe) = MockConnector::new(vec![Attempt::Open(vec![message(noun_json(
        "kite",
    ))])]);
    let (mut client, mut events) = PartyClient::start_with_events(connector, config());

    assert_eq!(events.recv().await.unwrap(), status(ConnectionStatus::Connected));
    assert_eq!(
        events.recv().await.unwrap(),
        PresentationEvent::Alert("Your noun is \"kite\"".into())
    );
    assert_eq!(
        events.recv().await.unwrap(),
        PresentationEvent::SetCurrentNoun("kite".into())
    );

    client.shutdown().await;
}
