//! # Party Game Client
//!
//! Real-time client core for a browser-style party game: a player joins a
//! room, receives a secret noun, trades hints and guesses with the others,
//! and watches game actions stream in.
//!
//! The crate keeps one reconnecting connection per room, decodes the typed
//! JSON envelopes the game server sends, and routes each one to a handler
//! that reports effects to a UI through [`PresentationSink`].
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any backend
//! - **Bounded reconnect**: abnormal closes are retried a fixed number of times
//! - **Open dispatch**: register handlers for new envelope types on a [`Router`]
//! - **WebSocket built-in**: default `transport-websocket` feature provides `WebSocketConnector`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use party_game_client::{PartyClient, PartyConfig, RoomId, WebSocketConnector};
//!
//! let room = RoomId::from_path("/game/blue-otter")?;
//! let config = PartyConfig::new("localhost:8080", room);
//! let (client, mut events) = PartyClient::start_with_events(WebSocketConnector::new(), config);
//!
//! client.start_game()?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```

pub mod action;
pub mod client;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod router;
pub mod sink;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use action::{Intent, OutboundAction};
pub use client::{PartyClient, PartyConfig};
pub use connection::{ConnectionState, ReconnectPolicy, RoomId};
pub use error::{PartyError, Result};
pub use protocol::{decode, encode, EnvelopeKind, InboundEnvelope, OutboundEnvelope};
pub use router::{Handler, RouteOutcome, Router};
pub use sink::{ChannelSink, ConnectionStatus, Notification, PresentationEvent, PresentationSink};
pub use transport::{CloseCode, Connector, Transport, TransportEvent};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
