//! Transport abstraction for the party-game protocol.
//!
//! A [`Transport`] is one live, bidirectional text-frame channel to the game
//! server. A [`Connector`] opens new transports for an endpoint URL; the
//! session loop calls it once at startup and again for every scheduled
//! reconnect, so it owns whatever setup a fresh socket needs.
//!
//! Unlike a plain byte stream, the receive side reports *why* the channel
//! ended: every transport finishes with exactly one
//! [`TransportEvent::Closed`] carrying a [`CloseCode`]. The reconnect policy
//! keys off that code.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use party_game_client::error::PartyError;
//! use party_game_client::transport::{CloseCode, Connector, Transport, TransportEvent};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), PartyError> {
//!         // Write one text frame
//!         Ok(())
//!     }
//!
//!     async fn recv(&mut self) -> TransportEvent {
//!         // Next frame, error, or the final close
//!         TransportEvent::Closed(CloseCode::NORMAL)
//!     }
//!
//!     async fn close(&mut self) -> Result<(), PartyError> {
//!         Ok(())
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     type Transport = MyTransport;
//!
//!     async fn connect(&mut self, url: &str) -> Result<MyTransport, PartyError> {
//!         Ok(MyTransport {})
//!     }
//! }
//! ```

use std::fmt;

use async_trait::async_trait;

use crate::error::PartyError;

/// A WebSocket-style close code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Clean closure after a completed handshake.
    pub const NORMAL: Self = Self(1000);
    /// The peer is going away (server shutdown, page navigation).
    pub const GOING_AWAY: Self = Self(1001);
    /// A close frame arrived without a status code.
    pub const NO_STATUS: Self = Self(1005);
    /// The connection dropped without a closing handshake.
    pub const ABNORMAL: Self = Self(1006);

    /// Whether this code signals an abnormal termination (retry-eligible).
    pub fn is_abnormal(self) -> bool {
        self == Self::ABNORMAL
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One observation from the receive side of a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A complete text frame.
    Message(String),
    /// A transport fault. Always followed by [`TransportEvent::Closed`].
    Error(String),
    /// The channel has ended. No further events follow.
    Closed(CloseCode),
}

/// A bidirectional text-frame transport to the game server.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is used inside `tokio::select!` and **MUST** be
/// cancel-safe: dropping its future before completion must not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`PartyError::TransportSend`] if the frame could not be written,
    /// or [`PartyError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, message: String) -> Result<(), PartyError>;

    /// Wait for the next receive-side event.
    ///
    /// After returning [`TransportEvent::Closed`] the transport is spent and
    /// must not be polled again.
    async fn recv(&mut self) -> TransportEvent;

    /// Close the transport gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the closing handshake fails; resources are released
    /// either way.
    async fn close(&mut self) -> Result<(), PartyError>;
}

/// Opens [`Transport`]s to an endpoint URL.
#[async_trait]
pub trait Connector: Send + 'static {
    /// The transport this connector produces.
    type Transport: Transport;

    /// Open a new transport to `url`.
    ///
    /// # Errors
    ///
    /// Return [`PartyError::Unsupported`] when the environment can never
    /// provide this transport; the session treats that as fatal. Any other
    /// error is treated as an abnormal close and may be retried.
    async fn connect(&mut self, url: &str) -> Result<Self::Transport, PartyError>;
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
    fn only_1006_is_abnormal() {
        assert!(CloseCode::ABNORMAL.is_abnormal());
        assert!(CloseCode(1006).is_abnormal());
        for code in [1000, 1001, 1005, 1011, 4000] {
            assert!(!CloseCode(code).is_abnormal(), "{code} should be clean");
        }
    }

    #[test]
    fn transport_trait_is_object_safe() {
        fn assert_object(_: Option<Box<dyn Transport>>) {}
        assert_object(None);
    }
}
