//! Error types for the party-game client.

use thiserror::Error;

/// Errors that can occur when using the party-game client.
#[derive(Debug, Error)]
pub enum PartyError {
    /// Failed to send a frame through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was already closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// The execution environment cannot provide the transport at all.
    ///
    /// This is permanent for the session and is never retried.
    #[error("transport unsupported: {0}")]
    Unsupported(String),

    /// Failed to serialize an outbound envelope.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An inbound frame was not a well-formed envelope.
    #[error("malformed envelope: {0}")]
    Decode(#[source] serde_json::Error),

    /// An envelope carried a body that does not match the shape its tag requires.
    #[error("invalid `{kind}` payload: {source}")]
    InvalidPayload {
        /// Type tag of the offending envelope.
        kind: String,
        /// Underlying shape mismatch.
        #[source]
        source: serde_json::Error,
    },

    /// The session loop has terminated; no further commands are accepted.
    #[error("not connected to server")]
    NotConnected,

    /// The page path did not yield a usable room identifier.
    #[error("invalid room path: {0:?}")]
    InvalidRoom(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for party-game client operations.
pub type Result<T> = std::result::Result<T, PartyError>;
