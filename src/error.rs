//! Error types and handling.

use thiserror::Error;

/// Crate-wide error type for projector communication.
#[derive(Error, Debug)]
pub enum ProjectorError {
    /// One of the PJ_OK / PJREQ / PJACK steps (or the follow-up null command) failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Acknowledgement frame did not match the expected bytes.
    #[error("Ack mismatch: expected {expected}, received {received}")]
    AckMismatch { expected: String, received: String },

    /// Response prefix or terminator did not match.
    #[error("Response framing error: {0}")]
    ResponseFraming(String),

    /// Argument rejected before any bytes were sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A read or write did not complete in time. The socket is unusable afterwards.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Connection establishment exhausted all attempts.
    #[error("Did not connect after {attempts} attempts: {last_error}")]
    DidNotConnect { attempts: u32, last_error: String },

    /// TCP connect/read/write failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Payload was framed correctly but its content is not understood.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Operation attempted without an active connection.
    #[error("Projector not connected")]
    NotConnected,
}

/// Result type alias for ProjectorError
pub type Result<T> = std::result::Result<T, ProjectorError>;

impl ProjectorError {
    /// Create a handshake error with message
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    /// Create a response framing error with message
    pub fn framing(msg: impl Into<String>) -> Self {
        Self::ResponseFraming(msg.into())
    }

    /// Create an invalid argument error with message
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a decode error with message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a connection error with message
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }
}
