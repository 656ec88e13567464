//! Error types for connection and call handling.

use thiserror::Error;

/// Errors surfaced by the generic call facade.
#[derive(Debug, Error)]
pub enum CallError {
    /// No session is currently bound to the connection.
    #[error("connection is not established")]
    NotConnected,

    /// The session ended while the call was pending.
    #[error("connection lost while the call was pending")]
    ConnectionLost,

    /// No response arrived within the configured call timeout.
    #[error("API call timed out")]
    Timeout,

    /// The peer reported the operation as failed.
    #[error("operation failed: {message}")]
    OperationFailed {
        /// Message supplied by the peer.
        message: String,
    },

    /// The peer does not support the requested action.
    #[error("unsupported operation: {message}")]
    UnsupportedOperation { message: String },

    /// The peer rejected the request parameters.
    #[error("bad request: {message}")]
    InvalidArgument { message: String },

    /// The response status does not fit the call policy, e.g. a
    /// synchronous `ok` answer to a rate-limited call.
    #[error("unexpected response status `{status}`: {message}")]
    UnexpectedStatus { status: String, message: String },

    /// Malformed or unclassifiable wire data.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A correlation id was registered twice. Programmer misuse.
    #[error("duplicate registration for correlation id `{0}`")]
    DuplicateRegistration(String),

    /// Request or response (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bound session refused the outbound frame.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors surfaced by connection lifecycle operations.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// `close` was called on an already closed connection.
    #[error("connection already closed")]
    AlreadyClosed,

    /// The operation requires a bound session.
    #[error("connection is not established")]
    NotConnected,

    /// Listener or socket setup failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when sending through a transport session.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The session's writer is gone; the transport is no longer open.
    #[error("session is closed")]
    Closed,
}
