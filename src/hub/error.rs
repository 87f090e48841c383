//! Error types local to the hub, the gate, and connection transports.
//!
//! None of these ever cross connection boundaries: a [`TransportError`] on
//! one connection tears down that connection only.

use crate::domain::ConnectionId;

/// Read or write failure on an established connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer or the hub already closed the channel.
    #[error("connection closed")]
    Closed,

    /// The recipient could not accept the frame in time.
    #[error("write timed out after {0} ms")]
    Timeout(u64),

    /// The recipient's outbound buffer is full.
    #[error("recipient is not accepting frames")]
    Backpressure,

    /// Any other I/O or protocol failure.
    #[error("transport failure: {0}")]
    Io(String),
}

/// Failures of hub lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The hub has been shut down and admits no new connections.
    #[error("hub is shutting down")]
    ShuttingDown,

    /// A connection with the same id is already registered.
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
}

/// Reasons the session gate refuses a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// No token, or an empty or malformed one, was presented.
    #[error("missing session token")]
    MissingToken,

    /// The token is unknown, expired, or logged out.
    #[error("invalid or expired session")]
    InvalidSession,

    /// The session store could not be consulted.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
}
