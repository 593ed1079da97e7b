//! Error types for venue-client.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all session operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error during socket operations (refused, reset, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol violation on the byte stream (oversized frame, ...).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A single frame could not be decoded or dispatched.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The session did not become ready within the connect timeout.
    #[error("Connect timed out after {0:?}")]
    Timeout(Duration),

    /// The operation needs a ready session.
    #[error("Not connected")]
    NotConnected,

    /// A connect was requested while a session is already active.
    #[error("Already connected")]
    AlreadyConnected,

    /// The connection was closed by the peer, the caller or a socket error.
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// The event loop driving the session is gone.
    #[error("Event loop stopped")]
    RuntimeStopped,
}

impl ClientError {
    /// Check whether this error is a connect timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }
}

/// Result type alias using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;
