//! Error types for gateway client operations.
//!
//! Every failure a caller can see is one of these variants. Only transport
//! failures and 5xx statuses are worth retrying: credential rejections and
//! lost sessions need a human or a configuration change.

use crate::transport::TransportError;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the gateway.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The gateway rejected the credentials.
    ///
    /// `block_time` is the number of seconds the gateway refuses further
    /// login attempts.
    #[error("Login rejected (blocked for {block_time}s)")]
    Credentials { block_time: u32 },

    /// The session expired and could not be re-established.
    #[error("Session lost: gateway keeps rejecting the session")]
    SessionLost,

    /// The gateway answered 400 for a command it does not support.
    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    /// Any HTTP status other than 200, 400 and 403.
    #[error("Unexpected HTTP status {status}")]
    Status { status: u16 },

    /// The session was logged off while the operation waited for a login.
    #[error("Operation cancelled by logoff")]
    Cancelled,

    /// Network-level failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Malformed response or invalid input.
    #[error("Protocol error: {0}")]
    Protocol(#[from] fritz_core::Error),
}

impl ClientError {
    /// Create a credential rejection error.
    pub fn credentials(block_time: u32) -> Self {
        Self::Credentials { block_time }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
        }
    }

    /// Create an unexpected status error.
    pub fn status(status: u16) -> Self {
        Self::Status { status }
    }

    /// Returns `true` if repeating the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status } => *status >= 500,
            _ => false,
        }
    }
}
