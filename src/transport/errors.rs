//! Transport fault types.

use thiserror::Error;

/// Errors raised at the backend boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFault {
    /// The backend did not answer within the allotted time.
    #[error("'{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        operation: String,
        timeout_ms: u64,
    },

    /// The backend rejected the credential (HTTP 401/403 or missing token).
    #[error("unauthorized: {reason}")]
    Unauthorized {
        reason: String,
    },

    /// The backend could not be reached.
    #[error("connection to {endpoint} failed: {reason}")]
    Connection {
        endpoint: String,
        reason: String,
    },

    /// Malformed or unexpected message on the wire.
    #[error("protocol error: {reason}")]
    Protocol {
        reason: String,
    },

    /// The backend answered with an error (JSON-RPC error object or HTTP status).
    #[error("server error [{code}]: {message}")]
    Server {
        code: i32,
        message: String,
    },
}

impl TransportFault {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection { .. })
    }
}
