//! Session manager error types.

use thiserror::Error;

use super::types::SessionState;

/// Errors from session lifecycle and catalog operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The operation needs a connected session.
    #[error("not connected (session is {state})")]
    NotConnected { state: SessionState },

    /// A connect is already in flight for this conversation.
    #[error("a connection attempt is already in progress")]
    Busy,

    /// The backend could not be opened or its tool list fetched.
    #[error("failed to connect to {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    /// Missing or rejected credential.
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// No tool with this exact name in the catalog.
    #[error("tool '{name}' not found")]
    ToolNotFound {
        name: String,
        suggestion: Option<String>,
    },

    /// The session was disconnected while the operation was pending.
    #[error("operation cancelled by disconnect")]
    Cancelled,

    /// A state change outside the state machine was attempted.
    #[error("invalid session transition {from} -> {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

impl SessionError {
    /// Whether the same request may succeed if simply retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::ConnectFailed { .. })
    }
}
