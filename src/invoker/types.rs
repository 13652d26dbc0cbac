//! Tool call result and error types.

use serde_json::Value;
use thiserror::Error;

use crate::session::SessionState;
use crate::validation::ValidationDiagnostics;

/// Why a tool call did not produce a payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolCallError {
    #[error("not connected (session is {state})")]
    NotConnected { state: SessionState },

    #[error("tool '{name}' not found")]
    NotFound {
        name: String,
        suggestion: Option<String>,
    },

    /// Arguments did not satisfy the schema; the backend was not contacted.
    #[error("invalid arguments for '{}'", .0.tool_name)]
    ValidationFailed(Box<ValidationDiagnostics>),

    #[error("tool '{tool}' timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    #[error("tool '{tool}' failed: {detail}")]
    TransportFailure {
        tool: String,
        detail: String,
        retryable: bool,
    },

    /// The session was disconnected before the call completed.
    #[error("call to '{tool}' cancelled by disconnect")]
    Cancelled { tool: String },
}

/// Outcome of one `invoke`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallResult {
    Ok {
        tool_name: String,
        payload: Value,
        elapsed_ms: u64,
    },
    Error(ToolCallError),
}

impl ToolCallResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn error(&self) -> Option<&ToolCallError> {
        match self {
            Self::Error(e) => Some(e),
            Self::Ok { .. } => None,
        }
    }
}

impl From<ToolCallError> for ToolCallResult {
    fn from(err: ToolCallError) -> Self {
        Self::Error(err)
    }
}
