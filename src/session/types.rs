//! Session state machine and status snapshot types.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::transport::{Credential, Transport};

use super::catalog::ToolCatalog;

// ─── State Machine ───────────────────────────────────────────────────────────

/// Connection state of one conversation's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl SessionState {
    /// Whether `self → to` is an edge of the state machine.
    pub fn can_transition(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Failed)
                | (Connected, Disconnected)
                | (Failed, Connecting)
                | (Failed, Disconnected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Mutable per-conversation session record. Owned by the session manager.
#[derive(Default)]
pub(crate) struct Session {
    pub state: SessionState,
    pub endpoint: Option<String>,
    pub credential: Option<Credential>,
    pub catalog: Option<Arc<ToolCatalog>>,
    pub last_error: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
    pub transport: Option<Arc<dyn Transport>>,
}

impl Session {
    /// Drop everything tied to a backend connection.
    pub fn release(&mut self) -> Option<Arc<dyn Transport>> {
        self.endpoint = None;
        self.credential = None;
        self.catalog = None;
        self.connected_at = None;
        self.transport.take()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            endpoint: self.endpoint.clone(),
            tool_count: self.catalog.as_ref().map_or(0, |c| c.len()),
            has_token: self.credential.is_some(),
            last_error: self.last_error.clone(),
            connected_at: self.connected_at,
        }
    }
}

/// Point-in-time view of a session, safe to hand out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub endpoint: Option<String>,
    pub tool_count: usize,
    pub has_token: bool,
    pub last_error: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
}

// ─── Connect Outcome ─────────────────────────────────────────────────────────

/// A tool the backend listed but whose schema could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTool {
    pub name: String,
    pub reason: String,
}

/// What a successful `connect` produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectSummary {
    pub endpoint: String,
    pub tool_count: usize,
    pub has_token: bool,
    /// True when an existing connection was torn down first.
    pub replaced: bool,
    pub skipped: Vec<SkippedTool>,
}
