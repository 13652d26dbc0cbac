//! Backend transport — the capability the session layer talks through.
//!
//! The engine only sees the [`Connector`] and [`Transport`] traits. The
//! crate ships one implementation, MCP over streamable HTTP, in [`http`];
//! tests substitute in-memory doubles.

pub mod errors;
pub mod http;
pub mod jsonrpc;
pub mod sse;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::schema::RawToolDescriptor;

pub use errors::TransportFault;
pub use http::{HttpConnector, HttpTransport};

/// Bearer credential presented to the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Opens a session with a backend.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        endpoint: &str,
        credential: Option<&Credential>,
    ) -> Result<Arc<dyn Transport>, TransportFault>;
}

/// An open backend session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Every tool the backend exposes, un-normalized.
    async fn list_tools(&self) -> Result<Vec<RawToolDescriptor>, TransportFault>;

    /// Invoke one tool. Implementations must give up after `timeout`.
    async fn call_tool(&self, name: &str, args: Value, timeout: Duration) -> Result<Value, TransportFault>;

    /// Release the session. Best effort, never fails.
    async fn close(&self);
}
