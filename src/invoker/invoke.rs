//! Tool Invoker: lookup, validation and the backend call for one request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use crate::session::{SessionError, SessionManager};
use crate::transport::TransportFault;
use crate::validation::{validate, ValidationDiagnostics};

use super::types::{ToolCallError, ToolCallResult};

/// Runs tool calls against the sessions of a [`SessionManager`].
pub struct ToolInvoker {
    sessions: Arc<SessionManager>,
    call_timeout: Duration,
}

impl ToolInvoker {
    pub fn new(sessions: Arc<SessionManager>, call_timeout: Duration) -> Self {
        Self {
            sessions,
            call_timeout,
        }
    }

    /// Invoke `tool_name` with `raw_args` on the session for `key`.
    ///
    /// Waits behind earlier operations on `key`. The backend is only contacted
    /// when the session is connected, the tool exists and the arguments
    /// validate. Failures never change session state.
    pub async fn invoke(&self, key: &str, tool_name: &str, raw_args: &Map<String, Value>) -> ToolCallResult {
        let mut lease = match self.sessions.lease(key).await {
            Ok(lease) => lease,
            Err(SessionError::NotConnected { state }) => {
                return ToolCallError::NotConnected { state }.into()
            }
            Err(_) => {
                return ToolCallError::Cancelled {
                    tool: tool_name.to_string(),
                }
                .into()
            }
        };

        let tool = match lease.lookup_tool(tool_name) {
            Ok(tool) => tool,
            Err(SessionError::ToolNotFound { name, suggestion }) => {
                tracing::info!(key, tool = tool_name, ?suggestion, "unknown tool");
                return ToolCallError::NotFound { name, suggestion }.into();
            }
            Err(e) => {
                return ToolCallError::TransportFailure {
                    tool: tool_name.to_string(),
                    detail: e.to_string(),
                    retryable: e.is_retryable(),
                }
                .into()
            }
        };

        let checked = validate(&tool.schema, raw_args);
        if !checked.ok {
            tracing::info!(
                key,
                tool = tool_name,
                missing = checked.missing.len(),
                type_errors = checked.type_errors.len(),
                "arguments failed validation"
            );
            let diagnostics = ValidationDiagnostics::new(&tool, raw_args, &checked);
            return ToolCallError::ValidationFailed(Box::new(diagnostics)).into();
        }
        for warning in &checked.warnings {
            tracing::debug!(key, tool = tool_name, %warning, "validation warning");
        }

        let transport = lease.transport().clone();
        let args = Value::Object(checked.filled_args);
        let started = Instant::now();

        let outcome = tokio::select! {
            result = tokio::time::timeout(
                self.call_timeout,
                transport.call_tool(tool_name, args, self.call_timeout),
            ) => Some(result),
            _ = lease.cancelled() => None,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if outcome.is_none() || !lease.is_current() {
            tracing::info!(key, tool = tool_name, elapsed_ms, "call cancelled by disconnect");
            return ToolCallError::Cancelled {
                tool: tool_name.to_string(),
            }
            .into();
        }

        match outcome {
            Some(Ok(Ok(payload))) => {
                tracing::info!(key, tool = tool_name, elapsed_ms, "tool call succeeded");
                ToolCallResult::Ok {
                    tool_name: tool_name.to_string(),
                    payload,
                    elapsed_ms,
                }
            }
            Some(Ok(Err(TransportFault::Timeout { .. }))) | Some(Err(_)) => {
                tracing::warn!(key, tool = tool_name, elapsed_ms, "tool call timed out");
                ToolCallError::Timeout {
                    tool: tool_name.to_string(),
                    timeout_ms: self.call_timeout.as_millis() as u64,
                }
                .into()
            }
            Some(Ok(Err(fault))) => {
                tracing::warn!(key, tool = tool_name, elapsed_ms, error = %fault, "tool call failed");
                ToolCallError::TransportFailure {
                    tool: tool_name.to_string(),
                    detail: fault.to_string(),
                    retryable: fault.is_retryable(),
                }
                .into()
            }
            None => ToolCallError::Cancelled {
                tool: tool_name.to_string(),
            }
            .into(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::testing::{ScriptedConnector, ScriptedTransport};
    use serde_json::json;

    fn hub() -> ScriptedTransport {
        ScriptedTransport::new()
            .with_tool(
                "search-models",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string"},
                        "limit": {"type": "integer", "default": 10}
                    },
                    "required": ["query"]
                }),
            )
            .with_tool("get-model-info", json!({"type": "object", "properties": {"model_id": {"type": "string"}}}))
    }

    async fn setup(transport: ScriptedTransport, call_timeout: Duration) -> (Arc<SessionManager>, ToolInvoker) {
        let sessions = Arc::new(SessionManager::new(
            Arc::new(ScriptedConnector::new(transport)),
            Duration::from_secs(5),
        ));
        sessions.connect("c1", "http://hub/mcp", None).await.unwrap();
        let invoker = ToolInvoker::new(sessions.clone(), call_timeout);
        (sessions, invoker)
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_not_connected_never_calls_backend() {
        let transport = hub();
        let sessions = Arc::new(SessionManager::new(
            Arc::new(ScriptedConnector::new(transport.clone())),
            Duration::from_secs(5),
        ));
        let invoker = ToolInvoker::new(sessions, Duration::from_secs(1));

        let result = invoker.invoke("c1", "search-models", &args(json!({"query": "x"}))).await;
        assert_eq!(
            result,
            ToolCallResult::Error(ToolCallError::NotConnected {
                state: SessionState::Disconnected
            })
        );
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_call_sends_filled_args() {
        let transport = hub();
        let (_, invoker) = setup(transport.clone(), Duration::from_secs(1)).await;

        let result = invoker
            .invoke("c1", "search-models", &args(json!({"query": "bert", "limit": "5"})))
            .await;
        assert!(result.is_ok());
        assert_eq!(
            transport.calls(),
            vec![("search-models".to_string(), json!({"query": "bert", "limit": 5}))]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_suggests() {
        let transport = hub();
        let (_, invoker) = setup(transport.clone(), Duration::from_secs(1)).await;

        let result = invoker.invoke("c1", "unknown-tool", &Map::new()).await;
        match result.error() {
            Some(ToolCallError::NotFound { name, suggestion }) => {
                assert_eq!(name, "unknown-tool");
                let s = suggestion.as_deref().unwrap();
                assert!(s == "search-models" || s == "get-model-info");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_backend() {
        let transport = hub();
        let (_, invoker) = setup(transport.clone(), Duration::from_secs(1)).await;

        let result = invoker.invoke("c1", "search-models", &args(json!({"limit": 5}))).await;
        match result.error() {
            Some(ToolCallError::ValidationFailed(diag)) => {
                assert_eq!(diag.missing.len(), 1);
                assert_eq!(diag.missing[0].name, "query");
                assert_eq!(diag.example, r#"call search-models {"query": "<string>", "limit": 5}"#);
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_leaves_session_connected() {
        let transport = hub().with_call_delay(Duration::from_secs(5));
        let (sessions, invoker) = setup(transport, Duration::from_millis(50)).await;

        let result = invoker.invoke("c1", "search-models", &args(json!({"query": "x"}))).await;
        assert!(matches!(result.error(), Some(ToolCallError::Timeout { timeout_ms: 50, .. })));
        assert_eq!(sessions.status("c1").state, SessionState::Connected);
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_session_connected() {
        let transport = hub().with_response(
            "get-model-info",
            Err(TransportFault::Server {
                code: -32000,
                message: "model not found".into(),
            }),
        );
        let (sessions, invoker) = setup(transport, Duration::from_secs(1)).await;

        let result = invoker.invoke("c1", "get-model-info", &args(json!({"model_id": "m"}))).await;
        match result.error() {
            Some(ToolCallError::TransportFailure { detail, retryable, .. }) => {
                assert!(detail.contains("model not found"));
                assert!(!retryable);
            }
            other => panic!("expected TransportFailure, got {other:?}"),
        }
        assert_eq!(sessions.status("c1").state, SessionState::Connected);
    }

    #[tokio::test]
    async fn test_disconnect_during_call_cancels() {
        let transport = hub().with_call_delay(Duration::from_secs(2));
        let (sessions, invoker) = setup(transport, Duration::from_secs(10)).await;
        let invoker = Arc::new(invoker);

        let pending = {
            let invoker = invoker.clone();
            tokio::spawn(async move {
                invoker
                    .invoke("c1", "search-models", &args(json!({"query": "x"})))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        sessions.disconnect("c1").await.unwrap();

        let result = pending.await.unwrap();
        assert!(matches!(result.error(), Some(ToolCallError::Cancelled { .. })));
        assert_eq!(sessions.status("c1").state, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_call_waits_for_pending_connect() {
        let transport = hub();
        let connector = ScriptedConnector::new(transport.clone()).with_open_delay(Duration::from_millis(200));
        let sessions = Arc::new(SessionManager::new(Arc::new(connector), Duration::from_secs(5)));
        let invoker = ToolInvoker::new(sessions.clone(), Duration::from_secs(1));

        let connecting = {
            let sessions = sessions.clone();
            tokio::spawn(async move { sessions.connect("c1", "http://hub/mcp", None).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sessions.status("c1").state, SessionState::Connecting);

        let result = invoker.invoke("c1", "search-models", &args(json!({"query": "x"}))).await;
        assert!(result.is_ok(), "{result:?}");
        assert_eq!(transport.call_count(), 1);
        assert!(connecting.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_calls_on_one_key_are_serialized() {
        let transport = hub().with_call_delay(Duration::from_millis(100));
        let (_, invoker) = setup(transport.clone(), Duration::from_secs(5)).await;
        let invoker = Arc::new(invoker);

        let started = Instant::now();
        let a = {
            let invoker = invoker.clone();
            tokio::spawn(async move { invoker.invoke("c1", "search-models", &args(json!({"query": "a"}))).await })
        };
        let b = {
            let invoker = invoker.clone();
            tokio::spawn(async move { invoker.invoke("c1", "search-models", &args(json!({"query": "b"}))).await })
        };
        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert_eq!(transport.call_count(), 2);
    }
}
