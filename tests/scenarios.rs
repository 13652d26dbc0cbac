//! End-to-end scenarios through the public `Dispatcher` API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use toolrelay::config::RelayConfig;
use toolrelay::schema::RawToolDescriptor;
use toolrelay::session::SessionState;
use toolrelay::transport::{Connector, Credential, Transport, TransportFault};
use toolrelay::Dispatcher;

// ─── In-memory hub ───────────────────────────────────────────────────────────

#[derive(Default)]
struct HubState {
    calls: Mutex<Vec<(String, Value)>>,
    call_count: AtomicUsize,
    closed: AtomicUsize,
}

struct FakeHub {
    state: Arc<HubState>,
    call_delay: Duration,
}

#[async_trait]
impl Transport for FakeHub {
    async fn list_tools(&self) -> Result<Vec<RawToolDescriptor>, TransportFault> {
        Ok(vec![
            RawToolDescriptor::inline(
                "search-models",
                json!({
                    "name": "search-models",
                    "description": "Search models on the Hub",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "query": {"type": "string", "description": "Search text"},
                            "limit": {"type": "integer", "default": 10, "minimum": 1}
                        },
                        "required": ["query"]
                    }
                }),
            ),
            RawToolDescriptor::inline(
                "get-model-info",
                json!({
                    "name": "get-model-info",
                    "input_schema": {
                        "properties": {"model_id": {"type": "string"}},
                        "required": ["model_id"]
                    }
                }),
            ),
        ])
    }

    async fn call_tool(&self, name: &str, args: Value, _timeout: Duration) -> Result<Value, TransportFault> {
        self.state.call_count.fetch_add(1, Ordering::SeqCst);
        self.state.calls.lock().unwrap().push((name.to_string(), args.clone()));
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
        Ok(json!({"content": [{"type": "text", "text": format!("{name}: {args}")}]}))
    }

    async fn close(&self) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeConnector {
    state: Arc<HubState>,
    call_delay: Duration,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(
        &self,
        _endpoint: &str,
        _credential: Option<&Credential>,
    ) -> Result<Arc<dyn Transport>, TransportFault> {
        Ok(Arc::new(FakeHub {
            state: self.state.clone(),
            call_delay: self.call_delay,
        }))
    }
}

fn relay(call_delay: Duration) -> (Dispatcher, Arc<HubState>) {
    let state = Arc::new(HubState::default());
    let connector = FakeConnector {
        state: state.clone(),
        call_delay,
    };
    (Dispatcher::new(&RelayConfig::default(), Arc::new(connector)), state)
}

async fn connected_relay() -> (Dispatcher, Arc<HubState>) {
    let (d, state) = relay(Duration::ZERO);
    let reply = d.handle("conv", "connect https://hub.example/mcp").await;
    assert!(reply.starts_with("✅ Connected"), "{reply}");
    (d, state)
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_schema_lists_required_optional_and_example() {
    let (d, _) = connected_relay().await;
    let reply = d.handle("conv", "schema search-models").await;

    assert!(reply.contains("- **`query`** (required): `string`"), "{reply}");
    assert!(reply.contains("- **`limit`** (optional): `integer`"));
    assert!(reply.contains("Default: `10`"));
    assert!(reply.contains(r#"call search-models {"query": "<string>", "limit": 10}"#));
}

#[tokio::test]
async fn test_missing_required_names_query_and_example() {
    let (d, state) = connected_relay().await;
    let reply = d.handle("conv", r#"call search-models {"limit": 5}"#).await;

    assert!(reply.starts_with("❌ Parameter validation error for tool 'search-models'"), "{reply}");
    assert!(reply.contains("- `query`: string - Search text"));
    assert!(!reply.contains("- `limit`"));
    assert!(reply.contains(r#"call search-models {"query": "<string>", "limit": 5}"#));
    assert_eq!(state.call_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_shorthand_is_typed_before_call() {
    let (d, state) = connected_relay().await;
    let reply = d.handle("conv", r#"shorthand search-models query="bert" limit=5"#).await;

    assert!(reply.starts_with("✅ Tool call successful"), "{reply}");
    let calls = state.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![("search-models".to_string(), json!({"query": "bert", "limit": 5}))]);
}

#[tokio::test]
async fn test_disconnect_right_after_connect() {
    let (d, state) = connected_relay().await;
    let reply = d.handle("conv", "disconnect").await;
    assert!(reply.starts_with("✅ Disconnected"), "{reply}");

    let status = d.sessions().status("conv");
    assert_eq!(status.state, SessionState::Disconnected);
    assert_eq!(status.tool_count, 0);
    assert_eq!(state.closed.load(Ordering::SeqCst), 1);
    assert!(d.handle("conv", "list").await.contains("Not connected"));
}

#[tokio::test]
async fn test_unknown_tool_suggests_a_catalog_entry() {
    let (d, state) = connected_relay().await;
    let reply = d.handle("conv", "call unknown-tool {}").await;

    assert!(
        reply.contains("did you mean `search-models`?") || reply.contains("did you mean `get-model-info`?"),
        "{reply}"
    );
    assert_eq!(state.call_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invoke_before_connect_never_reaches_backend() {
    let (d, state) = relay(Duration::ZERO);
    let reply = d.handle("conv", r#"call search-models {"query": "x"}"#).await;
    assert!(reply.contains("Not connected"), "{reply}");
    assert_eq!(state.call_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_conversations_are_isolated() {
    let (d, _) = connected_relay().await;
    assert!(d.handle("other", "status").await.contains("Not connected"));
    assert!(d.handle("conv", "am i connected").await.contains("Connected to https://hub.example/mcp"));
}

#[tokio::test]
async fn test_disconnect_during_call_reports_cancelled() {
    let (d, _) = relay(Duration::from_secs(2));
    let d = Arc::new(d);
    d.handle("conv", "connect https://hub.example/mcp").await;

    let pending = {
        let d = d.clone();
        tokio::spawn(async move { d.handle("conv", r#"call get-model-info {"model_id": "bert"}"#).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    d.handle("conv", "disconnect").await;

    let reply = pending.await.unwrap();
    assert!(reply.contains("cancelled because the session was disconnected"), "{reply}");
    assert_eq!(d.sessions().status("conv").state, SessionState::Disconnected);
}

#[tokio::test]
async fn test_state_history_is_a_valid_path() {
    let (d, _) = connected_relay().await;
    d.handle("conv", "connect https://hub.example/other").await;

    let history = d.sessions().state_history("conv");
    assert_eq!(history.first(), Some(&SessionState::Disconnected));
    assert_eq!(history.last(), Some(&SessionState::Connected));
    for pair in history.windows(2) {
        assert!(pair[0].can_transition(pair[1]), "bad edge {pair:?}");
    }

    d.handle("conv", "disconnect").await;
    assert_eq!(d.sessions().session_count(), 0);
    assert_eq!(d.sessions().state_history("conv"), vec![SessionState::Disconnected]);
}
