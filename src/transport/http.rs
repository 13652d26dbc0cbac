//! MCP over streamable HTTP.
//!
//! Each JSON-RPC request is an HTTP POST to the endpoint. The server answers
//! with either a JSON body or an SSE stream carrying the response. The
//! `Mcp-Session-Id` header returned by `initialize` is echoed on every later
//! request, and a DELETE ends the server-side session on close.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::{json, Value};

use crate::schema::RawToolDescriptor;

use super::errors::TransportFault;
use super::jsonrpc::{extract_result, next_request_id, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use super::sse::sse_messages;
use super::{Connector, Credential, Transport};

// ─── Constants ───────────────────────────────────────────────────────────────

const SESSION_HEADER: &str = "Mcp-Session-Id";

const PROTOCOL_VERSION: &str = "2025-03-26";

/// Upper bound on `tools/list` pages followed via `nextCursor`.
const MAX_LIST_PAGES: usize = 50;

// ─── HttpConnector ───────────────────────────────────────────────────────────

/// Opens [`HttpTransport`]s. One shared HTTP client, many sessions.
pub struct HttpConnector {
    http: HttpClient,
    connect_timeout: Duration,
}

impl HttpConnector {
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportFault> {
        let http = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportFault::Connection {
                endpoint: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            connect_timeout,
        })
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn open(
        &self,
        endpoint: &str,
        credential: Option<&Credential>,
    ) -> Result<Arc<dyn Transport>, TransportFault> {
        let transport = HttpTransport {
            http: self.http.clone(),
            endpoint: endpoint.to_string(),
            bearer: credential.map(|c| c.token().to_string()),
            session_id: RwLock::new(None),
            list_timeout: self.connect_timeout,
        };

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "toolrelay", "version": env!("CARGO_PKG_VERSION")},
        });
        let init = transport
            .request("initialize", Some(params), self.connect_timeout)
            .await?;

        let server = init
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let protocol = init
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(PROTOCOL_VERSION);
        tracing::info!(endpoint, server, protocol, "MCP session initialized");

        transport.notify("notifications/initialized").await?;
        Ok(Arc::new(transport))
    }
}

// ─── HttpTransport ───────────────────────────────────────────────────────────

/// One MCP session with an HTTP backend.
pub struct HttpTransport {
    http: HttpClient,
    endpoint: String,
    bearer: Option<String>,
    session_id: RwLock<Option<String>>,
    /// Per-page bound for `tools/list`.
    list_timeout: Duration,
}

impl HttpTransport {
    fn post(&self, body: &impl serde::Serialize) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(ref token) = self.bearer {
            req = req.bearer_auth(token);
        }
        if let Some(id) = self.current_session_id() {
            req = req.header(SESSION_HEADER, id);
        }
        req
    }

    fn current_session_id(&self) -> Option<String> {
        self.session_id.read().ok().and_then(|g| g.clone())
    }

    /// Send a request and wait for its response, bounded by `timeout`.
    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, TransportFault> {
        match tokio::time::timeout(timeout, self.round_trip(method, params)).await {
            Ok(result) => result,
            Err(_) => Err(TransportFault::Timeout {
                operation: method.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn round_trip(&self, method: &str, params: Option<Value>) -> Result<Value, TransportFault> {
        let id = next_request_id();
        let req = JsonRpcRequest::new(id, method, params);

        let response = self
            .post(&req)
            .send()
            .await
            .map_err(|e| self.classify(method, e))?;
        let response = self.check_status(response).await?;

        if let Some(sid) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if let Ok(mut slot) = self.session_id.write() {
                *slot = Some(sid.to_string());
            }
        }

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let rpc = if is_sse {
            self.await_sse_response(response, id).await?
        } else {
            response
                .json::<JsonRpcResponse>()
                .await
                .map_err(|e| TransportFault::Protocol {
                    reason: format!("invalid JSON-RPC response to '{method}': {e}"),
                })?
        };

        extract_result(rpc)
    }

    /// Scan the event stream for the response matching `id`.
    async fn await_sse_response(
        &self,
        response: reqwest::Response,
        id: u64,
    ) -> Result<JsonRpcResponse, TransportFault> {
        let mut messages = Box::pin(sse_messages(response.bytes_stream()));
        while let Some(msg) = messages.next().await {
            let msg = msg?;
            match serde_json::from_value::<JsonRpcResponse>(msg) {
                Ok(resp) if resp.id == id => return Ok(resp),
                // Server notifications or responses to other requests
                _ => continue,
            }
        }
        Err(TransportFault::Protocol {
            reason: format!("event stream ended without a response to request {id}"),
        })
    }

    async fn notify(&self, method: &str) -> Result<(), TransportFault> {
        let note = JsonRpcNotification::new(method, None);
        let response = self
            .post(&note)
            .send()
            .await
            .map_err(|e| self.classify(method, e))?;
        self.check_status(response).await?;
        Ok(())
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response, TransportFault> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TransportFault::Unauthorized {
                reason: format!("HTTP {}", status.as_u16()),
            }),
            _ => Err(TransportFault::Server {
                code: i32::from(status.as_u16()),
                message: crate::truncate_chars(&body, 200).to_string(),
            }),
        }
    }

    fn classify(&self, method: &str, err: reqwest::Error) -> TransportFault {
        if err.is_timeout() {
            TransportFault::Timeout {
                operation: method.to_string(),
                timeout_ms: 0,
            }
        } else {
            TransportFault::Connection {
                endpoint: self.endpoint.clone(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn list_tools(&self) -> Result<Vec<RawToolDescriptor>, TransportFault> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.as_ref().map(|c| json!({"cursor": c}));
            let result = self.request("tools/list", params, self.list_timeout).await?;

            let entries = result
                .get("tools")
                .and_then(Value::as_array)
                .ok_or_else(|| TransportFault::Protocol {
                    reason: "tools/list result has no 'tools' array".into(),
                })?;
            for entry in entries {
                match entry.get("name").and_then(Value::as_str) {
                    Some(name) => tools.push(RawToolDescriptor::inline(name, entry.clone())),
                    None => tracing::warn!(endpoint = %self.endpoint, "skipping tool without a name"),
                }
            }

            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        Ok(tools)
    }

    async fn call_tool(&self, name: &str, args: Value, timeout: Duration) -> Result<Value, TransportFault> {
        let params = json!({"name": name, "arguments": args});
        self.request("tools/call", Some(params), timeout).await
    }

    async fn close(&self) {
        let Some(sid) = self.current_session_id() else {
            return;
        };
        let mut req = self.http.delete(&self.endpoint).header(SESSION_HEADER, sid);
        if let Some(ref token) = self.bearer {
            req = req.bearer_auth(token);
        }
        if let Err(e) = req.send().await {
            tracing::debug!(endpoint = %self.endpoint, error = %e, "session DELETE failed");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
