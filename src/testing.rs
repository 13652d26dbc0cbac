//! In-memory transport doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::schema::{RawToolDescriptor, SchemaProvider};
use crate::transport::{Connector, Credential, Transport, TransportFault};

// ─── ScriptedTransport ───────────────────────────────────────────────────────

#[derive(Default)]
struct Script {
    tools: Vec<RawToolDescriptor>,
    responses: HashMap<String, Result<Value, TransportFault>>,
    call_delay: Option<Duration>,
    list_delay: Option<Duration>,
    list_fault: Option<TransportFault>,
    calls: Vec<(String, Value)>,
}

/// A backend whose tools and replies are fixed up front. Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
    call_count: Arc<AtomicUsize>,
    close_count: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an MCP-style tool whose `inputSchema` is `schema`.
    pub fn with_tool(self, name: &str, schema: Value) -> Self {
        let raw = json!({"name": name, "description": format!("The {name} tool"), "inputSchema": schema});
        self.with_raw_tool(name, raw)
    }

    /// Add a tool with an arbitrary descriptor shape.
    pub fn with_raw_tool(self, name: &str, raw: Value) -> Self {
        self.lock().tools.push(RawToolDescriptor::inline(name, raw));
        self
    }

    pub fn with_provided_tool(self, name: &str, provider: SchemaProvider) -> Self {
        self.lock().tools.push(RawToolDescriptor::provided(name, provider));
        self
    }

    pub fn with_response(self, tool: &str, response: Result<Value, TransportFault>) -> Self {
        self.lock().responses.insert(tool.to_string(), response);
        self
    }

    pub fn with_call_delay(self, delay: Duration) -> Self {
        self.lock().call_delay = Some(delay);
        self
    }

    pub fn with_list_delay(self, delay: Duration) -> Self {
        self.lock().list_delay = Some(delay);
        self
    }

    pub fn with_list_fault(self, fault: TransportFault) -> Self {
        self.lock().list_fault = Some(fault);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// `(tool, args)` of every call received, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn list_tools(&self) -> Result<Vec<RawToolDescriptor>, TransportFault> {
        let delay = self.lock().list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let script = self.lock();
        match script.list_fault {
            Some(ref fault) => Err(fault.clone()),
            None => Ok(script.tools.clone()),
        }
    }

    async fn call_tool(&self, name: &str, args: Value, timeout: Duration) -> Result<Value, TransportFault> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let (delay, response) = {
            let mut script = self.lock();
            script.calls.push((name.to_string(), args.clone()));
            let response = script.responses.get(name).cloned().unwrap_or_else(|| {
                Ok(json!({"content": [{"type": "text", "text": format!("{name} called with {args}")}]}))
            });
            (script.call_delay, response)
        };

        if let Some(delay) = delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(TransportFault::Timeout {
                    operation: "tools/call".into(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(delay).await;
        }
        response
    }

    async fn close(&self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

// ─── ScriptedConnector ───────────────────────────────────────────────────────

/// Hands out one [`ScriptedTransport`], or fails with a fixed fault.
pub struct ScriptedConnector {
    transport: ScriptedTransport,
    fault: Option<TransportFault>,
    open_delay: Duration,
    opens: AtomicUsize,
    credentials: Mutex<Vec<Option<Credential>>>,
}

impl ScriptedConnector {
    pub fn new(transport: ScriptedTransport) -> Self {
        Self {
            transport,
            fault: None,
            open_delay: Duration::ZERO,
            opens: AtomicUsize::new(0),
            credentials: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(fault: TransportFault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::new(ScriptedTransport::new())
        }
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Credential presented on each open, in order.
    pub fn credentials(&self) -> Vec<Option<Credential>> {
        self.credentials.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(
        &self,
        _endpoint: &str,
        credential: Option<&Credential>,
    ) -> Result<Arc<dyn Transport>, TransportFault> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.credentials.lock().unwrap().push(credential.cloned());
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        match self.fault {
            Some(ref fault) => Err(fault.clone()),
            None => Ok(Arc::new(self.transport.clone())),
        }
    }
}
