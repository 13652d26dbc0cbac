//! Session Manager: one connection state machine per conversation key.
//!
//! Concurrency model:
//! - The registry map is guarded by its own short-lived `std::sync::Mutex`.
//! - Each key has a FIFO async mutex serializing `connect`, `disconnect`
//!   and invocations in arrival order. Different keys never contend.
//! - The session record sits behind a `RwLock` that is never held across
//!   an `.await`, so `status()` is a cheap consistent snapshot.
//! - A generation counter on a `watch` channel is bumped by `disconnect`
//!   before it queues; pending operations observe the bump and resolve as
//!   cancelled.
//! - A key's slot is dropped from the registry once it is disconnected and
//!   no pending operation still holds it.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{watch, OwnedMutexGuard};

use crate::command::AuthFlag;
use crate::schema::ToolDescriptor;
use crate::transport::{Connector, Credential, Transport, TransportFault};

use super::catalog::ToolCatalog;
use super::errors::SessionError;
use super::types::{ConnectSummary, Session, SessionState, SessionStatus, SkippedTool};

// ─── Constants ───────────────────────────────────────────────────────────────

/// States remembered per key for diagnostics.
const HISTORY_CAPACITY: usize = 64;

/// Bound on the best-effort transport close during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ─── SessionSlot ─────────────────────────────────────────────────────────────

/// Everything the manager keeps for one conversation key.
struct SessionSlot {
    key: String,
    ops: Arc<tokio::sync::Mutex<()>>,
    session: RwLock<Session>,
    generation: watch::Sender<u64>,
    connecting: AtomicBool,
    history: Mutex<VecDeque<SessionState>>,
}

impl SessionSlot {
    fn new(key: &str) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            key: key.to_string(),
            ops: Arc::new(tokio::sync::Mutex::new(())),
            session: RwLock::new(Session::default()),
            generation,
            connecting: AtomicBool::new(false),
            history: Mutex::new(VecDeque::from([SessionState::Disconnected])),
        }
    }

    // A poisoned lock only means a panic elsewhere; the record itself stays usable.
    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(|e| e.into_inner())
    }

    fn current_generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Move along one edge of the state machine.
    fn transition(&self, session: &mut Session, to: SessionState) -> Result<(), SessionError> {
        let from = session.state;
        if !from.can_transition(to) {
            tracing::warn!(key = %self.key, %from, %to, "refused invalid session transition");
            return Err(SessionError::InvalidTransition { from, to });
        }
        session.state = to;

        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        if history.len() == HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(to);

        tracing::info!(key = %self.key, %from, %to, "session transition");
        Ok(())
    }

    /// Release the connection and return to `Disconnected`.
    async fn teardown(&self) -> Result<Option<SessionState>, SessionError> {
        let (previous, transport) = {
            let mut session = self.write();
            let previous = session.state;
            let transport = session.release();
            session.last_error = None;
            if previous != SessionState::Disconnected {
                self.transition(&mut session, SessionState::Disconnected)?;
            }
            (previous, transport)
        };

        if let Some(transport) = transport {
            if tokio::time::timeout(CLOSE_TIMEOUT, transport.close()).await.is_err() {
                tracing::warn!(key = %self.key, "transport close timed out");
            }
        }

        Ok((previous != SessionState::Disconnected).then_some(previous))
    }
}

/// Clears the in-flight connect flag on every exit path.
struct ConnectingGuard<'a>(&'a AtomicBool);

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ─── InvokeLease ─────────────────────────────────────────────────────────────

/// Exclusive use of a connected session for one invocation.
///
/// Holds the key's serialization lock until dropped.
pub struct InvokeLease {
    _guard: OwnedMutexGuard<()>,
    slot: Arc<SessionSlot>,
    transport: Arc<dyn Transport>,
    catalog: Arc<ToolCatalog>,
    cancel: watch::Receiver<u64>,
    generation: u64,
    suggestion_max_distance: Option<usize>,
}

impl InvokeLease {
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn lookup_tool(&self, name: &str) -> Result<ToolDescriptor, SessionError> {
        lookup_in(&self.catalog, name, self.suggestion_max_distance)
    }

    /// Resolves once the session has been disconnected since the lease was taken.
    pub async fn cancelled(&mut self) {
        let generation = self.generation;
        // The sender lives in the slot we hold, so this cannot error early.
        let _ = self.cancel.wait_for(|g| *g != generation).await;
    }

    /// False once a disconnect has been requested; results must be discarded.
    pub fn is_current(&self) -> bool {
        self.slot.current_generation() == self.generation
    }
}

fn lookup_in(
    catalog: &ToolCatalog,
    name: &str,
    max_distance: Option<usize>,
) -> Result<ToolDescriptor, SessionError> {
    catalog
        .get(name)
        .cloned()
        .ok_or_else(|| SessionError::ToolNotFound {
            name: name.to_string(),
            suggestion: catalog.closest(name, max_distance),
        })
}

// ─── SessionManager ──────────────────────────────────────────────────────────

/// Owns every conversation's session.
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    slots: Mutex<HashMap<String, Arc<SessionSlot>>>,
    connect_timeout: Duration,
    suggestion_max_distance: Option<usize>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn Connector>, connect_timeout: Duration) -> Self {
        Self {
            connector,
            slots: Mutex::new(HashMap::new()),
            connect_timeout,
            suggestion_max_distance: None,
        }
    }

    /// Only suggest tool names within this edit distance.
    pub fn with_suggestion_max_distance(mut self, max: Option<usize>) -> Self {
        self.suggestion_max_distance = max;
        self
    }

    fn slot(&self, key: &str) -> Option<Arc<SessionSlot>> {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn slot_or_create(&self, key: &str) -> Arc<SessionSlot> {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(SessionSlot::new(key)))
            .clone()
    }

    // ─── connect ─────────────────────────────────────────────────────────

    /// Connect `key` to `endpoint`, replacing any existing connection.
    pub async fn connect(
        &self,
        key: &str,
        endpoint: &str,
        auth: Option<&AuthFlag>,
    ) -> Result<ConnectSummary, SessionError> {
        let slot = self.slot_or_create(key);

        if slot
            .connecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!(key, "connect rejected: another connect is in flight");
            return Err(SessionError::Busy);
        }
        let _connecting = ConnectingGuard(&slot.connecting);

        let arrival = slot.current_generation();
        let mut cancel = slot.generation.subscribe();
        let _ops = slot.ops.clone().lock_owned().await;
        if slot.current_generation() != arrival {
            return Err(SessionError::Cancelled);
        }

        let credential = resolve_credential(auth)?;

        let replaced = slot.read().state == SessionState::Connected;
        if replaced {
            tracing::info!(key, "replacing existing connection");
            slot.teardown().await?;
        }

        {
            let mut session = slot.write();
            slot.transition(&mut session, SessionState::Connecting)?;
            session.last_error = None;
        }

        tracing::info!(key, endpoint, has_token = credential.is_some(), "connecting");

        let outcome = self
            .establish(key, endpoint, credential.as_ref(), &mut cancel, arrival)
            .await;

        let mut session = slot.write();
        match outcome {
            Ok((transport, catalog, skipped)) => {
                let tool_count = catalog.len();
                session.endpoint = Some(endpoint.to_string());
                session.credential = credential;
                session.catalog = Some(Arc::new(catalog));
                session.transport = Some(transport);
                session.connected_at = Some(chrono::Utc::now());
                slot.transition(&mut session, SessionState::Connected)?;

                tracing::info!(key, endpoint, tool_count, skipped = skipped.len(), "connected");
                Ok(ConnectSummary {
                    endpoint: endpoint.to_string(),
                    tool_count,
                    has_token: session.credential.is_some(),
                    replaced,
                    skipped,
                })
            }
            Err(e) => {
                tracing::warn!(key, endpoint, error = %e, "connect failed");
                session.last_error = Some(e.to_string());
                slot.transition(&mut session, SessionState::Failed)?;
                Err(e)
            }
        }
    }

    /// Open the transport and load its catalog within the connect timeout.
    ///
    /// A transport that was opened is closed again on every failure path,
    /// including timeout and cancellation by `disconnect`.
    async fn establish(
        &self,
        key: &str,
        endpoint: &str,
        credential: Option<&Credential>,
        cancel: &mut watch::Receiver<u64>,
        arrival: u64,
    ) -> Result<(Arc<dyn Transport>, ToolCatalog, Vec<SkippedTool>), SessionError> {
        let deadline = tokio::time::Instant::now() + self.connect_timeout;

        let transport = tokio::select! {
            opened = tokio::time::timeout_at(deadline, self.connector.open(endpoint, credential)) => match opened {
                Ok(result) => result.map_err(|fault| map_fault(endpoint, fault))?,
                Err(_) => return Err(self.connect_timed_out(endpoint)),
            },
            _ = cancel.wait_for(|g| *g != arrival) => return Err(SessionError::Cancelled),
        };

        let loaded = tokio::select! {
            listed = tokio::time::timeout_at(deadline, load_catalog(transport.as_ref(), endpoint)) => match listed {
                Ok(result) => result,
                Err(_) => Err(self.connect_timed_out(endpoint)),
            },
            _ = cancel.wait_for(|g| *g != arrival) => Err(SessionError::Cancelled),
        };

        match loaded {
            Ok((catalog, skipped)) => Ok((transport, catalog, skipped)),
            Err(e) => {
                close_bounded(key, transport.as_ref()).await;
                Err(e)
            }
        }
    }

    fn connect_timed_out(&self, endpoint: &str) -> SessionError {
        SessionError::ConnectFailed {
            endpoint: endpoint.to_string(),
            reason: format!("timed out after {}ms", self.connect_timeout.as_millis()),
        }
    }

    // ─── disconnect ──────────────────────────────────────────────────────

    /// Disconnect `key`. Returns the state left behind, or `None` if the key
    /// was already disconnected.
    pub async fn disconnect(&self, key: &str) -> Result<Option<SessionState>, SessionError> {
        let Some(slot) = self.slot(key) else {
            return Ok(None);
        };

        // Signal before queueing so pending work can bail out
        slot.generation.send_modify(|g| *g += 1);
        let ops = slot.ops.clone().lock_owned().await;

        let previous = slot.teardown().await?;
        if let Some(state) = previous {
            tracing::info!(key, from = %state, "disconnected");
        }

        drop(ops);
        self.release_slot(key, slot);
        Ok(previous)
    }

    /// Forget a disconnected slot unless someone else still holds it.
    fn release_slot(&self, key: &str, slot: Arc<SessionSlot>) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let unshared = slots
            .get(key)
            .is_some_and(|held| Arc::ptr_eq(held, &slot) && Arc::strong_count(&slot) == 2);
        if unshared && slot.read().state == SessionState::Disconnected {
            slots.remove(key);
            tracing::debug!(key, remaining = slots.len(), "session slot released");
        }
    }

    /// Number of keys currently holding a session record.
    pub fn session_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    /// Snapshot of the session. Never blocks on I/O.
    pub fn status(&self, key: &str) -> SessionStatus {
        let Some(slot) = self.slot(key) else {
            return SessionStatus::default();
        };
        let status = slot.read().status();
        status
    }

    /// Exact, case-sensitive tool lookup on a connected session.
    pub fn lookup_tool(&self, key: &str, name: &str) -> Result<ToolDescriptor, SessionError> {
        let catalog = self.connected_catalog(key)?;
        lookup_in(&catalog, name, self.suggestion_max_distance)
    }

    /// The cached catalog, sorted by name.
    pub fn list_tools(&self, key: &str) -> Result<Vec<ToolDescriptor>, SessionError> {
        let catalog = self.connected_catalog(key)?;
        Ok(catalog.sorted().into_iter().cloned().collect())
    }

    /// States observed for `key`, oldest first, starting at `Disconnected`.
    pub fn state_history(&self, key: &str) -> Vec<SessionState> {
        let Some(slot) = self.slot(key) else {
            return vec![SessionState::Disconnected];
        };
        let history = slot.history.lock().unwrap_or_else(|e| e.into_inner());
        history.iter().copied().collect()
    }

    fn connected_catalog(&self, key: &str) -> Result<Arc<ToolCatalog>, SessionError> {
        let slot = self.slot(key).ok_or(SessionError::NotConnected {
            state: SessionState::Disconnected,
        })?;
        let session = slot.read();
        match (session.state, &session.catalog) {
            (SessionState::Connected, Some(catalog)) => Ok(catalog.clone()),
            (state, _) => Err(SessionError::NotConnected { state }),
        }
    }

    // ─── Invocation ──────────────────────────────────────────────────────

    /// Wait for this key's turn and take a lease on its connection.
    pub async fn lease(&self, key: &str) -> Result<InvokeLease, SessionError> {
        let slot = self.slot(key).ok_or(SessionError::NotConnected {
            state: SessionState::Disconnected,
        })?;

        let arrival = slot.current_generation();
        let cancel = slot.generation.subscribe();
        let guard = slot.ops.clone().lock_owned().await;
        if slot.current_generation() != arrival {
            return Err(SessionError::Cancelled);
        }

        let (transport, catalog) = {
            let session = slot.read();
            match (session.state, &session.transport, &session.catalog) {
                (SessionState::Connected, Some(t), Some(c)) => (t.clone(), c.clone()),
                (state, _, _) => return Err(SessionError::NotConnected { state }),
            }
        };

        Ok(InvokeLease {
            _guard: guard,
            slot,
            transport,
            catalog,
            cancel,
            generation: arrival,
            suggestion_max_distance: self.suggestion_max_distance,
        })
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn resolve_credential(auth: Option<&AuthFlag>) -> Result<Option<Credential>, SessionError> {
    match auth {
        None => Ok(None),
        Some(AuthFlag::Token(token)) => Ok(Some(Credential::bearer(token.clone()))),
        Some(AuthFlag::EnvVar(var)) => match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(Some(Credential::bearer(value.trim()))),
            _ => Err(SessionError::Unauthorized {
                reason: format!("Environment variable {var} not found or empty"),
            }),
        },
    }
}

/// Fetch and normalize the tools of an opened transport.
async fn load_catalog(
    transport: &dyn Transport,
    endpoint: &str,
) -> Result<(ToolCatalog, Vec<SkippedTool>), SessionError> {
    let raw = transport
        .list_tools()
        .await
        .map_err(|fault| map_fault(endpoint, fault))?;

    let (catalog, skipped) = ToolCatalog::build(&raw);
    if !raw.is_empty() && catalog.is_empty() {
        return Err(SessionError::ConnectFailed {
            endpoint: endpoint.to_string(),
            reason: format!("none of the {} listed tools has a usable schema", raw.len()),
        });
    }

    Ok((catalog, skipped))
}

async fn close_bounded(key: &str, transport: &dyn Transport) {
    if tokio::time::timeout(CLOSE_TIMEOUT, transport.close()).await.is_err() {
        tracing::warn!(key, "transport close timed out");
    }
}

fn map_fault(endpoint: &str, fault: TransportFault) -> SessionError {
    match fault {
        TransportFault::Unauthorized { reason } => SessionError::Unauthorized { reason },
        other => SessionError::ConnectFailed {
            endpoint: endpoint.to_string(),
            reason: other.to_string(),
        },
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
