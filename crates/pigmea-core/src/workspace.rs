// ── Workspace facade ──
//
// One per process. Owns the three record stores with their mutation gates
// and realtime bridges, the history sink, and the push connection. Consumers
// reach everything through `clients()`, `sales_reps()` and `orders()`.

use std::sync::Arc;

use pigmea_api::{BackendClient, PushFrame, PushHandle};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::audit::{
    HistoryRecorder, HistorySink, MemoryHistorySink, NoOpHistorySink, TracingHistorySink,
};
use crate::backend::{EntityBackend, HttpBackend};
use crate::config::{CoreConfig, HistoryMode};
use crate::error::CoreError;
use crate::model::{Client, Entity, EntityId, Order, SalesRep};
use crate::mutation::{BulkOutcome, MutationGate};
use crate::realtime::RealtimeBridge;
use crate::store::EntityStore;
use crate::validation::{AsyncValidationGuard, UniqueFieldCheck, ValidationConfig};

// ── Repository ───────────────────────────────────────────────────────

/// Everything one record kind needs: its store, write path, push bridge
/// and uniqueness guard factory.
pub struct Repository<K: Entity> {
    store: EntityStore<K>,
    gate: MutationGate<K>,
    bridge: RealtimeBridge<K>,
    validation: ValidationConfig,
}

impl<K: Entity> Clone for Repository<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gate: self.gate.clone(),
            bridge: self.bridge.clone(),
            validation: self.validation.clone(),
        }
    }
}

impl<K: Entity> Repository<K> {
    fn new(
        backend: Arc<dyn EntityBackend<K>>,
        history: HistoryRecorder,
        validation: ValidationConfig,
    ) -> Self {
        let store = EntityStore::new(backend);
        Self {
            gate: MutationGate::new(store.clone()).with_history(history),
            bridge: RealtimeBridge::new(store.clone()),
            store,
            validation,
        }
    }

    pub fn store(&self) -> &EntityStore<K> {
        &self.store
    }

    pub fn mutations(&self) -> &MutationGate<K> {
        &self.gate
    }

    pub fn bridge(&self) -> &RealtimeBridge<K> {
        &self.bridge
    }

    pub async fn ensure_initialized(&self) -> Result<(), CoreError> {
        self.store.ensure_initialized().await
    }

    pub async fn create(&self, input: &K::Create) -> Result<K, CoreError> {
        self.gate.create(input).await
    }

    pub async fn update(&self, id: &EntityId, patch: &K::Patch) -> Result<K, CoreError> {
        self.gate.update(id, patch).await
    }

    pub async fn remove(&self, id: &EntityId) -> Result<(), CoreError> {
        self.gate.remove(id).await
    }

    pub async fn archive(&self, id: &EntityId) -> Result<K, CoreError> {
        self.gate.archive(id).await
    }

    pub async fn update_many(
        &self,
        ids: &[EntityId],
        patch: &K::Patch,
        description: &str,
    ) -> BulkOutcome {
        self.gate.update_many(ids, patch, description).await
    }

    pub async fn remove_many(&self, ids: &[EntityId]) -> BulkOutcome {
        self.gate.remove_many(ids).await
    }

    /// A fresh guard over this kind's unique field, using the workspace's
    /// validation settings.
    pub fn uniqueness_guard(&self) -> AsyncValidationGuard {
        self.uniqueness_guard_with(self.validation.clone())
    }

    pub fn uniqueness_guard_with(&self, config: ValidationConfig) -> AsyncValidationGuard {
        let check = UniqueFieldCheck::new(Arc::clone(self.store.backend()));
        AsyncValidationGuard::new(Arc::new(check), config)
    }
}

// ── Workspace ────────────────────────────────────────────────────────

/// The per-kind backends a workspace is assembled from.
pub struct Backends {
    pub clients: Arc<dyn EntityBackend<Client>>,
    pub sales_reps: Arc<dyn EntityBackend<SalesRep>>,
    pub orders: Arc<dyn EntityBackend<Order>>,
}

impl Backends {
    /// All three kinds over one HTTP client.
    pub fn http(client: BackendClient) -> Self {
        let backend = Arc::new(HttpBackend::new(client));
        Self {
            clients: backend.clone(),
            sales_reps: backend.clone(),
            orders: backend,
        }
    }
}

/// Process-wide entry point. Cheaply cloneable via `Arc<WorkspaceInner>`.
#[derive(Clone)]
pub struct Workspace {
    inner: Arc<WorkspaceInner>,
}

struct WorkspaceInner {
    config: CoreConfig,
    clients: Repository<Client>,
    sales_reps: Repository<SalesRep>,
    orders: Repository<Order>,
    history: Arc<dyn HistorySink>,
    memory_history: Option<Arc<MemoryHistorySink>>,
    cancel: CancellationToken,
    /// Child token for the current push connection; replaced on reconnect.
    push_cancel: Mutex<CancellationToken>,
    push_handle: Mutex<Option<PushHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Workspace {
    /// Build a workspace talking HTTP to `config.backend_url`. Does not
    /// fetch anything: stores load lazily on first `ensure_initialized`.
    pub fn new(config: CoreConfig) -> Result<Self, CoreError> {
        let client = BackendClient::new(config.backend_url.as_str(), &config.transport())?;
        Ok(Self::with_backends(config, Backends::http(client)))
    }

    /// Build a workspace over arbitrary backends.
    pub fn with_backends(config: CoreConfig, backends: Backends) -> Self {
        let (history, memory_history): (Arc<dyn HistorySink>, _) = match config.history {
            HistoryMode::Memory => {
                let sink = Arc::new(MemoryHistorySink::new(config.history_capacity));
                let shared: Arc<dyn HistorySink> = sink.clone();
                (shared, Some(sink))
            }
            HistoryMode::Log => (Arc::new(TracingHistorySink), None),
            HistoryMode::Off => (Arc::new(NoOpHistorySink), None),
        };
        let recorder = HistoryRecorder::new(Arc::clone(&history), config.audit.clone());

        let cancel = CancellationToken::new();
        let push_cancel = cancel.child_token();

        Self {
            inner: Arc::new(WorkspaceInner {
                clients: Repository::new(
                    backends.clients,
                    recorder.clone(),
                    config.validation.clone(),
                ),
                sales_reps: Repository::new(
                    backends.sales_reps,
                    recorder.clone(),
                    config.validation.clone(),
                ),
                orders: Repository::new(backends.orders, recorder, config.validation.clone()),
                history,
                memory_history,
                cancel,
                push_cancel: Mutex::new(push_cancel),
                push_handle: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn clients(&self) -> &Repository<Client> {
        &self.inner.clients
    }

    pub fn sales_reps(&self) -> &Repository<SalesRep> {
        &self.inner.sales_reps
    }

    pub fn orders(&self) -> &Repository<Order> {
        &self.inner.orders
    }

    pub fn history_sink(&self) -> &Arc<dyn HistorySink> {
        &self.inner.history
    }

    /// The queryable history, when the workspace records to memory.
    pub fn memory_history(&self) -> Option<&Arc<MemoryHistorySink>> {
        self.inner.memory_history.as_ref()
    }

    /// Load all three stores concurrently.
    pub async fn initialize_all(&self) -> Result<(), CoreError> {
        tokio::try_join!(
            self.inner.clients.ensure_initialized(),
            self.inner.sales_reps.ensure_initialized(),
            self.inner.orders.ensure_initialized(),
        )?;
        Ok(())
    }

    // ── Push lifecycle ───────────────────────────────────────────────

    /// Open the push stream and start one bridge per kind.
    ///
    /// No-op when push is disabled or already connected. The connection
    /// itself is established (and re-established) in the background.
    pub async fn connect_push(&self) -> Result<(), CoreError> {
        if !self.inner.config.push_enabled {
            debug!("push disabled by configuration");
            return Ok(());
        }
        let mut slot = self.inner.push_handle.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        let url = self.inner.config.resolved_push_url()?;
        let cancel = self.fresh_push_token().await;
        let handle = PushHandle::spawn(
            url.clone(),
            self.inner.config.push_headers(),
            self.inner.config.reconnect.clone(),
            cancel.clone(),
        );
        self.spawn_bridges(|| handle.subscribe(), &cancel).await;
        *slot = Some(handle);

        info!(url = %url, "push stream spawned");
        Ok(())
    }

    /// Feed frames from an external source (another transport, a test
    /// harness) through the bridges.
    pub async fn attach_frames(&self, source: &broadcast::Sender<Arc<PushFrame>>) {
        let cancel = self.inner.push_cancel.lock().await.clone();
        self.spawn_bridges(|| source.subscribe(), &cancel).await;
    }

    /// Stop the push stream and bridges. Stores keep their data; a later
    /// `connect_push` starts a fresh connection.
    pub async fn disconnect_push(&self) {
        self.inner.push_cancel.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        if let Some(handle) = self.inner.push_handle.lock().await.take() {
            handle.shutdown();
        }
        self.fresh_push_token().await;
        debug!("push disconnected");
    }

    /// Tear everything down. The workspace is unusable for push afterwards.
    pub async fn shutdown(&self) {
        self.disconnect_push().await;
        self.inner.cancel.cancel();
        info!("workspace shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    async fn fresh_push_token(&self) -> CancellationToken {
        let mut slot = self.inner.push_cancel.lock().await;
        if slot.is_cancelled() {
            *slot = self.inner.cancel.child_token();
        }
        slot.clone()
    }

    async fn spawn_bridges<F>(&self, subscribe: F, cancel: &CancellationToken)
    where
        F: Fn() -> broadcast::Receiver<Arc<PushFrame>>,
    {
        let spawned = [
            self.inner
                .clients
                .bridge()
                .clone()
                .spawn(subscribe(), cancel.clone()),
            self.inner
                .sales_reps
                .bridge()
                .clone()
                .spawn(subscribe(), cancel.clone()),
            self.inner
                .orders
                .bridge()
                .clone()
                .spawn(subscribe(), cancel.clone()),
        ];
        self.inner.task_handles.lock().await.extend(spawned);
    }
}
