// ── Shared entity store ──
//
// One instance per record kind. Holds the canonical ordered collection and
// its loading/error state, and publishes every transition to watch-channel
// subscribers and callback listeners.
//
// All transitions run under a single write lock. The new state is
// published and every listener is called before the lock is released, so
// listeners must not mutate the store they are registered on. Reads never
// take the write lock and are safe from inside a listener.

mod state;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::EntityBackend;
use crate::error::CoreError;
use crate::model::{Entity, EntityId};
use crate::stream::EntityStream;

pub use state::StoreState;

type Listener<K> = Arc<dyn Fn(&StoreState<K>) + Send + Sync>;
type LoadFuture = Shared<BoxFuture<'static, Result<(), CoreError>>>;

/// Where a mutation came from. Push-originated transitions stamp
/// `last_push_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Local,
    Push,
}

/// What a transition touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    None,
    Flags,
    Items,
}

// ── EntityStore ──────────────────────────────────────────────────────

/// Shared, multi-consumer cache for one record kind.
///
/// Cheaply cloneable; all clones address the same collection.
pub struct EntityStore<K: Entity> {
    inner: Arc<Inner<K>>,
}

impl<K: Entity> Clone for EntityStore<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<K: Entity> {
    backend: Arc<dyn EntityBackend<K>>,
    /// Serializes transitions, including listener notification.
    write: Mutex<()>,
    /// Canonical records in display order.
    items: Mutex<IndexMap<EntityId, Arc<K>>>,
    state: watch::Sender<StoreState<K>>,
    listeners: Mutex<BTreeMap<u64, Listener<K>>>,
    next_listener: AtomicU64,
    inflight: Mutex<Option<LoadFuture>>,
}

impl<K: Entity> EntityStore<K> {
    pub fn new(backend: Arc<dyn EntityBackend<K>>) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            inner: Arc::new(Inner {
                backend,
                write: Mutex::new(()),
                items: Mutex::new(IndexMap::new()),
                state,
                listeners: Mutex::new(BTreeMap::new()),
                next_listener: AtomicU64::new(0),
                inflight: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn backend(&self) -> &Arc<dyn EntityBackend<K>> {
        &self.inner.backend
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Load the collection once.
    ///
    /// No-op when already initialized. Concurrent callers attach to the
    /// same in-flight fetch, so the backend sees a single `list()`. On
    /// failure the error is recorded, the previous items are kept and the
    /// store stays uninitialized; call again to retry.
    pub async fn ensure_initialized(&self) -> Result<(), CoreError> {
        if self.is_initialized() {
            return Ok(());
        }
        self.load(false).await
    }

    /// Refetch the whole collection, even if already initialized.
    ///
    /// Joins a load that is already in flight instead of starting another.
    pub async fn reload(&self) -> Result<(), CoreError> {
        self.load(true).await
    }

    async fn load(&self, force: bool) -> Result<(), CoreError> {
        let load = {
            let mut slot = lock(&self.inner.inflight);
            if let Some(load) = slot.as_ref() {
                load.clone()
            } else if !force && self.is_initialized() {
                return Ok(());
            } else {
                let store = self.clone();
                let load = async move { store.run_load().await }.boxed().shared();
                *slot = Some(load.clone());
                load
            }
        };
        load.await
    }

    async fn run_load(self) -> Result<(), CoreError> {
        self.transition(Origin::Local, |_, state| {
            state.loading = true;
            state.error = None;
            Change::Flags
        });

        debug!(kind = %K::KIND, "initial load started");
        let result = self.inner.backend.list().await;

        let outcome = match result {
            Ok(records) => {
                let fetched = records.len();
                self.transition(Origin::Local, |items, state| {
                    let mut fresh = IndexMap::with_capacity(records.len());
                    for record in records {
                        fresh
                            .entry(record.id().clone())
                            .or_insert_with(|| Arc::new(record));
                    }
                    *items = fresh;
                    state.loading = false;
                    state.error = None;
                    state.initialized = true;
                    state.last_loaded_at = Some(Utc::now());
                    Change::Items
                });
                let kept = self.len();
                if kept < fetched {
                    debug!(kind = %K::KIND, dropped = fetched - kept, "duplicate ids dropped");
                }
                info!(kind = %K::KIND, count = kept, "collection loaded");
                Ok(())
            }
            Err(e) => {
                let err = CoreError::LoadFailed {
                    kind: K::KIND,
                    message: e.to_string(),
                };
                warn!(kind = %K::KIND, error = %e, "initial load failed");
                self.transition(Origin::Local, |_, state| {
                    state.loading = false;
                    state.error = Some(err.clone());
                    Change::Flags
                });
                Err(err)
            }
        };

        // Later callers must start a fresh fetch.
        lock(&self.inner.inflight).take();
        outcome
    }

    // ── Merge primitives ─────────────────────────────────────────────

    /// Insert at the front if the id is absent. Returns `true` on insertion.
    pub fn apply_create(&self, record: K) -> bool {
        self.create_from(record, Origin::Local)
    }

    /// Replace in place, keeping position. No-op if absent or unchanged.
    pub fn apply_update(&self, record: K) -> bool {
        self.update_from(record, Origin::Local)
    }

    /// Remove by id. Returns the removed record.
    pub fn apply_remove(&self, id: &EntityId) -> Option<Arc<K>> {
        self.remove_from(id, Origin::Local)
    }

    /// Archive: the record stays, with its new state. Same as `apply_update`.
    pub fn apply_soft_remove(&self, record: K) -> bool {
        self.update_from(record, Origin::Local)
    }

    pub(crate) fn create_from(&self, record: K, origin: Origin) -> bool {
        self.transition(origin, |items, _| {
            if items.contains_key(record.id()) {
                return Change::None;
            }
            items.shift_insert(0, record.id().clone(), Arc::new(record));
            Change::Items
        })
    }

    pub(crate) fn update_from(&self, record: K, origin: Origin) -> bool {
        self.transition(origin, |items, _| match items.get_mut(record.id()) {
            Some(slot) if **slot != record => {
                *slot = Arc::new(record);
                Change::Items
            }
            _ => Change::None,
        })
    }

    pub(crate) fn remove_from(&self, id: &EntityId, origin: Origin) -> Option<Arc<K>> {
        let mut removed = None;
        self.transition(origin, |items, _| {
            removed = items.shift_remove(id);
            if removed.is_some() {
                Change::Items
            } else {
                Change::None
            }
        });
        removed
    }

    /// Run one transition under the write lock, then publish and notify.
    fn transition<F>(&self, origin: Origin, apply: F) -> bool
    where
        F: FnOnce(&mut IndexMap<EntityId, Arc<K>>, &mut StoreState<K>) -> Change,
    {
        let _write = lock(&self.inner.write);
        let mut published = None;

        {
            let mut items = lock(&self.inner.items);
            self.inner.state.send_if_modified(|state| {
                let change = apply(&mut items, state);
                if change == Change::None {
                    return false;
                }
                if change == Change::Items {
                    state.items = Arc::new(items.values().cloned().collect());
                    state.total = items.len();
                    if origin == Origin::Push {
                        state.last_push_at = Some(Utc::now());
                    }
                }
                state.version += 1;
                published = Some(state.clone());
                true
            });
        }

        let Some(state) = published else {
            return false;
        };
        self.notify(&state);
        true
    }

    fn notify(&self, state: &StoreState<K>) {
        let listeners: Vec<Listener<K>> = lock(&self.inner.listeners).values().cloned().collect();
        for listener in listeners {
            listener(state);
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register a callback invoked after every transition.
    ///
    /// The callback runs while the store's write lock is held: it may read
    /// the store but must not call its mutating methods. Dropping the returned
    /// handle (or calling [`Subscription::unsubscribe`]) removes it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StoreState<K>) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).insert(id, Arc::new(callback));

        let weak: Weak<Inner<K>> = Arc::downgrade(&self.inner);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner.listeners).remove(&id);
                }
            })),
        }
    }

    /// Watch-channel subscription to the published state.
    pub fn watch(&self) -> EntityStream<K> {
        EntityStream::new(self.inner.state.subscribe())
    }

    /// Number of registered callback listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    // ── Read accessors ───────────────────────────────────────────────

    /// The full published state.
    pub fn state(&self) -> StoreState<K> {
        self.inner.state.borrow().clone()
    }

    /// Current records (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<K>>> {
        Arc::clone(&self.inner.state.borrow().items)
    }

    pub fn get(&self, id: &EntityId) -> Option<Arc<K>> {
        lock(&self.inner.items).get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total(&self) -> usize {
        self.inner.state.borrow().total
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn error(&self) -> Option<CoreError> {
        self.inner.state.borrow().error.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.borrow().initialized
    }

    /// First record matching `predicate`, in display order.
    pub fn find(&self, predicate: impl Fn(&K) -> bool) -> Option<Arc<K>> {
        self.snapshot().iter().find(|r| predicate(r)).cloned()
    }

    /// All records matching `predicate`, in display order.
    pub fn filter(&self, predicate: impl Fn(&K) -> bool) -> Vec<Arc<K>> {
        self.snapshot()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Subscription ─────────────────────────────────────────────────────

/// Handle to a registered store listener. Removes the listener on drop.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Unregister the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
