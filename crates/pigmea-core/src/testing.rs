// In-memory backend and record builders shared by unit tests.
#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::backend::EntityBackend;
use crate::error::CoreError;
use crate::model::{Client, Entity, EntityId, Order, Stage};

pub(crate) fn client(id: &str, name: &str) -> Client {
    serde_json::from_value(serde_json::json!({ "id": id, "nombre": name })).unwrap()
}

pub(crate) fn order(id: &str, stage: Stage) -> Order {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "numeroPedidoCliente": format!("OC-{id}"),
        "cliente": "Acme",
        "etapaActual": stage,
    }))
    .unwrap()
}

/// Releases a held `list()` call.
pub(crate) struct ListGate(watch::Sender<bool>);

impl ListGate {
    pub(crate) fn release(&self) {
        let _ = self.0.send(true);
    }
}

/// Backend fake with call counters and scripted failures.
pub(crate) struct FakeBackend<K: Entity> {
    records: Mutex<Vec<K>>,
    list_calls: AtomicUsize,
    exists_calls: AtomicUsize,
    fail_next_list: AtomicBool,
    fail_writes: AtomicBool,
    taken: Mutex<Vec<String>>,
    gate: watch::Sender<bool>,
    /// Builds the stored record for `create`.
    on_create: Box<dyn Fn(&K::Create) -> K + Send + Sync>,
    /// Builds the stored record for `update` / `archive`.
    on_update: Box<dyn Fn(&K, Option<&K::Patch>) -> K + Send + Sync>,
}

impl<K: Entity> FakeBackend<K> {
    pub(crate) fn new(records: Vec<K>) -> Self {
        Self::with_writes(
            records,
            |_| panic!("create not scripted"),
            |current, _| current.clone(),
        )
    }

    pub(crate) fn with_writes(
        records: Vec<K>,
        on_create: impl Fn(&K::Create) -> K + Send + Sync + 'static,
        on_update: impl Fn(&K, Option<&K::Patch>) -> K + Send + Sync + 'static,
    ) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            records: Mutex::new(records),
            list_calls: AtomicUsize::new(0),
            exists_calls: AtomicUsize::new(0),
            fail_next_list: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            taken: Mutex::new(Vec::new()),
            gate,
            on_create: Box::new(on_create),
            on_update: Box::new(on_update),
        }
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn set_records(&self, records: Vec<K>) {
        *self.records.lock().unwrap() = records;
    }

    pub(crate) fn fail_next_list(&self) {
        self.fail_next_list.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Values `exists_by_unique_field` reports as taken.
    pub(crate) fn set_taken(&self, values: &[&str]) {
        *self.taken.lock().unwrap() = values.iter().map(|v| (*v).to_owned()).collect();
    }

    /// Block `list()` until the returned gate is released.
    pub(crate) fn hold_list(&self) -> ListGate {
        self.gate.send_replace(false);
        ListGate(self.gate.clone())
    }

    fn check_writes(&self) -> Result<(), CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(CoreError::Rejected {
                message: "scripted failure".into(),
            })
        } else {
            Ok(())
        }
    }

    fn find(&self, id: &EntityId) -> Result<K, CoreError> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                kind: K::KIND,
                identifier: id.to_string(),
            })
    }
}

#[async_trait]
impl<K: Entity> EntityBackend<K> for FakeBackend<K> {
    async fn list(&self) -> Result<Vec<K>, CoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if self.fail_next_list.swap(false, Ordering::SeqCst) {
            return Err(CoreError::ConnectionFailed {
                url: "http://fake".into(),
                reason: "scripted failure".into(),
            });
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn create(&self, input: &K::Create) -> Result<K, CoreError> {
        self.check_writes()?;
        let record = (self.on_create)(input);
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &EntityId, patch: &K::Patch) -> Result<K, CoreError> {
        self.check_writes()?;
        let current = self.find(id)?;
        let updated = (self.on_update)(&current, Some(patch));
        self.replace(updated.clone());
        Ok(updated)
    }

    async fn remove(&self, id: &EntityId) -> Result<(), CoreError> {
        self.check_writes()?;
        self.find(id)?;
        self.records.lock().unwrap().retain(|r| r.id() != id);
        Ok(())
    }

    async fn archive(&self, id: &EntityId) -> Result<K, CoreError> {
        self.check_writes()?;
        let current = self.find(id)?;
        let archived = (self.on_update)(&current, None);
        self.replace(archived.clone());
        Ok(archived)
    }

    async fn exists_by_unique_field(&self, _field: &str, value: &str) -> Result<bool, CoreError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.taken.lock().unwrap().iter().any(|t| t == value))
    }
}

impl<K: Entity> FakeBackend<K> {
    fn replace(&self, record: K) {
        let mut records = self.records.lock().unwrap();
        if let Some(slot) = records.iter_mut().find(|r| r.id() == record.id()) {
            *slot = record;
        }
    }
}

/// Shorthand for tests that need the backend both typed and erased.
pub(crate) fn erased<K: Entity>(backend: &Arc<FakeBackend<K>>) -> Arc<dyn EntityBackend<K>> {
    backend.clone()
}
