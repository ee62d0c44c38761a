// ── Confirmed mutations ──
//
// Every write goes to the backend first. Only a confirmed result is merged
// into the store, through the same primitives the realtime bridge uses, so
// the push echo of our own write lands as a no-op.

use tracing::{debug, warn};

use crate::audit::HistoryRecorder;
use crate::error::CoreError;
use crate::model::{Entity, EntityId};
use crate::store::EntityStore;

/// Result of a bulk operation that runs one backend call per id.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    pub succeeded: Vec<EntityId>,
    pub failed: Vec<(EntityId, CoreError)>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write path for one record kind.
pub struct MutationGate<K: Entity> {
    store: EntityStore<K>,
    history: Option<HistoryRecorder>,
}

impl<K: Entity> Clone for MutationGate<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            history: self.history.clone(),
        }
    }
}

impl<K: Entity> MutationGate<K> {
    pub fn new(store: EntityStore<K>) -> Self {
        Self {
            store,
            history: None,
        }
    }

    /// Record every confirmed mutation through `recorder`.
    pub fn with_history(mut self, recorder: HistoryRecorder) -> Self {
        self.history = Some(recorder);
        self
    }

    pub fn store(&self) -> &EntityStore<K> {
        &self.store
    }

    pub async fn create(&self, input: &K::Create) -> Result<K, CoreError> {
        let record = self.store.backend().create(input).await?;
        debug!(kind = %K::KIND, id = %record.id(), "created");
        self.store.apply_create(record.clone());
        if let Some(history) = &self.history {
            history.record_create(&record);
        }
        Ok(record)
    }

    pub async fn update(&self, id: &EntityId, patch: &K::Patch) -> Result<K, CoreError> {
        let before = self.store.get(id);
        let record = self.store.backend().update(id, patch).await?;
        debug!(kind = %K::KIND, id = %id, "updated");
        self.store.apply_update(record.clone());
        if let Some(history) = &self.history {
            match before {
                Some(before) => history.record_update(before.as_ref(), &record),
                None => debug!(kind = %K::KIND, id = %id, "no cached snapshot, update not audited"),
            }
        }
        Ok(record)
    }

    /// Hard delete.
    pub async fn remove(&self, id: &EntityId) -> Result<(), CoreError> {
        self.store.backend().remove(id).await?;
        debug!(kind = %K::KIND, id = %id, "removed");
        let removed = self.store.apply_remove(id);
        if let (Some(history), Some(before)) = (&self.history, removed) {
            history.record_delete(before.as_ref());
        }
        Ok(())
    }

    /// Soft delete. The record stays in the store with its archived status.
    pub async fn archive(&self, id: &EntityId) -> Result<K, CoreError> {
        let before = self.store.get(id);
        let record = self.store.backend().archive(id).await?;
        debug!(kind = %K::KIND, id = %id, "archived");
        self.store.apply_soft_remove(record.clone());
        if let Some(history) = &self.history {
            history.record_archive(before.as_deref(), &record);
        }
        Ok(record)
    }

    /// Apply the same patch to every id, recording one bulk history entry
    /// for the ids that succeeded.
    pub async fn update_many(
        &self,
        ids: &[EntityId],
        patch: &K::Patch,
        description: &str,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome {
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        for id in ids {
            match self.store.backend().update(id, patch).await {
                Ok(record) => {
                    self.store.apply_update(record);
                    outcome.succeeded.push(id.clone());
                }
                Err(e) => {
                    warn!(kind = %K::KIND, id = %id, error = %e, "bulk update failed");
                    outcome.failed.push((id.clone(), e));
                }
            }
        }
        if let Some(history) = self.history.as_ref().filter(|_| !outcome.succeeded.is_empty()) {
            history.record_bulk_update(K::KIND, &outcome.succeeded, description);
        }
        outcome
    }

    /// Hard delete every id, recording one bulk history entry for the
    /// records that were removed.
    pub async fn remove_many(&self, ids: &[EntityId]) -> BulkOutcome {
        let mut outcome = BulkOutcome {
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        let mut removed = Vec::new();
        for id in ids {
            match self.store.backend().remove(id).await {
                Ok(()) => {
                    if let Some(before) = self.store.apply_remove(id) {
                        removed.push((*before).clone());
                    }
                    outcome.succeeded.push(id.clone());
                }
                Err(e) => {
                    warn!(kind = %K::KIND, id = %id, error = %e, "bulk delete failed");
                    outcome.failed.push((id.clone(), e));
                }
            }
        }
        if let Some(history) = self.history.as_ref().filter(|_| !removed.is_empty()) {
            history.record_bulk_delete(&removed);
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::audit::{ActionKind, AuditOptions, MemoryHistorySink};
    use crate::model::{Client, ClientCreate, ClientPatch, ClientStatus, EntityKind};
    use crate::realtime::RealtimeBridge;
    use crate::testing::{FakeBackend, client, erased};
    use pigmea_api::PushFrame;
    use pretty_assertions::assert_eq;

    fn scripted_backend(records: Vec<Client>) -> Arc<FakeBackend<Client>> {
        Arc::new(FakeBackend::with_writes(
            records,
            |input: &ClientCreate| client("new", &input.name),
            |current: &Client, patch: Option<&ClientPatch>| {
                let mut next = current.clone();
                match patch {
                    Some(patch) => {
                        if let Some(name) = &patch.name {
                            next.name.clone_from(name);
                        }
                        if let Some(status) = patch.status {
                            next.status = status;
                        }
                    }
                    None => next.status = ClientStatus::Archivado,
                }
                next
            },
        ))
    }

    fn gate_with_history(
        backend: &Arc<FakeBackend<Client>>,
    ) -> (MutationGate<Client>, Arc<MemoryHistorySink>) {
        let sink = Arc::new(MemoryHistorySink::default());
        let recorder = HistoryRecorder::new(sink.clone(), AuditOptions::default());
        let gate = MutationGate::new(EntityStore::new(erased(backend))).with_history(recorder);
        (gate, sink)
    }

    fn create_input(name: &str) -> ClientCreate {
        ClientCreate {
            name: name.into(),
            ..ClientCreate::default()
        }
    }

    fn rename(name: &str) -> ClientPatch {
        ClientPatch {
            name: Some(name.into()),
            ..ClientPatch::default()
        }
    }

    #[tokio::test]
    async fn create_merges_confirmed_record_and_absorbs_echo() {
        let backend = scripted_backend(Vec::new());
        let (gate, sink) = gate_with_history(&backend);

        let created = gate.create(&create_input("Acme")).await.unwrap();
        assert_eq!(created.id.as_str(), "new");
        assert_eq!(gate.store().total(), 1);

        // Echo of our own write over the push channel.
        let bridge = RealtimeBridge::new(gate.store().clone());
        let echo = PushFrame {
            event: "cliente-created".into(),
            data: json!({ "cliente": { "id": "new", "nombre": "Acme" } }),
        };
        assert!(!bridge.handle_frame(&echo));
        assert_eq!(gate.store().total(), 1);

        let history = sink.records();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, ActionKind::Create);
        assert_eq!(history[0].description, "Cliente creado: Acme");
    }

    #[tokio::test]
    async fn failed_mutation_leaves_store_untouched() {
        let backend = scripted_backend(vec![client("1", "Acme")]);
        let (gate, sink) = gate_with_history(&backend);
        gate.store().ensure_initialized().await.unwrap();
        let version = gate.store().state().version();

        backend.fail_writes(true);
        assert!(gate.create(&create_input("Beta")).await.is_err());
        assert!(gate.update(&"1".into(), &rename("X")).await.is_err());
        assert!(gate.remove(&"1".into()).await.is_err());

        assert_eq!(gate.store().state().version(), version);
        assert_eq!(gate.store().get(&"1".into()).unwrap().name, "Acme");
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn update_records_diff_against_cached_snapshot() {
        let backend = scripted_backend(vec![client("1", "Acme")]);
        let (gate, sink) = gate_with_history(&backend);
        gate.store().ensure_initialized().await.unwrap();

        let updated = gate.update(&"1".into(), &rename("Acme SL")).await.unwrap();
        assert_eq!(updated.name, "Acme SL");
        assert_eq!(gate.store().snapshot()[0].name, "Acme SL");

        let record = &sink.records()[0];
        assert_eq!(record.action, ActionKind::Update);
        assert_eq!(
            record.description,
            "Cliente actualizado: Acme SL (Nombre: Acme → Acme SL)"
        );
    }

    #[tokio::test]
    async fn archive_keeps_record_and_remove_drops_it() {
        let backend = scripted_backend(vec![client("1", "Acme"), client("2", "Beta")]);
        let (gate, sink) = gate_with_history(&backend);
        gate.store().ensure_initialized().await.unwrap();

        let archived = gate.archive(&"1".into()).await.unwrap();
        assert!(archived.is_archived());
        assert_eq!(gate.store().total(), 2);

        gate.remove(&"2".into()).await.unwrap();
        assert_eq!(gate.store().total(), 1);

        let actions: Vec<_> = sink.records().iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![ActionKind::Delete, ActionKind::Archive]);
        assert_eq!(sink.for_entity(EntityKind::Client, &"2".into()).len(), 1);
    }

    #[tokio::test]
    async fn bulk_operations_record_one_entry() {
        let backend = scripted_backend(vec![
            client("1", "Acme"),
            client("2", "Beta"),
            client("3", "Gamma"),
        ]);
        let (gate, sink) = gate_with_history(&backend);
        gate.store().ensure_initialized().await.unwrap();

        let patch = ClientPatch {
            status: Some(ClientStatus::Inactivo),
            ..ClientPatch::default()
        };
        let ids: Vec<EntityId> = vec!["1".into(), "2".into(), "missing".into()];
        let outcome = gate.update_many(&ids, &patch, "Desactivados 2 clientes").await;
        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert!(!outcome.is_complete());

        let outcome = gate.remove_many(&["1".into(), "3".into()]).await;
        assert!(outcome.is_complete());
        assert_eq!(gate.store().total(), 1);

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, ActionKind::BulkDelete);
        assert_eq!(records[0].description, "Eliminados 2 clientes en masa");
        assert_eq!(records[1].action, ActionKind::BulkUpdate);
        assert_eq!(records[1].entity_id.as_str(), "1");
    }
}
