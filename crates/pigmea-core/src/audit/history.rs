//! Action history: immutable records of confirmed mutations.
//!
//! [`HistoryRecorder`] turns mutations into [`ActionRecord`]s and hands them
//! to a [`HistorySink`]. Appending is fire-and-forget: a sink never reports
//! failure back to the mutation that produced the record.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::Display;
use uuid::Uuid;

use super::AuditOptions;
use super::diff::{diff, summarize};
use crate::model::{Entity, EntityId, EntityKind};

// ── ActionRecord ─────────────────────────────────────────────────────

/// What kind of mutation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Archive,
    BulkUpdate,
    BulkDelete,
}

/// One entry in the action history. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub id: Uuid,
    pub entity_id: EntityId,
    pub entity_kind: EntityKind,
    pub action: ActionKind,
    /// `before` / `after` snapshots, or `affectedIds` for bulk actions.
    pub payload: Value,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(
        entity_id: EntityId,
        entity_kind: EntityKind,
        action: ActionKind,
        payload: Value,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id,
            entity_kind,
            action,
            payload,
            description,
            timestamp: Utc::now(),
        }
    }
}

// ── Sinks ────────────────────────────────────────────────────────────

/// Receiver of action records.
///
/// `append()` must be fast and must not fail from the caller's
/// perspective; implementations that persist remotely should queue.
pub trait HistorySink: Send + Sync {
    fn append(&self, record: ActionRecord);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHistorySink;

impl HistorySink for NoOpHistorySink {
    fn append(&self, _record: ActionRecord) {}
}

/// Logs each record through `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHistorySink;

impl HistorySink for TracingHistorySink {
    fn append(&self, record: ActionRecord) {
        tracing::info!(
            kind = %record.entity_kind,
            id = %record.entity_id,
            action = %record.action,
            "{}",
            record.description
        );
    }
}

/// Bounded in-memory history, newest first.
#[derive(Debug, Clone)]
pub struct MemoryHistorySink {
    capacity: usize,
    records: Arc<Mutex<VecDeque<ActionRecord>>>,
}

impl Default for MemoryHistorySink {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl MemoryHistorySink {
    pub const DEFAULT_CAPACITY: usize = 500;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// All retained records, newest first.
    pub fn records(&self) -> Vec<ActionRecord> {
        self.lock().iter().cloned().collect()
    }

    /// Retained records for one entity, newest first.
    pub fn for_entity(&self, kind: EntityKind, id: &EntityId) -> Vec<ActionRecord> {
        self.lock()
            .iter()
            .filter(|r| r.entity_kind == kind && &r.entity_id == id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ActionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HistorySink for MemoryHistorySink {
    fn append(&self, record: ActionRecord) {
        let mut records = self.lock();
        records.push_front(record);
        records.truncate(self.capacity);
    }
}

// ── HistoryRecorder ──────────────────────────────────────────────────

/// Builds action records for confirmed mutations and appends them to a sink.
#[derive(Clone)]
pub struct HistoryRecorder {
    sink: Arc<dyn HistorySink>,
    options: AuditOptions,
}

impl std::fmt::Debug for HistoryRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryRecorder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl HistoryRecorder {
    pub fn new(sink: Arc<dyn HistorySink>, options: AuditOptions) -> Self {
        Self { sink, options }
    }

    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    pub fn record_create<K: Entity>(&self, after: &K) {
        self.append(
            after.id().clone(),
            K::KIND,
            ActionKind::Create,
            json!({ "after": after }),
            format!("{} creado: {}", K::KIND.title(), after.label()),
        );
    }

    pub fn record_update<K: Entity>(&self, before: &K, after: &K) {
        let changes = diff(before, after, K::fields(), &self.options);
        let summary = summarize(K::KIND, &after.label(), &changes, &self.options);
        self.append(
            after.id().clone(),
            K::KIND,
            ActionKind::Update,
            json!({ "before": before, "after": after }),
            summary.description(),
        );
    }

    pub fn record_delete<K: Entity>(&self, before: &K) {
        self.append(
            before.id().clone(),
            K::KIND,
            ActionKind::Delete,
            json!({ "before": before }),
            format!("{} eliminado: {}", K::KIND.title(), before.label()),
        );
    }

    pub fn record_archive<K: Entity>(&self, before: Option<&K>, after: &K) {
        self.append(
            after.id().clone(),
            K::KIND,
            ActionKind::Archive,
            json!({ "before": before, "after": after }),
            format!("{} archivado: {}", K::KIND.title(), after.label()),
        );
    }

    /// Bulk edit: no per-field diff, only the affected ids.
    pub fn record_bulk_update(&self, kind: EntityKind, ids: &[EntityId], description: &str) {
        self.append(
            bulk_context_id(ids),
            kind,
            ActionKind::BulkUpdate,
            json!({ "affectedIds": ids }),
            description.to_owned(),
        );
    }

    /// Bulk hard delete of `removed`.
    pub fn record_bulk_delete<K: Entity>(&self, removed: &[K]) {
        let ids: Vec<EntityId> = removed.iter().map(|r| r.id().clone()).collect();
        self.append(
            bulk_context_id(&ids),
            K::KIND,
            ActionKind::BulkDelete,
            json!({ "before": removed, "affectedIds": ids }),
            format!(
                "Eliminados {} {} en masa",
                ids.len(),
                K::KIND.resource()
            ),
        );
    }

    fn append(
        &self,
        entity_id: EntityId,
        kind: EntityKind,
        action: ActionKind,
        payload: Value,
        description: String,
    ) {
        self.sink.append(ActionRecord::new(
            entity_id,
            kind,
            action,
            payload,
            description,
        ));
    }
}

/// Bulk records are filed under the first affected id.
fn bulk_context_id(ids: &[EntityId]) -> EntityId {
    ids.first()
        .cloned()
        .unwrap_or_else(|| EntityId::from("bulk"))
}
