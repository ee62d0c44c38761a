// ── Published store state ──
//
// The value every subscriber receives after a transition. Cheap to clone:
// the item list is shared behind an `Arc`, so all consumers observing the
// same transition hold the same allocation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::model::Entity;

/// Point-in-time view of one [`EntityStore`](super::EntityStore).
#[derive(Debug)]
pub struct StoreState<K: Entity> {
    pub(crate) items: Arc<Vec<Arc<K>>>,
    pub(crate) total: usize,
    pub(crate) loading: bool,
    pub(crate) error: Option<CoreError>,
    pub(crate) initialized: bool,
    pub(crate) version: u64,
    pub(crate) last_loaded_at: Option<DateTime<Utc>>,
    pub(crate) last_push_at: Option<DateTime<Utc>>,
}

impl<K: Entity> Clone for StoreState<K> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            total: self.total,
            loading: self.loading,
            error: self.error.clone(),
            initialized: self.initialized,
            version: self.version,
            last_loaded_at: self.last_loaded_at,
            last_push_at: self.last_push_at,
        }
    }
}

impl<K: Entity> Default for StoreState<K> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            total: 0,
            loading: false,
            error: None,
            initialized: false,
            version: 0,
            last_loaded_at: None,
            last_push_at: None,
        }
    }
}

impl<K: Entity> StoreState<K> {
    /// Records in display order (newest creations first).
    pub fn items(&self) -> &Arc<Vec<Arc<K>>> {
        &self.items
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Failure of the most recent load, if it failed.
    pub fn error(&self) -> Option<&CoreError> {
        self.error.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Transition counter, bumped on every published change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn last_loaded_at(&self) -> Option<DateTime<Utc>> {
        self.last_loaded_at
    }

    pub fn last_push_at(&self) -> Option<DateTime<Utc>> {
        self.last_push_at
    }
}
