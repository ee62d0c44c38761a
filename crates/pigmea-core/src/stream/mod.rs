// ── Reactive entity streams ──
//
// Subscription types for consuming store transitions.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Entity;
use crate::store::StoreState;

pub use filter::{ClientFilter, OrderFilter, SalesRepFilter};

/// A subscription to one store's published state.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via the `changed()` method or by converting to a `Stream`.
pub struct EntityStream<K: Entity> {
    current: StoreState<K>,
    receiver: watch::Receiver<StoreState<K>>,
}

impl<K: Entity> EntityStream<K> {
    pub(crate) fn new(receiver: watch::Receiver<StoreState<K>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Records captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<Vec<Arc<K>>> {
        self.current.items()
    }

    /// Full state captured at creation time (or at the last `changed()`).
    pub fn state(&self) -> &StoreState<K> {
        &self.current
    }

    /// Latest records (may have changed since creation).
    pub fn latest(&self) -> Arc<Vec<Arc<K>>> {
        Arc::clone(self.receiver.borrow().items())
    }

    /// Wait for the next transition, returning the new records.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<K>>>> {
        self.receiver.changed().await.ok()?;
        let state = self.receiver.borrow_and_update().clone();
        let items = Arc::clone(state.items());
        self.current = state;
        Some(items)
    }

    /// Convert into a `Stream` of full states.
    pub fn into_stream(self) -> EntityWatchStream<K> {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current state first, then one state per transition
/// (intermediate states may be skipped by a slow consumer).
pub struct EntityWatchStream<K: Entity> {
    inner: WatchStream<StoreState<K>>,
}

impl<K: Entity> Stream for EntityWatchStream<K> {
    type Item = StoreState<K>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
