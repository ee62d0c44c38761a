// ── Realtime reconciliation ──
//
// Applies push events to an `EntityStore` through the same merge
// primitives local mutations use. Events are applied in arrival order; the
// id-keyed merge absorbs duplicate delivery and echoes of our own writes.

mod event;

use std::sync::Arc;

use pigmea_api::PushFrame;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::Entity;
use crate::store::{EntityStore, Origin};

pub use event::{DecodeError, PushAction, PushEvent, split_event_name};

/// Translates push events for one record kind into store mutations.
pub struct RealtimeBridge<K: Entity> {
    store: EntityStore<K>,
}

impl<K: Entity> Clone for RealtimeBridge<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<K: Entity> RealtimeBridge<K> {
    pub fn new(store: EntityStore<K>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &EntityStore<K> {
        &self.store
    }

    /// Merge one decoded event. Returns whether the store changed.
    pub fn apply(&self, event: PushEvent<K>) -> bool {
        match event {
            PushEvent::Created(record) => self.store.create_from(record, Origin::Push),
            PushEvent::Updated(record) => self.store.update_from(record, Origin::Push),
            // Soft delete: the backend kept the record with a new status.
            PushEvent::Deleted {
                record: Some(record),
                ..
            } => self.store.update_from(record, Origin::Push),
            PushEvent::Deleted { id, record: None } => {
                self.store.remove_from(&id, Origin::Push).is_some()
            }
        }
    }

    /// Decode and merge a raw frame. Frames for other kinds are ignored;
    /// malformed ones are logged and dropped.
    pub fn handle_frame(&self, frame: &PushFrame) -> bool {
        match PushEvent::<K>::decode(frame) {
            Ok(Some(event)) => {
                debug!(kind = %K::KIND, action = %event.action(), id = %event.id(), "push event");
                self.apply(event)
            }
            Ok(None) => false,
            Err(e) => {
                debug!(kind = %K::KIND, error = %e, "ignoring malformed push frame");
                false
            }
        }
    }

    /// Run the bridge as a background task until `cancel` fires or the
    /// frame channel closes.
    ///
    /// A lagged receiver means frames were dropped, so the store is
    /// reloaded to re-converge.
    pub fn spawn(
        self,
        mut frames: broadcast::Receiver<Arc<PushFrame>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = frames.recv() => {
                        match result {
                            Ok(frame) => {
                                self.handle_frame(&frame);
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                warn!(kind = %K::KIND, skipped, "push receiver lagged, reloading");
                                if let Err(e) = self.store.reload().await {
                                    warn!(kind = %K::KIND, error = %e, "reload after lag failed");
                                }
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                }
            }
            info!(kind = %K::KIND, "realtime bridge stopped");
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::model::{Client, ClientStatus};
    use crate::testing::{FakeBackend, client, erased};
    use pretty_assertions::assert_eq;

    fn bridge() -> (Arc<FakeBackend<Client>>, RealtimeBridge<Client>) {
        let backend = Arc::new(FakeBackend::new(Vec::new()));
        let store = EntityStore::new(erased(&backend));
        (backend, RealtimeBridge::new(store))
    }

    fn frame(event: &str, data: serde_json::Value) -> Arc<PushFrame> {
        Arc::new(PushFrame {
            event: event.into(),
            data,
        })
    }

    #[test]
    fn create_update_delete_scenario() {
        let (_, bridge) = bridge();
        let store = bridge.store().clone();

        assert!(bridge.handle_frame(&frame(
            "cliente-created",
            json!({ "cliente": { "id": "1", "nombre": "Acme" } })
        )));
        assert_eq!(store.total(), 1);

        assert!(bridge.handle_frame(&frame(
            "cliente-updated",
            json!({ "cliente": { "id": "1", "nombre": "Acme SL" } })
        )));
        assert_eq!(store.snapshot()[0].name, "Acme SL");
        assert_eq!(store.total(), 1);

        assert!(bridge.handle_frame(&frame("cliente-deleted", json!({ "clienteId": "1" }))));
        assert!(store.is_empty());
        assert_eq!(store.total(), 0);
        assert!(store.state().last_push_at().is_some());
    }

    #[test]
    fn duplicate_delivery_is_absorbed() {
        let (_, bridge) = bridge();
        let event = frame("cliente-created", json!({ "record": { "id": "1", "nombre": "Acme" } }));

        assert!(bridge.handle_frame(&event));
        assert!(!bridge.handle_frame(&event));
        assert_eq!(bridge.store().total(), 1);

        let delete = frame("cliente-deleted", json!({ "id": "1" }));
        assert!(bridge.handle_frame(&delete));
        assert!(!bridge.handle_frame(&delete));
        assert_eq!(bridge.store().total(), 0);
    }

    #[test]
    fn delete_with_record_is_a_soft_remove() {
        let (_, bridge) = bridge();
        bridge.store().apply_create(client("1", "Acme"));

        bridge.handle_frame(&frame(
            "cliente-deleted",
            json!({ "id": "1", "record": { "id": "1", "nombre": "Acme", "estado": "archivado" } }),
        ));

        assert_eq!(bridge.store().total(), 1);
        assert_eq!(
            bridge.store().get(&"1".into()).unwrap().status,
            ClientStatus::Archivado
        );
    }

    #[test]
    fn out_of_order_updates_apply_in_arrival_order() {
        let (_, bridge) = bridge();
        bridge.store().apply_create(client("1", "Acme"));

        bridge.handle_frame(&frame(
            "cliente-updated",
            json!({ "record": { "id": "1", "nombre": "Second" } }),
        ));
        bridge.handle_frame(&frame(
            "cliente-updated",
            json!({ "record": { "id": "1", "nombre": "First" } }),
        ));

        assert_eq!(bridge.store().get(&"1".into()).unwrap().name, "First");
    }

    #[test]
    fn malformed_and_foreign_frames_change_nothing() {
        let (_, bridge) = bridge();
        assert!(!bridge.handle_frame(&frame("cliente-created", json!({ "message": "x" }))));
        assert!(!bridge.handle_frame(&frame(
            "pedido-created",
            json!({ "pedido": { "id": "9" } })
        )));
        assert_eq!(bridge.store().state().version(), 0);
    }

    #[tokio::test]
    async fn spawned_bridge_applies_frames_until_cancelled() {
        let (_, bridge) = bridge();
        let store = bridge.store().clone();
        let (tx, rx) = broadcast::channel(16);
        let cancel = CancellationToken::new();
        let handle = bridge.spawn(rx, cancel.clone());

        let mut stream = store.watch();
        tx.send(frame(
            "cliente-created",
            json!({ "record": { "id": "1", "nombre": "Acme" } }),
        ))
        .unwrap();

        let items = tokio::time::timeout(Duration::from_secs(1), stream.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(items.len(), 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn lagged_receiver_triggers_reload() {
        let (backend, bridge) = bridge();
        backend.set_records(vec![client("1", "Acme"), client("2", "Beta")]);
        let store = bridge.store().clone();

        let (tx, rx) = broadcast::channel(1);
        for id in ["a", "b", "c"] {
            tx.send(frame(
                "cliente-created",
                json!({ "record": { "id": id, "nombre": id } }),
            ))
            .unwrap();
        }

        let handle = bridge.spawn(rx, CancellationToken::new());
        drop(tx);
        handle.await.unwrap();

        assert_eq!(backend.list_calls(), 1);
        assert!(store.is_initialized());
        // Reloaded pair plus the one frame that survived the lag.
        assert_eq!(store.total(), 3);
    }
}
