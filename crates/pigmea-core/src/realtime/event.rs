// ── Push event decoding ──
//
// Turns raw `PushFrame`s into typed per-kind events. Frames for another
// kind, or for actions the cache does not track (locks, activity), decode
// to `Ok(None)`. A tracked frame that cannot be decoded is an error the
// bridge logs and drops.

use pigmea_api::PushFrame;
use serde_json::Value;
use strum::{Display, EnumString};

use crate::model::{Entity, EntityId, EntityKind};

/// The lifecycle action carried in an event name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PushAction {
    Created,
    Updated,
    Deleted,
}

/// Decoded push notification for one record kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent<K: Entity> {
    Created(K),
    Updated(K),
    /// `record` is present when the backend soft-deleted the record.
    Deleted { id: EntityId, record: Option<K> },
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("event `{event}` carries no record")]
    MissingRecord { event: String },

    #[error("event `{event}` carries no id")]
    MissingId { event: String },

    #[error("invalid record in event `{event}`: {source}")]
    InvalidRecord {
        event: String,
        source: serde_json::Error,
    },
}

/// Split `"pedido-updated"` into its kind and action.
///
/// Returns `None` when the prefix is not a known kind. An unknown suffix
/// yields `Some((kind, None))` so callers can tell "not ours" from
/// "ours but unsupported".
pub fn split_event_name(event: &str) -> Option<(EntityKind, Option<PushAction>)> {
    let (kind, action) = event.split_once('-')?;
    let kind: EntityKind = kind.parse().ok()?;
    Some((kind, action.parse().ok()))
}

impl<K: Entity> PushEvent<K> {
    /// Decode a frame addressed to `K`, or `Ok(None)` for any other kind.
    pub fn decode(frame: &PushFrame) -> Result<Option<Self>, DecodeError> {
        let Some((kind, action)) = split_event_name(&frame.event) else {
            return Ok(None);
        };
        if kind != K::KIND {
            return Ok(None);
        }
        let Some(action) = action else {
            return Ok(None);
        };

        let event = match action {
            PushAction::Created => Self::Created(required_record(frame)?),
            PushAction::Updated => Self::Updated(required_record(frame)?),
            PushAction::Deleted => {
                let record = optional_record::<K>(frame)?;
                let id = frame
                    .data
                    .get("id")
                    .or_else(|| frame.data.get(K::KIND.id_key()))
                    .and_then(EntityId::from_json)
                    .or_else(|| record.as_ref().map(|r| r.id().clone()))
                    .ok_or_else(|| DecodeError::MissingId {
                        event: frame.event.clone(),
                    })?;
                Self::Deleted { id, record }
            }
        };
        Ok(Some(event))
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Self::Created(record) | Self::Updated(record) => record.id(),
            Self::Deleted { id, .. } => id,
        }
    }

    pub fn action(&self) -> PushAction {
        match self {
            Self::Created(_) => PushAction::Created,
            Self::Updated(_) => PushAction::Updated,
            Self::Deleted { .. } => PushAction::Deleted,
        }
    }
}

fn record_value<K: Entity>(data: &Value) -> Option<&Value> {
    data.get("record")
        .or_else(|| data.get(K::KIND.wire_name()))
        .filter(|v| v.is_object())
}

fn required_record<K: Entity>(frame: &PushFrame) -> Result<K, DecodeError> {
    optional_record(frame)?.ok_or_else(|| DecodeError::MissingRecord {
        event: frame.event.clone(),
    })
}

fn optional_record<K: Entity>(frame: &PushFrame) -> Result<Option<K>, DecodeError> {
    record_value::<K>(&frame.data)
        .map(|value| {
            serde_json::from_value(value.clone()).map_err(|source| DecodeError::InvalidRecord {
                event: frame.event.clone(),
                source,
            })
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{Client, Order, Stage};

    fn frame(event: &str, data: Value) -> PushFrame {
        PushFrame {
            event: event.into(),
            data,
        }
    }

    #[test]
    fn splits_known_event_names() {
        assert_eq!(
            split_event_name("pedido-updated"),
            Some((EntityKind::Order, Some(PushAction::Updated)))
        );
        assert_eq!(
            split_event_name("cliente-locked"),
            Some((EntityKind::Client, None))
        );
        assert_eq!(split_event_name("material-deleted"), None);
        assert_eq!(split_event_name("ping"), None);
    }

    #[test]
    fn created_accepts_kind_named_payload() {
        let f = frame(
            "pedido-created",
            json!({
                "pedido": { "id": 7, "numeroPedidoCliente": "OC-7", "etapaActual": "CORTE" },
                "message": "Nuevo pedido",
                "timestamp": "2026-01-01T00:00:00Z"
            }),
        );
        let Some(PushEvent::Created(order)) = PushEvent::<Order>::decode(&f).unwrap() else {
            panic!("expected created");
        };
        assert_eq!(order.id.as_str(), "7");
        assert_eq!(order.stage, Stage::Corte);
    }

    #[test]
    fn machine_stages_and_string_meters_decode() {
        let f = frame(
            "pedido-updated",
            json!({
                "pedido": {
                    "id": "p9",
                    "etapaActual": "IMPRESION_WM1",
                    "subEtapaActual": null,
                    "metros": "3200"
                }
            }),
        );
        let Some(PushEvent::Updated(order)) = PushEvent::<Order>::decode(&f).unwrap() else {
            panic!("expected updated");
        };
        assert_eq!(order.stage, Stage::ImpresionWm1);
        assert_eq!(order.meters, Some(3200.0));

        let f = frame(
            "pedido-created",
            json!({ "pedido": { "id": "p10", "etapaActual": "POST_TROQUELADO_Z" } }),
        );
        let Some(PushEvent::Created(order)) = PushEvent::<Order>::decode(&f).unwrap() else {
            panic!("expected created");
        };
        assert_eq!(order.stage, Stage::Other("POST_TROQUELADO_Z".into()));
    }

    #[test]
    fn updated_accepts_record_key() {
        let f = frame(
            "cliente-updated",
            json!({ "record": { "id": "1", "nombre": "Acme SL" } }),
        );
        let event = PushEvent::<Client>::decode(&f).unwrap().unwrap();
        assert_eq!(event.action(), PushAction::Updated);
        assert_eq!(event.id().as_str(), "1");
    }

    #[test]
    fn deleted_with_id_alias_only() {
        let f = frame("cliente-deleted", json!({ "clienteId": "1" }));
        let event = PushEvent::<Client>::decode(&f).unwrap().unwrap();
        assert_eq!(
            event,
            PushEvent::Deleted {
                id: "1".into(),
                record: None
            }
        );
    }

    #[test]
    fn deleted_with_record_keeps_it() {
        let f = frame(
            "cliente-deleted",
            json!({ "id": "1", "record": { "id": "1", "nombre": "Acme", "estado": "archivado" } }),
        );
        let Some(PushEvent::Deleted { id, record }) = PushEvent::<Client>::decode(&f).unwrap()
        else {
            panic!("expected deleted");
        };
        assert_eq!(id.as_str(), "1");
        assert!(record.unwrap().is_archived());
    }

    #[test]
    fn other_kinds_and_untracked_actions_are_skipped() {
        let f = frame("pedido-created", json!({ "pedido": { "id": "1" } }));
        assert!(PushEvent::<Client>::decode(&f).unwrap().is_none());

        let lock = frame("cliente-lock-acquired", json!({ "clienteId": "1" }));
        assert!(PushEvent::<Client>::decode(&lock).unwrap().is_none());
    }

    #[test]
    fn malformed_frames_are_errors() {
        let missing = frame("cliente-created", json!({ "message": "hola" }));
        assert!(matches!(
            PushEvent::<Client>::decode(&missing),
            Err(DecodeError::MissingRecord { .. })
        ));

        let no_id = frame("cliente-deleted", json!({}));
        assert!(matches!(
            PushEvent::<Client>::decode(&no_id),
            Err(DecodeError::MissingId { .. })
        ));

        let bad = frame("cliente-created", json!({ "record": { "nombre": 5 } }));
        assert!(matches!(
            PushEvent::<Client>::decode(&bad),
            Err(DecodeError::InvalidRecord { .. })
        ));
    }
}
