// ── Domain model ──
//
// Canonical record types shared by the store, the realtime bridge and the
// audit engine. Field names are English; serde renames map them onto the
// backend's Spanish JSON keys. Unknown keys survive a round-trip through
// the cache via a flattened `extra` map on every record.

mod client;
mod entity_id;
mod order;
mod sales_rep;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString};

use crate::audit::FieldSpec;

pub use client::{Client, ClientCreate, ClientPatch, ClientStatus};
pub use entity_id::EntityId;
pub use order::{Order, OrderCreate, OrderPatch, Priority, Stage, StagePhase, UnknownStage};
pub use sales_rep::{SalesRep, SalesRepCreate, SalesRepPatch};

// ── EntityKind ──────────────────────────────────────────────────────

/// The three record kinds the shop tracks.
///
/// `Display`/`FromStr` use the backend's wire name (`cliente`, `vendedor`,
/// `pedido`), which is also the prefix of push event names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum EntityKind {
    #[serde(rename = "cliente")]
    #[strum(serialize = "cliente")]
    Client,
    #[serde(rename = "vendedor")]
    #[strum(serialize = "vendedor")]
    SalesRep,
    #[serde(rename = "pedido")]
    #[strum(serialize = "pedido")]
    Order,
}

impl EntityKind {
    /// Singular wire name, e.g. `"pedido"`.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Client => "cliente",
            Self::SalesRep => "vendedor",
            Self::Order => "pedido",
        }
    }

    /// REST collection name under `/api/`.
    pub fn resource(self) -> &'static str {
        match self {
            Self::Client => "clientes",
            Self::SalesRep => "vendedores",
            Self::Order => "pedidos",
        }
    }

    /// Capitalized label used in history descriptions.
    pub fn title(self) -> &'static str {
        match self {
            Self::Client => "Cliente",
            Self::SalesRep => "Vendedor",
            Self::Order => "Pedido",
        }
    }

    /// Payload key carrying the id on delete events, e.g. `"pedidoId"`.
    pub fn id_key(self) -> &'static str {
        match self {
            Self::Client => "clienteId",
            Self::SalesRep => "vendedorId",
            Self::Order => "pedidoId",
        }
    }
}

// ── Entity ──────────────────────────────────────────────────────────

/// A record kind that can live in an [`EntityStore`](crate::EntityStore).
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Which kind this is.
    const KIND: EntityKind;

    /// Body sent to the backend to create a record.
    type Create: Serialize + fmt::Debug + Send + Sync + 'static;

    /// Partial update sent to the backend.
    type Patch: Serialize + fmt::Debug + Send + Sync + 'static;

    fn id(&self) -> &EntityId;

    /// Short human label (client name, order number).
    fn label(&self) -> String;

    /// Audit field registry for this kind.
    fn fields() -> &'static [FieldSpec];

    /// Wire key of the field checked for uniqueness while typing.
    fn unique_field() -> &'static str;
}

// ── Wire helpers ────────────────────────────────────────────────────

/// Quantities arrive as numbers or as numeric strings depending on which
/// client wrote them. Anything unparseable reads as absent.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
