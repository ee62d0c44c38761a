// ── Production order domain type ──
//
// Orders move from preparation through a printing machine and any number
// of post-press machines. `Stage` and `Priority` serialize exactly as the
// backend stores them.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

use super::{Entity, EntityId, EntityKind, lenient_f64};
use crate::audit::{FieldSpec, registry};

/// Production stage (`etapaActual`).
///
/// Covers the backend's machine stages and post-press sub-stages plus the
/// coarse board stages older clients still write. Anything else is kept
/// verbatim in [`Stage::Other`] so an order never fails to load and writes
/// back the value it arrived with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    #[default]
    Preparacion,
    Pendiente,
    ImpresionWm1,
    ImpresionGiave,
    ImpresionWm3,
    ImpresionAnon,
    PostLaminacionSl2,
    PostLaminacionNexus,
    PostRebobinadoS2dt,
    PostRebobinadoProslit,
    PostPerforacionMic,
    PostPerforacionMac,
    PostRebobinadoTemac,
    Completado,
    Archivado,
    Impresion,
    Laminado,
    Corte,
    Entrega,
    Other(String),
}

/// Where a stage sits in the shop's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePhase {
    Preparation,
    Printing,
    PostPress,
    Delivery,
    Done,
    Archived,
    Unknown,
}

impl Stage {
    /// Every named stage, in pipeline order.
    pub const KNOWN: &'static [Stage] = &[
        Self::Preparacion,
        Self::Pendiente,
        Self::ImpresionWm1,
        Self::ImpresionGiave,
        Self::ImpresionWm3,
        Self::ImpresionAnon,
        Self::PostLaminacionSl2,
        Self::PostLaminacionNexus,
        Self::PostRebobinadoS2dt,
        Self::PostRebobinadoProslit,
        Self::PostPerforacionMic,
        Self::PostPerforacionMac,
        Self::PostRebobinadoTemac,
        Self::Completado,
        Self::Archivado,
        Self::Impresion,
        Self::Laminado,
        Self::Corte,
        Self::Entrega,
    ];

    /// Map a wire value, keeping unrecognized ones as [`Stage::Other`].
    pub fn from_wire(raw: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|stage| stage.as_str() == raw)
            .cloned()
            .unwrap_or_else(|| Self::Other(raw.to_owned()))
    }

    /// The value the backend stores.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Preparacion => "PREPARACION",
            Self::Pendiente => "PENDIENTE",
            Self::ImpresionWm1 => "IMPRESION_WM1",
            Self::ImpresionGiave => "IMPRESION_GIAVE",
            Self::ImpresionWm3 => "IMPRESION_WM3",
            Self::ImpresionAnon => "IMPRESION_ANON",
            Self::PostLaminacionSl2 => "POST_LAMINACION_SL2",
            Self::PostLaminacionNexus => "POST_LAMINACION_NEXUS",
            Self::PostRebobinadoS2dt => "POST_REBOBINADO_S2DT",
            Self::PostRebobinadoProslit => "POST_REBOBINADO_PROSLIT",
            Self::PostPerforacionMic => "POST_PERFORACION_MIC",
            Self::PostPerforacionMac => "POST_PERFORACION_MAC",
            Self::PostRebobinadoTemac => "POST_REBOBINADO_TEMAC",
            Self::Completado => "COMPLETADO",
            Self::Archivado => "ARCHIVADO",
            Self::Impresion => "IMPRESION",
            Self::Laminado => "LAMINADO",
            Self::Corte => "CORTE",
            Self::Entrega => "ENTREGA",
            Self::Other(raw) => raw,
        }
    }

    /// Column title shown on the production board. Unknown stages show
    /// their raw value with underscores as spaces.
    pub fn title(&self) -> Cow<'static, str> {
        let title = match self {
            Self::Preparacion => "Preparación",
            Self::Pendiente => "Pendiente",
            Self::ImpresionWm1 => "Impresión WM1",
            Self::ImpresionGiave => "Impresión GIAVE",
            Self::ImpresionWm3 => "Impresión WM3",
            Self::ImpresionAnon => "Impresión ANON",
            Self::PostLaminacionSl2 => "Laminación SL2",
            Self::PostLaminacionNexus => "Laminación NEXUS",
            Self::PostRebobinadoS2dt => "Rebobinado S2DT",
            Self::PostRebobinadoProslit => "Rebobinado PROSLIT",
            Self::PostPerforacionMic => "Perforación MIC",
            Self::PostPerforacionMac => "Perforación MAC",
            Self::PostRebobinadoTemac => "Rebobinado TEMAC",
            Self::Completado => "Completado",
            Self::Archivado => "Archivado",
            Self::Impresion => "Impresión",
            Self::Laminado => "Laminado",
            Self::Corte => "Corte",
            Self::Entrega => "Entrega",
            Self::Other(raw) => return Cow::Owned(raw.replace('_', " ")),
        };
        Cow::Borrowed(title)
    }

    pub fn phase(&self) -> StagePhase {
        match self {
            Self::Preparacion | Self::Pendiente => StagePhase::Preparation,
            Self::ImpresionWm1
            | Self::ImpresionGiave
            | Self::ImpresionWm3
            | Self::ImpresionAnon
            | Self::Impresion => StagePhase::Printing,
            Self::PostLaminacionSl2
            | Self::PostLaminacionNexus
            | Self::PostRebobinadoS2dt
            | Self::PostRebobinadoProslit
            | Self::PostPerforacionMic
            | Self::PostPerforacionMac
            | Self::PostRebobinadoTemac
            | Self::Laminado
            | Self::Corte => StagePhase::PostPress,
            Self::Entrega => StagePhase::Delivery,
            Self::Completado => StagePhase::Done,
            Self::Archivado => StagePhase::Archived,
            Self::Other(_) => StagePhase::Unknown,
        }
    }

    /// Still on the shop floor.
    pub fn is_in_production(&self) -> bool {
        !matches!(self, Self::Completado | Self::Archivado)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected by [`Stage::from_str`]: not one of [`Stage::KNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage `{0}`")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    /// Strict, case-insensitive parse for user input.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::KNOWN
            .iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(raw.trim()))
            .cloned()
            .ok_or_else(|| UnknownStage(raw.to_owned()))
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or_else(Self::default, Self::from_wire))
    }
}

/// Order priority (`prioridad`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Priority {
    Urgente,
    Alta,
    #[default]
    Normal,
    Baja,
}

impl Priority {
    /// Sort rank, most urgent first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Urgente => 0,
            Self::Alta => 1,
            Self::Normal => 2,
            Self::Baja => 3,
        }
    }
}

/// A print job tracked through production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: EntityId,
    #[serde(rename = "secuenciaPedido", default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
    #[serde(rename = "numeroPedidoCliente", default)]
    pub order_number: String,
    #[serde(rename = "cliente", default)]
    pub client_name: String,
    #[serde(rename = "clienteId", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<EntityId>,
    #[serde(rename = "vendedorNombre", default, skip_serializing_if = "Option::is_none")]
    pub sales_rep: Option<String>,
    #[serde(rename = "maquinaImpresion", default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    #[serde(
        rename = "metros",
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub meters: Option<f64>,
    #[serde(rename = "etapaActual", default)]
    pub stage: Stage,
    #[serde(rename = "subEtapaActual", default, skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,
    #[serde(rename = "prioridad", default)]
    pub priority: Priority,
    #[serde(rename = "fechaEntrega", default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(rename = "tipoImpresion", default, skip_serializing_if = "Option::is_none")]
    pub print_type: Option<String>,
    #[serde(rename = "materiales", default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<serde_json::Value>,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "fechaCreacion", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "fechaActualizacion", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Entity for Order {
    const KIND: EntityKind = EntityKind::Order;
    type Create = OrderCreate;
    type Patch = OrderPatch;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> String {
        if self.client_name.is_empty() {
            self.order_number.clone()
        } else {
            format!("{} - {}", self.order_number, self.client_name)
        }
    }

    fn fields() -> &'static [FieldSpec] {
        registry::ORDER_FIELDS
    }

    fn unique_field() -> &'static str {
        "numeroPedidoCliente"
    }
}

/// Body for `POST /api/pedidos`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderCreate {
    #[serde(rename = "numeroPedidoCliente")]
    pub order_number: String,
    #[serde(rename = "cliente")]
    pub client_name: String,
    #[serde(rename = "clienteId", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<EntityId>,
    #[serde(rename = "vendedorNombre", skip_serializing_if = "Option::is_none")]
    pub sales_rep: Option<String>,
    #[serde(rename = "metros", skip_serializing_if = "Option::is_none")]
    pub meters: Option<f64>,
    #[serde(rename = "prioridad")]
    pub priority: Priority,
    #[serde(rename = "fechaEntrega", skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(rename = "tipoImpresion", skip_serializing_if = "Option::is_none")]
    pub print_type: Option<String>,
    #[serde(rename = "observaciones", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body for `PUT /api/pedidos/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(rename = "numeroPedidoCliente", skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(rename = "cliente", skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(rename = "vendedorNombre", skip_serializing_if = "Option::is_none")]
    pub sales_rep: Option<String>,
    #[serde(rename = "maquinaImpresion", skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    #[serde(rename = "metros", skip_serializing_if = "Option::is_none")]
    pub meters: Option<f64>,
    #[serde(rename = "etapaActual", skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(rename = "subEtapaActual", skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,
    #[serde(rename = "prioridad", skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "fechaEntrega", skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(rename = "observaciones", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
