// ── Sales rep domain type ──

use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};
use crate::audit::{FieldSpec, registry};

fn default_active() -> bool {
    true
}

/// A salesperson orders are attributed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRep {
    pub id: EntityId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "activo", default = "default_active")]
    pub active: bool,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Entity for SalesRep {
    const KIND: EntityKind = EntityKind::SalesRep;
    type Create = SalesRepCreate;
    type Patch = SalesRepPatch;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn fields() -> &'static [FieldSpec] {
        registry::SALES_REP_FIELDS
    }

    fn unique_field() -> &'static str {
        "nombre"
    }
}

/// Body for `POST /api/vendedores`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesRepCreate {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "activo", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Body for `PUT /api/vendedores/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesRepPatch {
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "activo", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn active_defaults_to_true() {
        let rep: SalesRep =
            serde_json::from_value(serde_json::json!({ "id": "v1", "nombre": "Lucía" })).unwrap();
        assert!(rep.active);
        assert_eq!(rep.label(), "Lucía");
    }

    #[test]
    fn camel_case_timestamps() {
        let rep: SalesRep = serde_json::from_value(serde_json::json!({
            "id": "v1",
            "nombre": "Lucía",
            "activo": false,
            "createdAt": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(!rep.active);
        assert_eq!(rep.created_at.as_deref(), Some("2025-01-01T00:00:00Z"));
    }
}
