// ── Audited field registries ──
//
// One declarative table per kind. Keys are wire names; labels are what
// the history panel shows. Stage-role fields are reported first.

use serde_json::Value;

use crate::model::Stage;

/// How a field participates in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Lifecycle position (order stage, client status). Reported first.
    Stage,
    /// Any other audited field.
    Field,
}

/// One audited field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Wire key in the serialized record.
    pub key: &'static str,
    /// Human label.
    pub label: &'static str,
    /// Custom renderer; `None` uses the generic one.
    pub formatter: Option<fn(&Value) -> Option<String>>,
    pub role: FieldRole,
}

impl FieldSpec {
    pub const fn field(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            formatter: None,
            role: FieldRole::Field,
        }
    }

    pub const fn stage(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            formatter: None,
            role: FieldRole::Stage,
        }
    }

    pub const fn with_formatter(mut self, formatter: fn(&Value) -> Option<String>) -> Self {
        self.formatter = Some(formatter);
        self
    }
}

fn stage_title(value: &Value) -> Option<String> {
    Some(Stage::from_wire(value.as_str()?).title().into_owned())
}

pub const ORDER_FIELDS: &[FieldSpec] = &[
    FieldSpec::stage("etapaActual", "Etapa").with_formatter(stage_title),
    FieldSpec::stage("subEtapaActual", "Sub-etapa"),
    FieldSpec::field("prioridad", "Prioridad"),
    FieldSpec::field("fechaEntrega", "Fecha entrega"),
    FieldSpec::field("numeroPedidoCliente", "Nº pedido"),
    FieldSpec::field("cliente", "Cliente"),
    FieldSpec::field("vendedorNombre", "Vendedor"),
    FieldSpec::field("maquinaImpresion", "Máquina"),
    FieldSpec::field("metros", "Metros"),
    FieldSpec::field("tipoImpresion", "Tipo de impresión"),
    FieldSpec::field("materiales", "Materiales"),
    FieldSpec::field("observaciones", "Observaciones"),
];

pub const CLIENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::stage("estado", "Estado"),
    FieldSpec::field("nombre", "Nombre"),
    FieldSpec::field("razon_social", "Razón social"),
    FieldSpec::field("cif", "CIF"),
    FieldSpec::field("direccion", "Dirección"),
    FieldSpec::field("poblacion", "Población"),
    FieldSpec::field("codigo_postal", "Código postal"),
    FieldSpec::field("provincia", "Provincia"),
    FieldSpec::field("pais", "País"),
    FieldSpec::field("telefono", "Teléfono"),
    FieldSpec::field("email", "Email"),
    FieldSpec::field("persona_contacto", "Persona de contacto"),
    FieldSpec::field("observaciones", "Observaciones"),
];

pub const SALES_REP_FIELDS: &[FieldSpec] = &[
    FieldSpec::stage("activo", "Activo"),
    FieldSpec::field("nombre", "Nombre"),
    FieldSpec::field("email", "Email"),
    FieldSpec::field("telefono", "Teléfono"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registry_leads_with_a_stage_field() {
        for registry in [ORDER_FIELDS, CLIENT_FIELDS, SALES_REP_FIELDS] {
            assert_eq!(registry[0].role, FieldRole::Stage);
        }
    }

    #[test]
    fn stage_formatter_uses_board_titles() {
        let spec = ORDER_FIELDS[0];
        let format = spec.formatter.unwrap_or(|_| None);
        assert_eq!(
            format(&Value::String("IMPRESION".into())).as_deref(),
            Some("Impresión")
        );
        assert_eq!(
            format(&Value::String("POST_REBOBINADO_PROSLIT".into())).as_deref(),
            Some("Rebobinado PROSLIT")
        );
        assert_eq!(
            format(&Value::String("PREPARACION".into())).as_deref(),
            Some("Preparación")
        );
        assert_eq!(
            format(&Value::String("POST_BARNIZADO_X1".into())).as_deref(),
            Some("POST BARNIZADO X1")
        );
        assert_eq!(format(&Value::Null), None);
    }
}
