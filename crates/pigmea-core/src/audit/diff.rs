// ── Before/after diffing ──
//
// Pure functions: a record pair plus a field registry in, an ordered list
// of change descriptions out. Stateless and safe to call from any task.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::AuditOptions;
use super::registry::{FieldRole, FieldSpec};
use super::render::render_value;
use crate::model::EntityKind;

/// One changed field, already rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescription {
    pub key: &'static str,
    pub label: &'static str,
    pub role: FieldRole,
    pub before: String,
    pub after: String,
}

impl fmt::Display for ChangeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} → {}", self.label, self.before, self.after)
    }
}

/// Compare two records field by field according to `registry`.
///
/// Stage-role fields come first, then the rest in registry order.
/// Fields absent from both sides, or absent on one side and null on the
/// other, are considered equal.
pub fn diff<T: Serialize>(
    before: &T,
    after: &T,
    registry: &[FieldSpec],
    options: &AuditOptions,
) -> Vec<ChangeDescription> {
    let before = to_json(before);
    let after = to_json(after);

    let stage_fields = registry.iter().filter(|f| f.role == FieldRole::Stage);
    let other_fields = registry.iter().filter(|f| f.role == FieldRole::Field);

    stage_fields
        .chain(other_fields)
        .filter_map(|spec| {
            let old = before.get(spec.key).unwrap_or(&Value::Null);
            let new = after.get(spec.key).unwrap_or(&Value::Null);
            (old != new).then(|| ChangeDescription {
                key: spec.key,
                label: spec.label,
                role: spec.role,
                before: render_field(spec, old, options),
                after: render_field(spec, new, options),
            })
        })
        .collect()
}

/// `true` when every change is a stage-role field (a board move).
pub fn is_stage_move(changes: &[ChangeDescription]) -> bool {
    !changes.is_empty() && changes.iter().all(|c| c.role == FieldRole::Stage)
}

fn render_field(spec: &FieldSpec, value: &Value, options: &AuditOptions) -> String {
    spec.formatter
        .and_then(|format| format(value))
        .unwrap_or_else(|| render_value(value, options))
}

fn to_json<T: Serialize>(record: &T) -> Value {
    serde_json::to_value(record).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "record could not be serialized for diffing");
        Value::Null
    })
}

// ── Summary ──────────────────────────────────────────────────────────

/// One-line digest of a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSummary {
    pub title: String,
    /// First few changes joined, with a `+N más` tail when truncated.
    pub preview: String,
    pub total: usize,
}

impl ChangeSummary {
    /// `"{title} ({preview})"`, or just the title when nothing changed.
    pub fn description(&self) -> String {
        if self.preview.is_empty() {
            self.title.clone()
        } else {
            format!("{} ({})", self.title, self.preview)
        }
    }
}

/// Build the summary line for an update of the record labelled `label`.
pub fn summarize(
    kind: EntityKind,
    label: &str,
    changes: &[ChangeDescription],
    options: &AuditOptions,
) -> ChangeSummary {
    let title = if is_stage_move(changes) {
        let noun = match kind {
            EntityKind::Order => "etapa",
            EntityKind::Client | EntityKind::SalesRep => "estado",
        };
        format!("Cambio de {noun}: {label}")
    } else {
        format!("{} actualizado: {label}", kind.title())
    };

    let shown: Vec<String> = changes
        .iter()
        .take(options.preview_count)
        .map(ToString::to_string)
        .collect();
    let mut preview = shown.join(", ");

    let remainder = changes.len().saturating_sub(options.preview_count);
    if remainder > 0 {
        preview.push_str(&format!(" +{remainder} más"));
    }

    ChangeSummary {
        title,
        preview,
        total: changes.len(),
    }
}
