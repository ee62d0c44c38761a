// ── Value rendering for change descriptions ──
//
// Turns arbitrary JSON field values into short, human-readable text.

use serde_json::Value;

use super::AuditOptions;

/// Shown for null, missing and empty values.
pub const EMPTY: &str = "—";
/// Shown when an object cannot be serialized for preview.
pub const OBJECT_PLACEHOLDER: &str = "[objeto]";

const ELLIPSIS: char = '…';

/// Render a single field value.
pub fn render_value(value: &Value, options: &AuditOptions) -> String {
    match value {
        Value::Null => EMPTY.to_owned(),
        Value::Bool(true) => "Sí".to_owned(),
        Value::Bool(false) => "No".to_owned(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.trim().is_empty() => EMPTY.to_owned(),
        Value::String(s) => truncate(s, options.text_cap),
        Value::Array(items) => render_array(items, options),
        Value::Object(_) => render_object(value, options),
    }
}

/// Cut `text` to at most `cap` characters, marking the cut with `…`.
pub fn truncate(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(cap).collect();
    out.push(ELLIPSIS);
    out
}

fn render_array(items: &[Value], options: &AuditOptions) -> String {
    if items.is_empty() {
        return EMPTY.to_owned();
    }

    let shown: Vec<String> = items
        .iter()
        .take(options.array_items)
        .map(|item| render_value(item, options))
        .collect();
    let mut out = shown.join(", ");

    let hidden = items.len().saturating_sub(options.array_items);
    if hidden > 0 {
        out.push_str(&format!(" +{hidden}"));
    }
    out
}

fn render_object(value: &Value, options: &AuditOptions) -> String {
    match serde_json::to_string(value) {
        Ok(json) => truncate(&json, options.object_cap),
        Err(_) => OBJECT_PLACEHOLDER.to_owned(),
    }
}
