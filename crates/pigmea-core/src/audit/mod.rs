// ── Audit trail ──
//
// Human-readable change descriptions built from before/after record
// snapshots, and the action history they feed. Independent of the store.

mod diff;
mod history;
pub mod registry;
mod render;

pub use diff::{ChangeDescription, ChangeSummary, diff, is_stage_move, summarize};
pub use history::{
    ActionKind, ActionRecord, HistoryRecorder, HistorySink, MemoryHistorySink, NoOpHistorySink,
    TracingHistorySink,
};
pub use registry::{FieldRole, FieldSpec};
pub use render::{render_value, truncate};

/// Rendering limits for change descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditOptions {
    /// Strings longer than this many characters are cut with `…`.
    pub text_cap: usize,
    /// Array elements shown before the `+N` tail.
    pub array_items: usize,
    /// Character budget for object previews.
    pub object_cap: usize,
    /// Changes listed in a summary before `+N más`.
    pub preview_count: usize,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            text_cap: 32,
            array_items: 3,
            object_cap: 48,
            preview_count: 3,
        }
    }
}
