//! Shared entity cache between `pigmea-api` and its consumers (CLI, views).
//!
//! - **[`Workspace`]**: process-wide facade. Owns one [`Repository`] per
//!   record kind (clients, sales reps, orders), the history sink and the
//!   push connection. [`connect_push()`](Workspace::connect_push) starts one
//!   [`RealtimeBridge`] per kind over a single WebSocket stream.
//!
//! - **[`EntityStore<K>`]**: the canonical ordered collection for one kind.
//!   Initial loads are coalesced so any number of concurrent consumers cause
//!   a single fetch; every transition is published to callback
//!   [`Subscription`]s and to watch-channel [`EntityStream`]s.
//!
//! - **[`MutationGate<K>`]**: confirmed-then-applied writes. Nothing touches
//!   the store until the backend answers, and results merge through the same
//!   id-keyed primitives the realtime bridge uses.
//!
//! - **[`audit`]**: before/after diffs rendered through declarative field
//!   registries, and the [`HistoryRecorder`] that appends them to a
//!   [`HistorySink`].
//!
//! - **[`AsyncValidationGuard`]**: debounced uniqueness checks that discard
//!   stale answers.

pub mod audit;
pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod mutation;
pub mod realtime;
pub mod store;
pub mod stream;
pub mod validation;
pub mod workspace;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use audit::{
    ActionKind, ActionRecord, AuditOptions, ChangeDescription, ChangeSummary, HistoryRecorder,
    HistorySink, MemoryHistorySink, NoOpHistorySink, TracingHistorySink,
};
pub use backend::{EntityBackend, HttpBackend};
pub use config::{CoreConfig, HistoryMode};
pub use error::CoreError;
pub use mutation::{BulkOutcome, MutationGate};
pub use realtime::{PushEvent, RealtimeBridge};
pub use store::{EntityStore, StoreState, Subscription};
pub use stream::{ClientFilter, EntityStream, OrderFilter, SalesRepFilter};
pub use validation::{
    AsyncValidationGuard, ExistenceCheck, UniqueFieldCheck, ValidationConfig, ValidationState,
};
pub use workspace::{Backends, Repository, Workspace};

// Transport types that appear in `CoreConfig`.
pub use pigmea_api::{PushFrame, ReconnectConfig, TlsMode, UserIdentity};

pub use model::{
    Client, ClientCreate, ClientPatch, ClientStatus, Entity, EntityId, EntityKind, Order,
    OrderCreate, OrderPatch, Priority, SalesRep, SalesRepCreate, SalesRepPatch, Stage, StagePhase,
    UnknownStage,
};
