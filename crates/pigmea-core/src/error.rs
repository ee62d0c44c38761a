// ── Core error types ──
//
// Domain errors surfaced by pigmea-core. Consumers never see HTTP status
// codes or JSON parse failures directly; `From<pigmea_api::Error>`
// translates transport-layer errors into the variants below.
//
// `CoreError` is `Clone`: a coalesced initial load hands the same failure
// to every waiter.

use thiserror::Error;

use crate::model::EntityKind;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend request timed out")]
    Timeout,

    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{kind} not found: {identifier}")]
    NotFound {
        kind: EntityKind,
        identifier: String,
    },

    #[error("Initial load of {kind} failed: {message}")]
    LoadFailed { kind: EntityKind, message: String },

    // ── Operation errors ─────────────────────────────────────────────
    /// The backend refused a write because a unique field is taken.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Operation rejected by backend: {message}")]
    Rejected { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Attach the entity kind to a kind-less `NotFound` coming from the API layer.
    pub(crate) fn for_kind(self, kind: EntityKind) -> Self {
        match self {
            Self::NotFound { identifier, .. } => Self::NotFound { kind, identifier },
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<pigmea_api::Error> for CoreError {
    fn from(err: pigmea_api::Error) -> Self {
        match err {
            pigmea_api::Error::Unauthorized { message } => CoreError::Unauthorized { message },
            pigmea_api::Error::InvalidHeader { header, reason } => CoreError::Config {
                message: format!("invalid {header} header: {reason}"),
            },
            pigmea_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            pigmea_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            pigmea_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            pigmea_api::Error::NotFound { path } => CoreError::NotFound {
                kind: EntityKind::Order,
                identifier: path,
            },
            pigmea_api::Error::Conflict { message } => CoreError::Conflict { message },
            pigmea_api::Error::Http { status, message } if (400..500).contains(&status) => {
                CoreError::Rejected { message }
            }
            pigmea_api::Error::Http { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            pigmea_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("push connection failed: {reason}"),
            },
            pigmea_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("push stream closed (code {code}): {reason}"),
            },
            pigmea_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
