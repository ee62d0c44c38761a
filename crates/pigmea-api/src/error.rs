use thiserror::Error;

/// Top-level error type for the `pigmea-api` crate.
///
/// Covers every failure mode of the backend surfaces: HTTP transport,
/// REST status codes, payload decoding, and the push WebSocket.
/// `pigmea-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The backend rejected the request identity (HTTP 401/403).
    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    /// A credential could not be encoded as an HTTP header.
    #[error("Invalid header value for {header}: {reason}")]
    InvalidHeader { header: String, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup error (unreadable or invalid CA certificate).
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST ────────────────────────────────────────────────────────
    /// The addressed record does not exist (HTTP 404).
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// The backend refused the write because of a uniqueness conflict (HTTP 409).
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Any other non-success status, with the server's message when present.
    #[error("Backend error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` for a uniqueness conflict reported by the backend.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_detected() {
        let err = Error::Conflict {
            message: "Ya existe un cliente con este nombre".into(),
        };
        assert!(err.is_conflict());
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Http {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());

        let err = Error::Http {
            status: 400,
            message: "bad".into(),
        };
        assert!(!err.is_transient());
    }
}
