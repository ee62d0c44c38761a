//! CLI error types with miette diagnostics and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use pigmea_config::ConfigError;
use pigmea_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to backend at {url}: {reason}")]
    #[diagnostic(
        code(pigmea::connection_failed),
        help("Check that the backend is running and the URL is correct.\n  URL: {url}")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(pigmea::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout,

    // ── Auth ─────────────────────────────────────────────────────────

    #[error("Not authorized: {message}")]
    #[diagnostic(
        code(pigmea::auth_failed),
        help("Check user_id/role in the profile or store a token: pigmea config set-token <TOKEN>")
    )]
    AuthFailed { message: String },

    // ── Data ─────────────────────────────────────────────────────────

    #[error("{resource_type} not found: {identifier}")]
    #[diagnostic(code(pigmea::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("Conflict: {message}")]
    #[diagnostic(code(pigmea::conflict))]
    Conflict { message: String },

    #[error("Backend error: {message}")]
    #[diagnostic(code(pigmea::api_error))]
    ApiError { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid {field}: {reason}")]
    #[diagnostic(code(pigmea::validation))]
    Validation { field: String, reason: String },

    #[error("Profile '{name}' not found in config")]
    #[diagnostic(
        code(pigmea::profile_not_found),
        help("Available profiles: {available}\n  Create one with: pigmea config init --name {name}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(pigmea::no_config),
        help("Run: pigmea config init\n  Or pass --backend <URL>\n  Expected config at: {path}")
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(pigmea::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(pigmea::json))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::Unauthorized { message } => Self::AuthFailed { message },
            CoreError::NotFound { kind, identifier } => Self::NotFound {
                resource_type: kind.title().to_lowercase(),
                identifier,
            },
            CoreError::Conflict { message } => Self::Conflict { message },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::LoadFailed { .. }
            | CoreError::Rejected { .. }
            | CoreError::Api { .. } => Self::ApiError {
                message: err.to_string(),
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pigmea_core::EntityKind;

    #[test]
    fn core_errors_keep_their_exit_codes() {
        let not_found: CliError = CoreError::NotFound {
            kind: EntityKind::Order,
            identifier: "42".into(),
        }
        .into();
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(not_found.to_string(), "pedido not found: 42");

        let conflict: CliError = CoreError::Conflict {
            message: "duplicado".into(),
        }
        .into();
        assert_eq!(conflict.exit_code(), exit_code::CONFLICT);

        let config: CliError = ConfigError::Validation {
            field: "backend".into(),
            reason: "invalid URL".into(),
        }
        .into();
        assert_eq!(config.exit_code(), exit_code::USAGE);
    }
}
