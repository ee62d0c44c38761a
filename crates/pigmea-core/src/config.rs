// ── Runtime workspace configuration ──
//
// Describes how to reach the backend and how the cache behaves. Carries
// credential data but never touches disk: the CLI (via `pigmea-config`)
// builds a `CoreConfig` and hands it to `Workspace::new`.

use std::time::Duration;

use pigmea_api::{ReconnectConfig, TlsMode, TransportConfig, UserIdentity};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::audit::AuditOptions;
use crate::error::CoreError;
use crate::validation::ValidationConfig;

/// Default in-memory history capacity.
pub const DEFAULT_HISTORY_CAPACITY: usize = 500;

/// Where confirmed mutations are recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryMode {
    /// Bounded in-memory log, queryable through the workspace.
    #[default]
    Memory,
    /// One `info` event per record.
    Log,
    Off,
}

/// Configuration for one workspace (one backend).
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Backend base URL (e.g., `http://localhost:8080`).
    pub backend_url: Url,
    /// Push endpoint. Derived from `backend_url` when absent.
    pub push_url: Option<Url>,
    /// Sent as `x-user-id` / `x-user-role` on every request.
    pub identity: Option<UserIdentity>,
    /// Optional bearer token.
    pub token: Option<SecretString>,
    pub tls: TlsMode,
    pub timeout: Duration,
    /// Whether `Workspace::connect_push` opens the push stream at all.
    pub push_enabled: bool,
    pub reconnect: ReconnectConfig,
    pub validation: ValidationConfig,
    pub audit: AuditOptions,
    pub history: HistoryMode,
    /// Entries kept by the in-memory history sink.
    pub history_capacity: usize,
}

impl CoreConfig {
    pub fn new(backend_url: Url) -> Self {
        Self {
            backend_url,
            push_url: None,
            identity: None,
            token: None,
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
            push_enabled: true,
            reconnect: ReconnectConfig::default(),
            validation: ValidationConfig::default(),
            audit: AuditOptions::default(),
            history: HistoryMode::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// HTTP transport settings for `pigmea-api`.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
            identity: self.identity.clone(),
            token: self.token.clone(),
        }
    }

    /// The push endpoint: the explicit one, or `ws(s)://host[:port]/ws`.
    pub fn resolved_push_url(&self) -> Result<Url, CoreError> {
        if let Some(url) = &self.push_url {
            return Ok(url.clone());
        }

        let scheme = match self.backend_url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(CoreError::Config {
                    message: format!("cannot derive push URL from scheme `{other}`"),
                });
            }
        };
        let host = self.backend_url.host_str().ok_or_else(|| CoreError::Config {
            message: format!("backend URL `{}` has no host", self.backend_url),
        })?;
        let raw = match self.backend_url.port() {
            Some(port) => format!("{scheme}://{host}:{port}/ws"),
            None => format!("{scheme}://{host}/ws"),
        };
        Url::parse(&raw).map_err(|e| CoreError::Config {
            message: format!("invalid push URL `{raw}`: {e}"),
        })
    }

    /// Identity and bearer headers for the push handshake.
    pub fn push_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(id) = &self.identity {
            headers.push((
                pigmea_api::transport::USER_ID_HEADER.to_owned(),
                id.user_id.clone(),
            ));
            headers.push((
                pigmea_api::transport::USER_ROLE_HEADER.to_owned(),
                id.role.clone(),
            ));
        }
        if let Some(token) = &self.token {
            headers.push((
                "authorization".to_owned(),
                format!("Bearer {}", token.expose_secret()),
            ));
        }
        headers
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(url: &str) -> CoreConfig {
        CoreConfig::new(Url::parse(url).unwrap())
    }

    #[test]
    fn derives_push_url_from_backend() {
        assert_eq!(
            config("http://localhost:8080").resolved_push_url().unwrap().as_str(),
            "ws://localhost:8080/ws"
        );
        assert_eq!(
            config("https://pigmea.example.com/api/")
                .resolved_push_url()
                .unwrap()
                .as_str(),
            "wss://pigmea.example.com/ws"
        );
    }

    #[test]
    fn explicit_push_url_wins() {
        let mut cfg = config("http://localhost:8080");
        cfg.push_url = Some(Url::parse("ws://push.local:9000/socket").unwrap());
        assert_eq!(
            cfg.resolved_push_url().unwrap().as_str(),
            "ws://push.local:9000/socket"
        );
    }

    #[test]
    fn unsupported_scheme_is_a_config_error() {
        let err = config("ftp://files.local").resolved_push_url().unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn identity_becomes_push_headers() {
        let mut cfg = config("http://localhost:8080");
        assert!(cfg.push_headers().is_empty());

        cfg.identity = Some(UserIdentity {
            user_id: "u1".into(),
            role: "Administrador".into(),
        });
        cfg.token = Some(SecretString::from("t0k".to_owned()));
        let headers = cfg.push_headers();
        assert_eq!(headers[0], ("x-user-id".to_owned(), "u1".to_owned()));
        assert_eq!(headers[1].1, "Administrador");
        assert_eq!(headers[2].1, "Bearer t0k");
    }
}
