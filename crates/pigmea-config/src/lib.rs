//! Shared configuration for Pigmea tools.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `pigmea_core::CoreConfig`. The CLI adds flag-aware
//! wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pigmea_api::{TlsMode, UserIdentity};
use pigmea_core::{AuditOptions, CoreConfig, HistoryMode, ValidationConfig};

/// Keyring service name; entries are keyed `{profile}/token`.
pub const KEYRING_SERVICE: &str = "pigmea";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Quiet period before a uniqueness check runs, in milliseconds.
    #[serde(default = "default_validation_delay_ms")]
    pub validation_delay_ms: u64,

    /// Shortest (trimmed) value worth checking.
    #[serde(default = "default_validation_min_length")]
    pub validation_min_length: usize,

    /// Characters kept when rendering long text in change descriptions.
    #[serde(default = "default_text_cap")]
    pub audit_text_cap: usize,

    /// Changes listed in a history summary before `+N más`.
    #[serde(default = "default_preview_count")]
    pub audit_preview_count: usize,

    /// `memory`, `log` or `off`.
    #[serde(default = "default_history")]
    pub history: String,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            validation_delay_ms: default_validation_delay_ms(),
            validation_min_length: default_validation_min_length(),
            audit_text_cap: default_text_cap(),
            audit_preview_count: default_preview_count(),
            history: default_history(),
            history_capacity: default_history_capacity(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_validation_delay_ms() -> u64 {
    3000
}
fn default_validation_min_length() -> usize {
    3
}
fn default_text_cap() -> usize {
    32
}
fn default_preview_count() -> usize {
    3
}
fn default_history() -> String {
    "memory".into()
}
fn default_history_capacity() -> usize {
    pigmea_core::config::DEFAULT_HISTORY_CAPACITY
}

/// A named backend profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "http://localhost:8080").
    pub backend: String,

    /// Push endpoint; derived from `backend` when unset.
    pub push_url: Option<String>,

    /// Disable the push stream for this profile.
    pub push: Option<bool>,

    /// Sent as `x-user-id`.
    pub user_id: Option<String>,

    /// Sent as `x-user-role`.
    pub role: Option<String>,

    /// Bearer token in plaintext. Prefer keyring or `token_env`.
    pub token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid certificates.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "pigmea", "pigmea").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pigmea");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, layered as defaults → TOML file → `PIGMEA_` env.
///
/// Nested keys use a double underscore: `PIGMEA_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PIGMEA_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the bearer token from the credential chain.
///
/// Order: `token_env` variable, system keyring, plaintext. A profile
/// without any token is valid; the backend may not require one.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token")) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile.token.clone().map(SecretString::from)
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))?;
    entry.set_password(token)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

pub fn parse_history_mode(raw: &str) -> Result<HistoryMode, ConfigError> {
    match raw {
        "memory" => Ok(HistoryMode::Memory),
        "log" => Ok(HistoryMode::Log),
        "off" => Ok(HistoryMode::Off),
        other => Err(ConfigError::Validation {
            field: "history".into(),
            reason: format!("expected 'memory', 'log', or 'off', got '{other}'"),
        }),
    }
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `CoreConfig` from a profile and the global defaults, without CLI
/// flag overrides.
pub fn profile_to_core_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<CoreConfig, ConfigError> {
    let mut config = CoreConfig::new(parse_url("backend", &profile.backend)?);

    config.push_url = profile
        .push_url
        .as_deref()
        .map(|raw| parse_url("push_url", raw))
        .transpose()?;
    config.push_enabled = profile.push.unwrap_or(true);

    config.identity = match (&profile.user_id, &profile.role) {
        (Some(user_id), role) => Some(UserIdentity {
            user_id: user_id.clone(),
            role: role.clone().unwrap_or_default(),
        }),
        (None, Some(_)) => {
            return Err(ConfigError::Validation {
                field: "role".into(),
                reason: "a role requires a user_id".into(),
            });
        }
        (None, None) => None,
    };
    config.token = resolve_token(profile, profile_name);

    config.tls = if profile.insecure.unwrap_or(false) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    config.validation = ValidationConfig {
        delay: Duration::from_millis(defaults.validation_delay_ms),
        min_length: defaults.validation_min_length,
    };
    config.audit = AuditOptions {
        text_cap: defaults.audit_text_cap,
        preview_count: defaults.audit_preview_count,
        ..AuditOptions::default()
    };
    config.history = parse_history_mode(&defaults.history)?;
    config.history_capacity = defaults.history_capacity;

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use pretty_assertions::assert_eq;

    fn profile(backend: &str) -> Profile {
        Profile {
            backend: backend.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.validation_delay_ms, 3000);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "taller"

[defaults]
timeout = 10
history = "log"

[profiles.taller]
backend = "http://192.168.1.20:8080"
user_id = "u-7"
role = "Operador"
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("taller"));
        assert_eq!(cfg.defaults.timeout, 10);
        assert_eq!(cfg.defaults.output, "table");

        let taller = &cfg.profiles["taller"];
        let core = profile_to_core_config(taller, "taller", &cfg.defaults).unwrap();
        assert_eq!(core.backend_url.as_str(), "http://192.168.1.20:8080/");
        assert_eq!(core.timeout, Duration::from_secs(10));
        assert_eq!(core.history, HistoryMode::Log);
        assert_eq!(core.identity.as_ref().unwrap().role, "Operador");
        assert_eq!(
            core.resolved_push_url().unwrap().as_str(),
            "ws://192.168.1.20:8080/ws"
        );
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles
            .insert("default".into(), profile("http://localhost:8080"));
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles, cfg.profiles);
    }

    #[test]
    fn invalid_values_are_validation_errors() {
        let defaults = Defaults::default();

        let err = profile_to_core_config(&profile("not a url"), "x", &defaults).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "backend"));

        let mut p = profile("http://localhost:8080");
        p.role = Some("Administrador".into());
        let err = profile_to_core_config(&p, "x", &defaults).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "role"));

        assert!(parse_history_mode("disk").is_err());
    }

    #[test]
    fn token_env_wins_over_plaintext() {
        let mut p = profile("http://localhost:8080");
        p.token = Some("plain".into());
        assert_eq!(
            resolve_token(&p, "pigmea-test-no-keyring")
                .unwrap()
                .expose_secret(),
            "plain"
        );

        // PATH is set in every test environment.
        p.token_env = Some("PATH".into());
        let expected = std::env::var("PATH").unwrap();
        assert_eq!(
            resolve_token(&p, "pigmea-test-no-keyring")
                .unwrap()
                .expose_secret(),
            expected
        );
    }

    #[test]
    fn tls_mode_follows_profile() {
        let defaults = Defaults::default();
        let mut p = profile("https://pigmea.example.com");

        p.ca_cert = Some(PathBuf::from("/etc/pigmea/ca.pem"));
        let core = profile_to_core_config(&p, "x", &defaults).unwrap();
        assert!(matches!(core.tls, TlsMode::CustomCa(_)));

        p.insecure = Some(true);
        let core = profile_to_core_config(&p, "x", &defaults).unwrap();
        assert!(matches!(core.tls, TlsMode::DangerAcceptInvalid));
    }
}
