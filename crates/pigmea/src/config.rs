//! CLI configuration: thin wrapper around `pigmea_config`.
//!
//! Adds profile selection and the `GlobalOpts` flag overrides
//! (`--backend`, `--token`, `--insecure`, `--timeout`).

use std::time::Duration;

use secrecy::SecretString;

use pigmea_core::{CoreConfig, TlsMode};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use pigmea_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `CoreConfig` from the config file and CLI overrides.
pub fn build_core_config(global: &GlobalOpts) -> Result<CoreConfig, CliError> {
    let cfg = load_config_or_default();
    resolve_core_config(global, &cfg)
}

/// Flag > env > profile > defaults.
pub fn resolve_core_config(global: &GlobalOpts, cfg: &Config) -> Result<CoreConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut profile = match (cfg.profiles.get(&profile_name), &global.backend) {
        (Some(profile), _) => profile.clone(),
        // An explicitly requested profile must exist.
        (None, _) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(cfg),
                name: profile_name,
            });
        }
        (None, Some(_)) => Profile::default(),
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(backend) = &global.backend {
        profile.backend.clone_from(backend);
    }

    let mut core = pigmea_config::profile_to_core_config(&profile, &profile_name, &cfg.defaults)?;

    if let Some(token) = &global.token {
        core.token = Some(SecretString::from(token.clone()));
    }
    if global.insecure {
        core.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        core.timeout = Duration::from_secs(secs);
    }

    Ok(core)
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
