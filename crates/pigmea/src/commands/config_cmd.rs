//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Copy of `cfg` safe to print: plaintext tokens are masked.
fn redacted(cfg: &Config) -> Config {
    let mut shown = cfg.clone();
    for profile in shown.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some("********".into());
        }
    }
    shown
}

/// Insert or replace the profile described by `args`.
fn apply_init(cfg: &mut Config, args: &ConfigInitArgs) -> Result<(), CliError> {
    args.url
        .parse::<url::Url>()
        .map_err(|_| CliError::Validation {
            field: "url".into(),
            reason: format!("invalid URL: {}", args.url),
        })?;

    let mut profile = cfg.profiles.remove(&args.name).unwrap_or_default();
    profile.backend.clone_from(&args.url);
    if args.user_id.is_some() {
        profile.user_id.clone_from(&args.user_id);
        profile.role.clone_from(&args.role);
    }
    cfg.profiles.insert(args.name.clone(), profile);

    if args.set_default || cfg.profiles.len() == 1 {
        cfg.default_profile = Some(args.name.clone());
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init(init) => {
            let path = config::config_path();
            let mut cfg = config::load_config_or_default();
            apply_init(&mut cfg, &init)?;
            config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!("Configuration written to {}", path.display());
                eprintln!("  Profile: {} -> {}", init.name, init.url);
                eprintln!("\n  Test it: pigmea --profile {} clients list", init.name);
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(global.output, &cfg, |c| {
                toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n# {e}"))
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetToken { token } => {
            let cfg = config::load_config_or_default();
            let name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", "),
                    name,
                });
            }
            pigmea_config::store_token(&name, &token)?;
            if !global.quiet {
                eprintln!("Token for profile '{name}' stored in system keyring");
            }
            Ok(())
        }
    }
}
