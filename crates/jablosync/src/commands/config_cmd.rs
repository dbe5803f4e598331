//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Confirm, Input, Password, Select};

use jablosync_config::{self as config, Config, Profile, SecretKind};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::commands::util::prompt_err;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking secrets.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if p.pin.is_some() {
            let _ = writeln!(out, "pin = \"****\"");
        }
        if let Some(ref url) = p.base_url {
            let _ = writeln!(out, "base_url = \"{url}\"");
        }
        let _ = writeln!(out, "poll_interval_secs = {}", p.poll_interval_secs);
        let _ = writeln!(out, "poll_timeout_secs = {}", p.poll_timeout_secs);
        let _ = writeln!(out, "default_bypass = {}", p.default_bypass);
        let _ = writeln!(out, "max_backoff_secs = {}", p.max_backoff_secs);
        let _ = writeln!(out, "degraded_after = {}", p.degraded_after);
        let _ = writeln!(out, "confirmation_timeout_secs = {}", p.confirmation_timeout_secs);
        let _ = writeln!(out, "max_auto_retries = {}", p.max_auto_retries);
        let _ = writeln!(out, "distinguishes_partial_arm = {}", p.distinguishes_partial_arm);
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out.trim_end().to_owned()
}

/// Same structure as the file, with secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut copy = cfg.clone();
    for profile in copy.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("****".into());
        }
        if profile.pin.is_some() {
            profile.pin = Some("****".into());
        }
    }
    copy
}

fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

fn profile_not_found(cfg: &Config, name: String) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: key.into(),
        reason: format!("must be {expected}"),
    })
}

/// Offer to store a secret in the system keyring or return it for plaintext config.
///
/// Returns `Some(secret)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_keyring_storage(
    secret: &str,
    profile_name: &str,
    kind: SecretKind,
    label: &str,
) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {label}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        config::store_secret(profile_name, kind, secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret.to_owned()))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("jablosync configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let mut cfg = config::load_config()?;

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let username: String = Input::new()
                .with_prompt("Jablonet account (email)")
                .interact_text()
                .map_err(prompt_err)?;

            let password = Password::new()
                .with_prompt("Password")
                .interact()
                .map_err(prompt_err)?;
            if username.is_empty() || password.is_empty() {
                return Err(CliError::Validation {
                    field: "credentials".into(),
                    reason: "username and password cannot be empty".into(),
                });
            }
            let password =
                prompt_keyring_storage(&password, &profile_name, SecretKind::Password, "password")?;

            let store_pin = Confirm::new()
                .with_prompt("Store a default alarm code?")
                .default(false)
                .interact()
                .map_err(prompt_err)?;
            let pin = if store_pin {
                let code = Password::new()
                    .with_prompt("Alarm code")
                    .interact()
                    .map_err(prompt_err)?;
                prompt_keyring_storage(&code, &profile_name, SecretKind::Pin, "alarm code")?
            } else {
                None
            };

            let profile = Profile {
                username: Some(username),
                password,
                pin,
                ..Profile::default()
            };
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            let path = config::save_config(&cfg)?;
            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: jablosync status");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config()?);
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            let profile_name = active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            match key.as_str() {
                "username" => profile.username = Some(value),
                "password" => profile.password = Some(value),
                "pin" => profile.pin = Some(value),
                "base_url" | "base-url" => profile.base_url = Some(value),
                "poll_interval_secs" | "poll-interval" => {
                    profile.poll_interval_secs = parse_value(&key, &value, "a number (seconds)")?;
                }
                "poll_timeout_secs" | "poll-timeout" => {
                    profile.poll_timeout_secs = parse_value(&key, &value, "a number (seconds)")?;
                }
                "default_bypass" | "default-bypass" => {
                    profile.default_bypass = parse_value(&key, &value, "'true' or 'false'")?;
                }
                "max_backoff_secs" => {
                    profile.max_backoff_secs = parse_value(&key, &value, "a number (seconds)")?;
                }
                "degraded_after" => {
                    profile.degraded_after = parse_value(&key, &value, "a number")?;
                }
                "confirmation_timeout_secs" => {
                    profile.confirmation_timeout_secs =
                        parse_value(&key, &value, "a number (seconds)")?;
                }
                "max_auto_retries" => {
                    profile.max_auto_retries = parse_value(&key, &value, "a number")?;
                }
                "distinguishes_partial_arm" => {
                    profile.distinguishes_partial_arm =
                        parse_value(&key, &value, "'true' or 'false'")?;
                }
                "timeout" => {
                    profile.timeout = Some(parse_value(&key, &value, "a number (seconds)")?);
                }
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: username, password, pin, \
                             base_url, poll_interval_secs, poll_timeout_secs, default_bypass, \
                             max_backoff_secs, degraded_after, confirmation_timeout_secs, \
                             max_auto_retries, distinguishes_partial_arm, timeout"
                        ),
                    });
                }
            }

            config::validate_profile(profile)?;
            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: jablosync config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(&cfg, name));
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetSecret ───────────────────────────────────────────────
        ConfigCommand::SetSecret { pin } => {
            let cfg = config::load_config()?;
            let profile_name = active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(&cfg, profile_name));
            }

            let (kind, label) = if pin {
                (SecretKind::Pin, "Alarm code")
            } else {
                (SecretKind::Password, "Password")
            };
            let secret = Password::new()
                .with_prompt(label)
                .interact()
                .map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "secret".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            config::store_secret(&profile_name, kind, &secret)?;
            eprintln!("✓ {label} stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
