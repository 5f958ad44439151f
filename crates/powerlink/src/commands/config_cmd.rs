//! Config subcommand handlers.

use std::collections::HashMap;

use dialoguer::{Input, Select};

use powerlink_config::{KEYRING_SERVICE, keyring_account};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Defaults, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout_ms = {}", cfg.defaults.timeout_ms);
    let _ = writeln!(out, "debug = {}", cfg.defaults.debug);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "host = \"{}\"", p.host);
        let _ = writeln!(out, "protocol = \"{}\"", p.protocol);
        let _ = writeln!(out, "app_type = \"{}\"", p.app_type);
        if p.user_code.is_some() {
            let _ = writeln!(out, "user_code = \"****\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        let plain = [
            ("user_code_env", &p.user_code_env),
            ("user_id", &p.user_id),
            ("panel_web_name", &p.panel_web_name),
            ("email", &p.email),
            ("app_id", &p.app_id),
            ("panel_serial", &p.panel_serial),
        ];
        for (key, value) in plain {
            if let Some(v) = value {
                let _ = writeln!(out, "{key} = \"{v}\"");
            }
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout_ms {
            let _ = writeln!(out, "timeout_ms = {timeout}");
        }
        if let Some(debug) = p.debug {
            let _ = writeln!(out, "debug = {debug}");
        }
    }

    out
}

/// Copy of the config with plaintext secrets masked, for structured output.
fn redacted(cfg: &Config) -> Config {
    let mask = |secret: Option<&String>| secret.map(|_| "****".to_owned());
    Config {
        default_profile: cfg.default_profile.clone(),
        defaults: Defaults {
            output: cfg.defaults.output.clone(),
            color: cfg.defaults.color.clone(),
            insecure: cfg.defaults.insecure,
            timeout_ms: cfg.defaults.timeout_ms,
            debug: cfg.defaults.debug,
        },
        profiles: cfg
            .profiles
            .iter()
            .map(|(name, p)| {
                let profile = Profile {
                    user_code: mask(p.user_code.as_ref()),
                    password: mask(p.password.as_ref()),
                    ..p.clone()
                };
                (name.clone(), profile)
            })
            .collect(),
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_text(prompt: &str, default: Option<&str>) -> Result<String, CliError> {
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.to_owned());
    }
    input.interact_text().map_err(prompt_err)
}

fn prompt_secret(label: &str) -> Result<String, CliError> {
    let secret = rpassword::prompt_password(format!("{label}: ")).map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: label.to_lowercase(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(secret)
}

fn store_in_keyring(profile_name: &str, secret_kind: &str, secret: &str) -> Result<(), CliError> {
    let account = keyring_account(profile_name, secret_kind);
    let entry =
        keyring::Entry::new(KEYRING_SERVICE, &account).map_err(|e| CliError::Validation {
            field: "keyring".into(),
            reason: format!("failed to access keyring: {e}"),
        })?;
    entry
        .set_password(secret)
        .map_err(|e| CliError::Validation {
            field: "keyring".into(),
            reason: format!("failed to store {secret_kind} in keyring: {e}"),
        })
}

/// Offer to store a secret in the system keyring or return it for plaintext config.
///
/// Returns `Some(secret)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_keyring_storage(
    profile_name: &str,
    secret_kind: &str,
    secret: String,
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
        store_in_keyring(profile_name, secret_kind, &secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(
                &global.output,
                &redacted(&cfg),
                format_config_redacted,
                |c| c.default_profile.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetCode { profile } => {
            let cfg = config::load_config()?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            let prof = config::find_profile(&cfg, &profile_name)?;

            if prof.protocol == "v8" {
                let password = prompt_secret("Account password")?;
                store_in_keyring(&profile_name, "password", &password)?;
            }
            let code = prompt_secret("Panel user code")?;
            store_in_keyring(&profile_name, "user-code", &code)?;

            eprintln!("✓ Secret(s) stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

/// Interactive wizard writing a single-profile config file.
fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("✨ PowerLink CLI — configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name = prompt_text("Profile name", Some("default"))?;
    let host = prompt_text("Gateway host", Some("visonic.tycomonitor.com"))?;

    let protocol_choices = &[
        "v3: panel user code + app identifiers",
        "v8: account email/password, then panel user code",
    ];
    let protocol_selection = Select::new()
        .with_prompt("Login protocol")
        .items(protocol_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let mut profile = Profile {
        host,
        ..Profile::default()
    };

    if protocol_selection == 0 {
        profile.user_id = Some(prompt_text("App user id (UUID)", None)?);
        profile.panel_web_name = Some(prompt_text("Panel web name", None)?);
    } else {
        profile.protocol = "v8".into();
        profile.email = Some(prompt_text("Account email", None)?);
        let password = prompt_secret("Account password")?;
        profile.password = prompt_keyring_storage(&profile_name, "password", password, "password")?;
        profile.app_id = Some(prompt_text("App id (UUID)", None)?);
        profile.panel_serial = Some(prompt_text("Panel serial", None)?);
    }

    let code = prompt_secret("Panel user code")?;
    profile.user_code = prompt_keyring_storage(&profile_name, "user-code", code, "user code")?;

    let mut profiles = HashMap::new();
    profiles.insert(profile_name.clone(), profile);

    let cfg = Config {
        default_profile: Some(profile_name.clone()),
        defaults: Defaults::default(),
        profiles,
    };
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: powerlink status");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                host: "visonic.tycomonitor.com".into(),
                user_code: Some("1234".into()),
                user_id: Some("uid".into()),
                panel_web_name: Some("123456".into()),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn text_view_masks_user_code() {
        let text = format_config_redacted(&sample());
        assert!(text.contains("[profiles.home]"));
        assert!(text.contains("user_code = \"****\""));
        assert!(text.contains("panel_web_name = \"123456\""));
        assert!(!text.contains("1234\""));
    }

    #[test]
    fn structured_view_masks_user_code() {
        let masked = redacted(&sample());
        assert_eq!(masked.profiles["home"].user_code.as_deref(), Some("****"));
        assert_eq!(masked.profiles["home"].user_id.as_deref(), Some("uid"));
    }
}
