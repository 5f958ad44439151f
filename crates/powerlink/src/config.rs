//! CLI configuration — thin wrapper around `powerlink_config`.
//!
//! Adds profile selection and the `--host` / `--insecure` / `--timeout` /
//! `--debug` flag overrides on top of the shared profile translation.

use std::time::Duration;

use powerlink_api::{ClientConfig, TlsMode};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use powerlink_config::{
    Config, Defaults, Profile, config_path, load_config, save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Look up a profile, distinguishing "no config at all" from "wrong name".
pub fn find_profile<'a>(config: &'a Config, name: &str) -> Result<&'a Profile, CliError> {
    if config.profiles.is_empty() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }

    config.profiles.get(name).ok_or_else(|| {
        let mut available: Vec<_> = config.profiles.keys().cloned().collect();
        available.sort();
        CliError::ProfileNotFound {
            name: name.to_owned(),
            available: available.join(", "),
        }
    })
}

/// Translate a `Profile` + global flags into a `ClientConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<ClientConfig, CliError> {
    let mut profile = profile.clone();
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }

    let mut config = powerlink_config::profile_to_client_config(&profile, profile_name, defaults)?;

    if global.insecure {
        config.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(ms) = global.timeout {
        config.timeout = Duration::from_millis(ms);
    }
    config.debug |= global.debug;

    Ok(config)
}

/// Build the `ClientConfig` for the active profile, returning the profile
/// name alongside it.
pub fn build_client_config(global: &GlobalOpts) -> Result<(String, ClientConfig), CliError> {
    let cfg = powerlink_config::load_config()?;
    let profile_name = active_profile_name(global, &cfg);
    let profile = find_profile(&cfg, &profile_name)?;

    let client_config = resolve_profile(profile, &profile_name, &cfg.defaults, global)?;
    tracing::debug!(
        profile = %profile_name,
        url = %client_config.url,
        revision = %client_config.protocol.revision,
        "resolved profile"
    );
    Ok((profile_name, client_config))
}
