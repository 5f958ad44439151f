//! Shared configuration for the powerlink CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `powerlink_api::ClientConfig`.

use std::collections::HashMap;
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
use tracing::debug;
use url::Url;

use powerlink_api::{
    AccountIdentity, ClientConfig, Identity, PanelIdentity, Protocol, Revision, TlsMode,
};

/// Keyring service name under which secrets are stored.
pub const KEYRING_SERVICE: &str = "powerlink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {secret} configured for profile '{profile}'")]
    NoCredentials { profile: String, secret: String },

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
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub debug: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout_ms: default_timeout_ms(),
            debug: false,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout_ms() -> u64 {
    2500
}

/// A named gateway profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Gateway host or URL (e.g., "visonic.tycomonitor.com").
    pub host: String,

    /// Protocol revision: "v3" (single-step) or "v8" (two-step).
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Panel user code (plaintext — prefer keyring or env var).
    pub user_code: Option<String>,

    /// Environment variable name containing the user code.
    pub user_code_env: Option<String>,

    /// Application identifier reported to the gateway.
    #[serde(default = "default_app_type")]
    pub app_type: String,

    /// App installation UUID (v3).
    pub user_id: Option<String>,

    /// Panel web name (v3) — the panel's serial as shown in the app.
    pub panel_web_name: Option<String>,

    /// Account email (v8).
    pub email: Option<String>,

    /// Account password (v8, plaintext — prefer keyring).
    pub password: Option<String>,

    /// App installation UUID (v8).
    pub app_id: Option<String>,

    /// Panel serial (v8).
    pub panel_serial: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (milliseconds).
    pub timeout_ms: Option<u64>,

    /// Override response-body debug logging.
    pub debug: Option<bool>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            host: String::new(),
            protocol: default_protocol(),
            user_code: None,
            user_code_env: None,
            app_type: default_app_type(),
            user_id: None,
            panel_web_name: None,
            email: None,
            password: None,
            app_id: None,
            panel_serial: None,
            ca_cert: None,
            insecure: None,
            timeout_ms: None,
            debug: None,
        }
    }
}

fn default_protocol() -> String {
    "v3".into()
}
fn default_app_type() -> String {
    "com.visonic.PowerMaxApp".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "powerlink", "powerlink").map_or_else(
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
    p.push("powerlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from a specific file, then `POWERLINK_*` env vars.
///
/// Nested keys use a double underscore: `POWERLINK_DEFAULTS__TIMEOUT_MS`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!("loading config from {}", path.display());

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("POWERLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
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

/// Keyring account name for a profile's secret (`user-code` / `password`).
pub fn keyring_account(profile_name: &str, secret: &str) -> String {
    format!("{profile_name}/{secret}")
}

/// Resolve the panel user code: env var → keyring → plaintext.
pub fn resolve_user_code(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's user_code_env, then the global env var
    let env_names = profile
        .user_code_env
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("POWERLINK_USER_CODE"));
    for env_name in env_names {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Some(secret) = keyring_secret(profile_name, "user-code") {
        return Ok(secret);
    }

    // 3. Plaintext in config
    if let Some(ref code) = profile.user_code {
        return Ok(SecretString::from(code.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        secret: "user code".into(),
    })
}

/// Resolve the account password (v8): env var → keyring → plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Ok(pw) = std::env::var("POWERLINK_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    if let Some(secret) = keyring_secret(profile_name, "password") {
        return Ok(secret);
    }

    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        secret: "password".into(),
    })
}

fn keyring_secret(profile_name: &str, secret: &str) -> Option<SecretString> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_account(profile_name, secret)).ok()?;
    entry.get_password().ok().map(SecretString::from)
}

fn required(value: Option<&String>, field: &str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::Validation {
            field: field.into(),
            reason: "required for this protocol revision".into(),
        })
}

/// Resolve the login identity from a profile's `protocol` field.
pub fn resolve_identity(profile: &Profile, profile_name: &str) -> Result<Identity, ConfigError> {
    let revision: Revision = profile.protocol.parse().map_err(|_| ConfigError::Validation {
        field: "protocol".into(),
        reason: format!("expected 'v3' or 'v8', got '{}'", profile.protocol),
    })?;

    Ok(match revision {
        Revision::V3 => Identity::Panel(PanelIdentity {
            user_code: resolve_user_code(profile, profile_name)?,
            app_type: profile.app_type.clone(),
            user_id: required(profile.user_id.as_ref(), "user_id")?,
            panel_web_name: required(profile.panel_web_name.as_ref(), "panel_web_name")?,
        }),
        Revision::V8 => Identity::Account(AccountIdentity {
            email: required(profile.email.as_ref(), "email")?,
            password: resolve_password(profile, profile_name)?,
            app_id: required(profile.app_id.as_ref(), "app_id")?,
            user_code: resolve_user_code(profile, profile_name)?,
            app_type: profile.app_type.clone(),
            panel_serial: required(profile.panel_serial.as_ref(), "panel_serial")?,
        }),
    })
}

/// Parse a profile host into the gateway origin. Bare hosts get `https://`.
pub fn parse_host(host: &str) -> Result<Url, ConfigError> {
    let candidate = if host.contains("://") {
        host.to_owned()
    } else {
        format!("https://{host}")
    };
    Url::parse(&candidate).map_err(|_| ConfigError::Validation {
        field: "host".into(),
        reason: format!("invalid host: {host}"),
    })
}

/// Build a `ClientConfig` from a profile and the global defaults.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let url = parse_host(&profile.host)?;
    let identity = resolve_identity(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let mut config = ClientConfig::with_protocol(url, Protocol::for_identity(&identity));
    config.tls = tls;
    config.timeout = Duration::from_millis(profile.timeout_ms.unwrap_or(defaults.timeout_ms));
    config.debug = profile.debug.unwrap_or(defaults.debug);
    Ok(config)
}
