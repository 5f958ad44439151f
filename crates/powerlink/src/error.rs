//! CLI error types with miette diagnostics.
//!
//! Maps library and config errors into user-facing errors with actionable
//! help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use powerlink_config::ConfigError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const NOT_READY: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the PowerLink gateway")]
    #[diagnostic(
        code(powerlink::connection_failed),
        help(
            "Check the gateway host and your network connection.\n\
             Try: powerlink status -vv"
        )
    )]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(powerlink::tls_error),
        help(
            "Gateways often use self-signed certificates.\n\
             Use --insecure (-k) to accept them, or configure ca_cert in your profile."
        )
    )]
    Tls { message: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(powerlink::timeout),
        help("Increase the timeout with --timeout <ms> or timeout_ms in your profile.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Login rejected: {message}")]
    #[diagnostic(
        code(powerlink::auth_rejected),
        help(
            "The gateway refused the configured identity. No further login attempts\n\
             are made so the panel does not lock the account.\n\
             Check the user code with: powerlink config set-code"
        )
    )]
    AuthRejected { message: String },

    #[error("Login could not complete: {message}")]
    #[diagnostic(
        code(powerlink::auth_unreachable),
        help("The gateway did not answer the login request. This is usually transient.")
    )]
    AuthUnreachable { message: String },

    #[error("No {secret} configured for profile '{profile}'")]
    #[diagnostic(
        code(powerlink::no_credentials),
        help(
            "Store it with: powerlink config set-code --profile {profile}\n\
             Or set POWERLINK_USER_CODE / POWERLINK_PASSWORD."
        )
    )]
    NoCredentials { profile: String, secret: String },

    #[error("Session expired again right after logging in")]
    #[diagnostic(code(powerlink::session_expired))]
    SessionExpired,

    // ── Panel ────────────────────────────────────────────────────────
    #[error("Panel not connected to the gateway after {attempts} attempts")]
    #[diagnostic(
        code(powerlink::not_ready),
        help("The gateway is up but has lost its link to the panel. Try again shortly.")
    )]
    NotReady { attempts: u32 },

    #[error("Cannot set status to '{status}'")]
    #[diagnostic(
        code(powerlink::unsupported_target),
        help("Only disarmed, home and away can be requested.")
    )]
    UnsupportedTarget { status: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Gateway error: {message}")]
    #[diagnostic(code(powerlink::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(powerlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(powerlink::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: powerlink config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(powerlink::no_config),
        help(
            "Create one with: powerlink config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(powerlink::config))]
    Config(Box<figment::Error>),

    #[error("Failed to write configuration: {0}")]
    #[diagnostic(code(powerlink::config_write))]
    ConfigWrite(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Tls { .. } | Self::AuthUnreachable { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthRejected { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout => exit_code::TIMEOUT,
            Self::NotReady { .. } => exit_code::NOT_READY,
            Self::Validation { .. } | Self::UnsupportedTarget { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Library error → CliError mapping ─────────────────────────────────

impl From<powerlink_api::Error> for CliError {
    fn from(err: powerlink_api::Error) -> Self {
        use powerlink_api::Error;

        if err.is_timeout() {
            return CliError::Timeout;
        }

        match err {
            Error::AuthRejected { message } => CliError::AuthRejected { message },
            Error::AuthUnreachable { message } => CliError::AuthUnreachable { message },
            Error::Transport(e) => CliError::ConnectionFailed {
                source: Box::new(e),
            },
            Error::SessionExpired => CliError::SessionExpired,
            Error::Tls(message) => CliError::Tls { message },
            Error::NotReady { attempts } => CliError::NotReady { attempts },
            Error::UnsupportedTarget(status) => CliError::UnsupportedTarget {
                status: status.to_string(),
            },
            Error::InvalidUrl(e) => CliError::Validation {
                field: "host".into(),
                reason: e.to_string(),
            },
            other @ (Error::UnexpectedStatus { .. } | Error::Deserialization { .. }) => {
                CliError::ApiError {
                    message: other.to_string(),
                }
            }
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile, secret } => {
                CliError::NoCredentials { profile, secret }
            }
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Serialization(e) => CliError::ConfigWrite(e.to_string()),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use powerlink_api::CanonicalStatus;

    use super::*;

    #[test]
    fn library_errors_get_their_exit_codes() {
        let cases = [
            (
                powerlink_api::Error::AuthRejected {
                    message: "bad code".into(),
                },
                exit_code::AUTH,
            ),
            (
                powerlink_api::Error::AuthUnreachable {
                    message: "timed out".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                powerlink_api::Error::NotReady { attempts: 6 },
                exit_code::NOT_READY,
            ),
            (
                powerlink_api::Error::UnsupportedTarget(CanonicalStatus::ExitDelay),
                exit_code::USAGE,
            ),
            (powerlink_api::Error::SessionExpired, exit_code::GENERAL),
        ];

        for (err, code) in cases {
            let label = err.to_string();
            assert_eq!(CliError::from(err).exit_code(), code, "{label}");
        }
    }

    #[test]
    fn missing_secret_is_an_auth_failure() {
        let err = CliError::from(ConfigError::NoCredentials {
            profile: "home".into(),
            secret: "user code".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert_eq!(err.to_string(), "No user code configured for profile 'home'");
    }
}
