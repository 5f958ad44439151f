use thiserror::Error;

use crate::status::CanonicalStatus;

/// Top-level error type for the `powerlink-api` crate.
///
/// Variants fall into five classes: definitive auth rejection, transient
/// auth failure, post-auth transport failure, exhausted readiness retries,
/// and caller misuse. `powerlink` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The gateway definitively refused our identity, or a previous attempt
    /// did and the fail-safe is now tripped. Never retried.
    #[error("failed to get authentication session-token: {message}")]
    AuthRejected { message: String },

    /// Login could not complete (timeout, connection error, malformed reply).
    #[error("failed to get authentication session-token: {message}")]
    AuthUnreachable { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a status the operation cannot interpret.
    #[error("unexpected HTTP {status} from {endpoint}: {preview}")]
    UnexpectedStatus {
        status: u16,
        endpoint: String,
        preview: String,
    },

    /// The session was rejected again right after a fresh login.
    #[error("session expired again immediately after re-authentication")]
    SessionExpired,

    /// URL construction failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup error while building the HTTP client.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Panel ───────────────────────────────────────────────────────
    /// The gateway never reported a live panel link within the retry budget.
    #[error("panel not yet connected after {attempts} attempts")]
    NotReady { attempts: u32 },

    /// Only disarmed / home / away can be requested.
    #[error("cannot set status to {0}")]
    UnsupportedTarget(CanonicalStatus),
}

impl Error {
    /// Returns `true` once the fail-safe has fired. Retrying is pointless
    /// until the process restarts with different credentials.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::AuthRejected { .. })
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::AuthUnreachable { .. }
            | Self::SessionExpired
            | Self::UnexpectedStatus { .. }
            | Self::Deserialization { .. }
            | Self::NotReady { .. } => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Returns `true` for the transport class: failures that happened after
    /// a credential was obtained.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::UnexpectedStatus { .. }
                | Self::SessionExpired
                | Self::Deserialization { .. }
        )
    }

    /// Returns `true` if the underlying request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

/// Outcome of a failed login, kept in the credential store so callers that
/// waited on the same acquisition can adopt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoginFailure {
    Rejected(String),
    Unreachable(String),
}

impl From<LoginFailure> for Error {
    fn from(failure: LoginFailure) -> Self {
        match failure {
            LoginFailure::Rejected(message) => Self::AuthRejected { message },
            LoginFailure::Unreachable(message) => Self::AuthUnreachable { message },
        }
    }
}

/// Trim a response body for inclusion in an error message.
pub(crate) fn preview(body: &str) -> String {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    body[..end].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_is_not_transient() {
        let err = Error::from(LoginFailure::Rejected("wrong user code".into()));
        assert!(err.is_auth_rejected());
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "failed to get authentication session-token: wrong user code"
        );
    }

    #[test]
    fn session_expired_is_transport_class() {
        assert!(Error::SessionExpired.is_transport());
        assert!(Error::SessionExpired.is_transient());
        assert!(!Error::NotReady { attempts: 3 }.is_transport());
    }

    #[test]
    fn unsupported_target_message() {
        let err = Error::UnsupportedTarget(CanonicalStatus::ExitDelay);
        assert_eq!(err.to_string(), "cannot set status to exit delay");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(300);
        assert_eq!(preview(&body).chars().count(), 200);
        assert_eq!(preview("short"), "short");
    }
}
