//! Async client for Visonic PowerLink alarm-panel gateways.
//!
//! The gateway's HTTP API is session based: tokens come from a login chain,
//! carry no expiry, and are rejected with HTTP 440 once stale. Its link to
//! the physical panel is a separate signal that can be down while HTTP
//! works fine. This crate hides both:
//!
//! - **[`Authenticator`]** — single-flight login with a one-way fail-safe
//!   that stops all further logins after a definitive rejection, so a wrong
//!   user code never gets the account locked out.
//! - **[`Executor`]** — attaches the credential to a request and replays it
//!   once after re-authenticating when the session expires.
//! - **[`ReadinessPolicy`]** — bounded exponential backoff while the
//!   gateway reports the panel as not connected.
//! - **[`StateMapper`]** — raw status vocabulary ↔ [`CanonicalStatus`].
//! - **[`PowerLinkClient`]** — `get_status()` / `set_status()` on top.
//!
//! Endpoint paths, payloads and vocabularies are described by a
//! [`Protocol`]; two revisions ship built in.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod protocol;
pub mod readiness;
pub mod status;
pub mod transport;

pub use auth::{Authenticator, Credential, CredentialStore};
pub use client::PowerLinkClient;
pub use config::ClientConfig;
pub use error::Error;
pub use executor::{Executor, RawResponse};
pub use protocol::{
    AccountIdentity, CommandEncoding, Identity, LoginStep, PanelIdentity, Protocol, RequestBody,
    RequestSpec, Revision,
};
pub use readiness::{Readiness, ReadinessPolicy};
pub use status::{CanonicalStatus, StateMapper};
pub use transport::{TlsMode, TransportConfig};
