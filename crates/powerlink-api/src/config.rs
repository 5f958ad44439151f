// ── Runtime connection configuration ──
//
// These types describe *how* to talk to one gateway. They carry the
// protocol revision and connection tuning, but never touch disk.
// `powerlink-config` builds a `ClientConfig` and hands it in.

use std::time::Duration;

use url::Url;

use crate::protocol::{Identity, Protocol};
use crate::readiness::ReadinessPolicy;
use crate::transport::{DEFAULT_TIMEOUT, TlsMode, TransportConfig};

/// Delay before replaying a request whose session expired.
pub const DEFAULT_REAUTH_DELAY: Duration = Duration::from_secs(3);

/// Configuration for one PowerLink gateway.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway origin, e.g. `https://visonic.tycomonitor.com` or the
    /// module's LAN address.
    pub url: Url,
    /// Login chain, endpoints and status vocabulary.
    pub protocol: Protocol,
    pub tls: TlsMode,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Log raw response bodies at `debug` level.
    pub debug: bool,
    pub reauth_delay: Duration,
    pub poll: ReadinessPolicy,
    pub command: ReadinessPolicy,
}

impl ClientConfig {
    /// Defaults plus the built-in revision matching `identity`.
    pub fn new(url: Url, identity: &Identity) -> Self {
        Self::with_protocol(url, Protocol::for_identity(identity))
    }

    /// Defaults with a caller-supplied protocol revision.
    pub fn with_protocol(url: Url, protocol: Protocol) -> Self {
        Self {
            url,
            protocol,
            tls: TlsMode::default(),
            timeout: DEFAULT_TIMEOUT,
            debug: false,
            reauth_delay: DEFAULT_REAUTH_DELAY,
            poll: ReadinessPolicy::polling(),
            command: ReadinessPolicy::command(),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }
}
