// Readiness retries
//
// The gateway can answer a perfectly valid HTTP request while its link to
// the panel is down; the body then says so and nothing else in it can be
// trusted. This module retries a whole execute-and-interpret cycle on that
// condition only, backing off exponentially.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Error;

/// Result of interpreting one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<T> {
    Ready(T),
    /// The gateway has no live panel link yet.
    NotReady,
}

/// Bounded exponential backoff for "connected but not ready" responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Total attempts, the first one included. Zero behaves as one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl ReadinessPolicy {
    /// Defaults for status polls: six attempts, 3s doubling to 30s.
    pub fn polling() -> Self {
        Self {
            max_attempts: 6,
            initial_backoff: Duration::from_secs(3),
            max_backoff: Duration::from_secs(30),
        }
    }

    /// Defaults for state changes: three attempts, 5s doubling to 60s.
    pub fn command() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
        }
    }

    /// Delay before retry number `retry` (0-based).
    ///
    /// `delay = min(initial * 2^retry, max)`
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(retry))
            .min(self.max_backoff)
    }

    /// Run `attempt` until it reports ready, fails, or the budget runs out.
    ///
    /// Only [`Readiness::NotReady`] is retried. Any error ends the loop
    /// immediately.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Readiness<T>, Error>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut made = 0;

        loop {
            made += 1;
            match attempt().await? {
                Readiness::Ready(value) => {
                    if made > 1 {
                        debug!(operation, attempts = made, "panel connected");
                    }
                    return Ok(value);
                }
                Readiness::NotReady if made >= max_attempts => {
                    warn!(operation, attempts = made, "panel not yet connected; giving up");
                    return Err(Error::NotReady { attempts: made });
                }
                Readiness::NotReady => {
                    let delay = self.backoff(made - 1);
                    info!(
                        operation,
                        attempt = made,
                        max_attempts,
                        "panel not yet connected, retry in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
