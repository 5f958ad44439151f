// Authenticated request execution
//
// Attaches the current credential to a request description, sends it, and
// recovers from session expiry exactly once per call: clear the rejected
// credential, log in again, replay the request. A second expiry in a row
// is reported instead of looping.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::{Authenticator, Credential};
use crate::error::Error;
use crate::protocol::{RequestBody, RequestSpec};

/// Status and body of a completed request, uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Sends caller-built requests with a valid credential attached.
pub struct Executor {
    http: reqwest::Client,
    base_url: Url,
    auth: Authenticator,
    session_expired: StatusCode,
    reauth_delay: Duration,
    debug: bool,
}

impl Executor {
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        auth: Authenticator,
        session_expired: StatusCode,
        reauth_delay: Duration,
        debug: bool,
    ) -> Self {
        Self {
            http,
            base_url,
            auth,
            session_expired,
            reauth_delay,
            debug,
        }
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// Execute `request`, re-authenticating at most once on expiry.
    ///
    /// Transport failures are returned as-is; retrying them is the
    /// caller's business.
    pub async fn execute(&self, request: &RequestSpec) -> Result<RawResponse, Error> {
        let mut reauthenticated = false;
        loop {
            let credential = self.auth.ensure_credential().await?;
            let resp = self.send(request, &credential).await?;

            if resp.status != self.session_expired {
                return Ok(resp);
            }

            if reauthenticated {
                warn!(path = %request.path, "fresh session-token rejected as well; giving up");
                return Err(Error::SessionExpired);
            }

            debug!(path = %request.path, "session-token no longer valid; fetching a new one");
            self.auth.invalidate(&credential);
            reauthenticated = true;

            if !self.reauth_delay.is_zero() {
                tokio::time::sleep(self.reauth_delay).await;
            }
        }
    }

    async fn send(
        &self,
        request: &RequestSpec,
        credential: &Arc<Credential>,
    ) -> Result<RawResponse, Error> {
        let url = self.base_url.join(&request.path)?;
        debug!("{} {}", request.method, url);

        let mut builder = self.http.request(request.method.clone(), url);
        if !request.query.is_empty() {
            let query: Vec<(&str, &str)> = request
                .query
                .iter()
                .map(|(k, v)| (k.as_str(), v.expose_secret()))
                .collect();
            builder = builder.query(&query);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Form(fields) => builder.form(fields),
        };
        builder = credential.apply(builder);

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if self.debug {
            debug!(%status, %body, "response from {}", request.path);
        } else {
            trace!(%status, bytes = body.len(), "response from {}", request.path);
        }

        Ok(RawResponse { status, body })
    }
}
