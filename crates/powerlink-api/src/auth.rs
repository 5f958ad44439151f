// Session credential acquisition
//
// The gateway hands out session tokens with no expiry; a token is valid
// until a request is rejected with it. Login is expensive and, when the
// identity is wrong, dangerous: repeated bad logins lock the account for a
// long time. Hence two rules:
//
// - at most one login is in flight per client, and callers that queued
//   behind it adopt its outcome instead of logging in again;
// - a definitive rejection trips a fail-safe that blocks every later
//   login attempt for the life of the client.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, LoginFailure, preview};
use crate::protocol::LoginStep;

const FAIL_SAFE_MESSAGE: &str = "a previous authentication attempt was rejected; not retrying";

// ── Credential ───────────────────────────────────────────────────────

/// Session token(s), each bound to the header it travels in.
///
/// Replaced wholesale on every login, never mutated.
#[derive(Clone)]
pub struct Credential {
    tokens: Vec<(String, SecretString)>,
}

impl Credential {
    pub fn new(tokens: Vec<(String, SecretString)>) -> Self {
        Self { tokens }
    }

    /// Header names in the order they were acquired.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|(header, _)| header.as_str())
    }

    /// Token sent in `header`, if any.
    pub fn token(&self, header: &str) -> Option<&SecretString> {
        self.tokens
            .iter()
            .find(|(h, _)| h.eq_ignore_ascii_case(header))
            .map(|(_, token)| token)
    }

    pub(crate) fn apply(&self, mut builder: RequestBuilder) -> RequestBuilder {
        for (header, token) in &self.tokens {
            builder = builder.header(header.as_str(), token.expose_secret());
        }
        builder
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("headers", &self.headers().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

// ── CredentialStore ──────────────────────────────────────────────────

/// Current credential plus the one-way fail-safe flag.
///
/// Plain state: no I/O and no locking. The [`Authenticator`] owns it and
/// serializes access.
#[derive(Debug, Default)]
pub struct CredentialStore {
    credential: Option<Arc<Credential>>,
    fail_safe: bool,
}

impl CredentialStore {
    pub fn get(&self) -> Option<Arc<Credential>> {
        self.credential.clone()
    }

    pub fn set(&mut self, credential: Arc<Credential>) {
        self.credential = Some(credential);
    }

    pub fn clear(&mut self) {
        self.credential = None;
    }

    pub fn is_fail_safe(&self) -> bool {
        self.fail_safe
    }

    /// Irreversible. Also drops any cached credential.
    pub fn trip_fail_safe(&mut self) {
        self.fail_safe = true;
        self.credential = None;
    }
}

// ── Authenticator ────────────────────────────────────────────────────

/// Produces a valid [`Credential`], logging in only when necessary and
/// never running two logins at once.
pub struct Authenticator {
    http: reqwest::Client,
    base_url: Url,
    steps: Vec<LoginStep>,
    store: Mutex<CredentialStore>,
    /// Single-flight gate. Holds the failure of the most recent login so
    /// callers that queued behind it can adopt it.
    flight: AsyncMutex<Option<LoginFailure>>,
    /// Bumped after every completed login, successful or not.
    generation: AtomicU64,
    logins: AtomicU64,
    debug: bool,
}

impl Authenticator {
    pub fn new(http: reqwest::Client, base_url: Url, steps: Vec<LoginStep>, debug: bool) -> Self {
        Self {
            http,
            base_url,
            steps,
            store: Mutex::new(CredentialStore::default()),
            flight: AsyncMutex::new(None),
            generation: AtomicU64::new(0),
            logins: AtomicU64::new(0),
            debug,
        }
    }

    /// Return the cached credential or acquire a fresh one.
    ///
    /// Fails with [`Error::AuthRejected`] without I/O once the fail-safe
    /// has tripped.
    pub async fn ensure_credential(&self) -> Result<Arc<Credential>, Error> {
        // Read before the cache check: a login that completes in between
        // must count as one we waited for.
        let seen = self.generation.load(Ordering::Acquire);
        if let Some(credential) = self.cached()? {
            return Ok(credential);
        }
        self.login_after(seen).await
    }

    /// Log in unless a login finished after generation `seen` was observed,
    /// in which case its outcome is adopted.
    async fn login_after(&self, seen: u64) -> Result<Arc<Credential>, Error> {
        let mut last_failure = self.flight.lock().await;

        // Someone else may have finished a login while we queued.
        if self.generation.load(Ordering::Acquire) != seen {
            if let Some(failure) = last_failure.clone() {
                debug!("adopting failed login outcome of a concurrent caller");
                return Err(failure.into());
            }
        }
        if let Some(credential) = self.cached()? {
            trace!("adopting credential acquired by a concurrent caller");
            return Ok(credential);
        }

        let outcome = self.acquire().await;
        {
            let mut store = self.lock_store();
            match &outcome {
                Ok(credential) => store.set(Arc::clone(credential)),
                Err(LoginFailure::Rejected(reason)) => {
                    warn!(%reason, "login rejected; fail-safe tripped, no further login attempts");
                    store.trip_fail_safe();
                }
                Err(LoginFailure::Unreachable(reason)) => {
                    debug!(%reason, "login failed transiently");
                }
            }
        }
        *last_failure = outcome.as_ref().err().cloned();
        self.generation.fetch_add(1, Ordering::AcqRel);
        drop(last_failure);

        outcome.map_err(Error::from)
    }

    /// Drop `stale` if it is still the cached credential.
    ///
    /// A credential acquired by a concurrent caller after `stale` was
    /// handed out is left alone. Returns whether anything was cleared.
    pub fn invalidate(&self, stale: &Arc<Credential>) -> bool {
        let mut store = self.lock_store();
        match store.get() {
            Some(current) if Arc::ptr_eq(&current, stale) => {
                store.clear();
                true
            }
            _ => false,
        }
    }

    /// Whether a definitive rejection has disabled authentication.
    pub fn is_fail_safe(&self) -> bool {
        self.lock_store().is_fail_safe()
    }

    /// Number of network login chains started so far.
    pub fn login_count(&self) -> u64 {
        self.logins.load(Ordering::Relaxed)
    }

    fn cached(&self) -> Result<Option<Arc<Credential>>, Error> {
        let store = self.lock_store();
        if store.is_fail_safe() {
            return Err(Error::AuthRejected {
                message: FAIL_SAFE_MESSAGE.into(),
            });
        }
        Ok(store.get())
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, CredentialStore> {
        self.store.lock().expect("credential store lock poisoned")
    }

    /// Run the whole login chain. Nothing is stored unless every step
    /// succeeds.
    async fn acquire(&self) -> Result<Arc<Credential>, LoginFailure> {
        self.logins.fetch_add(1, Ordering::Relaxed);

        if self.steps.is_empty() {
            return Err(LoginFailure::Unreachable(
                "protocol defines no login steps".into(),
            ));
        }

        let mut tokens: Vec<(String, SecretString)> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let token = self.login_step(step, &tokens).await?;
            tokens.push((step.token_header.clone(), token));
        }

        debug!(steps = tokens.len(), "login successful");
        Ok(Arc::new(Credential::new(tokens)))
    }

    async fn login_step(
        &self,
        step: &LoginStep,
        earlier: &[(String, SecretString)],
    ) -> Result<SecretString, LoginFailure> {
        let url = self
            .base_url
            .join(&step.path)
            .map_err(|e| LoginFailure::Unreachable(format!("invalid login URL: {e}")))?;

        debug!("logging in at {}", url);

        let mut builder = self.http.post(url).json(&step.body());
        for (header, token) in earlier {
            builder = builder.header(header.as_str(), token.expose_secret());
        }

        let resp = builder.send().await.map_err(|e| {
            LoginFailure::Unreachable(if e.is_timeout() {
                format!("{} timed out", step.path)
            } else {
                format!("{}: {e}", step.path)
            })
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| LoginFailure::Unreachable(format!("{}: {e}", step.path)))?;

        let parsed = serde_json::from_str::<Value>(&body);

        if let Ok(json) = &parsed {
            if let Some(reason) = rejection_reason(json) {
                return Err(LoginFailure::Rejected(reason));
            }
        }

        if !status.is_success() {
            if self.debug {
                debug!(%status, body = %preview(&body), "login step failed");
            }
            return Err(LoginFailure::Unreachable(format!(
                "{} returned HTTP {status}",
                step.path
            )));
        }

        let json = parsed.map_err(|e| {
            LoginFailure::Unreachable(format!("malformed login response from {}: {e}", step.path))
        })?;

        json.get(&step.token_field)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(|token| SecretString::from(token.to_owned()))
            .ok_or_else(|| {
                LoginFailure::Unreachable(format!(
                    "login response from {} is missing `{}`",
                    step.path, step.token_field
                ))
            })
    }
}

/// An explicit, non-null `error` field is the gateway's way of saying the
/// identity itself is wrong.
fn rejection_reason(json: &Value) -> Option<String> {
    let error = json.get("error").filter(|e| !e.is_null())?;
    let reason = json
        .get("error_message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| error.as_str().map(str::to_owned))
        .unwrap_or_else(|| format!("login error {error}"));
    Some(reason)
}
