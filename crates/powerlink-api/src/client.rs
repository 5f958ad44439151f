// PowerLink gateway client
//
// The two public operations, status poll and status change, each build a
// request description from the protocol revision and run it through the
// readiness policy, which drives the executor, which drives the
// authenticator. This module only interprets bodies.

use std::sync::RwLock;

use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::Authenticator;
use crate::config::ClientConfig;
use crate::error::{Error, preview};
use crate::executor::{Executor, RawResponse};
use crate::protocol::Protocol;
use crate::readiness::{Readiness, ReadinessPolicy};
use crate::status::CanonicalStatus;

/// Async client for one PowerLink gateway.
///
/// `Send + Sync`; share it behind an `Arc` and call it from as many tasks
/// as needed. Only credential acquisition is serialized.
pub struct PowerLinkClient {
    executor: Executor,
    protocol: Protocol,
    poll: ReadinessPolicy,
    command: ReadinessPolicy,
    last_status: RwLock<Option<CanonicalStatus>>,
}

impl PowerLinkClient {
    /// Build a client, including its HTTP transport. No I/O happens until
    /// the first operation.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let http = config.transport().build_client()?;
        Ok(Self::with_client(http, config))
    }

    /// Build a client around a pre-built `reqwest::Client`.
    ///
    /// The config's TLS and timeout settings are ignored in favour of the
    /// client's own.
    pub fn with_client(http: reqwest::Client, config: ClientConfig) -> Self {
        let ClientConfig {
            url,
            protocol,
            debug,
            reauth_delay,
            poll,
            command,
            ..
        } = config;

        let auth = Authenticator::new(http.clone(), url.clone(), protocol.login.clone(), debug);
        let executor = Executor::new(
            http,
            url,
            auth,
            protocol.session_expired,
            reauth_delay,
            debug,
        );

        Self {
            executor,
            protocol,
            poll,
            command,
            last_status: RwLock::new(None),
        }
    }

    /// Poll the current status, retrying while the panel link is down.
    pub async fn get_status(&self) -> Result<CanonicalStatus, Error> {
        let request = self.protocol.status_request();
        let request = &request;
        let executor = &self.executor;
        let protocol = &self.protocol;

        let status = self
            .poll
            .run("get_status", move || async move {
                let resp = executor.execute(request).await?;
                interpret_status(protocol, &resp)
            })
            .await?;

        debug!(%status, "panel status");
        *self.last_status.write().expect("last status lock poisoned") = Some(status);
        Ok(status)
    }

    /// Arm or disarm the system.
    ///
    /// Only disarmed, home and away are accepted; anything else fails with
    /// [`Error::UnsupportedTarget`] before any network call.
    pub async fn set_status(&self, target: CanonicalStatus) -> Result<(), Error> {
        let command = self.protocol.mapper.to_raw(target)?;
        let request = self.protocol.command_request(command);
        let request = &request;
        let executor = &self.executor;
        let protocol = &self.protocol;

        debug!(%target, command, "setting panel status");

        self.command
            .run("set_status", move || async move {
                let resp = executor.execute(request).await?;
                interpret_command(protocol, &resp)
            })
            .await
    }

    /// Most recent status returned by [`get_status`](Self::get_status).
    pub fn last_status(&self) -> Option<CanonicalStatus> {
        *self.last_status.read().expect("last status lock poisoned")
    }

    /// Whether a rejected login has permanently disabled authentication.
    pub fn is_fail_safe(&self) -> bool {
        self.executor.authenticator().is_fail_safe()
    }

    /// Number of login chains this client has started.
    pub fn login_count(&self) -> u64 {
        self.executor.authenticator().login_count()
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }
}

fn interpret_status(
    protocol: &Protocol,
    resp: &RawResponse,
) -> Result<Readiness<CanonicalStatus>, Error> {
    let json = parse_success(protocol.status_path.as_str(), resp)?;

    let connected = json
        .pointer(&protocol.readiness_pointer)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !connected {
        return Ok(Readiness::NotReady);
    }

    let Some(raw) = json.pointer(&protocol.state_pointer).and_then(Value::as_str) else {
        warn!(pointer = %protocol.state_pointer, "status response carries no state");
        return Ok(Readiness::Ready(CanonicalStatus::Unknown));
    };

    let status = protocol.mapper.to_canonical(raw);
    if status == CanonicalStatus::Unknown {
        warn!(raw, "unrecognized panel state");
    }
    Ok(Readiness::Ready(status))
}

/// Command responses are often not JSON at all. Only an explicit
/// readiness flag set to false means "not ready".
fn interpret_command(protocol: &Protocol, resp: &RawResponse) -> Result<Readiness<()>, Error> {
    if !resp.status.is_success() {
        return Err(unexpected(protocol.command_path.as_str(), resp));
    }

    let not_ready = serde_json::from_str::<Value>(&resp.body)
        .ok()
        .and_then(|json| json.pointer(&protocol.readiness_pointer).and_then(Value::as_bool))
        == Some(false);

    Ok(if not_ready {
        Readiness::NotReady
    } else {
        Readiness::Ready(())
    })
}

fn parse_success(endpoint: &str, resp: &RawResponse) -> Result<Value, Error> {
    if !resp.status.is_success() {
        return Err(unexpected(endpoint, resp));
    }
    serde_json::from_str(&resp.body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&resp.body)),
        body: resp.body.clone(),
    })
}

fn unexpected(endpoint: &str, resp: &RawResponse) -> Error {
    Error::UnexpectedStatus {
        status: resp.status.as_u16(),
        endpoint: endpoint.to_owned(),
        preview: preview(&resp.body),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::StatusCode;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::protocol::PanelIdentity;

    fn v3() -> Protocol {
        Protocol::rest_v3(&PanelIdentity {
            user_code: SecretString::from("1234".to_owned()),
            app_type: "com.visonic.PowerMaxApp".into(),
            user_id: "user".into(),
            panel_web_name: "panel".into(),
        })
    }

    fn ok(body: &serde_json::Value) -> RawResponse {
        RawResponse {
            status: StatusCode::OK,
            body: body.to_string(),
        }
    }

    #[test]
    fn connected_status_is_mapped() {
        let resp = ok(&json!({"is_connected": true, "partitions": [{"state": "HOME"}]}));
        assert_eq!(
            interpret_status(&v3(), &resp).unwrap(),
            Readiness::Ready(CanonicalStatus::ArmedHome)
        );
    }

    #[test]
    fn disconnected_or_missing_flag_is_not_ready() {
        for body in [
            json!({"is_connected": false, "partitions": [{"state": "HOME"}]}),
            json!({"partitions": [{"state": "HOME"}]}),
        ] {
            assert_eq!(interpret_status(&v3(), &ok(&body)).unwrap(), Readiness::NotReady);
        }
    }

    #[test]
    fn missing_or_odd_state_is_unknown() {
        let resp = ok(&json!({"is_connected": true, "partitions": []}));
        assert_eq!(
            interpret_status(&v3(), &resp).unwrap(),
            Readiness::Ready(CanonicalStatus::Unknown)
        );
        let resp = ok(&json!({"is_connected": true, "partitions": [{"state": "FAULT"}]}));
        assert_eq!(
            interpret_status(&v3(), &resp).unwrap(),
            Readiness::Ready(CanonicalStatus::Unknown)
        );
    }

    #[test]
    fn malformed_status_body_is_deserialization_error() {
        let resp = RawResponse {
            status: StatusCode::OK,
            body: "<html>".into(),
        };
        assert!(matches!(
            interpret_status(&v3(), &resp),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn server_error_is_unexpected_status() {
        let resp = RawResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        };
        match interpret_status(&v3(), &resp) {
            Err(Error::UnexpectedStatus { status, preview, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(preview, "boom");
            }
            other => panic!("expected UnexpectedStatus, got: {other:?}"),
        }
    }

    #[test]
    fn command_readiness() {
        let protocol = v3();
        let plain = RawResponse {
            status: StatusCode::OK,
            body: "OK".into(),
        };
        assert_eq!(interpret_command(&protocol, &plain).unwrap(), Readiness::Ready(()));
        assert_eq!(
            interpret_command(&protocol, &ok(&json!({"is_connected": false}))).unwrap(),
            Readiness::NotReady
        );
        assert_eq!(
            interpret_command(&protocol, &ok(&json!({"is_connected": true}))).unwrap(),
            Readiness::Ready(())
        );
    }
}
