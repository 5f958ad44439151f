// Protocol revision descriptions
//
// Everything that differs between gateway firmware revisions lives here as
// data: the login chain, endpoint paths, payload shapes, header names,
// where readiness and state sit in the status body, and the status
// vocabulary. The authenticator, executor and client only interpret it.

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use strum::{Display, EnumString};

use crate::status::StateMapper;

/// Status code the gateway returns when a session token is no longer valid.
pub const SESSION_EXPIRED: u16 = 440;

/// Panel identifiers for the single-step `rest_api/3.0` login.
#[derive(Debug, Clone)]
pub struct PanelIdentity {
    pub user_code: SecretString,
    pub app_type: String,
    pub user_id: String,
    pub panel_web_name: String,
}

/// Account credentials plus panel identifiers for the two-step
/// `rest_api/8.0` login.
#[derive(Debug, Clone)]
pub struct AccountIdentity {
    pub email: String,
    pub password: SecretString,
    pub app_id: String,
    pub user_code: SecretString,
    pub app_type: String,
    pub panel_serial: String,
}

/// Who we are, in the shape the chosen revision's login expects.
#[derive(Debug, Clone)]
pub enum Identity {
    /// `rest_api/3.0`: one login call carrying the panel identifiers.
    Panel(PanelIdentity),
    /// `rest_api/8.0`: account login for a user token, then panel login
    /// for a session token.
    Account(AccountIdentity),
}

/// Which built-in revision a [`Protocol`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Revision {
    V3,
    V8,
}

/// One network call of the login chain.
///
/// Tokens from earlier steps are sent as headers on later steps, and all
/// collected tokens together form the credential.
#[derive(Debug, Clone)]
pub struct LoginStep {
    pub path: String,
    /// JSON body fields. Every value is treated as secret.
    pub payload: Vec<(String, SecretString)>,
    /// Response field holding the token this step yields.
    pub token_field: String,
    /// Header the token is sent in on subsequent calls.
    pub token_header: String,
}

impl LoginStep {
    pub(crate) fn body(&self) -> Value {
        let fields: Map<String, Value> = self
            .payload
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.expose_secret().to_owned())))
            .collect();
        Value::Object(fields)
    }
}

/// How a command string is placed into the state-change request.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandEncoding {
    /// URL-encoded form with the command in `field`.
    Form { field: String },
    /// JSON object `template` with the command inserted under `field`.
    Json {
        field: String,
        template: Map<String, Value>,
    },
}

/// A full protocol revision.
#[derive(Debug, Clone)]
pub struct Protocol {
    pub revision: Revision,
    /// Ordered, dependent login calls. Must not be empty.
    pub login: Vec<LoginStep>,
    pub status_path: String,
    /// Query parameters sent with the status poll.
    pub status_query: Vec<(String, SecretString)>,
    pub command_path: String,
    pub command_encoding: CommandEncoding,
    /// JSON pointer to the panel-link readiness flag.
    pub readiness_pointer: String,
    /// JSON pointer to the raw status string.
    pub state_pointer: String,
    pub session_expired: StatusCode,
    pub mapper: StateMapper,
}

impl Protocol {
    /// The built-in revision matching an identity's shape.
    pub fn for_identity(identity: &Identity) -> Self {
        match identity {
            Identity::Panel(panel) => Self::rest_v3(panel),
            Identity::Account(account) => Self::rest_v8(account),
        }
    }

    /// Single-step `rest_api/3.0` revision.
    ///
    /// The panel identifiers are sent both as the login body and as the
    /// status query.
    pub fn rest_v3(identity: &PanelIdentity) -> Self {
        let identifiers = vec![
            field("user_code", identity.user_code.clone()),
            field("app_type", secret(&identity.app_type)),
            field("user_id", secret(&identity.user_id)),
            field("panel_web_name", secret(&identity.panel_web_name)),
        ];

        Self {
            revision: Revision::V3,
            login: vec![LoginStep {
                path: "/rest_api/3.0/login".into(),
                payload: identifiers.clone(),
                token_field: "session_token".into(),
                token_header: "Session-Token".into(),
            }],
            status_path: "/rest_api/3.0/status".into(),
            status_query: identifiers,
            command_path: "/web/ajax/security.main.status.ajax.php".into(),
            command_encoding: CommandEncoding::Form { field: "set".into() },
            readiness_pointer: "/is_connected".into(),
            state_pointer: "/partitions/0/state".into(),
            session_expired: session_expired(),
            mapper: StateMapper::rest_v3(),
        }
    }

    /// Two-step `rest_api/8.0` revision.
    pub fn rest_v8(identity: &AccountIdentity) -> Self {
        let login = vec![
            LoginStep {
                path: "/rest_api/8.0/auth".into(),
                payload: vec![
                    field("email", secret(&identity.email)),
                    field("password", identity.password.clone()),
                    field("app_id", secret(&identity.app_id)),
                ],
                token_field: "user_token".into(),
                token_header: "User-Token".into(),
            },
            LoginStep {
                path: "/rest_api/8.0/panel/login".into(),
                payload: vec![
                    field("user_code", identity.user_code.clone()),
                    field("app_type", secret(&identity.app_type)),
                    field("panel_serial", secret(&identity.panel_serial)),
                ],
                token_field: "session_token".into(),
                token_header: "Session-Token".into(),
            },
        ];

        let mut template = Map::new();
        template.insert("partition".into(), json!(-1));

        Self {
            revision: Revision::V8,
            login,
            status_path: "/rest_api/8.0/status".into(),
            status_query: Vec::new(),
            command_path: "/rest_api/8.0/set_state".into(),
            command_encoding: CommandEncoding::Json {
                field: "state".into(),
                template,
            },
            readiness_pointer: "/connected".into(),
            state_pointer: "/partitions/0/state".into(),
            session_expired: session_expired(),
            mapper: StateMapper::rest_v8(),
        }
    }

    /// Request description for a status poll.
    pub fn status_request(&self) -> RequestSpec {
        RequestSpec {
            method: Method::GET,
            path: self.status_path.clone(),
            query: self.status_query.clone(),
            body: RequestBody::Empty,
        }
    }

    /// Request description for a state change to `command`.
    pub fn command_request(&self, command: &str) -> RequestSpec {
        let body = match &self.command_encoding {
            CommandEncoding::Form { field } => {
                RequestBody::Form(vec![(field.clone(), command.to_owned())])
            }
            CommandEncoding::Json { field, template } => {
                let mut object = template.clone();
                object.insert(field.clone(), Value::String(command.to_owned()));
                RequestBody::Json(Value::Object(object))
            }
        };
        RequestSpec {
            method: Method::POST,
            path: self.command_path.clone(),
            query: Vec::new(),
            body,
        }
    }
}

/// A caller-built request, replayable across re-authentication.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, SecretString)>,
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

fn field(name: &str, value: SecretString) -> (String, SecretString) {
    (name.to_owned(), value)
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_owned())
}

fn session_expired() -> StatusCode {
    StatusCode::from_u16(SESSION_EXPIRED).unwrap_or(StatusCode::UNAUTHORIZED)
}
