// RouterOS REST session
//
// Adapts the command-oriented session capability onto the RouterOS v7
// REST interface (`/rest/...`). `print` commands become `GET` on the menu
// path with query filters; every other command becomes `POST` on the full
// command path with the attributes as a JSON object. Each request carries
// HTTP basic auth; there is no server-side session to tear down.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::session::{Command, DeviceConnector, DeviceEndpoint, DeviceSession, Record};
use crate::transport::TransportConfig;

/// Command used to verify credentials when a session is opened.
const PROBE_COMMAND: &str = "/system/identity/print";

/// RouterOS REST error body: `{"error": 400, "message": "Bad Request", "detail": "..."}`.
#[derive(Deserialize)]
struct RestError {
    message: Option<String>,
    detail: Option<String>,
}

/// URL scheme used to reach the device's web service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

// ── Connector ────────────────────────────────────────────────────────

/// Opens [`RestSession`]s. One HTTP client is shared by every session.
pub struct RestConnector {
    http: reqwest::Client,
    scheme: Scheme,
    timeout_secs: u64,
}

impl RestConnector {
    pub fn new(transport: &TransportConfig, scheme: Scheme) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            scheme,
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Connector with a pre-built `reqwest::Client` (used by tests).
    pub fn with_client(http: reqwest::Client, scheme: Scheme) -> Self {
        Self {
            http,
            scheme,
            timeout_secs: 0,
        }
    }

    fn base_url(&self, endpoint: &DeviceEndpoint) -> Result<Url, Error> {
        let raw = format!(
            "{}://{}:{}/rest/",
            self.scheme.as_str(),
            endpoint.address,
            endpoint.port
        );
        Ok(Url::parse(&raw)?)
    }
}

#[async_trait]
impl DeviceConnector for RestConnector {
    async fn connect(&self, endpoint: &DeviceEndpoint) -> Result<Box<dyn DeviceSession>, Error> {
        let mut session = RestSession {
            http: self.http.clone(),
            base_url: self.base_url(endpoint)?,
            username: endpoint.username.clone(),
            password: endpoint.password.clone(),
            timeout_secs: self.timeout_secs,
            closed: false,
        };

        debug!(device = %endpoint, "opening device session");
        session.run(&Command::new(PROBE_COMMAND)).await?;
        Ok(Box::new(session))
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// One authenticated conversation with a device.
pub struct RestSession {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    timeout_secs: u64,
    closed: bool,
}

impl RestSession {
    /// Map a command path onto its REST resource.
    ///
    /// `/ip/address/print` -> `{base}/ip/address`, `/interface/gre/add` ->
    /// `{base}/interface/gre/add`.
    fn command_url(&self, command: &Command) -> Result<Url, Error> {
        let path = command.path().trim().trim_start_matches('/');
        let path = if command.is_print() {
            path.strip_suffix("/print").unwrap_or(path)
        } else {
            path
        };
        Ok(self.base_url.join(path.trim_end_matches('/'))?)
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }
}

#[async_trait]
impl DeviceSession for RestSession {
    async fn run(&mut self, command: &Command) -> Result<Vec<Record>, Error> {
        if self.closed {
            return Err(Error::SessionClosed);
        }

        let url = self.command_url(command)?;
        let request = if command.is_print() {
            debug!(command = command.path(), "GET {}", url);
            let mut builder = self.http.get(url);
            if !command.queries().is_empty() {
                builder = builder.query(command.queries());
            }
            builder
        } else {
            debug!(command = command.path(), "POST {}", url);
            let body: serde_json::Map<String, serde_json::Value> = command
                .params()
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            self.http.post(url).json(&body)
        };

        let resp = request
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        parse_reply(command, resp).await
    }

    async fn close(&mut self) -> Result<(), Error> {
        trace!("closing device session");
        self.closed = true;
        Ok(())
    }
}

async fn parse_reply(command: &Command, resp: reqwest::Response) -> Result<Vec<Record>, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "device rejected the supplied credentials".into(),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        let parsed = serde_json::from_str::<RestError>(&body).ok();
        let (message, detail) = match parsed {
            Some(err) => (
                err.message.unwrap_or_else(|| status.to_string()),
                err.detail,
            ),
            None => (preview(&body), None),
        };
        return Err(Error::Device {
            command: command.path().to_owned(),
            status: status.as_u16(),
            message,
            detail,
        });
    }

    decode_records(&body)
}

/// Normalize a REST reply into records.
///
/// `print` answers with an array of objects, `add` with `{"ret": "*1"}`,
/// `set`/`remove` with `[]` or an empty body.
pub(crate) fn decode_records(body: &str) -> Result<Vec<Record>, Error> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(body)),
            body: body.to_owned(),
        })?;

    Ok(match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(serde_json::Value::as_object)
            .map(Record::from_json_object)
            .collect(),
        serde_json::Value::Object(object) => vec![Record::from_json_object(&object)],
        serde_json::Value::Null => Vec::new(),
        scalar => vec![Record::new().with("ret", scalar.to_string())],
    })
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
