// vCenter REST client
//
// Session login via `POST /rest/com/vmware/cis/session` (basic auth), then
// every call carries the `vmware-api-session-id` header.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::vcenter::models::{ClusterSummary, ValueEnvelope, VmSpec};

const SESSION_HEADER: &str = "vmware-api-session-id";

/// Token returned by a successful login.
#[derive(Debug, Clone)]
pub struct ComputeSession {
    token: SecretString,
}

impl ComputeSession {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }
}

/// Raw HTTP client for the vCenter `/rest` API.
pub struct ComputeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ComputeClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn rest_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/rest/{path}"))?)
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Log in and obtain a session token.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<ComputeSession, Error> {
        let url = self.rest_url("com/vmware/cis/session")?;
        debug!("logging in at {}", url);

        let resp = self
            .http
            .post(url)
            .basic_auth(username, Some(password.expose_secret()))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!(
                    "login failed (HTTP {status}): {}",
                    body.chars().take(200).collect::<String>()
                ),
            });
        }

        let token: String = parse_value(resp).await?;
        debug!("login successful");
        Ok(ComputeSession::new(SecretString::from(token)))
    }

    // ── Inventory ────────────────────────────────────────────────────

    pub async fn list_clusters(
        &self,
        session: &ComputeSession,
    ) -> Result<Vec<ClusterSummary>, Error> {
        let url = self.rest_url("vcenter/cluster")?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .header(SESSION_HEADER, session.token().expose_secret())
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_value(check_status(resp).await?).await
    }

    /// Create one virtual machine, returning its identifier (e.g. `vm-42`).
    pub async fn create_vm(&self, session: &ComputeSession, spec: &VmSpec) -> Result<String, Error> {
        let url = self.rest_url("vcenter/vm")?;
        debug!(vm = %spec.name, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .header(SESSION_HEADER, session.token().expose_secret())
            .json(spec)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_value(check_status(resp).await?).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "session token rejected".into(),
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Compute {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        });
    }
    Ok(resp)
}

async fn parse_value<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await.map_err(Error::Transport)?;
    let envelope: ValueEnvelope<T> =
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", body.chars().take(200).collect::<String>()),
            body: body.clone(),
        })?;
    Ok(envelope.value)
}
