// Device session capability
//
// The orchestration core only ever talks to a device through these two
// traits: a connector opens an authenticated session for an endpoint, and
// the session runs RouterOS-style commands (`/ip/address/print`,
// `/interface/gre/add`, ...) returning flat attribute records.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Endpoint ────────────────────────────────────────────────────────

/// One reachable device: where it is and how to log in.
///
/// Constructed per request and never persisted.
#[derive(Debug, Clone)]
pub struct DeviceEndpoint {
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl DeviceEndpoint {
    pub fn new(
        address: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            address: address.into(),
            port,
            username: username.into(),
            password,
        }
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

// ── Command ─────────────────────────────────────────────────────────

/// A device command: menu path plus `=key=value` attributes and
/// `?key=value` query filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    path: String,
    params: Vec<(String, String)>,
    queries: Vec<(String, String)>,
}

impl Command {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
            queries: Vec::new(),
        }
    }

    /// Append a `=key=value` attribute.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Append an attribute only when a value is present.
    pub fn param_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Append a `?key=value` filter (only meaningful on `print`).
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.queries.push((key.into(), value.to_string()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn queries(&self) -> &[(String, String)] {
        &self.queries
    }

    /// Look up an attribute value by key.
    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a query filter value by key.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.queries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `true` for read-only listing commands (`.../print`).
    pub fn is_print(&self) -> bool {
        self.path.ends_with("/print")
    }
}

// ── Record ──────────────────────────────────────────────────────────

/// One reply record. RouterOS reports every attribute as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The RouterOS internal id (`.id`, e.g. `*1A`).
    pub fn id(&self) -> Option<&str> {
        self.get(".id")
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten a JSON object into string attributes.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        object
            .iter()
            .map(|(k, v)| (k.clone(), json_to_attribute(v)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn json_to_attribute(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Capability traits ───────────────────────────────────────────────

/// An authenticated, command-oriented connection to one device.
///
/// Callers must call [`close`](Self::close) when done; implementations
/// reject commands issued after close with [`Error::SessionClosed`].
#[async_trait]
pub trait DeviceSession: Send {
    async fn run(&mut self, command: &Command) -> Result<Vec<Record>, Error>;

    async fn close(&mut self) -> Result<(), Error>;
}

/// Opens device sessions.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn connect(&self, endpoint: &DeviceEndpoint) -> Result<Box<dyn DeviceSession>, Error>;
}
