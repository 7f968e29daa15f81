// ── Inbound request shapes ──
//
// Deserialized from JSON (HTTP bodies or `-f` files). `validate()` checks
// field formats only; choosing between the `local` and `public` variants
// is part of each workflow because its failure message names the side.

use std::net::Ipv4Addr;

use routerprov_api::DeviceEndpoint;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

// ── Building blocks ─────────────────────────────────────────────────

/// `{ address, port }`: one way to reach a device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddressSpec {
    pub address: String,
    pub port: u16,
}

impl AddressSpec {
    pub fn validate(&self, path: &str) -> Result<(), CoreError> {
        validate_address(&format!("{path}.address"), &self.address)?;
        validate_port(&format!("{path}.port"), self.port)
    }
}

/// Username and password pair.
#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: SecretString,
}

/// Exactly one of `local` / `public` is expected; the other stays `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReachableAddress {
    pub local: Option<AddressSpec>,
    pub public: Option<AddressSpec>,
}

impl ReachableAddress {
    /// The single supplied variant, or `None` when zero or both are present.
    pub fn selected(&self) -> Option<&AddressSpec> {
        match (&self.local, &self.public) {
            (Some(spec), None) | (None, Some(spec)) => Some(spec),
            _ => None,
        }
    }

    pub fn validate(&self, path: &str) -> Result<(), CoreError> {
        if let Some(local) = &self.local {
            local.validate(&format!("{path}.local"))?;
        }
        if let Some(public) = &self.public {
            public.validate(&format!("{path}.public"))?;
        }
        Ok(())
    }
}

// ── Tunnels ─────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TunnelType {
    Gre,
    Eoip,
    Vxlan,
    Ipip,
    /// Any other value. Answered with 204, never an error.
    #[serde(other)]
    Unknown,
}

/// One side of a tunnel: address variants plus that device's credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct TunnelEndpoint {
    #[serde(flatten)]
    pub reach: ReachableAddress,
    pub username: String,
    pub password: SecretString,
}

impl TunnelEndpoint {
    /// Resolve the device endpoint for `side`, or the 406 that names it.
    pub fn resolve(&self, side: &str) -> Result<(DeviceEndpoint, String), CoreError> {
        let spec = self.reach.selected().ok_or_else(|| {
            CoreError::validation(format!(
                "You should provide one of local or public IP for {side}"
            ))
        })?;
        let endpoint = DeviceEndpoint::new(
            spec.address.clone(),
            spec.port,
            self.username.clone(),
            self.password.clone(),
        );
        Ok((endpoint, spec.address.clone()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelRequest {
    pub tunnel_type: TunnelType,
    pub source: TunnelEndpoint,
    pub destination: TunnelEndpoint,
}

impl TunnelRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.source.reach.validate("source")?;
        self.destination.reach.validate("destination")
    }
}

// ── VPNs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Display, EnumString)]
pub enum VpnType {
    #[serde(rename = "openVpn")]
    #[strum(serialize = "openVpn")]
    OpenVpn,
    #[serde(rename = "l2tp")]
    #[strum(serialize = "l2tp")]
    L2tp,
    #[serde(rename = "ppp")]
    #[strum(serialize = "ppp")]
    Ppp,
    #[serde(rename = "pptp")]
    #[strum(serialize = "pptp")]
    Pptp,
    #[serde(other)]
    #[strum(serialize = "unknown")]
    Unknown,
}

impl VpnType {
    /// Types that are recognized but not provisioned yet.
    pub fn is_placeholder(self) -> bool {
        matches!(self, Self::L2tp | Self::Ppp | Self::Pptp)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnRequest {
    pub vpn_type: VpnType,
    pub router: ReachableAddress,
    pub credential: Credential,
}

impl VpnRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.router.validate("router")
    }

    pub fn resolve(&self) -> Result<(DeviceEndpoint, String), CoreError> {
        let spec = self.router.selected().ok_or_else(|| {
            CoreError::validation("you should provide one of local or public object")
        })?;
        let endpoint = DeviceEndpoint::new(
            spec.address.clone(),
            spec.port,
            self.credential.username.clone(),
            self.credential.password.clone(),
        );
        Ok((endpoint, spec.address.clone()))
    }
}

// ── Single-device requests ──────────────────────────────────────────

/// `{ address, port, username, password }` for one device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRequest {
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl DeviceRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_address("address", &self.address)?;
        validate_port("port", self.port)
    }

    pub fn endpoint(&self) -> DeviceEndpoint {
        DeviceEndpoint::new(
            self.address.clone(),
            self.port,
            self.username.clone(),
            self.password.clone(),
        )
    }
}

/// Create one PPP secret (`user` / `pass`) on the device named by `auth`.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretRequest {
    pub auth: DeviceRequest,
    pub user: String,
    pub pass: SecretString,
    pub profile: Option<String>,
}

impl SecretRequest {
    pub const DEFAULT_PROFILE: &'static str = "default";

    pub fn validate(&self) -> Result<(), CoreError> {
        self.auth.validate()
    }

    pub fn profile(&self) -> &str {
        self.profile.as_deref().unwrap_or(Self::DEFAULT_PROFILE)
    }
}

/// Ping `target` from the device named by `auth`.
#[derive(Debug, Clone, Deserialize)]
pub struct PingRequest {
    pub auth: DeviceRequest,
    pub target: String,
    pub count: Option<u32>,
}

impl PingRequest {
    pub const DEFAULT_COUNT: u32 = 4;

    pub fn validate(&self) -> Result<(), CoreError> {
        self.auth.validate()?;
        validate_address("target", &self.target)?;
        if self.count == Some(0) {
            return Err(invalid("count", "must be at least 1"));
        }
        Ok(())
    }

    pub fn count(&self) -> u32 {
        self.count.unwrap_or(Self::DEFAULT_COUNT)
    }
}

// ── Compute ─────────────────────────────────────────────────────────

/// Where and as whom to reach the compute management API.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputeAuth {
    pub address: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: SecretString,
}

impl ComputeAuth {
    pub const DEFAULT_PORT: u16 = 80;

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_address("address", strip_scheme(&self.address))?;
        match self.port {
            Some(port) => validate_port("port", port),
            None => Ok(()),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(Self::DEFAULT_PORT)
    }
}

/// Create `copy` identical machines named `<name>-1 ..= <name>-<copy>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineRequest {
    #[serde(flatten)]
    pub auth: ComputeAuth,
    pub name: String,
    /// Disk size in GiB.
    pub storage: u64,
    /// Memory in MiB.
    pub ram: u64,
    pub cpu: u32,
    pub os: String,
    pub copy: u32,
    pub cluster_id: String,
    pub vmx_version: String,
}

impl MachineRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.auth.validate()?;
        if self.copy == 0 {
            return Err(invalid("copy", "must be at least 1"));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name", "must not be empty"));
        }
        Ok(())
    }
}

// ── Field validation ────────────────────────────────────────────────

fn invalid(path: &str, message: &str) -> CoreError {
    CoreError::validation(format!("Validation failed: {path} - {message}"))
}

fn validate_port(path: &str, port: u16) -> Result<(), CoreError> {
    if port == 0 {
        return Err(invalid(path, "Port must be at least 1"));
    }
    Ok(())
}

fn validate_address(path: &str, address: &str) -> Result<(), CoreError> {
    if address.parse::<Ipv4Addr>().is_ok() || is_domain_name(address) {
        Ok(())
    } else {
        Err(invalid(path, "Invalid IP address or domain format."))
    }
}

fn strip_scheme(address: &str) -> &str {
    address
        .split_once("://")
        .map_or(address, |(_, rest)| rest)
        .trim_end_matches('/')
}

/// Dotted labels of ASCII letters, digits and inner hyphens, ending in an
/// alphabetic top-level label.
pub(crate) fn is_domain_name(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = candidate.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let well_formed = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld_alpha = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    well_formed && tld_alpha
}
