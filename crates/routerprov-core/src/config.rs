// ── Runtime provisioning configuration ──
//
// These types describe *how* the orchestrator reaches devices and the
// compute API, how hard the allocator tries, and where certificate
// material is staged. They never touch disk: the config crate or a test
// builds a `ProvisioningConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use routerprov_api::{Scheme, TlsMode, TransportConfig};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::allocator::DEFAULT_MAX_ATTEMPTS;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Default: RouterOS ships self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

impl TlsVerification {
    pub fn to_tls_mode(&self) -> TlsMode {
        match self {
            Self::SystemDefaults => TlsMode::System,
            Self::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// How device sessions are opened.
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub scheme: Scheme,
    pub tls: TlsVerification,
    /// Bounded per-call timeout.
    pub timeout: Duration,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            scheme: Scheme::default(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl DeviceSettings {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig::new(self.tls.to_tls_mode(), self.timeout)
    }
}

/// How the compute management API is reached.
#[derive(Debug, Clone)]
pub struct ComputeSettings {
    /// Scheme used when a request address carries none.
    pub scheme: Scheme,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            scheme: Scheme::Http,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ComputeSettings {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig::new(self.tls.to_tls_mode(), self.timeout)
    }
}

/// Which certificate materialization strategy runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StrategyKind {
    /// Generate with the local CA toolchain, upload, import.
    #[default]
    Local,
    /// Create and sign inside the device certificate store.
    OnDevice,
}

/// Device-side names of the CA / server / client triad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriadNames {
    pub ca: String,
    pub server: String,
    pub client: String,
}

impl Default for TriadNames {
    fn default() -> Self {
        Self {
            ca: "CA-Template-OPENVPN-API".into(),
            server: "CA-SERVER-OPENVPN-API".into(),
            client: "CA-CLIENT-OPENVPN-API".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CertificateSettings {
    pub strategy: StrategyKind,
    /// Root under which per-device staging directories are created.
    pub storage_root: PathBuf,
    /// CA toolchain binary.
    pub openssl: PathBuf,
    pub names: TriadNames,
    pub key_size: u32,
    pub days_valid: u32,
    pub ca_crl_host: Option<String>,
}

impl Default for CertificateSettings {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            storage_root: std::env::temp_dir().join("routerprov-certs"),
            openssl: PathBuf::from("openssl"),
            names: TriadNames::default(),
            key_size: 4096,
            days_valid: 3650,
            ca_crl_host: None,
        }
    }
}

/// Everything the orchestrator needs at runtime.
///
/// Built by the CLI / server from loaded configuration; core never reads
/// config files.
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    pub device: DeviceSettings,
    pub compute: ComputeSettings,
    /// Random attempts per allocation before the deterministic sweep.
    pub allocator_max_attempts: u32,
    pub certificates: CertificateSettings,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            device: DeviceSettings::default(),
            compute: ComputeSettings::default(),
            allocator_max_attempts: DEFAULT_MAX_ATTEMPTS,
            certificates: CertificateSettings::default(),
        }
    }
}
