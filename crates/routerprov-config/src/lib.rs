//! Configuration for the routerprov binary.
//!
//! TOML file + `ROUTERPROV_*` environment overrides, resolved with figment,
//! and translation to `routerprov_core::ProvisioningConfig`. The core never
//! reads configuration itself.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use routerprov_api::Scheme;
use routerprov_core::{
    CertificateSettings, ComputeSettings, DeviceSettings, ProvisioningConfig, StrategyKind,
    TlsVerification, TriadNames,
};

/// Environment prefix; nested keys use `__`, e.g. `ROUTERPROV_DEVICE__TIMEOUT_SECS`.
pub const ENV_PREFIX: &str = "ROUTERPROV_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("config file already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub device: DeviceSection,
    pub allocator: AllocatorSection,
    pub certificates: CertificatesSection,
    pub compute: ComputeSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".into(),
        }
    }
}

impl ServerSection {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|e| invalid("server.bind", format!("'{}': {e}", self.bind)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceSection {
    /// RouterOS REST scheme: "http" or "https".
    pub scheme: String,
    pub timeout_secs: u64,
    /// Accept self-signed device certificates.
    pub insecure: bool,
    /// CA bundle used when `insecure` is off.
    pub ca_cert: Option<PathBuf>,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            scheme: "https".into(),
            timeout_secs: 5,
            insecure: true,
            ca_cert: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AllocatorSection {
    pub max_attempts: u32,
}

impl Default for AllocatorSection {
    fn default() -> Self {
        Self {
            max_attempts: routerprov_core::allocator::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CertificatesSection {
    /// "local" or "on-device".
    pub strategy: String,
    pub storage_root: PathBuf,
    pub openssl: PathBuf,
    pub ca_name: String,
    pub server_name: String,
    pub client_name: String,
    pub key_size: u32,
    pub days_valid: u32,
    /// Empty means no CRL host.
    pub ca_crl_host: String,
}

impl Default for CertificatesSection {
    fn default() -> Self {
        let names = TriadNames::default();
        Self {
            strategy: StrategyKind::default().to_string(),
            storage_root: data_dir().join("certs"),
            openssl: PathBuf::from("openssl"),
            ca_name: names.ca,
            server_name: names.server,
            client_name: names.client,
            key_size: 4096,
            days_valid: 3650,
            ca_crl_host: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ComputeSection {
    /// Scheme for compute addresses given without one.
    pub scheme: String,
    pub timeout_secs: u64,
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,
}

impl Default for ComputeSection {
    fn default() -> Self {
        Self {
            scheme: "http".into(),
            timeout_secs: 30,
            insecure: true,
            ca_cert: None,
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "routerprov", "routerprov")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Per-user data directory; certificate staging lives below it.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(dirs_fallback, |dirs| dirs.data_dir().to_path_buf())
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("routerprov");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Defaults, then the TOML file at `path` (or the platform path), then
/// `ROUTERPROV_*` variables.
pub fn figment(path: Option<&Path>) -> Figment {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    Ok(config)
}

// ── Saving ──────────────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Write a default config file. Refuses to overwrite unless `force`.
pub fn init_config(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    save_config(&Config::default(), path)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Build the core runtime config, validating every field it consumes.
    pub fn to_provisioning_config(&self) -> Result<ProvisioningConfig, ConfigError> {
        let certs = &self.certificates;
        let strategy: StrategyKind = certs.strategy.parse().map_err(|_| {
            invalid(
                "certificates.strategy",
                format!("expected 'local' or 'on-device', got '{}'", certs.strategy),
            )
        })?;
        if certs.key_size < 1024 {
            return Err(invalid("certificates.key_size", "must be at least 1024"));
        }
        if certs.days_valid == 0 {
            return Err(invalid("certificates.days_valid", "must be at least 1"));
        }
        if self.allocator.max_attempts == 0 {
            return Err(invalid("allocator.max_attempts", "must be at least 1"));
        }
        let ca_crl_host = certs.ca_crl_host.trim();

        Ok(ProvisioningConfig {
            device: DeviceSettings {
                scheme: parse_scheme("device.scheme", &self.device.scheme)?,
                tls: tls(self.device.insecure, self.device.ca_cert.as_ref()),
                timeout: timeout("device.timeout_secs", self.device.timeout_secs)?,
            },
            compute: ComputeSettings {
                scheme: parse_scheme("compute.scheme", &self.compute.scheme)?,
                tls: tls(self.compute.insecure, self.compute.ca_cert.as_ref()),
                timeout: timeout("compute.timeout_secs", self.compute.timeout_secs)?,
            },
            allocator_max_attempts: self.allocator.max_attempts,
            certificates: CertificateSettings {
                strategy,
                storage_root: certs.storage_root.clone(),
                openssl: certs.openssl.clone(),
                names: TriadNames {
                    ca: certs.ca_name.clone(),
                    server: certs.server_name.clone(),
                    client: certs.client_name.clone(),
                },
                key_size: certs.key_size,
                days_valid: certs.days_valid,
                ca_crl_host: (!ca_crl_host.is_empty()).then(|| ca_crl_host.to_owned()),
            },
        })
    }
}

fn parse_scheme(field: &str, value: &str) -> Result<Scheme, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "http" => Ok(Scheme::Http),
        "https" => Ok(Scheme::Https),
        other => Err(invalid(
            field,
            format!("expected 'http' or 'https', got '{other}'"),
        )),
    }
}

fn tls(insecure: bool, ca_cert: Option<&PathBuf>) -> TlsVerification {
    if insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(path) = ca_cert {
        TlsVerification::CustomCa(path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

fn timeout(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(invalid(field, "must be at least 1 second"));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_translate_to_core_defaults() {
        let config = Config::default().to_provisioning_config().unwrap();
        let core = ProvisioningConfig::default();

        assert_eq!(config.device.scheme, core.device.scheme);
        assert_eq!(config.device.timeout, core.device.timeout);
        assert_eq!(config.allocator_max_attempts, core.allocator_max_attempts);
        assert_eq!(config.certificates.names, core.certificates.names);
        assert_eq!(config.certificates.strategy, StrategyKind::Local);
        assert_eq!(config.certificates.ca_crl_host, None);
    }

    #[test]
    fn file_overrides_defaults_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
[device]
scheme = "http"
timeout_secs = 9

[certificates]
strategy = "on-device"
ca_crl_host = "crl.example.net"
"#,
        );

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.device.timeout_secs, 9);
        assert!(config.device.insecure);
        assert_eq!(config.server.bind, "127.0.0.1:3000");

        let runtime = config.to_provisioning_config().unwrap();
        assert_eq!(runtime.device.scheme, Scheme::Http);
        assert_eq!(runtime.certificates.strategy, StrategyKind::OnDevice);
        assert_eq!(
            runtime.certificates.ca_crl_host.as_deref(),
            Some("crl.example.net")
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut config = Config::default();
        config.certificates.strategy = "cloud".into();
        let err = config.to_provisioning_config().unwrap_err();
        assert!(err.to_string().contains("certificates.strategy"));

        let mut config = Config::default();
        config.device.scheme = "ftp".into();
        assert!(config.to_provisioning_config().is_err());

        let mut config = Config::default();
        config.compute.timeout_secs = 0;
        assert!(config.to_provisioning_config().is_err());
    }

    #[test]
    fn secure_transport_uses_custom_ca() {
        let mut config = Config::default();
        config.device.insecure = false;
        config.device.ca_cert = Some(PathBuf::from("/etc/routerprov/ca.pem"));
        config.compute.insecure = false;

        let runtime = config.to_provisioning_config().unwrap();
        assert_eq!(
            runtime.device.tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/routerprov/ca.pem"))
        );
        assert_eq!(runtime.compute.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init_config(&path, false).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Config::default());

        let err = init_config(&path, false).unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists { .. }));
        init_config(&path, true).unwrap();
    }

    #[test]
    fn bind_address_parses() {
        assert_eq!(
            ServerSection::default().bind_addr().unwrap().port(),
            3000
        );
        let bad = ServerSection {
            bind: "localhost".into(),
        };
        assert!(bad.bind_addr().is_err());
    }
}
