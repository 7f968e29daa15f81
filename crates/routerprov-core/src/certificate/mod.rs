// ── Certificate lifecycle ──
//
// Guarantees a CA -> server, CA -> client hierarchy is present, signed and
// trusted on a device before the OpenVPN server is configured. Existing
// certificates are the idempotency keys: the manager derives each
// certificate's starting state from the device store, and a strategy only
// runs the steps that state does not already satisfy.
//
// Two interchangeable strategies implement `CertificateStrategy`:
// `LocalToolchainStrategy` (generate locally, upload, import) and
// `OnDeviceStrategy` (create and sign in the device store).

mod local;
mod on_device;
mod storage;
mod toolchain;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{CertificateSettings, StrategyKind};
use crate::error::CoreError;
use crate::facade::RouterFacade;
use crate::model::CertificateEntry;
use crate::ovpn::ClientMaterial;

pub use local::LocalToolchainStrategy;
pub use on_device::OnDeviceStrategy;
pub use storage::{CertificateStorage, DeviceStorage};
pub use toolchain::{CaToolchain, KeyPair, OpensslToolchain};

// ── Roles and specs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateRole {
    Ca,
    Server,
    Client,
}

impl CertificateRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ca => "ca",
            Self::Server => "server",
            Self::Client => "client",
        }
    }

    /// `key-usage` attribute for device-side creation.
    pub fn device_key_usage(self) -> &'static str {
        match self {
            Self::Ca => "key-cert-sign,crl-sign",
            Self::Server => "digital-signature,key-encipherment,tls-server",
            Self::Client => "tls-client",
        }
    }
}

impl fmt::Display for CertificateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for one certificate of the triad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSpec {
    /// Logical name; device-side names derive from it per strategy.
    pub name: String,
    pub common_name: String,
    pub role: CertificateRole,
    pub key_size: u32,
    pub days_valid: u32,
}

/// The CA / server / client set, in issuance order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateTriad {
    pub ca: CertificateSpec,
    pub server: CertificateSpec,
    pub client: CertificateSpec,
    pub ca_crl_host: Option<String>,
}

impl CertificateTriad {
    pub fn from_settings(settings: &CertificateSettings) -> Self {
        let spec = |name: &str, role| CertificateSpec {
            name: name.to_owned(),
            common_name: name.to_owned(),
            role,
            key_size: settings.key_size,
            days_valid: settings.days_valid,
        };
        Self {
            ca: spec(&settings.names.ca, CertificateRole::Ca),
            server: spec(&settings.names.server, CertificateRole::Server),
            client: spec(&settings.names.client, CertificateRole::Client),
            ca_crl_host: settings.ca_crl_host.clone(),
        }
    }

    pub fn specs(&self) -> [&CertificateSpec; 3] {
        [&self.ca, &self.server, &self.client]
    }
}

// ── State and report ─────────────────────────────────────────────────

/// Per-certificate lifecycle. `Imported` is terminal for the local
/// strategy, `Trusted` for the on-device one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CertificateState {
    Absent,
    Created,
    Signed,
    Trusted,
    Uploaded,
    Imported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAsset {
    pub logical_name: String,
    pub device_name: String,
    pub role: CertificateRole,
    pub signed_by: Option<String>,
    pub state: CertificateState,
    pub trusted: bool,
    pub imported_on_device: bool,
    /// Steps skipped because the device already satisfied them.
    pub skipped: Vec<String>,
    /// Step that stopped this certificate, if any.
    pub failed_step: Option<String>,
}

impl CertificateAsset {
    fn new(spec: &CertificateSpec, device_name: String, signed_by: Option<String>) -> Self {
        Self {
            logical_name: spec.name.clone(),
            device_name,
            role: spec.role,
            signed_by,
            state: CertificateState::Absent,
            trusted: false,
            imported_on_device: false,
            skipped: Vec::new(),
            failed_step: None,
        }
    }

    /// Seed state from the device store entry, if one exists.
    fn observe(&mut self, entry: Option<&CertificateEntry>) {
        let Some(entry) = entry else {
            return;
        };
        self.imported_on_device = true;
        self.trusted = entry.trusted;
        self.state = if entry.trusted {
            CertificateState::Trusted
        } else if entry.signed {
            CertificateState::Signed
        } else {
            CertificateState::Created
        };
    }

    pub fn is_present(&self) -> bool {
        self.state > CertificateState::Absent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriadReport {
    pub strategy: StrategyKind,
    pub ca: CertificateAsset,
    pub server: CertificateAsset,
    pub client: CertificateAsset,
}

impl TriadReport {
    pub fn asset_mut(&mut self, role: CertificateRole) -> &mut CertificateAsset {
        match role {
            CertificateRole::Ca => &mut self.ca,
            CertificateRole::Server => &mut self.server,
            CertificateRole::Client => &mut self.client,
        }
    }

    pub fn all_present(&self) -> bool {
        self.ca.is_present() && self.server.is_present() && self.client.is_present()
    }
}

/// Everything a strategy may read while it works.
pub struct TriadContext<'a> {
    pub facade: &'a RouterFacade,
    pub triad: &'a CertificateTriad,
    pub storage: &'a DeviceStorage,
}

/// Record a failed step on `asset` and turn it into the error that stops
/// the triad.
pub(crate) fn step_failed(
    asset: &mut CertificateAsset,
    step: &str,
    status: u16,
    reason: impl Into<String>,
) -> CoreError {
    asset.failed_step = Some(step.to_owned());
    CoreError::CertificateStep {
        certificate: asset.device_name.clone(),
        step: step.to_owned(),
        status,
        reason: reason.into(),
    }
}

// ── Strategy seam ────────────────────────────────────────────────────

/// One way of materializing the triad on a device.
#[async_trait]
pub trait CertificateStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Name the device store uses for a certificate with this logical name.
    fn device_name(&self, logical_name: &str) -> String;

    /// Drive every certificate to its terminal state and return the PEM
    /// material the client bundle needs. Steps already satisfied per
    /// `report` are skipped; `report` is updated as steps complete.
    async fn materialize(
        &self,
        ctx: &TriadContext<'_>,
        report: &mut TriadReport,
    ) -> Result<ClientMaterial, CoreError>;
}

/// Runs the configured strategy for a fixed triad.
#[derive(Clone)]
pub struct CertificateManager {
    strategy: Arc<dyn CertificateStrategy>,
    triad: CertificateTriad,
}

impl CertificateManager {
    pub fn new(strategy: Arc<dyn CertificateStrategy>, triad: CertificateTriad) -> Self {
        Self { strategy, triad }
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Device-side name of the server certificate, for the OpenVPN config.
    pub fn server_device_name(&self) -> String {
        self.strategy.device_name(&self.triad.server.name)
    }

    /// Starting report derived from what the device store already holds.
    pub fn initial_report(&self, existing: &[CertificateEntry]) -> TriadReport {
        let asset = |spec: &CertificateSpec, signed_by: Option<String>| {
            let device_name = self.strategy.device_name(&spec.name);
            let mut asset = CertificateAsset::new(spec, device_name, signed_by);
            asset.observe(existing.iter().find(|e| e.name == asset.device_name));
            asset
        };
        let ca_device = self.strategy.device_name(&self.triad.ca.name);
        TriadReport {
            strategy: self.strategy.kind(),
            ca: asset(&self.triad.ca, None),
            server: asset(&self.triad.server, Some(ca_device.clone())),
            client: asset(&self.triad.client, Some(ca_device)),
        }
    }

    /// Ensure the triad on `facade`'s device. The report always comes back,
    /// with partial progress when the result is an error.
    pub async fn ensure_triad(
        &self,
        facade: &RouterFacade,
        existing: &[CertificateEntry],
        storage: &DeviceStorage,
    ) -> (TriadReport, Result<ClientMaterial, CoreError>) {
        let mut report = self.initial_report(existing);
        let ctx = TriadContext {
            facade,
            triad: &self.triad,
            storage,
        };
        tracing::info!(
            strategy = %self.strategy.kind(),
            device = %facade.endpoint(),
            present = report.all_present(),
            "ensuring certificate triad"
        );
        let result = self.strategy.materialize(&ctx, &mut report).await;
        (report, result)
    }
}

/// Build the strategy named by `settings`.
pub fn strategy_from_settings(settings: &CertificateSettings) -> Arc<dyn CertificateStrategy> {
    match settings.strategy {
        StrategyKind::Local => Arc::new(LocalToolchainStrategy::new(Arc::new(
            OpensslToolchain::new(settings.openssl.clone()),
        ))),
        StrategyKind::OnDevice => Arc::new(OnDeviceStrategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, trusted: bool, signed: bool) -> CertificateEntry {
        CertificateEntry {
            id: Some("*1".into()),
            name: name.into(),
            common_name: None,
            trusted,
            private_key: true,
            signed,
        }
    }

    #[test]
    fn initial_report_reflects_device_store() {
        let manager = CertificateManager::new(
            Arc::new(OnDeviceStrategy),
            CertificateTriad::from_settings(&CertificateSettings::default()),
        );
        let report = manager.initial_report(&[
            entry("CA-Template-OPENVPN-API", true, true),
            entry("CA-SERVER-OPENVPN-API", false, true),
        ]);

        assert_eq!(report.ca.state, CertificateState::Trusted);
        assert_eq!(report.server.state, CertificateState::Signed);
        assert_eq!(report.client.state, CertificateState::Absent);
        assert_eq!(report.server.signed_by.as_deref(), Some("CA-Template-OPENVPN-API"));
        assert!(!report.all_present());
    }

    #[test]
    fn key_usage_by_role() {
        assert_eq!(CertificateRole::Ca.device_key_usage(), "key-cert-sign,crl-sign");
        assert_eq!(CertificateRole::Client.device_key_usage(), "tls-client");
    }
}
