// ── Provisioner ──
//
// Entry point for every workflow. Owns the runtime configuration and the
// collaborators each request borrows: the device connector, the
// certificate manager, the allocator, and the certificate staging root.
// Holds no request state; concurrent calls share nothing mutable.

use std::sync::Arc;

use routerprov_api::{ComputeClient, DeviceConnector, DeviceEndpoint, RestConnector};
use url::Url;

use crate::allocator::Allocator;
use crate::certificate::{
    CertificateManager, CertificateStorage, CertificateStrategy, CertificateTriad,
    strategy_from_settings,
};
use crate::config::ProvisioningConfig;
use crate::error::CoreError;
use crate::facade::RouterFacade;
use crate::model::ComputeAuth;

/// Cheaply cloneable via `Arc<ProvisionerInner>`.
#[derive(Clone)]
pub struct Provisioner {
    inner: Arc<ProvisionerInner>,
}

struct ProvisionerInner {
    config: ProvisioningConfig,
    connector: Arc<dyn DeviceConnector>,
    certificates: CertificateManager,
    allocator: Allocator,
    storage: CertificateStorage,
}

impl Provisioner {
    /// Build a provisioner that reaches devices over the RouterOS REST
    /// interface and materializes certificates with the configured strategy.
    pub fn new(config: ProvisioningConfig) -> Result<Self, CoreError> {
        let connector = RestConnector::new(&config.device.transport(), config.device.scheme)?;
        let strategy = strategy_from_settings(&config.certificates);
        Ok(Self::with_parts(config, Arc::new(connector), strategy))
    }

    /// Build from explicit collaborators.
    pub fn with_parts(
        config: ProvisioningConfig,
        connector: Arc<dyn DeviceConnector>,
        strategy: Arc<dyn CertificateStrategy>,
    ) -> Self {
        let certificates =
            CertificateManager::new(strategy, CertificateTriad::from_settings(&config.certificates));
        let allocator = Allocator::new(config.allocator_max_attempts);
        let storage = CertificateStorage::new(config.certificates.storage_root.clone());
        Self {
            inner: Arc::new(ProvisionerInner {
                config,
                connector,
                certificates,
                allocator,
                storage,
            }),
        }
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.inner.config
    }

    pub fn certificates(&self) -> &CertificateManager {
        &self.inner.certificates
    }

    /// Façade over one device, sharing this provisioner's connector.
    pub fn facade(&self, endpoint: DeviceEndpoint) -> RouterFacade {
        RouterFacade::new(Arc::clone(&self.inner.connector), endpoint)
    }

    pub(crate) fn allocator(&self) -> &Allocator {
        &self.inner.allocator
    }

    pub(crate) fn storage(&self) -> &CertificateStorage {
        &self.inner.storage
    }

    /// Client for the compute API named by `auth`.
    pub(crate) fn compute_client(&self, auth: &ComputeAuth) -> Result<ComputeClient, CoreError> {
        let settings = &self.inner.config.compute;
        let base = compute_base_url(&auth.address, auth.port(), settings.scheme.as_str());
        let url = Url::parse(&base).map_err(|e| {
            CoreError::validation(format!("Invalid compute address {base}: {e}"))
        })?;
        Ok(ComputeClient::new(url, &settings.transport())?)
    }
}

/// `address` kept as-is when it already names a scheme, otherwise prefixed
/// with `scheme`; the port is always appended.
fn compute_base_url(address: &str, port: u16, scheme: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.contains("://") {
        format!("{address}:{port}")
    } else {
        format!("{scheme}://{address}:{port}")
    }
}
