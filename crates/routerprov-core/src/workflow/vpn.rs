// OpenVPN provisioning on one device.
//
// Pool, profile and certificates are reused when the device already has
// them under the deterministic names, so a second run against the same
// device only re-allocates the port and rewrites the server settings.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use secrecy::ExposeSecret;
use tracing::{info, warn};

use super::Stop;
use crate::allocator::allocate_subnet_pool;
use crate::envelope::{Envelope, status};
use crate::error::CoreError;
use crate::facade::RouterFacade;
use crate::model::{
    Abort, AddressEntry, CertificateEntry, PoolEntry, PoolSummary, PppProfile, VpnReport, VpnRequest,
    VpnStage, VpnType, existing_networks,
};
use crate::naming;
use crate::ovpn::render_client_config;
use crate::provisioner::Provisioner;

/// Pool size handed to OpenVPN clients.
const POOL_PREFIX: u8 = 24;

/// Failure tagged with the step that stopped the run.
type Step<T> = Result<T, (&'static str, Stop)>;

/// Device state read before anything is changed.
struct Inventory {
    identity: String,
    pools: Vec<PoolEntry>,
    profiles: Vec<PppProfile>,
    addresses: Vec<AddressEntry>,
    certificates: Vec<CertificateEntry>,
}

impl Provisioner {
    /// Provision a VPN server of `request.vpn_type` on one device.
    ///
    /// Only OpenVPN is provisioned. `l2tp`, `ppp` and `pptp` answer a
    /// success-shaped placeholder without touching the device.
    pub async fn create_vpn(&self, request: &VpnRequest) -> Envelope<VpnReport> {
        if let Err(err) = request.validate() {
            return Envelope::from_error(&err);
        }
        let (endpoint, reachable) = match request.resolve() {
            Ok(resolved) => resolved,
            Err(err) => return Envelope::from_error(&err),
        };
        if request.vpn_type.is_placeholder() {
            return Envelope::new(
                status::OK,
                None,
                format!("we are working on new feature to create {}", request.vpn_type),
            );
        }
        if request.vpn_type != VpnType::OpenVpn {
            return Envelope::not_actionable("Selected VPN type is not valid");
        }

        let facade = self.facade(endpoint);
        let mut report = VpnReport::new(facade.endpoint().to_string());
        match self.run_openvpn(&facade, &reachable, &mut report).await {
            Ok(()) => {
                report.stage = VpnStage::Done;
                info!(device = %report.endpoint, port = ?report.port, "openVpn provisioned");
                Envelope::ok(report, "we have successfully setup openVpn on your router")
            }
            Err((step, stop)) => {
                warn!(device = %report.endpoint, step, stage = ?report.stage, "openVpn provisioning stopped");
                report.aborted = Some(Abort {
                    step: step.to_owned(),
                    sides: Vec::new(),
                });
                stop.into_envelope(Some(report))
            }
        }
    }

    async fn run_openvpn(
        &self,
        facade: &RouterFacade,
        reachable: &str,
        report: &mut VpnReport,
    ) -> Step<()> {
        let inventory = inspect(facade).await?;
        report.identity = Some(inventory.identity.clone());
        report.stage = VpnStage::Inspected;

        let pool_start = self.ensure_pool(facade, &inventory, report).await?;
        report.stage = VpnStage::PoolReady;

        let profile = naming::vpn_profile(&inventory.identity);
        if inventory.profiles.iter().any(|p| p.name == profile) {
            info!(%profile, "PPP profile already present");
        } else {
            let pool = report.pool.as_ref().map(|p| p.name.clone()).unwrap_or_default();
            let created = facade.create_ppp_profile(&profile, pool_start, &pool).await;
            Stop::check(&created).map_err(|stop| ("profile", stop))?;
        }
        report.profile = Some(profile.clone());
        report.stage = VpnStage::ProfileReady;

        let manager = self.certificates();
        let storage = self.storage().device_dir(&inventory.identity);
        let (triad, material) = manager
            .ensure_triad(facade, &inventory.certificates, &storage)
            .await;
        if let Err(err) = storage.cleanup().await {
            warn!(error = %err, "failed to clean certificate staging directory");
        }
        report.certificates = Some(triad);
        let material = material.map_err(|err| ("certificates", Stop::error(&err)))?;
        report.stage = VpnStage::CertificatesReady;

        let used = facade
            .used_ports()
            .await
            .map_err(|err| ("ports", Stop::error(&err)))?;
        let port = self.allocate_vpn_port(&used)?;
        report.port = Some(port);
        report.stage = VpnStage::PortAllocated;

        let server = facade
            .configure_openvpn(port, &profile, &manager.server_device_name())
            .await;
        let configured = Stop::check(&server);
        report.server = Some(server);
        configured.map_err(|stop| ("server", stop))?;
        report.stage = VpnStage::ServerConfigured;

        report.client_config = Some(render_client_config(reachable, port, &material));
        report.key_passphrase = material
            .key_passphrase
            .as_ref()
            .map(|p| p.expose_secret().to_owned());
        Ok(())
    }

    /// Ensure the identity-named pool exists and return its first address,
    /// the server side of every PPP link.
    async fn ensure_pool(
        &self,
        facade: &RouterFacade,
        inventory: &Inventory,
        report: &mut VpnReport,
    ) -> Step<Ipv4Addr> {
        let name = naming::vpn_pool(&inventory.identity);

        if let Some(existing) = inventory.pools.iter().find(|p| p.name == name) {
            let Some(start) = existing.start else {
                return Err((
                    "pool",
                    Stop::new(
                        status::COMMAND_FAILED,
                        format!("IP pool {name} has no usable range: {}", existing.ranges),
                    ),
                ));
            };
            info!(pool = %name, "IP pool already present");
            report.pool = Some(PoolSummary {
                name,
                ranges: existing.ranges.clone(),
                created: false,
            });
            return Ok(start);
        }

        let mut taken: BTreeSet<Ipv4Addr> = existing_networks(&inventory.addresses);
        taken.extend(inventory.pools.iter().filter_map(|p| p.network));
        let network = self
            .allocator()
            .allocate_network(&mut rand::thread_rng(), &taken, None);
        let network = network.map_err(|err| ("pool", Stop::error(&err)))?;
        let (start, end) =
            allocate_subnet_pool(network, POOL_PREFIX).map_err(|err| ("pool", Stop::error(&err)))?;

        let created = facade.create_pool(&name, start, end).await;
        Stop::check(&created).map_err(|stop| ("pool", stop))?;
        report.pool = Some(PoolSummary {
            name,
            ranges: format!("{start}-{end}"),
            created: true,
        });
        Ok(start)
    }

    fn allocate_vpn_port(&self, used: &BTreeSet<u16>) -> Step<u16> {
        self.allocator()
            .allocate_port(&mut rand::thread_rng(), used)
            .map_err(|err| ("port", Stop::error(&err)))
    }
}

/// Read identity, pools, profiles, addresses and certificates. The first
/// failure stops with its own status and message.
async fn inspect(facade: &RouterFacade) -> Step<Inventory> {
    let fail = |step: &'static str| move |err: CoreError| (step, Stop::from(err));
    Ok(Inventory {
        identity: facade.identity().await.map_err(fail("identity"))?,
        pools: facade.list_pools().await.map_err(fail("pools"))?,
        profiles: facade.list_ppp_profiles().await.map_err(fail("profiles"))?,
        addresses: facade.list_addresses().await.map_err(fail("addresses"))?,
        certificates: facade.list_certificates().await.map_err(fail("certificates"))?,
    })
}
