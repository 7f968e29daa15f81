// Tunnel provisioning across a source and a destination device.
//
// Both devices share one allocated /24: host .1 on the source interface,
// host .2 on the destination. Every per-side step runs source first, and
// both results are evaluated before the workflow moves on. A side that
// succeeded is never undone when its peer fails.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use tracing::{info, warn};

use super::Stop;
use crate::allocator::{Allocator, host_in_network};
use crate::envelope::{Envelope, Outcome, status};
use crate::facade::{RouterFacade, TunnelInterface};
use crate::model::{
    Side, SideReport, TunnelReport, TunnelRequest, TunnelStage, TunnelType, describe_sides,
    existing_networks,
};
use crate::naming;
use crate::provisioner::Provisioner;

const SIDES: [Side; 2] = [Side::Source, Side::Destination];

/// Type-specific parameters shared by both interfaces of one tunnel.
#[derive(Debug, Clone, Copy)]
enum TunnelParams {
    Gre,
    Eoip { tunnel_id: u32 },
    Vxlan { vni: u32, port: u16 },
    Ipip,
}

impl TunnelParams {
    fn interface(self, name: String, remote_address: &str) -> TunnelInterface {
        let remote_address = remote_address.to_owned();
        match self {
            Self::Gre => TunnelInterface::Gre {
                name,
                remote_address,
            },
            Self::Eoip { tunnel_id } => TunnelInterface::Eoip {
                name,
                remote_address,
                tunnel_id,
            },
            Self::Vxlan { vni, port } => TunnelInterface::Vxlan { name, vni, port },
            Self::Ipip => TunnelInterface::Ipip {
                name,
                remote_address,
            },
        }
    }
}

struct Pair {
    source: RouterFacade,
    destination: RouterFacade,
}

impl Pair {
    fn get(&self, side: Side) -> &RouterFacade {
        match side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }
}

impl Provisioner {
    /// Create a tunnel interface on both devices and address it.
    pub async fn create_tunnel(&self, request: &TunnelRequest) -> Envelope<TunnelReport> {
        if let Err(err) = request.validate() {
            return Envelope::from_error(&err);
        }
        let (source, source_reach) = match request.source.resolve(Side::Source.as_str()) {
            Ok(resolved) => resolved,
            Err(err) => return Envelope::from_error(&err),
        };
        let (destination, destination_reach) =
            match request.destination.resolve(Side::Destination.as_str()) {
                Ok(resolved) => resolved,
                Err(err) => return Envelope::from_error(&err),
            };
        if request.tunnel_type == TunnelType::Unknown {
            return Envelope::not_actionable("Selected tunnel type is not valid");
        }

        let mut report = TunnelReport::new(
            request.tunnel_type,
            SideReport {
                endpoint: source.to_string(),
                reachable_address: source_reach,
                ..SideReport::default()
            },
            SideReport {
                endpoint: destination.to_string(),
                reachable_address: destination_reach,
                ..SideReport::default()
            },
        );
        let pair = Pair {
            source: self.facade(source),
            destination: self.facade(destination),
        };

        match self.run_tunnel(&pair, &mut report).await {
            Ok((source_ip, destination_ip)) => {
                report.stage = TunnelStage::Done;
                info!(
                    tunnel_type = %report.tunnel_type,
                    source = %source_ip,
                    destination = %destination_ip,
                    "tunnel provisioned"
                );
                let kind = report.tunnel_type.to_string().to_uppercase();
                Envelope::ok(
                    report,
                    format!(
                        "{kind} tunnel created successfully with this ip:\n\
                         source:{source_ip}\ndestination:{destination_ip}"
                    ),
                )
            }
            Err(stop) => {
                warn!(
                    tunnel_type = %report.tunnel_type,
                    stage = ?report.stage,
                    aborted = ?report.aborted,
                    "tunnel provisioning stopped"
                );
                stop.into_envelope(Some(report))
            }
        }
    }

    async fn run_tunnel(
        &self,
        pair: &Pair,
        report: &mut TunnelReport,
    ) -> Result<(Ipv4Addr, Ipv4Addr), Stop> {
        check_connectivity(pair, report).await?;
        report.stage = TunnelStage::ConnectivityChecked;

        for side in SIDES {
            let identity = match pair.get(side).identity().await {
                Ok(identity) => identity,
                Err(err) => {
                    report.abort("identity", vec![side]);
                    return Err(Stop::context(
                        &err,
                        format!("Failed to retrieve {side} router identity"),
                    ));
                }
            };
            report.side_mut(side).identity = Some(identity);
        }

        let network = self.allocate_network(pair, report).await?;
        let params = self.tunnel_params(pair, report).await?;
        let source_ip = host_in_network(network, 1);
        let destination_ip = host_in_network(network, 2);
        report.network = Some(network);
        report.source.tunnel_address = Some(source_ip);
        report.destination.tunnel_address = Some(destination_ip);
        report.stage = TunnelStage::ResourceAllocated;
        info!(%network, ?params, "allocated tunnel resources");

        create_interfaces(pair, report, params).await?;
        report.stage = TunnelStage::InterfacesCreated;

        for (side, address) in [(Side::Source, source_ip), (Side::Destination, destination_ip)] {
            let interface = report.side(side).interface.clone().unwrap_or_default();
            let outcome = pair
                .get(side)
                .assign_address(&interface, address, TunnelReport::PREFIX)
                .await;
            report.side_mut(side).address_assignment = Some(outcome);
        }
        let action = format!("couldn't assign IP address to {} tunnel on", report.tunnel_type);
        require_both(report, "assign", |s| s.address_assignment.as_ref(), &action)?;
        report.stage = TunnelStage::AddressesAssigned;

        Ok((source_ip, destination_ip))
    }

    /// A network base present on neither device.
    async fn allocate_network(
        &self,
        pair: &Pair,
        report: &mut TunnelReport,
    ) -> Result<Ipv4Addr, Stop> {
        let mut taken = BTreeSet::new();
        for side in SIDES {
            match pair.get(side).list_addresses().await {
                Ok(addresses) => taken.extend(existing_networks(&addresses)),
                Err(err) => {
                    report.abort("networks", vec![side]);
                    return Err(Stop::context(
                        &err,
                        format!("Failed to retrieve {side} router networks"),
                    ));
                }
            }
        }

        let allocated = self
            .allocator()
            .allocate_network(&mut rand::thread_rng(), &taken, None);
        allocated.map_err(|err| {
            report.abort("allocate", SIDES.to_vec());
            Stop::error(&err)
        })
    }

    async fn tunnel_params(
        &self,
        pair: &Pair,
        report: &mut TunnelReport,
    ) -> Result<TunnelParams, Stop> {
        match report.tunnel_type {
            TunnelType::Gre => Ok(TunnelParams::Gre),
            TunnelType::Ipip => Ok(TunnelParams::Ipip),
            TunnelType::Eoip => {
                let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
                let tunnel_id = Allocator::allocate_tunnel_id(&mut rand::thread_rng(), now);
                Ok(TunnelParams::Eoip { tunnel_id })
            }
            TunnelType::Vxlan => {
                let mut used = BTreeSet::new();
                for side in SIDES {
                    match pair.get(side).used_ports().await {
                        Ok(ports) => used.extend(ports),
                        Err(err) => {
                            report.abort("ports", vec![side]);
                            return Err(Stop::context(
                                &err,
                                format!("Failed to retrieve {side} router ports"),
                            ));
                        }
                    }
                }
                let port = self
                    .allocator()
                    .allocate_port(&mut rand::thread_rng(), &used);
                let port = port.map_err(|err| {
                    report.abort("allocate", SIDES.to_vec());
                    Stop::error(&err)
                })?;
                let vni = Allocator::allocate_vni(&mut rand::thread_rng());
                Ok(TunnelParams::Vxlan { vni, port })
            }
            TunnelType::Unknown => Err(Stop::new(
                status::NOT_ACTIONABLE,
                "Selected tunnel type is not valid",
            )),
        }
    }
}

async fn check_connectivity(pair: &Pair, report: &mut TunnelReport) -> Result<(), Stop> {
    let mut unreachable = Vec::new();
    for side in SIDES {
        if let Err(err) = pair.get(side).validate().await {
            warn!(side = side.as_str(), error = %err, "device unreachable");
            unreachable.push(side);
        }
    }
    if unreachable.is_empty() {
        return Ok(());
    }
    let message = format!("Connection to {} failed", describe_sides(&unreachable));
    report.abort("connectivity", unreachable);
    Err(Stop::new(status::GATEWAY_FAILURE, message))
}

/// Each side's interface points at its peer's reachable address and is
/// named after the peer's identity.
async fn create_interfaces(
    pair: &Pair,
    report: &mut TunnelReport,
    params: TunnelParams,
) -> Result<(), Stop> {
    for side in SIDES {
        let peer = report.side(side.peer());
        let name = naming::tunnel_interface(
            report.tunnel_type,
            peer.identity.as_deref().unwrap_or_default(),
        );
        let interface = params.interface(name, &peer.reachable_address);
        let outcome = pair.get(side).create_tunnel_interface(&interface).await;
        let entry = report.side_mut(side);
        entry.interface = Some(interface.name().to_owned());
        entry.creation = Some(outcome);
    }
    let action = format!("couldn't create {} tunnel on", report.tunnel_type);
    require_both(report, "create", |s| s.creation.as_ref(), &action)?;

    if let TunnelParams::Vxlan { port, .. } = params {
        for side in SIDES {
            let remote = report.side(side.peer()).reachable_address.clone();
            let interface = report.side(side).interface.clone().unwrap_or_default();
            let outcome = pair.get(side).add_vtep(&interface, &remote, port).await;
            report.side_mut(side).vtep = Some(outcome);
        }
        require_both(
            report,
            "vtep",
            |s| s.vtep.as_ref(),
            "couldn't add VTEP to vxlan tunnel on",
        )?;
    }
    Ok(())
}

/// 508 naming every side whose `step` outcome is missing or failed.
fn require_both(
    report: &mut TunnelReport,
    step: &str,
    outcome: impl Fn(&SideReport) -> Option<&Outcome>,
    action: &str,
) -> Result<(), Stop> {
    let failed: Vec<Side> = SIDES
        .into_iter()
        .filter(|&side| !outcome(report.side(side)).is_some_and(|o| o.succeeded))
        .collect();
    if failed.is_empty() {
        return Ok(());
    }
    let message = format!("{action} {}", describe_sides(&failed));
    warn!(step, sides = ?failed, "tunnel step failed");
    report.abort(step, failed);
    Err(Stop::new(status::PARTIAL_FAILURE, message))
}
