// ── Workflow reports ──
//
// Payloads carried in the envelope `data` field. Every report is built
// incrementally while a workflow runs so a failure can hand back the
// state that was reached.

use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use super::request::TunnelType;
use crate::certificate::TriadReport;
use crate::envelope::Outcome;

// ── Tunnel ──────────────────────────────────────────────────────────

/// Which device of a tunnel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Destination,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
        }
    }

    /// The other device of the pair.
    pub fn peer(self) -> Self {
        match self {
            Self::Source => Self::Destination,
            Self::Destination => Self::Source,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "source router", "destination router" or "source and destination routers".
pub fn describe_sides(sides: &[Side]) -> &'static str {
    match sides {
        [Side::Source] => "source router",
        [Side::Destination] => "destination router",
        _ => "source and destination routers",
    }
}

/// Tunnel workflow progress. Ordered: a later stage implies every earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TunnelStage {
    Validating,
    ConnectivityChecked,
    ResourceAllocated,
    InterfacesCreated,
    AddressesAssigned,
    Done,
}

/// Step and side(s) at fault when a workflow stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Abort {
    pub step: String,
    pub sides: Vec<Side>,
}

/// What happened on one device of the pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideReport {
    /// `address:port` of the management endpoint.
    pub endpoint: String,
    /// Address the peer uses as its remote address.
    pub reachable_address: String,
    pub identity: Option<String>,
    pub interface: Option<String>,
    pub tunnel_address: Option<Ipv4Addr>,
    pub creation: Option<Outcome>,
    /// VXLAN only.
    pub vtep: Option<Outcome>,
    pub address_assignment: Option<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelReport {
    pub tunnel_type: TunnelType,
    pub network: Option<Ipv4Addr>,
    pub prefix: u8,
    pub stage: TunnelStage,
    pub source: SideReport,
    pub destination: SideReport,
    pub aborted: Option<Abort>,
}

impl TunnelReport {
    pub const PREFIX: u8 = 24;

    pub fn new(tunnel_type: TunnelType, source: SideReport, destination: SideReport) -> Self {
        Self {
            tunnel_type,
            network: None,
            prefix: Self::PREFIX,
            stage: TunnelStage::Validating,
            source,
            destination,
            aborted: None,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideReport {
        match side {
            Side::Source => &mut self.source,
            Side::Destination => &mut self.destination,
        }
    }

    pub fn side(&self, side: Side) -> &SideReport {
        match side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }

    pub fn abort(&mut self, step: impl Into<String>, sides: Vec<Side>) {
        self.aborted = Some(Abort {
            step: step.into(),
            sides,
        });
    }
}

// ── VPN ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VpnStage {
    Resolved,
    Inspected,
    PoolReady,
    ProfileReady,
    CertificatesReady,
    PortAllocated,
    ServerConfigured,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    pub name: String,
    pub ranges: String,
    /// `false` when the pool already existed.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnReport {
    pub endpoint: String,
    pub stage: VpnStage,
    pub identity: Option<String>,
    pub pool: Option<PoolSummary>,
    pub profile: Option<String>,
    pub certificates: Option<TriadReport>,
    pub port: Option<u16>,
    pub server: Option<Outcome>,
    /// OpenVPN client configuration bundle.
    pub client_config: Option<String>,
    /// Passphrase of the bundled client key, when it was exported encrypted.
    pub key_passphrase: Option<String>,
    pub aborted: Option<Abort>,
}

impl VpnReport {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            stage: VpnStage::Resolved,
            identity: None,
            pool: None,
            profile: None,
            certificates: None,
            port: None,
            server: None,
            client_config: None,
            key_passphrase: None,
            aborted: None,
        }
    }
}

// ── Compute batch ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineOutcome {
    pub name: String,
    pub status: MachineStatus,
    pub vm_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub machines: Vec<MachineOutcome>,
}

impl BatchReport {
    pub fn from_outcomes(machines: Vec<MachineOutcome>) -> Self {
        let succeeded = machines
            .iter()
            .filter(|m| m.status == MachineStatus::Success)
            .count();
        Self {
            succeeded,
            failed: machines.len() - succeeded,
            machines,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} machine(s) created successfully. {} machine(s) failed.",
            self.succeeded, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_descriptions() {
        assert_eq!(describe_sides(&[Side::Source]), "source router");
        assert_eq!(describe_sides(&[Side::Destination]), "destination router");
        assert_eq!(
            describe_sides(&[Side::Source, Side::Destination]),
            "source and destination routers"
        );
    }

    #[test]
    fn stages_are_ordered() {
        assert!(TunnelStage::Validating < TunnelStage::InterfacesCreated);
        assert!(VpnStage::PoolReady < VpnStage::Done);
    }

    #[test]
    fn batch_counts_and_summary() {
        let ok = |name: &str| MachineOutcome {
            name: name.into(),
            status: MachineStatus::Success,
            vm_id: Some("vm-1".into()),
            error: None,
        };
        let bad = MachineOutcome {
            name: "web-3".into(),
            status: MachineStatus::Failure,
            vm_id: None,
            error: Some("HTTP 500".into()),
        };
        let report = BatchReport::from_outcomes(vec![ok("web-1"), ok("web-2"), bad]);

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(
            report.summary(),
            "2 machine(s) created successfully. 1 machine(s) failed."
        );
    }
}
