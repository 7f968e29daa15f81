// ── Domain model ──
//
// Request shapes, typed device entities and workflow reports. Nothing in
// here is persisted; every value lives for one provisioning call.

pub mod device;
pub mod report;
pub mod request;

pub use device::{
    AddressEntry, CertificateEntry, PoolEntry, PppProfile, PppSecret, existing_networks,
    parse_port_list,
};
pub use report::{
    Abort, BatchReport, MachineOutcome, MachineStatus, PoolSummary, Side, SideReport,
    TunnelReport, TunnelStage, VpnReport, VpnStage, describe_sides,
};
pub use request::{
    AddressSpec, ComputeAuth, Credential, DeviceRequest, MachineRequest, PingRequest,
    ReachableAddress, SecretRequest, TunnelEndpoint, TunnelRequest, TunnelType, VpnRequest, VpnType,
};
