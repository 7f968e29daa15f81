//! Provisioning orchestrator between `routerprov-api` and the CLI / HTTP
//! surfaces.
//!
//! This crate owns the business logic of the workspace:
//!
//! - **[`Provisioner`]**: Entry point for every workflow. Tunnel creation
//!   across two devices ([`create_tunnel`](Provisioner::create_tunnel)),
//!   OpenVPN bootstrap on one device ([`create_vpn`](Provisioner::create_vpn)),
//!   batch VM creation against the compute API
//!   ([`create_machines`](Provisioner::create_machines)) and the
//!   single-device queries. Every operation answers an [`Envelope`].
//!
//! - **[`RouterFacade`]**: Named device operations over one endpoint. Each
//!   call opens a fresh session and closes it on every exit path.
//!
//! - **[`Allocator`]**: Collision-avoiding choice of networks, ports, EoIP
//!   tunnel ids and VXLAN VNIs against live device state. Bounded.
//!
//! - **[`certificate`]**: CA / server / client triad lifecycle with two
//!   interchangeable strategies, local toolchain and on-device.
//!
//! - **Domain model** ([`model`]): Request shapes, typed device entries and
//!   the incremental workflow reports.

pub mod allocator;
pub mod certificate;
pub mod config;
pub mod envelope;
pub mod error;
pub mod facade;
pub mod model;
pub mod naming;
pub mod ovpn;
pub mod provisioner;
mod workflow;

// ── Primary re-exports ──────────────────────────────────────────────
pub use allocator::{AddressClass, Allocator};
pub use certificate::{
    CaToolchain, CertificateManager, CertificateStorage, CertificateStrategy, CertificateTriad,
    LocalToolchainStrategy, OnDeviceStrategy, OpensslToolchain, TriadReport,
};
pub use config::{
    CertificateSettings, ComputeSettings, DeviceSettings, ProvisioningConfig, StrategyKind,
    TlsVerification, TriadNames,
};
pub use envelope::{Envelope, Outcome, status};
pub use error::CoreError;
pub use facade::{RouterFacade, TunnelInterface};
pub use ovpn::ClientMaterial;
pub use provisioner::Provisioner;

pub use model::{
    // Requests
    AddressSpec,
    ComputeAuth,
    Credential,
    DeviceRequest,
    MachineRequest,
    PingRequest,
    ReachableAddress,
    SecretRequest,
    TunnelEndpoint,
    TunnelRequest,
    TunnelType,
    VpnRequest,
    VpnType,
    // Device entries
    AddressEntry,
    CertificateEntry,
    PoolEntry,
    PppProfile,
    PppSecret,
    // Reports
    BatchReport,
    MachineOutcome,
    MachineStatus,
    Side,
    TunnelReport,
    TunnelStage,
    VpnReport,
    VpnStage,
};
