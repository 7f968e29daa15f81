// routerprov-api: Async clients for RouterOS device sessions and vCenter.

pub mod error;
pub mod routeros;
pub mod session;
pub mod transport;
pub mod vcenter;

pub use error::Error;
pub use routeros::{RestConnector, RestSession, Scheme};
pub use session::{Command, DeviceConnector, DeviceEndpoint, DeviceSession, Record};
pub use transport::{TlsMode, TransportConfig};
pub use vcenter::{ClusterSummary, ComputeClient, ComputeSession, VmSpec};
