// vCenter REST payload types
//
// Field names follow the `/rest/vcenter/...` JSON wire format.

use serde::{Deserialize, Serialize};

/// `{ "value": ... }` wrapper used by every `/rest` response.
#[derive(Debug, Deserialize)]
pub(crate) struct ValueEnvelope<T> {
    pub value: T,
}

/// Entry of `GET /rest/vcenter/cluster`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster: String,
    pub name: String,
    #[serde(default)]
    pub ha_enabled: Option<bool>,
    #[serde(default)]
    pub drs_enabled: Option<bool>,
}

/// Body of `POST /rest/vcenter/vm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSpec {
    pub name: String,
    #[serde(rename = "guest_OS")]
    pub guest_os: String,
    pub placement: Placement,
    pub hardware: Hardware,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub cluster: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hardware {
    pub version: String,
    pub cpu: Cpu,
    pub memory: Memory,
    pub disks: Vec<Disk>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(rename = "size_MiB")]
    pub size_mib: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    pub new_vmdk: NewVmdk,
}

/// New virtual disk; `capacity` is in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVmdk {
    pub capacity: u64,
}
