// vCenter compute management API.

pub mod client;
pub mod models;

pub use client::{ComputeClient, ComputeSession};
pub use models::{ClusterSummary, Cpu, Disk, Hardware, Memory, NewVmdk, Placement, VmSpec};
