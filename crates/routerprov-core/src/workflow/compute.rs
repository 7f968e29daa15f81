// Compute API workflows: cluster listing and batch VM creation.

use routerprov_api::vcenter::{Cpu, Disk, Hardware, Memory, NewVmdk, Placement};
use routerprov_api::{ClusterSummary, ComputeClient, ComputeSession, VmSpec};
use tracing::{info, warn};

use super::Stop;
use crate::envelope::{Envelope, status};
use crate::model::{BatchReport, ComputeAuth, MachineOutcome, MachineRequest, MachineStatus};
use crate::provisioner::Provisioner;

const BYTES_PER_GIB: u64 = 1024 * 1024 * 1024;

impl Provisioner {
    pub async fn list_clusters(&self, auth: &ComputeAuth) -> Envelope<Vec<ClusterSummary>> {
        if let Err(err) = auth.validate() {
            return Envelope::from_error(&err);
        }
        let (client, session) = match self.compute_login(auth).await {
            Ok(login) => login,
            Err(stop) => return stop.into_envelope(None),
        };
        match client.list_clusters(&session).await {
            Ok(clusters) => Envelope::ok(clusters, "Clusters retrieved successfully"),
            Err(err) => {
                warn!(error = %err, "cluster listing failed");
                Envelope::failure(
                    status::GATEWAY_FAILURE,
                    format!("Failed to retrieve clusters: {err}"),
                )
            }
        }
    }

    /// Create `request.copy` machines one after another. A failed copy is
    /// recorded and the batch continues; 207 unless every copy succeeded.
    pub async fn create_machines(&self, request: &MachineRequest) -> Envelope<BatchReport> {
        if let Err(err) = request.validate() {
            return Envelope::from_error(&err);
        }
        let (client, session) = match self.compute_login(&request.auth).await {
            Ok(login) => login,
            Err(stop) => return stop.into_envelope(None),
        };

        let mut machines = Vec::new();
        for index in 1..=request.copy {
            let spec = vm_spec(request, index);
            let outcome = match client.create_vm(&session, &spec).await {
                Ok(vm_id) => {
                    info!(vm = %spec.name, %vm_id, "machine created");
                    MachineOutcome {
                        name: spec.name,
                        status: MachineStatus::Success,
                        vm_id: Some(vm_id),
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(vm = %spec.name, error = %err, "machine creation failed");
                    MachineOutcome {
                        name: spec.name,
                        status: MachineStatus::Failure,
                        vm_id: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            machines.push(outcome);
        }

        let report = BatchReport::from_outcomes(machines);
        let status = if report.failed == 0 {
            status::OK
        } else {
            status::MULTI_STATUS
        };
        let message = report.summary();
        Envelope::new(status, Some(report), message)
    }

    /// Authenticate once for a whole operation.
    async fn compute_login(
        &self,
        auth: &ComputeAuth,
    ) -> Result<(ComputeClient, ComputeSession), Stop> {
        let client = self.compute_client(auth)?;
        match client.authenticate(&auth.username, &auth.password).await {
            Ok(session) => Ok((client, session)),
            Err(err) => {
                warn!(base_url = %client.base_url(), error = %err, "compute login failed");
                Err(Stop::new(
                    status::GATEWAY_FAILURE,
                    format!("Failed to authenticate with compute API: {err}"),
                ))
            }
        }
    }
}

fn vm_spec(request: &MachineRequest, index: u32) -> VmSpec {
    VmSpec {
        name: format!("{}-{index}", request.name),
        guest_os: request.os.clone(),
        placement: Placement {
            cluster: request.cluster_id.clone(),
        },
        hardware: Hardware {
            version: request.vmx_version.clone(),
            cpu: Cpu { count: request.cpu },
            memory: Memory {
                size_mib: request.ram,
            },
            disks: vec![Disk {
                new_vmdk: NewVmdk {
                    capacity: request.storage.saturating_mul(BYTES_PER_GIB),
                },
            }],
        },
    }
}
