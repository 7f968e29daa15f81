//! vCenter command handlers.

use tabled::Tabled;

use routerprov_api::ClusterSummary;
use routerprov_core::{BatchReport, ComputeAuth, MachineRequest, MachineStatus};

use crate::cli::{ComputeArgs, ComputeCommand};
use crate::error::CliError;
use crate::output::{self, View};

use super::{Ctx, util};

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "HA")]
    ha: String,
    #[tabled(rename = "DRS")]
    drs: String,
}

#[derive(Tabled)]
struct MachineRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "VM")]
    vm: String,
    #[tabled(rename = "Error")]
    error: String,
}

fn flag(value: Option<bool>) -> String {
    value.map_or_else(|| "-".into(), util::yes_no)
}

fn clusters_detail(clusters: &Vec<ClusterSummary>) -> String {
    let rows: Vec<ClusterRow> = clusters
        .iter()
        .map(|c| ClusterRow {
            id: c.cluster.clone(),
            name: c.name.clone(),
            ha: flag(c.ha_enabled),
            drs: flag(c.drs_enabled),
        })
        .collect();
    output::render_table(&rows)
}

fn clusters_plain(clusters: &Vec<ClusterSummary>) -> String {
    clusters
        .iter()
        .map(|c| c.cluster.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn batch_detail(report: &BatchReport) -> String {
    let rows: Vec<MachineRow> = report
        .machines
        .iter()
        .map(|m| MachineRow {
            name: m.name.clone(),
            status: match m.status {
                MachineStatus::Success => "created".into(),
                MachineStatus::Failure => "failed".into(),
            },
            vm: m.vm_id.clone().unwrap_or_default(),
            error: m.error.clone().unwrap_or_default(),
        })
        .collect();
    output::render_table(&rows)
}

/// Created VM ids, one per line.
fn batch_plain(report: &BatchReport) -> String {
    report
        .machines
        .iter()
        .filter_map(|m| m.vm_id.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle(ctx: &Ctx<'_>, args: ComputeArgs) -> Result<(), CliError> {
    match args.command {
        ComputeCommand::Clusters {
            address,
            port,
            username,
            password,
        } => {
            let password = util::password(password, &format!("Password for {username}@{address}"))?;
            let auth = ComputeAuth {
                address,
                port,
                username,
                password,
            };
            ctx.emit(
                &ctx.provisioner.list_clusters(&auth).await,
                &View {
                    detail: &clusters_detail,
                    plain: &clusters_plain,
                },
            )
        }

        ComputeCommand::Create(file) => {
            let request: MachineRequest = util::read_request(&file.file)?;
            let bar = util::spinner(
                ctx.global,
                &format!("creating {} machine(s)", request.copy),
            );
            let envelope = ctx.provisioner.create_machines(&request).await;
            util::finish(bar);
            ctx.emit(
                &envelope,
                &View {
                    detail: &batch_detail,
                    plain: &batch_plain,
                },
            )
        }
    }
}
