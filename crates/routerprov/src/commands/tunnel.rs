//! Tunnel command handlers.

use tabled::Tabled;

use routerprov_core::{Outcome, TunnelReport, TunnelRequest};

use crate::cli::{TunnelArgs, TunnelCommand};
use crate::error::CliError;
use crate::output::{self, View};

use super::{Ctx, util};

#[derive(Tabled)]
struct SideRow {
    #[tabled(rename = "Side")]
    side: &'static str,
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "Interface")]
    interface: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Assigned")]
    assigned: String,
}

fn step(outcome: Option<&Outcome>) -> String {
    outcome.map_or_else(|| "-".into(), |o| util::yes_no(o.succeeded))
}

fn detail(report: &TunnelReport) -> String {
    let rows: Vec<SideRow> = [
        ("source", &report.source),
        ("destination", &report.destination),
    ]
    .into_iter()
    .map(|(side, s)| SideRow {
        side,
        router: s.identity.clone().unwrap_or_else(|| s.endpoint.clone()),
        interface: s.interface.clone().unwrap_or_else(|| "-".into()),
        address: s
            .tunnel_address
            .map_or_else(|| "-".into(), |a| format!("{a}/{}", report.prefix)),
        created: step(s.creation.as_ref()),
        assigned: step(s.address_assignment.as_ref()),
    })
    .collect();

    let mut out = output::kv_lines(&[
        ("type", report.tunnel_type.to_string()),
        ("network", util::opt_display(report.network.as_ref())),
        ("stage", format!("{:?}", report.stage)),
    ]);
    out.push('\n');
    out.push_str(&output::render_table(&rows));
    out
}

fn plain(report: &TunnelReport) -> String {
    [&report.source, &report.destination]
        .iter()
        .map(|s| util::opt_display(s.tunnel_address.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle(ctx: &Ctx<'_>, args: TunnelArgs) -> Result<(), CliError> {
    match args.command {
        TunnelCommand::Create(file) => {
            let request: TunnelRequest = util::read_request(&file.file)?;
            let bar = util::spinner(ctx.global, "creating tunnel");
            let envelope = ctx.provisioner.create_tunnel(&request).await;
            util::finish(bar);
            ctx.emit(
                &envelope,
                &View {
                    detail: &detail,
                    plain: &plain,
                },
            )
        }
    }
}
