//! VPN command handlers.

use routerprov_core::{VpnReport, VpnRequest};

use crate::cli::{VpnArgs, VpnCommand};
use crate::error::CliError;
use crate::output::{self, View};

use super::{Ctx, util};

fn detail(report: &VpnReport) -> String {
    let mut out = output::kv_lines(&[
        (
            "router",
            report
                .identity
                .clone()
                .unwrap_or_else(|| report.endpoint.clone()),
        ),
        ("stage", format!("{:?}", report.stage)),
        (
            "pool",
            report
                .pool
                .as_ref()
                .map(|p| format!("{} ({})", p.name, p.ranges))
                .unwrap_or_default(),
        ),
        ("profile", report.profile.clone().unwrap_or_default()),
        ("port", util::opt_display(report.port.as_ref())),
        (
            "certificates",
            report
                .certificates
                .as_ref()
                .map(|c| c.strategy.to_string())
                .unwrap_or_default(),
        ),
        (
            "key passphrase",
            report.key_passphrase.clone().unwrap_or_default(),
        ),
    ]);
    if let Some(config) = &report.client_config {
        out.push_str("\n\n");
        out.push_str(config);
    }
    out
}

/// The client configuration alone, ready to redirect into a `.ovpn` file.
fn plain(report: &VpnReport) -> String {
    report.client_config.clone().unwrap_or_default()
}

pub async fn handle(ctx: &Ctx<'_>, args: VpnArgs) -> Result<(), CliError> {
    match args.command {
        VpnCommand::Create(file) => {
            let request: VpnRequest = util::read_request(&file.file)?;
            let bar = util::spinner(ctx.global, "provisioning VPN server");
            let envelope = ctx.provisioner.create_vpn(&request).await;
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
