use routerprov_api::Record;
use routerprov_core::SecretRequest;

use crate::cli::{SecretArgs, SecretCommand};
use crate::error::CliError;
use crate::output::View;

use super::{Ctx, device::records_detail, util};

fn plain(records: &Vec<Record>) -> String {
    records
        .iter()
        .filter_map(|r| r.get("ret").or_else(|| r.id()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle(ctx: &Ctx<'_>, args: SecretArgs) -> Result<(), CliError> {
    match args.command {
        SecretCommand::Create(file) => {
            let request: SecretRequest = util::read_request(&file.file)?;
            let envelope = ctx.provisioner.create_secret(&request).await;
            ctx.emit(
                &envelope,
                &View {
                    detail: &records_detail,
                    plain: &plain,
                },
            )
        }
    }
}
