//! Command dispatch: bridges CLI args -> provisioner workflows -> output.

pub mod compute;
pub mod config_cmd;
pub mod device;
pub mod secret;
pub mod tunnel;
pub mod util;
pub mod vpn;

use serde::Serialize;

use routerprov_config::Config;
use routerprov_core::{Envelope, Provisioner};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, View};
use crate::server;

/// What every handler needs.
pub struct Ctx<'a> {
    pub provisioner: &'a Provisioner,
    pub global: &'a GlobalOpts,
    color: bool,
}

impl Ctx<'_> {
    /// Print `envelope`; non-accepted statuses become the command's error.
    pub fn emit<T: Serialize>(
        &self,
        envelope: &Envelope<T>,
        view: &View<'_, T>,
    ) -> Result<(), CliError> {
        output::emit(
            &self.global.output,
            self.color,
            self.global.quiet,
            envelope,
            view,
        )
    }
}

/// Dispatch a provisioner-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    provisioner: &Provisioner,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let ctx = Ctx {
        provisioner,
        global,
        color: output::should_color(&global.color),
    };
    match cmd {
        Command::Tunnel(args) => tunnel::handle(&ctx, args).await,
        Command::Vpn(args) => vpn::handle(&ctx, args).await,
        Command::Secret(args) => secret::handle(&ctx, args).await,
        Command::Device(args) => device::handle(&ctx, args).await,
        Command::Compute(args) => compute::handle(&ctx, args).await,
        Command::Serve(args) => {
            let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
            server::serve(provisioner.clone(), &bind).await
        }
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
