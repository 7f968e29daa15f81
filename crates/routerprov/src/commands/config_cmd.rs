//! Config command handlers. These never reach a device.

use owo_colors::OwoColorize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(routerprov_config::config_path);

    match args.command {
        ConfigCommand::Show => {
            let cfg = routerprov_config::load_config(global.config.as_deref())?;
            // Validate as the workflows would, so a bad file surfaces here
            cfg.to_provisioning_config()?;
            let rendered = match global.output {
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::JsonCompact => serde_json::to_string(&cfg)?,
                OutputFormat::Yaml => output::render_yaml(&cfg)?,
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }

        ConfigCommand::Init { force } => {
            routerprov_config::init_config(&path, force)?;
            if !global.quiet {
                let color = output::should_color(&global.color);
                let line = format!("Wrote default configuration to {}", path.display());
                if color {
                    eprintln!("{}", line.green());
                } else {
                    eprintln!("{line}");
                }
            }
            Ok(())
        }
    }
}
