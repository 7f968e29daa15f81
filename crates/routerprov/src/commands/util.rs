//! Shared helpers for command handlers.

use std::io::{IsTerminal, Read};
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use serde::de::DeserializeOwned;

use routerprov_core::DeviceRequest;

use crate::cli::{EndpointArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Read a request body from `path`, or stdin for `-`.
pub fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "file".into(),
        reason: format!("invalid request: {e}"),
    })
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// The given password, or an interactive prompt for one.
pub fn password(given: Option<String>, prompt: &str) -> Result<SecretString, CliError> {
    if let Some(password) = given {
        return Ok(SecretString::from(password));
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "no password given and stdin is not a terminal".into(),
        });
    }
    let entered = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(prompt_err)?;
    Ok(SecretString::from(entered))
}

pub fn device_request(endpoint: EndpointArgs) -> Result<DeviceRequest, CliError> {
    let password = password(
        endpoint.password,
        &format!("Password for {}@{}", endpoint.username, endpoint.address),
    )?;
    Ok(DeviceRequest {
        address: endpoint.address,
        port: endpoint.port,
        username: endpoint.username,
        password,
    })
}

/// Spinner on stderr while a workflow runs, for interactive table output.
pub fn spinner(global: &GlobalOpts, message: &str) -> Option<ProgressBar> {
    let interactive = matches!(global.output, OutputFormat::Table)
        && !global.quiet
        && std::io::stderr().is_terminal();
    if !interactive {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    Some(bar)
}

pub fn finish(bar: Option<ProgressBar>) {
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

pub fn yes_no(value: bool) -> String {
    let word = if value { "yes" } else { "no" };
    word.into()
}

pub fn opt_display<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "-".into(), ToString::to_string)
}
