//! Output formatting: table, JSON, YAML, plain.
//!
//! Structured formats serialize the whole envelope. Table prints a status
//! line followed by the handler's view of the payload; plain prints the
//! handler's identifiers, or the message when there is no payload.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use routerprov_core::Envelope;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::{CliError, status_exit_code};

pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// How one command presents its payload in the human formats.
pub struct View<'a, T> {
    /// Multi-line detail for `table`.
    pub detail: &'a dyn Fn(&T) -> String,
    /// One value per line for `plain`.
    pub plain: &'a dyn Fn(&T) -> String,
}

// ── Render dispatchers ───────────────────────────────────────────────

pub fn render_envelope<T: Serialize>(
    format: &OutputFormat,
    color: bool,
    envelope: &Envelope<T>,
    view: &View<'_, T>,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(envelope)?,
        OutputFormat::JsonCompact => serde_json::to_string(envelope)?,
        OutputFormat::Yaml => render_yaml(envelope)?,
        OutputFormat::Plain => envelope
            .data
            .as_ref()
            .map_or_else(|| envelope.message.clone(), view.plain),
        OutputFormat::Table => {
            let mut out = status_line(envelope.status, &envelope.message, color);
            if let Some(data) = &envelope.data {
                let detail = (view.detail)(data);
                if !detail.is_empty() {
                    out.push('\n');
                    out.push_str(&detail);
                }
            }
            out
        }
    })
}

/// Print the envelope, then turn a failing status into an error so the
/// process exits non-zero.
pub fn emit<T: Serialize>(
    format: &OutputFormat,
    color: bool,
    quiet: bool,
    envelope: &Envelope<T>,
    view: &View<'_, T>,
) -> Result<(), CliError> {
    print_output(&render_envelope(format, color, envelope, view)?, quiet);
    if status_exit_code(envelope.status) == 0 {
        Ok(())
    } else {
        Err(CliError::Workflow {
            status: envelope.status,
            message: envelope.message.clone(),
        })
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Validation {
        field: "output".into(),
        reason: format!("YAML rendering failed: {e}"),
    })
}

fn status_line(status: u16, message: &str, color: bool) -> String {
    let code = status.to_string();
    if !color {
        return format!("[{code}] {message}");
    }
    match status {
        200..=299 => format!("[{}] {message}", code.green()),
        400..=499 => format!("[{}] {message}", code.yellow()),
        _ => format!("[{}] {message}", code.red()),
    }
}

/// `key: value` lines, skipping empty values.
pub fn kv_lines(pairs: &[(&str, String)]) -> String {
    let shown: Vec<_> = pairs.iter().filter(|(_, v)| !v.is_empty()).collect();
    let width = shown.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    shown
        .iter()
        .map(|(k, v)| format!("{k:<width$}  {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}
