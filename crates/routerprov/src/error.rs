//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `ConfigError` and failing envelopes into user-facing
//! errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use routerprov_config::ConfigError;
use routerprov_core::{CoreError, status};

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {device}")]
    #[diagnostic(
        code(routerprov::connection_failed),
        help(
            "Check that the device is reachable and its REST service is enabled.\n\
             Reason: {reason}\n\
             Try: routerprov device validate --address <addr>"
        )
    )]
    ConnectionFailed { device: String, reason: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(routerprov::auth_failed),
        help("Verify the username and password for this device or vCenter.")
    )]
    AuthFailed { message: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(routerprov::timeout),
        help("Raise device.timeout_secs in the config file or check device responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Workflow ─────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(routerprov::workflow), help("Operation answered status {status}."))]
    Workflow { status: u16, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(routerprov::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(routerprov::config),
        help("Inspect the effective configuration with: routerprov config show")
    )]
    Config(#[from] ConfigError),

    // ── Server ───────────────────────────────────────────────────────
    #[error("Could not listen on {bind}")]
    #[diagnostic(code(routerprov::bind), help("Choose another address with --bind."))]
    Bind {
        bind: String,
        #[source]
        source: std::io::Error,
    },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(routerprov::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("failed to render TOML: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Config(_) | Self::Json(_) => exit_code::USAGE,
            Self::Workflow { status, .. } => status_exit_code(*status),
            _ => exit_code::GENERAL,
        }
    }
}

/// Exit code for an envelope status. 200, 204 and 207 exit cleanly.
pub fn status_exit_code(code: u16) -> i32 {
    match code {
        status::OK | status::NOT_ACTIONABLE | status::MULTI_STATUS => exit_code::SUCCESS,
        status::MISSING_ALTERNATIVE => exit_code::USAGE,
        status::NOT_FOUND => exit_code::NOT_FOUND,
        status::GATEWAY_FAILURE => exit_code::CONNECTION,
        status::PARTIAL_FAILURE => exit_code::PARTIAL,
        _ => exit_code::GENERAL,
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { device, reason } => {
                CliError::ConnectionFailed { device, reason }
            }
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            other => CliError::Workflow {
                status: other.status_code(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_statuses_exit_cleanly() {
        for code in [200, 204, 207] {
            assert_eq!(status_exit_code(code), exit_code::SUCCESS);
        }
        assert_eq!(status_exit_code(406), exit_code::USAGE);
        assert_eq!(status_exit_code(504), exit_code::CONNECTION);
        assert_eq!(status_exit_code(508), exit_code::PARTIAL);
        assert_eq!(status_exit_code(500), exit_code::GENERAL);
    }

    #[test]
    fn core_errors_keep_their_status() {
        let err = CliError::from(CoreError::NotFound {
            entity_type: "Certificate".into(),
            identifier: "CA".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }
}
