// ── Core error types ──
//
// Domain errors from routerprov-core. Every variant maps onto one envelope
// status code through `status_code()`; workflows convert errors into
// envelopes at their boundary so callers never see a raw transport fault.
// The `From<routerprov_api::Error>` impl translates transport-layer errors.

use thiserror::Error;

use crate::envelope::status;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to device at {device}: {reason}")]
    ConnectionFailed { device: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Remote call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Remote command errors ────────────────────────────────────────
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("{entity_type} {identifier} not found")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Certificate {certificate} failed at {step}: {reason}")]
    CertificateStep {
        certificate: String,
        step: String,
        status: u16,
        reason: String,
    },

    #[error("Compute API error: {message}")]
    Compute { message: String },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("{message}")]
    ValidationFailed { message: String },

    // ── Allocation errors ────────────────────────────────────────────
    #[error("No free {resource} left after {attempts} attempts")]
    ResourceExhausted { resource: String, attempts: u64 },

    // ── Local collaborators ──────────────────────────────────────────
    #[error("Certificate toolchain failed: {message}")]
    Toolchain { message: String },

    #[error("Certificate storage error: {message}")]
    Storage { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Envelope status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ConnectionFailed { .. }
            | Self::AuthenticationFailed { .. }
            | Self::Timeout { .. }
            | Self::Compute { .. }
            | Self::Toolchain { .. } => status::GATEWAY_FAILURE,
            Self::NotFound { .. } => status::NOT_FOUND,
            Self::ValidationFailed { .. } => status::MISSING_ALTERNATIVE,
            Self::CertificateStep { status, .. } => *status,
            Self::CommandFailed { .. }
            | Self::ResourceExhausted { .. }
            | Self::Storage { .. }
            | Self::Config { .. }
            | Self::Internal(_) => status::COMMAND_FAILED,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Classify a failure to open a session with `device`.
    pub fn connect(device: impl Into<String>, err: routerprov_api::Error) -> Self {
        if err.is_auth_failure() {
            return err.into();
        }
        match err {
            routerprov_api::Error::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            other => Self::ConnectionFailed {
                device: device.into(),
                reason: other.to_string(),
            },
        }
    }

    /// Classify a failure of `command` on an already open session.
    pub fn command(command: &str, err: routerprov_api::Error) -> Self {
        match err {
            routerprov_api::Error::Device {
                message, detail, ..
            } => Self::CommandFailed {
                command: command.to_owned(),
                message: detail.unwrap_or(message),
            },
            routerprov_api::Error::Deserialization { message, .. } => Self::CommandFailed {
                command: command.to_owned(),
                message: format!("unreadable reply: {message}"),
            },
            other => other.into(),
        }
    }

    /// `true` for failures that happened before a device accepted a command.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::AuthenticationFailed { .. } | Self::Timeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<routerprov_api::Error> for CoreError {
    fn from(err: routerprov_api::Error) -> Self {
        match err {
            routerprov_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            routerprov_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        device: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::CommandFailed {
                        command: e.url().map(|u| u.path().to_string()).unwrap_or_default(),
                        message: e.to_string(),
                    }
                }
            }
            routerprov_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            routerprov_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            routerprov_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                device: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            routerprov_api::Error::Device {
                command,
                message,
                detail,
                ..
            } => CoreError::CommandFailed {
                command,
                message: detail.unwrap_or(message),
            },
            routerprov_api::Error::SessionClosed => {
                CoreError::Internal("device session already closed".into())
            }
            routerprov_api::Error::Compute { status, message } => CoreError::Compute {
                message: format!("HTTP {status}: {message}"),
            },
            routerprov_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
