use thiserror::Error;

/// Top-level error type for the `routerprov-api` crate.
///
/// Covers every failure mode of the two remote surfaces: RouterOS device
/// sessions and the vCenter compute API. `routerprov-core` maps these into
/// envelope statuses.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected by the device or the compute API.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Device ──────────────────────────────────────────────────────
    /// A command reached the device but was rejected.
    ///
    /// RouterOS reports these as `{"error": 400, "message": "...", "detail": "..."}`.
    #[error("Device rejected command '{command}' (HTTP {status}): {message}")]
    Device {
        command: String,
        status: u16,
        message: String,
        detail: Option<String>,
    },

    /// The session was already closed when a command was issued.
    #[error("Device session already closed")]
    SessionClosed,

    // ── Compute ─────────────────────────────────────────────────────
    /// Structured error from the vCenter REST API.
    #[error("Compute API error (HTTP {status}): {message}")]
    Compute { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the remote side rejected the credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the failure happened before any command reached
    /// the remote side (refused, unreachable, timed out, TLS).
    pub fn is_connect_failure(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Timeout { .. } | Self::Tls(_) | Self::InvalidUrl(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Device { status: 404, .. } | Self::Compute { status: 404, .. } => true,
            _ => false,
        }
    }
}
