// ── Device command facade ──
//
// Narrow, named operations over one device endpoint. Every operation
// opens a fresh session, issues its command(s), closes the session on
// every exit path, and returns either a typed value (queries) or an
// `Outcome` (mutations). Nothing here holds a session across calls.
//
// The operations live in per-responsibility files as inherent impls:
// `system` (identity, addresses, pools, ports, PPP listings), `tunnel`,
// `certificate`, `file` and `vpn`.

mod certificate;
mod file;
mod system;
mod tunnel;
mod vpn;

use std::sync::Arc;

use routerprov_api::{Command, DeviceConnector, DeviceEndpoint, DeviceSession, Record};
use tracing::{debug, warn};

use crate::error::CoreError;

pub use tunnel::TunnelInterface;

/// Operations against one device.
#[derive(Clone)]
pub struct RouterFacade {
    connector: Arc<dyn DeviceConnector>,
    endpoint: DeviceEndpoint,
}

impl RouterFacade {
    pub fn new(connector: Arc<dyn DeviceConnector>, endpoint: DeviceEndpoint) -> Self {
        Self {
            connector,
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    /// Open a scoped session. Connect failures are classified here, before
    /// any command runs.
    pub(crate) async fn open(&self) -> Result<ScopedSession, CoreError> {
        let device = self.endpoint.to_string();
        let session = self
            .connector
            .connect(&self.endpoint)
            .await
            .map_err(|e| CoreError::connect(device.clone(), e))?;
        Ok(ScopedSession {
            inner: Some(session),
            device,
        })
    }

    /// Open, run one command, close.
    pub(crate) async fn run_once(&self, command: Command) -> Result<Vec<Record>, CoreError> {
        let mut session = self.open().await?;
        let result = session.run(&command).await;
        session.close().await;
        result
    }
}

impl std::fmt::Debug for RouterFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterFacade")
            .field("endpoint", &self.endpoint.to_string())
            .finish_non_exhaustive()
    }
}

// ── Scoped session ───────────────────────────────────────────────────

/// A device session that is closed exactly once.
///
/// Call [`close`](Self::close) on the normal path. If the value is dropped
/// without it (early return, panic unwinding, cancelled future), `Drop`
/// schedules the close on the current runtime.
pub(crate) struct ScopedSession {
    inner: Option<Box<dyn DeviceSession>>,
    device: String,
}

impl ScopedSession {
    pub(crate) async fn run(&mut self, command: &Command) -> Result<Vec<Record>, CoreError> {
        let Some(session) = self.inner.as_mut() else {
            return Err(CoreError::Internal("device session already closed".into()));
        };
        debug!(device = %self.device, command = command.path(), "running device command");
        session
            .run(command)
            .await
            .map_err(|e| CoreError::command(command.path(), e))
    }

    /// Close the session. Close failures are logged, never surfaced: the
    /// operation's own result is what the caller needs.
    pub(crate) async fn close(mut self) {
        if let Some(mut session) = self.inner.take() {
            if let Err(err) = session.close().await {
                warn!(device = %self.device, error = %err, "failed to close device session");
            }
        }
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        let Some(mut session) = self.inner.take() else {
            return;
        };
        let device = std::mem::take(&mut self.device);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = session.close().await {
                        warn!(device = %device, error = %err, "deferred session close failed");
                    }
                });
            }
            Err(_) => warn!(device = %device, "session dropped outside a runtime; not closed"),
        }
    }
}

/// First record's `.id`, or the not-found error for `entity_type name`.
pub(crate) fn require_id(
    records: &[Record],
    entity_type: &str,
    name: &str,
) -> Result<String, CoreError> {
    records
        .first()
        .and_then(Record::id)
        .map(str::to_owned)
        .ok_or_else(|| CoreError::NotFound {
            entity_type: entity_type.into(),
            identifier: name.into(),
        })
}
