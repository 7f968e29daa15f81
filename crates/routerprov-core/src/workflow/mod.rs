// ── Provisioning workflows ──
//
// Each workflow is an inherent `impl Provisioner` block. Steps run strictly
// in order against live device state, and every public operation answers
// an `Envelope`: no error leaves this module as a `Result`.

mod compute;
mod device;
mod tunnel;
mod vpn;

use crate::envelope::{Envelope, Outcome};
use crate::error::CoreError;

/// Why a workflow stopped: the envelope status and message to answer with.
#[derive(Debug)]
pub(crate) struct Stop {
    status: u16,
    message: String,
}

impl Stop {
    pub(crate) fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Stop with `err`'s own status and message.
    pub(crate) fn error(err: &CoreError) -> Self {
        Self::new(err.status_code(), err.to_string())
    }

    /// Stop with `err`'s status and a step-naming message.
    pub(crate) fn context(err: &CoreError, message: impl Into<String>) -> Self {
        Self::new(err.status_code(), message)
    }

    /// `Ok` for a successful outcome, otherwise its status and message.
    pub(crate) fn check(outcome: &Outcome) -> Result<(), Self> {
        if outcome.succeeded {
            Ok(())
        } else {
            Err(Self::new(outcome.status_code, outcome.message.clone()))
        }
    }

    pub(crate) fn into_envelope<T>(self, data: Option<T>) -> Envelope<T> {
        Envelope::new(self.status, data, self.message)
    }
}

impl From<CoreError> for Stop {
    fn from(err: CoreError) -> Self {
        Self::error(&err)
    }
}
