// ── Uniform result envelope ──
//
// Every public operation answers `{ data, status, message }` with an
// HTTP-style status code. Mutating façade calls answer an `Outcome`.

use routerprov_api::Record;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Envelope status codes.
pub mod status {
    /// Success.
    pub const OK: u16 = 200;
    /// Recognized but not actionable (unknown subtype, feature stub).
    pub const NOT_ACTIONABLE: u16 = 204;
    /// Batch with at least one failed item.
    pub const MULTI_STATUS: u16 = 207;
    /// Referenced entity (certificate) not found on the device.
    pub const NOT_FOUND: u16 = 404;
    /// Required alternative input missing.
    pub const MISSING_ALTERNATIVE: u16 = 406;
    /// Remote command failed after the session was established.
    pub const COMMAND_FAILED: u16 = 500;
    /// Connectivity or authentication failure.
    pub const GATEWAY_FAILURE: u16 = 504;
    /// Multi-step operation failed on one or both of two devices.
    pub const PARTIAL_FAILURE: u16 = 508;
}

/// `{ data: payload | null, status, message }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub status: u16,
    pub message: String,
}

impl<T> Envelope<T> {
    pub fn new(status: u16, data: Option<T>, message: impl Into<String>) -> Self {
        Self {
            data,
            status,
            message: message.into(),
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(status::OK, Some(data), message)
    }

    /// Failure without payload.
    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, None, message)
    }

    /// 204: the request named something this system recognizes but does not act on.
    pub fn not_actionable(message: impl Into<String>) -> Self {
        Self::new(status::NOT_ACTIONABLE, None, message)
    }

    pub fn from_error(err: &CoreError) -> Self {
        Self::failure(err.status_code(), err.to_string())
    }

    /// `true` for 2xx statuses. A 204 is success-shaped but did nothing.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            data: self.data.map(f),
            status: self.status,
            message: self.message,
        }
    }
}

impl<T> From<Result<T, CoreError>> for Envelope<T> {
    fn from(result: Result<T, CoreError>) -> Self {
        match result {
            Ok(data) => Self::ok(data, ""),
            Err(err) => Self::from_error(&err),
        }
    }
}

// ── Outcome ──────────────────────────────────────────────────────────

/// Result of one mutating device operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub succeeded: bool,
    pub status_code: u16,
    pub message: String,
    pub raw_payload: Vec<Record>,
}

impl Outcome {
    pub fn success(raw_payload: Vec<Record>) -> Self {
        Self {
            succeeded: true,
            status_code: status::OK,
            message: "ran successfully".into(),
            raw_payload,
        }
    }

    pub fn failed(err: &CoreError) -> Self {
        Self {
            succeeded: false,
            status_code: err.status_code(),
            message: err.to_string(),
            raw_payload: Vec::new(),
        }
    }
}

impl From<Result<Vec<Record>, CoreError>> for Outcome {
    fn from(result: Result<Vec<Record>, CoreError>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(err) => Self::failed(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_actionable_serializes_null_data() {
        let envelope: Envelope<()> = Envelope::not_actionable("Selected tunnel type is not valid");
        insta::assert_json_snapshot!(envelope, @r#"
        {
          "data": null,
          "status": 204,
          "message": "Selected tunnel type is not valid"
        }
        "#);
    }

    #[test]
    fn error_envelopes_take_the_error_status() {
        let err = CoreError::validation("You should provide one of local or public IP for source");
        let envelope: Envelope<()> = Envelope::from_error(&err);
        assert_eq!(envelope.status, 406);
        assert!(!envelope.is_success());
        assert_eq!(
            envelope.message,
            "You should provide one of local or public IP for source"
        );
    }

    #[test]
    fn outcome_keeps_payload_and_status() {
        let ok = Outcome::from(Ok(vec![Record::new().with("ret", "*1")]));
        assert!(ok.succeeded);
        assert_eq!(ok.status_code, 200);

        let failed = Outcome::from(Err(CoreError::NotFound {
            entity_type: "Certificate".into(),
            identifier: "CA".into(),
        }));
        assert!(!failed.succeeded);
        assert_eq!(failed.status_code, 404);
        assert!(failed.raw_payload.is_empty());
    }
}
