// Single-device operations: listings, credential check, PPP secrets, ping.

use routerprov_api::Record;
use tracing::warn;

use crate::envelope::{Envelope, status};
use crate::error::CoreError;
use crate::facade::RouterFacade;
use crate::model::{AddressEntry, DeviceRequest, PingRequest, PppProfile, PppSecret, SecretRequest};
use crate::provisioner::Provisioner;

impl Provisioner {
    pub async fn list_addresses(&self, request: &DeviceRequest) -> Envelope<Vec<AddressEntry>> {
        let facade = match self.device(request) {
            Ok(facade) => facade,
            Err(err) => return Envelope::from_error(&err),
        };
        match facade.list_addresses().await {
            Ok(addresses) => Envelope::ok(addresses, "IP addresses retrieved successfully"),
            Err(err) => {
                warn!(device = %facade.endpoint(), error = %err, "address listing failed");
                Envelope::failure(err.status_code(), "Failed to retrieve IP addresses")
            }
        }
    }

    /// Open and close a session to prove the credentials.
    pub async fn validate_connection(&self, request: &DeviceRequest) -> Envelope<()> {
        let facade = match self.device(request) {
            Ok(facade) => facade,
            Err(err) => return Envelope::from_error(&err),
        };
        match facade.validate().await {
            Ok(()) => Envelope::new(
                status::OK,
                None,
                "Validation successful, credentials are correct",
            ),
            Err(err) => Envelope::from_error(&err),
        }
    }

    pub async fn list_ppp_profiles(&self, request: &DeviceRequest) -> Envelope<Vec<PppProfile>> {
        match self.device(request) {
            Ok(facade) => answer(facade.list_ppp_profiles().await, "PPP profiles"),
            Err(err) => Envelope::from_error(&err),
        }
    }

    pub async fn list_ppp_secrets(&self, request: &DeviceRequest) -> Envelope<Vec<PppSecret>> {
        match self.device(request) {
            Ok(facade) => answer(facade.list_ppp_secrets().await, "PPP secrets"),
            Err(err) => Envelope::from_error(&err),
        }
    }

    pub async fn system_resource(&self, request: &DeviceRequest) -> Envelope<Record> {
        match self.device(request) {
            Ok(facade) => answer(facade.system_resource().await, "System resource"),
            Err(err) => Envelope::from_error(&err),
        }
    }

    /// Create a PPP secret, answering the device's raw reply.
    pub async fn create_secret(&self, request: &SecretRequest) -> Envelope<Vec<Record>> {
        if let Err(err) = request.validate() {
            return Envelope::from_error(&err);
        }
        let facade = self.facade(request.auth.endpoint());
        let outcome = facade
            .create_ppp_secret(&request.user, &request.pass, request.profile())
            .await;
        if outcome.succeeded {
            Envelope::ok(
                outcome.raw_payload,
                format!("PPP secret {} created successfully", request.user),
            )
        } else {
            Envelope::failure(outcome.status_code, outcome.message)
        }
    }

    pub async fn ping(&self, request: &PingRequest) -> Envelope<Vec<Record>> {
        if let Err(err) = request.validate() {
            return Envelope::from_error(&err);
        }
        let facade = self.facade(request.auth.endpoint());
        answer(
            facade.ping(&request.target, request.count()).await,
            "Ping replies",
        )
    }

    fn device(&self, request: &DeviceRequest) -> Result<RouterFacade, CoreError> {
        request.validate()?;
        Ok(self.facade(request.endpoint()))
    }
}

/// 200 with `"<what> retrieved successfully"`, or the error's own envelope.
fn answer<T>(result: Result<T, CoreError>, what: &str) -> Envelope<T> {
    match result {
        Ok(data) => Envelope::ok(data, format!("{what} retrieved successfully")),
        Err(err) => Envelope::from_error(&err),
    }
}
