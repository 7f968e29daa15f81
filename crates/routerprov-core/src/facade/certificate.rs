// Certificate store commands.
//
// Sign, trust and export look the certificate up by name first; a missing
// certificate yields a 404 outcome and the follow-up command is not sent.

use routerprov_api::Command;
use secrecy::{ExposeSecret, SecretString};

use super::{RouterFacade, require_id};
use crate::certificate::CertificateSpec;
use crate::envelope::Outcome;
use crate::error::CoreError;

const ENTITY: &str = "Certificate";

fn lookup(name: &str) -> Command {
    Command::new("/certificate/print").query("name", name)
}

impl RouterFacade {
    /// Create a certificate (template) in the device store.
    pub async fn create_certificate(&self, spec: &CertificateSpec) -> Outcome {
        self.run_once(
            Command::new("/certificate/add")
                .param("name", &spec.name)
                .param("common-name", &spec.common_name)
                .param("key-size", spec.key_size)
                .param("days-valid", spec.days_valid)
                .param("key-usage", spec.role.device_key_usage()),
        )
        .await
        .into()
    }

    /// Sign `name`, with `ca` as issuer (self-signed when `None`).
    pub async fn sign_certificate(
        &self,
        name: &str,
        ca: Option<&str>,
        ca_crl_host: Option<&str>,
    ) -> Outcome {
        self.lookup_then(name, |id| {
            Command::new("/certificate/sign")
                .param(".id", id)
                .param_opt("ca", ca)
                .param_opt("ca-crl-host", ca_crl_host)
        })
        .await
        .into()
    }

    /// Mark `name` trusted. Distinct from signing.
    pub async fn trust_certificate(&self, name: &str) -> Outcome {
        self.lookup_then(name, |id| {
            Command::new("/certificate/set")
                .param(".id", id)
                .param("trusted", "yes")
        })
        .await
        .into()
    }

    /// Export `name` as PEM into device file storage. A passphrase makes
    /// the device export the private key too.
    pub async fn export_certificate(&self, name: &str, passphrase: Option<&SecretString>) -> Outcome {
        let passphrase = passphrase.map(|p| p.expose_secret().to_owned());
        self.lookup_then(name, move |id| {
            Command::new("/certificate/export-certificate")
                .param(".id", id)
                .param("type", "pem")
                .param_opt("export-passphrase", passphrase)
        })
        .await
        .into()
    }

    /// Import an uploaded file into the certificate store as trusted.
    pub async fn import_certificate(
        &self,
        file_name: &str,
        passphrase: Option<&SecretString>,
    ) -> Outcome {
        self.run_once(
            Command::new("/certificate/import")
                .param("file-name", file_name)
                .param("trusted", "yes")
                .param_opt("passphrase", passphrase.map(|p| p.expose_secret())),
        )
        .await
        .into()
    }

    async fn lookup_then(
        &self,
        name: &str,
        build: impl FnOnce(String) -> Command + Send,
    ) -> Result<Vec<routerprov_api::Record>, CoreError> {
        let mut session = self.open().await?;
        let result = async {
            let id = require_id(&session.run(&lookup(name)).await?, ENTITY, name)?;
            session.run(&build(id)).await
        }
        .await;
        session.close().await;
        result
    }
}
