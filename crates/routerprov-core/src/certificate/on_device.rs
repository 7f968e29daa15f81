// Device-store strategy: create, sign and trust inside the device.
//
// No files leave the machine running this process on the way in. Client
// material comes back out through a PEM export, read from device storage
// and then removed.

use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;
use secrecy::SecretString;
use tracing::{debug, warn};

use super::{
    CertificateAsset, CertificateRole, CertificateSpec, CertificateState, CertificateStrategy,
    TriadContext, TriadReport, step_failed,
};
use crate::config::StrategyKind;
use crate::envelope::Outcome;
use crate::error::CoreError;
use crate::facade::RouterFacade;
use crate::ovpn::ClientMaterial;

#[derive(Debug, Clone, Copy, Default)]
pub struct OnDeviceStrategy;

#[async_trait]
impl CertificateStrategy for OnDeviceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OnDevice
    }

    fn device_name(&self, logical_name: &str) -> String {
        logical_name.to_owned()
    }

    async fn materialize(
        &self,
        ctx: &TriadContext<'_>,
        report: &mut TriadReport,
    ) -> Result<ClientMaterial, CoreError> {
        let ca_name = report.ca.device_name.clone();
        let crl_host = ctx.triad.ca_crl_host.as_deref();

        for spec in ctx.triad.specs() {
            let asset = report.asset_mut(spec.role);
            let issuer = (spec.role != CertificateRole::Ca).then_some(ca_name.as_str());
            let crl = if spec.role == CertificateRole::Ca {
                crl_host
            } else {
                None
            };
            ensure_on_device(ctx.facade, spec, asset, issuer, crl).await?;
        }

        export_material(ctx.facade, &report.ca.device_name, &report.client.device_name).await
    }
}

/// Create -> sign -> trust, skipping steps the store already satisfies.
async fn ensure_on_device(
    facade: &RouterFacade,
    spec: &CertificateSpec,
    asset: &mut CertificateAsset,
    issuer: Option<&str>,
    crl_host: Option<&str>,
) -> Result<(), CoreError> {
    if asset.state < CertificateState::Created {
        let device_spec = CertificateSpec {
            name: asset.device_name.clone(),
            ..spec.clone()
        };
        check(asset, "create", facade.create_certificate(&device_spec).await)?;
        asset.state = CertificateState::Created;
    } else {
        asset.skipped.push("create".into());
    }

    if asset.state < CertificateState::Signed {
        let outcome = facade
            .sign_certificate(&asset.device_name, issuer, crl_host)
            .await;
        check(asset, "sign", outcome)?;
        asset.state = CertificateState::Signed;
    } else {
        asset.skipped.push("sign".into());
    }

    if asset.state < CertificateState::Trusted {
        check(asset, "trust", facade.trust_certificate(&asset.device_name).await)?;
        asset.state = CertificateState::Trusted;
        asset.trusted = true;
    } else {
        asset.skipped.push("trust".into());
    }

    asset.imported_on_device = true;
    debug!(certificate = %asset.device_name, skipped = ?asset.skipped, "certificate ready on device");
    Ok(())
}

fn check(asset: &mut CertificateAsset, step: &str, outcome: Outcome) -> Result<(), CoreError> {
    if outcome.succeeded {
        Ok(())
    } else {
        Err(step_failed(asset, step, outcome.status_code, outcome.message))
    }
}

/// File names the device uses for `export-certificate` output.
pub(crate) fn export_files(device_name: &str) -> (String, String) {
    (
        format!("cert_export_{device_name}.crt"),
        format!("cert_export_{device_name}.key"),
    )
}

/// Export the CA certificate and the client certificate + key from the
/// device store, read them back, and remove the exported files.
pub(crate) async fn export_material(
    facade: &RouterFacade,
    ca_name: &str,
    client_name: &str,
) -> Result<ClientMaterial, CoreError> {
    let passphrase: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect();
    let passphrase = SecretString::from(passphrase);

    let (ca_crt, _) = export_files(ca_name);
    let (client_crt, client_key) = export_files(client_name);

    let exported = facade.export_certificate(ca_name, None).await;
    if !exported.succeeded {
        return Err(export_error(ca_name, &exported));
    }
    let exported = facade.export_certificate(client_name, Some(&passphrase)).await;
    if !exported.succeeded {
        return Err(export_error(client_name, &exported));
    }

    let material = async {
        Ok::<_, CoreError>(ClientMaterial {
            ca_certificate: facade.read_file(&ca_crt).await?,
            client_certificate: facade.read_file(&client_crt).await?,
            client_key: facade.read_file(&client_key).await?,
            key_passphrase: Some(passphrase),
        })
    }
    .await;

    for file in [&ca_crt, &client_crt, &client_key] {
        let removed = facade.remove_file(file).await;
        if !removed.succeeded {
            warn!(file = %file, message = %removed.message, "failed to remove exported file");
        }
    }

    material
}

fn export_error(certificate: &str, outcome: &Outcome) -> CoreError {
    CoreError::CertificateStep {
        certificate: certificate.to_owned(),
        step: "export".into(),
        status: outcome.status_code,
        reason: outcome.message.clone(),
    }
}
