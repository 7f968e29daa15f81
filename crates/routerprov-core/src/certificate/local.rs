// Local toolchain strategy: generate, upload, import.
//
// Material is generated under the run's staging directory, uploaded as
// `<name>.pem` / `<name>.key`, and imported trusted. The device names an
// imported certificate after its file, hence `<name>.pem_0`.
//
// The CA private key never leaves the staging directory, which is removed
// after each run. A leaf can only be issued in the same run that created
// the CA; a CA present on the device with a missing leaf is a 404.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::on_device::export_material;
use super::toolchain::{CaToolchain, KeyPair};
use super::{
    CertificateAsset, CertificateRole, CertificateSpec, CertificateState, CertificateStrategy,
    TriadContext, TriadReport, step_failed,
};
use crate::config::StrategyKind;
use crate::envelope::status;
use crate::error::CoreError;
use crate::ovpn::ClientMaterial;

pub struct LocalToolchainStrategy {
    toolchain: Arc<dyn CaToolchain>,
}

impl LocalToolchainStrategy {
    pub fn new(toolchain: Arc<dyn CaToolchain>) -> Self {
        Self { toolchain }
    }
}

#[async_trait]
impl CertificateStrategy for LocalToolchainStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Local
    }

    fn device_name(&self, logical_name: &str) -> String {
        format!("{logical_name}.pem_0")
    }

    async fn materialize(
        &self,
        ctx: &TriadContext<'_>,
        report: &mut TriadReport,
    ) -> Result<ClientMaterial, CoreError> {
        if report.all_present() {
            for role in [CertificateRole::Ca, CertificateRole::Server, CertificateRole::Client] {
                let asset = report.asset_mut(role);
                asset.skipped.extend(["generate", "upload", "import"].map(String::from));
                asset.state = CertificateState::Imported;
            }
            info!("certificate triad already on device; exporting client material");
            return export_material(ctx.facade, &report.ca.device_name, &report.client.device_name)
                .await;
        }

        let dir = ctx.storage.ensure().await?;
        let triad = ctx.triad;

        if report.ca.is_present() {
            let missing = if report.server.is_present() {
                CertificateRole::Client
            } else {
                CertificateRole::Server
            };
            let ca_name = report.ca.device_name.clone();
            return Err(step_failed(
                report.asset_mut(missing),
                "generate",
                status::NOT_FOUND,
                format!("CA key for {ca_name} not available locally"),
            ));
        }

        let authority = generate(
            &mut report.ca,
            self.toolchain.generate_authority(&triad.ca, dir).await,
        )?;
        install(ctx, &triad.ca, &authority, &mut report.ca).await?;

        let mut client_pair = None;
        for spec in [&triad.server, &triad.client] {
            let asset = report.asset_mut(spec.role);
            if asset.is_present() {
                asset.skipped.extend(["generate", "upload", "import"].map(String::from));
                continue;
            }
            let pair = generate(
                asset,
                self.toolchain.generate_signed(spec, &authority, dir).await,
            )?;
            install(ctx, spec, &pair, asset).await?;
            if spec.role == CertificateRole::Client {
                client_pair = Some(pair);
            }
        }

        match client_pair {
            Some(client) => Ok(ClientMaterial {
                ca_certificate: ctx.storage.read(&authority.certificate).await?,
                client_certificate: ctx.storage.read(&client.certificate).await?,
                client_key: ctx.storage.read(&client.key).await?,
                key_passphrase: None,
            }),
            None => {
                export_material(ctx.facade, &report.ca.device_name, &report.client.device_name)
                    .await
            }
        }
    }
}

fn generate(
    asset: &mut CertificateAsset,
    generated: Result<KeyPair, CoreError>,
) -> Result<KeyPair, CoreError> {
    match generated {
        Ok(pair) => {
            asset.state = CertificateState::Signed;
            Ok(pair)
        }
        Err(err) => Err(step_failed(
            asset,
            "generate",
            err.status_code(),
            err.to_string(),
        )),
    }
}

/// Upload certificate and key, import both, trust explicitly, and remove
/// the uploaded files.
async fn install(
    ctx: &TriadContext<'_>,
    spec: &CertificateSpec,
    pair: &KeyPair,
    asset: &mut CertificateAsset,
) -> Result<(), CoreError> {
    let facade = ctx.facade;
    let cert_file = format!("{}.pem", spec.name);
    let key_file = format!("{}.key", spec.name);

    for (local, remote) in [(&pair.certificate, &cert_file), (&pair.key, &key_file)] {
        let contents = read_local(ctx, asset, local).await?;
        let uploaded = facade.upload_file(remote, &contents).await;
        if !uploaded.succeeded {
            return Err(step_failed(asset, "upload", uploaded.status_code, uploaded.message));
        }
    }
    asset.state = CertificateState::Uploaded;

    for remote in [&cert_file, &key_file] {
        let imported = facade.import_certificate(remote, None).await;
        if !imported.succeeded {
            return Err(step_failed(asset, "import", imported.status_code, imported.message));
        }
    }
    asset.imported_on_device = true;

    let trusted = facade.trust_certificate(&asset.device_name).await;
    if !trusted.succeeded {
        return Err(step_failed(asset, "trust", trusted.status_code, trusted.message));
    }
    asset.trusted = true;
    asset.state = CertificateState::Imported;

    for remote in [&cert_file, &key_file] {
        let removed = facade.remove_file(remote).await;
        if !removed.succeeded {
            warn!(file = %remote, message = %removed.message, "failed to remove uploaded file");
        }
    }
    Ok(())
}

async fn read_local(
    ctx: &TriadContext<'_>,
    asset: &mut CertificateAsset,
    file: &Path,
) -> Result<String, CoreError> {
    ctx.storage
        .read(file)
        .await
        .map_err(|e| step_failed(asset, "upload", status::COMMAND_FAILED, e.to_string()))
}
