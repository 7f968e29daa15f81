// CA toolchain capability and its OpenSSL implementation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{CertificateRole, CertificateSpec};
use crate::error::CoreError;

/// Certificate and private key files produced for one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub certificate: PathBuf,
    pub key: PathBuf,
}

/// Produces key + certificate file pairs on local storage.
#[async_trait]
pub trait CaToolchain: Send + Sync {
    /// Self-signed authority for `spec`, written under `dir`.
    async fn generate_authority(
        &self,
        spec: &CertificateSpec,
        dir: &Path,
    ) -> Result<KeyPair, CoreError>;

    /// Key, CSR and certificate for `spec`, signed by `authority`.
    async fn generate_signed(
        &self,
        spec: &CertificateSpec,
        authority: &KeyPair,
        dir: &Path,
    ) -> Result<KeyPair, CoreError>;
}

/// Shells out to an `openssl` binary.
#[derive(Debug, Clone)]
pub struct OpensslToolchain {
    binary: PathBuf,
}

impl OpensslToolchain {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: Vec<OsString>) -> Result<(), CoreError> {
        debug!(binary = %self.binary.display(), args = ?args, "running CA toolchain");
        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| CoreError::Toolchain {
                message: format!("cannot run {}: {e}", self.binary.display()),
            })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(CoreError::Toolchain {
                message: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }

    async fn write_config(spec: &CertificateSpec, dir: &Path) -> Result<PathBuf, CoreError> {
        let path = dir.join(format!("{}.cnf", spec.role));
        tokio::fs::write(&path, openssl_config(spec))
            .await
            .map_err(|e| CoreError::Storage {
                message: format!("{}: {e}", path.display()),
            })?;
        Ok(path)
    }

    async fn genrsa(&self, spec: &CertificateSpec, key: &Path) -> Result<(), CoreError> {
        let bits = spec.key_size.to_string();
        self.run(vec!["genrsa".into(), "-out".into(), key.into(), (&bits).into()])
            .await
    }
}

fn pair(spec: &CertificateSpec, dir: &Path) -> KeyPair {
    KeyPair {
        certificate: dir.join(format!("{}.pem", spec.name)),
        key: dir.join(format!("{}.key", spec.name)),
    }
}

#[async_trait]
impl CaToolchain for OpensslToolchain {
    async fn generate_authority(
        &self,
        spec: &CertificateSpec,
        dir: &Path,
    ) -> Result<KeyPair, CoreError> {
        let config = Self::write_config(spec, dir).await?;
        let out = pair(spec, dir);
        let days = spec.days_valid.to_string();

        self.genrsa(spec, &out.key).await?;
        self.run(vec![
            "req".into(),
            "-x509".into(),
            "-new".into(),
            "-nodes".into(),
            "-key".into(),
            (&out.key).into(),
            "-sha256".into(),
            "-days".into(),
            (&days).into(),
            "-out".into(),
            (&out.certificate).into(),
            "-config".into(),
            (&config).into(),
        ])
        .await?;
        Ok(out)
    }

    async fn generate_signed(
        &self,
        spec: &CertificateSpec,
        authority: &KeyPair,
        dir: &Path,
    ) -> Result<KeyPair, CoreError> {
        let config = Self::write_config(spec, dir).await?;
        let out = pair(spec, dir);
        let csr = dir.join(format!("{}.csr", spec.role));
        let days = spec.days_valid.to_string();
        let section = extension_section(spec.role);

        self.genrsa(spec, &out.key).await?;
        self.run(vec![
            "req".into(),
            "-new".into(),
            "-key".into(),
            (&out.key).into(),
            "-out".into(),
            (&csr).into(),
            "-config".into(),
            (&config).into(),
        ])
        .await?;
        self.run(vec![
            "x509".into(),
            "-req".into(),
            "-in".into(),
            (&csr).into(),
            "-CA".into(),
            (&authority.certificate).into(),
            "-CAkey".into(),
            (&authority.key).into(),
            "-CAcreateserial".into(),
            "-out".into(),
            (&out.certificate).into(),
            "-days".into(),
            (&days).into(),
            "-sha256".into(),
            "-extfile".into(),
            (&config).into(),
            "-extensions".into(),
            (&section).into(),
        ])
        .await?;
        Ok(out)
    }
}

fn extension_section(role: CertificateRole) -> String {
    format!("v3_{role}")
}

/// Request + extension config for one role.
pub(crate) fn openssl_config(spec: &CertificateSpec) -> String {
    let section = extension_section(spec.role);
    let extensions = match spec.role {
        CertificateRole::Ca => {
            "keyUsage = critical, keyCertSign, cRLSign\n\
             basicConstraints = critical, CA:true\n\
             subjectKeyIdentifier = hash\n\
             authorityKeyIdentifier = keyid:always,issuer\n"
        }
        CertificateRole::Server => {
            "keyUsage = critical, digitalSignature, keyEncipherment\n\
             extendedKeyUsage = serverAuth\n\
             basicConstraints = critical, CA:false\n\
             subjectKeyIdentifier = hash\n\
             authorityKeyIdentifier = keyid,issuer\n"
        }
        CertificateRole::Client => {
            "keyUsage = critical, digitalSignature, keyEncipherment\n\
             extendedKeyUsage = clientAuth\n\
             basicConstraints = critical, CA:false\n\
             subjectKeyIdentifier = hash\n\
             authorityKeyIdentifier = keyid,issuer\n"
        }
    };
    format!(
        "[ req ]\n\
         distinguished_name = req_distinguished_name\n\
         x509_extensions = {section}\n\
         prompt = no\n\
         [ req_distinguished_name ]\n\
         CN = {cn}\n\
         [ {section} ]\n\
         {extensions}",
        cn = spec.common_name,
    )
}
