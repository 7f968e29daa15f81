// Certificate staging storage.
//
// An injected root, never the process working directory. Each provisioning
// run gets its own directory, `<sanitized identity>-<uuid>`, removed when the
// run completes.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct CertificateStorage {
    root: PathBuf,
}

impl CertificateStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// A fresh, not yet created, directory for one run against `identity`.
    pub fn device_dir(&self, identity: &str) -> DeviceStorage {
        let sanitized: String = identity
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        DeviceStorage {
            path: self.root.join(format!("{sanitized}-{}", Uuid::new_v4())),
            cleaned: false,
        }
    }
}

/// One run's staging directory. Removed by [`cleanup`](Self::cleanup), or
/// on drop as a fallback.
#[derive(Debug)]
pub struct DeviceStorage {
    path: PathBuf,
    cleaned: bool,
}

impl DeviceStorage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory if it does not exist yet.
    pub async fn ensure(&self) -> Result<&Path, CoreError> {
        tokio::fs::create_dir_all(&self.path)
            .await
            .map_err(|e| storage_error(&self.path, &e))?;
        Ok(&self.path)
    }

    pub async fn read(&self, file: &Path) -> Result<String, CoreError> {
        tokio::fs::read_to_string(file)
            .await
            .map_err(|e| storage_error(file, &e))
    }

    /// Remove the directory and everything in it.
    pub async fn cleanup(mut self) -> Result<(), CoreError> {
        self.cleaned = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed certificate staging directory");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&self.path, &e)),
        }
    }
}

impl Drop for DeviceStorage {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove staging directory");
            }
        }
    }
}

fn storage_error(path: &Path, err: &std::io::Error) -> CoreError {
    CoreError::Storage {
        message: format!("{}: {err}", path.display()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directories_are_unique_and_removed() {
        let root = tempfile::tempdir().unwrap();
        let storage = CertificateStorage::new(root.path());

        let first = storage.device_dir("Edge Router/1");
        let second = storage.device_dir("Edge Router/1");
        assert_ne!(first.path(), second.path());
        assert!(
            first
                .path()
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap()
                .starts_with("Edge_Router_1-")
        );

        let dir = first.ensure().await.unwrap().to_path_buf();
        tokio::fs::write(dir.join("ca.pem"), "pem").await.unwrap();
        first.cleanup().await.unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn drop_removes_unclean_directory() {
        let root = tempfile::tempdir().unwrap();
        let storage = CertificateStorage::new(root.path());
        let path = {
            let dir = storage.device_dir("hq");
            dir.ensure().await.unwrap().to_path_buf()
        };
        assert!(!path.exists());
    }
}
