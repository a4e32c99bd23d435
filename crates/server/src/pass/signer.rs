//! Detached PKCS#7 signing of the manifest bytes.
//!
//! The production implementation shells out to `openssl smime`, which is the
//! one tool that reliably produces the SHA-1 signed-data structure the wallet
//! client verifies. The [`Signer`] trait keeps that an implementation detail:
//! a linked CMS library can replace the subprocess without touching the
//! builder.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::config::PassConfig;

/// Errors from signature production.
#[derive(Debug, Error)]
pub enum SignError {
    /// Key or certificate material is missing on disk. Configuration error;
    /// never retried.
    #[error("missing signing material: {}", .0.display())]
    MissingMaterial(PathBuf),

    /// The signing tool exited non-zero. Its stderr is attached so operators
    /// can diagnose without re-running.
    #[error("signing tool exited with status {status}: {stderr}")]
    Tool { status: i32, stderr: String },

    /// The signing tool exceeded its time budget.
    #[error("signing tool timed out after {0:?}")]
    Timeout(Duration),

    /// Spawning or talking to the tool failed.
    #[error("I/O error invoking signing tool: {0}")]
    Io(#[from] std::io::Error),
}

impl SignError {
    /// Whether a retry could plausibly succeed. Missing material cannot
    /// heal between two attempts in the same request.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::MissingMaterial(_))
    }
}

/// Produces a detached signature over the exact manifest bytes.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `manifest_bytes`, returning the DER-encoded signature.
    async fn sign(&self, manifest_bytes: &[u8]) -> Result<Vec<u8>, SignError>;
}

/// `openssl smime` subprocess signer.
pub struct OpensslCliSigner {
    certificate: PathBuf,
    private_key: PathBuf,
    wwdr_certificate: PathBuf,
    timeout: Duration,
}

impl OpensslCliSigner {
    /// Build a signer from the pass configuration.
    #[must_use]
    pub fn from_config(config: &PassConfig) -> Self {
        Self {
            certificate: config.certificate_path.clone(),
            private_key: config.private_key_path.clone(),
            wwdr_certificate: config.wwdr_certificate_path.clone(),
            timeout: config.signing_timeout,
        }
    }

    fn check_material(&self) -> Result<(), SignError> {
        for path in [&self.certificate, &self.private_key, &self.wwdr_certificate] {
            if !path.is_file() {
                return Err(SignError::MissingMaterial(path.clone()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Signer for OpensslCliSigner {
    async fn sign(&self, manifest_bytes: &[u8]) -> Result<Vec<u8>, SignError> {
        self.check_material()?;

        // The tool reads the manifest from a file; keep the handle alive
        // until the process has exited.
        let mut manifest_file = tempfile::NamedTempFile::new()?;
        manifest_file.write_all(manifest_bytes)?;
        manifest_file.flush()?;

        let output = Command::new("openssl")
            .args(["smime", "-sign", "-binary", "-md", "sha1", "-outform", "DER"])
            .arg("-signer")
            .arg(&self.certificate)
            .arg("-inkey")
            .arg(&self.private_key)
            .arg("-certfile")
            .arg(&self.wwdr_certificate)
            .arg("-in")
            .arg(manifest_file.path())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| SignError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(SignError::Tool {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output.stdout)
    }
}
