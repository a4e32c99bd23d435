//! Pass bundle building: descriptor rendering, manifest hashing, detached
//! signing, and container assembly.
//!
//! A build is self-contained and writes to a uniquely named path, so
//! concurrent builds for the same serial cannot corrupt each other; later
//! regenerations supersede earlier containers rather than mutating them.

pub mod archive;
pub mod descriptor;
pub mod manifest;
pub mod signer;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use thiserror::Error;

use glowpass_core::{CustomerId, PassTypeId};

pub use archive::{ArchiveError, Archiver, BundleMember, ZipArchiver};
pub use descriptor::PassDescriptor;
pub use manifest::Manifest;
pub use signer::{OpensslCliSigner, SignError, Signer};

use crate::config::PassConfig;
use crate::models::Customer;

/// Descriptor member name inside the container.
pub const DESCRIPTOR_NAME: &str = "pass.json";
/// Manifest member name inside the container.
pub const MANIFEST_NAME: &str = "manifest.json";
/// Signature member name inside the container.
pub const SIGNATURE_NAME: &str = "signature";
/// Fixed resource set copied unchanged from the template directory.
pub const TEMPLATE_RESOURCES: [&str; 3] = ["icon.png", "logo.png", "strip.png"];

/// Per-pass bearer token for the registration protocol.
///
/// Derived from the pass type and serial alone so the registry can validate
/// a presented token without any lookup. The SHA-1 hex form also satisfies
/// the wallet client's minimum token length.
#[must_use]
pub fn authentication_token(pass_type: &PassTypeId, serial: &CustomerId) -> String {
    let mut hasher = Sha1::new();
    hasher.update(pass_type.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(serial.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Errors from a pass build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A template resource is missing. Configuration error; fatal.
    #[error("missing template resource: {}", .0.display())]
    MissingResource(PathBuf),

    /// Descriptor or manifest serialization failed.
    #[error("failed to render pass descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),

    /// Signing failed (after the single retry for transient tool failures).
    #[error("signing failed: {0}")]
    Signing(#[from] SignError),

    /// Container packaging failed.
    #[error("packaging failed: {0}")]
    Packaging(#[from] ArchiveError),

    /// Filesystem error while assembling or persisting the container.
    #[error("I/O error building pass: {0}")]
    Io(#[from] std::io::Error),
}

/// A freshly built, immutable container on disk.
#[derive(Debug, Clone)]
pub struct PassArtifact {
    /// Final path of the container.
    pub path: PathBuf,
    /// File name under the artifacts directory (`{millis}-{serial}.pkpass`).
    pub file_name: String,
    /// Build instant; doubles as the `Last-Modified` value when served.
    pub built_at: DateTime<Utc>,
}

/// Builds and signs pass containers from customer snapshots.
///
/// Owns artifact construction and filesystem placement exclusively; callers
/// only consume the returned [`PassArtifact`].
pub struct PassBuilder {
    config: PassConfig,
    base_url: String,
    signer: Arc<dyn Signer>,
    archiver: Arc<dyn Archiver>,
}

impl PassBuilder {
    /// Create a builder with injected signing and archiving capabilities.
    pub fn new(
        config: PassConfig,
        base_url: impl Into<String>,
        signer: Arc<dyn Signer>,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        Self {
            config,
            base_url: base_url.into(),
            signer,
            archiver,
        }
    }

    /// The pass type this builder issues.
    #[must_use]
    pub const fn pass_type_id(&self) -> &PassTypeId {
        &self.config.pass_type_id
    }

    /// Build, sign, and atomically persist a container for `customer`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`]; missing template/signing material is fatal and
    /// non-retryable, transient signing-tool failures are retried once.
    pub async fn build(&self, customer: &Customer) -> Result<PassArtifact, BuildError> {
        let descriptor = PassDescriptor::render(customer, &self.config, &self.base_url);
        let descriptor_bytes = serde_json::to_vec(&descriptor)?;

        let mut members = vec![BundleMember::new(DESCRIPTOR_NAME, descriptor_bytes)];
        for name in TEMPLATE_RESOURCES {
            let path = self.config.template_dir.join(name);
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BuildError::MissingResource(path)
                } else {
                    BuildError::Io(e)
                }
            })?;
            members.push(BundleMember::new(name, bytes));
        }

        let mut manifest = Manifest::new();
        for member in &members {
            manifest.add(&member.name, &member.bytes);
        }
        // The signature covers the exact bytes stored in the container, so
        // the manifest is serialized once and those bytes reused for both.
        let manifest_bytes = manifest.to_bytes()?;

        let signature = self.sign_with_retry(&manifest_bytes).await?;
        members.push(BundleMember::new(MANIFEST_NAME, manifest_bytes));
        members.push(BundleMember::new(SIGNATURE_NAME, signature));

        let built_at = Utc::now();
        let file_name = format!("{}-{}.pkpass", built_at.timestamp_millis(), customer.id);
        let final_path = self.config.artifacts_dir.join(&file_name);

        tokio::fs::create_dir_all(&self.config.artifacts_dir).await?;

        let archiver = Arc::clone(&self.archiver);
        let artifacts_dir = self.config.artifacts_dir.clone();
        let destination = final_path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), BuildError> {
            // Write into a temp file in the same directory, then rename: the
            // final path only ever names a complete container, and the temp
            // file is removed on drop if packaging fails.
            let mut temp = tempfile::NamedTempFile::new_in(&artifacts_dir)?;
            archiver.write_bundle(&members, temp.as_file_mut())?;
            temp.persist(&destination)
                .map_err(|e| BuildError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| BuildError::Io(std::io::Error::other(e)))??;

        tracing::info!(
            serial = %customer.id,
            path = %final_path.display(),
            "pass container built"
        );

        Ok(PassArtifact {
            path: final_path,
            file_name,
            built_at,
        })
    }

    async fn sign_with_retry(&self, manifest_bytes: &[u8]) -> Result<Vec<u8>, SignError> {
        match self.signer.sign(manifest_bytes).await {
            Ok(signature) => Ok(signature),
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, "signing failed, retrying once");
                self.signer.sign(manifest_bytes).await
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::testing::{self, FakeSigner, FlakySigner};

    #[test]
    fn test_authentication_token_is_stable_and_long_enough() {
        let pass_type = PassTypeId::new("pass.com.glowpass");
        let serial = CustomerId::new("C1");
        let token = authentication_token(&pass_type, &serial);
        assert_eq!(token, authentication_token(&pass_type, &serial));
        assert_eq!(token.len(), 40);
        assert_ne!(
            token,
            authentication_token(&pass_type, &CustomerId::new("C2"))
        );
    }

    #[tokio::test]
    async fn test_build_produces_container_with_valid_manifest() {
        let (builder, _dirs) = testing::builder_with_signer(Arc::new(FakeSigner));
        let customer = testing::customer("C1", 3);

        let artifact = builder.build(&customer).await.unwrap();
        assert!(artifact.path.is_file());
        assert!(artifact.file_name.ends_with("-C1.pkpass"));

        let file = std::fs::File::open(&artifact.path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();

        // Manifest integrity law: every member hash matches its stored bytes.
        let mut manifest_bytes = Vec::new();
        archive
            .by_name(MANIFEST_NAME)
            .unwrap()
            .read_to_end(&mut manifest_bytes)
            .unwrap();
        let hashes: std::collections::BTreeMap<String, String> =
            serde_json::from_slice(&manifest_bytes).unwrap();

        for name in [DESCRIPTOR_NAME, "icon.png", "logo.png", "strip.png"] {
            let mut bytes = Vec::new();
            archive
                .by_name(name)
                .unwrap()
                .read_to_end(&mut bytes)
                .unwrap();
            assert_eq!(
                hashes.get(name).map(String::as_str),
                Some(manifest::sha1_hex(&bytes).as_str()),
                "hash mismatch for {name}"
            );
        }

        // The signature member is the signer's output over the manifest bytes.
        let mut signature = Vec::new();
        archive
            .by_name(SIGNATURE_NAME)
            .unwrap()
            .read_to_end(&mut signature)
            .unwrap();
        assert_eq!(signature, FakeSigner::signature_for(&manifest_bytes));
    }

    #[tokio::test]
    async fn test_descriptor_in_container_reflects_visits() {
        let (builder, _dirs) = testing::builder_with_signer(Arc::new(FakeSigner));

        let artifact = builder.build(&testing::customer("C1", 3)).await.unwrap();
        let file = std::fs::File::open(&artifact.path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut descriptor = String::new();
        archive
            .by_name(DESCRIPTOR_NAME)
            .unwrap()
            .read_to_string(&mut descriptor)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&descriptor).unwrap();
        assert_eq!(
            json["storeCard"]["primaryFields"][0]["value"],
            serde_json::json!("3/5")
        );
    }

    #[tokio::test]
    async fn test_missing_template_resource_is_fatal() {
        let (builder, dirs) = testing::builder_with_signer(Arc::new(FakeSigner));
        std::fs::remove_file(dirs.template.path().join("icon.png")).unwrap();

        let err = builder.build(&testing::customer("C1", 0)).await.unwrap_err();
        assert!(matches!(err, BuildError::MissingResource(_)));
    }

    #[tokio::test]
    async fn test_transient_signing_failure_is_retried_once() {
        let signer = Arc::new(FlakySigner::failing(1));
        let (builder, _dirs) = testing::builder_with_signer(signer.clone());

        let artifact = builder.build(&testing::customer("C1", 0)).await;
        assert!(artifact.is_ok());
        assert_eq!(signer.attempts(), 2);
    }

    #[tokio::test]
    async fn test_repeated_signing_failure_surfaces_tool_output() {
        let signer = Arc::new(FlakySigner::failing(2));
        let (builder, _dirs) = testing::builder_with_signer(signer.clone());

        let err = builder.build(&testing::customer("C1", 0)).await.unwrap_err();
        match err {
            BuildError::Signing(SignError::Tool { stderr, .. }) => {
                assert!(stderr.contains("simulated"));
            }
            other => panic!("expected signing error, got {other:?}"),
        }
        assert_eq!(signer.attempts(), 2);
    }

    #[tokio::test]
    async fn test_regeneration_supersedes_instead_of_mutating() {
        let (builder, _dirs) = testing::builder_with_signer(Arc::new(FakeSigner));
        let first = builder.build(&testing::customer("C1", 3)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = builder.build(&testing::customer("C1", 4)).await.unwrap();

        assert_ne!(first.path, second.path);
        assert!(first.path.is_file(), "earlier container must survive");
        assert!(second.path.is_file());
    }
}
