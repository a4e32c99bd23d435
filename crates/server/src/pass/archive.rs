//! Container packaging: the signed bundle is a flat zip archive.
//!
//! Member names carry no path prefixes; the wallet client looks them up by
//! exact name at the archive root.

use std::io::{Seek, Write};

use thiserror::Error;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Errors from container packaging.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error writing container: {0}")]
    Io(#[from] std::io::Error),
}

/// One named member of the bundle.
#[derive(Debug, Clone)]
pub struct BundleMember {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl BundleMember {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Sink the archiver writes into. Blanket-implemented for anything
/// `Write + Seek` (files, in-memory cursors).
pub trait WriteSeek: Write + Seek {}
impl<T: Write + Seek> WriteSeek for T {}

/// Packages bundle members into the container format.
///
/// A trait so the zip library can be swapped for an external archiving tool
/// (or vice versa) without changing the builder contract.
pub trait Archiver: Send + Sync {
    /// Write all members into `out` as a finished container.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError` if packaging fails; the builder treats this as
    /// a `PackagingFailure`.
    fn write_bundle(
        &self,
        members: &[BundleMember],
        out: &mut dyn WriteSeek,
    ) -> Result<(), ArchiveError>;
}

/// `zip`-crate backed archiver.
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn write_bundle(
        &self,
        members: &[BundleMember],
        out: &mut dyn WriteSeek,
    ) -> Result<(), ArchiveError> {
        let mut writer = ZipWriter::new(out);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for member in members {
            writer.start_file(&member.name, options)?;
            writer.write_all(&member.bytes)?;
        }

        writer.finish()?;
        Ok(())
    }
}
