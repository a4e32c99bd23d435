//! Bundle manifest: member name to SHA-1 content hash.
//!
//! SHA-1 is the vendor-mandated digest for this artifact type; the wallet
//! client recomputes each member's hash against the manifest and silently
//! discards the pass on any mismatch. The manifest must therefore be
//! serialized exactly once: the same bytes are signed and stored in the
//! container (see [`super::PassBuilder`]).

use std::collections::BTreeMap;

use serde::Serialize;
use sha1::{Digest, Sha1};

/// SHA-1 digest of `bytes` as lowercase hex.
#[must_use]
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Mapping of bundle member name to content hash.
///
/// Backed by a `BTreeMap` so the serialized byte stream is deterministic for
/// a given member set regardless of insertion order.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Create an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `content` and record it under `name`.
    pub fn add(&mut self, name: impl Into<String>, content: &[u8]) {
        self.entries.insert(name.into(), sha1_hex(content));
    }

    /// Stored hash for a member, if present.
    #[must_use]
    pub fn hash_of(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Number of recorded members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The canonical byte serialization: these exact bytes are both signed
    /// and persisted as `manifest.json`.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.entries)
    }
}
