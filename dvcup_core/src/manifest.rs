//! Directory manifests: the ordered `(md5, relpath)` listing of a tracked folder.
//!
//! Wire format is a compact JSON array terminated by a newline:
//!
//! ```text
//! [{"md5":"<32 hex>","relpath":"a.csv"},{"md5":"<32 hex>","relpath":"b.csv"}]
//! ```
//!
//! Entries are written in the order they were appended, `md5` before
//! `relpath`. The manifest's own address is the MD5 of these bytes, tagged
//! `.dir`, so the encoding must stay byte-stable.

use crate::error::{Error, Result};
use crate::hash::{Address, Hash};
use serde::{Deserialize, Serialize};

/// One file of a tracked folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Content hash of the file.
    pub md5: Hash,
    /// Path of the file relative to the tracked folder.
    pub relpath: String,
}

impl ManifestEntry {
    pub fn new(md5: Hash, relpath: impl Into<String>) -> Self {
        Self {
            md5,
            relpath: relpath.into(),
        }
    }
}

/// An ordered, append-only list of manifest entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryManifest {
    entries: Vec<ManifestEntry>,
}

impl DirectoryManifest {
    /// An empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode manifest bytes fetched from `address`.
    ///
    /// Unknown keys in entries are ignored, whitespace is irrelevant.
    pub fn decode(data: &[u8], address: &Address) -> Result<Self> {
        let entries: Vec<ManifestEntry> = serde_json::from_slice(data)
            .map_err(|e| Error::invalid_manifest(address.to_key(), e.to_string()))?;
        Ok(Self { entries })
    }

    /// Canonical encoding. Identical entry sequences always yield identical bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = serde_json::to_vec(&self.entries)
            .map_err(|e| Error::invalid_manifest("<unsaved>", e.to_string()))?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Address of the canonical encoding, tagged as a directory.
    pub fn address(&self) -> Result<Address> {
        Ok(Address::directory(Hash::hash_bytes(&self.encode()?)))
    }

    /// Append an entry. Entries with an already-listed path are kept side by side.
    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ManifestEntry>> for DirectoryManifest {
    fn from(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }
}
