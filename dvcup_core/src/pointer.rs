//! Pointer (`.dvc`) files naming the current manifest of a tracked folder.
//!
//! ```yaml
//! outs:
//! - md5: 3863d0e317dee0a55c4e59d2ec0eef33.dir
//!   path: dataset
//! ```
//!
//! Keys this crate does not interpret are carried through a rewrite untouched.

use crate::error::{Error, Result};
use crate::hash::Address;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// The tracked-folder descriptor: which manifest is current, and for which path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerRecord {
    /// Address of the current manifest; `None` for a folder that was never populated.
    pub address: Option<Address>,
    /// Logical path label of the folder.
    pub path: String,
}

impl PointerRecord {
    pub fn new(address: Option<Address>, path: impl Into<String>) -> Self {
        Self {
            address,
            path: path.into(),
        }
    }

    /// A pointer with no manifest yet.
    pub fn empty(path: impl Into<String>) -> Self {
        Self::new(None, path)
    }
}

/// One element of `outs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Out {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<Address>,
    pub path: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// A whole pointer document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerFile {
    pub outs: Vec<Out>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl PointerFile {
    /// Parse a pointer document read from `path`.
    pub fn decode(data: &[u8], path: &str) -> Result<Self> {
        serde_yaml::from_slice(data).map_err(|e| Error::invalid_pointer(path, e.to_string()))
    }

    /// Render the document.
    pub fn encode(&self, path: &str) -> Result<Vec<u8>> {
        serde_yaml::to_string(self)
            .map(String::into_bytes)
            .map_err(|e| Error::invalid_pointer(path, e.to_string()))
    }

    /// The tracked folder, taken from the first out.
    ///
    /// Fails if there is no out or if its hash names a plain file.
    pub fn tracked_folder(&self, path: &str) -> Result<PointerRecord> {
        let out = self
            .outs
            .first()
            .ok_or_else(|| Error::invalid_pointer(path, "no `outs` entry"))?;

        if let Some(address) = &out.md5
            && !address.is_directory()
        {
            return Err(Error::invalid_pointer(
                path,
                format!("{} tracks a file, not a directory", address),
            ));
        }

        Ok(PointerRecord::new(out.md5, out.path.clone()))
    }

    /// Point the first out at a new manifest.
    ///
    /// Refreshes `nfiles` and grows `size` by `added_bytes` when the document
    /// already carries them.
    pub fn update(
        &mut self,
        record: &PointerRecord,
        nfiles: usize,
        added_bytes: u64,
        path: &str,
    ) -> Result<()> {
        let out = self
            .outs
            .first_mut()
            .ok_or_else(|| Error::invalid_pointer(path, "no `outs` entry"))?;

        out.md5 = record.address;
        out.path = record.path.clone();

        let nfiles_key = Value::from("nfiles");
        if out.extra.contains_key(&nfiles_key) {
            out.extra.insert(nfiles_key, Value::from(nfiles as u64));
        }

        let size_key = Value::from("size");
        if let Some(size) = out.extra.get(&size_key).and_then(Value::as_u64) {
            out.extra
                .insert(size_key, Value::from(size.saturating_add(added_bytes)));
        }

        Ok(())
    }
}
