//! Filesystem-backed object store.

use crate::error::{Error, Result};
use crate::hash::Address;
use crate::store::ObjectStore;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// An object store rooted at an absolute directory.
///
/// Layout: `<root>/<first 2 chars>/<remaining chars>`.
#[derive(Debug, Clone)]
pub struct LocalRemote {
    root: PathBuf,
    location: String,
}

impl LocalRemote {
    /// Create a store rooted at `root`. The directory is created lazily on first write.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let location = root.to_string_lossy().into_owned();
        Self { root, location }
    }

    /// Get the root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the path to an object file given its address.
    pub fn object_path(&self, address: &Address) -> PathBuf {
        self.root.join(address.prefix()).join(address.suffix())
    }
}

impl ObjectStore for LocalRemote {
    fn location(&self) -> &str {
        &self.location
    }

    fn exists(&self, address: &Address) -> Result<bool> {
        Ok(self.object_path(address).is_file())
    }

    fn put(&self, address: &Address, reader: &mut dyn Read) -> Result<()> {
        let obj_path = self.object_path(address);

        // Same address means same bytes
        if obj_path.is_file() {
            debug!(%address, path = %obj_path.display(), "object already present");
            return Ok(());
        }

        let shard_dir = self.root.join(address.prefix());
        fs::create_dir_all(&shard_dir).map_err(|e| Error::io_at(&shard_dir, e))?;

        let mut temp_file =
            tempfile::NamedTempFile::new_in(&shard_dir).map_err(|e| Error::io_at(&shard_dir, e))?;
        let written = io::copy(reader, &mut temp_file).map_err(|e| Error::io_at(&obj_path, e))?;
        temp_file.flush().map_err(|e| Error::io_at(&obj_path, e))?;
        temp_file
            .persist(&obj_path)
            .map_err(|e| Error::io_at(&obj_path, e.error))?;

        debug!(%address, path = %obj_path.display(), bytes = written, "stored object");
        Ok(())
    }

    fn get(&self, address: &Address) -> Result<Box<dyn Read>> {
        let obj_path = self.object_path(address);
        match fs::File::open(&obj_path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::object_not_found(address.to_key(), &self.location))
            }
            Err(e) => Err(Error::io_at(obj_path, e)),
        }
    }
}
