//! Object store capability set and backend dispatch.

use crate::error::Result;
use crate::hash::Address;
use crate::http::HttpRemote;
use crate::local::LocalRemote;
use std::io::Read;

/// A content-addressed object store.
///
/// Objects are immutable once written. Writing the same address twice is a
/// no-op success. No locking is done: two clients writing the same address
/// write the same bytes.
pub trait ObjectStore {
    /// Location string identifying the backend (root path or endpoint URL).
    fn location(&self) -> &str;

    /// Check whether an object is present.
    fn exists(&self, address: &Address) -> Result<bool>;

    /// Store the full contents of `reader` under `address`.
    fn put(&self, address: &Address, reader: &mut dyn Read) -> Result<()>;

    /// Open the object stored under `address` for reading.
    fn get(&self, address: &Address) -> Result<Box<dyn Read>>;

    /// Store an in-memory blob.
    fn put_bytes(&self, address: &Address, data: &[u8]) -> Result<()> {
        let mut reader = data;
        self.put(address, &mut reader)
    }

    /// Read a whole object into memory.
    fn get_bytes(&self, address: &Address) -> Result<Vec<u8>> {
        let mut reader = self.get(address)?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// A configured backend, classified once when the configuration is resolved.
#[derive(Debug)]
pub enum Remote {
    /// Filesystem root.
    Local(LocalRemote),
    /// HTTP(S) endpoint.
    Http(HttpRemote),
}

impl Remote {
    /// Short name of the backend kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Remote::Local(_) => "local",
            Remote::Http(_) => "http",
        }
    }
}

impl ObjectStore for Remote {
    fn location(&self) -> &str {
        match self {
            Remote::Local(remote) => remote.location(),
            Remote::Http(remote) => remote.location(),
        }
    }

    fn exists(&self, address: &Address) -> Result<bool> {
        match self {
            Remote::Local(remote) => remote.exists(address),
            Remote::Http(remote) => remote.exists(address),
        }
    }

    fn put(&self, address: &Address, reader: &mut dyn Read) -> Result<()> {
        match self {
            Remote::Local(remote) => remote.put(address, reader),
            Remote::Http(remote) => remote.put(address, reader),
        }
    }

    fn get(&self, address: &Address) -> Result<Box<dyn Read>> {
        match self {
            Remote::Local(remote) => remote.get(address),
            Remote::Http(remote) => remote.get(address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hash::Hash;
    use tempfile::TempDir;

    #[test]
    fn test_dispatch_to_local() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Remote::Local(LocalRemote::new(temp_dir.path()));
        assert_eq!(remote.kind(), "local");
        assert_eq!(remote.location(), temp_dir.path().to_string_lossy());

        let data = b"through the enum";
        let addr = Address::file(Hash::hash_bytes(data));
        remote.put_bytes(&addr, data).unwrap();
        assert!(remote.exists(&addr).unwrap());
        assert_eq!(remote.get_bytes(&addr).unwrap(), data);
    }

    #[test]
    fn test_missing_object_through_enum() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Remote::Local(LocalRemote::new(temp_dir.path()));
        let addr = Address::parse(&"0".repeat(32)).unwrap();
        let err = remote.get_bytes(&addr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
