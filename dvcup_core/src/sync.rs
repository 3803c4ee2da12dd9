//! Growing a tracked folder's manifest by one entry.

use crate::error::Result;
use crate::manifest::{DirectoryManifest, ManifestEntry};
use crate::pointer::PointerRecord;
use crate::store::ObjectStore;
use tracing::{debug, info};

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Pointer to persist in place of the old one.
    pub pointer: PointerRecord,
    /// The manifest stored under `pointer.address`.
    pub manifest: DirectoryManifest,
}

/// Reads and extends directory manifests held in one object store.
///
/// Nothing is ever overwritten: the new manifest is a new object and the old
/// manifest and pointer stay valid until the caller commits the new pointer.
pub struct ManifestSync<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> ManifestSync<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Fetch the manifest a pointer names.
    ///
    /// A pointer without an address has never been populated and yields an
    /// empty manifest.
    pub fn load(&self, pointer: &PointerRecord) -> Result<DirectoryManifest> {
        let Some(address) = &pointer.address else {
            debug!(path = %pointer.path, "pointer has no manifest yet, starting empty");
            return Ok(DirectoryManifest::new());
        };

        let data = self.store.get_bytes(address)?;
        let manifest = DirectoryManifest::decode(&data, address)?;
        debug!(%address, entries = manifest.len(), "loaded manifest");
        Ok(manifest)
    }

    /// Append `entry` to the pointer's manifest and store the result.
    ///
    /// The object for `entry.md5` must already be stored.
    pub fn merge(&self, pointer: &PointerRecord, entry: ManifestEntry) -> Result<MergeOutcome> {
        let mut manifest = self.load(pointer)?;
        manifest.push(entry);

        let data = manifest.encode()?;
        let address = manifest.address()?;
        self.store.put_bytes(&address, &data)?;

        let old = pointer
            .address
            .map(|a| a.to_key())
            .unwrap_or_else(|| "-".to_string());
        info!(
            %old,
            new = %address,
            entries = manifest.len(),
            "stored manifest"
        );

        Ok(MergeOutcome {
            pointer: PointerRecord::new(Some(address), pointer.path.clone()),
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hash::{Address, Hash};
    use crate::local::LocalRemote;
    use tempfile::TempDir;

    fn entry(data: &[u8], relpath: &str) -> ManifestEntry {
        ManifestEntry::new(Hash::hash_bytes(data), relpath)
    }

    #[test]
    fn test_merge_into_empty_pointer() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalRemote::new(temp_dir.path());
        let sync = ManifestSync::new(&store);

        let hash = Hash::from_hex("deadbeefdeadbeefdeadbeefdeadbeef").unwrap();
        let outcome = sync
            .merge(&PointerRecord::empty("dataset"), ManifestEntry::new(hash, "x.csv"))
            .unwrap();

        let expected_bytes =
            b"[{\"md5\":\"deadbeefdeadbeefdeadbeefdeadbeef\",\"relpath\":\"x.csv\"}]\n";
        let h = Hash::hash_bytes(expected_bytes);
        let address = outcome.pointer.address.unwrap();
        assert_eq!(address.to_key(), h.as_directory_tag());
        assert_eq!(outcome.pointer.path, "dataset");
        assert_eq!(outcome.manifest.len(), 1);

        assert_eq!(store.get_bytes(&address).unwrap(), expected_bytes);
    }

    #[test]
    fn test_merge_appends_to_existing() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalRemote::new(temp_dir.path());
        let sync = ManifestSync::new(&store);

        let first = sync
            .merge(&PointerRecord::empty("dataset"), entry(b"one", "one.txt"))
            .unwrap();
        let second = sync.merge(&first.pointer, entry(b"two", "two.txt")).unwrap();

        let reloaded = sync.load(&second.pointer).unwrap();
        let relpaths: Vec<_> = reloaded.entries().iter().map(|e| e.relpath.as_str()).collect();
        assert_eq!(relpaths, vec!["one.txt", "two.txt"]);

        // Old manifest is still intact
        assert_eq!(sync.load(&first.pointer).unwrap().len(), 1);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalRemote::new(temp_dir.path());
        let sync = ManifestSync::new(&store);

        let base = sync
            .merge(&PointerRecord::empty("dataset"), entry(b"base", "base.txt"))
            .unwrap();
        let a = sync.merge(&base.pointer, entry(b"new", "new.txt")).unwrap();
        let b = sync.merge(&base.pointer, entry(b"new", "new.txt")).unwrap();
        assert_eq!(a.pointer, b.pointer);
    }

    #[test]
    fn test_same_path_twice_keeps_both() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalRemote::new(temp_dir.path());
        let sync = ManifestSync::new(&store);

        let first = sync
            .merge(&PointerRecord::empty("dataset"), entry(b"h1", "a.txt"))
            .unwrap();
        let second = sync.merge(&first.pointer, entry(b"h2", "a.txt")).unwrap();

        let entries = second.manifest.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].md5, Hash::hash_bytes(b"h1"));
        assert_eq!(entries[1].md5, Hash::hash_bytes(b"h2"));
    }

    #[test]
    fn test_missing_manifest_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalRemote::new(temp_dir.path());
        let sync = ManifestSync::new(&store);

        let ghost = Address::directory(Hash::hash_bytes(b"never stored"));
        let pointer = PointerRecord::new(Some(ghost), "dataset");
        let err = sync.merge(&pointer, entry(b"x", "x.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // Nothing was written
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_corrupt_manifest_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalRemote::new(temp_dir.path());
        let bad = Address::directory(Hash::hash_bytes(b"oops"));
        store.put_bytes(&bad, b"oops").unwrap();

        let sync = ManifestSync::new(&store);
        let err = sync
            .merge(&PointerRecord::new(Some(bad), "dataset"), entry(b"x", "x.txt"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    }
}
