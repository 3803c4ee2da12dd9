//! Adding a file to a tracked folder, end to end.
//!
//! The repository holding `.dvc/config` and the pointer file is reached
//! through [`VersionedTree`]; the file being uploaded through [`FileSource`].

use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::hash::{Address, Hash};
use crate::manifest::{DirectoryManifest, ManifestEntry};
use crate::pointer::{PointerFile, PointerRecord};
use crate::registry::StoreRegistry;
use crate::store::{ObjectStore, Remote};
use crate::sync::ManifestSync;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Repository config, relative to the tree root.
pub const CONFIG_PATH: &str = ".dvc/config";
/// Uncommitted per-checkout overrides.
pub const LOCAL_CONFIG_PATH: &str = ".dvc/config.local";

/// The versioned working tree that holds config and pointer files.
pub trait VersionedTree {
    /// Open the file at `path` (relative to the tree root).
    fn read(&self, path: &str) -> Result<Box<dyn Read>>;

    /// Replace the file at `path` with the contents of `data`.
    fn write(&mut self, path: &str, data: &mut dyn Read) -> Result<()>;

    /// Record every write since the last call and publish it. Returns a change id.
    fn record_and_publish(&mut self, message: &str) -> Result<String>;
}

/// Where uploaded files come from. Each `open` starts from the beginning.
pub trait FileSource {
    fn open(&self, name: &str) -> Result<Box<dyn Read>>;
}

/// Files on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFiles;

impl FileSource for LocalFiles {
    fn open(&self, name: &str) -> Result<Box<dyn Read>> {
        let file = fs::File::open(name).map_err(|e| Error::io_at(name, e))?;
        Ok(Box::new(file))
    }
}

/// A plain directory used as a tree. Changes are not versioned; the id
/// returned by `record_and_publish` is the MD5 of the message and the
/// written paths and contents.
#[derive(Debug)]
pub struct DirTree {
    root: PathBuf,
    pending: Vec<String>,
}

impl DirTree {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            pending: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        resolve_in(&self.root, path)
    }
}

/// Join a tree-relative path onto `root`, refusing anything that escapes it.
pub fn resolve_in(root: &Path, path: &str) -> Result<PathBuf> {
    let relative = Path::new(path);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(Error::io_at(
            relative,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "path must be relative and stay inside the tree",
            ),
        ));
    }
    Ok(root.join(relative))
}

impl VersionedTree for DirTree {
    fn read(&self, path: &str) -> Result<Box<dyn Read>> {
        let full = self.resolve(path)?;
        let file = fs::File::open(&full).map_err(|e| Error::io_at(&full, e))?;
        Ok(Box::new(file))
    }

    fn write(&mut self, path: &str, data: &mut dyn Read) -> Result<()> {
        let full = self.resolve(path)?;
        let parent = full.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&parent).map_err(|e| Error::io_at(&parent, e))?;

        let mut temp_file =
            tempfile::NamedTempFile::new_in(&parent).map_err(|e| Error::io_at(&parent, e))?;
        io::copy(data, &mut temp_file).map_err(|e| Error::io_at(&full, e))?;
        temp_file.flush().map_err(|e| Error::io_at(&full, e))?;
        temp_file
            .persist(&full)
            .map_err(|e| Error::io_at(&full, e.error))?;

        if !self.pending.iter().any(|p| p == path) {
            self.pending.push(path.to_string());
        }
        Ok(())
    }

    fn record_and_publish(&mut self, message: &str) -> Result<String> {
        let mut context = md5::Context::new();
        context.consume(message.as_bytes());
        for path in self.pending.drain(..) {
            let full = resolve_in(&self.root, &path)?;
            let data = fs::read(&full).map_err(|e| Error::io_at(&full, e))?;
            context.consume(path.as_bytes());
            context.consume(&data);
        }
        Ok(Hash::from_bytes(context.compute().0).to_hex())
    }
}

fn read_all(tree: &dyn VersionedTree, path: &str) -> Result<Vec<u8>> {
    let mut reader = tree.read(path)?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data).map_err(|e| Error::io_at(path, e))?;
    Ok(data)
}

/// Load `.dvc/config`, overlaid by `.dvc/config.local` when present.
pub fn load_config(tree: &dyn VersionedTree) -> Result<Config> {
    let mut config = parse_config(&read_all(tree, CONFIG_PATH)?)?;
    match read_all(tree, LOCAL_CONFIG_PATH) {
        Ok(data) => config.merge(parse_config(&data)?),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    Ok(config)
}

fn parse_config(data: &[u8]) -> Result<Config> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::invalid_config(None, format!("not UTF-8: {}", e)))?;
    Config::parse(text)
}

/// Read the pointer file at `path`.
pub fn load_pointer(tree: &dyn VersionedTree, path: &str) -> Result<PointerFile> {
    PointerFile::decode(&read_all(tree, path)?, path)
}

/// What to upload and where.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    /// Name passed to the [`FileSource`].
    pub file: &'a str,
    /// Pointer file of the tracked folder, relative to the tree root.
    pub pointer_path: &'a str,
    /// Path of the file inside the folder; defaults to the file name of `file`.
    pub relpath: Option<&'a str>,
    /// Remote to use instead of `core.remote`.
    pub remote: Option<&'a str>,
    /// Change description; a default naming the file is used otherwise.
    pub message: Option<&'a str>,
}

/// Outcome of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub file: Address,
    pub relpath: String,
    pub size: u64,
    pub remote: String,
    pub pointer: PointerRecord,
    pub entries: usize,
    pub change_id: String,
}

fn default_relpath(file: &str) -> Result<String> {
    Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::io_at(
                file,
                io::Error::new(io::ErrorKind::InvalidInput, "cannot derive a file name"),
            )
        })
}

fn select_store<'r>(registry: &'r StoreRegistry, remote: Option<&str>) -> Result<&'r Remote> {
    match remote {
        Some(name) => registry.get(name),
        None => registry.default_store(),
    }
}

/// Upload a file and add it to a tracked folder.
///
/// The file object is stored first, then the grown manifest, and only then
/// is the pointer file rewritten and recorded. A failure at any step leaves
/// the current pointer untouched.
pub fn upload(
    tree: &mut dyn VersionedTree,
    files: &dyn FileSource,
    request: &UploadRequest<'_>,
) -> Result<UploadReport> {
    let registry = StoreRegistry::resolve(&load_config(tree)?)?;
    let store = select_store(&registry, request.remote)?;
    info!(remote = %store.location(), kind = store.kind(), "using remote");

    let (hash, size) = Hash::hash_reader_counted(files.open(request.file)?)?;
    let file_address = Address::file(hash);
    info!(file = request.file, %file_address, size, "hashed file");

    let mut reader = files.open(request.file)?;
    store.put(&file_address, &mut reader)?;
    info!(%file_address, "file uploaded");

    let mut pointer_file = load_pointer(tree, request.pointer_path)?;
    let pointer = pointer_file.tracked_folder(request.pointer_path)?;

    let relpath = match request.relpath {
        Some(relpath) => relpath.to_string(),
        None => default_relpath(request.file)?,
    };
    let outcome = ManifestSync::new(store).merge(&pointer, ManifestEntry::new(hash, &*relpath))?;

    pointer_file.update(
        &outcome.pointer,
        outcome.manifest.len(),
        size,
        request.pointer_path,
    )?;
    let encoded = pointer_file.encode(request.pointer_path)?;
    tree.write(request.pointer_path, &mut encoded.as_slice())?;

    let message = match request.message {
        Some(message) => message.to_string(),
        None => format!("Add {} to {}", relpath, pointer.path),
    };
    let change_id = tree.record_and_publish(&message)?;
    info!(change = %change_id, pointer = request.pointer_path, "recorded pointer update");

    Ok(UploadReport {
        file: file_address,
        relpath,
        size,
        remote: store.location().to_string(),
        pointer: outcome.pointer,
        entries: outcome.manifest.len(),
        change_id,
    })
}

/// The pointer of a tracked folder and the manifest it names.
pub fn list(
    tree: &dyn VersionedTree,
    pointer_path: &str,
    remote: Option<&str>,
) -> Result<(PointerRecord, DirectoryManifest)> {
    let registry = StoreRegistry::resolve(&load_config(tree)?)?;
    let store = select_store(&registry, remote)?;
    let pointer = load_pointer(tree, pointer_path)?.tracked_folder(pointer_path)?;
    let manifest = ManifestSync::new(store).load(&pointer)?;
    Ok((pointer, manifest))
}
