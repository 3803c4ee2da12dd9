//! # dvcup Core
//!
//! Add files to DVC-tracked folders without a DVC installation.
//!
//! Data lives in a content-addressed remote keyed by MD5. A tracked folder is
//! described by a directory manifest (itself a stored object, addressed
//! `<md5>.dir`) and a small pointer file in the repository naming the
//! current manifest. Adding a file stores its bytes, stores a new manifest
//! with one more entry, and hands back the new pointer.
//!
//! ## Features
//!
//! - Local-directory and HTTP remotes with the `ab/cdef…` shard layout
//! - `.dvc/config` parsing and remote resolution
//! - Append-only manifest merge with byte-stable encoding
//! - Pointer file rewrite that keeps unknown keys
//!
//! ## Example
//!
//! ```no_run
//! use dvcup_core::{DirTree, LocalFiles, UploadRequest, upload};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tree = DirTree::new("./my-project");
//! let report = upload(
//!     &mut tree,
//!     &LocalFiles,
//!     &UploadRequest {
//!         file: "./measurements.csv",
//!         pointer_path: "dataset.dvc",
//!         relpath: None,
//!         remote: None,
//!         message: None,
//!     },
//! )?;
//! println!("{} -> {:?}", report.file, report.pointer.address);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod hash;
mod http;
mod local;
mod manifest;
mod pointer;
mod registry;
mod store;
mod sync;
mod upload;

pub use config::{Config, Entry, Section};
pub use error::{Error, ErrorKind, Result};
pub use hash::{Address, DIR_SUFFIX, HASH_SIZE, Hash};
pub use http::HttpRemote;
pub use local::LocalRemote;
pub use manifest::{DirectoryManifest, ManifestEntry};
pub use pointer::{Out, PointerFile, PointerRecord};
pub use registry::{BackendConfig, StoreRegistry};
pub use store::{ObjectStore, Remote};
pub use sync::{ManifestSync, MergeOutcome};
pub use upload::{
    CONFIG_PATH, DirTree, FileSource, LOCAL_CONFIG_PATH, LocalFiles, UploadReport, UploadRequest,
    VersionedTree, list, load_config, load_pointer, resolve_in, upload,
};
