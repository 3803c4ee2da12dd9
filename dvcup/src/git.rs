//! Git checkout used as the versioned tree.

use anyhow::{Context, Result};
use dvcup_core::{Error, VersionedTree, resolve_in};
use git2::{Repository, Signature, build::RepoBuilder};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const FALLBACK_NAME: &str = "dvc uploader";
const FALLBACK_EMAIL: &str = "dvcup@localhost";

/// A git working tree. Writes are staged and committed on `record_and_publish`.
pub struct GitTree {
    repo: Repository,
    workdir: PathBuf,
    pending: Vec<String>,
    push: bool,
    // Keeps a cloned checkout alive for the lifetime of the tree
    _scratch: Option<TempDir>,
}

fn git_error(err: git2::Error) -> Error {
    Error::from(io::Error::other(err))
}

impl GitTree {
    /// Open an existing checkout, or clone `location` into a scratch directory.
    ///
    /// Bare repositories are cloned like URLs. A cloned checkout is dropped
    /// with the tree, so a cloned tree pushes on every `record_and_publish`.
    pub fn open_or_clone(location: &str, branch: Option<&str>, push: bool) -> Result<Self> {
        if Path::new(location).is_dir() {
            let repo = Repository::open(location)
                .with_context(|| format!("Failed to open git repository at {}", location))?;
            if !repo.is_bare() {
                return Self::checkout(repo, location, branch, push);
            }
            debug!(%location, "bare repository, cloning");
        }
        Self::clone_to_scratch(location, branch, push)
    }

    fn checkout(repo: Repository, location: &str, branch: Option<&str>, push: bool) -> Result<Self> {
        if let Some(branch) = branch {
            let head = repo.head().context("Repository has no HEAD")?;
            let current = head.shorthand().unwrap_or_default();
            if current != branch {
                anyhow::bail!(
                    "Checkout at {} is on branch {}, not {}",
                    location,
                    current,
                    branch
                );
            }
        }
        let workdir = repo
            .workdir()
            .with_context(|| format!("{} has no working directory", location))?
            .to_path_buf();

        Ok(Self {
            repo,
            workdir,
            pending: Vec::new(),
            push,
            _scratch: None,
        })
    }

    fn clone_to_scratch(location: &str, branch: Option<&str>, push: bool) -> Result<Self> {
        let scratch = TempDir::new().context("Failed to create scratch directory")?;
        let mut builder = RepoBuilder::new();
        if let Some(branch) = branch {
            builder.branch(branch);
        }
        let repo = builder
            .clone(location, scratch.path())
            .with_context(|| format!("Failed to clone {}", location))?;
        info!(%location, "cloned repository");
        if !push {
            debug!(%location, "clone is temporary, will push to origin");
        }

        Ok(Self {
            repo,
            workdir: scratch.path().to_path_buf(),
            pending: Vec::new(),
            push: true,
            _scratch: Some(scratch),
        })
    }

    fn commit(&self, message: &str) -> std::result::Result<git2::Oid, git2::Error> {
        let mut index = self.repo.index()?;
        for path in &self.pending {
            index.add_path(Path::new(path))?;
        }
        index.write()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;

        let signature = self
            .repo
            .signature()
            .or_else(|_| Signature::now(FALLBACK_NAME, FALLBACK_EMAIL))?;
        let parent = self.repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
    }

    fn push_head(&self) -> std::result::Result<(), git2::Error> {
        let head = self.repo.head()?;
        let refname = head
            .name()
            .ok_or_else(|| git2::Error::from_str("HEAD is not a valid UTF-8 reference"))?;
        let refspec = format!("{}:{}", refname, refname);
        let mut remote = self.repo.find_remote("origin")?;
        remote.push(&[refspec.as_str()], None)?;
        info!(%refname, "pushed to origin");
        Ok(())
    }
}

impl VersionedTree for GitTree {
    fn read(&self, path: &str) -> dvcup_core::Result<Box<dyn Read>> {
        let full = resolve_in(&self.workdir, path)?;
        let file = fs::File::open(&full).map_err(|e| Error::io_at(&full, e))?;
        Ok(Box::new(file))
    }

    fn write(&mut self, path: &str, data: &mut dyn Read) -> dvcup_core::Result<()> {
        let full = resolve_in(&self.workdir, path)?;
        let parent = full.parent().unwrap_or(&self.workdir).to_path_buf();
        fs::create_dir_all(&parent).map_err(|e| Error::io_at(&parent, e))?;

        let mut temp_file =
            NamedTempFile::new_in(&parent).map_err(|e| Error::io_at(&parent, e))?;
        io::copy(data, &mut temp_file).map_err(|e| Error::io_at(&full, e))?;
        temp_file.flush().map_err(|e| Error::io_at(&full, e))?;
        temp_file
            .persist(&full)
            .map_err(|e| Error::io_at(&full, e.error))?;

        if !self.pending.iter().any(|p| p == path) {
            self.pending.push(path.to_string());
        }
        debug!(%path, "staged for commit");
        Ok(())
    }

    fn record_and_publish(&mut self, message: &str) -> dvcup_core::Result<String> {
        let oid = self.commit(message).map_err(git_error)?;
        self.pending.clear();
        info!(commit = %oid, "committed");

        if self.push {
            self.push_head().map_err(git_error)?;
        }
        Ok(oid.to_string())
    }
}
