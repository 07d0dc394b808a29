//! Removal of partial output after an interrupted or failed run.
//!
//! The pipeline only decides *that* the output must be discarded; how the
//! file system is cleaned is up to the [`ArtifactStore`].

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Cleanup collaborator invoked on the interrupt and failure paths.
pub trait ArtifactStore: Send + Sync + 'static {
    /// Removes the artifact file itself. A missing file is not an error.
    fn delete_artifact(&self, path: &Path) -> io::Result<()>;

    /// Removes the artifact's directory if nothing else is left in it.
    /// Returns `true` if the directory was removed.
    fn delete_parent_if_empty(&self, path: &Path) -> io::Result<bool>;

    /// Discards a partial artifact: the file always goes, its directory
    /// only when this file was its sole content.
    fn discard(&self, path: &Path) -> io::Result<()> {
        self.delete_artifact(path)?;
        if self.delete_parent_if_empty(path)? {
            debug!(path = %path.display(), "removed empty output directory");
        }
        Ok(())
    }
}

/// [`ArtifactStore`] backed by `std::fs`.
///
/// Empty directories are pruned upwards from the artifact's parent, but
/// never above `root`. Without a root only the immediate parent is pruned.
#[derive(Debug, Clone, Default)]
pub struct FsArtifactStore {
    root: Option<PathBuf>,
}

impl FsArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows pruning every empty directory between the artifact and `root`,
    /// `root` included.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn may_prune(&self, dir: &Path, first: bool) -> bool {
        match &self.root {
            Some(root) => dir.starts_with(root),
            None => first,
        }
    }
}

fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

impl ArtifactStore for FsArtifactStore {
    fn delete_artifact(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn delete_parent_if_empty(&self, path: &Path) -> io::Result<bool> {
        let mut removed = false;
        let mut current = path.parent();

        while let Some(dir) = current {
            if dir.as_os_str().is_empty() || !self.may_prune(dir, !removed) {
                break;
            }
            match is_empty_dir(dir) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(e) => return Err(e),
            }
            fs::remove_dir(dir)?;
            removed = true;
            current = dir.parent();
        }

        Ok(removed)
    }
}

/// An output file created for one run, plus the store that can discard it.
pub struct Artifact<S: ArtifactStore = FsArtifactStore> {
    path: PathBuf,
    store: S,
}

impl<S: ArtifactStore> Artifact<S> {
    /// Creates (or truncates) the file at `path` and returns a buffered
    /// writer for it alongside the artifact handle.
    pub fn create(path: impl Into<PathBuf>, store: S) -> io::Result<(Self, BufWriter<File>)> {
        let path = path.into();
        let file = File::create(&path)?;
        Ok((Self { path, store }, BufWriter::new(file)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the partial file, logging rather than failing so that the
    /// caller can still report the original reason the run ended.
    pub fn discard(&self) -> bool {
        match self.store.discard(&self.path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to discard partial output");
                false
            }
        }
    }
}
