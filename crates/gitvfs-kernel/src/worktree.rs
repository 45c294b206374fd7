//! Working-copy backend for the live revision.
//!
//! Read-only access to the files under a repository's working tree. Paths
//! are relative to the root: if the root is `/home/amy/project`, then
//! `read("src/main.rs")` reads `/home/amy/project/src/main.rs`.

use std::path::{Component, Path, PathBuf};

use futures::future::try_join_all;
use gitvfs_types::{DirListing, GitError, Result};
use tokio::fs;

/// Kind of a working-copy entry, as seen through `stat` (symlinks followed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// The live working copy on the host filesystem.
#[derive(Debug, Clone)]
pub struct WorkTree {
    root: PathBuf,
}

impl WorkTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path to an absolute path within the root.
    ///
    /// Normalizes `.` and `..` lexically; a path that would climb out of the
    /// root is refused before touching the disk.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut normalized = self.root.clone();
        let mut depth = 0usize;
        for component in Path::new(path).components() {
            match component {
                Component::Normal(c) => {
                    normalized.push(c);
                    depth += 1;
                }
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(escape_error(path));
                    }
                    normalized.pop();
                    depth -= 1;
                }
                // leading `/` and `.` are relative to the root
                Component::RootDir | Component::CurDir => {}
                Component::Prefix(_) => return Err(escape_error(path)),
            }
        }
        Ok(normalized)
    }

    /// Read a file's bytes.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        fs::read(&full)
            .await
            .map_err(|e| GitError::io(&e, Some(PathBuf::from(path))))
    }

    /// Whether `path` is a file or directory.
    pub async fn stat(&self, path: &str) -> Result<EntryKind> {
        let full = self.resolve(path)?;
        stat_kind(&full, path).await
    }

    /// List a directory, classifying every entry with `stat`.
    ///
    /// The per-entry checks run concurrently; the listing is returned only
    /// once all of them succeed, and the first failure aborts it.
    pub async fn list(&self, path: &str) -> Result<DirListing> {
        let full = self.resolve(path)?;
        let io_err = |e: std::io::Error| GitError::io(&e, Some(PathBuf::from(path)));

        let mut names = Vec::new();
        let mut dir = fs::read_dir(&full).await.map_err(io_err)?;
        while let Some(entry) = dir.next_entry().await.map_err(io_err)? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        let checks = names.iter().map(|name| {
            let entry_path = full.join(name);
            let display = Path::new(path).join(name);
            async move {
                let kind = stat_kind(&entry_path, &display.to_string_lossy()).await?;
                Ok::<_, GitError>(kind)
            }
        });
        let kinds = try_join_all(checks).await?;

        let mut listing = DirListing::new();
        for (name, kind) in names.into_iter().zip(kinds) {
            match kind {
                EntryKind::Directory => listing.dirs.push(name),
                EntryKind::File => listing.files.push(name),
            }
        }
        Ok(listing)
    }
}

async fn stat_kind(full: &Path, display: &str) -> Result<EntryKind> {
    // follows symlinks; special files count as files
    let meta = fs::metadata(full)
        .await
        .map_err(|e| GitError::io(&e, Some(PathBuf::from(display))))?;
    Ok(if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    })
}

fn escape_error(path: &str) -> GitError {
    GitError::Io {
        kind: std::io::ErrorKind::PermissionDenied,
        message: format!("path escapes working tree: {path:?}"),
        path: Some(PathBuf::from(path)),
    }
}
