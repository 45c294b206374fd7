//! Repository discovery.
//!
//! A handle is either a working repository (`<root>/.git` exists, the live
//! revision reads `<root>`) or a bare one (the path itself is the metadata
//! directory, no live revision).

use std::path::{Path, PathBuf};

use gitvfs_types::{GitError, Result};
use tokio::fs;

/// Where a repository's metadata and working copy live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    git_dir: PathBuf,
    work_tree: Option<PathBuf>,
}

impl RepositoryHandle {
    /// Resolve a repository from a filesystem path.
    ///
    /// `<path>/.git` may be a directory or a `gitdir: <dir>` pointer file
    /// (linked worktrees, submodules). Otherwise `path` must itself be a
    /// metadata directory containing `HEAD`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path)
            .await
            .map_err(|e| GitError::bad_repository(path, e.to_string()))?;
        if !meta.is_dir() {
            return Err(GitError::bad_repository(path, "not a directory"));
        }

        let dot_git = path.join(".git");
        match fs::metadata(&dot_git).await {
            Ok(m) if m.is_dir() => {
                return Ok(Self {
                    git_dir: dot_git,
                    work_tree: Some(path.to_path_buf()),
                });
            }
            Ok(_) => {
                let git_dir = read_gitdir_pointer(path, &dot_git).await?;
                return Ok(Self {
                    git_dir,
                    work_tree: Some(path.to_path_buf()),
                });
            }
            Err(_) => {}
        }

        if fs::metadata(path.join("HEAD")).await.is_err() {
            return Err(GitError::bad_repository(
                path,
                "no .git directory and no HEAD file",
            ));
        }
        Ok(Self {
            git_dir: path.to_path_buf(),
            work_tree: None,
        })
    }

    /// Build a handle from known locations without touching the disk.
    pub fn from_parts(git_dir: impl Into<PathBuf>, work_tree: Option<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
            work_tree,
        }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn work_tree(&self) -> Option<&Path> {
        self.work_tree.as_deref()
    }

    pub fn is_bare(&self) -> bool {
        self.work_tree.is_none()
    }

    /// The repository-location flags prepended to every git command.
    pub fn git_args(&self) -> Vec<String> {
        let mut args = vec![format!("--git-dir={}", self.git_dir.display())];
        if let Some(work_tree) = &self.work_tree {
            args.push(format!("--work-tree={}", work_tree.display()));
        }
        args
    }
}

async fn read_gitdir_pointer(root: &Path, dot_git: &Path) -> Result<PathBuf> {
    let text = fs::read_to_string(dot_git)
        .await
        .map_err(|e| GitError::bad_repository(root, e.to_string()))?;
    let target = text
        .lines()
        .find_map(|line| line.strip_prefix("gitdir:"))
        .map(str::trim)
        .ok_or_else(|| GitError::bad_repository(root, ".git file has no gitdir line"))?;
    let target = Path::new(target);
    Ok(if target.is_absolute() {
        target.to_path_buf()
    } else {
        root.join(target)
    })
}
