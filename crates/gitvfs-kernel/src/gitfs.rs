//! The repository context and its public entry points.
//!
//! A [`GitFs`] owns everything tied to one repository: the handle, the git
//! runner, the head resolver and each reader's cache. Two `GitFs` values
//! opened on different repositories share nothing; clones of one share all
//! of it.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use gitvfs_types::{Content, DirListing, Encoding, History, Oid, Result, Revision};

use crate::cache::Coalescer;
use crate::config::GitVfsConfig;
use crate::content::{no_work_tree, ContentReader};
use crate::head::HeadResolver;
use crate::history::HistoryReader;
use crate::process::{GitProcess, GitRunner};
use crate::repo::RepositoryHandle;
use crate::tree::TreeReader;
use crate::vfs::VersionedFilesystem;
use crate::worktree::WorkTree;

/// A cached, read-only, versioned view of one git repository.
#[derive(Debug, Clone)]
pub struct GitFs {
    inner: Arc<Context>,
}

#[derive(Debug)]
struct Context {
    repo: RepositoryHandle,
    config: GitVfsConfig,
    head: HeadResolver,
    content: ContentReader,
    tree: TreeReader,
    history: HistoryReader,
}

impl GitFs {
    /// Open the repository at `path`, running the configured git binary.
    pub async fn open(path: impl AsRef<Path>, config: GitVfsConfig) -> Result<Self> {
        let repo = RepositoryHandle::open(path).await?;
        let runner = GitProcess::new(config.git_binary.clone(), repo.git_args());
        tracing::debug!(
            git_dir = %repo.git_dir().display(),
            bare = repo.is_bare(),
            "opened repository"
        );
        Ok(Self::with_runner(repo, Arc::new(runner), config))
    }

    /// Build a context around an existing handle and runner.
    pub fn with_runner(
        repo: RepositoryHandle,
        runner: Arc<dyn GitRunner>,
        config: GitVfsConfig,
    ) -> Self {
        let lifetimes = config.cache;
        let work_tree = repo.work_tree().map(WorkTree::new);

        let head = HeadResolver::new(repo.git_dir(), Arc::clone(&runner), lifetimes);
        let content = ContentReader::new(Arc::clone(&runner), work_tree.clone(), lifetimes);
        let tree = TreeReader::new(content.clone(), work_tree, lifetimes);
        let history = HistoryReader::new(runner, head.clone(), lifetimes);

        Self {
            inner: Arc::new(Context {
                repo,
                config,
                head,
                content,
                tree,
                history,
            }),
        }
    }

    pub fn repository(&self) -> &RepositoryHandle {
        &self.inner.repo
    }

    pub fn config(&self) -> &GitVfsConfig {
        &self.inner.config
    }

    /// Read `path` at `revision`, raw or decoded.
    pub async fn read(
        &self,
        revision: &str,
        path: &str,
        encoding: Option<Encoding>,
    ) -> Result<Content> {
        self.inner.content.read(revision, path, encoding).await
    }

    pub async fn read_bytes(&self, revision: &str, path: &str) -> Result<Vec<u8>> {
        Ok(self.read(revision, path, None).await?.into_bytes())
    }

    pub async fn read_to_string(&self, revision: &str, path: &str) -> Result<String> {
        let content = self.read(revision, path, Some(Encoding::Utf8)).await?;
        Ok(match content {
            Content::Text(text) => text,
            Content::Bytes(bytes) => Encoding::Utf8.decode(&bytes),
        })
    }

    /// List directory `path` at `revision`.
    pub async fn list(&self, revision: &str, path: &str) -> Result<DirListing> {
        self.inner.tree.list(revision, path).await
    }

    /// Commit history of `path` as of the current head.
    pub async fn log(&self, path: &str) -> Result<History> {
        self.inner.history.log(path).await
    }

    /// The commit id `HEAD` resolves to right now.
    pub async fn head(&self) -> Result<Oid> {
        self.inner.head.resolve().await
    }

    /// The revision consumers should treat as "current".
    ///
    /// With a working copy and `force` unset, that is the live revision.
    /// Otherwise it is the committed head.
    pub async fn head_revision(&self, force: bool) -> Result<Revision> {
        if !force && !self.inner.repo.is_bare() {
            return Ok(Revision::Live);
        }
        self.head().await.map(Revision::Fixed)
    }

    /// A filesystem view pinned to `revision`.
    pub fn at(&self, revision: &str) -> Result<RevisionView> {
        let revision = Revision::parse(revision)?;
        if revision.is_live() && self.inner.repo.is_bare() {
            return Err(no_work_tree(revision.as_str()));
        }
        Ok(RevisionView {
            fs: self.clone(),
            revision,
        })
    }

    /// A new coalescing cache with this repository's lifetimes, for callers
    /// memoizing their own revision-dependent work.
    pub fn coalescer<V>(&self, name: &'static str) -> Coalescer<V>
    where
        V: Clone + Send + 'static,
    {
        Coalescer::new(name, self.inner.config.cache)
    }

    /// Forget every cached result, including the resolved head. In-flight
    /// requests still complete.
    pub fn clear_caches(&self) {
        self.inner.head.cache().clear();
        self.inner.content.cache().clear();
        self.inner.tree.cache().clear();
        self.inner.history.cache().clear();
    }
}

/// A [`GitFs`] pinned to one revision.
#[derive(Debug, Clone)]
pub struct RevisionView {
    fs: GitFs,
    revision: Revision,
}

#[async_trait]
impl VersionedFilesystem for RevisionView {
    fn revision(&self) -> &Revision {
        &self.revision
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.fs.read_bytes(self.revision.as_str(), path).await
    }

    async fn list(&self, path: &str) -> Result<DirListing> {
        self.fs.list(self.revision.as_str(), path).await
    }
}
