//! File content at a revision.
//!
//! Fixed revisions ask git for `<id>:<path>`; the live revision reads the
//! working copy directly. Both go through the coalescing cache, so a fixed
//! read spawns git once per `(id, path, encoding)` for the stable lifetime.

use std::sync::Arc;

use gitvfs_types::{Content, Encoding, GitError, Result, Revision, LIVE_SENTINEL};

use crate::cache::Coalescer;
use crate::config::CacheLifetimes;
use crate::process::GitRunner;
use crate::worktree::WorkTree;

/// Reads file content at fixed or live revisions.
#[derive(Debug, Clone)]
pub struct ContentReader {
    runner: Arc<dyn GitRunner>,
    work_tree: Option<WorkTree>,
    cache: Coalescer<Content>,
}

impl ContentReader {
    pub fn new(
        runner: Arc<dyn GitRunner>,
        work_tree: Option<WorkTree>,
        lifetimes: CacheLifetimes,
    ) -> Self {
        Self {
            runner,
            work_tree,
            cache: Coalescer::new("content", lifetimes),
        }
    }

    /// Read `path` at `revision`.
    ///
    /// Returns [`Content::Bytes`] when `encoding` is `None`, decoded
    /// [`Content::Text`] otherwise.
    pub async fn read(
        &self,
        revision: &str,
        path: &str,
        encoding: Option<Encoding>,
    ) -> Result<Content> {
        let work_tree = live_work_tree(&self.work_tree, revision)?;
        let runner = Arc::clone(&self.runner);
        let owned_path = path.to_string();
        let encoding_part = encoding.map_or("raw", Encoding::name);

        self.cache
            .get_or_fetch(revision, &["read", path, encoding_part], move |revision| async move {
                match revision {
                    Revision::Live => {
                        let tree = work_tree.ok_or_else(|| no_work_tree(LIVE_SENTINEL))?;
                        let bytes = tree.read(&owned_path).await?;
                        Ok(Content::from_bytes(bytes, encoding))
                    }
                    Revision::Fixed(oid) => {
                        let object = format!("{oid}:{owned_path}");
                        runner.run_decoded(&["show".to_string(), object], encoding).await
                    }
                }
            })
            .await
    }

    /// The cache behind this reader.
    pub fn cache(&self) -> &Coalescer<Content> {
        &self.cache
    }
}

/// The working copy a live request needs, or `InvalidVersion` when the
/// repository is bare. Fixed revisions need none.
pub(crate) fn live_work_tree(
    work_tree: &Option<WorkTree>,
    revision: &str,
) -> Result<Option<WorkTree>> {
    if revision != LIVE_SENTINEL {
        return Ok(None);
    }
    work_tree
        .clone()
        .map(Some)
        .ok_or_else(|| no_work_tree(revision))
}

pub(crate) fn no_work_tree(revision: &str) -> GitError {
    GitError::InvalidVersion {
        version: revision.to_string(),
        detail: Some("repository has no working tree".to_string()),
    }
}
