//! Resolving the commit that `HEAD` currently points at.
//!
//! Reads the ref files directly instead of asking git:
//!
//! 1. `HEAD` holds `ref: <refname>` (or a bare id when detached).
//! 2. A loose ref file at `<git_dir>/<refname>` wins if it holds an id.
//! 3. Otherwise the id paired with `<refname>` in `packed-refs` wins.
//!
//! When `packed-refs` does not exist at all, `git gc` is run once to produce
//! it and the read is retried. A second miss is an error.
//!
//! Concurrent callers share one resolution, and the id is cached for the
//! volatile lifetime because the branch can move at any time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use gitvfs_types::{is_oid, GitError, Oid, Result};
use tokio::fs;

use crate::cache::{CacheKey, Coalescer};
use crate::config::CacheLifetimes;
use crate::process::GitRunner;

/// What the head-pointer file says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadRef {
    /// `ref: refs/heads/<branch>`
    Symbolic(String),
    /// A detached head holding an id directly.
    Detached(Oid),
}

/// Resolves `HEAD` to a fixed commit id.
#[derive(Debug, Clone)]
pub struct HeadResolver {
    git_dir: PathBuf,
    runner: Arc<dyn GitRunner>,
    cache: Coalescer<Oid>,
    lifetime: Duration,
}

impl HeadResolver {
    pub fn new(
        git_dir: impl Into<PathBuf>,
        runner: Arc<dyn GitRunner>,
        lifetimes: CacheLifetimes,
    ) -> Self {
        Self {
            git_dir: git_dir.into(),
            runner,
            cache: Coalescer::new("head", lifetimes),
            lifetime: lifetimes.volatile,
        }
    }

    /// The commit id `HEAD` currently resolves to.
    pub async fn resolve(&self) -> Result<Oid> {
        let git_dir = self.git_dir.clone();
        let runner = Arc::clone(&self.runner);
        self.cache
            .fetch_keyed(CacheKey::unversioned(&["HEAD"]), self.lifetime, move || {
                resolve_head(git_dir, runner)
            })
            .await
    }

    /// The cache holding the resolved id.
    pub fn cache(&self) -> &Coalescer<Oid> {
        &self.cache
    }
}

async fn resolve_head(git_dir: PathBuf, runner: Arc<dyn GitRunner>) -> Result<Oid> {
    let refname = match read_head(&git_dir).await? {
        HeadRef::Detached(oid) => return Ok(oid),
        HeadRef::Symbolic(refname) => refname,
    };

    let packed_path = git_dir.join("packed-refs");
    let mut gc_failure = None;
    if !exists(&packed_path).await? {
        // TODO: a narrower "no refs at all" check may be what this really
        // wants; gc is kept as the one-shot self-heal until that is settled.
        tracing::warn!(git_dir = %git_dir.display(), "packed-refs missing, running git gc once");
        if let Err(e) = runner.run(&["gc".to_string()]).await {
            tracing::warn!(error = %e, "git gc failed");
            gc_failure = Some(e);
        }
    }

    let packed = fs::read_to_string(&packed_path).await.map_err(|e| {
        let mut err = GitError::io(&e, Some(packed_path.clone()));
        if let (Some(gc), GitError::Io { message, .. }) = (&gc_failure, &mut err) {
            message.push_str(&format!(" (git gc failed: {gc})"));
        }
        err
    })?;
    let loose = read_optional(&git_dir.join(&refname)).await?;

    let oid = pick_head_id(&refname, loose.as_deref(), &packed)?;
    tracing::debug!(%refname, head = oid.short(10), "resolved head");
    Ok(oid)
}

/// Read and parse `<git_dir>/HEAD`.
pub async fn read_head(git_dir: &Path) -> Result<HeadRef> {
    let path = git_dir.join("HEAD");
    let text = fs::read_to_string(&path)
        .await
        .map_err(|e| GitError::io(&e, Some(path)))?;
    parse_head(&text)
}

/// Parse the content of a head-pointer file.
pub fn parse_head(text: &str) -> Result<HeadRef> {
    let line = text.lines().next().unwrap_or("").trim_end();
    if let Some(refname) = line.strip_prefix("ref:") {
        let refname = refname.trim();
        if refname.is_empty() || refname.split('/').any(|c| c == ".." || c.is_empty()) {
            return Err(GitError::parse(format!("malformed symbolic ref in HEAD: {line:?}")));
        }
        return Ok(HeadRef::Symbolic(refname.to_string()));
    }
    if is_oid(line) {
        return Oid::parse(line).map(HeadRef::Detached);
    }
    Err(GitError::parse(format!("malformed HEAD: {line:?}")))
}

/// Choose the id for `refname`: the loose ref if it holds one, otherwise the
/// matching `packed-refs` line.
pub fn pick_head_id(refname: &str, loose: Option<&str>, packed: &str) -> Result<Oid> {
    if let Some(oid) = loose.and_then(loose_ref_id) {
        return Ok(oid);
    }
    packed_ref_id(packed, refname).ok_or_else(|| {
        GitError::not_found(
            format!("ref {refname} not found in loose refs or packed-refs"),
            Some(refname.to_string()),
        )
    })
}

fn loose_ref_id(text: &str) -> Option<Oid> {
    let line = text.lines().next()?.trim();
    Oid::parse(line).ok()
}

fn packed_ref_id(packed: &str, refname: &str) -> Option<Oid> {
    packed
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
        .filter_map(|line| line.split_once(' '))
        .find(|(_, name)| name.trim_end() == refname)
        .and_then(|(id, _)| Oid::parse(id).ok())
}

async fn exists(path: &Path) -> Result<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| GitError::io(&e, Some(path.to_path_buf())))
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(GitError::io(&e, Some(path.to_path_buf()))),
    }
}
