//! gitvfs-kernel: a cached, read-only, versioned filesystem over git.
//!
//! This crate provides:
//!
//! - **Process**: the git subprocess protocol and failure classification
//! - **Head**: resolving `HEAD` to a commit id from the ref files
//! - **Cache**: request coalescing and memoization keyed by revision
//! - **Readers**: file content, directory listings and per-path history
//! - **GitFs**: one repository's context, and revision-pinned views of it
//!
//! Revisions are either the live working copy (`"fs"`) or a 40-hex commit
//! id. Results under a commit id are cached for the stable lifetime; live
//! results and the resolved head only for the volatile one.

pub mod cache;
pub mod config;
pub mod content;
pub mod gitfs;
pub mod head;
pub mod history;
pub mod process;
pub mod repo;
pub mod tree;
pub mod vfs;
pub mod worktree;

#[cfg(test)]
mod testing;

pub use cache::{CacheKey, Coalescer};
pub use config::{CacheLifetimes, ConfigError, GitVfsConfig};
pub use content::ContentReader;
pub use gitfs::{GitFs, RevisionView};
pub use head::{HeadRef, HeadResolver};
pub use history::HistoryReader;
pub use process::{GitProcess, GitRunner};
pub use repo::RepositoryHandle;
pub use tree::TreeReader;
pub use vfs::VersionedFilesystem;
pub use worktree::WorkTree;

pub use gitvfs_types::{
    Content, DirListing, Encoding, ErrorKind, GitError, History, LogEntry, Oid, Result, Revision,
    LIVE_SENTINEL,
};
