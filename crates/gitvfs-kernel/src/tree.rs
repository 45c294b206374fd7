//! Directory listings at a revision.

use gitvfs_types::{DirListing, Encoding, GitError, Result, Revision, LIVE_SENTINEL};

use crate::cache::Coalescer;
use crate::config::CacheLifetimes;
use crate::content::{live_work_tree, no_work_tree, ContentReader};
use crate::worktree::WorkTree;

/// Lists directories at fixed or live revisions.
#[derive(Debug, Clone)]
pub struct TreeReader {
    content: ContentReader,
    work_tree: Option<WorkTree>,
    cache: Coalescer<DirListing>,
}

impl TreeReader {
    pub fn new(
        content: ContentReader,
        work_tree: Option<WorkTree>,
        lifetimes: CacheLifetimes,
    ) -> Self {
        Self {
            content,
            work_tree,
            cache: Coalescer::new("tree", lifetimes),
        }
    }

    /// List the entries of directory `path` at `revision`, split into files
    /// and directories.
    pub async fn list(&self, revision: &str, path: &str) -> Result<DirListing> {
        let work_tree = live_work_tree(&self.work_tree, revision)?;
        let content = self.content.clone();
        let owned_path = path.to_string();

        self.cache
            .get_or_fetch(revision, &["readdir", path], move |revision| async move {
                match revision {
                    Revision::Live => {
                        let tree = work_tree.ok_or_else(|| no_work_tree(LIVE_SENTINEL))?;
                        tree.list(&owned_path).await
                    }
                    Revision::Fixed(oid) => {
                        let text = content
                            .read(oid.as_str(), &owned_path, Some(Encoding::Utf8))
                            .await?;
                        parse_tree(text.as_text().unwrap_or_default())
                    }
                }
            })
            .await
    }

    pub fn cache(&self) -> &Coalescer<DirListing> {
        &self.cache
    }
}

/// Parse `git show <id>:<dir>` output.
///
/// The output is a `tree <id>:<dir>` line, a blank line, then one entry per
/// line with directories marked by a trailing `/`. Anything without that
/// header is not a directory.
pub fn parse_tree(text: &str) -> Result<DirListing> {
    let body = text
        .split_once("\n\n")
        .filter(|(header, _)| header.starts_with("tree ") && !header.contains('\n'))
        .map(|(_, body)| body)
        .ok_or_else(|| GitError::parse("not a directory"))?;

    let mut listing = DirListing::new();
    for entry in body.lines().filter(|line| !line.is_empty()) {
        match entry.strip_suffix('/') {
            Some(dir) => listing.dirs.push(dir.to_string()),
            None => listing.files.push(entry.to_string()),
        }
    }
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use gitvfs_types::ErrorKind;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    const SHA: &str = "26c8c846ba48d907ddd093b24b5d51e044c604b0";

    fn reader(runner: &ScriptedRunner, work_tree: Option<WorkTree>) -> TreeReader {
        let lifetimes = CacheLifetimes {
            stable: Duration::from_secs(3600),
            volatile: Duration::from_millis(100),
        };
        let content = ContentReader::new(Arc::new(runner.clone()), work_tree.clone(), lifetimes);
        TreeReader::new(content, work_tree, lifetimes)
    }

    #[test]
    fn splits_files_and_dirs() {
        let listing =
            parse_tree(&format!("tree {SHA}:\n\n.gitignore\nCargo.toml\nlib/\ntest/\n")).unwrap();
        assert_eq!(listing.files, vec![".gitignore", "Cargo.toml"]);
        assert_eq!(listing.dirs, vec!["lib", "test"]);
    }

    #[test]
    fn blob_content_is_not_a_directory() {
        let err = parse_tree("abc\ndef\n123\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn header_must_be_a_single_line() {
        assert!(parse_tree("readme\ntree x\n\nfile").is_err());
        assert!(parse_tree("tree x\nno blank line").is_err());
    }

    #[tokio::test]
    async fn fixed_listing_is_cached() {
        let runner = ScriptedRunner::constant(b"tree x:lib\n\nmod.rs\nsub/\n");
        let reader = reader(&runner, None);

        let first = reader.list(SHA, "lib").await.unwrap();
        let second = reader.list(SHA, "lib").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.files, vec!["mod.rs"]);
        assert_eq!(first.dirs, vec!["sub"]);
        assert_eq!(
            runner.calls(),
            vec![vec!["show".to_string(), format!("{SHA}:lib")]]
        );
    }

    #[tokio::test]
    async fn parse_failure_is_not_cached() {
        let runner = ScriptedRunner::constant(b"plain file\n");
        let reader = reader(&runner, None);

        assert_eq!(
            reader.list(SHA, "README").await.unwrap_err().kind(),
            ErrorKind::Parse
        );
        assert_eq!(
            reader.list(SHA, "README").await.unwrap_err().kind(),
            ErrorKind::Parse
        );
        // the blob read itself succeeded and stays cached
        assert_eq!(runner.call_count(), 1);
        assert!(reader.cache().is_empty());
    }

    #[tokio::test]
    async fn live_listing_reads_working_copy() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "a").await.unwrap();
        tokio::fs::create_dir(dir.path().join("lib")).await.unwrap();
        let runner = ScriptedRunner::constant(b"");
        let reader = reader(&runner, Some(WorkTree::new(dir.path())));

        let listing = reader.list(LIVE_SENTINEL, "").await.unwrap();
        assert_eq!(listing.files, vec!["a.txt"]);
        assert_eq!(listing.dirs, vec!["lib"]);
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn live_listing_on_bare_repository_fails() {
        let runner = ScriptedRunner::constant(b"");
        let reader = reader(&runner, None);
        let err = reader.list(LIVE_SENTINEL, "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidVersion);
    }

    proptest! {
        #[test]
        fn partition_covers_every_entry(
            names in proptest::collection::btree_set("[a-z][a-z0-9_.]{0,8}", 0..20),
            dir_mask in proptest::collection::vec(any::<bool>(), 20),
        ) {
            let mut body = String::from("tree x:\n\n");
            for (name, is_dir) in names.iter().zip(&dir_mask) {
                body.push_str(name);
                if *is_dir {
                    body.push('/');
                }
                body.push('\n');
            }

            let listing = parse_tree(&body).unwrap();
            let files: BTreeSet<_> = listing.files.iter().cloned().collect();
            let dirs: BTreeSet<_> = listing.dirs.iter().cloned().collect();

            prop_assert!(files.is_disjoint(&dirs));
            prop_assert_eq!(listing.len(), names.len());
            prop_assert_eq!(files.union(&dirs).cloned().collect::<BTreeSet<_>>(), names);
        }
    }
}
