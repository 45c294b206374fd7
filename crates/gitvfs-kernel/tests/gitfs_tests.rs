//! End-to-end tests against real repositories.
//!
//! Each test builds a throwaway repository with the `git` binary and reads
//! it back through `GitFs`. Tests return early when git is not installed.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use gitvfs_kernel::{
    Encoding, ErrorKind, GitFs, GitVfsConfig, Revision, VersionedFilesystem, LIVE_SENTINEL,
};
use tempfile::TempDir;

const ASCII: &[u8] = b"abc\ndef\n123\n";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn git_available() -> bool {
    let found = Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false);
    if !found {
        eprintln!("git not installed, skipping");
    }
    found
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A repository with `test/ascii.txt`, `test/utf8.txt` and `README.md`
/// committed once.
fn setup() -> TempDir {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    git(root, &["init", "-q"]);
    std::fs::create_dir(root.join("test")).expect("mkdir");
    std::fs::write(root.join("test/ascii.txt"), ASCII).expect("write");
    std::fs::write(root.join("test/utf8.txt"), "ünïcödé\n").expect("write");
    std::fs::write(root.join("README.md"), "# fixture\n").expect("write");
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "initial"]);
    dir
}

async fn open(dir: &Path) -> GitFs {
    GitFs::open(dir, GitVfsConfig::testing())
        .await
        .expect("open repository")
}

// ============================================================================
// Content
// ============================================================================

#[tokio::test]
async fn test_live_and_fixed_reads_match_then_diverge() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;

    let live = fs.read_bytes(LIVE_SENTINEL, "test/ascii.txt").await.unwrap();
    assert_eq!(live, ASCII);

    let head = fs.head().await.unwrap();
    let fixed = fs.read_bytes(head.as_str(), "test/ascii.txt").await.unwrap();
    assert_eq!(fixed, ASCII);

    std::fs::write(dir.path().join("test/ascii.txt"), "edited\n").unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    let live = fs.read_bytes(LIVE_SENTINEL, "test/ascii.txt").await.unwrap();
    assert_eq!(live, b"edited\n");
    let fixed = fs.read_bytes(head.as_str(), "test/ascii.txt").await.unwrap();
    assert_eq!(fixed, ASCII, "historical content must not follow live edits");
}

#[tokio::test]
async fn test_decoded_read() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;
    let head = fs.head().await.unwrap();

    let text = fs
        .read(head.as_str(), "test/utf8.txt", Some(Encoding::Utf8))
        .await
        .unwrap();
    assert_eq!(text.as_text(), Some("ünïcödé\n"));

    let raw = fs.read(head.as_str(), "test/utf8.txt", None).await.unwrap();
    assert_eq!(raw.as_text(), None);
    assert_eq!(raw.as_bytes(), "ünïcödé\n".as_bytes());
}

#[tokio::test]
async fn test_missing_fixed_path_is_not_found() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;
    let head = fs.head().await.unwrap();

    let err = fs.read_bytes(head.as_str(), "test/nope.txt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound, "got: {err}");
}

#[tokio::test]
async fn test_unknown_commit_is_not_found() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;

    let err = fs
        .read_bytes("0123456789abcdef0123456789abcdef01234567", "README.md")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound, "got: {err}");
}

#[tokio::test]
async fn test_missing_live_path_names_the_path() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;

    let err = fs.read_bytes(LIVE_SENTINEL, "test/nope.txt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    assert!(err.to_string().contains("test/nope.txt"), "got: {err}");
}

#[tokio::test]
async fn test_invalid_versions_are_rejected() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;

    for bad in ["HEAD", "master", "26C8C846BA48D907DDD093B24B5D51E044C604B0", "abc123"] {
        let err = fs.read_bytes(bad, "README.md").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidVersion, "{bad} should be rejected");
    }
}

// ============================================================================
// Directories
// ============================================================================

#[tokio::test]
async fn test_fixed_listing_partitions_entries() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;
    let head = fs.head().await.unwrap();

    let root = fs.list(head.as_str(), "").await.unwrap();
    assert_eq!(root.files, vec!["README.md"]);
    assert_eq!(root.dirs, vec!["test"]);

    let test = fs.list(head.as_str(), "test").await.unwrap();
    assert_eq!(test.files, vec!["ascii.txt", "utf8.txt"]);
    assert!(test.dirs.is_empty());
}

#[tokio::test]
async fn test_listing_a_file_is_a_parse_error() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;
    let head = fs.head().await.unwrap();

    let err = fs.list(head.as_str(), "README.md").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn test_live_listing_sees_uncommitted_entries() {
    if !git_available() {
        return;
    }
    let dir = setup();
    std::fs::create_dir(dir.path().join("scratch")).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "wip").unwrap();
    let fs = open(dir.path()).await;

    let listing = fs.list(LIVE_SENTINEL, "").await.unwrap();
    assert!(listing.files.iter().any(|f| f == "notes.txt"));
    assert!(listing.files.iter().any(|f| f == "README.md"));
    assert!(listing.dirs.iter().any(|d| d == "scratch"));
    assert!(listing.dirs.iter().any(|d| d == ".git"));
    assert_eq!(listing.len(), 5);
}

// ============================================================================
// History and head
// ============================================================================

#[tokio::test]
async fn test_log_lists_commits_newest_first() {
    if !git_available() {
        return;
    }
    let dir = setup();
    std::fs::write(dir.path().join("test/ascii.txt"), "second\n").unwrap();
    git(dir.path(), &["commit", "-q", "-a", "-m", "second edit"]);
    let fs = open(dir.path()).await;

    let history = fs.log("test/ascii.txt").await.unwrap();
    assert_eq!(history.len(), 2);

    let head = fs.head().await.unwrap();
    let newest = history.commits().next().unwrap();
    assert_eq!(newest, &head);

    let entry = history.get(head.as_str()).unwrap();
    assert_eq!(entry.author(), Some("Test <test@example.com>"));
    assert!(entry.date().is_some());
    assert_eq!(entry.message, "second edit");

    let readme = fs.log("README.md").await.unwrap();
    assert_eq!(readme.len(), 1);
    let (_, first) = readme.iter().next().unwrap();
    assert!(first.message.starts_with("initial"));
}

#[tokio::test]
async fn test_log_of_untouched_path_is_empty() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;
    assert!(fs.log("never/existed.txt").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_head_follows_new_commits() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;
    let first = fs.head().await.unwrap();

    std::fs::write(dir.path().join("README.md"), "# changed\n").unwrap();
    git(dir.path(), &["commit", "-q", "-a", "-m", "change readme"]);
    tokio::time::sleep(Duration::from_millis(250)).await;

    let second = fs.head().await.unwrap();
    assert_ne!(first, second);
    assert_eq!(fs.head_revision(false).await.unwrap(), Revision::Live);
    assert_eq!(fs.head_revision(true).await.unwrap(), Revision::Fixed(second));
}

// ============================================================================
// Repository shapes
// ============================================================================

#[tokio::test]
async fn test_bare_clone_serves_fixed_revisions_only() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let bare = tempfile::tempdir().unwrap();
    let target = bare.path().join("repo.git");
    git(
        bare.path(),
        &["clone", "-q", "--bare", &dir.path().display().to_string(), "repo.git"],
    );

    let fs = open(&target).await;
    assert!(fs.repository().is_bare());

    let head = fs.head().await.unwrap();
    let bytes = fs.read_bytes(head.as_str(), "test/ascii.txt").await.unwrap();
    assert_eq!(bytes, ASCII);

    let err = fs.read_bytes(LIVE_SENTINEL, "test/ascii.txt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidVersion);
    assert!(!fs.head_revision(false).await.unwrap().is_live());
}

#[tokio::test]
async fn test_plain_directory_is_bad_repository() {
    let dir = tempfile::tempdir().unwrap();
    let err = GitFs::open(dir.path(), GitVfsConfig::testing())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRepository);
}

#[tokio::test]
async fn test_revision_view() {
    if !git_available() {
        return;
    }
    let dir = setup();
    let fs = open(dir.path()).await;
    let head = fs.head().await.unwrap();

    let view = fs.at(head.as_str()).unwrap();
    assert_eq!(view.read_to_string("README.md").await.unwrap(), "# fixture\n");
    assert!(view.exists("test").await.unwrap());
    assert!(view.exists("test/ascii.txt").await.unwrap());
    assert!(!view.exists("missing").await.unwrap());

    let live = fs.at(LIVE_SENTINEL).unwrap();
    assert!(live.exists("test").await.unwrap());
    assert_eq!(live.list("test").await.unwrap().len(), 2);
}
