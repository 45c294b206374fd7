//! Commit history of a path, relative to the resolved head.
//!
//! Runs `git log -z --summary <head> -- <path>`. With `-z` every commit
//! record is terminated by a NUL byte, which cannot appear in a commit
//! message, so records split cleanly even when messages contain blank lines.
//!
//! A record looks like:
//!
//! ```text
//! commit 26c8c846ba48d907ddd093b24b5d51e044c604b0
//! Author: Amy <amy@example.com>
//! Date:   Tue Mar 4 10:00:00 2025 +0000
//!
//!     Fix parser
//!
//!  create mode 100644 src/parser.rs
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use gitvfs_types::{Encoding, GitError, History, LogEntry, Oid, Result};
use regex::Regex;

use crate::cache::Coalescer;
use crate::config::CacheLifetimes;
use crate::head::HeadResolver;
use crate::process::GitRunner;

#[allow(clippy::expect_used)]
static COMMIT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^commit ([a-f0-9]{40})").expect("static pattern"));

#[allow(clippy::expect_used)]
static HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][a-z]*):\s*(.*)$").expect("static pattern"));

/// Reads per-path commit history.
#[derive(Debug, Clone)]
pub struct HistoryReader {
    runner: Arc<dyn GitRunner>,
    head: HeadResolver,
    cache: Coalescer<History>,
}

impl HistoryReader {
    pub fn new(runner: Arc<dyn GitRunner>, head: HeadResolver, lifetimes: CacheLifetimes) -> Self {
        Self {
            runner,
            head,
            cache: Coalescer::new("history", lifetimes),
        }
    }

    /// History of `path` as of the current head, newest first.
    pub async fn log(&self, path: &str) -> Result<History> {
        let head = self.head.resolve().await?;
        self.log_at(&head, path).await
    }

    /// History of `path` as of commit `oid`.
    pub async fn log_at(&self, oid: &Oid, path: &str) -> Result<History> {
        let runner = Arc::clone(&self.runner);
        let owned_path = path.to_string();
        self.cache
            .get_or_fetch(oid.as_str(), &["log", path], move |revision| async move {
                let args = [
                    "log".to_string(),
                    "-z".to_string(),
                    "--summary".to_string(),
                    revision.to_string(),
                    "--".to_string(),
                    owned_path,
                ];
                let output = runner.run_decoded(&args, Some(Encoding::Utf8)).await?;
                parse_log(output.as_text().unwrap_or_default())
            })
            .await
    }

    pub fn cache(&self) -> &Coalescer<History> {
        &self.cache
    }
}

/// Parse NUL-separated `git log -z` output.
///
/// Empty output is an empty history. Every non-empty record must start with
/// a `commit <id>` line; the lines after it up to the first blank line must
/// all be `Header: value` lines. The message is the rest of the record,
/// trimmed.
pub fn parse_log(output: &str) -> Result<History> {
    let mut history = History::new();
    for record in output.split('\0') {
        let record = record.trim_start_matches('\n');
        if record.trim().is_empty() {
            continue;
        }
        let (oid, entry) = parse_record(record)?;
        history.insert(oid, entry);
    }
    Ok(history)
}

fn parse_record(record: &str) -> Result<(Oid, LogEntry)> {
    let (head, message) = record.split_once("\n\n").unwrap_or((record, ""));
    let mut lines = head.lines();

    let first = lines.next().unwrap_or_default();
    let oid = COMMIT_LINE
        .captures(first)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| GitError::parse(format!("log record has no commit id: {first:?}")))
        .and_then(|m| Oid::parse(m.as_str()))?;

    let mut headers = BTreeMap::new();
    for line in lines {
        let caps = HEADER_LINE.captures(line).ok_or_else(|| {
            GitError::parse(format!("unexpected header line in commit {oid}: {line:?}"))
        })?;
        headers.insert(caps[1].to_lowercase(), caps[2].trim_end().to_string());
    }

    Ok((
        oid,
        LogEntry {
            headers,
            message: message.trim().to_string(),
        },
    ))
}
