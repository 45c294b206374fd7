//! The git subprocess protocol.
//!
//! Every call spawns one `git` process with the repository-location flags
//! prepended, closes its stdin immediately, and collects stdout and stderr as
//! raw bytes until the process exits. Nothing is decoded unless the caller
//! asks for an encoding.
//!
//! A non-zero exit becomes a [`GitError`] whose message carries the command
//! line and stderr. Stderr is matched against the handful of messages git
//! prints for a missing path or revision; those become `NotFound`, anything
//! else is `ProcessFailure`.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use gitvfs_types::{Content, Encoding, GitError, Result};
use regex::Regex;
use tokio::process::Command;

#[allow(clippy::expect_used)]
static NOT_FOUND_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"fatal: [Pp]ath '(?P<subject>[^']+)' does not exist in '[0-9a-f]{40}'",
        r"fatal: [Pp]ath '(?P<subject>[^']+)' exists on disk, but not in '[^']+'",
        r"ambiguous argument '(?P<subject>[^']+)': unknown revision or path not in the working tree",
        r"fatal: invalid object name '(?P<subject>[^']+)'",
        r"fatal: bad revision '(?P<subject>[^']+)'",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Runs git commands against one repository.
///
/// The seam between the readers and the subprocess. [`GitProcess`] is the
/// real implementation; tests substitute scripted runners.
#[async_trait]
pub trait GitRunner: Send + Sync + fmt::Debug {
    /// Run `git <repository flags> <args...>` and return stdout on success.
    async fn run(&self, args: &[String]) -> Result<Vec<u8>>;

    /// Run and decode stdout with `encoding`, or keep raw bytes when `None`.
    async fn run_decoded(&self, args: &[String], encoding: Option<Encoding>) -> Result<Content> {
        let stdout = self.run(args).await?;
        Ok(Content::from_bytes(stdout, encoding))
    }
}

/// Spawns the real `git` binary.
#[derive(Debug, Clone)]
pub struct GitProcess {
    binary: PathBuf,
    prefix: Vec<String>,
}

impl GitProcess {
    /// Create a runner that prepends `prefix` (e.g. `--git-dir=...`) to
    /// every command.
    pub fn new(binary: impl Into<PathBuf>, prefix: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            prefix,
        }
    }

    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    fn command_line(&self, args: &[String]) -> String {
        let mut line = self.binary.display().to_string();
        for arg in self.prefix.iter().chain(args) {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[async_trait]
impl GitRunner for GitProcess {
    async fn run(&self, args: &[String]) -> Result<Vec<u8>> {
        let command_line = self.command_line(args);
        tracing::debug!(command = %command_line, "spawning git");

        let mut child = Command::new(&self.binary)
            .args(&self.prefix)
            .args(args)
            // untranslated stderr, so the not-found patterns match
            .env("LC_ALL", "C")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GitError::io(&e, Some(self.binary.clone())))?;

        // git is never fed input
        drop(child.stdin.take());

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GitError::io(&e, Some(self.binary.clone())))?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(classify_failure(&command_line, output.status.code(), &output.stderr))
        }
    }
}

/// Build the error for a failed git invocation.
pub fn classify_failure(command_line: &str, status: Option<i32>, stderr: &[u8]) -> GitError {
    let stderr = Encoding::Utf8.decode(stderr);
    let message = format!("{command_line}\n{stderr}");

    for pattern in NOT_FOUND_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(&stderr) {
            let subject = caps.name("subject").map(|m| m.as_str().to_string());
            return GitError::not_found(message, subject);
        }
    }

    GitError::ProcessFailure { message, status }
}
