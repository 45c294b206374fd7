//! Error type shared by every gitvfs operation.
//!
//! `GitError` is `Clone`: a coalesced request resolves once and the same
//! outcome is handed to every caller that joined it, so host I/O errors are
//! captured as `(io::ErrorKind, message)` rather than kept as `io::Error`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from gitvfs operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitError {
    /// The path handed to the repository constructor is not a repository.
    #[error("bad repository path: {}: {reason}", .path.display())]
    BadRepository {
        /// The path that was rejected.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// A revision argument is neither the live sentinel nor a 40-hex id.
    #[error("invalid version {version:?}{}", suffix(.detail))]
    InvalidVersion {
        version: String,
        detail: Option<String>,
    },

    /// The tool reported a missing path or revision.
    #[error("{message}")]
    NotFound {
        message: String,
        /// The id or path that could not be found, when known.
        subject: Option<String>,
    },

    /// The tool exited non-zero for any other reason.
    #[error("{message}")]
    ProcessFailure {
        message: String,
        /// Exit status, if the process exited normally.
        status: Option<i32>,
    },

    /// A host filesystem operation failed.
    #[error("{message}")]
    Io {
        kind: io::ErrorKind,
        message: String,
        path: Option<PathBuf>,
    },

    /// Tool output did not have the expected structure.
    #[error("parse error: {message}")]
    Parse { message: String },
}

fn suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Flat classification of [`GitError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRepository,
    InvalidVersion,
    NotFound,
    ProcessFailure,
    Io,
    Parse,
}

impl GitError {
    pub fn bad_repository(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        GitError::BadRepository {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_version(version: &str) -> Self {
        GitError::InvalidVersion {
            version: version.to_string(),
            detail: None,
        }
    }

    pub fn not_found(message: impl Into<String>, subject: Option<String>) -> Self {
        GitError::NotFound {
            message: message.into(),
            subject,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        GitError::Parse {
            message: message.into(),
        }
    }

    /// Capture a host I/O error, embedding the path it concerned.
    pub fn io(err: &io::Error, path: Option<PathBuf>) -> Self {
        let message = match &path {
            Some(p) => format!("{err} {:?}", p.display().to_string()),
            None => err.to_string(),
        };
        GitError::Io {
            kind: err.kind(),
            message,
            path,
        }
    }

    /// The category of this error.
    ///
    /// A host filesystem miss reports `NotFound` even though it is carried as
    /// an `Io` error; `io_kind()` still exposes the underlying io kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GitError::BadRepository { .. } => ErrorKind::BadRepository,
            GitError::InvalidVersion { .. } => ErrorKind::InvalidVersion,
            GitError::NotFound { .. } => ErrorKind::NotFound,
            GitError::ProcessFailure { .. } => ErrorKind::ProcessFailure,
            GitError::Io {
                kind: io::ErrorKind::NotFound,
                ..
            } => ErrorKind::NotFound,
            GitError::Io { .. } => ErrorKind::Io,
            GitError::Parse { .. } => ErrorKind::Parse,
        }
    }

    /// The io kind, for errors that came from the host filesystem.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            GitError::Io { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result alias for gitvfs operations.
pub type Result<T> = std::result::Result<T, GitError>;
