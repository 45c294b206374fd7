//! Read-only filesystem interface over one revision.

use async_trait::async_trait;
use gitvfs_types::{DirListing, Encoding, Result, Revision};

/// Read-only filesystem pinned to a single revision.
///
/// All operations use paths relative to the repository root. For example,
/// `read("src/main.rs")` reads `src/main.rs` as it exists at
/// [`revision()`](Self::revision).
#[async_trait]
pub trait VersionedFilesystem: Send + Sync {
    /// The revision every read is answered from.
    fn revision(&self) -> &Revision;

    /// Read the entire contents of a file.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// List a directory's entries.
    async fn list(&self, path: &str) -> Result<DirListing>;

    /// Read a file as UTF-8 text, replacing invalid sequences.
    async fn read_to_string(&self, path: &str) -> Result<String> {
        let bytes = self.read(path).await?;
        Ok(Encoding::Utf8.decode(&bytes))
    }

    /// Check if a path exists, as a file or a directory.
    ///
    /// Only a not-found answer means `false`; any other failure is returned.
    async fn exists(&self, path: &str) -> Result<bool> {
        let read_err = match self.read(path).await {
            Ok(_) => return Ok(true),
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => e,
        };
        // a live directory cannot be read as a file
        match self.list(path).await {
            Ok(_) => Ok(true),
            Err(_) => Err(read_err),
        }
    }

    /// Always true; no revision can be written through this interface.
    fn read_only(&self) -> bool {
        true
    }
}
