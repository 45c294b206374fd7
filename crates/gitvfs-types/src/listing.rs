//! Directory listings.

use serde::{Deserialize, Serialize};

/// The entries of one directory, split into files and subdirectories.
///
/// Order follows whatever the underlying listing produced; no sorting is
/// applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirListing {
    pub files: Vec<String>,
    pub dirs: Vec<String>,
}

impl DirListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.files.len() + self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Iterate every entry name, files first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().chain(self.dirs.iter()).map(String::as_str)
    }
}
