//! Per-path commit history records.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::revision::Oid;

/// One commit touching a path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Header fields keyed by lower-cased name (`author`, `date`, `merge`, ...).
    #[serde(flatten)]
    pub headers: BTreeMap<String, String>,
    /// The commit message with surrounding whitespace trimmed.
    pub message: String,
}

impl LogEntry {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn author(&self) -> Option<&str> {
        self.header("author")
    }

    pub fn date(&self) -> Option<&str> {
        self.header("date")
    }
}

/// Commit history of a path, newest first.
///
/// Insertion order is the order the tool emitted the commits in. Serializes
/// as a map from commit id to entry, in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<(Oid, LogEntry)>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commit. A commit already present keeps its position and
    /// takes the newer entry.
    pub fn insert(&mut self, oid: Oid, entry: LogEntry) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == oid) {
            Some((_, slot)) => *slot = entry,
            None => self.entries.push((oid, entry)),
        }
    }

    pub fn get(&self, oid: &str) -> Option<&LogEntry> {
        self.entries
            .iter()
            .find(|(id, _)| id.as_str() == oid)
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commit ids, newest first.
    pub fn commits(&self) -> impl Iterator<Item = &Oid> {
        self.entries.iter().map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Oid, &LogEntry)> {
        self.entries.iter().map(|(id, entry)| (id, entry))
    }
}

impl Serialize for History {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (oid, entry) in &self.entries {
            map.serialize_entry(oid.as_str(), entry)?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a (Oid, LogEntry);
    type IntoIter = std::slice::Iter<'a, (Oid, LogEntry)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
