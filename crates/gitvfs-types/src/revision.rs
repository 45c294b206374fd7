//! Revision identifiers.
//!
//! A revision is either the live working copy or an exact commit id. Fixed
//! revisions are content-addressed and never change, which is what lets the
//! kernel cache them for a long time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GitError;

/// The revision string that denotes the live working copy.
pub const LIVE_SENTINEL: &str = "fs";

/// Length of a hex-encoded object id.
pub const OID_HEX_LEN: usize = 40;

/// A 40-character lowercase hexadecimal object id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Parse an object id, rejecting anything but 40 lowercase hex characters.
    pub fn parse(s: &str) -> Result<Self, GitError> {
        if is_oid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(GitError::invalid_version(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log messages.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(OID_HEX_LEN)]
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Oid {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Oid {
    type Error = GitError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if is_oid(&s) {
            Ok(Self(s))
        } else {
            Err(GitError::invalid_version(&s))
        }
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

/// True if `s` is exactly 40 lowercase hex characters.
pub fn is_oid(s: &str) -> bool {
    s.len() == OID_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Which state of the repository a request addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Revision {
    /// The current, mutable working copy on the host filesystem.
    Live,
    /// An immutable commit.
    Fixed(Oid),
}

impl Revision {
    /// Parse a revision argument.
    ///
    /// Accepts [`LIVE_SENTINEL`] or a 40-hex id; everything else is an
    /// `InvalidVersion` error.
    pub fn parse(s: &str) -> Result<Self, GitError> {
        if s == LIVE_SENTINEL {
            Ok(Revision::Live)
        } else {
            Oid::parse(s).map(Revision::Fixed)
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Revision::Live)
    }

    pub fn oid(&self) -> Option<&Oid> {
        match self {
            Revision::Live => None,
            Revision::Fixed(oid) => Some(oid),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Revision::Live => LIVE_SENTINEL,
            Revision::Fixed(oid) => oid.as_str(),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Revision {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Oid> for Revision {
    fn from(oid: Oid) -> Self {
        Revision::Fixed(oid)
    }
}
