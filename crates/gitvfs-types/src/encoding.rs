//! Byte content and optional text decoding.
//!
//! Captured output stays raw bytes until a caller asks for an encoding.
//! Decoding never fails: invalid UTF-8 becomes U+FFFD.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GitError;

/// Text encoding applied to raw bytes on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// UTF-8, invalid sequences replaced.
    Utf8,
    /// 7-bit ASCII; the high bit of each byte is dropped.
    Ascii,
    /// One byte per code point (ISO-8859-1).
    Latin1,
}

impl Encoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Ascii => bytes.iter().map(|b| char::from(b & 0x7f)).collect(),
            Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "latin1",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "ascii" => Ok(Encoding::Ascii),
            "latin1" | "binary" | "iso-8859-1" => Ok(Encoding::Latin1),
            other => Err(GitError::parse(format!("unknown encoding {other:?}"))),
        }
    }
}

/// File content, raw or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Bytes(Vec<u8>),
    Text(String),
}

impl Content {
    /// Wrap raw bytes, decoding them if an encoding is given.
    pub fn from_bytes(bytes: Vec<u8>, encoding: Option<Encoding>) -> Self {
        match encoding {
            None => Content::Bytes(bytes),
            Some(enc) => Content::Text(enc.decode(&bytes)),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Bytes(b) => b,
            Content::Text(s) => s.as_bytes(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Bytes(_) => None,
            Content::Text(s) => Some(s),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Content::Bytes(b) => b,
            Content::Text(s) => s.into_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Concatenate captured chunks, then optionally decode the whole buffer.
///
/// Decoding happens after concatenation so multi-byte sequences split across
/// chunk boundaries survive. The git executor collects whole buffers and
/// decodes with [`Content::from_bytes`]; this is for callers assembling output
/// from their own chunked streams.
pub fn join<B: AsRef<[u8]>>(chunks: &[B], encoding: Option<Encoding>) -> Content {
    let total = chunks.iter().map(|c| c.as_ref().len()).sum();
    let mut buf = Vec::with_capacity(total);
    for chunk in chunks {
        buf.extend_from_slice(chunk.as_ref());
    }
    Content::from_bytes(buf, encoding)
}
