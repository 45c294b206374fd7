//! Configuration for a gitvfs instance.
//!
//! ```toml
//! git_binary = "/usr/bin/git"
//!
//! [cache]
//! stable_ms = 3600000   # entries under a fixed revision
//! volatile_ms = 100     # live working copy and the resolved head
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default lifetime for entries under a fixed revision (one hour).
pub const DEFAULT_STABLE_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Default lifetime for live entries and the resolved head.
pub const DEFAULT_VOLATILE_LIFETIME: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How long cached results stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "RawLifetimes")]
pub struct CacheLifetimes {
    /// Lifetime of results keyed under a fixed revision.
    pub stable: Duration,
    /// Lifetime of live results and of the resolved head id.
    pub volatile: Duration,
}

impl Default for CacheLifetimes {
    fn default() -> Self {
        Self {
            stable: DEFAULT_STABLE_LIFETIME,
            volatile: DEFAULT_VOLATILE_LIFETIME,
        }
    }
}

impl CacheLifetimes {
    /// Pick the lifetime for a result, by revision volatility.
    pub fn for_live(&self, live: bool) -> Duration {
        if live { self.volatile } else { self.stable }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawLifetimes {
    stable_ms: u64,
    volatile_ms: u64,
}

impl Default for RawLifetimes {
    fn default() -> Self {
        Self {
            stable_ms: DEFAULT_STABLE_LIFETIME.as_millis() as u64,
            volatile_ms: DEFAULT_VOLATILE_LIFETIME.as_millis() as u64,
        }
    }
}

impl From<RawLifetimes> for CacheLifetimes {
    fn from(raw: RawLifetimes) -> Self {
        Self {
            stable: Duration::from_millis(raw.stable_ms),
            volatile: Duration::from_millis(raw.volatile_ms),
        }
    }
}

/// Configuration for [`GitFs`](crate::GitFs).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitVfsConfig {
    /// The git executable to spawn.
    pub git_binary: PathBuf,
    /// Cache lifetimes.
    pub cache: CacheLifetimes,
}

impl Default for GitVfsConfig {
    fn default() -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            cache: CacheLifetimes::default(),
        }
    }
}

impl GitVfsConfig {
    /// Config for tests: fixed-revision entries expire as fast as live ones,
    /// so long-lived caching is effectively off.
    pub fn testing() -> Self {
        let volatile = DEFAULT_VOLATILE_LIFETIME;
        Self {
            git_binary: PathBuf::from("git"),
            cache: CacheLifetimes {
                stable: volatile,
                volatile,
            },
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_git_binary(mut self, git_binary: impl Into<PathBuf>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    pub fn with_cache(mut self, cache: CacheLifetimes) -> Self {
        self.cache = cache;
        self
    }
}
