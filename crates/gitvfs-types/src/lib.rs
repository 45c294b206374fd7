//! gitvfs-types: pure data types for gitvfs.
//!
//! No I/O lives here. The kernel crate produces these values; front-ends
//! consume them.

pub mod encoding;
pub mod error;
pub mod history;
pub mod listing;
pub mod revision;

pub use encoding::{join, Content, Encoding};
pub use error::{ErrorKind, GitError, Result};
pub use history::{History, LogEntry};
pub use listing::DirListing;
pub use revision::{is_oid, Oid, Revision, LIVE_SENTINEL, OID_HEX_LEN};
