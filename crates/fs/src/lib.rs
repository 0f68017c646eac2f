//! Hashing, safe paths, the filter policy, and the file scanner.
//!
//! This is the leaf layer every other crate in the workspace builds on: it
//! has no dependency on the chunker, the stores, or the index manager.

pub mod error;
pub mod filter;
pub mod hash;
pub mod paths;
pub mod project_id;
pub mod scanner;

pub use error::{FsError, Result};
pub use filter::{CompiledFilter, FilterConfig, RejectReason};
pub use scanner::{FileScanner, ScanReport, ScannedFile};
