//! sqlcompat scanner - mapped statement discovery
//!
//! Walks mapper directories, compiles every mapper document, and produces
//! an ordered, deduplicated list of [`StatementRecord`]s with resolved SQL.
//!
//! [`StatementRecord`]: sqlcompat_core::StatementRecord

mod config;
mod error;
mod files;
mod hints;
mod scanner;

pub use config::{DEFAULT_EXCLUDES, DEFAULT_INCLUDE, ScanConfig};
pub use error::ScanError;
pub use files::{DiscoveredFile, FileMatcher, discover_files};
pub use hints::{collect_condition_paths, hint_key};
pub use scanner::{DuplicateStatement, MapperScanner, ScanOutcome};
