//! Append-only persistence of observed state changes.
//!
//! This module provides:
//! - The persisted row type and its delimited encoding ([`ChangeRecord`])
//! - The append-only writer that owns the destination ([`ChangeLog`])
//! - Write-side errors ([`ChangeLogError`])
//!
//! Records are never rewritten or removed. Reopening an existing
//! destination appends after the records already present and does not
//! repeat the header row.

mod file;
mod record;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use file::ChangeLog;
pub use record::{ChangeRecord, HEADER, encode_row};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while persisting records.
///
/// Any of these is fatal to a monitoring session: losing the durability
/// guarantee silently would defeat the point of the log.
#[derive(Debug, Error)]
pub enum ChangeLogError {
    /// The destination could not be created or opened for appending.
    #[error("Failed to open change log '{}': {source}", path.display())]
    Open {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A record could not be written or flushed.
    #[error("Failed to write change log '{}': {source}", path.display())]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}
