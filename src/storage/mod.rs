//! On-disk log storage
//!
//! Partition layout: `<root>/logs/<host>/<client>/<MM-dd-yyyy>/<Severity>.log`.

pub mod fs;
mod resolver;
mod store;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use fs::{DiskFs, FileEntry, LogFs, MemoryFs, WriteKind};
pub use resolver::{
    partition_date, sanitize_path, PathResolver, LOGS_DIR_NAME, PARTITION_DATE_FORMAT,
};
pub use store::{
    format_line, AppendOutcome, LogContents, LogFileInfo, LogStore, LOG_CONTENT_TYPE,
    LOG_FILE_SUFFIX,
};

/// Errors raised by path resolution and file access
#[derive(Debug, Error)]
pub enum StorageError {
    /// A host or client value that is not exactly one path segment
    #[error("'{0}' is not a valid path segment")]
    InvalidSegment(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
