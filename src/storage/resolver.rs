//! Partition directory resolution
//!
//! Maps `(host, client, date)` to `<root>/logs/<host>/<client>/<MM-dd-yyyy>`.
//! Invalid path characters are replaced across the whole joined path, not
//! per segment. Host and client must each be a single path segment so a
//! partition can never nest inside, or escape, another one.

use std::path::{self, Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;

use super::fs::LogFs;
use super::StorageError;
use crate::identity::ClientIdentity;

/// Name of the directory under the root that holds every partition
pub const LOGS_DIR_NAME: &str = "logs";

/// Partition date format (month-day-year, zero padded)
pub const PARTITION_DATE_FORMAT: &str = "%m-%d-%Y";

/// Replacement for characters the platform does not allow in a path
pub const REPLACEMENT_CHAR: char = '_';

#[cfg(windows)]
fn is_invalid_path_char(c: char) -> bool {
    c == '|' || (c as u32) < 32
}

#[cfg(not(windows))]
fn is_invalid_path_char(c: char) -> bool {
    c == '\0'
}

/// Replace every character that is invalid in a path with `_`
pub fn sanitize_path(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if is_invalid_path_char(c) {
                REPLACEMENT_CHAR
            } else {
                c
            }
        })
        .collect()
}

/// Render a partition date as `MM-dd-yyyy`
pub fn partition_date(date: NaiveDate) -> String {
    date.format(PARTITION_DATE_FORMAT).to_string()
}

fn check_segment(value: &str) -> Result<(), StorageError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.chars().any(path::is_separator);
    if invalid {
        Err(StorageError::InvalidSegment(value.to_string()))
    } else {
        Ok(())
    }
}

/// Computes and creates partition directories under a fixed root
#[derive(Clone)]
pub struct PathResolver {
    root: PathBuf,
    fs: Arc<dyn LogFs>,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn LogFs>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    /// Directory holding all partitions
    pub fn logs_root(&self) -> PathBuf {
        self.root.join(LOGS_DIR_NAME)
    }

    /// Partition path without touching the filesystem.
    ///
    /// Read paths use this so that looking at a partition never creates it.
    pub fn locate(
        &self,
        identity: &ClientIdentity,
        host: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, StorageError> {
        check_segment(host)?;
        check_segment(identity.as_str())?;

        let joined = self
            .logs_root()
            .join(host)
            .join(identity.as_str())
            .join(partition_date(date));

        Ok(PathBuf::from(sanitize_path(&joined.to_string_lossy())))
    }

    /// Partition path, creating the directory and its ancestors if missing.
    ///
    /// Returns the canonical absolute path. Safe to call concurrently for the
    /// same partition.
    pub fn resolve(
        &self,
        identity: &ClientIdentity,
        host: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.locate(identity, host, date)?;
        self.fs
            .ensure_dir(&dir)
            .map_err(|source| StorageError::Io { path: dir, source })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
