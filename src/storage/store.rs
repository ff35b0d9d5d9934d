//! Severity files inside a partition directory
//!
//! Each partition holds at most one `<Severity>.log` per level. Lines are
//! only ever appended; nothing here truncates or rewrites a file.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::fs::{LogFs, WriteKind};
use super::StorageError;
use crate::severity::Severity;

/// Content type served for a log file
pub const LOG_CONTENT_TYPE: &str = "text/plain";

/// Suffix of every file counted as a log file
pub const LOG_FILE_SUFFIX: &str = ".log";

/// Listing entry for one log file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFileInfo {
    /// File name without directories (e.g. `Info.log`)
    pub name: String,
    /// Length in bytes
    pub size: u64,
}

/// Raw bytes of a log file, ready to send as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContents {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Result of appending one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The file was created holding only this line
    Created,
    /// The line was added after the existing content
    Appended,
    /// The write did not happen; carries the underlying error's description
    Failed(String),
}

/// Format one stored line: `[HH:mm:ss]: <message>\n`
pub fn format_line(timestamp: NaiveDateTime, message: &str) -> String {
    format!("[{}]: {}\n", timestamp.format("%H:%M:%S"), message)
}

/// Reads and appends severity files through a `LogFs`
#[derive(Clone)]
pub struct LogStore {
    fs: Arc<dyn LogFs>,
}

impl LogStore {
    pub fn new(fs: Arc<dyn LogFs>) -> Self {
        Self { fs }
    }

    /// Every `*.log` file under `dir`, recursively, sorted by path.
    ///
    /// A directory without log files (or no directory at all) gives an
    /// empty list.
    pub fn list_files(&self, dir: &Path) -> Result<Vec<LogFileInfo>, StorageError> {
        let mut entries = self.fs.walk_files(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let name = entry.path.file_name()?.to_string_lossy().into_owned();
                name.ends_with(LOG_FILE_SUFFIX).then_some(LogFileInfo {
                    name,
                    size: entry.len,
                })
            })
            .collect())
    }

    /// Content of the severity's file in `dir`, or `None` if it does not exist
    pub fn read_file(
        &self,
        dir: &Path,
        severity: Severity,
    ) -> Result<Option<LogContents>, StorageError> {
        let path = dir.join(severity.file_name());
        let bytes = self
            .fs
            .read_file(&path)
            .map_err(|source| StorageError::Io { path, source })?;

        Ok(bytes.map(|bytes| LogContents {
            bytes,
            content_type: LOG_CONTENT_TYPE,
        }))
    }

    /// Append one timestamped line to the severity's file in `dir`.
    ///
    /// The whole line goes down in a single write, so concurrent callers on
    /// the same file never split each other's lines. I/O errors become
    /// `AppendOutcome::Failed`.
    pub fn append_line(
        &self,
        dir: &Path,
        severity: Severity,
        timestamp: NaiveDateTime,
        message: &str,
    ) -> AppendOutcome {
        let path = dir.join(severity.file_name());
        let line = format_line(timestamp, message);

        match self.fs.append(&path, line.as_bytes()) {
            Ok(WriteKind::Created) => AppendOutcome::Created,
            Ok(WriteKind::Appended) => AppendOutcome::Appended,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to append log line");
                AppendOutcome::Failed(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore").finish_non_exhaustive()
    }
}
