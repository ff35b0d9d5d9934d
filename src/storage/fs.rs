//! Filesystem capability used by the resolver and the store
//!
//! `DiskFs` is the production implementation. `MemoryFs` keeps everything in
//! memory and can be told to fail writes, which is how the store's failure
//! path is exercised without a read-only mount.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// A regular file found while walking a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Full path of the file
    pub path: PathBuf,
    /// Length in bytes
    pub len: u64,
}

/// What an append did to the target file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// The file did not exist and was created holding only the new bytes
    Created,
    /// The bytes were added after the existing content
    Appended,
}

/// Filesystem operations needed by the log store
///
/// Implementations must be safe to call concurrently for the same path.
pub trait LogFs: Send + Sync {
    /// Create `path` and any missing ancestors, returning its canonical form
    fn ensure_dir(&self, path: &Path) -> io::Result<PathBuf>;

    /// Every regular file under `dir`, recursively. A missing `dir` yields
    /// an empty list.
    fn walk_files(&self, dir: &Path) -> io::Result<Vec<FileEntry>>;

    /// Whole content of the file, or `None` if it does not exist
    fn read_file(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// Write `bytes` at the end of the file in one unit, creating the file
    /// if needed. The parent directory must already exist.
    fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<WriteKind>;
}

/// `LogFs` backed by the real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFs;

impl DiskFs {
    fn walk_into(dir: &Path, out: &mut Vec<FileEntry>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                Self::walk_into(&entry.path(), out)?;
            } else if file_type.is_file() {
                out.push(FileEntry {
                    path: entry.path(),
                    len: entry.metadata()?.len(),
                });
            }
        }
        Ok(())
    }
}

impl LogFs for DiskFs {
    fn ensure_dir(&self, path: &Path) -> io::Result<PathBuf> {
        // create_dir_all tolerates a concurrent creator of the same directory
        fs::create_dir_all(path)?;
        fs::canonicalize(path)
    }

    fn walk_files(&self, dir: &Path) -> io::Result<Vec<FileEntry>> {
        let mut files = Vec::new();
        match Self::walk_into(dir, &mut files) {
            Ok(()) => Ok(files),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !dir.exists() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn read_file(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<WriteKind> {
        // create_new decides Created vs Appended atomically; O_APPEND plus a
        // single write keeps concurrent lines from splitting each other
        match OpenOptions::new().append(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(bytes)?;
                Ok(WriteKind::Created)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let mut file = OpenOptions::new().append(true).open(path)?;
                file.write_all(bytes)?;
                Ok(WriteKind::Appended)
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    write_error: Option<io::ErrorKind>,
}

/// In-memory `LogFs` for tests
#[derive(Debug, Default)]
pub struct MemoryFs {
    state: Mutex<MemoryState>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append` fail with `kind` (or succeed again with `None`)
    pub fn fail_writes(&self, kind: Option<io::ErrorKind>) {
        self.lock().write_error = kind;
    }

    /// Whether `path` was created as a directory
    pub fn has_dir(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    /// Number of directories created so far
    pub fn dir_count(&self) -> usize {
        self.lock().dirs.len()
    }

    /// Place a file directly, bypassing append semantics
    pub fn insert_file(&self, path: &Path, bytes: &[u8]) {
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            insert_with_ancestors(&mut state.dirs, parent);
        }
        state.files.insert(path.to_path_buf(), bytes.to_vec());
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn insert_with_ancestors(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        dirs.insert(ancestor.to_path_buf());
    }
}

impl LogFs for MemoryFs {
    fn ensure_dir(&self, path: &Path) -> io::Result<PathBuf> {
        insert_with_ancestors(&mut self.lock().dirs, path);
        Ok(path.to_path_buf())
    }

    fn walk_files(&self, dir: &Path) -> io::Result<Vec<FileEntry>> {
        Ok(self
            .lock()
            .files
            .iter()
            .filter(|(path, _)| path.starts_with(dir) && path.as_path() != dir)
            .map(|(path, bytes)| FileEntry {
                path: path.clone(),
                len: bytes.len() as u64,
            })
            .collect())
    }

    fn read_file(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        Ok(self.lock().files.get(path).cloned())
    }

    fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<WriteKind> {
        let mut state = self.lock();
        if let Some(kind) = state.write_error {
            return Err(io::Error::new(kind, format!("write to {} refused", path.display())));
        }
        let parent_exists = path.parent().map_or(true, |p| state.dirs.contains(p));
        if !parent_exists {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory of {} does not exist", path.display()),
            ));
        }
        match state.files.entry(path.to_path_buf()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().extend_from_slice(bytes);
                Ok(WriteKind::Appended)
            }
            Entry::Vacant(slot) => {
                slot.insert(bytes.to_vec());
                Ok(WriteKind::Created)
            }
        }
    }
}
