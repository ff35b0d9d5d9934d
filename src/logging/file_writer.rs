//! tracing-subscriber setup with an optional append-only diagnostics file

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Writer appending to a shared diagnostics file
struct SharedFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for SharedFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut file) = self.file.lock() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Ok(mut file) = self.file.lock() {
            file.flush()
        } else {
            Ok(())
        }
    }
}

/// Writer factory for tracing-subscriber
struct SharedFileWriterMaker {
    file: Arc<Mutex<File>>,
}

impl<'a> MakeWriter<'a> for SharedFileWriterMaker {
    type Writer = SharedFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileWriter {
            file: Arc::clone(&self.file),
        }
    }
}

/// Guard that keeps the diagnostics file open
pub struct LoggingGuard {
    _file: Option<Arc<Mutex<File>>>,
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create diagnostics log directory")?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open diagnostics log {}", path.display()))
}

/// RUST_LOG when set, `default_filter` otherwise
fn build_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Initialize the global subscriber
///
/// Events go to stderr, and also to `log_file` when given. Returns a guard
/// that must be kept alive for the duration of logging.
pub fn init_logging(default_filter: &str, log_file: Option<&Path>) -> Result<LoggingGuard> {
    let file = log_file
        .map(open_log_file)
        .transpose()?
        .map(|f| Arc::new(Mutex::new(f)));

    let file_layer = file.as_ref().map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(SharedFileWriterMaker {
                file: Arc::clone(file),
            })
            .with_ansi(false)
            .with_target(true)
    });

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_filter(default_filter))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard { _file: file })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shared_writer_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("diag").join("logkeeper.log");
        let file = Arc::new(Mutex::new(open_log_file(&path).unwrap()));
        let maker = SharedFileWriterMaker {
            file: Arc::clone(&file),
        };

        maker.make_writer().write_all(b"first\n").unwrap();
        let mut writer = maker.make_writer();
        writer.write_all(b"second\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_open_log_file_keeps_existing_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logkeeper.log");
        fs::write(&path, "old\n").unwrap();

        let mut file = open_log_file(&path).unwrap();
        file.write_all(b"new\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_build_filter_accepts_default() {
        let filter = build_filter("logkeeper=debug");
        assert!(!filter.to_string().is_empty());
    }
}
