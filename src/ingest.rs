//! Request-level contract for listing, fetching and recording logs
//!
//! Every input is validated before the filesystem is touched. This is the
//! only layer that decides what a caller gets told; the HTTP boundary just
//! maps the typed results onto status codes.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::debug;

use crate::clock::Clock;
use crate::identity::ClientIdentity;
use crate::severity::{Severity, SeverityParseError};
use crate::storage::{
    AppendOutcome, DiskFs, LogContents, LogFileInfo, LogFs, LogStore, PathResolver, StorageError,
};

/// Reply message for a record that created its file
pub const FILE_CREATED: &str = "File Created";

/// Reply message for a record appended to an existing file
pub const FILE_APPENDED: &str = "File Appended";

/// Error text for a fetch with no matching file
pub const LOG_FILE_NOT_FOUND: &str = "Log file not found";

/// Successful outcome of a record request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    Appended,
}

impl RecordOutcome {
    /// Message reported back to the caller
    pub fn message(&self) -> &'static str {
        match self {
            RecordOutcome::Created => FILE_CREATED,
            RecordOutcome::Appended => FILE_APPENDED,
        }
    }
}

/// Ways a request can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Bad severity, date, message or host; nothing was touched
    #[error("{0}")]
    InvalidInput(String),

    /// No log file for the requested severity and date
    #[error("Log file not found")]
    NotFound,

    /// An append was attempted and failed
    #[error("{0}")]
    WriteFailed(String),

    /// Reading or listing the partition failed
    #[error("{0}")]
    Filesystem(String),
}

impl From<SeverityParseError> for IngestError {
    fn from(e: SeverityParseError) -> Self {
        IngestError::InvalidInput(e.to_string())
    }
}

impl From<StorageError> for IngestError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidSegment(_) => IngestError::InvalidInput(e.to_string()),
            StorageError::Io { .. } => IngestError::Filesystem(e.to_string()),
        }
    }
}

/// Parse an optional `date` query value.
///
/// Accepts `yyyy-MM-dd`, a `yyyy-MM-ddTHH:mm:ss` local timestamp or an
/// RFC 3339 timestamp (its own offset decides the day). Blank means absent.
pub fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, IngestError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Some(datetime.date()));
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(datetime.date_naive()));
    }

    Err(IngestError::InvalidInput(format!(
        "Invalid date '{}', expected yyyy-MM-dd",
        raw
    )))
}

/// Stateless request handler over a resolver, a store and a clock
#[derive(Clone)]
pub struct IngestService {
    resolver: PathResolver,
    store: LogStore,
    clock: Arc<dyn Clock>,
}

impl IngestService {
    pub fn new(resolver: PathResolver, store: LogStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            resolver,
            store,
            clock,
        }
    }

    /// Service over `fs` rooted at `root`
    pub fn with_fs(root: impl Into<PathBuf>, fs: Arc<dyn LogFs>, clock: Arc<dyn Clock>) -> Self {
        Self::new(PathResolver::new(root, fs.clone()), LogStore::new(fs), clock)
    }

    /// Service over the real filesystem rooted at `root`
    pub fn on_disk(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self::with_fs(root, Arc::new(DiskFs), clock)
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    fn date_or_today(&self, raw: Option<&str>) -> Result<NaiveDate, IngestError> {
        Ok(parse_date(raw)?.unwrap_or_else(|| self.clock.now().date()))
    }

    /// Log files in the client's partition for `host` on `date` (today if absent)
    pub fn list(
        &self,
        identity: &ClientIdentity,
        host: &str,
        date: Option<&str>,
    ) -> Result<Vec<LogFileInfo>, IngestError> {
        let date = self.date_or_today(date)?;
        let dir = self.resolver.locate(identity, host, date)?;
        let files = self.store.list_files(&dir)?;

        debug!(client = %identity, host, %date, count = files.len(), "Listed log files");
        Ok(files)
    }

    /// Content of one severity file in the client's partition
    pub fn fetch(
        &self,
        identity: &ClientIdentity,
        host: &str,
        severity: &str,
        date: Option<&str>,
    ) -> Result<LogContents, IngestError> {
        let severity: Severity = severity.parse()?;
        let date = self.date_or_today(date)?;
        let dir = self.resolver.locate(identity, host, date)?;

        match self.store.read_file(&dir, severity)? {
            Some(contents) => {
                debug!(client = %identity, host, %severity, %date, bytes = contents.bytes.len(), "Fetched log file");
                Ok(contents)
            }
            None => Err(IngestError::NotFound),
        }
    }

    /// Append `message` to today's severity file for the client.
    ///
    /// The write path never takes a caller-supplied date. One clock reading
    /// provides both the partition date and the line timestamp.
    pub fn record(
        &self,
        identity: &ClientIdentity,
        host: &str,
        severity: &str,
        message: Option<&str>,
    ) -> Result<RecordOutcome, IngestError> {
        let severity: Severity = severity.parse()?;
        let message = match message {
            Some(message) if !message.is_empty() => message,
            _ => return Err(IngestError::InvalidInput("A message is required".to_string())),
        };

        let now = self.clock.now();
        let dir = self.resolver.resolve(identity, host, now.date())?;

        match self.store.append_line(&dir, severity, now, message) {
            AppendOutcome::Created => {
                debug!(client = %identity, host, %severity, "Created log file");
                Ok(RecordOutcome::Created)
            }
            AppendOutcome::Appended => Ok(RecordOutcome::Appended),
            AppendOutcome::Failed(description) => Err(IngestError::WriteFailed(description)),
        }
    }
}

impl std::fmt::Debug for IngestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestService")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryFs;
    use std::io;
    use std::path::Path;

    struct Harness {
        service: IngestService,
        memfs: Arc<MemoryFs>,
        clock: Arc<FixedClock>,
    }

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn harness() -> Harness {
        let memfs = Arc::new(MemoryFs::new());
        let clock = Arc::new(FixedClock::new(at(7, 10, 15, 0)));
        let service = IngestService::with_fs("/srv/logkeeper", memfs.clone(), clock.clone());
        Harness {
            service,
            memfs,
            clock,
        }
    }

    fn client() -> ClientIdentity {
        ClientIdentity::from_raw("10.0.0.5")
    }

    #[test]
    fn test_parse_date_formats() {
        let march_7 = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(parse_date(None).unwrap(), None);
        assert_eq!(parse_date(Some("")).unwrap(), None);
        assert_eq!(parse_date(Some("  ")).unwrap(), None);
        assert_eq!(parse_date(Some("2024-03-07")).unwrap(), Some(march_7));
        assert_eq!(parse_date(Some("2024-03-07T23:10:00")).unwrap(), Some(march_7));
        assert_eq!(
            parse_date(Some("2024-03-07T23:10:00+02:00")).unwrap(),
            Some(march_7)
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        for raw in ["03-07-2024", "2024-13-01", "yesterday", "2024-02-30"] {
            assert!(
                matches!(parse_date(Some(raw)), Err(IngestError::InvalidInput(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_record_then_fetch_round_trip() {
        let h = harness();

        let first = h.service.record(&client(), "shop", "Info", Some("x")).unwrap();
        h.clock.set(at(7, 10, 15, 9));
        let second = h.service.record(&client(), "shop", "Info", Some("y")).unwrap();

        assert_eq!(first, RecordOutcome::Created);
        assert_eq!(second, RecordOutcome::Appended);
        assert_eq!(first.message(), "File Created");
        assert_eq!(second.message(), "File Appended");

        let contents = h
            .service
            .fetch(&client(), "shop", "Info", Some("2024-03-07"))
            .unwrap();
        assert_eq!(contents.bytes, b"[10:15:00]: x\n[10:15:09]: y\n");
    }

    #[test]
    fn test_record_writes_to_todays_partition() {
        let h = harness();
        h.service.record(&client(), "shop", "Error", Some("boom")).unwrap();

        assert!(h
            .memfs
            .has_dir(Path::new("/srv/logkeeper/logs/shop/10.0.0.5/03-07-2024")));

        // Defaults to the clock's date when none is given
        let contents = h.service.fetch(&client(), "shop", "error", None).unwrap();
        assert_eq!(contents.bytes, b"[10:15:00]: boom\n");
    }

    #[test]
    fn test_record_rejects_unknown_severity_before_io() {
        let h = harness();
        let err = h
            .service
            .record(&client(), "shop", "Verbose", Some("x"))
            .unwrap_err();

        assert_eq!(err, IngestError::InvalidInput("Unknown log type 'Verbose'".to_string()));
        assert_eq!(h.memfs.dir_count(), 0);
    }

    #[test]
    fn test_record_requires_message() {
        let h = harness();
        for message in [None, Some("")] {
            let err = h.service.record(&client(), "shop", "Info", message).unwrap_err();
            assert!(matches!(err, IngestError::InvalidInput(_)));
        }
        assert_eq!(h.memfs.dir_count(), 0);
    }

    #[test]
    fn test_record_rejects_multi_segment_host() {
        let h = harness();
        let err = h
            .service
            .record(&client(), "../etc", "Info", Some("x"))
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidInput(_)));
        assert_eq!(h.memfs.dir_count(), 0);
    }

    #[test]
    fn test_record_write_failure() {
        let h = harness();
        h.memfs.fail_writes(Some(io::ErrorKind::PermissionDenied));

        let err = h.service.record(&client(), "shop", "Info", Some("x")).unwrap_err();
        match err {
            IngestError::WriteFailed(description) => assert!(description.contains("refused")),
            other => panic!("expected write failure, got {:?}", other),
        }
    }

    #[test]
    fn test_fetch_without_record_is_not_found() {
        let h = harness();
        h.service.record(&client(), "shop", "Info", Some("x")).unwrap();

        let err = h.service.fetch(&client(), "shop", "Debug", None).unwrap_err();
        assert_eq!(err, IngestError::NotFound);
        assert_eq!(err.to_string(), "Log file not found");
    }

    #[test]
    fn test_fetch_does_not_create_partition() {
        let h = harness();
        let err = h.service.fetch(&client(), "shop", "Info", None).unwrap_err();
        assert_eq!(err, IngestError::NotFound);
        assert_eq!(h.memfs.dir_count(), 0);
    }

    #[test]
    fn test_fetch_rejects_bad_severity_and_date() {
        let h = harness();
        assert!(matches!(
            h.service.fetch(&client(), "shop", "Trace", None),
            Err(IngestError::InvalidInput(_))
        ));
        assert!(matches!(
            h.service.fetch(&client(), "shop", "Info", Some("07/03/2024")),
            Err(IngestError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fetch_other_date() {
        let h = harness();
        h.service.record(&client(), "shop", "Info", Some("today")).unwrap();
        h.clock.set(at(8, 0, 0, 1));

        // "now" moved to the 8th, so today's file is gone from the default view
        assert_eq!(
            h.service.fetch(&client(), "shop", "Info", None).unwrap_err(),
            IngestError::NotFound
        );
        let older = h
            .service
            .fetch(&client(), "shop", "Info", Some("2024-03-07"))
            .unwrap();
        assert_eq!(older.bytes, b"[10:15:00]: today\n");
    }

    #[test]
    fn test_list_empty_partition() {
        let h = harness();
        let files = h.service.list(&client(), "shop", None).unwrap();
        assert!(files.is_empty());
        assert_eq!(h.memfs.dir_count(), 0);
    }

    #[test]
    fn test_list_after_records() {
        let h = harness();
        h.service.record(&client(), "shop", "Info", Some("a")).unwrap();
        h.service.record(&client(), "shop", "Fatal", Some("b")).unwrap();

        let files = h.service.list(&client(), "shop", Some("2024-03-07")).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Fatal.log", "Info.log"]);
        assert_eq!(files[0].size, "[10:15:00]: b\n".len() as u64);
    }

    #[test]
    fn test_clients_are_isolated() {
        let h = harness();
        let other = ClientIdentity::from_raw("10.0.0.6");
        h.service.record(&client(), "shop", "Info", Some("mine")).unwrap();

        assert!(h.service.list(&other, "shop", None).unwrap().is_empty());
        assert_eq!(
            h.service.fetch(&other, "shop", "Info", None).unwrap_err(),
            IngestError::NotFound
        );
    }

    #[test]
    fn test_storage_error_mapping() {
        let invalid: IngestError = StorageError::InvalidSegment("..".to_string()).into();
        assert!(matches!(invalid, IngestError::InvalidInput(_)));

        let io_err: IngestError = StorageError::Io {
            path: PathBuf::from("/x"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert_eq!(io_err, IngestError::Filesystem("/x: denied".to_string()));
    }
}
