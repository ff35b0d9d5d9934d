//! Logkeeper - per-host, per-client log collection service
//!
//! Remote clients push log lines tagged with a severity; lines are appended
//! to `<root>/logs/<host>/<client>/<MM-dd-yyyy>/<Severity>.log` and can be
//! listed or fetched back over HTTP.

pub mod clock;
pub mod config;
pub mod identity;
pub mod ingest;
pub mod logging;
pub mod server;
pub mod severity;
pub mod storage;
