//! Diagnostics for the service itself
//!
//! Separate from the log files the service stores for its clients: these are
//! `tracing` events about requests and failures, written to stderr and,
//! optionally, to a file.

mod file_writer;

pub use file_writer::{init_logging, LoggingGuard};
