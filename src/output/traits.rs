//! Record sink trait and row types
//!
//! Every full fetch produces a cache-performance row; slow fetches add a
//! slow-page row and failed fetches an error row. Sinks decide where the rows
//! end up.

use chrono::{DateTime, Local};
use thiserror::Error;

/// Timestamp format used in every emitted row
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One completed full fetch and the cache status it was served with
#[derive(Debug, Clone, PartialEq)]
pub struct CachePerformanceRow {
    pub timestamp: DateTime<Local>,
    pub url: String,
    pub edge_status: String,
    pub proxy_status: String,
    pub response_time_ms: u64,
}

/// A full fetch that exceeded the slow-page threshold
#[derive(Debug, Clone, PartialEq)]
pub struct SlowPageRow {
    pub timestamp: DateTime<Local>,
    pub url: String,
    pub response_time_ms: u64,
}

/// A fetch that failed in any phase
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRow {
    pub timestamp: DateTime<Local>,
    pub url: String,
    pub message: String,
}

/// Formats a row timestamp
pub fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Destination for the rows emitted while crawling
///
/// Implementations are shared by every crawler instance and called from many
/// tasks at once, so they must synchronize internally. Writes are expected to
/// be short; callers treat a failed write as a warning, never as a failed
/// fetch.
pub trait RecordSink: Send + Sync {
    /// Records the outcome of a full fetch
    fn cache_performance(&self, row: &CachePerformanceRow) -> OutputResult<()>;

    /// Records a page slower than the threshold
    fn slow_page(&self, row: &SlowPageRow) -> OutputResult<()>;

    /// Records a failed fetch
    fn error(&self, row: &ErrorRow) -> OutputResult<()>;
}
