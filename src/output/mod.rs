//! Output module for crawl records and run summaries
//!
//! This module handles:
//! - The record sink interface the fetcher reports to
//! - Append-only CSV tables for cache performance, slow pages and errors
//! - Per-run statistics

mod csv_sink;
mod memory;
pub mod stats;
mod traits;

pub use csv_sink::CsvRecordSink;
pub use memory::MemoryRecordSink;
pub use stats::{log_summary, RunStats, RunSummary};
pub use traits::{
    format_timestamp, CachePerformanceRow, ErrorRow, OutputError, OutputResult, RecordSink,
    SlowPageRow, TIMESTAMP_FORMAT,
};
