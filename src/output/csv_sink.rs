//! Append-only CSV record sink
//!
//! Each table lives in its own file. A header row is written when the file is
//! created (or found empty); afterwards rows are only ever appended.

use crate::config::OutputConfig;
use crate::output::traits::{
    format_timestamp, CachePerformanceRow, ErrorRow, OutputError, OutputResult, RecordSink,
    SlowPageRow,
};
use csv::{Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const CACHE_HEADERS: [&str; 5] = [
    "Timestamp",
    "URL",
    "QUIC Cache",
    "LiteSpeed Cache",
    "Response Time (ms)",
];
const SLOW_PAGE_HEADERS: [&str; 3] = ["Timestamp", "URL", "Response Time (ms)"];
const ERROR_HEADERS: [&str; 3] = ["Timestamp", "URL", "Error"];

/// A single CSV file opened for appending
struct CsvTable {
    path: PathBuf,
    writer: Mutex<Writer<File>>,
}

impl CsvTable {
    fn open(path: &Path, headers: &[&str]) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(headers)?;
            writer.flush()?;
            tracing::debug!("Created log file {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
        })
    }

    fn append<I, T>(&self, record: I) -> OutputResult<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut writer = self.writer.lock().map_err(|_| {
            OutputError::Write(format!("writer for {} is poisoned", self.path.display()))
        })?;
        writer.write_record(record)?;
        writer.flush()?;
        Ok(())
    }
}

/// Record sink writing the three CSV tables configured in `[output]`
pub struct CsvRecordSink {
    cache_log: CsvTable,
    slow_pages: CsvTable,
    errors: CsvTable,
}

impl CsvRecordSink {
    /// Opens (or creates) the configured CSV files
    ///
    /// # Returns
    ///
    /// * `Ok(CsvRecordSink)` - All three files are ready for appending
    /// * `Err(OutputError)` - A file or its parent directory could not be created
    pub fn open(config: &OutputConfig) -> OutputResult<Self> {
        Ok(Self {
            cache_log: CsvTable::open(Path::new(&config.cache_log_path), &CACHE_HEADERS)?,
            slow_pages: CsvTable::open(Path::new(&config.slow_pages_path), &SLOW_PAGE_HEADERS)?,
            errors: CsvTable::open(Path::new(&config.error_log_path), &ERROR_HEADERS)?,
        })
    }
}

impl RecordSink for CsvRecordSink {
    fn cache_performance(&self, row: &CachePerformanceRow) -> OutputResult<()> {
        self.cache_log.append([
            format_timestamp(&row.timestamp),
            row.url.clone(),
            row.edge_status.clone(),
            row.proxy_status.clone(),
            row.response_time_ms.to_string(),
        ])
    }

    fn slow_page(&self, row: &SlowPageRow) -> OutputResult<()> {
        self.slow_pages.append([
            format_timestamp(&row.timestamp),
            row.url.clone(),
            row.response_time_ms.to_string(),
        ])
    }

    fn error(&self, row: &ErrorRow) -> OutputResult<()> {
        self.errors.append([
            format_timestamp(&row.timestamp),
            row.url.clone(),
            row.message.clone(),
        ])
    }
}
