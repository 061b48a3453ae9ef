use crate::output::traits::{
    CachePerformanceRow, ErrorRow, OutputResult, RecordSink, SlowPageRow,
};
use std::sync::{Mutex, MutexGuard};

/// Record sink that keeps every row in memory
///
/// Useful when embedding the warmer or in tests that inspect what a crawl
/// reported.
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    cache_rows: Mutex<Vec<CachePerformanceRow>>,
    slow_rows: Mutex<Vec<SlowPageRow>>,
    error_rows: Mutex<Vec<ErrorRow>>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_rows(&self) -> Vec<CachePerformanceRow> {
        lock(&self.cache_rows).clone()
    }

    pub fn slow_rows(&self) -> Vec<SlowPageRow> {
        lock(&self.slow_rows).clone()
    }

    pub fn error_rows(&self) -> Vec<ErrorRow> {
        lock(&self.error_rows).clone()
    }
}

fn lock<T>(rows: &Mutex<Vec<T>>) -> MutexGuard<'_, Vec<T>> {
    rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordSink for MemoryRecordSink {
    fn cache_performance(&self, row: &CachePerformanceRow) -> OutputResult<()> {
        lock(&self.cache_rows).push(row.clone());
        Ok(())
    }

    fn slow_page(&self, row: &SlowPageRow) -> OutputResult<()> {
        lock(&self.slow_rows).push(row.clone());
        Ok(())
    }

    fn error(&self, row: &ErrorRow) -> OutputResult<()> {
        lock(&self.error_rows).push(row.clone());
        Ok(())
    }
}
