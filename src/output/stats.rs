//! Per-run crawl statistics
//!
//! Counters are updated by concurrent fetch tasks and read once at the end of
//! a run to log a summary line per client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters for one run of one crawler instance
#[derive(Debug, Default)]
pub struct RunStats {
    pages_fetched: AtomicU64,
    pages_skipped: AtomicU64,
    non_html: AtomicU64,
    cache_hits: AtomicU64,
    warm_requests: AtomicU64,
    slow_pages: AtomicU64,
    errors: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.pages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_non_html(&self) {
        self.non_html.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warm_requests(&self, count: u32) {
        self.warm_requests
            .fetch_add(u64::from(count), Ordering::Relaxed);
    }

    pub fn record_slow_page(&self) {
        self.slow_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters
    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_skipped: self.pages_skipped.load(Ordering::Relaxed),
            non_html: self.non_html.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            warm_requests: self.warm_requests.load(Ordering::Relaxed),
            slow_pages: self.slow_pages.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            duration: Duration::ZERO,
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Full GETs that received a response
    pub pages_fetched: u64,

    /// URLs skipped because they were crawled within the recrawl interval
    pub pages_skipped: u64,

    /// Fetched responses that were not 200 text/html
    pub non_html: u64,

    /// Fetches whose final edge status was HIT
    pub cache_hits: u64,

    /// Cache-warming requests issued
    pub warm_requests: u64,

    /// Fetches slower than the threshold
    pub slow_pages: u64,

    /// Fetches that failed in any phase
    pub errors: u64,

    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl RunSummary {
    /// Hit ratio over fetched pages, as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.pages_fetched == 0 {
            0.0
        } else {
            self.cache_hits as f64 * 100.0 / self.pages_fetched as f64
        }
    }
}

/// Logs a one-line summary of a finished run
pub fn log_summary(client: &str, summary: &RunSummary) {
    tracing::info!(
        "[{}] Run finished in {:.1?}: {} fetched, {} skipped (fresh), {} non-HTML, \
         {:.1}% hits, {} warm requests, {} slow, {} errors",
        client,
        summary.duration,
        summary.pages_fetched,
        summary.pages_skipped,
        summary.non_html,
        summary.hit_rate(),
        summary.warm_requests,
        summary.slow_pages,
        summary.errors
    );
}
