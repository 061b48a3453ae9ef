//! Incremental re-crawl index
//!
//! Remembers when each normalized URL was last fetched so that a page crawled
//! recently is not fetched again until the recrawl interval has passed.

use crate::state::CacheStatus;
use crate::url::NormalizedUrl;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Clock slack applied when a run checks freshness against its own start time
///
/// Consecutive scheduled runs start one period apart give or take a few
/// milliseconds; without slack a recrawl interval equal to the period would
/// leave every page fresh on alternate runs.
pub const RUN_START_SLACK_MS: i64 = 500;

/// Outcome of the most recent fetch of a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRecord {
    /// When the URL was last fetched
    pub last_crawled: DateTime<Utc>,

    /// Edge cache status observed on that fetch
    pub cache_status: CacheStatus,

    /// Full GET response time in milliseconds
    pub response_time_ms: u64,
}

/// Per-instance map of normalized URL to its latest crawl record
///
/// The map sits behind a `std::sync::Mutex`; the lock is only taken for the
/// duration of a lookup or an insert and never across an await point.
#[derive(Debug)]
pub struct CrawlIndex {
    records: Mutex<HashMap<NormalizedUrl, CrawlRecord>>,
    recrawl_interval: Duration,
}

impl CrawlIndex {
    /// Creates an empty index
    ///
    /// # Arguments
    ///
    /// * `recrawl_interval` - How long a crawled URL stays fresh
    pub fn new(recrawl_interval: std::time::Duration) -> Self {
        let recrawl_interval = Duration::from_std(recrawl_interval).unwrap_or(Duration::MAX);

        Self {
            records: Mutex::new(HashMap::new()),
            recrawl_interval,
        }
    }

    /// Returns the configured recrawl interval
    pub fn recrawl_interval(&self) -> Duration {
        self.recrawl_interval
    }

    /// Returns true if `url` has never been crawled or its record is older
    /// than the recrawl interval
    pub fn should_crawl(&self, url: &NormalizedUrl) -> bool {
        self.should_crawl_at(url, Utc::now())
    }

    /// Same as [`should_crawl`](Self::should_crawl) with an explicit clock
    pub fn should_crawl_at(&self, url: &NormalizedUrl, now: DateTime<Utc>) -> bool {
        match self.lock().get(url) {
            Some(record) => now - record.last_crawled > self.recrawl_interval,
            None => true,
        }
    }

    /// Returns true if `url` is due in a run that started at `run_started`
    ///
    /// Pair with [`record_at`](Self::record_at) using the same run start, so a
    /// page stays fresh for one interval measured from run to run rather than
    /// from the moment it happened to be fetched.
    pub fn is_due(&self, url: &NormalizedUrl, run_started: DateTime<Utc>) -> bool {
        self.should_crawl_at(url, run_started + Duration::milliseconds(RUN_START_SLACK_MS))
    }

    /// Records a completed fetch of `url`, replacing any previous record
    pub fn record(&self, url: &NormalizedUrl, cache_status: CacheStatus, response_time_ms: u64) {
        self.record_at(url, cache_status, response_time_ms, Utc::now());
    }

    /// Same as [`record`](Self::record) with an explicit clock
    ///
    /// `last_crawled` never moves backwards: if `now` is earlier than the
    /// stored timestamp the stored timestamp is kept.
    pub fn record_at(
        &self,
        url: &NormalizedUrl,
        cache_status: CacheStatus,
        response_time_ms: u64,
        now: DateTime<Utc>,
    ) {
        let mut records = self.lock();

        let last_crawled = match records.get(url) {
            Some(previous) if previous.last_crawled > now => previous.last_crawled,
            _ => now,
        };

        records.insert(
            url.clone(),
            CrawlRecord {
                last_crawled,
                cache_status,
                response_time_ms,
            },
        );
    }

    /// Returns a copy of the record for `url`, if any
    pub fn get(&self, url: &NormalizedUrl) -> Option<CrawlRecord> {
        self.lock().get(url).cloned()
    }

    /// Number of URLs in the index
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NormalizedUrl, CrawlRecord>> {
        // A panic while holding the lock cannot leave a half-written record.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
