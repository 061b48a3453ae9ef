//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CacheStatus` / `CacheProbe`: cache-status values read from response headers
//! - `CrawlIndex`: per-URL record of the last crawl, used to gate re-crawling

mod cache_status;
mod index;

pub use cache_status::{CacheProbe, CacheStatus};
pub use index::{CrawlIndex, CrawlRecord, RUN_START_SLACK_MS};
