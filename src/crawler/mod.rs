//! Crawler module for cache-aware page fetching
//!
//! This module contains the core crawling logic, including:
//! - Sitemap discovery with nested index expansion
//! - HTTP fetching with cache probing and warm retries
//! - HTML parsing and link extraction
//! - Per-instance concurrency limiting
//! - Recursive crawl coordination and scheduled runs

mod coordinator;
mod fetcher;
mod gate;
mod orchestrator;
mod parser;
mod sitemap;

pub use coordinator::{ClientIdentity, CrawlerInstance};
pub use fetcher::{build_http_client, warm_backoff, FetchReport, FetchResult, Fetcher};
pub use gate::{ConcurrencyGate, GatePermit};
pub use orchestrator::Orchestrator;
pub use parser::{extract_links, extract_links_from_html};
pub use sitemap::{is_sitemap_url, parse_sitemap, resolve_sitemap, SITEMAP_NAMESPACE};

use crate::config::Config;
use crate::output::{RecordSink, RunSummary};
use crate::WarmError;
use std::sync::Arc;

/// Runs a single warming pass over every configured client
///
/// This is the library entry point for one-shot use. It will:
/// 1. Build one crawler instance per client
/// 2. Resolve each instance's sitemap
/// 3. Fetch, warm and (in recursive mode) follow links
/// 4. Log and return a summary per client
///
/// # Returns
///
/// * `Ok(Vec<(String, RunSummary)>)` - One entry per client that completed
/// * `Err(WarmError)` - The crawler instances could not be created
pub async fn warm_once(
    config: Config,
    sink: Arc<dyn RecordSink>,
) -> Result<Vec<(String, RunSummary)>, WarmError> {
    let orchestrator = Orchestrator::new(config, sink)?;
    Ok(orchestrator.run_once().await)
}
