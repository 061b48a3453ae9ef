//! Cache-aware HTTP fetcher
//!
//! This module handles every page request a crawler instance makes:
//! - Building HTTP clients with the client identity's user agent
//! - HEAD probes reading the edge and proxy cache-status headers
//! - Cache-warming requests with progressive backoff while the edge misses
//! - The timed full GET, slow-page detection and row emission
//! - Error classification

use crate::config::Config;
use crate::crawler::gate::{ConcurrencyGate, GatePermit};
use crate::output::{CachePerformanceRow, ErrorRow, RecordSink, SlowPageRow};
use crate::state::{CacheProbe, CrawlIndex};
use crate::url::{normalize_url, warm_url, NormalizedUrl};
use crate::WarmError;
use chrono::{DateTime, Local, Utc};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Measurements of one completed full fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    /// Cache status reported by the last probe before the full GET
    pub probe: CacheProbe,

    /// HTTP status code of the full GET
    pub status_code: u16,

    /// Time until the full GET's response headers arrived
    pub response_time_ms: u64,

    /// Number of cache-warming requests issued
    pub warm_requests: u32,

    /// Whether the response time exceeded the slow-page threshold
    pub slow: bool,
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// 200 response with an HTML body
    Page {
        report: FetchReport,
        /// Decoded page body
        body: String,
    },

    /// Response received but not a 200 text/html page
    NotHtml {
        report: FetchReport,
        /// Content-Type header value, empty if absent
        content_type: String,
    },

    /// URL was crawled within the recrawl interval; nothing was requested
    Skipped,

    /// A request failed in some phase; the error has already been reported
    Failed { error: WarmError },
}

impl FetchResult {
    /// Returns the page body if the fetch produced HTML content
    pub fn into_content(self) -> Option<String> {
        match self {
            Self::Page { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns the fetch measurements if a full GET completed
    pub fn report(&self) -> Option<&FetchReport> {
        match self {
            Self::Page { report, .. } | Self::NotHtml { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Builds an HTTP client sending `user_agent` with every request
///
/// Per-request timeouts are set by the caller; the client only bounds the
/// connect phase.
///
/// # Example
///
/// ```no_run
/// use cache_warmer::crawler::build_http_client;
///
/// let client = build_http_client("Mozilla/5.0 (X11; Linux x86_64)").unwrap();
/// ```
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Delay before the re-probe following warm request number `retry` (1-based)
///
/// With the default 5s base this gives 5s, 10s and 15s.
pub fn warm_backoff(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(retry)
}

/// Reads the edge and proxy cache statuses from a response
fn read_probe(headers: &HeaderMap, edge_header: &str, proxy_header: &str) -> CacheProbe {
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    CacheProbe::from_headers(value(edge_header), value(proxy_header))
}

/// State carried from the probe and warm phases into the full GET
struct FullFetch {
    probe: CacheProbe,
    warm_requests: u32,
    run_started: DateTime<Utc>,
}

/// Fetcher bound to one crawler instance
///
/// Holds the instance's HTTP client, gate and crawl index; the record sink is
/// shared by every instance.
pub struct Fetcher {
    client: Client,
    config: Arc<Config>,
    gate: ConcurrencyGate,
    index: Arc<CrawlIndex>,
    sink: Arc<dyn RecordSink>,
}

impl Fetcher {
    pub fn new(
        client: Client,
        config: Arc<Config>,
        gate: ConcurrencyGate,
        index: Arc<CrawlIndex>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            client,
            config,
            gate,
            index,
            sink,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Fetches a page, warming the edge cache first if it reports a miss
    ///
    /// # Request Flow
    ///
    /// 1. Skip if the crawl index says the page is still fresh
    /// 2. HEAD probe for the cache-status headers
    /// 3. While the edge reports MISS (up to `max-warm-retries` times):
    ///    GET the warm URL, back off `n * warm-backoff`, re-probe
    /// 4. Timed full GET; emit a cache row, and a slow row if over threshold
    /// 5. Record the result in the crawl index
    ///
    /// The whole flow runs under a gate permit, except for the backoff sleeps.
    /// Failures in any phase are logged and emitted as an error row; they are
    /// never returned as `Err`.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        self.fetch_in_run(url, Utc::now()).await
    }

    /// Same as [`fetch`](Self::fetch) for a run that started at `run_started`
    ///
    /// Freshness is checked against the run start and the crawl index records
    /// the run start, so a recrawl interval equal to the schedule period still
    /// re-fetches every page on every scheduled run.
    pub async fn fetch_in_run(&self, url: &str, run_started: DateTime<Utc>) -> FetchResult {
        let key = match normalize_url(url) {
            Ok(key) => key,
            Err(e) => return self.fail(url, e.into()),
        };

        if !self.index.is_due(&key, run_started) {
            tracing::debug!("Skipping {} (crawled within the recrawl interval)", url);
            return FetchResult::Skipped;
        }

        match self.fetch_with_warming(url, &key, run_started).await {
            Ok(result) => result,
            Err(e) => self.fail(url, e),
        }
    }

    async fn fetch_with_warming(
        &self,
        url: &str,
        key: &NormalizedUrl,
        run_started: DateTime<Utc>,
    ) -> Result<FetchResult, WarmError> {
        let cache = &self.config.cache;

        let mut permit = self.gate.acquire().await?;
        let mut probe = self.probe(url).await?;
        let mut warm_requests = 0;

        while probe.edge.is_miss() && warm_requests < cache.max_warm_retries {
            warm_requests += 1;
            tracing::warn!(
                "Cache MISS for {}, warming (attempt {}/{})",
                url,
                warm_requests,
                cache.max_warm_retries
            );

            self.warm(url).await?;

            drop(permit);
            tokio::time::sleep(warm_backoff(cache.warm_backoff(), warm_requests)).await;
            permit = self.gate.acquire().await?;

            probe = self.probe(url).await?;

            if probe.edge.is_hit() {
                tracing::info!(
                    "Cache HIT for {} after {} warm request(s)",
                    url,
                    warm_requests
                );
            }
        }

        let fetched = FullFetch {
            probe,
            warm_requests,
            run_started,
        };
        self.full_fetch(url, key, fetched, permit).await
    }

    async fn probe(&self, url: &str) -> Result<CacheProbe, WarmError> {
        let response = self
            .client
            .head(url)
            .timeout(self.config.timeouts.probe())
            .send()
            .await
            .map_err(|e| WarmError::from_request(url, e))?;

        Ok(read_probe(
            response.headers(),
            &self.config.cache.edge_header,
            &self.config.cache.proxy_header,
        ))
    }

    async fn warm(&self, url: &str) -> Result<(), WarmError> {
        let target = warm_url(url, &self.config.cache.warm_marker)?;

        let response = self
            .client
            .get(&target)
            .timeout(self.config.timeouts.warm())
            .send()
            .await
            .map_err(|e| WarmError::from_request(&target, e))?;

        tracing::debug!("Warm request {} returned {}", target, response.status());
        Ok(())
    }

    async fn full_fetch(
        &self,
        url: &str,
        key: &NormalizedUrl,
        fetched: FullFetch,
        _permit: GatePermit,
    ) -> Result<FetchResult, WarmError> {
        let FullFetch {
            probe,
            warm_requests,
            run_started,
        } = fetched;

        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .timeout(self.config.timeouts.fetch())
            .send()
            .await
            .map_err(|e| WarmError::from_request(url, e))?;
        let response_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let slow = response_time_ms > self.config.crawler.slow_page_threshold_ms;
        if slow {
            tracing::warn!("SLOW PAGE: {} | Response Time: {}ms", url, response_time_ms);
            self.emit(self.sink.slow_page(&SlowPageRow {
                timestamp: Local::now(),
                url: url.to_string(),
                response_time_ms,
            }));
        }

        tracing::info!(
            "Visited: {} | Edge: {} | Proxy: {} | Time: {}ms",
            url,
            probe.edge_label(),
            probe.proxy_label(),
            response_time_ms
        );
        self.emit(self.sink.cache_performance(&CachePerformanceRow {
            timestamp: Local::now(),
            url: url.to_string(),
            edge_status: probe.edge_label().to_string(),
            proxy_status: probe.proxy_label().to_string(),
            response_time_ms,
        }));

        self.index.record_at(key, probe.edge.clone(), response_time_ms, run_started);

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let report = FetchReport {
            probe,
            status_code: status.as_u16(),
            response_time_ms,
            warm_requests,
            slow,
        };

        if status != StatusCode::OK || !content_type.contains("text/html") {
            tracing::debug!("Not following {} ({}, {:?})", url, status, content_type);
            return Ok(FetchResult::NotHtml {
                report,
                content_type,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| WarmError::from_request(url, e))?;

        Ok(FetchResult::Page { report, body })
    }

    fn fail(&self, url: &str, error: WarmError) -> FetchResult {
        tracing::error!("Error: {} | {}", url, error);
        self.emit(self.sink.error(&ErrorRow {
            timestamp: Local::now(),
            url: url.to_string(),
            message: error.to_string(),
        }));
        FetchResult::Failed { error }
    }

    fn emit(&self, written: crate::output::OutputResult<()>) {
        if let Err(e) = written {
            tracing::warn!("Failed to write output row: {}", e);
        }
    }
}
