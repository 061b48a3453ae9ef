//! Crawler instance - one client identity's crawl of the site
//!
//! This module ties the pieces of a run together:
//! - Resolving the sitemap, or falling back to the base URL
//! - Fanning out one task per sitemap URL
//! - Depth-bounded recursive link following with a per-run visited map
//! - Collecting per-run statistics

use crate::config::{ClientConfig, Config, CrawlMode};
use crate::crawler::fetcher::{build_http_client, FetchReport, FetchResult, Fetcher};
use crate::crawler::gate::ConcurrencyGate;
use crate::crawler::parser::extract_links_from_html;
use crate::crawler::sitemap::resolve_sitemap;
use crate::output::{RecordSink, RunStats, RunSummary};
use crate::state::CrawlIndex;
use crate::url::{extract_domain, normalize_url, NormalizedUrl};
use crate::{UrlError, WarmError};
use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use url::Url;

/// Who a crawler instance pretends to be
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub name: String,
    pub base_url: Url,
    pub user_agent: String,
}

/// A page reached during the current run
#[derive(Debug)]
struct Visit {
    /// Shallowest depth the page has been reached at
    depth: u32,

    /// In-domain links found on the page, once it has been fetched
    links: Option<Arc<Vec<NormalizedUrl>>>,
}

/// What a crawl task should do with the URL it reached
#[derive(Debug)]
enum Claim {
    /// First visit this run
    Fetch,

    /// Fetched earlier from a deeper route; follow its links again from here
    Expand(Arc<Vec<NormalizedUrl>>),

    /// Already handled at this depth or shallower
    Done,
}

/// State that lives for a single run of one instance
#[derive(Debug)]
struct CrawlRun {
    started: DateTime<Utc>,
    visited: Mutex<HashMap<NormalizedUrl, Visit>>,
    stats: RunStats,
}

impl CrawlRun {
    fn new() -> Self {
        Self {
            started: Utc::now(),
            visited: Mutex::new(HashMap::new()),
            stats: RunStats::default(),
        }
    }

    /// Marks `url` as reached at `depth`
    ///
    /// Each page is fetched at most once per run. Reaching an already fetched
    /// page at a shallower depth hands back its links so they can be followed
    /// with the extra depth budget. URLs that cannot be normalized are let
    /// through so the fetcher reports them.
    fn claim(&self, url: &str, depth: u32) -> Claim {
        let Ok(key) = normalize_url(url) else {
            return Claim::Fetch;
        };

        match self.lock_visited().entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(Visit { depth, links: None });
                Claim::Fetch
            }
            Entry::Occupied(mut slot) => {
                let visit = slot.get_mut();
                if depth >= visit.depth {
                    return Claim::Done;
                }

                visit.depth = depth;
                match &visit.links {
                    Some(links) => Claim::Expand(Arc::clone(links)),
                    // Still being fetched; the fetching task picks up the new depth.
                    None => Claim::Done,
                }
            }
        }
    }

    /// Stores the links found on `url` after fetching it at `depth`
    ///
    /// Returns the links with the shallowest depth the page has been reached
    /// at so far, which may be lower than `depth` if another route got there
    /// while the fetch was in flight.
    fn store_links(
        &self,
        url: &str,
        links: Vec<NormalizedUrl>,
        depth: u32,
    ) -> (Arc<Vec<NormalizedUrl>>, u32) {
        let links = Arc::new(links);
        let Ok(key) = normalize_url(url) else {
            return (links, depth);
        };

        let mut visited = self.lock_visited();
        let visit = visited.entry(key).or_insert(Visit { depth, links: None });
        visit.depth = visit.depth.min(depth);
        visit.links = Some(Arc::clone(&links));

        (links, visit.depth)
    }

    fn lock_visited(&self) -> MutexGuard<'_, HashMap<NormalizedUrl, Visit>> {
        self.visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tally(&self, result: &FetchResult) {
        match result {
            FetchResult::Page { report, .. } => self.tally_report(report),
            FetchResult::NotHtml { report, .. } => {
                self.stats.record_non_html();
                self.tally_report(report);
            }
            FetchResult::Skipped => self.stats.record_skipped(),
            FetchResult::Failed { .. } => self.stats.record_error(),
        }
    }

    fn tally_report(&self, report: &FetchReport) {
        self.stats.record_fetched();
        self.stats.record_warm_requests(report.warm_requests);

        if report.probe.edge.is_hit() {
            self.stats.record_cache_hit();
        }
        if report.slow {
            self.stats.record_slow_page();
        }
    }
}

/// One client identity crawling the configured site
///
/// Each instance owns its HTTP client, concurrency gate and crawl index;
/// instances only share the configuration and the record sink.
pub struct CrawlerInstance {
    identity: ClientIdentity,
    domain: String,
    config: Arc<Config>,
    fetcher: Fetcher,
    index: Arc<CrawlIndex>,
}

impl CrawlerInstance {
    /// Creates an instance for `client`
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlerInstance)` - Ready to run
    /// * `Err(WarmError)` - The base URL is invalid or the HTTP client could not be built
    pub fn new(
        config: Arc<Config>,
        client: &ClientConfig,
        sink: Arc<dyn RecordSink>,
    ) -> Result<Self, WarmError> {
        let base_url = Url::parse(&config.site.base_url)?;
        let domain = extract_domain(&base_url).ok_or(UrlError::MissingDomain)?;

        let http = build_http_client(&client.user_agent)?;
        let index = Arc::new(CrawlIndex::new(config.crawler.recrawl_interval()));
        let gate = ConcurrencyGate::new(config.crawler.max_concurrent_requests as usize);
        let fetcher = Fetcher::new(http, Arc::clone(&config), gate, Arc::clone(&index), sink);

        Ok(Self {
            identity: ClientIdentity {
                name: client.name.clone(),
                base_url,
                user_agent: client.user_agent.clone(),
            },
            domain,
            config,
            fetcher,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Crawl index kept by this instance across runs
    pub fn index(&self) -> &CrawlIndex {
        &self.index
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        self.fetcher.gate()
    }

    /// Performs one full run: sitemap discovery, then every seed crawled
    ///
    /// Completes once every task of the run has settled. Failures are
    /// reported through the record sink and counted in the summary.
    pub async fn run(&self) -> RunSummary {
        let started = Instant::now();
        let run = CrawlRun::new();

        tracing::info!("[{}] Starting run for {}", self.name(), self.identity.base_url);

        let seeds = self.discover_seeds().await;
        join_all(seeds.into_iter().map(|url| self.visit_seed(&run, url))).await;

        let mut summary = run.stats.snapshot();
        summary.duration = started.elapsed();
        summary
    }

    async fn discover_seeds(&self) -> Vec<String> {
        let seeds = match self.sitemap_url() {
            Ok(sitemap) => {
                tracing::debug!("[{}] Resolving sitemap {}", self.name(), sitemap);
                let timeout = self.config.timeouts.sitemap();
                resolve_sitemap(self.fetcher.client(), &sitemap, timeout).await
            }
            Err(e) => {
                tracing::error!("[{}] Cannot build sitemap URL: {}", self.name(), e);
                Vec::new()
            }
        };

        if seeds.is_empty() {
            tracing::warn!(
                "[{}] No URLs found in sitemap, falling back to {}",
                self.name(),
                self.identity.base_url
            );
            return vec![self.identity.base_url.to_string()];
        }

        tracing::info!("[{}] Found {} URLs in sitemap", self.name(), seeds.len());
        seeds
    }

    fn sitemap_url(&self) -> Result<String, WarmError> {
        match &self.config.site.sitemap_url {
            Some(url) => Ok(url.clone()),
            None => Ok(self.identity.base_url.join("/sitemap.xml")?.to_string()),
        }
    }

    async fn visit_seed(&self, run: &CrawlRun, url: String) {
        match self.config.crawler.mode {
            CrawlMode::Flat => {
                if let Claim::Fetch = run.claim(&url, 0) {
                    let result = self.fetcher.fetch_in_run(&url, run.started).await;
                    run.tally(&result);
                }
            }
            CrawlMode::Recursive => self.crawl(run, url, 0).await,
        }
    }

    /// Fetches `url` and, below the depth limit, every in-domain link on it
    ///
    /// Links are crawled concurrently at `depth + 1` and awaited jointly.
    fn crawl<'a>(&'a self, run: &'a CrawlRun, url: String, depth: u32) -> BoxFuture<'a, ()> {
        async move {
            if depth > self.config.crawler.max_depth {
                return;
            }

            match run.claim(&url, depth) {
                Claim::Done => {
                    tracing::debug!("[{}] Already visited {} this run", self.name(), url);
                }
                Claim::Expand(links) => {
                    tracing::debug!("[{}] Reached {} again at depth {}", self.name(), url, depth);
                    self.follow(run, &url, &links, depth).await;
                }
                Claim::Fetch => {
                    let result = self.fetcher.fetch_in_run(&url, run.started).await;
                    run.tally(&result);

                    let Some(body) = result.into_content() else {
                        return;
                    };
                    let Ok(base) = Url::parse(&url) else {
                        return;
                    };

                    // Kept even at the depth limit in case a shallower route arrives later.
                    let links = extract_links_from_html(&body, &base, &self.domain);
                    let (links, depth) = run.store_links(&url, links, depth);
                    self.follow(run, &url, &links, depth).await;
                }
            }
        }
        .boxed()
    }

    async fn follow(&self, run: &CrawlRun, url: &str, links: &[NormalizedUrl], depth: u32) {
        if depth >= self.config.crawler.max_depth {
            return;
        }

        tracing::debug!(
            "[{}] {} links on {} (depth {})",
            self.name(),
            links.len(),
            url,
            depth
        );

        join_all(
            links
                .iter()
                .map(|link| self.crawl(run, link.to_string(), depth + 1)),
        )
        .await;
    }
}
