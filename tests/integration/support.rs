//! Shared fixtures for the integration tests

use cache_warmer::config::{ClientConfig, Config, TimeoutConfig};
use cache_warmer::crawler::{build_http_client, ConcurrencyGate, Fetcher};
use cache_warmer::output::MemoryRecordSink;
use cache_warmer::state::CrawlIndex;
use std::sync::Arc;
use wiremock::{Match, Request};

pub const TEST_USER_AGENT: &str = "CacheWarmerTest/1.0";

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Configuration pointed at `base_url` with a fast warm-retry schedule
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::for_site(base_url);
    config.cache.warm_backoff_ms = 10;
    config.timeouts = TimeoutConfig {
        probe_ms: 2000,
        warm_ms: 2000,
        fetch_ms: 2000,
        sitemap_ms: 2000,
    };
    config.clients = vec![ClientConfig {
        name: "test".to_string(),
        user_agent: TEST_USER_AGENT.to_string(),
    }];
    config
}

/// Builds a standalone fetcher plus the index and sink it reports to
pub fn test_fetcher(config: Config) -> (Fetcher, Arc<CrawlIndex>, Arc<MemoryRecordSink>) {
    let client = build_http_client(TEST_USER_AGENT).unwrap();
    let index = Arc::new(CrawlIndex::new(config.crawler.recrawl_interval()));
    let sink = Arc::new(MemoryRecordSink::new());
    let gate = ConcurrencyGate::new(config.crawler.max_concurrent_requests as usize);

    let fetcher = Fetcher::new(
        client,
        Arc::new(config),
        gate,
        Arc::clone(&index),
        sink.clone(),
    );

    (fetcher, index, sink)
}

pub fn urlset(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("  <url><loc>{}</loc></url>\n", u))
        .collect();

    format!(
        "{}\n<urlset xmlns=\"{}\">\n{}</urlset>",
        XML_DECL, SITEMAP_NS, entries
    )
}

pub fn sitemap_index(sitemaps: &[String]) -> String {
    let entries: String = sitemaps
        .iter()
        .map(|u| format!("  <sitemap><loc>{}</loc></sitemap>\n", u))
        .collect();

    format!(
        "{}\n<sitemapindex xmlns=\"{}\">\n{}</sitemapindex>",
        XML_DECL, SITEMAP_NS, entries
    )
}

pub fn html_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a>\n", href, href))
        .collect();

    format!("<html><head><title>Test</title></head><body>\n{}</body></html>", anchors)
}

/// Matches requests without a query string, i.e. not cache-warming requests
pub struct NoQuery;

impl Match for NoQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query().is_none()
    }
}
