use serde::Deserialize;
use std::time::Duration;

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X) \
    AppleWebKit/537.36 (KHTML, like Gecko) Version/14.0 Mobile/15E148 Safari/537.36";

/// Main configuration structure for Cache-Warmer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default = "default_clients", rename = "client")]
    pub clients: Vec<ClientConfig>,
}

/// The site being warmed
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Base URL of the site; its host is the crawl domain
    pub base_url: String,

    /// Sitemap to start from; defaults to `<base-url>/sitemap.xml`
    #[serde(default)]
    pub sitemap_url: Option<String>,
}

/// How each sitemap URL is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlMode {
    /// Fetch each sitemap URL once, no link following
    Flat,

    /// Fetch each sitemap URL and follow in-domain links up to `max-depth`
    #[default]
    Recursive,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Flat sitemap fetch or recursive link crawl
    pub mode: CrawlMode,

    /// Maximum link depth from a sitemap URL (recursive mode only)
    pub max_depth: u32,

    /// Maximum number of in-flight fetches per client
    pub max_concurrent_requests: u32,

    /// How long a crawled page stays fresh before it is fetched again
    pub recrawl_interval_secs: u64,

    /// Full GET response time above which a page is reported as slow
    pub slow_page_threshold_ms: u64,

    /// Period between the start of two runs
    pub schedule_interval_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            mode: CrawlMode::Recursive,
            max_depth: 2,
            max_concurrent_requests: 5,
            recrawl_interval_secs: 3 * 60 * 60,
            slow_page_threshold_ms: 500,
            schedule_interval_secs: 3 * 60 * 60,
        }
    }
}

impl CrawlerConfig {
    pub fn recrawl_interval(&self) -> Duration {
        Duration::from_secs(self.recrawl_interval_secs)
    }

    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs)
    }
}

/// Cache header names and warm-retry behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheConfig {
    /// Header carrying the edge cache status; a miss here triggers warming
    pub edge_header: String,

    /// Header carrying the reverse-proxy cache status (reported only)
    pub proxy_header: String,

    /// Query marker appended to cache-warming requests
    pub warm_marker: String,

    /// Number of warm requests issued while the edge keeps reporting a miss
    pub max_warm_retries: u32,

    /// Backoff unit; retry `n` waits `n * warm-backoff-ms`
    pub warm_backoff_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            edge_header: "X-QC-Cache".to_string(),
            proxy_header: "X-LiteSpeed-Cache".to_string(),
            warm_marker: "qc-cache-warm".to_string(),
            max_warm_retries: 3,
            warm_backoff_ms: 5000,
        }
    }
}

impl CacheConfig {
    pub fn warm_backoff(&self) -> Duration {
        Duration::from_millis(self.warm_backoff_ms)
    }
}

/// Per-request timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TimeoutConfig {
    pub probe_ms: u64,
    pub warm_ms: u64,
    pub fetch_ms: u64,
    pub sitemap_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_ms: 5000,
            warm_ms: 5000,
            fetch_ms: 5000,
            sitemap_ms: 5000,
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub fn warm(&self) -> Duration {
        Duration::from_millis(self.warm_ms)
    }

    pub fn fetch(&self) -> Duration {
        Duration::from_millis(self.fetch_ms)
    }

    pub fn sitemap(&self) -> Duration {
        Duration::from_millis(self.sitemap_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// CSV file receiving one row per full fetch
    pub cache_log_path: String,

    /// CSV file receiving one row per slow page
    pub slow_pages_path: String,

    /// CSV file receiving one row per failed fetch
    pub error_log_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            cache_log_path: "cache_performance.csv".to_string(),
            slow_pages_path: "slow_pages.csv".to_string(),
            error_log_path: "error_log.csv".to_string(),
        }
    }
}

/// A client identity; each one runs as an independent crawler instance
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    /// Short label used in logs (e.g. "desktop")
    pub name: String,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

fn default_clients() -> Vec<ClientConfig> {
    vec![
        ClientConfig {
            name: "desktop".to_string(),
            user_agent: DESKTOP_USER_AGENT.to_string(),
        },
        ClientConfig {
            name: "mobile".to_string(),
            user_agent: MOBILE_USER_AGENT.to_string(),
        },
    ]
}

impl Config {
    /// Builds a configuration for `base_url` with every other setting at its default
    pub fn for_site(base_url: impl Into<String>) -> Self {
        Self {
            site: SiteConfig {
                base_url: base_url.into(),
                sitemap_url: None,
            },
            crawler: CrawlerConfig::default(),
            cache: CacheConfig::default(),
            timeouts: TimeoutConfig::default(),
            output: OutputConfig::default(),
            clients: default_clients(),
        }
    }
}
