use crate::config::types::{
    CacheConfig, ClientConfig, Config, CrawlerConfig, OutputConfig, SiteConfig, TimeoutConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

const MAX_WARM_RETRIES: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_cache_config(&config.cache)?;
    validate_timeout_config(&config.timeouts)?;
    validate_output_config(&config.output)?;
    validate_clients(&config.clients)?;
    Ok(())
}

/// Validates the site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;

    if let Some(sitemap) = &config.sitemap_url {
        validate_http_url("sitemap-url", sitemap)?;
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.recrawl_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "recrawl-interval-secs must be greater than 0".to_string(),
        ));
    }

    if config.slow_page_threshold_ms == 0 {
        return Err(ConfigError::Validation(
            "slow-page-threshold-ms must be greater than 0".to_string(),
        ));
    }

    if config.schedule_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "schedule-interval-secs must be greater than 0".to_string(),
        ));
    }

    if recrawl_outlasts_schedule(config) {
        tracing::warn!(
            "recrawl-interval-secs ({}) is longer than schedule-interval-secs ({}); \
             pages will be skipped on some scheduled runs",
            config.recrawl_interval_secs,
            config.schedule_interval_secs
        );
    }

    Ok(())
}

/// Returns true if a page fetched on one scheduled run is still fresh on the next
fn recrawl_outlasts_schedule(config: &CrawlerConfig) -> bool {
    config.recrawl_interval_secs > config.schedule_interval_secs
}

/// Validates cache header and warm-retry configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.edge_header.trim().is_empty() {
        return Err(ConfigError::Validation(
            "edge-header cannot be empty".to_string(),
        ));
    }

    if config.proxy_header.trim().is_empty() {
        return Err(ConfigError::Validation(
            "proxy-header cannot be empty".to_string(),
        ));
    }

    if config.warm_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "warm-marker cannot be empty".to_string(),
        ));
    }

    if config.max_warm_retries > MAX_WARM_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max-warm-retries must be at most {}, got {}",
            MAX_WARM_RETRIES, config.max_warm_retries
        )));
    }

    Ok(())
}

fn validate_timeout_config(config: &TimeoutConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("probe-ms", config.probe_ms),
        ("warm-ms", config.warm_ms),
        ("fetch-ms", config.fetch_ms),
        ("sitemap-ms", config.sitemap_ms),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "timeouts.{} must be greater than 0",
                name
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("cache-log-path", &config.cache_log_path),
        ("slow-pages-path", &config.slow_pages_path),
        ("error-log-path", &config.error_log_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates client identities
fn validate_clients(clients: &[ClientConfig]) -> Result<(), ConfigError> {
    if clients.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[client]] is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for client in clients {
        if client.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "client name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(client.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate client name '{}'",
                client.name
            )));
        }

        if client.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "client '{}' has an empty user-agent",
                client.name
            )));
        }
    }

    Ok(())
}
