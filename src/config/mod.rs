//! Configuration module for Cache-Warmer
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Only `[site] base-url` is required; every other setting has a default.
//!
//! # Example
//!
//! ```no_run
//! use cache_warmer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("warmer.toml")).unwrap();
//! println!("Warming {} with {} clients", config.site.base_url, config.clients.len());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    CacheConfig, ClientConfig, Config, CrawlMode, CrawlerConfig, OutputConfig, SiteConfig,
    TimeoutConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
