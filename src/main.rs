//! Cache-Warmer main entry point
//!
//! This is the command-line interface for the Cache-Warmer edge cache re-validator.

use anyhow::Context;
use cache_warmer::config::{load_config_with_hash, Config, CrawlMode};
use cache_warmer::crawler::Orchestrator;
use cache_warmer::output::{CsvRecordSink, RecordSink};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Cache-Warmer: keeps a site's edge cache warm
///
/// Cache-Warmer visits every page listed in the site's sitemap (and,
/// optionally, the pages they link to) as each configured client identity,
/// forces re-generation of pages the edge cache reports as missing, and logs
/// cache performance, slow pages and errors to CSV files.
#[derive(Parser, Debug)]
#[command(name = "cache-warmer")]
#[command(version = "1.0.0")]
#[command(about = "An edge cache warmer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single warming pass and exit instead of running on a schedule
    #[arg(long, conflicts_with = "dry_run")]
    once: bool,

    /// Validate config and show what would be warmed without sending requests
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let sink: Arc<dyn RecordSink> = Arc::new(
        CsvRecordSink::open(&config.output).context("Failed to open output files")?,
    );

    let orchestrator =
        Orchestrator::new(config, sink).context("Failed to create crawler instances")?;

    if cli.once {
        orchestrator.run_once().await;
        return Ok(());
    }

    handle_scheduled(&orchestrator).await;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cache_warmer=info,warn"),
            1 => EnvFilter::new("cache_warmer=debug,info"),
            2 => EnvFilter::new("cache_warmer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Cache-Warmer Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    match &config.site.sitemap_url {
        Some(sitemap) => println!("  Sitemap: {}", sitemap),
        None => println!("  Sitemap: <base-url>/sitemap.xml"),
    }

    println!("\nCrawler Configuration:");
    let mode = match config.crawler.mode {
        CrawlMode::Flat => "flat",
        CrawlMode::Recursive => "recursive",
    };
    println!("  Mode: {}", mode);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!(
        "  Recrawl interval: {}s",
        config.crawler.recrawl_interval_secs
    );
    println!(
        "  Slow page threshold: {}ms",
        config.crawler.slow_page_threshold_ms
    );
    println!(
        "  Schedule interval: {}s",
        config.crawler.schedule_interval_secs
    );

    println!("\nCache:");
    println!("  Edge header: {}", config.cache.edge_header);
    println!("  Proxy header: {}", config.cache.proxy_header);
    println!("  Warm marker: ?{}", config.cache.warm_marker);
    println!(
        "  Warm retries: {} (backoff {}ms)",
        config.cache.max_warm_retries, config.cache.warm_backoff_ms
    );

    println!("\nOutput:");
    println!("  Cache log: {}", config.output.cache_log_path);
    println!("  Slow pages: {}", config.output.slow_pages_path);
    println!("  Errors: {}", config.output.error_log_path);

    println!("\nClients ({}):", config.clients.len());
    for client in &config.clients {
        println!("  - {}: {}", client.name, client.user_agent);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the default mode: scheduled runs until Ctrl-C
async fn handle_scheduled(orchestrator: &Orchestrator) {
    tracing::info!(
        "Starting scheduled warming every {:?} with {} client(s)",
        orchestrator.period(),
        orchestrator.instances().len()
    );

    tokio::select! {
        _ = orchestrator.run_forever() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Interrupted, shutting down");
        }
    }
}
