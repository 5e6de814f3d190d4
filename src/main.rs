//! TVBox-Scout main entry point
//!
//! This is the command-line interface for the TVBox configuration crawler.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tvbox_scout::config::{load_config_with_hash, Config};
use tvbox_scout::crawler::{run_discovery, QueryScheduler};
use tvbox_scout::discovery::{read_url_list, run_source_discovery};
use tvbox_scout::output::{print_report, QueryReport};
use tvbox_scout::storage::{DiscoveryCache, StatsTable};
use tvbox_scout::{Credentials, UrlValidator};

/// TVBox-Scout: discovers TVBox configuration files through code search
///
/// Searches for candidate configs, fetches and deduplicates them, keeps the
/// structurally valid ones and learns which queries pay off.
#[derive(Parser, Debug)]
#[command(name = "tvbox-scout")]
#[command(version)]
#[command(about = "Discovers TVBox configuration files through code search", long_about = None)]
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

    /// Validate config and print the scheduled query order without searching
    #[arg(long, conflicts_with_all = ["stats", "discover_sources", "check_urls"])]
    dry_run: bool,

    /// Print per-query hit rates and exit
    #[arg(long, conflicts_with_all = ["dry_run", "discover_sources", "check_urls"])]
    stats: bool,

    /// Discover stream-list URLs by keyword and merge them into the URL list
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "check_urls"])]
    discover_sources: bool,

    /// Probe every URL in FILE and print the reachable ones
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dry_run", "stats", "discover_sources"])]
    check_urls: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config);
    } else if let Some(path) = &cli.check_urls {
        handle_check_urls(&config, path).await?;
    } else if cli.discover_sources {
        let credentials = Credentials::from_env(&config.github.token_env)?;
        let report = run_source_discovery(config, credentials)
            .await
            .context("Source discovery failed")?;
        tracing::info!(
            "Source discovery finished: {} candidates, {} reachable",
            report.candidates,
            report.validated
        );
    } else {
        let credentials = Credentials::from_env(&config.github.token_env)?;
        let summary = run_discovery(config, credentials)
            .await
            .context("Discovery run failed")?;
        println!("{}", summary);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tvbox_scout=info,warn"),
            1 => EnvFilter::new("tvbox_scout=debug,info"),
            2 => EnvFilter::new("tvbox_scout=trace,debug"),
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

/// Handles --dry-run: shows the settings and the query order a run would use
fn handle_dry_run(config: &Config) {
    println!("=== TVBox-Scout Dry Run ===\n");

    println!("Search:");
    println!("  API: {}", config.github.api_base_url);
    println!("  Token variable: {}", config.github.token_env);
    println!(
        "  Pages per query: {} ({} when saturated)",
        config.github.max_pages, config.github.max_pages_when_saturated
    );
    println!(
        "  Delay between queries: {}s",
        config.github.inter_query_delay_secs
    );

    println!("\nStorage:");
    println!("  Artifacts: {}", config.storage.artifact_dir.display());
    println!("  Cache: {}", config.storage.cache_path.display());
    println!("  Stats: {}", config.storage.stats_path.display());

    let cache = DiscoveryCache::load(&config.storage.cache_path, config.storage.cache_ttl_days);
    let stats = StatsTable::load(&config.storage.stats_path);
    let queries = QueryScheduler::new(&config.scheduler).schedule(&cache, &stats);

    println!("\nScheduled Queries ({}):", queries.len());
    for (i, query) in queries.iter().enumerate() {
        println!(
            "  {:>2}. [{:.3}] {}",
            i + 1,
            stats.hit_rate(query),
            query
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Handles --stats: prints the persisted query statistics
fn handle_stats(config: &Config) {
    println!("Stats file: {}\n", config.storage.stats_path.display());
    let stats = StatsTable::load(&config.storage.stats_path);
    print_report(&QueryReport::from_table(&stats));
}

/// Handles --check-urls: probes a URL list and prints what answers
async fn handle_check_urls(config: &Config, path: &Path) -> Result<()> {
    let urls = read_url_list(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;
    tracing::info!("Checking {} URLs from {}", urls.len(), path.display());

    let validator = Arc::new(UrlValidator::new(&config.probe)?);
    for url in validator.validate_batch(urls.into_iter().collect()).await {
        println!("{}", url);
    }

    Ok(())
}
