//! Dyncrawl main entry point
//!
//! This is the command-line interface for the dyncrawl web application crawler.

use anyhow::Context;
use clap::Parser;
use dyncrawl::browser::{Browser, ChromeBrowser, LaunchOptions};
use dyncrawl::config::{load_config_with_hash, Config};
use dyncrawl::crawler::CrawlerEngine;
use dyncrawl::output::{print_statistics, write_reports};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Dyncrawl: a dynamic-depth web application crawler
///
/// Dyncrawl follows links and forms across pages and, within each page,
/// clicks every interactive element to surface content that only appears
/// after JavaScript runs. Without a CONFIG argument the bundled default
/// configuration is used.
#[derive(Parser, Debug)]
#[command(name = "dyncrawl")]
#[command(version = "1.0.0")]
#[command(about = "A dynamic-depth web application crawler", long_about = None)]
struct Cli {
    /// Path to a JSON or TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without launching a browser
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_hash) = load_config_with_hash(cli.config.as_deref())
        .context("failed to load configuration")?;

    setup_logging(cli.verbose, cli.quiet, &config.log_level);

    match &cli.config {
        Some(path) => tracing::info!("Configuration loaded from {} (hash: {})", path.display(), config_hash),
        None => tracing::info!("Using bundled default configuration (hash: {})", config_hash),
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber
///
/// `RUST_LOG` wins when set, then the CLI flags, then the configured level.
fn setup_logging(verbose: u8, quiet: bool, config_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new(format!("dyncrawl={},warn", config_level)),
                1 => EnvFilter::new("dyncrawl=debug,info"),
                2 => EnvFilter::new("dyncrawl=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Dyncrawl Dry Run ===\n");

    println!("Start URL: {}", config.start_url);

    println!("\nScope ({} patterns):", config.allowed_domains.len());
    for pattern in &config.allowed_domains {
        println!("  - {}", pattern);
    }

    println!("\nCrawler Configuration:");
    println!("  Max page depth: {}", config.max_depth);
    println!("  Max dynamic depth: {}", config.max_dynamic_depth);
    println!("  Max pages per domain: {}", config.max_pages_per_domain);
    println!("  Timeout: {}ms", config.timeout);
    println!("  Network idle time: {}ms", config.network_idle_time);
    println!("  Request delay: {}ms", config.request_delay);
    println!(
        "  Form concurrency: {:?} (max {})",
        config.concurrency_mode, config.max_concurrent_requests
    );
    println!("  Respect robots.txt: {}", config.respect_robots_txt);
    println!("  Interact with forms: {}", config.interact_with_forms);
    println!("  Interact with elements: {}", config.interact_with_elements);

    println!("\nBrowser:");
    println!("  Headless: {}", config.headless);
    println!("  User agent: {}", config.user_agent);
    if let Some(proxy) = &config.proxy {
        println!("  Proxy: {}", proxy.server);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output_dir);
    println!("  Screenshots: {}", config.save_screenshots);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let output_dir = PathBuf::from(&config.output_dir);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    let browser = ChromeBrowser::launch(LaunchOptions::from_config(&config))
        .await
        .context("failed to launch browser")?;
    let browser: Arc<dyn Browser> = Arc::new(browser);

    let result = run_crawl(config, Arc::clone(&browser), &output_dir).await;

    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "failed to close browser");
    }

    result
}

async fn run_crawl(config: Config, browser: Arc<dyn Browser>, output_dir: &Path) -> anyhow::Result<()> {
    let mut engine = CrawlerEngine::new(config, browser)?;

    let report = match engine.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let paths = write_reports(&report, output_dir)?;
    print_statistics(&report.statistics);

    println!("\nReport: {}", paths.json.display());
    println!("Summary: {}", paths.markdown.display());

    Ok(())
}
