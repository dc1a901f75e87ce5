//! Crawler module: page-depth traversal
//!
//! This module contains:
//! - The URL frontier (normalization, dedup, depth and per-host caps)
//! - Page analysis (links and forms from the rendered DOM)
//! - The crawl engine tying frontier, forms and dynamic exploration together

mod analyzer;
mod engine;
mod frontier;

pub use analyzer::{analyze_html, HtmlPageAnalyzer, PageAnalysis, PageAnalyzer, UNNAMED_FORM};
pub use engine::{screenshot_name, CrawlerEngine};
pub use frontier::{FrontierConfig, FrontierEntry, UrlQueue};

use crate::browser::Browser;
use crate::config::Config;
use crate::output::CrawlReport;
use std::sync::Arc;

/// Runs a complete crawl with a fresh engine
///
/// # Example
///
/// ```no_run
/// use dyncrawl::browser::{ChromeBrowser, LaunchOptions};
/// use dyncrawl::config::load_default_config;
/// use dyncrawl::crawler::crawl;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_default_config()?;
/// let browser = ChromeBrowser::launch(LaunchOptions::from_config(&config)).await?;
/// let report = crawl(config, Arc::new(browser)).await?;
/// println!("{} pages", report.pages.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config, browser: Arc<dyn Browser>) -> crate::Result<CrawlReport> {
    let mut engine = CrawlerEngine::new(config, browser)?;
    engine.run().await
}
