//! Crawl engine: the top-level control loop
//!
//! URLs are dequeued one at a time and loaded into a single live page. For
//! each page the engine:
//! - checks robots.txt and waits out the per-host delay
//! - loads the page and analyzes it for links and forms
//! - queues links at depth + 1
//! - runs the form pass, then the dynamic-depth pass
//! - adds navigations found mid-interaction to the frontier
//!
//! The engine is the only writer of the frontier. A failure inside one page
//! is recorded on its report and the loop moves on.

use crate::browser::{Browser, Page, WaitUntil};
use crate::config::Config;
use crate::crawler::analyzer::{HtmlPageAnalyzer, PageAnalyzer};
use crate::crawler::frontier::{FrontierConfig, FrontierEntry, UrlQueue};
use crate::forms::{FormHandler, FormInteractionResult, FormOutcome};
use crate::interaction::{
    DynamicExplorer, ElementInteractor, PageContext, BINDING_NAME,
};
use crate::output::{CrawlReport, CrawlStatistics, PageReport};
use crate::robots::{build_http_client, RobotsCache};
use crate::state::InteractionTracker;
use crate::url::Scope;
use crate::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Pages between progress log lines
const PROGRESS_INTERVAL: usize = 10;

/// Drives a whole crawl against one browser
pub struct CrawlerEngine {
    config: Config,
    browser: Arc<dyn Browser>,
    analyzer: Box<dyn PageAnalyzer>,
    frontier: UrlQueue,
    ledger: InteractionTracker,
    forms: FormHandler,
    interactor: ElementInteractor,
    explorer: DynamicExplorer,
    robots: Option<RobotsCache>,
    session: String,
    pages: Vec<PageReport>,
}

impl CrawlerEngine {
    /// Creates an engine with a fresh frontier, ledger and session token
    pub fn new(config: Config, browser: Arc<dyn Browser>) -> Result<Self> {
        let session = uuid::Uuid::new_v4().to_string();

        let scope = Scope::new(config.allowed_domains.iter());
        let frontier = UrlQueue::new(FrontierConfig::from(&config), scope);

        let robots = if config.respect_robots_txt {
            let client = build_http_client(&config.user_agent, config.timeout())?;
            Some(RobotsCache::new(client, config.user_agent.clone()))
        } else {
            None
        };

        Ok(Self {
            analyzer: Box::new(HtmlPageAnalyzer),
            forms: FormHandler::from_config(&config),
            interactor: ElementInteractor::from_config(&config, session.clone()),
            explorer: DynamicExplorer::new(config.max_dynamic_depth),
            ledger: InteractionTracker::new(),
            frontier,
            robots,
            browser,
            session,
            pages: Vec::new(),
            config,
        })
    }

    /// Replaces the HTML analyzer
    pub fn with_analyzer(mut self, analyzer: Box<dyn PageAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn frontier(&self) -> &UrlQueue {
        &self.frontier
    }

    pub fn ledger(&self) -> &InteractionTracker {
        &self.ledger
    }

    /// Crawls from the start URL until the frontier is empty
    ///
    /// Only failing to open the live page is fatal. Page-level failures end
    /// up on the page's report.
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::info!(
            session = %self.session,
            start_url = %self.config.start_url,
            "starting crawl"
        );

        if !self.frontier.add(&self.config.start_url, 0) {
            tracing::warn!(url = %self.config.start_url, "start URL not admitted to the frontier");
        }

        let page = self.browser.new_page().await?;
        if let Err(e) = page.add_binding(BINDING_NAME).await {
            tracing::warn!(error = %e, "observer binding unavailable; DOM change signals disabled");
        }

        while let Some(entry) = self.frontier.next_entry() {
            let report = self.process_page(page.as_ref(), &entry).await;
            self.pages.push(report);

            if self.pages.len() % PROGRESS_INTERVAL == 0 {
                let elapsed = start.elapsed();
                tracing::info!(
                    "Progress: {} pages crawled, {} in frontier, {:.2} pages/sec",
                    self.pages.len(),
                    self.frontier.pending_count(),
                    self.pages.len() as f64 / elapsed.as_secs_f64()
                );
            }
        }

        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "failed to close live page");
        }

        let pages = std::mem::take(&mut self.pages);
        let report = CrawlReport {
            session: self.session.clone(),
            start_url: self.config.start_url.clone(),
            started_at,
            finished_at: Utc::now(),
            statistics: CrawlStatistics::from_pages(&pages),
            pages,
        };

        tracing::info!(
            "Crawl completed: {} pages crawled in {:?}",
            report.pages.len(),
            start.elapsed()
        );

        Ok(report)
    }

    /// Processes one frontier URL; never fails
    async fn process_page(&mut self, page: &dyn Page, entry: &FrontierEntry) -> PageReport {
        let mut report = PageReport::new(&entry.url, entry.depth);

        tracing::info!(url = %entry.url, depth = entry.depth, "processing page");

        if let Err(e) = self.visit(page, entry, &mut report).await {
            tracing::error!(url = %entry.url, error = %e, "page processing failed");
            report.error = Some(e.to_string());
        }

        report
    }

    async fn visit(&mut self, page: &dyn Page, entry: &FrontierEntry, report: &mut PageReport) -> Result<()> {
        let url = Url::parse(&entry.url)?;

        let mut crawl_delay = None;
        if let Some(robots) = self.robots.as_mut() {
            if !robots.is_allowed(&url).await {
                tracing::info!(url = %entry.url, "disallowed by robots.txt");
                report.skipped = Some("Disallowed by robots.txt".to_string());
                return Ok(());
            }
            crawl_delay = robots.crawl_delay(&url).await;
        }

        let min_delay = crawl_delay.unwrap_or_default().max(self.config.request_delay());
        if let Some(wait) = self.frontier.wait_before_request(&entry.url, min_delay, Instant::now()) {
            tracing::debug!(url = %entry.url, ?wait, "waiting before request");
            tokio::time::sleep(wait).await;
        }
        self.frontier.record_request(&entry.url, Instant::now());

        match page
            .goto(&entry.url, WaitUntil::NetworkIdle, self.config.timeout())
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                tracing::warn!(url = %entry.url, "page load timed out, continuing with current state");
            }
            Err(e) => return Err(e.into()),
        }

        let current_url = page.url().await.unwrap_or_else(|_| entry.url.clone());
        report.final_url = Some(current_url.clone());

        match self.analyzer.analyze(page).await {
            Ok(analysis) => {
                for link in &analysis.links {
                    if self.frontier.add(link, entry.depth + 1) {
                        report.links_queued += 1;
                    }
                }
                report.title = analysis.title;
                report.links = analysis.links;
                report.forms = analysis.forms;
            }
            Err(e) => tracing::warn!(url = %entry.url, error = %e, "page analysis failed"),
        }

        if self.config.save_screenshots {
            report.screenshot = self.capture_screenshot(page, &entry.url).await;
        }

        if self.config.interact_with_forms {
            let results = self
                .forms
                .interact_with_forms(page, self.browser.as_ref(), &mut self.ledger)
                .await;
            report.links_queued += self.queue_form_targets(&results, entry.depth);
            report.form_results.extend(results);
        }

        if self.config.interact_with_elements && !self.ledger.has_url_been_visited(&current_url) {
            self.explore(page, entry, &current_url, report).await;
        }

        self.ledger.add_visited_url(&current_url);
        self.ledger.add_visited_url(&entry.url);

        tracing::info!(
            url = %entry.url,
            links = report.links.len(),
            queued = report.links_queued,
            forms = report.form_results.len(),
            interactions = report.interactions.len(),
            "page processed"
        );

        Ok(())
    }

    /// Dynamic-depth pass over the live page
    async fn explore(&mut self, page: &dyn Page, entry: &FrontierEntry, current_url: &str, report: &mut PageReport) {
        let initial = match self.interactor.finder().find_clickable_elements(page).await {
            Ok(elements) => elements,
            Err(e) => {
                tracing::warn!(url = %current_url, error = %e, "element classification failed");
                return;
            }
        };

        tracing::debug!(url = %current_url, count = initial.len(), "starting dynamic exploration");

        let mut ctx = PageContext::new(
            page,
            self.browser.as_ref(),
            &self.frontier,
            &mut self.ledger,
            current_url,
            entry.depth,
        );
        let outcomes = self.explorer.explore(&self.interactor, &mut ctx, initial).await;
        let discoveries = std::mem::take(&mut ctx.discoveries);
        let form_results = std::mem::take(&mut ctx.form_results);
        drop(ctx);

        for discovery in discoveries {
            if self.frontier.add(&discovery.url, discovery.depth) {
                report.links_queued += 1;
            }
        }

        report.links_queued += self.queue_form_targets(&form_results, entry.depth);
        report.form_results.extend(form_results);
        report.interactions = outcomes;
    }

    /// Traditional form submissions that landed on another URL are page
    /// depth too
    fn queue_form_targets(&mut self, results: &[FormInteractionResult], depth: u32) -> usize {
        let mut queued = 0;
        for result in results {
            if let FormOutcome::Submitted {
                ajax: false,
                final_url,
                ..
            } = &result.outcome
            {
                if final_url != &result.url && self.frontier.add(final_url, depth + 1) {
                    tracing::debug!(url = %final_url, form = %result.form_id, "queued form submission target");
                    queued += 1;
                }
            }
        }
        queued
    }

    async fn capture_screenshot(&self, page: &dyn Page, url: &str) -> Option<PathBuf> {
        let dir = Path::new(&self.config.output_dir).join("screenshots");
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create screenshot directory");
            return None;
        }

        let path = dir.join(format!("{}.png", screenshot_name(url)));
        match page.screenshot(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "screenshot failed");
                None
            }
        }
    }
}

/// File-system safe name for a URL, unique per URL
pub fn screenshot_name(url: &str) -> String {
    use sha2::{Digest, Sha256};

    let readable: String = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(80)
        .collect();
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("{}_{}", readable.trim_matches('_'), &digest[..8])
}
