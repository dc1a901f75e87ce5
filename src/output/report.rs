//! Crawl report written as JSON at the end of a run

use crate::forms::FormInteractionResult;
use crate::interaction::ElementOutcome;
use crate::output::stats::CrawlStatistics;
use crate::output::OutputResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// File name of the JSON report inside the output directory
pub const REPORT_FILE: &str = "crawl-report.json";

/// Everything recorded for one frontier URL
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub url: String,
    /// URL after redirects, if the page loaded
    pub final_url: Option<String>,
    pub depth: u32,
    pub title: Option<String>,
    pub links: Vec<String>,
    /// Links and navigations the frontier admitted from this page
    pub links_queued: usize,
    pub forms: Vec<String>,
    pub form_results: Vec<FormInteractionResult>,
    pub interactions: Vec<ElementOutcome>,
    pub screenshot: Option<PathBuf>,
    /// Why the page was not processed (robots.txt)
    pub skipped: Option<String>,
    pub error: Option<String>,
}

impl PageReport {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            depth,
            title: None,
            links: Vec::new(),
            links_queued: 0,
            forms: Vec::new(),
            form_results: Vec::new(),
            interactions: Vec::new(),
            screenshot: None,
            skipped: None,
            error: None,
        }
    }
}

/// Result of a whole crawl
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub session: String,
    pub start_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub statistics: CrawlStatistics,
    pub pages: Vec<PageReport>,
}

impl CrawlReport {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Writes the report as pretty JSON into `output_dir`
pub fn write_json_report(report: &CrawlReport, output_dir: &Path) -> OutputResult<PathBuf> {
    let path = output_dir.join(REPORT_FILE);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(path)
}
