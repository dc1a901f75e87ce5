//! Crawl reports
//!
//! At the end of a crawl the engine's [`CrawlReport`] is written as
//! `crawl-report.json` and `summary.md` in the output directory, and the
//! statistics are printed to stdout.

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary, SUMMARY_FILE};
pub use report::{write_json_report, CrawlReport, PageReport, REPORT_FILE};
pub use stats::{print_statistics, CrawlStatistics};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing reports
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Where the reports of a crawl were written
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

/// Creates the output directory if needed and writes both reports
pub fn write_reports(report: &CrawlReport, output_dir: &Path) -> OutputResult<ReportPaths> {
    std::fs::create_dir_all(output_dir)?;

    let json = write_json_report(report, output_dir)?;
    let markdown = generate_markdown_summary(report, output_dir)?;

    tracing::info!(json = %json.display(), markdown = %markdown.display(), "reports written");
    Ok(ReportPaths { json, markdown })
}
