//! Markdown crawl summary

use crate::interaction::InteractionResult;
use crate::output::report::CrawlReport;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the summary inside the output directory
pub const SUMMARY_FILE: &str = "summary.md";

/// Most pages listed individually
const MAX_PAGES_LISTED: usize = 100;

/// Writes `summary.md` into `output_dir`
pub fn generate_markdown_summary(report: &CrawlReport, output_dir: &Path) -> OutputResult<PathBuf> {
    let path = output_dir.join(SUMMARY_FILE);
    let mut file = File::create(&path)?;
    file.write_all(format_markdown_summary(report).as_bytes())?;
    Ok(path)
}

pub fn format_markdown_summary(report: &CrawlReport) -> String {
    let stats = &report.statistics;
    let mut md = String::new();

    md.push_str("# Dyncrawl Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Start URL**: {}\n", report.start_url));
    md.push_str(&format!("- **Session**: {}\n", report.session));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!("- **Duration**: {} seconds\n\n", report.duration_seconds()));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Visited**: {}\n", stats.pages_visited));
    md.push_str(&format!("- **Pages Failed**: {}\n", stats.pages_failed));
    md.push_str(&format!("- **Pages Skipped**: {}\n", stats.pages_skipped));
    md.push_str(&format!(
        "- **Links Found**: {} ({} queued)\n",
        stats.links_found, stats.links_queued
    ));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n\n", stats.success_rate()));

    if !stats.pages_by_depth.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in &stats.pages_by_depth {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    md.push_str("## Forms\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Submitted | {} |\n", stats.forms_submitted));
    md.push_str(&format!("| Skipped | {} |\n", stats.forms_skipped));
    md.push_str(&format!("| Failed | {} |\n\n", stats.forms_failed));

    md.push_str("## Interactions\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    for (label, count) in &stats.interactions {
        md.push_str(&format!("| {} | {} |\n", label, count));
    }
    md.push_str(&format!(
        "\nDynamic changes detected: {}. AJAX responses captured: {}. Deepest dynamic level: {}.\n\n",
        stats.dynamic_changes, stats.ajax_responses, stats.max_dynamic_depth
    ));

    if !report.pages.is_empty() {
        md.push_str("## Pages\n\n");
        md.push_str("| URL | Depth | Links | Forms | Interactions | Dynamic | Status |\n");
        md.push_str("|-----|-------|-------|-------|--------------|---------|--------|\n");

        for page in report.pages.iter().take(MAX_PAGES_LISTED) {
            let dynamic = page
                .interactions
                .iter()
                .filter(|o| o.result.dynamic_changes_detected())
                .count();
            let status = match (&page.error, &page.skipped) {
                (Some(error), _) => format!("error: {}", error),
                (None, Some(reason)) => format!("skipped: {}", reason),
                (None, None) => "ok".to_string(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                page.url,
                page.depth,
                page.links.len(),
                page.form_results.len(),
                page.interactions.len(),
                dynamic,
                status.replace('|', "\\|")
            ));
        }

        if report.pages.len() > MAX_PAGES_LISTED {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.pages.len() - MAX_PAGES_LISTED
            ));
        }
        md.push('\n');
    }

    let failures: Vec<(&str, &str)> = report
        .pages
        .iter()
        .flat_map(|page| {
            page.interactions.iter().filter_map(move |o| match &o.result {
                InteractionResult::Failure { reason } => Some((page.url.as_str(), reason.as_str())),
                _ => None,
            })
        })
        .collect();

    if !failures.is_empty() {
        md.push_str("## Interaction Failures\n\n");
        for (url, reason) in failures.iter().take(50) {
            md.push_str(&format!("- {}: {}\n", url, reason));
        }
        md.push('\n');
    }

    md
}
