//! Crawl statistics
//!
//! Counts are derived from the page reports after the crawl, so they always
//! agree with what the JSON report contains.

use crate::forms::FormOutcome;
use crate::interaction::InteractionResult;
use crate::output::report::PageReport;
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary counts for a crawl
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStatistics {
    /// Pages dequeued from the frontier
    pub pages_visited: u64,
    pub pages_failed: u64,
    /// Pages skipped before loading (robots.txt)
    pub pages_skipped: u64,
    pub links_found: u64,
    pub links_queued: u64,
    /// Pages per page depth
    pub pages_by_depth: BTreeMap<u32, u64>,
    pub forms_submitted: u64,
    pub forms_skipped: u64,
    pub forms_failed: u64,
    /// Interactions per outcome label
    pub interactions: BTreeMap<String, u64>,
    pub dynamic_changes: u64,
    pub ajax_responses: u64,
    pub max_dynamic_depth: u32,
}

impl CrawlStatistics {
    pub fn from_pages(pages: &[PageReport]) -> Self {
        let mut stats = Self::default();

        for page in pages {
            stats.pages_visited += 1;
            if page.error.is_some() {
                stats.pages_failed += 1;
            }
            if page.skipped.is_some() {
                stats.pages_skipped += 1;
            }
            stats.links_found += page.links.len() as u64;
            stats.links_queued += page.links_queued as u64;
            *stats.pages_by_depth.entry(page.depth).or_insert(0) += 1;

            for form in &page.form_results {
                match form.outcome {
                    FormOutcome::Submitted { .. } => stats.forms_submitted += 1,
                    FormOutcome::Skipped { .. } => stats.forms_skipped += 1,
                    FormOutcome::Failed { .. } => stats.forms_failed += 1,
                }
            }

            for outcome in &page.interactions {
                *stats
                    .interactions
                    .entry(outcome.result.label().to_string())
                    .or_insert(0) += 1;

                if let InteractionResult::Success {
                    dynamic_changes_detected,
                    ajax_responses,
                    ..
                } = &outcome.result
                {
                    if *dynamic_changes_detected {
                        stats.dynamic_changes += 1;
                    }
                    stats.ajax_responses += ajax_responses.len() as u64;
                }

                stats.max_dynamic_depth = stats.max_dynamic_depth.max(outcome.dynamic_depth);
            }
        }

        stats
    }

    pub fn total_interactions(&self) -> u64 {
        self.interactions.values().sum()
    }

    /// Share of loaded pages processed without error, in percent
    pub fn success_rate(&self) -> f64 {
        let loaded = self.pages_visited.saturating_sub(self.pages_skipped);
        if loaded == 0 {
            return 0.0;
        }
        loaded.saturating_sub(self.pages_failed) as f64 / loaded as f64 * 100.0
    }
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Pages:");
    println!("  Visited: {}", stats.pages_visited);
    println!("  Failed: {}", stats.pages_failed);
    println!("  Skipped (robots.txt): {}", stats.pages_skipped);
    println!("  Links found: {} ({} queued)", stats.links_found, stats.links_queued);
    for (depth, count) in &stats.pages_by_depth {
        println!("  Depth {}: {}", depth, count);
    }
    println!();

    println!("Forms:");
    println!("  Submitted: {}", stats.forms_submitted);
    println!("  Skipped: {}", stats.forms_skipped);
    println!("  Failed: {}", stats.forms_failed);
    println!();

    println!("Interactions ({}):", stats.total_interactions());
    for (label, count) in &stats.interactions {
        println!("  {}: {}", label, count);
    }
    println!("  Dynamic changes detected: {}", stats.dynamic_changes);
    println!("  AJAX responses captured: {}", stats.ajax_responses);
    println!("  Deepest dynamic level: {}", stats.max_dynamic_depth);
    println!();

    println!("Success Rate: {:.1}%", stats.success_rate());
}
