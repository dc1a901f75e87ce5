//! Page analysis: links to follow and forms present
//!
//! The analyzer reads the rendered DOM from the page, so links inserted by
//! scripts before load completes are included.

use crate::browser::{BrowserResult, Page};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

/// Identifier reported for forms with neither `id` nor `name`
pub const UNNAMED_FORM: &str = "unnamed";

/// Links and forms found on one page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageAnalysis {
    pub title: Option<String>,

    /// Absolute http(s) URLs, in document order, duplicates removed
    pub links: Vec<String>,

    /// Form identifiers: id, else name, else [`UNNAMED_FORM`]
    pub forms: Vec<String>,
}

/// Extracts links and forms from a loaded page
#[async_trait]
pub trait PageAnalyzer: Send + Sync {
    async fn analyze(&self, page: &dyn Page) -> BrowserResult<PageAnalysis>;
}

/// Parses the serialized DOM with `scraper`
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPageAnalyzer;

#[async_trait]
impl PageAnalyzer for HtmlPageAnalyzer {
    async fn analyze(&self, page: &dyn Page) -> BrowserResult<PageAnalysis> {
        let url = page.url().await?;
        let html = page.content().await?;

        let analysis = match Url::parse(&url) {
            Ok(base) => analyze_html(&html, &base),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "page URL not absolute, links skipped");
                PageAnalysis {
                    forms: extract_forms(&Html::parse_document(&html)),
                    ..PageAnalysis::default()
                }
            }
        };

        Ok(analysis)
    }
}

/// Analyzes HTML as if loaded from `base_url`
///
/// # Link rules
///
/// Anchors with `href` are followed, including `rel="nofollow"`. Skipped:
/// `download` anchors, fragment-only hrefs, `javascript:`, `mailto:`,
/// `tel:` and `data:` targets, and anything that does not resolve to
/// http(s).
///
/// ```
/// use dyncrawl::crawler::analyze_html;
/// use url::Url;
///
/// let html = r#"<title>Home</title><a href="/about">About</a><form id="login"></form>"#;
/// let analysis = analyze_html(html, &Url::parse("https://example.com/").unwrap());
/// assert_eq!(analysis.links, vec!["https://example.com/about"]);
/// assert_eq!(analysis.forms, vec!["login"]);
/// ```
pub fn analyze_html(html: &str, base_url: &Url) -> PageAnalysis {
    let document = Html::parse_document(html);

    PageAnalysis {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
        forms: extract_forms(&document),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(link) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        if !links.contains(&link) {
            links.push(link);
        }
    }

    links
}

fn extract_forms(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("form") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|form| {
            let attr = |name| form.value().attr(name).map(str::trim).filter(|v| !v.is_empty());
            attr("id")
                .or_else(|| attr("name"))
                .unwrap_or(UNNAMED_FORM)
                .to_string()
        })
        .collect()
}

fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string())
}
