//! End-to-end crawls through the engine

use crate::common::{test_config, Effect, ElementSpec, FakeBrowser, FakeSite, FieldSpec, FormSpec, PageSpec};
use dyncrawl::browser::Browser;
use dyncrawl::crawler::CrawlerEngine;
use dyncrawl::forms::FormOutcome;
use dyncrawl::interaction::InteractionResult;
use dyncrawl::output::{write_reports, CrawlReport, PageReport};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn search_form() -> FormSpec {
    FormSpec::new("search", "/search").field(FieldSpec::input("search", "q"))
}

fn find<'a>(report: &'a CrawlReport, url: &str) -> &'a PageReport {
    let wanted = url.trim_end_matches('/');
    report
        .pages
        .iter()
        .find(|p| p.url.trim_end_matches('/') == wanted)
        .unwrap_or_else(|| panic!("no report for {}", url))
}

#[tokio::test]
async fn test_full_crawl_with_robots_forms_and_elements() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let at = |p: &str| format!("{}{}", base, p);

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let site = Arc::new(
        FakeSite::new()
            .page(
                &at("/"),
                PageSpec::new("Home")
                    .element(ElementSpec::link("About", "/about"))
                    .element(ElementSpec::link("Private", "/private"))
                    .element(ElementSpec::link("Partner", "https://partner.example.org/deal"))
                    .element(ElementSpec::button("Load more").on_click(Effect::Ajax("/api/items".to_string())))
                    .form(search_form()),
            )
            .page(
                &at("/about"),
                PageSpec::new("About")
                    .element(ElementSpec::link("Home", "/"))
                    .form(search_form()),
            )
            .page(&at("/private"), PageSpec::new("Private"))
            .page(&at("/search"), PageSpec::new("Results")),
    );
    let browser: Arc<dyn Browser> = Arc::new(FakeBrowser::new(Arc::clone(&site)));
    let output = tempfile::tempdir().unwrap();
    let config = test_config(
        &at("/"),
        json!({
            "respectRobotsTxt": true,
            "outputDir": output.path().to_str().unwrap()
        }),
    );

    let mut engine = CrawlerEngine::new(config, browser).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.pages.len(), 4);
    assert!(engine.frontier().is_empty());
    assert!(report.pages.iter().all(|p| !p.url.contains("partner")));

    let home = find(&report, &at("/"));
    assert_eq!(home.depth, 0);
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert!(home.links.iter().any(|l| l.contains("partner.example.org")));
    assert_eq!(home.links_queued, 3);
    assert!(home.error.is_none());

    assert!(home.form_results.iter().any(|r| r.is_submitted()));
    assert!(home.form_results.iter().any(|r| r.is_skipped()));

    assert_eq!(home.interactions.len(), 4);
    let labels: Vec<&str> = home.interactions.iter().map(|o| o.result.label()).collect();
    assert_eq!(
        labels,
        vec![
            "success_with_navigation",
            "success_with_navigation",
            "skipped_due_to_scope",
            "success"
        ]
    );
    assert!(home.interactions[3].result.dynamic_changes_detected());

    let private = find(&report, &at("/private"));
    assert_eq!(private.skipped.as_deref(), Some("Disallowed by robots.txt"));
    assert!(private.title.is_none());

    let about = find(&report, &at("/about"));
    assert_eq!(about.depth, 1);
    assert!(about.form_results.iter().all(|r| r.is_skipped()));
    assert!(matches!(
        about.interactions[0].result,
        InteractionResult::SkippedDueToScope { .. }
    ));

    let search = find(&report, &at("/search"));
    assert_eq!(search.title.as_deref(), Some("Results"));
    assert_eq!(search.depth, 1);

    assert_eq!(site.submissions().len(), 1);
    assert_eq!(report.statistics.pages_visited, 4);
    assert_eq!(report.statistics.pages_skipped, 1);
    assert_eq!(report.statistics.forms_submitted, 1);
    assert_eq!(report.statistics.interactions["skipped_due_to_scope"], 2);

    let paths = write_reports(&report, output.path()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
    assert_eq!(json["pages"].as_array().unwrap().len(), 4);
    let summary = std::fs::read_to_string(&paths.markdown).unwrap();
    assert!(summary.contains("# Dyncrawl Crawl Summary"));
}

#[tokio::test]
async fn test_failed_page_does_not_stop_crawl() {
    let at = |p: &str| format!("https://shop.test{}", p);
    let site = Arc::new(
        FakeSite::new()
            .page(
                &at("/"),
                PageSpec::new("Shop")
                    .element(ElementSpec::link("Cart", "/cart"))
                    .element(ElementSpec::link("Catalog", "/catalog")),
            )
            .page(&at("/catalog"), PageSpec::new("Catalog"))
            .broken(&at("/cart")),
    );
    let browser: Arc<dyn Browser> = Arc::new(FakeBrowser::new(Arc::clone(&site)));
    let config = test_config(
        &at("/"),
        json!({ "interactWithElements": false, "interactWithForms": false }),
    );

    let mut engine = CrawlerEngine::new(config, browser).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.pages.len(), 3);
    let cart = find(&report, &at("/cart"));
    assert!(cart.error.as_deref().unwrap().contains("ERR_CONNECTION_RESET"));
    let catalog = find(&report, &at("/catalog"));
    assert!(catalog.error.is_none());
    assert_eq!(catalog.title.as_deref(), Some("Catalog"));

    assert_eq!(report.statistics.pages_failed, 1);
    assert!(report.pages.iter().all(|p| p.interactions.is_empty()));
}

#[tokio::test]
async fn test_page_depth_limit() {
    let at = |p: &str| format!("https://docs.test{}", p);
    let site = Arc::new(
        FakeSite::new()
            .page(&at("/"), PageSpec::new("Docs").element(ElementSpec::link("Guide", "/guide")))
            .page(&at("/guide"), PageSpec::new("Guide").element(ElementSpec::link("Advanced", "/guide/advanced")))
            .page(&at("/guide/advanced"), PageSpec::new("Advanced")),
    );
    let browser: Arc<dyn Browser> = Arc::new(FakeBrowser::new(Arc::clone(&site)));
    let config = test_config(&at("/"), json!({ "maxDepth": 1, "interactWithElements": false }));

    let mut engine = CrawlerEngine::new(config, browser).unwrap();
    let report = engine.run().await.unwrap();

    let urls: Vec<&str> = report.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec!["https://docs.test", "https://docs.test/guide"]);
    assert_eq!(report.statistics.pages_by_depth[&1], 1);
}

#[tokio::test]
async fn test_traditional_form_target_is_crawled() {
    let at = |p: &str| format!("https://forum.test{}", p);
    let site = Arc::new(
        FakeSite::new()
            .page(&at("/"), PageSpec::new("Forum").form(search_form()))
            .page(&at("/search"), PageSpec::new("Search results")),
    );
    let browser: Arc<dyn Browser> = Arc::new(FakeBrowser::new(Arc::clone(&site)));
    let config = test_config(&at("/"), json!({ "interactWithElements": false }));

    let mut engine = CrawlerEngine::new(config, browser).unwrap();
    let report = engine.run().await.unwrap();

    let home = find(&report, &at("/"));
    match &home.form_results[0].outcome {
        FormOutcome::Submitted { final_url, .. } => assert_eq!(final_url, &at("/search")),
        other => panic!("expected submission, got {:?}", other),
    }
    let results = find(&report, &at("/search"));
    assert_eq!(results.title.as_deref(), Some("Search results"));
    assert!(engine.ledger().has_form_been_interacted("search", &at("/")));
}
