//! Form discovery, filling and isolated submission

use crate::common::{test_config, url, FakeBrowser, FakeSite, FieldSpec, FormSpec, PageSpec};
use dyncrawl::browser::{Page, WaitUntil};
use dyncrawl::forms::{fill_action, FillAction, FormHandler, FormOutcome};
use dyncrawl::state::InteractionTracker;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn search_form() -> FormSpec {
    FormSpec::new("search", "/search").field(FieldSpec::input("search", "q"))
}

fn contact_site() -> FakeSite {
    FakeSite::new()
        .page(
            &url("/contact"),
            PageSpec::new("Contact").form(
                FormSpec::new("contact", "/thanks")
                    .attr("method", "post")
                    .field(FieldSpec::input("email", "email"))
                    .field(FieldSpec::input("password", "password"))
                    .field(FieldSpec::input("tel", "phone"))
                    .field(FieldSpec::textarea("message"))
                    .field(FieldSpec::input("hidden", "csrf").with_value("tok123"))
                    .field(FieldSpec::input("hidden", "trap"))
                    .field(FieldSpec::input("checkbox", "subscribe"))
                    .field(FieldSpec::input("file", "attachment")),
            ),
        )
        .page(&url("/thanks"), PageSpec::new("Thanks"))
}

fn handler() -> FormHandler {
    FormHandler::from_config(&test_config(&url("/"), json!({})))
}

#[tokio::test]
async fn test_form_filled_and_submitted_in_isolated_page() {
    let site = Arc::new(contact_site());
    let browser = FakeBrowser::new(Arc::clone(&site));
    let page = browser.open(&url("/contact")).await;
    let mut ledger = InteractionTracker::new();

    let results = handler()
        .interact_with_forms(page.as_ref(), &browser, &mut ledger)
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].form_id, "contact");
    match &results[0].outcome {
        FormOutcome::Submitted {
            ajax,
            fields_filled,
            response_observed,
            final_url,
        } => {
            assert!(!ajax);
            assert_eq!(*fields_filled, 6);
            assert!(response_observed);
            assert_eq!(final_url, &url("/thanks"));
        }
        other => panic!("expected submission, got {:?}", other),
    }

    let submissions = site.submissions();
    assert_eq!(submissions.len(), 1);
    let values = &submissions[0].values;
    assert_eq!(values["email"], "test@example.com");
    assert_eq!(values["csrf"], "tok123");
    assert_eq!(values["subscribe"], "on");
    assert_eq!(values["attachment"], "");
    for (name, value) in values {
        if name != "attachment" {
            assert!(!value.is_empty(), "field {} left empty", name);
        }
    }

    // The live page never navigated; the isolated page was closed
    assert_eq!(page.url().await.unwrap(), url("/contact"));
    assert_eq!(site.pages_opened(), 2);
    assert_eq!(site.pages_closed(), 1);
    assert!(ledger.has_form_been_interacted("contact", &url("/contact")));
}

#[tokio::test]
async fn test_form_not_resubmitted() {
    let site = Arc::new(contact_site());
    let browser = FakeBrowser::new(Arc::clone(&site));
    let page = browser.open(&url("/contact")).await;
    let mut ledger = InteractionTracker::new();
    let handler = handler();

    handler
        .interact_with_forms(page.as_ref(), &browser, &mut ledger)
        .await;
    let again = handler
        .interact_with_forms(page.as_ref(), &browser, &mut ledger)
        .await;

    assert_eq!(again.len(), 1);
    assert_eq!(
        again[0].outcome,
        FormOutcome::Skipped {
            reason: "Form already interacted".to_string()
        }
    );

    ledger.add_visited_url(&url("/contact"));
    let processed = handler
        .interact_with_forms(page.as_ref(), &browser, &mut ledger)
        .await;
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0].form_id, "*");
    assert!(processed[0].is_skipped());

    assert_eq!(site.submissions().len(), 1);
}

#[tokio::test]
async fn test_same_form_on_second_page_skipped() {
    let site = Arc::new(
        FakeSite::new()
            .page(&url("/"), PageSpec::new("Home").form(search_form()))
            .page(&url("/docs"), PageSpec::new("Docs").form(search_form())),
    );
    let browser = FakeBrowser::new(Arc::clone(&site));
    let page = browser.open(&url("/")).await;
    let mut ledger = InteractionTracker::new();
    let handler = handler();

    let first = handler
        .interact_with_forms(page.as_ref(), &browser, &mut ledger)
        .await;
    assert!(first[0].is_submitted());

    page.goto(&url("/docs"), WaitUntil::Load, Duration::from_secs(1))
        .await
        .unwrap();
    let second = handler
        .interact_with_forms(page.as_ref(), &browser, &mut ledger)
        .await;

    assert_eq!(second.len(), 1);
    assert!(second[0].is_skipped());
    assert_eq!(site.submissions().len(), 1);
}

#[tokio::test]
async fn test_ajax_form_waits_for_response() {
    let site = Arc::new(FakeSite::new().page(
        &url("/newsletter"),
        PageSpec::new("Newsletter").form(
            FormSpec::new("subscribe", "/api/subscribe")
                .attr("data-remote", "true")
                .field(FieldSpec::input("email", "email")),
        ),
    ));
    let browser = FakeBrowser::new(Arc::clone(&site));
    let page = browser.open(&url("/newsletter")).await;
    let mut ledger = InteractionTracker::new();

    let results = handler()
        .interact_with_forms(page.as_ref(), &browser, &mut ledger)
        .await;

    match &results[0].outcome {
        FormOutcome::Submitted {
            ajax,
            response_observed,
            final_url,
            ..
        } => {
            assert!(ajax);
            assert!(response_observed);
            assert_eq!(final_url, &url("/newsletter"));
        }
        other => panic!("expected submission, got {:?}", other),
    }
}

#[tokio::test]
async fn test_batches_cover_every_form() {
    let mut spec = PageSpec::new("Dashboard");
    for i in 1..=4 {
        spec = spec.form(
            FormSpec::new(&format!("widget-{i}"), "/api/widgets")
                .attr("data-remote", "true")
                .field(FieldSpec::input("text", "label")),
        );
    }
    let site = Arc::new(FakeSite::new().page(&url("/dashboard"), spec));
    let browser = FakeBrowser::new(Arc::clone(&site));
    let page = browser.open(&url("/dashboard")).await;
    let mut ledger = InteractionTracker::new();

    let results = handler()
        .interact_with_forms(page.as_ref(), &browser, &mut ledger)
        .await;

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.is_submitted()));
    assert_eq!(site.pages_opened(), 5);
    assert_eq!(site.pages_closed(), 4);
}

#[tokio::test]
async fn test_form_without_submit_control() {
    let site = Arc::new(
        FakeSite::new()
            .page(
                &url("/filter"),
                PageSpec::new("Filter").form(
                    FormSpec::new("filter", "/results")
                        .without_submit()
                        .field(FieldSpec::input("number", "min")),
                ),
            )
            .page(&url("/results"), PageSpec::new("Results")),
    );
    let browser = FakeBrowser::new(Arc::clone(&site));
    let page = browser.open(&url("/filter")).await;
    let mut ledger = InteractionTracker::new();

    let results = handler()
        .interact_with_forms(page.as_ref(), &browser, &mut ledger)
        .await;

    assert!(results[0].is_submitted());
    assert_eq!(site.submissions()[0].values["min"], "42");
}

#[test]
fn test_hidden_fields_keep_server_values() {
    assert!(matches!(fill_action("input", "hidden"), FillAction::SetIfEmpty(_)));
}
