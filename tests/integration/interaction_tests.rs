//! Locate and click chains of a single interaction

use crate::common::{harness, harness_with, url, ClickPath, ElementSpec, FakeSite, PageSpec};
use dyncrawl::interaction::{ClickableElement, InteractionResult};
use serde_json::json;

fn site(element: ElementSpec) -> FakeSite {
    FakeSite::new().page(&url("/"), PageSpec::new("Editor").element(element))
}

fn failure_reason(result: &InteractionResult) -> Option<&str> {
    match result {
        InteractionResult::Failure { reason } => Some(reason),
        _ => None,
    }
}

fn skip_reason(result: &InteractionResult) -> Option<&str> {
    match result {
        InteractionResult::SkippedDueToScope { reason } => Some(reason),
        _ => None,
    }
}

/// The element as it was classified before a re-render moved it
fn stale(mut element: ClickableElement) -> ClickableElement {
    element.selector.nth = 9;
    element
}

#[tokio::test]
async fn test_fallback_tries_test_id_then_aria_label_then_title() {
    let mut h = harness(site(
        ElementSpec::button("Save")
            .attr("data-testid", "save")
            .attr("aria-label", "Save draft")
            .attr("title", "Save (Ctrl+S)"),
    ))
    .await;

    let mut element = stale(h.element("Save").await);
    element.attributes.insert("data-testid".to_string(), "save-v1".to_string());
    element.attributes.insert("aria-label".to_string(), "Save now".to_string());

    let result = h.interact(&element).await;

    assert!(result.is_success(), "result: {:?}", result);
    assert_eq!(
        h.site.queries(),
        vec![
            r#"button[data-testid="save-v1"]"#,
            r#"button[aria-label="Save now"]"#,
            r#"button[title="Save (Ctrl+S)"]"#,
        ]
    );
    assert_eq!(h.site.clicks(), vec!["native:save:ok"]);
}

#[tokio::test]
async fn test_fallback_fuzzy_text() {
    let mut h = harness(site(ElementSpec::button("Save changes"))).await;

    let mut element = stale(h.element("Save changes").await);
    element.text = "Save".to_string();

    let result = h.interact(&element).await;

    assert!(result.is_success(), "result: {:?}", result);
    assert!(h.site.queries().is_empty());
    assert_eq!(h.site.clicks(), vec!["native:save changes:ok"]);
}

#[tokio::test]
async fn test_unresolvable_element_fails() {
    let mut h = harness(site(ElementSpec::button("Save"))).await;

    let mut element = stale(h.element("Save").await);
    element.text = "Publish".to_string();

    let result = h.interact(&element).await;

    assert_eq!(failure_reason(&result), Some("Element not found"));
    assert!(h.site.clicks().is_empty());
}

#[tokio::test]
async fn test_click_falls_through_to_script_then_pointer() {
    let mut h = harness(site(
        ElementSpec::button("Export")
            .refuse(ClickPath::Native)
            .refuse(ClickPath::Script),
    ))
    .await;

    let element = h.element("Export").await;
    let result = h.interact(&element).await;

    assert!(result.is_success(), "result: {:?}", result);
    assert_eq!(
        h.site.clicks(),
        vec![
            "native:export:refused",
            "script:export:refused",
            "pointer:export:ok"
        ]
    );
}

#[tokio::test]
async fn test_overlay_dismissed_before_next_round() {
    let site = FakeSite::new().page(
        &url("/"),
        PageSpec::new("Shop").with_overlay().element(
            ElementSpec::button("Checkout")
                .refuse(ClickPath::Script)
                .refuse(ClickPath::Pointer),
        ),
    );
    let mut h = harness(site).await;

    let element = h.element("Checkout").await;
    let result = h.interact(&element).await;

    assert!(result.is_success(), "result: {:?}", result);
    assert_eq!(
        h.site.clicks(),
        vec![
            "native:checkout:blocked",
            "dismiss",
            "script:checkout:refused",
            "pointer:checkout:refused",
            "native:checkout:ok",
        ]
    );
}

#[tokio::test]
async fn test_all_click_paths_failing() {
    let mut h = harness(site(
        ElementSpec::button("Delete")
            .refuse(ClickPath::Native)
            .refuse(ClickPath::Script)
            .refuse(ClickPath::Pointer),
    ))
    .await;

    let element = h.element("Delete").await;
    let result = h.interact(&element).await;

    assert_eq!(failure_reason(&result), Some("Failed to click element"));
    assert_eq!(h.site.clicks().len(), 6);
}

#[tokio::test]
async fn test_script_link_invoked_once() {
    let mut h = harness(site(ElementSpec::link("Open menu", "javascript:void(0)"))).await;

    let element = h.element("Open menu").await;
    let first = h.interact(&element).await;
    let second = h.interact(&element).await;

    assert!(first.is_success(), "result: {:?}", first);
    assert_eq!(skip_reason(&second), Some("Script link already invoked"));
    assert_eq!(h.site.clicks(), vec!["native:open menu:ok"]);
}

#[tokio::test]
async fn test_failed_script_link_can_be_retried() {
    let mut h = harness(site(
        ElementSpec::link("Open menu", "javascript:toggle()")
            .refuse(ClickPath::Native)
            .refuse(ClickPath::Script)
            .refuse(ClickPath::Pointer),
    ))
    .await;

    let element = h.element("Open menu").await;
    let first = h.interact(&element).await;
    let second = h.interact(&element).await;

    assert_eq!(failure_reason(&first), Some("Failed to click element"));
    assert_eq!(failure_reason(&second), Some("Failed to click element"));
    assert_eq!(h.ledger.element_count(), 0);
}

#[tokio::test]
async fn test_query_variants_exempt_by_default() {
    let partner = "https://partner.example.org/search?q=1";
    let mut h = harness(site(ElementSpec::link("Partner search", partner))).await;

    let element = h.element("Partner search").await;
    let result = h.interact(&element).await;

    match result {
        InteractionResult::SuccessWithNavigation {
            skipped_due_to_scope,
            returned_to_previous_page,
            ..
        } => {
            assert!(skipped_due_to_scope);
            assert!(returned_to_previous_page);
        }
        other => panic!("expected navigation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_query_variants_checked_when_disabled() {
    let site = FakeSite::new().page(
        &url("/"),
        PageSpec::new("Home")
            .element(ElementSpec::link(
                "Partner search",
                "https://partner.example.org/search?q=1",
            ))
            .element(ElementSpec::link("Docs page 2", "/docs?page=2")),
    );
    let mut h = harness_with(site, json!({ "revisitQueryVariants": false })).await;
    h.ledger.add_visited_url(&url("/docs"));

    let partner = h.element("Partner search").await;
    let docs = h.element("Docs page 2").await;
    let partner_result = h.interact(&partner).await;
    let docs_result = h.interact(&docs).await;

    assert!(skip_reason(&partner_result).is_some_and(|r| r.starts_with("Out of scope")));
    assert_eq!(
        skip_reason(&docs_result),
        Some(format!("Already visited: {}", url("/docs")).as_str())
    );
    assert!(h.site.clicks().is_empty());
}
