//! Dynamic-depth exploration against a single live page

use crate::common::{harness, url, Effect, ElementSpec, FakeSite, Harness, PageSpec};
use dyncrawl::browser::Page;
use dyncrawl::interaction::{
    Discovery, DynamicExplorer, ElementOutcome, InteractionResult, PageContext,
};

async fn explore(h: &mut Harness, max_dynamic_depth: u32) -> (Vec<ElementOutcome>, Vec<Discovery>) {
    let start = h.page.url().await.unwrap();
    let elements = h.elements().await;

    let mut ctx = PageContext::new(
        h.page.as_ref(),
        &h.browser,
        &h.frontier,
        &mut h.ledger,
        start,
        0,
    );
    let outcomes = DynamicExplorer::new(max_dynamic_depth)
        .explore(&h.interactor, &mut ctx, elements)
        .await;
    (outcomes, ctx.discoveries)
}

fn texts(outcomes: &[ElementOutcome]) -> Vec<&str> {
    outcomes.iter().map(|o| o.text.as_str()).collect()
}

fn details_page() -> FakeSite {
    FakeSite::new().page(
        &url("/"),
        PageSpec::new("Orders")
            .element(ElementSpec::button("Show details").on_click(Effect::Reveal {
                elements: vec![1],
                ajax: None,
            }))
            .element(ElementSpec::button("Delete").hidden().on_click(Effect::Reveal {
                elements: vec![2],
                ajax: None,
            }))
            .element(ElementSpec::button("Confirm").hidden())
            .element(ElementSpec::button("Help")),
    )
}

#[tokio::test]
async fn test_identical_buttons_explored_separately() {
    let site = FakeSite::new().page(
        &url("/"),
        PageSpec::new("Feed")
            .element(
                ElementSpec::button("Load more")
                    .on_click(Effect::Ajax("/api/items?page=1".to_string())),
            )
            .element(
                ElementSpec::button("Load more")
                    .on_click(Effect::Ajax("/api/items?page=2".to_string())),
            ),
    );
    let mut h = harness(site).await;

    let (outcomes, discoveries) = explore(&mut h, 5).await;

    assert_eq!(outcomes.len(), 2);
    assert_ne!(outcomes[0].identity_key, outcomes[1].identity_key);
    assert!(discoveries.is_empty());

    for outcome in &outcomes {
        assert!(outcome.result.dynamic_changes_detected());
        assert_eq!(outcome.result.ajax_responses().len(), 1);
    }

    let first = &outcomes[0].result.ajax_responses()[0];
    let second = &outcomes[1].result.ajax_responses()[0];
    assert_eq!(first.url, url("/api/items?page=1"));
    assert_eq!(second.url, url("/api/items?page=2"));
    assert_eq!(first.status, Some(200));
    assert!(first.content.is_some());
    assert_ne!(first.content, second.content);
}

#[tokio::test]
async fn test_revealed_elements_explored_depth_first() {
    let mut h = harness(details_page()).await;

    let (outcomes, _) = explore(&mut h, 5).await;

    assert_eq!(texts(&outcomes), vec!["Show details", "Delete", "Confirm", "Help"]);
    let depths: Vec<u32> = outcomes.iter().map(|o| o.dynamic_depth).collect();
    assert_eq!(depths, vec![0, 1, 2, 0]);

    match &outcomes[0].result {
        InteractionResult::Success {
            dynamic_changes_detected,
            new_elements_found,
            ..
        } => {
            assert!(dynamic_changes_detected);
            assert_eq!(new_elements_found.len(), 1);
            assert_eq!(new_elements_found[0].text, "Delete");
        }
        other => panic!("expected success, got {:?}", other),
    }

    assert!(!outcomes[3].result.dynamic_changes_detected());
}

#[tokio::test]
async fn test_dynamic_depth_ceiling() {
    let mut h = harness(details_page()).await;

    let (outcomes, _) = explore(&mut h, 1).await;

    assert_eq!(texts(&outcomes), vec!["Show details", "Delete", "Help"]);
}

#[tokio::test]
async fn test_mutation_signal_counts_as_dynamic() {
    let site = FakeSite::new().page(
        &url("/"),
        PageSpec::new("Settings").element(ElementSpec::button("Toggle theme").on_click(
            Effect::Reveal {
                elements: Vec::new(),
                ajax: None,
            },
        )),
    );
    let mut h = harness(site).await;

    let (outcomes, _) = explore(&mut h, 5).await;

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].result.dynamic_changes_detected());
    assert!(outcomes[0].result.new_elements().is_empty());
    assert!(outcomes[0].result.ajax_responses().is_empty());

    let tokens = h.site.observer_tokens();
    assert!(!tokens.is_empty());
    assert!(tokens.iter().all(|t| t == h.interactor.session_token()));
}

#[tokio::test]
async fn test_out_of_scope_link_never_admitted() {
    let partner = "https://partner.example.org/deal";
    let site = FakeSite::new().page(
        &url("/"),
        PageSpec::new("Home").element(ElementSpec::link("Partner offer", partner)),
    );
    let mut h = harness(site).await;

    let (outcomes, discoveries) = explore(&mut h, 5).await;

    assert_eq!(outcomes.len(), 1);
    match &outcomes[0].result {
        InteractionResult::SkippedDueToScope { reason } => {
            assert!(reason.starts_with("Out of scope"), "reason: {}", reason);
        }
        other => panic!("expected scope skip, got {:?}", other),
    }

    assert!(discoveries.is_empty());
    assert!(!h.frontier.is_queued(partner));
    assert!(!h.frontier.has_been_visited(partner));
    assert_eq!(h.frontier.pending_count(), 0);
    assert_eq!(h.page.url().await.unwrap(), url("/"));
}

#[tokio::test]
async fn test_navigation_discovered_and_page_restored() {
    let site = FakeSite::new()
        .page(
            &url("/"),
            PageSpec::new("Home").element(ElementSpec::link("Pricing", "/pricing")),
        )
        .page(&url("/pricing"), PageSpec::new("Pricing"));
    let mut h = harness(site).await;

    let (outcomes, discoveries) = explore(&mut h, 5).await;

    assert_eq!(outcomes.len(), 1);
    match &outcomes[0].result {
        InteractionResult::SuccessWithNavigation {
            new_url,
            skipped_due_to_scope,
            returned_to_previous_page,
        } => {
            assert_eq!(new_url, &url("/pricing"));
            assert!(!skipped_due_to_scope);
            assert!(returned_to_previous_page);
        }
        other => panic!("expected navigation, got {:?}", other),
    }

    assert_eq!(
        discoveries,
        vec![Discovery {
            url: url("/pricing"),
            depth: 1,
        }]
    );
    assert_eq!(h.page.url().await.unwrap(), url("/"));
}

#[tokio::test]
async fn test_elements_not_reinteracted_on_same_page() {
    let mut h = harness(details_page()).await;

    let (first, _) = explore(&mut h, 5).await;
    assert_eq!(first.len(), 4);
    assert_eq!(h.ledger.element_count(), 4);

    h.page
        .goto(
            &url("/"),
            dyncrawl::browser::WaitUntil::Load,
            std::time::Duration::from_secs(1),
        )
        .await
        .unwrap();
    let (second, _) = explore(&mut h, 5).await;
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_inserted_element_does_not_shift_siblings() {
    let site = FakeSite::new().page(
        &url("/"),
        PageSpec::new("Inbox")
            .element(ElementSpec::button("Load").on_click(Effect::Reveal {
                elements: vec![1],
                ajax: None,
            }))
            .element(
                ElementSpec::clickable_div("New")
                    .detached()
                    .on_click(Effect::Ajax("/api/New".to_string())),
            )
            .element(ElementSpec::clickable_div("B").on_click(Effect::Ajax("/api/B".to_string())))
            .element(ElementSpec::clickable_div("C").on_click(Effect::Ajax("/api/C".to_string()))),
    );
    let mut h = harness(site).await;

    let (outcomes, _) = explore(&mut h, 5).await;

    assert_eq!(texts(&outcomes), vec!["Load", "New", "B", "C"]);
    for outcome in &outcomes[1..] {
        let responses = outcome.result.ajax_responses();
        assert_eq!(responses.len(), 1, "element {}", outcome.text);
        assert_eq!(responses[0].url, url(&format!("/api/{}", outcome.text)));
    }
}

#[tokio::test]
async fn test_classification_passes_release_handles() {
    let h = harness(details_page()).await;

    h.elements().await;
    h.elements().await;
    assert_eq!(h.site.handle_releases(), 2);
}

#[tokio::test]
async fn test_exploration_releases_handles_per_interaction() {
    let mut h = harness(details_page()).await;

    let (outcomes, _) = explore(&mut h, 5).await;

    // one initial pass, then a locate and a re-classification per click
    assert_eq!(h.site.handle_releases(), 1 + 2 * outcomes.len());
}
