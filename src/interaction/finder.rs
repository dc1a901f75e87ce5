//! Element classification
//!
//! Candidates come from a fixed selector list. Each candidate gets a
//! selector strategy and an index among candidates sharing that strategy,
//! counted in document order before any filtering. Strategies carry the
//! element text, so the index only breaks ties between look-alikes and a
//! node inserted elsewhere does not shift it. Resolving checks that the
//! element found still has the expected tag and text.

use crate::browser::{BrowserResult, ElementHandle, ElementSnapshot, Page};
use crate::interaction::element::{
    normalize_text, ClickableElement, ElementSelector, ElementType, InteractiveReason,
    SelectorStrategy,
};
use std::collections::HashMap;

/// Candidate selectors, in priority order
pub const CANDIDATE_SELECTORS: &[&str] = &[
    "a[href]",
    "button:not([disabled])",
    "input[type=\"button\"]",
    "input[type=\"submit\"]",
    "[role=\"button\"]",
    "[role=\"link\"]",
    "[role=\"tab\"]",
    "[role=\"menuitem\"]",
    "[onclick]",
    "[tabindex]",
    "[data-testid]",
    "[data-test]",
    "[data-cy]",
    "[data-qa]",
];

/// ARIA roles that make an element interactive
pub const INTERACTIVE_ROLES: &[&str] = &["button", "link", "tab", "menuitem"];

/// Test-automation attributes that make an element a candidate
pub const TEST_ID_ATTRIBUTES: &[&str] = &["data-testid", "data-test", "data-cy", "data-qa"];

/// Finds interactive elements on a page and resolves them again later
#[derive(Debug, Clone, Default)]
pub struct ElementFinder;

impl ElementFinder {
    pub fn new() -> Self {
        Self
    }

    /// The candidate selectors joined into one CSS selector list
    pub fn prefilter_css() -> String {
        CANDIDATE_SELECTORS.join(", ")
    }

    /// Returns every visible candidate with at least one interactive reason
    pub async fn find_clickable_elements(
        &self,
        page: &dyn Page,
    ) -> BrowserResult<Vec<ClickableElement>> {
        let candidates = self.candidates(page).await?;
        let mut elements = Vec::new();

        for (_, snapshot, selector) in candidates {
            if let Some(element) = classify(&snapshot, selector) {
                elements.push(element);
            }
        }

        tracing::debug!(count = elements.len(), "classified clickable elements");
        Ok(elements)
    }

    /// Resolves an element's selector against the live page
    ///
    /// Returns `None` when nothing matches or when the match no longer has
    /// the element's tag and text.
    pub async fn resolve(
        &self,
        page: &dyn Page,
        element: &ClickableElement,
    ) -> BrowserResult<Option<ElementHandle>> {
        let candidates = self.candidates(page).await?;
        let Some((handle, snapshot, _)) = candidates
            .into_iter()
            .find(|(_, _, candidate)| *candidate == element.selector)
        else {
            return Ok(None);
        };

        if snapshot.tag != element.tag || normalize_text(&snapshot.text) != element.text {
            tracing::debug!(
                selector = %element.selector,
                found = %snapshot.tag,
                "selector matched a different element"
            );
            return Ok(None);
        }

        Ok(Some(handle))
    }

    /// All candidates in document order with their snapshots and selectors
    ///
    /// Handles from earlier passes are released first.
    async fn candidates(
        &self,
        page: &dyn Page,
    ) -> BrowserResult<Vec<(ElementHandle, ElementSnapshot, ElementSelector)>> {
        if let Err(e) = page.release_handles().await {
            tracing::trace!(error = %e, "could not release element handles");
        }

        let handles = page.query_selector_all(&Self::prefilter_css()).await?;
        let mut counts: HashMap<SelectorStrategy, usize> = HashMap::new();
        let mut candidates = Vec::with_capacity(handles.len());

        for handle in handles {
            let snapshot = match page.describe(&handle).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::trace!(error = %e, "skipping element that could not be described");
                    continue;
                }
            };

            if !is_candidate(&snapshot) {
                continue;
            }

            let strategy = derive_strategy(&snapshot);
            let count = counts.entry(strategy.clone()).or_insert(0);
            let selector = ElementSelector {
                strategy,
                nth: *count,
            };
            *count += 1;

            candidates.push((handle, snapshot, selector));
        }

        Ok(candidates)
    }
}

/// Mirrors [`CANDIDATE_SELECTORS`] for an already-described element
pub fn is_candidate(snapshot: &ElementSnapshot) -> bool {
    let tag = snapshot.tag.as_str();
    let input_type = snapshot.attr("type").unwrap_or_default();

    (tag == "a" && snapshot.has_attr("href"))
        || (tag == "button" && !snapshot.has_attr("disabled"))
        || (tag == "input" && (input_type == "button" || input_type == "submit"))
        || snapshot
            .attr("role")
            .is_some_and(|role| INTERACTIVE_ROLES.contains(&role))
        || snapshot.has_attr("onclick")
        || snapshot.has_attr("tabindex")
        || TEST_ID_ATTRIBUTES.iter().any(|a| snapshot.has_attr(a))
}

fn is_native_button(snapshot: &ElementSnapshot) -> bool {
    match snapshot.tag.as_str() {
        "button" => true,
        "input" => matches!(
            snapshot.attr("type").unwrap_or_default(),
            "button" | "submit" | "reset"
        ),
        _ => false,
    }
}

/// Every reason the element counts as interactive
pub fn interactive_reasons(snapshot: &ElementSnapshot) -> Vec<InteractiveReason> {
    let mut reasons = Vec::new();

    if let Some(href) = snapshot.attr("href") {
        let lower = href.trim().to_ascii_lowercase();
        if !lower.starts_with("mailto:") && !lower.starts_with("tel:") {
            reasons.push(InteractiveReason::Href);
        }
    }

    if is_native_button(snapshot) {
        reasons.push(InteractiveReason::NativeButton);
    }

    if let Some(role) = snapshot.attr("role") {
        if INTERACTIVE_ROLES.contains(&role) {
            reasons.push(InteractiveReason::AriaRole(role.to_string()));
        }
    }

    if snapshot.has_attr("onclick") {
        reasons.push(InteractiveReason::OnClick);
    }

    if snapshot.has_attr("tabindex") {
        reasons.push(InteractiveReason::TabIndex);
    }

    if snapshot.cursor == "pointer" {
        reasons.push(InteractiveReason::PointerCursor);
    }

    reasons
}

/// First rule that yields a selector wins: role(+text), text, data-*,
/// structural
pub fn derive_strategy(snapshot: &ElementSnapshot) -> SelectorStrategy {
    let text = normalize_text(&snapshot.text);

    if let Some(role) = snapshot.attr("role").filter(|r| !r.is_empty()) {
        return if text.is_empty() {
            SelectorStrategy::Role {
                role: role.to_string(),
            }
        } else {
            SelectorStrategy::RoleText {
                role: role.to_string(),
                text,
            }
        };
    }

    if matches!(snapshot.tag.as_str(), "a" | "button") && !text.is_empty() {
        return SelectorStrategy::Text {
            tag: snapshot.tag.clone(),
            text,
        };
    }

    let data: Vec<(String, String)> = snapshot
        .attributes
        .iter()
        .filter(|(name, _)| name.starts_with("data-"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    if !data.is_empty() {
        return SelectorStrategy::Data {
            attributes: data,
            text,
        };
    }

    SelectorStrategy::Structural {
        tag: snapshot.tag.clone(),
        href: snapshot.attr("href").map(str::to_string),
        onclick: snapshot.has_attr("onclick"),
        id: snapshot
            .attr("id")
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        text,
    }
}

/// Applies the exclusion rules and builds the element, or `None` if it is
/// hidden, a disabled native button, or has no interactive reason
pub fn classify(snapshot: &ElementSnapshot, selector: ElementSelector) -> Option<ClickableElement> {
    if !snapshot.visible {
        return None;
    }

    if is_native_button(snapshot) && (snapshot.disabled || snapshot.has_attr("disabled")) {
        return None;
    }

    let reasons = interactive_reasons(snapshot);
    if reasons.is_empty() {
        return None;
    }

    Some(ClickableElement {
        selector,
        element_type: ElementType::from_tag(&snapshot.tag),
        tag: snapshot.tag.clone(),
        text: normalize_text(&snapshot.text),
        is_visible: true,
        href: snapshot.attr("href").map(str::to_string),
        is_interactive: true,
        interactive_reasons: reasons,
        attributes: snapshot.attributes.clone(),
    })
}
