//! Single-element interaction
//!
//! Each interaction walks `PreCheck -> Locate -> Click -> Observe ->
//! Classify`. Every wait is bounded and a timeout means "continue with
//! what we have". Only exhausted locate or click chains produce a
//! `Failure`.

use crate::browser::{attr_selector, Browser, ElementHandle, Page, WaitUntil};
use crate::config::Config;
use crate::crawler::UrlQueue;
use crate::forms::{FormHandler, FormInteractionResult};
use crate::interaction::element::{normalize_text, ClickableElement};
use crate::interaction::finder::{ElementFinder, TEST_ID_ATTRIBUTES};
use crate::interaction::observer::{wait_for_framework, ChangeObserver, Observation, ObserverSettings};
use crate::interaction::result::{Discovery, InteractionResult};
use crate::state::InteractionTracker;
use crate::url::{has_query, resolve_href, strip_query_and_fragment};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Selector resolution attempts before falling back to alternatives
const LOCATE_ATTEMPTS: u32 = 3;

/// Rounds through the click strategy chain
const CLICK_ROUNDS: u32 = 2;

/// Upper bound on the native click timeout
const NATIVE_CLICK_TIMEOUT: Duration = Duration::from_secs(2);

/// Timing and policy for element interactions
#[derive(Debug, Clone, Copy)]
pub struct InteractorSettings {
    /// Global operation timeout; navigating back uses half of it
    pub timeout: Duration,
    pub click_timeout: Duration,
    /// Base backoff between locate and click retries
    pub retry_delay: Duration,
    pub framework_timeout: Duration,
    pub observer: ObserverSettings,
    pub interact_with_forms: bool,
    pub revisit_query_variants: bool,
}

impl InteractorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.timeout(),
            click_timeout: config.timeout().min(NATIVE_CLICK_TIMEOUT),
            retry_delay: config.retry_delay(),
            framework_timeout: config.framework_timeout(),
            observer: ObserverSettings {
                network_idle: config.network_idle_time(),
                global_timeout: config.timeout(),
                framework_timeout: config.framework_timeout(),
            },
            interact_with_forms: config.interact_with_forms,
            revisit_query_variants: config.revisit_query_variants,
        }
    }
}

/// Everything an interaction may read or record for the page being explored
///
/// The frontier is read-only here. Navigations found mid-interaction are
/// collected in `discoveries` and the engine adds them to the frontier.
pub struct PageContext<'a> {
    pub page: &'a dyn Page,
    pub browser: &'a dyn Browser,
    pub frontier: &'a UrlQueue,
    pub ledger: &'a mut InteractionTracker,
    /// URL the page was loaded from
    pub url: String,
    /// Page depth of `url`
    pub depth: u32,
    pub discoveries: Vec<Discovery>,
    /// Forms submitted on pages reached by navigating interactions
    pub form_results: Vec<FormInteractionResult>,
}

impl<'a> PageContext<'a> {
    pub fn new(
        page: &'a dyn Page,
        browser: &'a dyn Browser,
        frontier: &'a UrlQueue,
        ledger: &'a mut InteractionTracker,
        url: impl Into<String>,
        depth: u32,
    ) -> Self {
        Self {
            page,
            browser,
            frontier,
            ledger,
            url: url.into(),
            depth,
            discoveries: Vec::new(),
            form_results: Vec::new(),
        }
    }

    fn discover(&mut self, url: &str) {
        if !self.discoveries.iter().any(|d| d.url == url) {
            self.discoveries.push(Discovery {
                url: url.to_string(),
                depth: self.depth + 1,
            });
        }
    }
}

/// Performs single interactions against the live page
#[derive(Debug, Clone)]
pub struct ElementInteractor {
    settings: InteractorSettings,
    finder: ElementFinder,
    forms: FormHandler,
    session_token: String,
}

impl ElementInteractor {
    pub fn new(settings: InteractorSettings, forms: FormHandler, session_token: impl Into<String>) -> Self {
        Self {
            settings,
            finder: ElementFinder::new(),
            forms,
            session_token: session_token.into(),
        }
    }

    pub fn from_config(config: &Config, session_token: impl Into<String>) -> Self {
        Self::new(
            InteractorSettings::from_config(config),
            FormHandler::from_config(config),
            session_token,
        )
    }

    pub fn finder(&self) -> &ElementFinder {
        &self.finder
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Interacts with one element
    ///
    /// `known` holds identity keys the caller already has; only elements
    /// outside it are reported as new.
    pub async fn interact(
        &self,
        ctx: &mut PageContext<'_>,
        element: &ClickableElement,
        known: &HashSet<String>,
    ) -> InteractionResult {
        if let Some(skip) = self.precheck(&*ctx, element) {
            tracing::debug!(element = %element.selector, result = ?skip, "interaction skipped");
            return skip;
        }

        let page = ctx.page;
        let start_url = page.url().await.unwrap_or_else(|_| ctx.url.clone());

        let Some(handle) = self.locate(page, element).await else {
            tracing::debug!(element = %element.selector, "element not found");
            return InteractionResult::failure("Element not found");
        };

        let observer = ChangeObserver::attach(page, &self.session_token, self.settings.observer).await;

        if !self.click(page, &handle).await {
            tracing::debug!(element = %element.selector, "all click strategies failed");
            return InteractionResult::failure("Failed to click element");
        }

        if let Some(href) = script_href(element) {
            ctx.ledger.add_interacted_element(&script_key(href, &element.text));
        }

        let observation = observer.settle(page).await;
        self.classify_outcome(ctx, &start_url, observation, known).await
    }

    /// Scope and dedup checks that need no page access
    fn precheck(&self, ctx: &PageContext<'_>, element: &ClickableElement) -> Option<InteractionResult> {
        let href = element.href.as_deref()?.trim();

        if href.is_empty() || href.starts_with('#') {
            return None;
        }

        if is_script_href(href) {
            if ctx.ledger.has_element_been_interacted(&script_key(href, &element.text)) {
                return Some(InteractionResult::skipped("Script link already invoked"));
            }
            return None;
        }

        let target = match resolve_href(&ctx.url, href) {
            Ok(target) => target,
            Err(e) => return Some(InteractionResult::skipped(format!("Unusable href {href}: {e}"))),
        };

        let query_exempt = self.settings.revisit_query_variants && has_query(&target);

        if !query_exempt && !element.is_ajax_hint() && !ctx.frontier.scope().allows(&target) {
            return Some(InteractionResult::skipped(format!("Out of scope: {target}")));
        }

        if !query_exempt {
            let base = strip_query_and_fragment(target.as_str());
            if ctx.ledger.has_url_been_visited(&base) || ctx.frontier.has_been_visited(&base) {
                return Some(InteractionResult::skipped(format!("Already visited: {base}")));
            }
        }

        None
    }

    /// Resolves the selector with retries, then the fallback chain
    async fn locate(&self, page: &dyn Page, element: &ClickableElement) -> Option<ElementHandle> {
        for attempt in 1..=LOCATE_ATTEMPTS {
            wait_for_framework(page, self.settings.framework_timeout).await;

            match self.finder.resolve(page, element).await {
                Ok(Some(handle)) => return Some(handle),
                Ok(None) => {}
                Err(e) => tracing::trace!(attempt, error = %e, "selector resolution failed"),
            }

            if attempt < LOCATE_ATTEMPTS {
                tokio::time::sleep(self.settings.retry_delay * attempt).await;
            }
        }

        self.locate_fallback(page, element).await
    }

    /// Test-id, `aria-label`, `title`, then fuzzy text
    async fn locate_fallback(&self, page: &dyn Page, element: &ClickableElement) -> Option<ElementHandle> {
        let mut selectors = Vec::new();
        for name in TEST_ID_ATTRIBUTES.iter().chain(&["aria-label", "title"]) {
            if let Some(value) = element.attr(name).filter(|v| !v.is_empty()) {
                selectors.push(attr_selector(&element.tag, name, value));
            }
        }

        for selector in &selectors {
            if let Ok(handles) = page.query_selector_all(selector).await {
                if let Some(handle) = handles.into_iter().next() {
                    tracing::debug!(selector = %selector, "located element by fallback selector");
                    return Some(handle);
                }
            }
        }

        if element.text.is_empty() {
            return None;
        }

        let wanted = element.text.to_lowercase();
        let handles = page.query_selector_all(&ElementFinder::prefilter_css()).await.ok()?;
        for handle in handles {
            let Ok(snapshot) = page.describe(&handle).await else {
                continue;
            };
            if !snapshot.visible || snapshot.tag != element.tag {
                continue;
            }
            let text = normalize_text(&snapshot.text).to_lowercase();
            if !text.is_empty() && (text.contains(&wanted) || wanted.contains(&text)) {
                tracing::debug!(text = %element.text, "located element by fuzzy text");
                return Some(handle);
            }
        }

        None
    }

    /// Native click, script click, pointer click at the box center
    ///
    /// Overlays are dismissed whenever the native click fails.
    async fn click(&self, page: &dyn Page, handle: &ElementHandle) -> bool {
        for round in 1..=CLICK_ROUNDS {
            match page.click(handle, self.settings.click_timeout).await {
                Ok(()) => return true,
                Err(e) => tracing::trace!(round, error = %e, "native click failed"),
            }

            if let Err(e) = page.dismiss_overlays().await {
                tracing::trace!(error = %e, "overlay dismissal failed");
            }

            match page.dispatch_click(handle).await {
                Ok(()) => return true,
                Err(e) => tracing::trace!(round, error = %e, "script click failed"),
            }

            if let Ok(Some(bbox)) = page.bounding_box(handle).await {
                let (x, y) = bbox.center();
                match page.mouse_click(x, y).await {
                    Ok(()) => return true,
                    Err(e) => tracing::trace!(round, error = %e, "pointer click failed"),
                }
            }

            if round < CLICK_ROUNDS {
                tokio::time::sleep(self.settings.retry_delay * round).await;
            }
        }

        false
    }

    /// New elements win over a URL change; a fragment-free URL change is a
    /// navigation; anything else is an in-place success
    async fn classify_outcome(
        &self,
        ctx: &mut PageContext<'_>,
        start_url: &str,
        observation: Observation,
        known: &HashSet<String>,
    ) -> InteractionResult {
        let page = ctx.page;
        let current_url = page.url().await.unwrap_or_else(|_| start_url.to_string());
        let navigated = current_url != start_url;

        let mut keys = HashSet::new();
        let new_elements: Vec<ClickableElement> = match self.finder.find_clickable_elements(page).await {
            Ok(elements) => elements
                .into_iter()
                .filter(|el| {
                    let key = el.identity_key();
                    !known.contains(&key) && keys.insert(key)
                })
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "re-classification failed");
                Vec::new()
            }
        };

        let signalled = observation.any();
        let ajax_responses = observation.ajax_responses;

        if !new_elements.is_empty() && (!ajax_responses.is_empty() || !navigated) {
            tracing::debug!(count = new_elements.len(), ajax = ajax_responses.len(), "interaction revealed new elements");
            return InteractionResult::Success {
                dynamic_changes_detected: true,
                new_elements_found: new_elements,
                ajax_responses,
            };
        }

        let has_fragment = Url::parse(&current_url).is_ok_and(|u| u.fragment().is_some());
        if navigated && !has_fragment {
            return self.handle_navigation(ctx, start_url, &current_url).await;
        }

        InteractionResult::Success {
            dynamic_changes_detected: signalled || !new_elements.is_empty(),
            new_elements_found: new_elements,
            ajax_responses,
        }
    }

    /// Registers an in-scope, unvisited target, runs forms there once and
    /// navigates back to where the interaction started
    async fn handle_navigation(&self, ctx: &mut PageContext<'_>, start_url: &str, new_url: &str) -> InteractionResult {
        let in_scope = ctx.frontier.is_in_scope(new_url);

        if !in_scope {
            tracing::debug!(url = %new_url, "interaction navigated out of scope");
        } else if !ctx.frontier.has_been_visited(new_url) {
            tracing::info!(url = %new_url, depth = ctx.depth + 1, "interaction navigated to new page");
            ctx.discover(new_url);

            if self.settings.interact_with_forms {
                let results = self
                    .forms
                    .interact_with_forms(ctx.page, ctx.browser, &mut *ctx.ledger)
                    .await;
                ctx.form_results.extend(results);
            }
        }

        let back_timeout = self.settings.timeout / 2;
        let returned = match ctx.page.goto(start_url, WaitUntil::Load, back_timeout).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(url = %start_url, error = %e, "could not return to previous page");
                false
            }
        };

        InteractionResult::SuccessWithNavigation {
            new_url: new_url.to_string(),
            skipped_due_to_scope: !in_scope,
            returned_to_previous_page: returned,
        }
    }
}

fn is_script_href(href: &str) -> bool {
    href.to_ascii_lowercase().starts_with("javascript:")
}

/// The trimmed href when it is a `javascript:` pseudo-URL
fn script_href(element: &ClickableElement) -> Option<&str> {
    element
        .href
        .as_deref()
        .map(str::trim)
        .filter(|href| is_script_href(href))
}

/// Dedup key for a `javascript:` link: script body plus element text
fn script_key(href: &str, text: &str) -> String {
    let digest = Sha256::digest(format!("{}\u{0}{}", href, text).as_bytes());
    format!("script:{}", hex::encode(digest))
}
