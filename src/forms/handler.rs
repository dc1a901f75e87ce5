use crate::browser::{
    attr_selector, Browser, BrowserError, BrowserResult, ElementHandle, Page, PageEvent, WaitUntil,
};
use crate::config::{ConcurrencyMode, Config};
use crate::forms::fill::{fill_action, FillAction};
use crate::forms::types::{FormDescriptor, FormField, FormInteractionResult, FormOutcome};
use crate::state::InteractionTracker;
use futures::future::join_all;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

/// Controls a form may contain
pub const FIELD_SELECTOR: &str = "input, textarea, select";

/// Controls that submit a form
pub const SUBMIT_SELECTOR: &str =
    "button[type=\"submit\"], input[type=\"submit\"], button:not([type])";

/// Forms submitted concurrently at most
pub const MAX_BATCH_SIZE: usize = 3;

/// Timing and batching for form submission
#[derive(Debug, Clone, Copy)]
pub struct FormSettings {
    /// Navigation timeout for the isolated page
    pub timeout: Duration,
    /// Bound on the wait for a response or navigation after submitting
    pub submit_wait: Duration,
    /// Timeout for the native click on the submit control
    pub click_timeout: Duration,
    pub batch_size: usize,
}

impl FormSettings {
    pub fn from_config(config: &Config) -> Self {
        let batch_size = match config.concurrency_mode {
            ConcurrencyMode::Sequential => 1,
            ConcurrencyMode::Batched => {
                MAX_BATCH_SIZE.min(config.max_concurrent_requests.max(1) as usize)
            }
        };

        Self {
            timeout: config.timeout(),
            submit_wait: config.timeout() / 3,
            click_timeout: config.timeout().min(Duration::from_secs(2)),
            batch_size,
        }
    }
}

/// Discovers, fills and submits forms
///
/// Each submission runs in its own page so a navigating submit never
/// disturbs the caller's live page. Ledger reads and writes happen between
/// batches, never while submissions are in flight.
#[derive(Debug, Clone)]
pub struct FormHandler {
    settings: FormSettings,
}

impl FormHandler {
    pub fn new(settings: FormSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(FormSettings::from_config(config))
    }

    /// Submits every form on `page` not already in the ledger
    ///
    /// A page the ledger has already processed yields a single skipped
    /// result.
    pub async fn interact_with_forms(
        &self,
        page: &dyn Page,
        browser: &dyn Browser,
        ledger: &mut InteractionTracker,
    ) -> Vec<FormInteractionResult> {
        let url = match page.url().await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read page URL for form pass");
                return Vec::new();
            }
        };

        if ledger.has_url_been_visited(&url) {
            tracing::debug!(url = %url, "page already processed, skipping forms");
            return vec![FormInteractionResult::skipped(
                "*",
                url,
                "Page already processed",
            )];
        }

        let forms = match self.discover_forms(page).await {
            Ok(forms) => forms,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "form discovery failed");
                return Vec::new();
            }
        };

        if forms.is_empty() {
            return Vec::new();
        }

        tracing::debug!(url = %url, count = forms.len(), "discovered forms");

        let mut results = Vec::new();
        let mut queued = HashSet::new();
        let mut pending = Vec::new();

        for form in forms {
            if ledger.has_form_been_interacted(&form.identifier, &url)
                || !queued.insert(form.identifier.clone())
            {
                results.push(FormInteractionResult::skipped(
                    form.identifier,
                    url.clone(),
                    "Form already interacted",
                ));
                continue;
            }
            pending.push(form);
        }

        for batch in pending.chunks(self.settings.batch_size.max(1)) {
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|form| self.submit_isolated(browser, &url, form)),
            )
            .await;

            for (form, outcome) in batch.iter().zip(outcomes) {
                match &outcome {
                    FormOutcome::Submitted { .. } => {
                        ledger.add_interacted_form(&form.identifier, &url);
                        tracing::info!(form = %form.identifier, url = %url, "form submitted");
                    }
                    FormOutcome::Failed { reason } => {
                        tracing::warn!(form = %form.identifier, url = %url, reason = %reason, "form submission failed");
                    }
                    FormOutcome::Skipped { .. } => {}
                }

                results.push(FormInteractionResult {
                    form_id: form.identifier.clone(),
                    url: url.clone(),
                    outcome,
                });
            }
        }

        results
    }

    /// Describes every form on the page, in document order
    pub async fn discover_forms(&self, page: &dyn Page) -> BrowserResult<Vec<FormDescriptor>> {
        let handles = page.query_selector_all("form").await?;
        let mut forms = Vec::with_capacity(handles.len());

        for (index, handle) in handles.iter().enumerate() {
            let snapshot = page.describe(handle).await?;

            let mut fields = Vec::new();
            for field in page.query_within(handle, FIELD_SELECTOR).await? {
                if let Ok(field_snapshot) = page.describe(&field).await {
                    fields.push(FormField::from_snapshot(&field_snapshot));
                }
            }

            forms.push(FormDescriptor::from_snapshot(&snapshot, index, fields));
        }

        Ok(forms)
    }

    /// Opens a page, submits the form there and always closes the page
    async fn submit_isolated(&self, browser: &dyn Browser, url: &str, form: &FormDescriptor) -> FormOutcome {
        let page = match browser.new_page().await {
            Ok(page) => page,
            Err(e) => {
                return FormOutcome::Failed {
                    reason: format!("could not open page: {e}"),
                }
            }
        };

        let outcome = self.submit_on(page.as_ref(), url, form).await;

        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "failed to close form page");
        }

        outcome.unwrap_or_else(|e| FormOutcome::Failed {
            reason: e.to_string(),
        })
    }

    async fn submit_on(&self, page: &dyn Page, url: &str, form: &FormDescriptor) -> BrowserResult<FormOutcome> {
        match page.goto(url, WaitUntil::Load, self.settings.timeout).await {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                tracing::debug!(url = %url, "form page load timed out, continuing");
            }
            Err(e) => return Err(e),
        }

        let handle = self
            .relocate(page, form)
            .await?
            .ok_or_else(|| BrowserError::ElementNotFound {
                selector: form.identifier.clone(),
            })?;

        let fields_filled = self.fill_fields(page, &handle).await?;

        let mut events = page.events();
        self.submit(page, &handle).await?;
        let response_observed =
            wait_for_submission(&mut events, form.ajax, self.settings.submit_wait).await;

        let final_url = page.url().await.unwrap_or_else(|_| url.to_string());

        Ok(FormOutcome::Submitted {
            ajax: form.ajax,
            fields_filled,
            response_observed,
            final_url,
        })
    }

    /// Finds the equivalent form on a fresh page: id, name, action, index
    async fn relocate(&self, page: &dyn Page, form: &FormDescriptor) -> BrowserResult<Option<ElementHandle>> {
        let mut selectors = Vec::new();
        if let Some(id) = &form.id {
            selectors.push(attr_selector("form", "id", id));
        }
        if let Some(name) = &form.name {
            selectors.push(attr_selector("form", "name", name));
        }
        if !form.action.is_empty() {
            selectors.push(attr_selector("form", "action", &form.action));
        }

        for selector in selectors {
            if let Some(handle) = page.query_selector_all(&selector).await?.into_iter().next() {
                return Ok(Some(handle));
            }
        }

        Ok(page.query_selector_all("form").await?.into_iter().nth(form.index))
    }

    /// Fills every fillable control; returns how many were filled
    async fn fill_fields(&self, page: &dyn Page, form: &ElementHandle) -> BrowserResult<usize> {
        let mut filled = 0;

        for field in page.query_within(form, FIELD_SELECTOR).await? {
            let snapshot = match page.describe(&field).await {
                Ok(snapshot) => snapshot,
                Err(_) => continue,
            };

            if snapshot.disabled {
                continue;
            }

            let input_type = snapshot
                .attr("type")
                .filter(|t| !t.is_empty())
                .unwrap_or("text")
                .to_ascii_lowercase();

            let result = match fill_action(&snapshot.tag, &input_type) {
                FillAction::Skip => continue,
                FillAction::Type(value) if snapshot.visible => page.fill(&field, value).await,
                FillAction::Type(value) | FillAction::SetValue(value) => {
                    page.set_value(&field, value).await
                }
                FillAction::SetIfEmpty(value) => {
                    if !snapshot.text.is_empty() {
                        continue;
                    }
                    page.set_value(&field, value).await
                }
                FillAction::Check => page.check(&field).await,
                FillAction::SelectFirstOption => page.select_first_option(&field).await,
            };

            match result {
                Ok(()) => filled += 1,
                Err(e) => tracing::debug!(field_type = %input_type, error = %e, "could not fill field"),
            }
        }

        Ok(filled)
    }

    /// Clicks the submit control if there is one, else submits directly
    async fn submit(&self, page: &dyn Page, form: &ElementHandle) -> BrowserResult<()> {
        if let Some(control) = page.query_within(form, SUBMIT_SELECTOR).await?.first() {
            if page.click(control, self.settings.click_timeout).await.is_ok() {
                return Ok(());
            }
            if page.dispatch_click(control).await.is_ok() {
                return Ok(());
            }
        }
        page.submit_form(form).await
    }
}

/// Waits for an XHR/fetch response (AJAX forms) or a navigation
/// (traditional forms); a timeout just reports nothing was seen
async fn wait_for_submission(events: &mut broadcast::Receiver<PageEvent>, ajax: bool, wait: Duration) -> bool {
    let observed = async {
        loop {
            match events.recv().await {
                Ok(PageEvent::Response { resource_type, .. }) if ajax && resource_type.is_ajax() => {
                    return true
                }
                Ok(PageEvent::Navigated { .. }) if !ajax => return true,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return false,
            }
        }
    };

    tokio::time::timeout(wait, observed).await.unwrap_or(false)
}
