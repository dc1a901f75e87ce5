//! Dynamic-change detection around a single interaction
//!
//! Attach before clicking, settle afterwards. Signals come from two places:
//! network events reported by the page, and messages the in-page observer
//! script posts through [`BINDING_NAME`] tagged with the crawl-session token.

use crate::browser::{Page, PageEvent};
use crate::interaction::result::{AjaxResponse, AjaxTiming};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;

/// Binding the observer script reports through
pub const BINDING_NAME: &str = "__dyncrawlNotify";

/// Interval between framework-readiness polls
const FRAMEWORK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest response body kept on an [`AjaxResponse`]
const MAX_CONTENT_LEN: usize = 4096;

/// Timing bounds for one observation
#[derive(Debug, Clone, Copy)]
pub struct ObserverSettings {
    /// Quiet period after the last XHR/fetch activity
    pub network_idle: Duration,
    /// Hard cap on the network wait
    pub global_timeout: Duration,
    /// Cap on the framework-readiness wait
    pub framework_timeout: Duration,
}

/// What an interaction caused
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub dom_changed: bool,
    /// History API, popstate, hash change or main-frame navigation
    pub route_changed: bool,
    /// Any XHR/fetch was started
    pub network_activity: bool,
    pub ajax_responses: Vec<AjaxResponse>,
}

impl Observation {
    pub fn any(&self) -> bool {
        self.dom_changed
            || self.route_changed
            || self.network_activity
            || !self.ajax_responses.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct ObserverMessage {
    token: String,
    kind: String,
}

struct PendingRequest {
    url: String,
    started: DateTime<Utc>,
}

/// Collects signals for one interaction
pub struct ChangeObserver {
    events: broadcast::Receiver<PageEvent>,
    token: String,
    settings: ObserverSettings,
    observation: Observation,
    pending: HashMap<String, PendingRequest>,
    in_flight: HashSet<String>,
    answered: HashSet<String>,
}

impl ChangeObserver {
    /// Subscribes to page events and installs the in-page observer
    ///
    /// If the script cannot be installed, network signals are still
    /// collected.
    pub async fn attach(page: &dyn Page, token: &str, settings: ObserverSettings) -> Self {
        let events = page.events();

        if let Err(e) = page.install_observer(BINDING_NAME, token).await {
            tracing::debug!(error = %e, "observer script not installed; DOM signals unavailable");
        }

        Self {
            events,
            token: token.to_string(),
            settings,
            observation: Observation::default(),
            pending: HashMap::new(),
            in_flight: HashSet::new(),
            answered: HashSet::new(),
        }
    }

    /// Waits for the network to go idle, then for framework readiness
    ///
    /// The idle window restarts on every XHR/fetch event and keeps
    /// extending while requests are in flight, up to the global timeout.
    /// Timeouts end the wait; they are never errors.
    pub async fn settle(mut self, page: &dyn Page) -> Observation {
        let deadline = Instant::now() + self.settings.global_timeout;
        let mut idle_deadline = Instant::now() + self.settings.network_idle;

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!("observation hit the global timeout");
                break;
            }

            let wait_until = idle_deadline.min(deadline);
            match tokio::time::timeout_at(wait_until, self.events.recv()).await {
                Err(_) => {
                    if self.in_flight.is_empty() {
                        break;
                    }
                    idle_deadline = Instant::now() + self.settings.network_idle;
                }
                Ok(Ok(event)) => {
                    if self.record(event) {
                        idle_deadline = Instant::now() + self.settings.network_idle;
                    }
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    tracing::debug!(skipped, "observer lagged behind page events");
                }
                Ok(Err(RecvError::Closed)) => break,
            }
        }

        // Signals already queued when the wait ended still count
        while let Ok(event) = self.events.try_recv() {
            self.record(event);
        }

        for response in &mut self.observation.ajax_responses {
            if response.status.is_none() {
                continue;
            }
            if let Ok(Some(body)) = page.response_body(&response.request_id).await {
                response.content = Some(truncate(body));
            }
        }

        wait_for_framework(page, self.settings.framework_timeout).await;

        self.observation
    }

    /// Folds one event in; returns true for XHR/fetch activity
    fn record(&mut self, event: PageEvent) -> bool {
        match event {
            PageEvent::Request {
                request_id,
                url,
                resource_type,
                timestamp,
            } if resource_type.is_ajax() => {
                self.observation.network_activity = true;
                self.in_flight.insert(request_id.clone());
                self.pending.insert(
                    request_id,
                    PendingRequest {
                        url,
                        started: timestamp,
                    },
                );
                true
            }
            PageEvent::Response {
                request_id,
                url,
                status,
                resource_type,
            } if resource_type.is_ajax() => {
                let started = self
                    .pending
                    .get(&request_id)
                    .map(|p| p.started)
                    .unwrap_or_else(Utc::now);
                self.answered.insert(request_id.clone());
                self.observation.ajax_responses.push(AjaxResponse {
                    url,
                    status: Some(status),
                    content: None,
                    timing: AjaxTiming::new(started, Utc::now()),
                    request_id,
                });
                true
            }
            PageEvent::RequestFinished { request_id, failed } => {
                let tracked = self.in_flight.remove(&request_id);
                if failed && !self.answered.contains(&request_id) {
                    if let Some(pending) = self.pending.get(&request_id) {
                        self.observation.ajax_responses.push(AjaxResponse {
                            url: pending.url.clone(),
                            status: None,
                            content: None,
                            timing: AjaxTiming::new(pending.started, Utc::now()),
                            request_id,
                        });
                    }
                }
                tracked
            }
            PageEvent::Binding { name, payload } if name == BINDING_NAME => {
                match serde_json::from_str::<ObserverMessage>(&payload) {
                    Ok(message) if message.token == self.token => match message.kind.as_str() {
                        "mutation" => self.observation.dom_changed = true,
                        "route" => self.observation.route_changed = true,
                        "network" => self.observation.network_activity = true,
                        other => tracing::trace!(kind = other, "unknown observer message"),
                    },
                    Ok(_) => tracing::trace!("observer message from another session"),
                    Err(e) => tracing::trace!(error = %e, "malformed observer message"),
                }
                false
            }
            PageEvent::Navigated { .. } => {
                self.observation.route_changed = true;
                false
            }
            _ => false,
        }
    }
}

/// Polls framework readiness until it reports ready or `timeout` passes
///
/// Returns whether the page reported ready.
pub async fn wait_for_framework(page: &dyn Page, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match page.framework_ready().await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => {
                tracing::trace!(error = %e, "framework readiness check failed");
                return false;
            }
        }
        if Instant::now() + FRAMEWORK_POLL_INTERVAL > deadline {
            tracing::debug!(?timeout, "framework not ready, continuing anyway");
            return false;
        }
        tokio::time::sleep(FRAMEWORK_POLL_INTERVAL).await;
    }
}

fn truncate(body: String) -> String {
    match body.char_indices().nth(MAX_CONTENT_LEN) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body,
    }
}
