use crate::interaction::element::ClickableElement;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Start and end of an XHR/fetch exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AjaxTiming {
    pub started: DateTime<Utc>,
    pub completed: DateTime<Utc>,
    pub duration_ms: i64,
}

impl AjaxTiming {
    pub fn new(started: DateTime<Utc>, completed: DateTime<Utc>) -> Self {
        Self {
            started,
            completed,
            duration_ms: (completed - started).num_milliseconds(),
        }
    }
}

/// An XHR/fetch response observed after an interaction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AjaxResponse {
    pub url: String,
    /// `None` when the request failed before a response arrived
    pub status: Option<u16>,
    pub content: Option<String>,
    pub timing: AjaxTiming,
    #[serde(skip)]
    pub request_id: String,
}

/// Outcome of one element interaction
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome")]
pub enum InteractionResult {
    #[serde(rename_all = "camelCase")]
    Success {
        dynamic_changes_detected: bool,
        new_elements_found: Vec<ClickableElement>,
        ajax_responses: Vec<AjaxResponse>,
    },
    #[serde(rename_all = "camelCase")]
    SuccessWithNavigation {
        new_url: String,
        skipped_due_to_scope: bool,
        returned_to_previous_page: bool,
    },
    SkippedDueToScope {
        reason: String,
    },
    Failure {
        reason: String,
    },
}

impl InteractionResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::SkippedDueToScope {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Success { .. } | Self::SuccessWithNavigation { .. }
        )
    }

    pub fn dynamic_changes_detected(&self) -> bool {
        matches!(
            self,
            Self::Success {
                dynamic_changes_detected: true,
                ..
            }
        )
    }

    /// Elements revealed by the interaction (empty for non-`Success`)
    pub fn new_elements(&self) -> &[ClickableElement] {
        match self {
            Self::Success {
                new_elements_found, ..
            } => new_elements_found,
            _ => &[],
        }
    }

    pub fn ajax_responses(&self) -> &[AjaxResponse] {
        match self {
            Self::Success { ajax_responses, .. } => ajax_responses,
            _ => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::SuccessWithNavigation { .. } => "success_with_navigation",
            Self::SkippedDueToScope { .. } => "skipped_due_to_scope",
            Self::Failure { .. } => "failure",
        }
    }
}

/// A navigation found mid-interaction, to be added to the frontier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub url: String,
    pub depth: u32,
}

/// One element processed by the dynamic-depth pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementOutcome {
    pub identity_key: String,
    pub selector: String,
    pub text: String,
    /// 0 for elements present on load, +1 per reveal
    pub dynamic_depth: u32,
    pub result: InteractionResult,
}
