use crate::browser::ElementSnapshot;
use serde::Serialize;

/// `onsubmit` fragments that mark a script-handled submission
const AJAX_ONSUBMIT_MARKERS: &[&str] = &[
    "preventdefault",
    "return false",
    "fetch",
    "ajax",
    "xmlhttprequest",
];

/// Attributes that mark a remote/async form
const AJAX_FORM_ATTRIBUTES: &[&str] = &["data-remote", "data-ajax", "hx-post", "hx-get", "data-async"];

/// A form control as discovered (fill values are policy, not state)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    #[serde(rename = "type")]
    pub field_type: String,
    pub name: Option<String>,
    pub required: bool,
    pub placeholder: Option<String>,
}

impl FormField {
    pub fn from_snapshot(snapshot: &ElementSnapshot) -> Self {
        let field_type = match snapshot.tag.as_str() {
            "input" => snapshot
                .attr("type")
                .filter(|t| !t.is_empty())
                .unwrap_or("text")
                .to_ascii_lowercase(),
            other => other.to_string(),
        };

        Self {
            field_type,
            name: snapshot.attr("name").map(str::to_string),
            required: snapshot.has_attr("required"),
            placeholder: snapshot.attr("placeholder").map(str::to_string),
        }
    }
}

/// A form found on the live page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDescriptor {
    /// `id`, else `name`, else `<unnamed_form_{method}_{action}>`
    pub identifier: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub action: String,
    /// Lowercase, `get` when absent
    pub method: String,
    pub fields: Vec<FormField>,
    /// Position among the page's forms
    pub index: usize,
    pub ajax: bool,
}

impl FormDescriptor {
    pub fn from_snapshot(snapshot: &ElementSnapshot, index: usize, fields: Vec<FormField>) -> Self {
        let id = non_empty(snapshot.attr("id"));
        let name = non_empty(snapshot.attr("name"));
        let action = snapshot.attr("action").unwrap_or_default().to_string();
        let method = snapshot
            .attr("method")
            .filter(|m| !m.is_empty())
            .unwrap_or("get")
            .to_ascii_lowercase();

        Self {
            identifier: form_identifier(id.as_deref(), name.as_deref(), &method, &action),
            id,
            name,
            action,
            method,
            fields,
            index,
            ajax: is_ajax_form(snapshot),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Stable form identity, also for anonymous forms
pub fn form_identifier(id: Option<&str>, name: Option<&str>, method: &str, action: &str) -> String {
    match (id, name) {
        (Some(id), _) => id.to_string(),
        (None, Some(name)) => name.to_string(),
        (None, None) => format!("<unnamed_form_{}_{}>", method, action),
    }
}

/// Detects script-handled or remote forms
pub fn is_ajax_form(snapshot: &ElementSnapshot) -> bool {
    if let Some(onsubmit) = snapshot.attr("onsubmit") {
        let onsubmit = onsubmit.to_ascii_lowercase();
        if AJAX_ONSUBMIT_MARKERS.iter().any(|m| onsubmit.contains(m)) {
            return true;
        }
    }
    AJAX_FORM_ATTRIBUTES.iter().any(|a| snapshot.has_attr(a))
}

/// What happened to one form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FormOutcome {
    #[serde(rename_all = "camelCase")]
    Submitted {
        ajax: bool,
        fields_filled: usize,
        /// A matching response/navigation arrived before the wait expired
        response_observed: bool,
        final_url: String,
    },
    Skipped {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

/// Per-form report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInteractionResult {
    pub form_id: String,
    pub url: String,
    pub outcome: FormOutcome,
}

impl FormInteractionResult {
    pub fn skipped(form_id: impl Into<String>, url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            url: url.into(),
            outcome: FormOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.outcome, FormOutcome::Submitted { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, FormOutcome::Skipped { .. })
    }
}
