//! Interaction ledger
//!
//! Append-only dedup sets answering "have we already acted on this?" for
//! forms, elements and pages. Nothing is ever removed for the lifetime of a
//! crawl. The ledger is an owned value threaded through every component
//! call, so independent crawls in one process never share state.

use crate::url::strip_query_and_fragment;
use std::collections::HashSet;

/// Dedup record of submitted forms
///
/// A form is identified by `url#formId`. Because the same form template
/// (a search box, a newsletter signup) usually repeats on many pages, a form
/// identifier seen on any URL counts as interacted everywhere.
#[derive(Debug, Default, Clone)]
pub struct FormTracker {
    by_page: HashSet<String>,
    identifiers: HashSet<String>,
}

impl FormTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_interacted_form(&mut self, form_id: &str, url: &str) {
        self.by_page.insert(form_key(form_id, url));
        self.identifiers.insert(form_id.to_string());
    }

    pub fn has_form_been_interacted(&self, form_id: &str, url: &str) -> bool {
        self.by_page.contains(&form_key(form_id, url)) || self.identifiers.contains(form_id)
    }

    /// Number of distinct `(url, form)` pairs recorded
    pub fn len(&self) -> usize {
        self.by_page.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_page.is_empty()
    }
}

fn form_key(form_id: &str, url: &str) -> String {
    format!("{}#{}", url, form_id)
}

/// Dedup ledger for forms, elements and dynamically explored pages
#[derive(Debug, Default, Clone)]
pub struct InteractionTracker {
    forms: FormTracker,
    elements: HashSet<String>,
    visited_urls: HashSet<String>,
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_interacted_form(&mut self, form_id: &str, url: &str) {
        self.forms.add_interacted_form(form_id, url);
    }

    /// True for the exact `(url, form_id)` pair or the same id on any page
    pub fn has_form_been_interacted(&self, form_id: &str, url: &str) -> bool {
        self.forms.has_form_been_interacted(form_id, url)
    }

    pub fn add_interacted_element(&mut self, key: &str) {
        self.elements.insert(key.to_string());
    }

    pub fn has_element_been_interacted(&self, key: &str) -> bool {
        self.elements.contains(key)
    }

    /// Records that the dynamic-depth pass ran on this page
    ///
    /// Query and fragment are dropped, which is coarser than frontier
    /// normalization: `/list?page=2` counts as the same page here.
    pub fn add_visited_url(&mut self, url: &str) {
        self.visited_urls.insert(strip_query_and_fragment(url));
    }

    pub fn has_url_been_visited(&self, url: &str) -> bool {
        self.visited_urls.contains(&strip_query_and_fragment(url))
    }

    pub fn forms(&self) -> &FormTracker {
        &self.forms
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn visited_url_count(&self) -> usize {
        self.visited_urls.len()
    }
}
