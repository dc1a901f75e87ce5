//! URL frontier
//!
//! This module handles:
//! - Canonicalizing and deduplicating discovered URLs
//! - Enforcing the page-depth limit
//! - Enforcing the allowed-domain scope
//! - Enforcing the per-domain page cap
//!
//! A URL is in at most one of {queued, visited}. Every admission check and
//! its bookkeeping happen inside one synchronous call, so they can never be
//! split across an await point.

use crate::state::DomainState;
use crate::url::{extract_domain, normalize_url, NormalizeOptions, Scope};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use url::Url;

/// Limits applied on admission
#[derive(Debug, Clone)]
pub struct FrontierConfig {
    pub max_depth: u32,
    pub max_pages_per_domain: u32,
    pub normalize: NormalizeOptions,
}

impl From<&crate::config::Config> for FrontierConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            max_depth: config.max_depth,
            max_pages_per_domain: config.max_pages_per_domain,
            normalize: NormalizeOptions {
                ignore_query: config.ignore_query_params,
                ignore_fragment: config.ignore_hash_fragments,
            },
        }
    }
}

/// A URL waiting to be loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: String,

    /// Minimum depth at which the URL was observed
    pub depth: u32,
}

/// The crawl frontier: pending and visited URLs
#[derive(Debug)]
pub struct UrlQueue {
    config: FrontierConfig,
    scope: Scope,
    pending: VecDeque<String>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    /// `(host, path)` of every visited URL, query ignored
    visited_paths: HashSet<(String, String)>,
    depths: HashMap<String, u32>,
    domain_states: HashMap<String, DomainState>,
}

impl UrlQueue {
    pub fn new(config: FrontierConfig, scope: Scope) -> Self {
        Self {
            config,
            scope,
            pending: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            visited_paths: HashSet::new(),
            depths: HashMap::new(),
            domain_states: HashMap::new(),
        }
    }

    /// Normalizes a URL with this frontier's options
    pub fn normalize(&self, url: &str) -> String {
        normalize_url(url, &self.config.normalize)
    }

    /// Admits a URL if it is new, shallow enough, in scope, on an unvisited
    /// path and its host still has capacity
    ///
    /// Returns whether the URL was admitted. Malformed URLs are never
    /// admitted.
    pub fn add(&mut self, url: &str, depth: u32) -> bool {
        let normalized = self.normalize(url);

        if self.visited.contains(&normalized) {
            return false;
        }

        if self.queued.contains(&normalized) {
            if let Some(known) = self.depths.get_mut(&normalized) {
                *known = (*known).min(depth);
            }
            return false;
        }

        if depth > self.config.max_depth {
            tracing::trace!(url = %normalized, depth, "rejected: depth limit");
            return false;
        }

        let parsed = match Url::parse(&normalized) {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::trace!(url = %url, "rejected: malformed URL");
                return false;
            }
        };

        if !self.scope.allows(&parsed) {
            tracing::trace!(url = %normalized, "rejected: out of scope");
            return false;
        }

        let Some(host) = extract_domain(&parsed) else {
            return false;
        };

        if self
            .visited_paths
            .contains(&(host.clone(), parsed.path().to_string()))
        {
            tracing::trace!(url = %normalized, "rejected: path already visited");
            return false;
        }

        let state = self.domain_states.entry(host).or_default();
        if !state.has_capacity(self.config.max_pages_per_domain) {
            tracing::trace!(url = %normalized, "rejected: domain page cap");
            return false;
        }
        state.record_admission();

        self.queued.insert(normalized.clone());
        self.depths.insert(normalized.clone(), depth);
        self.pending.push_back(normalized);

        true
    }

    /// Removes the next URL and marks it visited
    pub fn next(&mut self) -> Option<String> {
        let url = self.pending.pop_front()?;
        self.queued.remove(&url);
        self.visited.insert(url.clone());

        if let Ok(parsed) = Url::parse(&url) {
            if let Some(host) = extract_domain(&parsed) {
                self.visited_paths
                    .insert((host.clone(), parsed.path().to_string()));
                self.domain_states.entry(host).or_default().record_visit();
            }
        }

        Some(url)
    }

    /// Like [`UrlQueue::next`] but returns the entry with its depth
    pub fn next_entry(&mut self) -> Option<FrontierEntry> {
        let url = self.next()?;
        let depth = self.get_current_depth(&url);
        Some(FrontierEntry { url, depth })
    }

    pub fn has_been_visited(&self, url: &str) -> bool {
        self.visited.contains(&self.normalize(url))
    }

    pub fn is_queued(&self, url: &str) -> bool {
        self.queued.contains(&self.normalize(url))
    }

    /// Depth at which the URL was first observed, 0 if unknown
    pub fn get_current_depth(&self, url: &str) -> u32 {
        self.depths.get(&self.normalize(url)).copied().unwrap_or(0)
    }

    /// Returns true if the URL's host is in the allowed set
    pub fn is_in_scope(&self, url: &str) -> bool {
        self.scope.allows_str(url)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn max_depth(&self) -> u32 {
        self.config.max_depth
    }

    /// Records a page load on the URL's host
    pub fn record_request(&mut self, url: &str, now: Instant) {
        if let Some(host) = Url::parse(url).ok().as_ref().and_then(extract_domain) {
            self.domain_states.entry(host).or_default().record_request(now);
        }
    }

    /// Time to wait before loading `url` so that `min_delay` separates loads
    /// on the same host
    pub fn wait_before_request(&self, url: &str, min_delay: Duration, now: Instant) -> Option<Duration> {
        let host = Url::parse(url).ok().as_ref().and_then(extract_domain)?;
        self.domain_states
            .get(&host)?
            .time_until_next_request(min_delay, now)
    }

    pub fn domain_state(&self, host: &str) -> Option<&DomainState> {
        self.domain_states.get(host)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
