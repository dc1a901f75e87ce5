//! Per-host robots.txt cache with 24 hour expiry

use crate::robots::{fetch_robots, RobotsPolicy};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::collections::HashMap;
use url::Url;

/// A robots.txt policy and when it was fetched
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub policy: RobotsPolicy,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(policy: RobotsPolicy) -> Self {
        Self {
            policy,
            fetched_at: Utc::now(),
        }
    }

    /// Older than 24 hours
    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(24)
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}

/// Fetches robots.txt once per origin and keeps it until stale
#[derive(Debug)]
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    entries: HashMap<String, CachedRobots>,
}

impl RobotsCache {
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            entries: HashMap::new(),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Policy for the URL's origin, fetching it when missing or stale
    pub async fn policy_for(&mut self, url: &Url) -> &RobotsPolicy {
        let origin = url.origin().ascii_serialization();

        let needs_fetch = self.entries.get(&origin).map_or(true, CachedRobots::is_stale);
        if needs_fetch {
            tracing::debug!(origin = %origin, "fetching robots.txt");
            let policy = fetch_robots(&self.client, &origin).await;
            self.entries.insert(origin.clone(), CachedRobots::new(policy));
        }

        &self
            .entries
            .entry(origin)
            .or_insert_with(|| CachedRobots::new(RobotsPolicy::allow_all()))
            .policy
    }

    /// Checks the URL against its origin's robots.txt
    pub async fn is_allowed(&mut self, url: &Url) -> bool {
        let agent = self.user_agent.clone();
        self.policy_for(url).await.is_allowed(url.as_str(), &agent)
    }

    /// `Crawl-delay` for the URL's origin
    pub async fn crawl_delay(&mut self, url: &Url) -> Option<std::time::Duration> {
        let agent = self.user_agent.clone();
        self.policy_for(url).await.crawl_delay(&agent)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
