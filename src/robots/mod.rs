//! robots.txt fetching, caching and evaluation
//!
//! A robots.txt that cannot be fetched, or answers anything but 2xx, allows
//! everything. Fetch problems are logged, never propagated.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::{product_token, RobotsPolicy};

use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Builds the HTTP client used for robots.txt
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(5))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches `{origin}/robots.txt`
pub async fn fetch_robots(client: &Client, origin: &str) -> RobotsPolicy {
    let url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "robots.txt unreachable, allowing all");
            return RobotsPolicy::allow_all();
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::debug!(url = %url, status = status.as_u16(), "no robots.txt, allowing all");
        return RobotsPolicy::allow_all();
    }

    match response.text().await {
        Ok(body) => RobotsPolicy::from_content(&body),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "failed to read robots.txt body");
            RobotsPolicy::allow_all()
        }
    }
}
