use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for a crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// First URL loaded by the engine (depth 0)
    pub start_url: String,

    /// Host patterns (`example.com`, `*.example.com`) the crawl may visit
    pub allowed_domains: Vec<String>,

    /// Maximum page depth from the start URL
    pub max_depth: u32,

    /// Maximum number of pages admitted per host
    pub max_pages_per_domain: u32,

    /// Run the browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Global operation timeout (milliseconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Fallback bound on framework readiness checks (milliseconds)
    #[serde(default = "default_framework_timeout")]
    pub framework_timeout: u64,

    /// Base backoff between locate/click retries (milliseconds)
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Quiet period after the last XHR/fetch response (milliseconds)
    #[serde(default = "default_network_idle_time")]
    pub network_idle_time: u64,

    #[serde(default = "default_true")]
    pub ignore_hash_fragments: bool,

    #[serde(default)]
    pub ignore_query_params: bool,

    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,

    /// Minimum time between page loads on the same host (milliseconds)
    #[serde(default)]
    pub request_delay: u64,

    /// Upper bound on concurrent form submissions
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: u32,

    #[serde(default)]
    pub concurrency_mode: ConcurrencyMode,

    /// Directory receiving reports and screenshots
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default)]
    pub save_screenshots: bool,

    /// One of `debug`, `info`, `warn`, `error`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub interact_with_forms: bool,

    #[serde(default = "default_true")]
    pub interact_with_elements: bool,

    #[serde(default)]
    pub proxy: Option<ProxyConfig>,

    /// Ceiling on in-page exploration depth (revealed-by-revealed elements)
    #[serde(default = "default_max_dynamic_depth")]
    pub max_dynamic_depth: u32,

    /// Keep clicking query-bearing hrefs whose base path was already seen
    /// or which point out of scope
    #[serde(default = "default_true")]
    pub revisit_query_variants: bool,

    /// Explicit Chrome/Chromium executable
    #[serde(default)]
    pub browser_path: Option<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Proxy settings handed to the browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Proxy URL, e.g. `http://127.0.0.1:8080`
    pub server: String,

    #[serde(default, rename = "ignoreHTTPSErrors", alias = "ignoreHttpsErrors")]
    pub ignore_https_errors: bool,
}

/// How form submissions on one page are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// One submission at a time
    Sequential,
    /// Fixed-size concurrent batches
    #[default]
    Batched,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    pub fn framework_timeout(&self) -> Duration {
        Duration::from_millis(self.framework_timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }

    pub fn network_idle_time(&self) -> Duration {
        Duration::from_millis(self.network_idle_time)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay)
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30_000
}

fn default_framework_timeout() -> u64 {
    5_000
}

fn default_retry_delay() -> u64 {
    100
}

fn default_network_idle_time() -> u64 {
    300
}

fn default_max_concurrent_requests() -> u32 {
    3
}

fn default_output_dir() -> String {
    "./output".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_dynamic_depth() -> u32 {
    5
}

fn default_user_agent() -> String {
    format!("dyncrawl/{}", env!("CARGO_PKG_VERSION"))
}
