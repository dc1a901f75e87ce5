//! robots.txt evaluation
//!
//! Allow/disallow matching is delegated to the `robotstxt` crate. The
//! non-standard `Crawl-delay` directive is read here, per user-agent group.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Rules from one host's robots.txt
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    /// `None` when the file was missing or unreadable: everything is allowed
    content: Option<String>,
}

impl RobotsPolicy {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    pub fn allow_all() -> Self {
        Self { content: None }
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Checks a full URL against the rules for `user_agent`
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self.content.as_deref() {
            None => true,
            Some(content) if content.trim().is_empty() => true,
            Some(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, product_token(user_agent), url)
            }
        }
    }

    /// `Crawl-delay` of the group naming this agent, else of the `*` group
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let content = self.content.as_deref()?;
        let agent = product_token(user_agent).to_ascii_lowercase();

        let mut group_agents: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    group_agents.push(value.to_ascii_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Some(delay) = parse_delay(value) else {
                        continue;
                    };
                    if group_agents.iter().any(|ua| ua == &agent) {
                        specific = Some(delay);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        specific.or(wildcard)
    }
}

fn parse_delay(value: &str) -> Option<Duration> {
    let seconds: f64 = value.parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}

/// `dyncrawl/1.0 (+https://...)` matches robots.txt groups as `dyncrawl`
pub fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or(user_agent)
}
