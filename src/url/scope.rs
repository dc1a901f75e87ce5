use url::Url;

/// The set of hosts a crawl is allowed to touch
///
/// Patterns are either an exact host (`example.com`) or a wildcard
/// (`*.example.com`) that covers the bare domain and every subdomain.
/// Matching ignores case and port.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    patterns: Vec<String>,
}

impl Scope {
    /// Builds a scope from allowed-domain patterns
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Returns true if the host matches any allowed pattern
    pub fn allows_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.patterns.iter().any(|pattern| pattern_matches(pattern, &host))
    }

    /// Returns true if the URL is http(s) and its host is allowed
    pub fn allows(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        url.host_str().is_some_and(|host| self.allows_host(host))
    }

    /// Parses and checks a raw URL; unparseable URLs are out of scope
    pub fn allows_str(&self, raw: &str) -> bool {
        Url::parse(raw).map(|url| self.allows(&url)).unwrap_or(false)
    }

    /// The configured patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

fn pattern_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => host == pattern,
    }
}
