use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the lowercase host from a URL
///
/// ```
/// use url::Url;
/// use dyncrawl::url::extract_domain;
///
/// let url = Url::parse("https://Sub.Example.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Resolves an href against the page it was found on
///
/// Only http(s) targets are returned; `mailto:`, `tel:`, `javascript:`
/// and friends are rejected with `InvalidScheme`.
pub fn resolve_href(base: &str, href: &str) -> UrlResult<Url> {
    let base = Url::parse(base).map_err(|e| UrlError::Parse(e.to_string()))?;
    let resolved = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    match resolved.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if resolved.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(resolved)
}

/// Drops query string and fragment, keeping everything else verbatim
///
/// Unparseable input is cut at the first `?` or `#`.
pub fn strip_query_and_fragment(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.into()
        }
        Err(_) => raw
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Returns true if the URL carries a non-empty query string
pub fn has_query(url: &Url) -> bool {
    url.query().is_some_and(|q| !q.is_empty())
}
