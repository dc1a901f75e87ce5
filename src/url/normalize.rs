use url::Url;

/// File names that a server resolves to when a directory is requested
const DEFAULT_DOCUMENT_STEMS: &[&str] = &["index", "default"];

/// Extensions a default document may carry
const DEFAULT_DOCUMENT_EXTENSIONS: &[&str] = &["php", "html", "htm", "asp", "aspx"];

/// Options controlling which URL components survive normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Drop the query string entirely
    pub ignore_query: bool,

    /// Drop the fragment
    pub ignore_fragment: bool,
}

/// Normalizes a URL for frontier deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; a URL that fails to parse is returned unchanged
/// 2. Lowercase the host
/// 3. Collapse repeated path separators
/// 4. Strip trailing separators and default documents (`index.php`,
///    `default.aspx`, ...) until neither is left
/// 5. Drop the query string, or sort its parameters by key
/// 6. Drop the fragment when configured
/// 7. Strip the root separator when nothing follows it
///
/// # Examples
///
/// ```
/// use dyncrawl::url::{normalize_url, NormalizeOptions};
///
/// let options = NormalizeOptions::default();
/// assert_eq!(
///     normalize_url("http://EXAMPLE.com/dir/index.php?b=2&a=1", &options),
///     "http://example.com/dir?a=1&b=2"
/// );
/// ```
pub fn normalize_url(raw: &str, options: &NormalizeOptions) -> String {
    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return raw.to_string(),
    };

    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host && url.set_host(Some(&lowered)).is_err() {
            return raw.to_string();
        }
    }

    if !url.cannot_be_a_base() {
        let path = normalize_path(url.path());
        url.set_path(&path);
    }

    if options.ignore_query {
        url.set_query(None);
    } else if url.query().is_some() {
        let params = sorted_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    if options.ignore_fragment {
        url.set_fragment(None);
    }

    // A kept fragment is opaque; its slashes are not separators
    let bare = url.query().is_none() && url.fragment().is_none();
    let serialized = String::from(url);
    match serialized.strip_suffix('/') {
        Some(stripped) if bare => stripped.to_string(),
        _ => serialized,
    }
}

/// Collapses separators and removes trailing slash and default documents
fn normalize_path(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut previous_was_separator = false;
    for ch in path.chars() {
        if ch == '/' {
            if previous_was_separator {
                continue;
            }
            previous_was_separator = true;
        } else {
            previous_was_separator = false;
        }
        collapsed.push(ch);
    }

    // "/a/index.php/index.php/" only settles after repeated passes
    loop {
        if collapsed.len() > 1 && collapsed.ends_with('/') {
            collapsed.pop();
            continue;
        }
        match collapsed.rfind('/') {
            Some(idx) if is_default_document(&collapsed[idx + 1..]) => collapsed.truncate(idx + 1),
            _ => return collapsed,
        }
    }
}

/// Checks whether a path segment is a default document such as `index.html`
fn is_default_document(segment: &str) -> bool {
    let Some((stem, extension)) = segment.rsplit_once('.') else {
        return false;
    };

    let stem = stem.to_ascii_lowercase();
    let extension = extension.to_ascii_lowercase();

    DEFAULT_DOCUMENT_STEMS.contains(&stem.as_str())
        && DEFAULT_DOCUMENT_EXTENSIONS.contains(&extension.as_str())
}

/// Returns the query parameters sorted by key (stable for equal keys)
fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}
