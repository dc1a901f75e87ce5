//! URL handling module
//!
//! This module provides URL normalization for frontier deduplication,
//! domain extraction, href resolution and the allowed-domain scope.

mod domain;
mod normalize;
mod scope;

pub use domain::{extract_domain, has_query, resolve_href, strip_query_and_fragment};
pub use normalize::{normalize_url, NormalizeOptions};
pub use scope::Scope;
