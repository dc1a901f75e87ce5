//! Configuration module
//!
//! This module handles loading, parsing, and validating crawl configuration
//! files. JSON is the default format; files with a `.toml` extension are
//! parsed as TOML.
//!
//! # Example
//!
//! ```no_run
//! use dyncrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.json")).unwrap();
//! println!("Crawler will use max depth: {}", config.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{ConcurrencyMode, Config, ProxyConfig};

pub use parser::{
    compute_config_hash, hash_config, load_config, load_config_with_hash, load_default_config,
    parse_config, ConfigFormat, DEFAULT_CONFIG,
};
pub use validation::{validate, LOG_LEVELS};
