//! Integration tests for the crawler
//!
//! Pages are served by an in-memory fake browser (`common`). The end-to-end
//! crawl tests use wiremock for robots.txt.

mod crawl_tests;
mod dynamic_tests;
mod form_tests;
mod interaction_tests;
