//! Crawl state module
//!
//! # Components
//!
//! - `InteractionTracker`: the interaction ledger (forms, elements, pages
//!   already acted upon)
//! - `FormTracker`: the form half of the ledger
//! - `DomainState`: per-host admission/visit counters and request timing

mod domain_state;
mod tracker;

pub use domain_state::DomainState;
pub use tracker::{FormTracker, InteractionTracker};
