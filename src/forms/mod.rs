//! Form executor
//!
//! # Components
//!
//! - `FormHandler`: discovers forms, fills them and submits them in
//!   isolated pages, in bounded concurrent batches
//! - `fill`: synthetic values by field type
//! - `types`: form descriptors and per-form results

mod fill;
mod handler;
mod types;

pub use fill::{fill_action, FillAction};
pub use handler::{FormHandler, FormSettings, FIELD_SELECTOR, MAX_BATCH_SIZE, SUBMIT_SELECTOR};
pub use types::{
    form_identifier, is_ajax_form, FormDescriptor, FormField, FormInteractionResult, FormOutcome,
};
