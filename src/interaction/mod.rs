//! Element classification, interaction and dynamic-change detection
//!
//! # Components
//!
//! - `ElementFinder`: which elements count as interactive, and how to find
//!   them again
//! - `ElementInteractor`: one click with retries, observed for DOM, route
//!   and network changes
//! - `DynamicExplorer`: the depth-first work queue over revealed elements
//! - `ChangeObserver`: the dynamic-change detector

mod element;
mod explorer;
mod finder;
mod interactor;
mod observer;
mod result;

pub use element::{
    normalize_text, ClickableElement, ElementSelector, ElementType, InteractiveReason,
    SelectorStrategy, MAX_TEXT_LEN,
};
pub use explorer::{element_ledger_key, DynamicExplorer};
pub use finder::{
    classify, derive_strategy, interactive_reasons, is_candidate, ElementFinder,
    CANDIDATE_SELECTORS, INTERACTIVE_ROLES, TEST_ID_ATTRIBUTES,
};
pub use interactor::{ElementInteractor, InteractorSettings, PageContext};
pub use observer::{wait_for_framework, ChangeObserver, Observation, ObserverSettings, BINDING_NAME};
pub use result::{
    AjaxResponse, AjaxTiming, Discovery, ElementOutcome, InteractionResult,
};
