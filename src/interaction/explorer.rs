//! Dynamic-depth driver
//!
//! Elements on the loaded page seed a work queue. Elements an interaction
//! reveals go to the front of the queue, so fresh dynamic content is
//! explored before its siblings. Termination comes from the identity sets
//! and the page-scoped ledger, with `max_dynamic_depth` as a hard ceiling.

use crate::interaction::element::ClickableElement;
use crate::interaction::interactor::{ElementInteractor, PageContext};
use crate::interaction::result::ElementOutcome;
use std::collections::{HashSet, VecDeque};

/// Runs every interaction of one page pass, strictly one at a time
#[derive(Debug, Clone, Copy)]
pub struct DynamicExplorer {
    max_dynamic_depth: u32,
}

impl DynamicExplorer {
    pub fn new(max_dynamic_depth: u32) -> Self {
        Self { max_dynamic_depth }
    }

    pub async fn explore(
        &self,
        interactor: &ElementInteractor,
        ctx: &mut PageContext<'_>,
        initial: Vec<ClickableElement>,
    ) -> Vec<ElementOutcome> {
        let mut queue: VecDeque<(ClickableElement, u32)> = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut processed: HashSet<String> = HashSet::new();
        let mut outcomes = Vec::new();

        for element in initial {
            if seen.insert(element.identity_key()) {
                queue.push_back((element, 0));
            }
        }

        while let Some((element, dynamic_depth)) = queue.pop_front() {
            let key = element.identity_key();
            if !processed.insert(key.clone()) {
                continue;
            }

            let ledger_key = element_ledger_key(&ctx.url, &key);
            if ctx.ledger.has_element_been_interacted(&ledger_key) {
                tracing::trace!(element = %element.selector, "element already interacted");
                continue;
            }
            ctx.ledger.add_interacted_element(&ledger_key);

            let result = interactor.interact(ctx, &element, &seen).await;

            let revealed: Vec<ClickableElement> = result
                .new_elements()
                .iter()
                .filter(|el| {
                    let k = el.identity_key();
                    !seen.contains(&k) && !processed.contains(&k)
                })
                .cloned()
                .collect();

            if !revealed.is_empty() {
                if dynamic_depth < self.max_dynamic_depth {
                    for el in revealed.into_iter().rev() {
                        seen.insert(el.identity_key());
                        queue.push_front((el, dynamic_depth + 1));
                    }
                } else {
                    tracing::debug!(
                        url = %ctx.url,
                        dynamic_depth,
                        dropped = revealed.len(),
                        "dynamic depth ceiling reached"
                    );
                }
            }

            tracing::debug!(
                element = %element.selector,
                dynamic_depth,
                outcome = result.label(),
                "interaction finished"
            );

            outcomes.push(ElementOutcome {
                identity_key: key,
                selector: element.selector.to_string(),
                text: element.text.clone(),
                dynamic_depth,
                result,
            });
        }

        outcomes
    }
}

/// Element identities are only meaningful on the page they were found on
pub fn element_ledger_key(url: &str, identity_key: &str) -> String {
    format!("{}|{}", url, identity_key)
}
