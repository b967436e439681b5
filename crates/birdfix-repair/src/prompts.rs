#![forbid(unsafe_code)]

//! Unused prompt removal.

use crate::pipeline::{PassOutcome, RepairPass};
use birdfix_core::{Error, Phase, RepairConfig};
use birdfix_xml::{Document, ElementPath};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Removes every element declaring one of a fixed set of prompt ids.
///
/// The set is computed before any repair runs; earlier passes may change
/// what is referenced but not which prompts were reported unused.
pub struct UnusedPromptPass {
    ids: BTreeSet<String>,
}

impl UnusedPromptPass {
    pub fn new(ids: BTreeSet<String>) -> Self {
        Self { ids }
    }
}

impl RepairPass for UnusedPromptPass {
    fn phase(&self) -> Phase {
        Phase::UnusedPrompts
    }

    fn apply(&self, doc: &mut Document, config: &RepairConfig) -> Result<PassOutcome, Error> {
        let identity = config.identity_attribute.as_str();
        let mut doomed: Vec<ElementPath> = doc
            .elements()
            .filter(|(_, element)| {
                element
                    .attribute(identity)
                    .is_some_and(|name| self.ids.contains(name))
            })
            .map(|(path, _)| path)
            .collect();

        // The root has no parent to detach it from.
        if doomed.first().is_some_and(ElementPath::is_root) {
            warn!(tag = doc.root().tag(), "unused prompt is the root element, left in place");
            doomed.remove(0);
        }

        // Deepest and rightmost first, so earlier paths stay valid.
        doomed.sort_unstable_by(|a, b| b.cmp(a));

        let mut removed = 0;
        for path in &doomed {
            let element = doc.remove_element(path)?;
            debug!(path = %path, tag = element.tag(), "removed unused prompt");
            removed += 1;
        }

        Ok(PassOutcome::UnusedPrompts {
            removed,
            ids: self.ids.iter().cloned().collect(),
        })
    }
}
