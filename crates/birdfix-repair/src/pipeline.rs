#![forbid(unsafe_code)]

//! Repair pass pipeline and trait definitions.

use birdfix_core::{Error, Phase, RepairConfig};
use birdfix_xml::Document;
use serde::Serialize;
use tracing::info;

/// One element renamed by duplicate repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rename {
    /// Position of the renamed element, e.g. `/0/3/1`.
    pub path: String,
    pub tag: String,
    pub old_name: String,
    pub new_name: String,
    /// Attribute tokens and text occurrences rewritten to the new name.
    pub references_rewritten: usize,
}

/// What a pass did to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "pass", rename_all = "kebab-case")]
pub enum PassOutcome {
    #[serde(rename_all = "camelCase")]
    Duplicates {
        renamed: Vec<Rename>,
        /// Counter value persisted on the root, if it was touched.
        next_unique_index: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    NullCandidates {
        iterations: usize,
        cleaned_values: usize,
        removed_attributes: usize,
        removed_text_nodes: usize,
        /// Candidates still present when the pass stopped.
        remaining: Vec<String>,
        cap_reached: bool,
    },
    #[serde(rename_all = "camelCase")]
    UnusedPrompts { removed: usize, ids: Vec<String> },
}

impl PassOutcome {
    /// True if the pass mutated the document.
    pub fn changed(&self) -> bool {
        match self {
            PassOutcome::Duplicates { renamed, .. } => !renamed.is_empty(),
            PassOutcome::NullCandidates {
                cleaned_values,
                removed_attributes,
                removed_text_nodes,
                ..
            } => *cleaned_values + *removed_attributes + *removed_text_nodes > 0,
            PassOutcome::UnusedPrompts { removed, .. } => *removed > 0,
        }
    }
}

/// Trait for individual repair passes.
pub trait RepairPass: Send {
    /// Pipeline phase used to attribute failures.
    fn phase(&self) -> Phase;

    /// Apply the pass to the document in place.
    fn apply(&self, doc: &mut Document, config: &RepairConfig) -> Result<PassOutcome, Error>;
}

/// A pipeline of repair passes executed in sequence.
pub struct RepairPipeline {
    passes: Vec<Box<dyn RepairPass>>,
}

impl RepairPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Add a pass to the pipeline.
    pub fn push(&mut self, pass: Box<dyn RepairPass>) {
        self.passes.push(pass);
    }

    /// Run all passes in order. The first failure aborts the run, tagged
    /// with the phase of the pass that raised it.
    pub fn run(&self, doc: &mut Document, config: &RepairConfig) -> Result<Vec<PassOutcome>, Error> {
        let mut outcomes = Vec::with_capacity(self.passes.len());
        for pass in &self.passes {
            let outcome = pass
                .apply(doc, config)
                .map_err(|e| e.in_phase(pass.phase()))?;
            info!(phase = %pass.phase(), changed = outcome.changed(), "repair pass finished");
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for RepairPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl RepairPass for Failing {
        fn phase(&self) -> Phase {
            Phase::UnusedPrompts
        }

        fn apply(&self, _doc: &mut Document, _config: &RepairConfig) -> Result<PassOutcome, Error> {
            Err(Error::XmlStructure("cannot remove root".into()))
        }
    }

    struct Noop;

    impl RepairPass for Noop {
        fn phase(&self) -> Phase {
            Phase::Duplicates
        }

        fn apply(&self, _doc: &mut Document, _config: &RepairConfig) -> Result<PassOutcome, Error> {
            Ok(PassOutcome::Duplicates {
                renamed: Vec::new(),
                next_unique_index: None,
            })
        }
    }

    #[test]
    fn test_failure_carries_phase() {
        let mut pipeline = RepairPipeline::new();
        pipeline.push(Box::new(Noop));
        pipeline.push(Box::new(Failing));
        assert_eq!(pipeline.len(), 2);

        let mut doc = Document::parse("<R/>").unwrap();
        let err = pipeline.run(&mut doc, &RepairConfig::default()).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::UnusedPrompts));
        assert!(err.to_string().starts_with("unused-prompts failed:"));
    }

    #[test]
    fn test_outcome_changed() {
        let idle = PassOutcome::NullCandidates {
            iterations: 1,
            cleaned_values: 0,
            removed_attributes: 0,
            removed_text_nodes: 0,
            remaining: Vec::new(),
            cap_reached: false,
        };
        assert!(!idle.changed());
        let removed = PassOutcome::UnusedPrompts {
            removed: 1,
            ids: vec!["pr1".into()],
        };
        assert!(removed.changed());
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let outcome = PassOutcome::UnusedPrompts {
            removed: 1,
            ids: vec!["pr100".into()],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["pass"], "unused-prompts");
        assert_eq!(json["removed"], 1);
    }
}
