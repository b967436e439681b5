#![forbid(unsafe_code)]

//! Engine result handed to callers.

use crate::pipeline::PassOutcome;
use birdfix_graph::Analysis;
use serde::Serialize;

/// Pre-repair defect counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    /// Elements renamed (or to be renamed) by duplicate repair.
    pub duplicates: usize,
    pub null_candidates: usize,
    pub unused_prompts: usize,
    pub total_objects: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flags {
    pub has_duplicates: bool,
    pub has_null_candidates: bool,
    pub has_unused_prompts: bool,
}

impl From<&Analysis> for Counts {
    fn from(analysis: &Analysis) -> Self {
        Self {
            duplicates: analysis.duplicate_element_count(),
            null_candidates: analysis.null_candidate_ids.len(),
            unused_prompts: analysis.unused_prompt_ids.len(),
            total_objects: analysis.total_objects,
        }
    }
}

impl From<&Analysis> for Flags {
    fn from(analysis: &Analysis) -> Self {
        Self {
            has_duplicates: analysis.has_duplicates(),
            has_null_candidates: analysis.has_null_candidates(),
            has_unused_prompts: analysis.has_unused_prompts(),
        }
    }
}

/// Result of one repair run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    /// Serialized document after all enabled passes.
    pub repaired_document: String,
    /// Report of the document as it was before repair.
    pub analysis_report: String,
    pub counts: Counts,
    pub flags: Flags,
    /// What each pass did, in execution order.
    pub passes: Vec<PassOutcome>,
}

impl RepairOutcome {
    /// True if any pass mutated the document.
    pub fn changed(&self) -> bool {
        self.passes.iter().any(PassOutcome::changed)
    }

    /// True if the null-candidate pass stopped at its iteration cap.
    pub fn null_cap_reached(&self) -> bool {
        self.passes
            .iter()
            .any(|p| matches!(p, PassOutcome::NullCandidates { cap_reached: true, .. }))
    }
}
