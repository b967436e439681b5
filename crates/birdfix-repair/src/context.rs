#![forbid(unsafe_code)]

//! Repair context: configuration plus the passes selected for this run.

use birdfix_core::RepairConfig;

/// Context for one repair run.
#[derive(Debug, Clone)]
pub struct RepairContext {
    /// Dialect lists and limits.
    pub config: RepairConfig,
    /// Rename all but the first element of each duplicate group.
    pub repair_duplicates: bool,
    /// Strip dangling references until none remain or the cap is hit.
    pub repair_null_candidates: bool,
    /// Remove prompt definitions nothing refers to.
    pub remove_unused_prompts: bool,
}

impl RepairContext {
    /// Context with every pass enabled.
    pub fn new(config: RepairConfig) -> Self {
        Self {
            config,
            repair_duplicates: true,
            repair_null_candidates: true,
            remove_unused_prompts: true,
        }
    }

    /// Disable every pass, so that callers can switch on only the ones they
    /// asked for.
    pub fn with_no_passes(mut self) -> Self {
        self.repair_duplicates = false;
        self.repair_null_candidates = false;
        self.remove_unused_prompts = false;
        self
    }
}

impl Default for RepairContext {
    fn default() -> Self {
        Self::new(RepairConfig::default())
    }
}
