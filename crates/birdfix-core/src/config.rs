#![forbid(unsafe_code)]

//! Repair configuration.
//!
//! The dialect's exclusion and allow lists are tribal knowledge rather than
//! algorithm, so they live here as data and can be extended from a TOML file
//! without touching the analysis code.

use crate::dialect::{attr, node, PROMPT_PREFIX};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Default bound on null-candidate repair iterations.
pub const DEFAULT_MAX_NULL_ITERATIONS: usize = 10;

/// Tunable knobs for analysis and repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Identifier-shaped literals that are never reported as dangling
    /// references. Compared case-insensitively.
    pub false_positive_literals: BTreeSet<String>,
    /// Element tags whose repeated `name` values are normal for the dialect.
    /// A duplicate group is benign only if every member carries one tag from
    /// this list.
    pub benign_duplicate_tags: BTreeSet<String>,
    /// `name` values that are expected to repeat.
    pub benign_duplicate_names: BTreeSet<String>,
    /// Identifier prefix marking prompt definitions.
    pub prompt_prefix: String,
    /// Attribute declaring an element's identifier.
    pub identity_attribute: String,
    /// Root attribute holding the next free numeric suffix.
    pub counter_attribute: String,
    /// Upper bound on null-candidate repair iterations.
    pub max_null_iterations: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            false_positive_literals: ["label", "title", "name", "id", "bi1"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            benign_duplicate_tags: [
                node::DYN_VAR,
                node::CATEGORY,
                node::PROPERTY,
                node::KEY_VALUE,
                node::HISTOGRAM_PARM,
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            benign_duplicate_names: ["bi1"].into_iter().map(str::to_owned).collect(),
            prompt_prefix: PROMPT_PREFIX.to_owned(),
            identity_attribute: attr::NAME.to_owned(),
            counter_attribute: attr::NEXT_UNIQUE_NAME_INDEX.to_owned(),
            max_null_iterations: DEFAULT_MAX_NULL_ITERATIONS,
        }
    }
}

impl RepairConfig {
    /// Parse a TOML document. Keys that are absent keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Render as TOML, e.g. to seed a user configuration file.
    pub fn to_toml_string(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_null_iterations == 0 {
            return Err(Error::Config("max_null_iterations must be at least 1".into()));
        }
        if self.identity_attribute.is_empty() {
            return Err(Error::Config("identity_attribute must not be empty".into()));
        }
        if self.counter_attribute.is_empty() {
            return Err(Error::Config("counter_attribute must not be empty".into()));
        }
        if self.prompt_prefix.is_empty()
            || !self.prompt_prefix.chars().all(|c| c.is_ascii_lowercase())
        {
            return Err(Error::Config(format!(
                "prompt_prefix must be lowercase ASCII letters, got {:?}",
                self.prompt_prefix
            )));
        }
        Ok(())
    }

    /// Check a candidate against the false-positive literal list.
    pub fn is_false_positive_literal(&self, value: &str) -> bool {
        self.false_positive_literals
            .iter()
            .any(|lit| lit.eq_ignore_ascii_case(value))
    }

    /// Add literals to the false-positive exclusion list.
    pub fn exclude_literals<I, S>(&mut self, literals: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.false_positive_literals
            .extend(literals.into_iter().map(Into::into));
    }
}
