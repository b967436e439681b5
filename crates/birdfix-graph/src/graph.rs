#![forbid(unsafe_code)]

//! Reference graph builder.
//!
//! BIRD never links objects structurally: an element "references" another
//! when one of its attribute or text values contains the other's `name`.
//! The builder recovers those edges by string matching in two passes:
//!
//! 1. declarations: every `name` attribute, grouped by value;
//! 2. references: identifier tokens in all other attributes and
//!    boundary-delimited identifiers in text.

use crate::classify::{is_identifier_shape, is_likely_false_positive};
use crate::scan::{attribute_identifiers, text_identifiers};
use birdfix_core::RepairConfig;
use birdfix_xml::{Document, ElementPath};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// An element carrying an identity attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaringElement {
    pub path: ElementPath,
    pub tag: String,
}

/// Derived view of one document. Recomputed after every mutation, never
/// stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Number of elements, root included.
    pub total_objects: usize,
    /// Element count per local tag name.
    pub object_type_counts: BTreeMap<String, usize>,
    /// Identifier-shaped `name` values.
    pub defined_ids: BTreeSet<String>,
    /// Identifiers found outside `name` attributes.
    pub referenced_ids: BTreeSet<String>,
    /// Referenced but never declared, after false-positive filtering.
    pub null_candidate_ids: BTreeSet<String>,
    /// Every non-empty `name` value and its declaring elements in document
    /// order, identifier-shaped or not.
    pub declarations: BTreeMap<String, Vec<DeclaringElement>>,
    /// Declarations with more than one element that are not benign.
    pub duplicate_groups: BTreeMap<String, Vec<DeclaringElement>>,
    /// Prompt identifiers with no reference outside their own declaration.
    pub unused_prompt_ids: BTreeSet<String>,
}

impl Analysis {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicate_groups.is_empty()
    }

    pub fn has_null_candidates(&self) -> bool {
        !self.null_candidate_ids.is_empty()
    }

    pub fn has_unused_prompts(&self) -> bool {
        !self.unused_prompt_ids.is_empty()
    }

    pub fn has_defects(&self) -> bool {
        self.has_duplicates() || self.has_null_candidates() || self.has_unused_prompts()
    }

    /// Count for a tag, zero when absent.
    pub fn count_of(&self, tag: &str) -> usize {
        self.object_type_counts.get(tag).copied().unwrap_or(0)
    }

    /// Number of elements that duplicate repair would rename.
    pub fn duplicate_element_count(&self) -> usize {
        self.duplicate_groups
            .values()
            .map(|members| members.len().saturating_sub(1))
            .sum()
    }
}

/// Builds an [`Analysis`] from a document under a configuration.
pub struct GraphBuilder<'a> {
    config: &'a RepairConfig,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a RepairConfig) -> Self {
        Self { config }
    }

    /// Analyze a document. Never fails: absent attributes and text simply
    /// contribute nothing.
    pub fn analyze(&self, doc: &Document) -> Analysis {
        let identity = self.config.identity_attribute.as_str();
        let mut analysis = Analysis::default();

        // Pass 1: declarations.
        for (path, element) in doc.elements() {
            analysis.total_objects += 1;
            *analysis
                .object_type_counts
                .entry(element.tag().to_owned())
                .or_insert(0) += 1;

            let Some(name) = element.attribute(identity).filter(|n| !n.is_empty()) else {
                continue;
            };
            if is_identifier_shape(name) {
                analysis.defined_ids.insert(name.to_owned());
            }
            analysis
                .declarations
                .entry(name.to_owned())
                .or_default()
                .push(DeclaringElement {
                    path,
                    tag: element.tag().to_owned(),
                });
        }

        // Pass 2: references. Whole attribute values and raw text chunks are
        // kept for the prompt check, which matches more loosely.
        let mut attribute_values: HashSet<&str> = HashSet::new();
        let mut text_chunks: Vec<&str> = Vec::new();
        for (_, element) in doc.elements() {
            for attr in element.attributes() {
                if attr.name == identity {
                    continue;
                }
                attribute_values.insert(attr.value.as_str());
                for id in attribute_identifiers(&attr.value) {
                    analysis.referenced_ids.insert(id.to_owned());
                }
            }
            for chunk in element.text_nodes() {
                text_chunks.push(chunk);
                for id in text_identifiers(chunk) {
                    analysis.referenced_ids.insert(id.to_owned());
                }
            }
        }

        analysis.null_candidate_ids = analysis
            .referenced_ids
            .difference(&analysis.defined_ids)
            .filter(|id| !is_likely_false_positive(id, self.config))
            .cloned()
            .collect();

        analysis.duplicate_groups = analysis
            .declarations
            .iter()
            .filter(|(name, members)| members.len() > 1 && !self.is_benign_duplicate(name, members))
            .map(|(name, members)| (name.clone(), members.clone()))
            .collect();

        analysis.unused_prompt_ids = analysis
            .defined_ids
            .iter()
            .filter(|id| id.starts_with(self.config.prompt_prefix.as_str()))
            .filter(|id| {
                !attribute_values.contains(id.as_str())
                    && !text_chunks.iter().any(|chunk| chunk.contains(id.as_str()))
            })
            .cloned()
            .collect();

        debug!(
            objects = analysis.total_objects,
            defined = analysis.defined_ids.len(),
            referenced = analysis.referenced_ids.len(),
            null_candidates = analysis.null_candidate_ids.len(),
            duplicates = analysis.duplicate_groups.len(),
            unused_prompts = analysis.unused_prompt_ids.len(),
            "analyzed document"
        );
        analysis
    }

    fn is_benign_duplicate(&self, name: &str, members: &[DeclaringElement]) -> bool {
        if self.config.benign_duplicate_names.contains(name) {
            return true;
        }
        match members.split_first() {
            Some((first, rest)) => {
                rest.iter().all(|m| m.tag == first.tag)
                    && self.config.benign_duplicate_tags.contains(&first.tag)
            }
            None => false,
        }
    }
}

/// Analyze with a throwaway builder.
pub fn analyze(doc: &Document, config: &RepairConfig) -> Analysis {
    GraphBuilder::new(config).analyze(doc)
}
