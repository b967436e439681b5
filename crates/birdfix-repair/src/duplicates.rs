#![forbid(unsafe_code)]

//! Duplicate identifier repair.
//!
//! The first element of each duplicate group keeps its name. Every later
//! element gets a fresh name built from the group's alphabetic prefix and the
//! root counter, and every reference to the old name is rewritten to follow
//! it. The counter is threaded through explicitly; only [`DuplicatePass`]
//! reads it from and writes it back to the root.

use crate::pipeline::{PassOutcome, Rename, RepairPass};
use birdfix_core::{Error, Phase, RepairConfig};
use birdfix_graph::classify::alphabetic_prefix;
use birdfix_graph::scan::{replace_bounded, replace_tokens};
use birdfix_graph::{analyze, Analysis};
use birdfix_xml::Document;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Rename every non-first member of each duplicate group.
///
/// `counter` is the next free suffix. A minted suffix is never below the
/// counter and always above every suffix already declared with the same
/// prefix. Minted names never match a referenced id either, so a dangling
/// reference is not silently bound to the renamed element. Returns the
/// renames and the counter value to persist; fails when a suffix would not
/// fit in a `u64`.
pub fn rename_duplicates(
    doc: &mut Document,
    analysis: &Analysis,
    config: &RepairConfig,
    counter: u64,
) -> Result<(Vec<Rename>, u64), Error> {
    let identity = config.identity_attribute.as_str();
    let mut in_use: HashSet<String> = analysis.declarations.keys().cloned().collect();
    let mut counter = counter;
    let mut renamed = Vec::new();

    for (name, members) in &analysis.duplicate_groups {
        let prefix = alphabetic_prefix(name);
        if prefix.is_empty() {
            debug!(name = %name, "duplicate name has no lowercase prefix, left as is");
            continue;
        }
        for member in members.iter().skip(1) {
            let floor = match max_suffix(prefix, &in_use) {
                Some(max) => next_suffix(max)?,
                None => 0,
            };
            let mut suffix = counter.max(floor);
            let mut new_name = format!("{prefix}{suffix}");
            while in_use.contains(&new_name) || analysis.referenced_ids.contains(&new_name) {
                suffix = next_suffix(suffix)?;
                new_name = format!("{prefix}{suffix}");
            }
            counter = next_suffix(suffix)?;

            let Some(element) = doc.element_mut(&member.path) else {
                continue;
            };
            element.set_attribute(identity, new_name.as_str());
            let rewritten = rewrite_references(doc, identity, name, &new_name);
            debug!(
                path = %member.path,
                old = %name,
                new = %new_name,
                rewritten,
                "renamed duplicate"
            );
            in_use.insert(new_name.clone());
            renamed.push(Rename {
                path: member.path.to_string(),
                tag: member.tag.clone(),
                old_name: name.clone(),
                new_name,
                references_rewritten: rewritten,
            });
        }
    }

    Ok((renamed, counter))
}

fn next_suffix(suffix: u64) -> Result<u64, Error> {
    suffix.checked_add(1).ok_or_else(|| Error::Repair {
        phase: Phase::Duplicates,
        message: format!("no unique name suffix left after {suffix}"),
    })
}

/// Largest `N` such that `prefix` followed by the digits of `N` is in use.
fn max_suffix(prefix: &str, in_use: &HashSet<String>) -> Option<u64> {
    in_use
        .iter()
        .filter_map(|name| name.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|rest| rest.parse::<u64>().ok())
        .max()
}

/// Point every reference to `old` at `new`: whole tokens in attribute values
/// and bounded occurrences in text. Identity attributes are left alone so the
/// remaining group members keep their names.
fn rewrite_references(doc: &mut Document, identity: &str, old: &str, new: &str) -> usize {
    let mut count = 0;
    doc.for_each_element_mut(|element| {
        for attr in element.attributes_mut().iter_mut() {
            if attr.name == identity {
                continue;
            }
            let (value, n) = replace_tokens(&attr.value, old, new);
            if n > 0 {
                attr.value = value;
                count += n;
            }
        }
        for chunk in element.text_nodes_mut() {
            let (text, n) = replace_bounded(chunk, old, new);
            if n > 0 {
                *chunk = text;
                count += n;
            }
        }
    });
    count
}

/// Current counter on the root. Absent or unreadable counters start at zero.
pub fn read_counter(doc: &Document, config: &RepairConfig) -> u64 {
    match doc.root_attribute(&config.counter_attribute) {
        None => 0,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(value = %raw, attribute = %config.counter_attribute, "ignoring unreadable counter");
            0
        }),
    }
}

/// Duplicate repair as a pipeline pass.
pub struct DuplicatePass;

impl RepairPass for DuplicatePass {
    fn phase(&self) -> Phase {
        Phase::Duplicates
    }

    fn apply(&self, doc: &mut Document, config: &RepairConfig) -> Result<PassOutcome, Error> {
        let analysis = analyze(doc, config);
        let counter = read_counter(doc, config);
        let (renamed, next) = rename_duplicates(doc, &analysis, config, counter)?;

        let next_unique_index = if renamed.is_empty() {
            None
        } else {
            doc.set_root_attribute(&config.counter_attribute, next.to_string());
            Some(next)
        };
        Ok(PassOutcome::Duplicates {
            renamed,
            next_unique_index,
        })
    }
}
