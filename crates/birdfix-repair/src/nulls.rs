#![forbid(unsafe_code)]

//! Null-candidate repair.
//!
//! Dangling references are stripped out of attribute values and text until
//! the analysis finds none, bounded by `max_null_iterations`. Elements are
//! never deleted here, only the offending parts of their values.

use crate::pipeline::{PassOutcome, RepairPass};
use birdfix_core::{Error, Phase, RepairConfig};
use birdfix_graph::analyze;
use birdfix_graph::scan::replace_bounded;
use birdfix_xml::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static COMMA_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r",(?:\s*,)+").expect("comma regex"));
static EMPTY_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*\)").expect("parens regex"));

/// Compiled `${id}` / `${id,...}` wrappers for one set of candidates. The
/// wrapper rule runs before the bare identifier rule.
struct Stripper {
    rules: Vec<(String, Regex)>,
}

impl Stripper {
    fn new(candidates: &BTreeSet<String>) -> Result<Self, Error> {
        let rules = candidates
            .iter()
            .map(|id| {
                let pattern = format!(r"\$\{{{}(?:,[^}}]*)?\}}", regex::escape(id));
                Regex::new(&pattern)
                    .map(|re| (id.clone(), re))
                    .map_err(|e| Error::Other(format!("bad wrapper pattern for {id}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Cleaned value, or `None` when no candidate occurs in it.
    fn clean(&self, value: &str) -> Option<String> {
        if !self.rules.iter().any(|(id, _)| value.contains(id.as_str())) {
            return None;
        }
        let mut out = value.to_owned();
        for (id, wrapper) in &self.rules {
            if !out.contains(id.as_str()) {
                continue;
            }
            out = wrapper.replace_all(&out, "").into_owned();
            out = replace_bounded(&out, id, "").0;
        }
        Some(normalize(&out))
    }
}

/// Tidy what stripping leaves behind: whitespace runs, doubled commas and
/// emptied parentheses.
pub fn normalize(value: &str) -> String {
    let out = WHITESPACE_RUN.replace_all(value, " ");
    let out = COMMA_RUN.replace_all(&out, ",");
    let out = EMPTY_PARENS.replace_all(&out, "()");
    out.trim().to_owned()
}

#[derive(Debug, Default)]
struct Sweep {
    cleaned_values: usize,
    removed_attributes: usize,
    removed_text_nodes: usize,
}

impl Sweep {
    fn changed(&self) -> bool {
        self.cleaned_values + self.removed_attributes + self.removed_text_nodes > 0
    }
}

fn sweep(doc: &mut Document, identity: &str, stripper: &Stripper) -> Sweep {
    let mut totals = Sweep::default();
    doc.for_each_element_mut(|element| {
        let attributes = element.attributes_mut();
        let before = attributes.len();
        attributes.retain_mut(|attr| {
            if attr.name == identity {
                return true;
            }
            match stripper.clean(&attr.value) {
                Some(cleaned) if cleaned.is_empty() => {
                    debug!(attribute = %attr.name, value = %attr.value, "removed emptied attribute");
                    false
                }
                Some(cleaned) if cleaned != attr.value => {
                    debug!(attribute = %attr.name, from = %attr.value, to = %cleaned, "cleaned attribute");
                    attr.value = cleaned;
                    totals.cleaned_values += 1;
                    true
                }
                _ => true,
            }
        });
        totals.removed_attributes += before - attributes.len();

        let mut emptied = 0;
        for chunk in element.text_nodes_mut() {
            if let Some(cleaned) = stripper.clean(chunk.as_str()) {
                if cleaned.is_empty() {
                    emptied += 1;
                } else if cleaned != *chunk {
                    totals.cleaned_values += 1;
                }
                *chunk = cleaned;
            }
        }
        if emptied > 0 {
            element.prune_empty_text();
            totals.removed_text_nodes += emptied;
        }
    });
    totals
}

/// Null-candidate repair as a pipeline pass.
pub struct NullCandidatePass;

impl RepairPass for NullCandidatePass {
    fn phase(&self) -> Phase {
        Phase::NullCandidates
    }

    fn apply(&self, doc: &mut Document, config: &RepairConfig) -> Result<PassOutcome, Error> {
        let identity = config.identity_attribute.as_str();
        let mut total = Sweep::default();
        let mut iterations = 0;
        let mut remaining = analyze(doc, config).null_candidate_ids;

        while !remaining.is_empty() && iterations < config.max_null_iterations {
            iterations += 1;
            let stripper = Stripper::new(&remaining)?;
            let round = sweep(doc, identity, &stripper);
            debug!(iteration = iterations, candidates = remaining.len(), ?round, "null-candidate sweep");
            total.cleaned_values += round.cleaned_values;
            total.removed_attributes += round.removed_attributes;
            total.removed_text_nodes += round.removed_text_nodes;

            let progressed = round.changed();
            remaining = analyze(doc, config).null_candidate_ids;
            if !progressed {
                break;
            }
        }

        let cap_reached = !remaining.is_empty() && iterations >= config.max_null_iterations;
        if cap_reached {
            warn!(
                cap = config.max_null_iterations,
                remaining = ?remaining,
                "null-candidate repair hit its iteration cap"
            );
        } else if !remaining.is_empty() {
            warn!(remaining = ?remaining, "null candidates left after repair");
        } else if iterations > 0 {
            info!(iterations, "null candidates eliminated");
        }

        Ok(PassOutcome::NullCandidates {
            iterations,
            cleaned_values: total.cleaned_values,
            removed_attributes: total.removed_attributes,
            removed_text_nodes: total.removed_text_nodes,
            remaining: remaining.into_iter().collect(),
            cap_reached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use birdfix_xml::ElementPath;

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn strip(value: &str, list: &[&str]) -> Option<String> {
        Stripper::new(&ids(list)).unwrap().clean(value)
    }

    #[test]
    fn test_strip_wrapper_and_bare() {
        assert_eq!(strip("${xy99}", &["xy99"]).as_deref(), Some(""));
        assert_eq!(strip("a ${xy99,raw} b", &["xy99"]).as_deref(), Some("a b"));
        assert_eq!(strip("sum(xy99)", &["xy99"]).as_deref(), Some("sum()"));
        assert_eq!(strip("f(dd1, xy99, dd2)", &["xy99"]).as_deref(), Some("f(dd1, dd2)"));
        assert_eq!(strip("xy99 dd1 xy99", &["xy99"]).as_deref(), Some("dd1"));
    }

    #[test]
    fn test_strip_leaves_unrelated_values() {
        assert_eq!(strip("dd1 dd2", &["xy99"]), None);
        // contains the id but only inside a longer token
        assert_eq!(strip("xy990", &["xy99"]).as_deref(), Some("xy990"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  a \n\t b  "), "a b");
        assert_eq!(normalize("a,,b"), "a,b");
        assert_eq!(normalize("a, ,b"), "a,b");
        assert_eq!(normalize("f( )"), "f()");
    }

    fn repair(xml: &str, config: &RepairConfig) -> (Document, PassOutcome) {
        let mut doc = Document::parse(xml).unwrap();
        let outcome = NullCandidatePass.apply(&mut doc, config).unwrap();
        (doc, outcome)
    }

    #[test]
    fn test_emptied_attribute_removed() {
        let (doc, outcome) = repair(
            r#"<R><Property name="color" value="xy99"/></R>"#,
            &RepairConfig::default(),
        );
        let prop = doc.element(&ElementPath::from(vec![0])).unwrap();
        assert_eq!(prop.attribute("value"), None);
        assert_eq!(prop.attribute("name"), Some("color"));
        assert!(analyze(&doc, &RepairConfig::default()).null_candidate_ids.is_empty());
        match outcome {
            PassOutcome::NullCandidates {
                iterations,
                removed_attributes,
                cap_reached,
                remaining,
                ..
            } => {
                assert_eq!(iterations, 1);
                assert_eq!(removed_attributes, 1);
                assert!(!cap_reached);
                assert!(remaining.is_empty());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_text_cleaned_and_element_kept() {
        let (doc, _) = repair(
            r#"<R><DataItem name="di1"/><Expr>sum(di1) + ${ve4,x}</Expr><Note>ve4</Note></R>"#,
            &RepairConfig::default(),
        );
        let expr = doc.element(&ElementPath::from(vec![1])).unwrap();
        assert_eq!(expr.text().as_deref(), Some("sum(di1) +"));
        let note = doc.element(&ElementPath::from(vec![2])).unwrap();
        assert_eq!(note.tag(), "Note");
        assert_eq!(note.text(), None);
        assert_eq!(doc.to_xml_string(), r#"<R><DataItem name="di1"/><Expr>sum(di1) +</Expr><Note/></R>"#);
    }

    #[test]
    fn test_identity_attribute_untouched() {
        let (doc, outcome) = repair(r#"<R><A name="ab7"/></R>"#, &RepairConfig::default());
        assert!(!outcome.changed());
        assert_eq!(doc.to_xml_string(), r#"<R><A name="ab7"/></R>"#);
    }

    #[test]
    fn test_false_positives_survive() {
        let (doc, outcome) = repair(
            r#"<R><Style value="aabbcc ab1234 bi1"/></R>"#,
            &RepairConfig::default(),
        );
        assert!(!outcome.changed());
        let style = doc.element(&ElementPath::from(vec![0])).unwrap();
        assert_eq!(style.attribute("value"), Some("aabbcc ab1234 bi1"));
    }

    #[test]
    fn test_stripping_exposes_new_candidate() {
        let xml = r#"<R><T>a xy${zz1}99 b</T></R>"#;

        let (doc, outcome) = repair(xml, &RepairConfig::default());
        assert!(matches!(
            outcome,
            PassOutcome::NullCandidates { iterations: 2, cap_reached: false, .. }
        ));
        assert_eq!(doc.to_xml_string(), "<R><T>a b</T></R>");

        let config = RepairConfig {
            max_null_iterations: 1,
            ..RepairConfig::default()
        };
        let (doc, outcome) = repair(xml, &config);
        match outcome {
            PassOutcome::NullCandidates {
                iterations,
                remaining,
                cap_reached,
                ..
            } => {
                assert_eq!(iterations, 1);
                assert!(cap_reached);
                assert_eq!(remaining, vec!["xy99".to_string()]);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(doc.to_xml_string(), "<R><T>a xy99 b</T></R>");
    }

    #[test]
    fn test_clean_document_zero_iterations() {
        let (_, outcome) = repair(r#"<R><A name="ve1"/><B ref="ve1"/></R>"#, &RepairConfig::default());
        assert!(matches!(
            outcome,
            PassOutcome::NullCandidates { iterations: 0, cap_reached: false, .. }
        ));
    }
}
