#![forbid(unsafe_code)]

//! Fixed-layout text report of an analysis.

use birdfix_core::dialect::node;
use birdfix_graph::Analysis;
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

/// Tags listed in the report, in display order. Each row sums the counts of
/// its tags, which folds the plural section names into their singular rows.
const REPORTED_TYPES: &[(&str, &[&str])] = &[
    (node::PARENT_DATA_DEFINITION, &[node::PARENT_DATA_DEFINITION]),
    (node::DATA_DEFINITION, &[node::DATA_DEFINITION, node::DATA_DEFINITIONS]),
    (node::DATA_SOURCE, &[node::DATA_SOURCE, node::DATA_SOURCES]),
    (node::DATA_ITEM, &[node::DATA_ITEM]),
    (node::PREDEFINED_DATA_ITEM, &[node::PREDEFINED_DATA_ITEM]),
    (node::VISUAL_ELEMENTS, &[node::VISUAL_ELEMENTS]),
    (node::IMAGE, &[node::IMAGE]),
    (node::VISUAL_CONTAINER, &[node::VISUAL_CONTAINER]),
    (node::PROMPT, &[node::PROMPT]),
    (node::MEDIA_CONTAINER, &[node::MEDIA_CONTAINER]),
    (node::SECTION, &[node::SECTION]),
    (node::CONTAINER, &[node::CONTAINER]),
    (node::ACTIONS, &[node::ACTIONS]),
    (node::NAVIGATION_ACTION, &[node::NAVIGATION_ACTION]),
];

/// Render the analysis report. `source` names the input, if known.
pub fn render_report(analysis: &Analysis, source: Option<&str>) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "SAS Visual Analytics BIRD XML Analysis");
    let _ = writeln!(out, "{rule}");
    if let Some(source) = source {
        let _ = writeln!(out, "File: {source}");
    }
    let _ = writeln!(out, "Total Objects: {}", analysis.total_objects);

    let _ = writeln!(out, "\nObject Counts by Type:");
    for (label, tags) in REPORTED_TYPES {
        let count: usize = tags.iter().map(|t| analysis.count_of(t)).sum();
        let _ = writeln!(out, "  {label}: {count}");
    }

    let _ = writeln!(
        out,
        "\nNull Candidates: {}",
        analysis.null_candidate_ids.len()
    );
    for id in &analysis.null_candidate_ids {
        let _ = writeln!(out, "  {id}: Referenced but not defined");
    }

    let _ = writeln!(out, "\nUnused Prompts: {}", analysis.unused_prompt_ids.len());
    for id in &analysis.unused_prompt_ids {
        let _ = writeln!(out, "  {id}: Defined but not referenced");
    }

    let _ = writeln!(out, "\nDuplicate Objects: {}", analysis.duplicate_groups.len());
    for (id, members) in &analysis.duplicate_groups {
        let _ = writeln!(out, "  {id}: {} instances", members.len());
    }

    let issues = potential_issues(analysis);
    if issues.is_empty() {
        let _ = writeln!(out, "\nNo obvious issues detected");
    } else {
        let _ = writeln!(out, "\nPotential Issues:");
        for issue in &issues {
            let _ = writeln!(out, "  - {issue}");
        }
    }
    let _ = writeln!(out, "{rule}");
    out
}

/// One line per non-empty defect class.
pub fn potential_issues(analysis: &Analysis) -> Vec<String> {
    let mut issues = Vec::new();
    if analysis.has_duplicates() {
        issues.push(format!(
            "Found {} duplicate object IDs",
            analysis.duplicate_groups.len()
        ));
    }
    if analysis.has_null_candidates() {
        issues.push(format!(
            "Found {} null candidates",
            analysis.null_candidate_ids.len()
        ));
    }
    if analysis.has_unused_prompts() {
        issues.push(format!(
            "Found {} unused prompts",
            analysis.unused_prompt_ids.len()
        ));
    }
    issues
}
