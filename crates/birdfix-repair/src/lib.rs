#![forbid(unsafe_code)]

//! Repair engine for BIRD report XML.
//!
//! A run parses the document, analyzes it, renders the pre-repair report and
//! then applies the enabled passes in a fixed order:
//!
//! 1. duplicate renaming,
//! 2. null-candidate stripping (iterated to a fixed point),
//! 3. unused prompt removal.
//!
//! Each pass re-analyzes the document it is given, except prompt removal,
//! which works from the unused set found before any repair.

pub mod context;
pub mod duplicates;
pub mod nulls;
pub mod outcome;
pub mod pipeline;
pub mod prompts;
pub mod report;

pub use context::RepairContext;
pub use outcome::{Counts, Flags, RepairOutcome};
pub use pipeline::{PassOutcome, Rename, RepairPass, RepairPipeline};
pub use report::render_report;

use birdfix_core::{Error, Phase, RepairConfig};
use birdfix_graph::{Analysis, GraphBuilder};
use birdfix_xml::Document;
use tracing::info;

/// Parse and analyze a document without changing it.
pub fn analyze_document(text: &str, config: &RepairConfig) -> Result<Analysis, Error> {
    config.validate().map_err(|e| e.in_phase(Phase::Analyze))?;
    let doc = Document::parse(text).map_err(|e| e.in_phase(Phase::Parse))?;
    Ok(GraphBuilder::new(config).analyze(&doc))
}

/// Build the pass pipeline selected by `ctx`.
pub fn build_pipeline(ctx: &RepairContext, analysis: &Analysis) -> RepairPipeline {
    let mut pipeline = RepairPipeline::new();
    if ctx.repair_duplicates {
        pipeline.push(Box::new(duplicates::DuplicatePass));
    }
    if ctx.repair_null_candidates {
        pipeline.push(Box::new(nulls::NullCandidatePass));
    }
    if ctx.remove_unused_prompts {
        pipeline.push(Box::new(prompts::UnusedPromptPass::new(
            analysis.unused_prompt_ids.clone(),
        )));
    }
    pipeline
}

/// Repair a document.
///
/// Nothing is returned unless every step succeeds; a failure names the phase
/// it came from.
pub fn repair_document(text: &str, ctx: &RepairContext) -> Result<RepairOutcome, Error> {
    repair_document_named(text, None, ctx)
}

/// Like [`repair_document`], with the input's name shown in the report.
pub fn repair_document_named(
    text: &str,
    source: Option<&str>,
    ctx: &RepairContext,
) -> Result<RepairOutcome, Error> {
    ctx.config.validate().map_err(|e| e.in_phase(Phase::Analyze))?;
    let mut doc = Document::parse(text).map_err(|e| e.in_phase(Phase::Parse))?;

    let analysis = GraphBuilder::new(&ctx.config).analyze(&doc);
    info!(
        objects = analysis.total_objects,
        duplicates = analysis.duplicate_groups.len(),
        null_candidates = analysis.null_candidate_ids.len(),
        unused_prompts = analysis.unused_prompt_ids.len(),
        "analysis complete"
    );
    let analysis_report = render_report(&analysis, source);

    let passes = build_pipeline(ctx, &analysis).run(&mut doc, &ctx.config)?;

    Ok(RepairOutcome {
        repaired_document: doc.to_xml_string(),
        analysis_report,
        counts: Counts::from(&analysis),
        flags: Flags::from(&analysis),
        passes,
    })
}
