#![forbid(unsafe_code)]

//! birdfix CLI: analyze and repair SAS Visual Analytics BIRD report XML.

use base64::Engine;
use birdfix_core::{Error, RepairConfig};
use birdfix_repair::{Counts, Flags, PassOutcome, RepairContext, RepairOutcome};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "birdfix",
    about = "Find and repair broken object references in SAS VA BIRD report XML",
    version
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); logs go to stderr
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the analysis report without changing anything
    Analyze {
        /// Input report XML file
        file: PathBuf,

        /// Load repair configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Repair a report and write the result
    Repair {
        /// Input report XML file
        file: PathBuf,

        /// Output file (default: <stem>_repaired.xml next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only rename duplicate object names
        #[arg(long = "only-duplicates")]
        only_duplicates: bool,

        /// Only strip references to undefined objects
        #[arg(long = "only-null-candidates")]
        only_null_candidates: bool,

        /// Only remove unreferenced prompts
        #[arg(long = "only-unused-prompts")]
        only_unused_prompts: bool,

        /// Load repair configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the result as JSON, with the repaired document base64-encoded
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as TOML
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze { file, config } => cmd_analyze(file, config),

        Commands::Repair {
            file,
            output,
            only_duplicates,
            only_null_candidates,
            only_unused_prompts,
            config,
            json,
        } => cmd_repair(
            file,
            output,
            PassSelection {
                duplicates: only_duplicates,
                null_candidates: only_null_candidates,
                unused_prompts: only_unused_prompts,
            },
            config,
            json,
        ),

        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // RUST_LOG wins unless -v was given explicitly
    let filter = if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Passes requested with `--only-*`. None requested means all.
struct PassSelection {
    duplicates: bool,
    null_candidates: bool,
    unused_prompts: bool,
}

impl PassSelection {
    fn apply(&self, ctx: RepairContext) -> RepairContext {
        if !(self.duplicates || self.null_candidates || self.unused_prompts) {
            return ctx;
        }
        let mut ctx = ctx.with_no_passes();
        ctx.repair_duplicates = self.duplicates;
        ctx.repair_null_candidates = self.null_candidates;
        ctx.remove_unused_prompts = self.unused_prompts;
        ctx
    }
}

fn cmd_analyze(file: PathBuf, config: Option<PathBuf>) -> Result<(), Error> {
    let config = load_config(config.as_deref())?;
    let xml = read_file(&file)?;
    let analysis = birdfix_repair::analyze_document(&xml, &config)?;
    let source = file.display().to_string();
    print!("{}", birdfix_repair::render_report(&analysis, Some(&source)));
    Ok(())
}

fn cmd_repair(
    file: PathBuf,
    output: Option<PathBuf>,
    selection: PassSelection,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), Error> {
    let config = load_config(config.as_deref())?;
    let ctx = selection.apply(RepairContext::new(config));
    let xml = read_file(&file)?;
    let source = file.display().to_string();

    tracing::info!(file = %source, "repairing");
    let outcome = birdfix_repair::repair_document_named(&xml, Some(&source), &ctx)?;

    let output = output.unwrap_or_else(|| default_output_path(&file));
    write_output(&output, outcome.repaired_document.as_bytes())?;

    if json {
        let doc = JsonOutcome::new(&outcome, &output);
        let text = serde_json::to_string_pretty(&doc).map_err(|e| Error::Json(e.to_string()))?;
        println!("{text}");
    } else {
        print!("{}", outcome.analysis_report);
        print_summary(&outcome, &output);
    }
    Ok(())
}

fn cmd_config() -> Result<(), Error> {
    print!("{}", RepairConfig::default().to_toml_string()?);
    Ok(())
}

fn print_summary(outcome: &RepairOutcome, output: &Path) {
    println!("\nRepair summary:");
    for pass in &outcome.passes {
        match pass {
            PassOutcome::Duplicates { renamed, .. } => {
                if renamed.is_empty() {
                    println!("  - No duplicated names needed renaming");
                } else {
                    println!("  - Renamed {} duplicate elements", renamed.len());
                }
            }
            PassOutcome::NullCandidates {
                cleaned_values,
                removed_attributes,
                removed_text_nodes,
                remaining,
                cap_reached,
                ..
            } => {
                println!(
                    "  - Cleaned {cleaned_values} values, removed {removed_attributes} attributes and {removed_text_nodes} text nodes referencing undefined objects"
                );
                if *cap_reached {
                    println!(
                        "  - Iteration limit reached; {} null candidates remain",
                        remaining.len()
                    );
                }
            }
            PassOutcome::UnusedPrompts { removed, .. } => {
                println!("  - Removed {removed} unused prompt elements");
            }
        }
    }
    if !outcome.changed() {
        println!("  - No repairs were needed");
    }
    println!("Repaired file written to: {}", output.display());
}

/// `--json` output: the engine result with the document encoded for
/// transport.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutcome<'a> {
    repaired_document_base64: String,
    output_file: String,
    analysis_report: &'a str,
    counts: &'a Counts,
    flags: &'a Flags,
    passes: &'a [PassOutcome],
}

impl<'a> JsonOutcome<'a> {
    fn new(outcome: &'a RepairOutcome, output: &Path) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        Self {
            repaired_document_base64: engine.encode(outcome.repaired_document.as_bytes()),
            output_file: output.display().to_string(),
            analysis_report: &outcome.analysis_report,
            counts: &outcome.counts,
            flags: &outcome.flags,
            passes: &outcome.passes,
        }
    }
}

// ── Utility functions ────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<RepairConfig, Error> {
    match path {
        Some(p) => RepairConfig::from_file(p),
        None => Ok(RepairConfig::default()),
    }
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    input.with_file_name(format!("{stem}_repaired.xml"))
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

fn write_output(path: &Path, data: &[u8]) -> Result<(), Error> {
    std::fs::write(path, data).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}
