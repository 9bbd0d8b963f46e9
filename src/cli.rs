//! Command-line interface for intentcheck.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::analyzer::{AnalysisContext, PluginCatalog};
use crate::config::Config;
use crate::engine::{Reconciler, RunMeta};
use crate::intent::IntentDocument;
use crate::report::{self, DiffResult, Report};
use crate::scanner;
use crate::score;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "INTENTCHECK_LOG";

/// Starter intent document written by `init`.
const INTENT_TEMPLATE: &str = include_str!("templates/intent.yaml");

/// Reconcile declared application intent against the code.
///
/// intentcheck reads an intent document listing the routes and
/// architectural rules a service is supposed to have, analyzes the
/// JavaScript/TypeScript sources, and reports what is present, missing,
/// undeclared or in violation.
#[derive(Parser)]
#[command(name = "intentcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare the intent document against the code
    Check(CheckArgs),
    /// Compare two saved JSON reports
    Diff(DiffArgs),
    /// Create a starter intent document
    Init(InitArgs),
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Path to scan (default: scanDir from the config)
    pub path: Option<PathBuf>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the intent document (default: intentFile from the config)
    #[arg(short, long)]
    pub intent: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Also save the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Saved report to diff against
    #[arg(short, long)]
    pub baseline: Option<PathBuf>,

    /// Minimum acceptable compliance score (0-100)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments for the diff command.
#[derive(Parser)]
pub struct DiffArgs {
    /// Older report
    pub before: PathBuf,

    /// Newer report
    pub after: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "intent.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Install the stderr log subscriber.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn check_format(format: &str) -> bool {
    if format != "pretty" && format != "json" {
        eprintln!("Error: invalid format {:?}, must be 'pretty' or 'json'", format);
        return false;
    }
    true
}

/// Report plus baseline diff, for `--format json --baseline`.
#[derive(Serialize)]
struct CheckOutput<'a> {
    report: &'a Report,
    diff: &'a DiffResult,
}

/// Run the check command.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    run_check_with(args, &PluginCatalog::new())
}

/// Run the check command with custom analyzers available by name.
pub fn run_check_with(args: &CheckArgs, catalog: &PluginCatalog) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }

    // Load config
    let (config, config_path) = match Config::load(args.config.as_deref(), Path::new(".")) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if let Some(path) = &config_path {
        tracing::debug!(config = %path.display(), "using config");
    }

    // Parse intent
    let intent_path = args
        .intent
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.intent_file));
    let intent = match IntentDocument::parse_file(&intent_path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'intentcheck init' to create an intent document");
            return Ok(EXIT_ERROR);
        }
    };

    // Resolve scan root
    let scan_path = args
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.scan_dir));
    let root = match scan_path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", scan_path, e);
            return Ok(EXIT_ERROR);
        }
    };
    let base_dir = if root.is_file() {
        root.parent().map(Path::to_path_buf).unwrap_or_else(|| root.clone())
    } else {
        root.clone()
    };

    let reconciler = Reconciler::from_config(&config, catalog);
    let extensions = reconciler.registry().wanted_extensions();
    let files = scanner::scan_files(&root, &config.exclude, &extensions)?;
    if files.is_empty() {
        eprintln!("Warning: no files to scan");
    }

    let ctx = AnalysisContext::new(&base_dir);
    let meta = RunMeta {
        intent_file: intent_path.to_string_lossy().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    let report = match reconciler.reconcile(&intent, &ctx, &files, meta) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: invalid intent document: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if let Some(output) = &args.output {
        std::fs::write(output, report::to_json(&report)?)
            .map_err(|e| anyhow::anyhow!("writing report {}: {}", output.display(), e))?;
    }

    let diff = match &args.baseline {
        Some(path) => Some(report::diff(&Report::load(path)?, &report)),
        None => None,
    };

    let verdict = score::evaluate(&report, args.threshold);

    match (args.format.as_str(), &diff) {
        ("json", Some(diff)) => {
            let output = CheckOutput {
                report: &report,
                diff,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        ("json", None) => report::write_json(&report)?,
        (_, diff) => {
            report::write_pretty(&report, &scan_path.to_string_lossy(), &verdict);
            if let Some(diff) = diff {
                report::write_diff_pretty(diff);
            }
        }
    }

    if verdict.passed {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the diff command.
pub fn run_diff(args: &DiffArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }

    let before = Report::load(&args.before)?;
    let after = Report::load(&args.after)?;
    let diff = report::diff(&before, &after);

    match args.format.as_str() {
        "json" => report::write_diff_json(&diff)?,
        _ => report::write_diff_pretty(&diff),
    }

    if diff.has_regressions() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it, pass --force, or use --output to choose another path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, INTENT_TEMPLATE) {
        eprintln!("Error: failed to write intent document: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to declare your routes and rules", args.output.display());
    println!("  2. Run: intentcheck check . --intent {}", args.output.display());

    Ok(EXIT_SUCCESS)
}
