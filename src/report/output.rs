//! Output formatting for reports and diffs.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: the serialized report, for CI and later diffing

use colored::*;

use super::{DiffResult, ExtraKey, Report};
use crate::constraint::ConstraintStatus;
use crate::matcher::Classification;
use crate::score::Verdict;

// =============================================================================
// JSON Format
// =============================================================================

/// Serialize a report as pretty JSON.
pub fn to_json(report: &Report) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write a report in JSON format.
pub fn write_json(report: &Report) -> anyhow::Result<()> {
    println!("{}", to_json(report)?);
    Ok(())
}

/// Write a diff in JSON format.
pub fn write_diff_json(diff: &DiffResult) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(diff)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write a report in pretty (human-readable) format.
pub fn write_pretty(report: &Report, scan_path: &str, verdict: &Verdict) {
    // Header
    println!();
    print!("  ");
    print!("{}", "intentcheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", scan_path);
    print!("  {}", "Intent:   ".dimmed());
    println!("{}", report.meta.intent_file);
    print!("  {}", "Analyzers:".dimmed());
    println!(" {}", report.meta.analyzers.join(", "));
    println!();

    write_summary(report, verdict);
    println!();

    if !report.features.is_empty() {
        write_features(report);
        println!();
    }

    if !report.extra_features.is_empty() {
        write_extras(report);
        println!();
    }

    if let Some(section) = &report.constraints {
        println!("  {} ({}):", "Constraints".bold(), section.results.len());
        println!();
        for result in &section.results {
            let tag = match result.status {
                ConstraintStatus::Passed => "PASS ".green(),
                ConstraintStatus::Failed => "FAIL ".red(),
                ConstraintStatus::Skipped => "SKIP ".dimmed(),
            };
            print!("    {} {:<24}", tag, result.id);
            print!("{}", format!("{} {}", result.rule, result.scope).dimmed());
            if let Some(reason) = &result.reason {
                print!("  {}", format!("({})", reason).dimmed());
            }
            println!();

            for v in &result.violations {
                print!("            {}", v.file.blue());
                if let Some(line) = v.line {
                    print!("{}", format!(":{}", line).dimmed());
                }
                println!();
                println!("              {}", v.message);
            }
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("  {} ({}):", "Warnings".yellow(), report.warnings.len());
        for warning in &report.warnings {
            println!("    {}", warning);
        }
        println!();
    }

    write_final_status(verdict);
    println!();
}

fn write_summary(report: &Report, verdict: &Verdict) {
    let s = &report.summary;
    if verdict.passed {
        print!("  {}", "✓ PASS".green());
    } else {
        print!("  {}", "✗ FAIL".red());
    }

    print!("  Compliance: ");
    write_colored_score(s.compliance_score);
    println!("%");
    println!();

    println!(
        "    {} present  {} missing  {} extra  {} draft  {} unanalyzable",
        s.present.to_string().green(),
        colored_count(s.missing),
        colored_count(s.extra),
        s.draft.to_string().dimmed(),
        s.unanalyzable.to_string().dimmed(),
    );
    if s.deprecated > 0 {
        println!("    {} deprecated routes still present", s.deprecated.to_string().yellow());
    }
    if s.contracts_checked > 0 {
        println!(
            "    {} contracts checked, {} violated",
            s.contracts_checked,
            colored_count(s.contract_violations)
        );
    }
    if let (Some(checked), Some(failed)) = (s.constraints_checked, s.constraints_failed) {
        println!("    {} constraints checked, {} failed", checked, colored_count(failed));
    }
}

fn colored_count(n: usize) -> ColoredString {
    if n == 0 {
        n.to_string().green()
    } else {
        n.to_string().red()
    }
}

fn write_colored_score(score: f64) {
    let text = format!("{:.1}", score);
    match score {
        s if s >= 100.0 => print!("{}", text.green().bold()),
        s if s >= 90.0 => print!("{}", text.green()),
        s if s >= 70.0 => print!("{}", text.yellow()),
        _ => print!("{}", text.red()),
    }
}

fn write_features(report: &Report) {
    println!("  {} ({}):", "Features".bold(), report.features.len());
    println!();

    for row in &report.features {
        let tag = match row.result {
            Classification::Present if !row.contract_violations.is_empty() => "PRESENT".yellow(),
            Classification::Present => "PRESENT".green(),
            Classification::Missing => "MISSING".red(),
            Classification::Draft => "DRAFT  ".dimmed(),
            Classification::Unanalyzable => "N/A    ".dimmed(),
        };
        print!("    {} {:<24}", tag, row.id);

        if let (Some(method), Some(path)) = (&row.method, &row.path) {
            print!("{:<8}{}", method, path);
        } else {
            print!("{}", row.kind.dimmed());
        }
        if let Some(file) = &row.implemented_in {
            print!("  {}", file.blue());
            if let Some(line) = row.line {
                print!("{}", format!(":{}", line).dimmed());
            }
        }
        if row.deprecated {
            print!("  {}", "(deprecated)".yellow());
        }
        println!();

        for v in &row.contract_violations {
            println!("            {} {}", "contract:".yellow(), v.message);
        }
    }
}

fn write_extras(report: &Report) {
    println!(
        "  {} ({}):",
        "Undeclared routes".bold(),
        report.extra_features.len()
    );
    println!();

    for extra in &report.extra_features {
        print!("    {} {:<8}{}", "EXTRA  ".red(), extra.method, extra.path);
        print!("  {}", extra.file.blue());
        if let Some(line) = extra.line {
            print!("{}", format!(":{}", line).dimmed());
        }
        println!();
    }
}

fn write_final_status(verdict: &Verdict) {
    if let Some(threshold) = verdict.threshold {
        print!("  {}", format!("Threshold: {:.1}", threshold).dimmed());
        print!("  Score: ");
        write_colored_score(verdict.score);
        print!("  ");
    } else if verdict.has_drift {
        print!("  {}  ", "Drift detected".yellow());
    } else {
        print!("  {}  ", "No drift".green());
    }

    if verdict.passed {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}

/// Write a diff in pretty format.
pub fn write_diff_pretty(diff: &DiffResult) {
    println!();
    print!("  ");
    print!("{}", "intentcheck diff".cyan().bold());
    println!();
    println!();

    print!("  Compliance: ");
    write_colored_score(diff.score.before);
    print!(" → ");
    write_colored_score(diff.score.after);
    let delta = format!("{:+.1}", diff.score.delta);
    if diff.score.delta < 0.0 {
        println!("  ({})", delta.red());
    } else if diff.score.delta > 0.0 {
        println!("  ({})", delta.green());
    } else {
        println!("  ({})", delta.dimmed());
    }
    println!();

    if diff.is_unchanged() {
        println!("  {}", "No changes".dimmed());
        println!();
        return;
    }

    write_id_list("Newly present", &diff.newly_present, |s| s.green());
    write_id_list("Newly missing", &diff.newly_missing, |s| s.red());
    write_id_list("Still missing", &diff.still_missing, |s| s.yellow());
    write_id_list("New features", &diff.new_features, |s| s.normal());
    write_id_list("Removed features", &diff.removed_features, |s| s.dimmed());
    write_extra_list("New extras", &diff.new_extras, |s| s.red());
    write_extra_list("Resolved extras", &diff.resolved_extras, |s| s.green());
    write_id_list("Newly failed constraints", &diff.newly_failed_constraints, |s| s.red());
    write_id_list("Resolved constraints", &diff.resolved_constraints, |s| s.green());
}

fn write_id_list(title: &str, ids: &[String], paint: fn(&str) -> ColoredString) {
    if ids.is_empty() {
        return;
    }
    println!("  {} ({}):", title.bold(), ids.len());
    for id in ids {
        println!("    {}", paint(id));
    }
    println!();
}

fn write_extra_list(title: &str, extras: &[ExtraKey], paint: fn(&str) -> ColoredString) {
    if extras.is_empty() {
        return;
    }
    println!("  {} ({}):", title.bold(), extras.len());
    for extra in extras {
        println!("    {}", paint(&format!("{:<8}{}", extra.method, extra.path)));
    }
    println!();
}
