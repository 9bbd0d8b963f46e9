//! Versioned compliance report.
//!
//! Built fresh on every run from matcher and constraint output. Reports are
//! plain serde data so a saved JSON report can be loaded and diffed later.

mod diff;
mod output;

use serde::{Deserialize, Serialize};

pub use diff::{diff, DiffResult, ExtraKey, ScoreChange};
pub use output::{to_json, write_diff_json, write_diff_pretty, write_json, write_pretty};

use crate::analyzer::{ContractViolation, Implementation};
use crate::constraint::{ConstraintOutcome, ConstraintResult};
use crate::intent::FeatureStatus;
use crate::matcher::{Classification, MatchOutcome};
use crate::score;

/// Report format version.
pub const REPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub version: String,
    pub meta: ReportMeta,
    pub summary: Summary,
    pub features: Vec<FeatureRow>,
    pub extra_features: Vec<ExtraFeature>,
    pub drift: Drift,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<ConstraintSection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub intent_file: String,
    pub intent_version: String,
    /// Caller-supplied timestamp; the engine never reads the clock.
    pub timestamp: String,
    pub analyzers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Declared non-constraint features.
    pub declared: usize,
    /// present + missing.
    pub analyzed: usize,
    pub present: usize,
    pub missing: usize,
    pub extra: usize,
    pub draft: usize,
    /// Present features whose status is deprecated.
    pub deprecated: usize,
    pub unanalyzable: usize,
    pub contracts_checked: usize,
    pub contract_violations: usize,
    pub compliance_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints_checked: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints_passed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints_failed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints_skipped: Option<usize>,
}

/// One row per declared feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRow {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: FeatureStatus,
    pub result: Classification,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implemented_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contract_violations: Vec<ContractViolation>,
}

/// An implementation matched to no declared feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub method: String,
    pub path: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub analyzer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
}

impl From<&Implementation> for ExtraFeature {
    fn from(imp: &Implementation) -> Self {
        Self {
            kind: imp.kind.clone(),
            method: imp.method.clone(),
            path: imp.path.clone(),
            file: imp.file.clone(),
            line: imp.line,
            analyzer: imp.analyzer.clone(),
            middleware: imp.middleware.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drift {
    pub has_drift: bool,
    pub missing: usize,
    pub extra: usize,
    pub contract_violations: usize,
    pub constraint_violations: usize,
    pub failed_constraints: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSection {
    pub results: Vec<ConstraintResult>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Report {
    /// Aggregate matcher and constraint output into a report.
    ///
    /// `constraints` is `None` when the intent declared no constraints.
    pub fn build(
        meta: ReportMeta,
        matched: &MatchOutcome,
        constraints: Option<&ConstraintOutcome>,
        warnings: Vec<String>,
    ) -> Self {
        let present = matched.count(Classification::Present);
        let missing = matched.count(Classification::Missing);
        let contract_violations: usize = matched
            .features
            .iter()
            .map(|f| f.contract_violations.len())
            .sum();

        let mut summary = Summary {
            declared: matched.features.len(),
            analyzed: present + missing,
            present,
            missing,
            extra: matched.extras.len(),
            draft: matched.count(Classification::Draft),
            deprecated: matched.features.iter().filter(|f| f.deprecated).count(),
            unanalyzable: matched.count(Classification::Unanalyzable),
            contracts_checked: matched.features.iter().filter(|f| f.contract_checked).count(),
            contract_violations,
            compliance_score: score::compliance_score(present, missing),
            ..Default::default()
        };

        let (failed_constraints, constraint_violations) = match constraints {
            Some(outcome) => {
                let counts = outcome.summary();
                summary.constraints_checked = Some(counts.checked);
                summary.constraints_passed = Some(counts.passed);
                summary.constraints_failed = Some(counts.failed);
                summary.constraints_skipped = Some(counts.skipped);
                (counts.failed, outcome.violations().count())
            }
            None => (0, 0),
        };

        let drift = Drift {
            has_drift: score::has_drift(
                missing,
                summary.extra,
                contract_violations,
                failed_constraints,
            ),
            missing,
            extra: summary.extra,
            contract_violations,
            constraint_violations,
            failed_constraints,
        };

        let features = matched
            .features
            .iter()
            .map(|f| FeatureRow {
                id: f.feature.id.clone(),
                kind: f.feature.kind.clone(),
                status: f.feature.status,
                result: f.classification,
                deprecated: f.deprecated,
                method: f.feature.method.clone(),
                path: f.feature.path.clone(),
                implemented_in: f.implemented_in.clone(),
                line: f.line,
                analyzer: f.analyzer.clone(),
                contract_violations: f.contract_violations.clone(),
            })
            .collect();

        Self {
            version: REPORT_VERSION.to_string(),
            meta,
            summary,
            features,
            extra_features: matched.extras.iter().map(ExtraFeature::from).collect(),
            drift,
            constraints: constraints.map(|c| ConstraintSection {
                results: c.results.clone(),
            }),
            warnings,
        }
    }

    /// Look up a feature row by id.
    pub fn feature(&self, id: &str) -> Option<&FeatureRow> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Load a previously saved JSON report.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read report {}: {}", path.display(), e))?;
        let report = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("failed to parse report {}: {}", path.display(), e))?;
        Ok(report)
    }
}
