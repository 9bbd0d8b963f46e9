//! Constraint result types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One architectural rule breach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintViolation {
    /// Id of the constraint feature that was breached.
    pub constraint: String,
    pub rule: String,
    pub message: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub expected: String,
    pub actual: String,
}

/// Evaluation status of one constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintStatus {
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for ConstraintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintStatus::Passed => write!(f, "passed"),
            ConstraintStatus::Failed => write!(f, "failed"),
            ConstraintStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Detail row for one declared constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintResult {
    pub id: String,
    pub rule: String,
    pub scope: String,
    pub status: ConstraintStatus,
    /// Why the constraint was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub violations: Vec<ConstraintViolation>,
}

impl ConstraintResult {
    pub fn skipped(id: &str, rule: &str, scope: &str, reason: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            rule: rule.to_string(),
            scope: scope.to_string(),
            status: ConstraintStatus::Skipped,
            reason: Some(reason.into()),
            violations: Vec::new(),
        }
    }

    pub fn evaluated(id: &str, rule: &str, scope: &str, violations: Vec<ConstraintViolation>) -> Self {
        let status = if violations.is_empty() {
            ConstraintStatus::Passed
        } else {
            ConstraintStatus::Failed
        };
        Self {
            id: id.to_string(),
            rule: rule.to_string(),
            scope: scope.to_string(),
            status,
            reason: None,
            violations,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ConstraintStatus::Failed
    }
}

/// Checked/passed/failed/skipped counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstraintSummary {
    /// Constraints actually evaluated (passed + failed).
    pub checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Everything the constraint engine produced in one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintOutcome {
    pub results: Vec<ConstraintResult>,
    pub warnings: Vec<String>,
}

impl ConstraintOutcome {
    pub fn summary(&self) -> ConstraintSummary {
        let mut summary = ConstraintSummary::default();
        for result in &self.results {
            match result.status {
                ConstraintStatus::Passed => summary.passed += 1,
                ConstraintStatus::Failed => summary.failed += 1,
                ConstraintStatus::Skipped => summary.skipped += 1,
            }
        }
        summary.checked = summary.passed + summary.failed;
        summary
    }

    /// All violations across every constraint, in result order.
    pub fn violations(&self) -> impl Iterator<Item = &ConstraintViolation> {
        self.results.iter().flat_map(|r| r.violations.iter())
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.is_failed())
    }
}
