//! Run-to-run report comparison.
//!
//! Features are joined by id, extras by their literal (method, path) pair,
//! and constraints by id. Array positions are never used.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::Report;
use crate::constraint::ConstraintStatus;
use crate::matcher::Classification;

/// Literal (method, path) identity of an extra route.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtraKey {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreChange {
    pub before: f64,
    pub after: f64,
    pub delta: f64,
}

/// Comparison of two reports. All id lists are sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub newly_present: Vec<String>,
    pub newly_missing: Vec<String>,
    pub still_missing: Vec<String>,
    pub new_features: Vec<String>,
    pub removed_features: Vec<String>,
    pub new_extras: Vec<ExtraKey>,
    pub resolved_extras: Vec<ExtraKey>,
    pub newly_failed_constraints: Vec<String>,
    pub resolved_constraints: Vec<String>,
    pub score: ScoreChange,
}

impl DiffResult {
    /// True when nothing moved between the two reports.
    pub fn is_unchanged(&self) -> bool {
        self.newly_present.is_empty()
            && self.newly_missing.is_empty()
            && self.new_features.is_empty()
            && self.removed_features.is_empty()
            && self.new_extras.is_empty()
            && self.resolved_extras.is_empty()
            && self.newly_failed_constraints.is_empty()
            && self.resolved_constraints.is_empty()
            && self.score.delta == 0.0
    }

    /// True when the newer report introduced regressions.
    pub fn has_regressions(&self) -> bool {
        !self.newly_missing.is_empty()
            || !self.new_extras.is_empty()
            || !self.newly_failed_constraints.is_empty()
    }
}

fn extra_keys(report: &Report) -> BTreeSet<ExtraKey> {
    report
        .extra_features
        .iter()
        .map(|e| ExtraKey {
            method: e.method.clone(),
            path: e.path.clone(),
        })
        .collect()
}

fn constraint_statuses(report: &Report) -> BTreeMap<&str, ConstraintStatus> {
    report
        .constraints
        .iter()
        .flat_map(|c| c.results.iter())
        .map(|r| (r.id.as_str(), r.status))
        .collect()
}

/// Compare a previous report against a current one.
pub fn diff(before: &Report, after: &Report) -> DiffResult {
    let old: BTreeMap<&str, Classification> = before
        .features
        .iter()
        .map(|f| (f.id.as_str(), f.result))
        .collect();
    let new: BTreeMap<&str, Classification> = after
        .features
        .iter()
        .map(|f| (f.id.as_str(), f.result))
        .collect();

    let mut result = DiffResult {
        newly_present: Vec::new(),
        newly_missing: Vec::new(),
        still_missing: Vec::new(),
        new_features: Vec::new(),
        removed_features: Vec::new(),
        new_extras: Vec::new(),
        resolved_extras: Vec::new(),
        newly_failed_constraints: Vec::new(),
        resolved_constraints: Vec::new(),
        score: ScoreChange {
            before: before.summary.compliance_score,
            after: after.summary.compliance_score,
            delta: crate::score::round1(
                after.summary.compliance_score - before.summary.compliance_score,
            ),
        },
    };

    for (id, now) in &new {
        let Some(was) = old.get(id) else {
            result.new_features.push(id.to_string());
            continue;
        };
        match (was, now) {
            (Classification::Missing, Classification::Present) => {
                result.newly_present.push(id.to_string())
            }
            (Classification::Present, Classification::Missing) => {
                result.newly_missing.push(id.to_string())
            }
            (Classification::Missing, Classification::Missing) => {
                result.still_missing.push(id.to_string())
            }
            _ => {}
        }
    }
    result.removed_features = old
        .keys()
        .filter(|id| !new.contains_key(*id))
        .map(|id| id.to_string())
        .collect();

    let old_extras = extra_keys(before);
    let new_extras = extra_keys(after);
    result.new_extras = new_extras.difference(&old_extras).cloned().collect();
    result.resolved_extras = old_extras.difference(&new_extras).cloned().collect();

    let old_constraints = constraint_statuses(before);
    for (id, status) in constraint_statuses(after) {
        let was_failed = old_constraints.get(id) == Some(&ConstraintStatus::Failed);
        let is_failed = status == ConstraintStatus::Failed;
        if is_failed && !was_failed {
            result.newly_failed_constraints.push(id.to_string());
        } else if was_failed && status == ConstraintStatus::Passed {
            result.resolved_constraints.push(id.to_string());
        }
    }

    result
}
