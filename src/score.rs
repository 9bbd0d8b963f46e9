//! Compliance scoring and pass/fail verdicts.

use crate::report::Report;

/// Score reported when nothing was analyzed.
pub const VACUOUS_SCORE: f64 = 100.0;

/// Percentage of analyzed features found present, rounded to one decimal.
///
/// 100 when `present + missing == 0`.
pub fn compliance_score(present: usize, missing: usize) -> f64 {
    let analyzed = present + missing;
    if analyzed == 0 {
        return VACUOUS_SCORE;
    }
    round1(present as f64 / analyzed as f64 * 100.0)
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Whether any drift signal is present.
pub fn has_drift(
    missing: usize,
    extra: usize,
    contract_violations: usize,
    failed_constraints: usize,
) -> bool {
    missing > 0 || extra > 0 || contract_violations > 0 || failed_constraints > 0
}

/// Result of gating a report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub score: f64,
    pub threshold: Option<f64>,
    pub has_drift: bool,
    pub passed: bool,
}

/// Gate a report.
///
/// Without a threshold any drift fails. With one, only the compliance
/// score is gated.
pub fn evaluate(report: &Report, threshold: Option<f64>) -> Verdict {
    let score = report.summary.compliance_score;
    let has_drift = report.drift.has_drift;

    let passed = match threshold {
        None => !has_drift,
        Some(min) => score >= min,
    };

    Verdict {
        score,
        threshold,
        has_drift,
        passed,
    }
}
