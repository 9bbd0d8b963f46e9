//! Cross-cutting architectural constraints.
//!
//! Constraints are declared features with `type: constraint`, a `rule`
//! name and a `scope`. They are evaluated after feature matching, over the
//! implementations that matching discovered, and never affect the
//! present/missing counts or the compliance score.

mod rules;
mod scope;
mod types;

use std::collections::BTreeMap;

pub use rules::{
    builtin_rules, AsyncErrorHandling, ConstraintRule, NoDirectImport, RoutesRequireMiddleware,
    RuleContext, ASYNC_ERROR_HANDLING, NO_DIRECT_IMPORT, ROUTES_REQUIRE_MIDDLEWARE,
};
pub use scope::Scope;
pub use types::{
    ConstraintOutcome, ConstraintResult, ConstraintStatus, ConstraintSummary, ConstraintViolation,
};

use crate::intent::Feature;

/// Rule table plus the evaluation loop.
pub struct ConstraintEngine {
    rules: BTreeMap<&'static str, Box<dyn ConstraintRule>>,
}

impl Default for ConstraintEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintEngine {
    /// Create an engine with every built-in rule.
    pub fn new() -> Self {
        let mut engine = Self {
            rules: BTreeMap::new(),
        };
        for rule in builtin_rules() {
            engine.register(rule);
        }
        engine
    }

    /// Add or replace a rule.
    pub fn register(&mut self, rule: Box<dyn ConstraintRule>) {
        self.rules.insert(rule.name(), rule);
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.keys().copied()
    }

    /// Evaluate every constraint feature in declaration order.
    ///
    /// Draft constraints and unknown rules are skipped. A rule that errors
    /// is skipped with a warning.
    pub fn evaluate<'a>(
        &self,
        features: impl IntoIterator<Item = &'a Feature>,
        ctx: &RuleContext,
    ) -> ConstraintOutcome {
        let mut outcome = ConstraintOutcome::default();

        for feature in features.into_iter().filter(|f| f.is_constraint()) {
            let rule_name = feature.rule.as_deref().unwrap_or_default();
            let raw_scope = feature.scope.as_deref().unwrap_or("*");

            if feature.is_draft() {
                outcome.results.push(ConstraintResult::skipped(
                    &feature.id,
                    rule_name,
                    raw_scope,
                    "draft",
                ));
                continue;
            }

            let Some(rule) = self.rules.get(rule_name) else {
                let warning = format!("constraint {}: unknown rule {:?}", feature.id, rule_name);
                tracing::warn!(constraint = %feature.id, rule = rule_name, "unknown rule");
                outcome.warnings.push(warning);
                outcome.results.push(ConstraintResult::skipped(
                    &feature.id,
                    rule_name,
                    raw_scope,
                    "unknown rule",
                ));
                continue;
            };

            let scope = Scope::parse(raw_scope);
            match rule.evaluate(feature, &scope, ctx) {
                Ok(mut violations) => {
                    violations.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
                    tracing::debug!(
                        constraint = %feature.id,
                        violations = violations.len(),
                        "evaluated constraint"
                    );
                    outcome.results.push(ConstraintResult::evaluated(
                        &feature.id,
                        rule_name,
                        raw_scope,
                        violations,
                    ));
                }
                Err(e) => {
                    tracing::warn!(constraint = %feature.id, error = %e, "constraint evaluation failed");
                    outcome
                        .warnings
                        .push(format!("constraint {} could not be evaluated: {:#}", feature.id, e));
                    outcome.results.push(ConstraintResult::skipped(
                        &feature.id,
                        rule_name,
                        raw_scope,
                        format!("evaluation failed: {}", e),
                    ));
                }
            }
        }

        outcome
    }
}
