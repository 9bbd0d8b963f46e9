//! Reconciliation engine.
//!
//! Wires the pipeline together: files → analyzers → (feature matcher,
//! constraint engine) → report. Every run builds a fresh report; nothing
//! is persisted here.

use std::path::PathBuf;

use crate::analyzer::{AnalysisContext, AnalyzerRegistry, AnalyzerRunner, PluginCatalog};
use crate::config::Config;
use crate::constraint::{ConstraintEngine, ConstraintRule, RuleContext};
use crate::intent::{self, IntentDocument, IntentError};
use crate::matcher::FeatureMatcher;
use crate::report::{Report, ReportMeta};

/// Caller-supplied run metadata.
#[derive(Debug, Clone, Default)]
pub struct RunMeta {
    /// Intent file path as it should appear in the report.
    pub intent_file: String,
    /// Timestamp to stamp on the report.
    pub timestamp: String,
}

/// Runs one reconciliation of an intent document against source files.
pub struct Reconciler {
    registry: AnalyzerRegistry,
    constraints: ConstraintEngine,
    auth_middleware: Vec<String>,
}

impl Reconciler {
    pub fn new(registry: AnalyzerRegistry, auth_middleware: Vec<String>) -> Self {
        Self {
            registry,
            constraints: ConstraintEngine::new(),
            auth_middleware,
        }
    }

    /// Build a reconciler from configuration.
    pub fn from_config(config: &Config, catalog: &PluginCatalog) -> Self {
        let registry = AnalyzerRegistry::from_config(&config.analyzers, catalog);
        Self::new(registry, config.auth_middleware.clone())
    }

    /// Add or replace a constraint rule.
    pub fn with_constraint_rule(mut self, rule: Box<dyn ConstraintRule>) -> Self {
        self.constraints.register(rule);
        self
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    /// Reconcile `intent` against `files`.
    ///
    /// Invalid intent documents are rejected before anything runs. Analyzer
    /// failures, unknown rules and unparseable files become warnings.
    pub fn reconcile(
        &self,
        intent: &IntentDocument,
        ctx: &AnalysisContext,
        files: &[PathBuf],
        meta: RunMeta,
    ) -> Result<Report, IntentError> {
        intent::validate(intent)?;

        let run = AnalyzerRunner::new(&self.registry, ctx).run(files);
        tracing::debug!(implementations = run.len(), "analysis complete");

        let matcher = FeatureMatcher::new(&self.registry, self.auth_middleware.iter().cloned());
        let matched = matcher.classify(&intent.features, &run);

        let constraints = if intent.constraints().next().is_some() {
            let implementations: Vec<_> = run.all().cloned().collect();
            let rule_ctx = RuleContext {
                analysis: ctx,
                implementations: &implementations,
            };
            Some(self.constraints.evaluate(&intent.features, &rule_ctx))
        } else {
            None
        };

        let mut warnings: Vec<String> = self.registry.warnings().to_vec();
        warnings.extend(run.warnings.iter().cloned());
        warnings.extend(matched.warnings.iter().cloned());
        if let Some(outcome) = &constraints {
            warnings.extend(outcome.warnings.iter().cloned());
        }

        let meta = ReportMeta {
            intent_file: meta.intent_file,
            intent_version: intent.version.clone(),
            timestamp: meta.timestamp,
            analyzers: self.registry.names(),
        };

        Ok(Report::build(meta, &matched, constraints.as_ref(), warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Feature;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_intent_stops_the_run() {
        let temp = TempDir::new().unwrap();
        let ctx = AnalysisContext::new(temp.path());
        let reconciler = Reconciler::from_config(&Config::default(), &PluginCatalog::new());

        let intent = IntentDocument {
            features: vec![Feature::route("dup", "GET", "/a"), Feature::route("dup", "GET", "/b")],
            ..Default::default()
        };
        let err = reconciler
            .reconcile(&intent, &ctx, &[], RunMeta::default())
            .unwrap_err();
        assert!(matches!(err, IntentError::DuplicateId { .. }));
    }

    #[test]
    fn test_reconcile_present_route() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("app.js");
        fs::write(&file, "app.get(\"/users\", handler);\n").unwrap();

        let ctx = AnalysisContext::new(temp.path());
        let reconciler = Reconciler::from_config(&Config::default(), &PluginCatalog::new());
        let intent = IntentDocument {
            version: "1.0".to_string(),
            features: vec![Feature::route("get-users", "GET", "/users")],
            ..Default::default()
        };
        let meta = RunMeta {
            intent_file: "intent.yaml".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        };

        let report = reconciler.reconcile(&intent, &ctx, &[file], meta).unwrap();
        let row = report.feature("get-users").unwrap();
        assert_eq!(row.implemented_in.as_deref(), Some("app.js"));
        assert_eq!(report.meta.intent_version, "1.0");
        assert_eq!(report.meta.analyzers, vec!["express-routes"]);
        assert!(!report.drift.has_drift);
        assert!(report.constraints.is_none());
    }
}
