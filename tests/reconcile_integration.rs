//! Integration tests for the full reconciliation pipeline.
//!
//! These tests run the default reconciler against the `testdata/shop`
//! fixture service and check the resulting report.

use std::path::PathBuf;

use intentcheck::analyzer::{AnalysisContext, PluginCatalog};
use intentcheck::config::Config;
use intentcheck::constraint::ConstraintStatus;
use intentcheck::engine::{Reconciler, RunMeta};
use intentcheck::intent::IntentDocument;
use intentcheck::matcher::Classification;
use intentcheck::report::Report;
use intentcheck::scanner;
use intentcheck::score;

fn shop_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("shop")
}

/// Scan the fixture and reconcile it against its intent document.
fn run_shop() -> Report {
    let root = shop_path();
    let intent = IntentDocument::parse_file(root.join("intent.yaml")).expect("should parse intent");

    let config = Config::default();
    let reconciler = Reconciler::from_config(&config, &PluginCatalog::new());
    let files = scanner::scan_files(&root, &config.exclude, &reconciler.registry().wanted_extensions())
        .expect("should scan fixture");
    assert_eq!(files.len(), 3, "expected app.js, lib/db.js and routes/orders.ts");

    let ctx = AnalysisContext::new(&root);
    let meta = RunMeta {
        intent_file: "intent.yaml".to_string(),
        timestamp: "2024-06-01T12:00:00Z".to_string(),
    };
    reconciler
        .reconcile(&intent, &ctx, &files, meta)
        .expect("reconcile should succeed")
}

#[test]
fn test_summary_counts() {
    let report = run_shop();
    let summary = &report.summary;

    assert_eq!(summary.declared, 9);
    assert_eq!(summary.present, 6);
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.analyzed, 7);
    assert_eq!(summary.draft, 1);
    assert_eq!(summary.unanalyzable, 1);
    assert_eq!(summary.deprecated, 1);
    assert_eq!(summary.extra, 1);
    assert_eq!(summary.compliance_score, 85.7);
    assert_eq!(summary.contracts_checked, 3);
    assert_eq!(summary.contract_violations, 1);
}

#[test]
fn test_feature_classifications() {
    let report = run_shop();

    let expected = [
        ("health", Classification::Present),
        ("list-users", Classification::Present),
        ("create-user", Classification::Present),
        ("get-user", Classification::Present),
        ("list-orders", Classification::Present),
        ("create-order", Classification::Present),
        ("delete-user", Classification::Missing),
        ("export-users", Classification::Draft),
        ("order-feed", Classification::Unanalyzable),
    ];
    let actual: Vec<(&str, Classification)> = report
        .features
        .iter()
        .map(|row| (row.id.as_str(), row.result))
        .collect();
    assert_eq!(actual, expected.to_vec(), "rows keep declared order");
}

#[test]
fn test_present_route_reports_location() {
    let report = run_shop();

    let health = report.feature("health").unwrap();
    assert_eq!(health.implemented_in.as_deref(), Some("src/app.js"));
    assert_eq!(health.line, Some(7));
    assert_eq!(health.analyzer.as_deref(), Some("express-routes"));

    let orders = report.feature("create-order").unwrap();
    assert_eq!(orders.implemented_in.as_deref(), Some("src/routes/orders.ts"));
    assert_eq!(orders.line, Some(13));
}

#[test]
fn test_chained_routes_share_location() {
    let report = run_shop();

    let list = report.feature("list-users").unwrap();
    let create = report.feature("create-user").unwrap();
    assert_eq!(list.implemented_in.as_deref(), Some("src/app.js"));
    assert_eq!(list.implemented_in, create.implemented_in);
    assert_eq!(list.line, Some(9));
    assert_eq!(list.line, create.line);
}

#[test]
fn test_parameter_names_are_ignored() {
    let report = run_shop();

    let row = report.feature("get-user").unwrap();
    assert_eq!(row.result, Classification::Present);
    assert!(row.deprecated);
    assert_eq!(row.line, Some(13));
}

#[test]
fn test_contract_violation_on_unauthenticated_route() {
    let report = run_shop();

    let list_users = report.feature("list-users").unwrap();
    assert!(list_users.contract_violations.is_empty());

    let list_orders = report.feature("list-orders").unwrap();
    assert_eq!(list_orders.contract_violations.len(), 1);
    let violation = &list_orders.contract_violations[0];
    assert_eq!(violation.field, "auth");
    assert_eq!(violation.expected, "required");
    assert_eq!(violation.actual, "none");
}

#[test]
fn test_undeclared_route_is_extra() {
    let report = run_shop();

    assert_eq!(report.extra_features.len(), 1);
    let extra = &report.extra_features[0];
    assert_eq!(extra.method, "GET");
    assert_eq!(extra.path, "/debug/vars");
    assert_eq!(extra.file, "src/app.js");
    assert_eq!(extra.line, Some(15));
}

#[test]
fn test_constraint_results() {
    let report = run_shop();
    let section = report.constraints.as_ref().expect("constraints were declared");

    let statuses: Vec<(&str, ConstraintStatus)> = section
        .results
        .iter()
        .map(|r| (r.id.as_str(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("api-requires-auth", ConstraintStatus::Failed),
            ("admin-requires-auth", ConstraintStatus::Passed),
            ("no-db-in-routes", ConstraintStatus::Failed),
            ("async-handlers-catch", ConstraintStatus::Failed),
            ("no-orm-in-routes", ConstraintStatus::Skipped),
        ]
    );

    assert_eq!(report.summary.constraints_checked, Some(4));
    assert_eq!(report.summary.constraints_passed, Some(1));
    assert_eq!(report.summary.constraints_failed, Some(3));
    assert_eq!(report.summary.constraints_skipped, Some(1));
}

#[test]
fn test_middleware_rule_flags_only_scoped_routes() {
    let report = run_shop();
    let section = report.constraints.as_ref().unwrap();
    let result = section.results.iter().find(|r| r.id == "api-requires-auth").unwrap();

    // POST /api/orders has authenticate, GET does not; /health is out of scope.
    assert_eq!(result.violations.len(), 1);
    let violation = &result.violations[0];
    assert_eq!(violation.file, "src/routes/orders.ts");
    assert_eq!(violation.line, Some(8));
    assert!(violation.message.contains("/api/orders"));
}

#[test]
fn test_forbidden_import_only_in_route_files() {
    let report = run_shop();
    let section = report.constraints.as_ref().unwrap();
    let result = section.results.iter().find(|r| r.id == "no-db-in-routes").unwrap();

    // src/lib/db.js also imports pg but defines no routes.
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].file, "src/routes/orders.ts");
    assert_eq!(result.violations[0].line, Some(2));
}

#[test]
fn test_async_handler_without_try() {
    let report = run_shop();
    let section = report.constraints.as_ref().unwrap();
    let result = section
        .results
        .iter()
        .find(|r| r.id == "async-handlers-catch")
        .unwrap();

    // The POST handler wraps its body in try/catch.
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].file, "src/routes/orders.ts");
    assert_eq!(result.violations[0].line, Some(8));
}

#[test]
fn test_drift_and_verdict() {
    let report = run_shop();

    assert!(report.drift.has_drift);
    assert_eq!(report.drift.missing, 1);
    assert_eq!(report.drift.extra, 1);
    assert_eq!(report.drift.contract_violations, 1);
    assert_eq!(report.drift.failed_constraints, 3);
    assert_eq!(report.drift.constraint_violations, 3);

    assert!(!score::evaluate(&report, None).passed);
    assert!(score::evaluate(&report, Some(80.0)).passed);
    assert!(!score::evaluate(&report, Some(90.0)).passed);
}

#[test]
fn test_report_meta() {
    let report = run_shop();

    assert_eq!(report.version, "1.0");
    assert_eq!(report.meta.intent_file, "intent.yaml");
    assert_eq!(report.meta.intent_version, "1.0");
    assert_eq!(report.meta.timestamp, "2024-06-01T12:00:00Z");
    assert_eq!(report.meta.analyzers, vec!["express-routes"]);
    assert!(report.warnings.is_empty(), "unexpected warnings: {:?}", report.warnings);
}

#[test]
fn test_runs_are_deterministic() {
    assert_eq!(run_shop(), run_shop());
}
