//! End-to-end scenarios over small generated projects.

use std::fs;
use std::path::{Path, PathBuf};

use intentcheck::analyzer::{normalize_path, AnalysisContext, PluginCatalog};
use intentcheck::config::Config;
use intentcheck::engine::{Reconciler, RunMeta};
use intentcheck::intent::IntentDocument;
use intentcheck::matcher::Classification;
use intentcheck::report::Report;
use intentcheck::scanner;
use tempfile::TempDir;

/// Write `files` under a fresh temp dir.
fn project(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (name, content) in files {
        let path = temp.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    temp
}

fn reconcile(root: &Path, intent: &str) -> Report {
    let intent = IntentDocument::parse_str(intent).expect("should parse intent");
    let config = Config::default();
    let reconciler = Reconciler::from_config(&config, &PluginCatalog::new());
    let files: Vec<PathBuf> =
        scanner::scan_files(root, &config.exclude, &reconciler.registry().wanted_extensions())
            .unwrap();
    let ctx = AnalysisContext::new(root);
    reconciler
        .reconcile(&intent, &ctx, &files, RunMeta::default())
        .unwrap()
}

const GET_USERS: &str = r#"
version: "1.0"
features:
  - id: get-users
    type: http-route
    method: GET
    path: /users
"#;

#[test]
fn test_declared_route_present() {
    let temp = project(&[("app.js", "app.get(\"/users\", handler);\n")]);
    let report = reconcile(temp.path(), GET_USERS);

    let row = report.feature("get-users").unwrap();
    assert_eq!(row.result, Classification::Present);
    assert_eq!(row.implemented_in.as_deref(), Some("app.js"));
    assert_eq!(report.summary.compliance_score, 100.0);
    assert!(!report.drift.has_drift);
}

#[test]
fn test_wrong_route_is_missing_and_extra() {
    let temp = project(&[("app.js", "app.get(\"/items\", handler);\n")]);
    let report = reconcile(temp.path(), GET_USERS);

    assert_eq!(report.feature("get-users").unwrap().result, Classification::Missing);
    assert_eq!(report.extra_features.len(), 1);
    assert_eq!(report.extra_features[0].path, "/items");
    assert_eq!(report.summary.compliance_score, 0.0);
    assert!(report.drift.has_drift);
}

#[test]
fn test_no_features_scores_vacuously() {
    let temp = project(&[("app.js", "const x = 1;\n")]);
    let report = reconcile(temp.path(), "version: \"1.0\"\nfeatures: []\n");

    assert_eq!(report.summary.declared, 0);
    assert_eq!(report.summary.compliance_score, 100.0);
    assert!(!report.drift.has_drift);
}

#[test]
fn test_draft_never_counts() {
    let source = "app.get(\"/users\", handler);\napp.get(\"/search\", search);\n";
    let temp = project(&[("app.js", source)]);
    let intent = r#"
version: "1.0"
features:
  - id: get-users
    type: http-route
    method: GET
    path: /users
  - id: search
    type: http-route
    method: GET
    path: /search
    status: draft
"#;
    let report = reconcile(temp.path(), intent);

    assert_eq!(report.feature("search").unwrap().result, Classification::Draft);
    assert_eq!(report.summary.analyzed, 1);
    assert_eq!(report.summary.missing, 0);
    assert_eq!(report.summary.compliance_score, 100.0);
    assert!(report.extra_features.is_empty());
    assert!(!report.drift.has_drift);
}

#[test]
fn test_chained_route_declarations() {
    let source = "router.route(\"/users\")\n  .get(listUsers)\n  .post(createUser);\n";
    let temp = project(&[("src/app.js", source)]);
    let intent = r#"
version: "1.0"
features:
  - id: list-users
    type: http-route
    method: GET
    path: /users
  - id: create-user
    type: http-route
    method: post
    path: /users
"#;
    let report = reconcile(temp.path(), intent);

    let list = report.feature("list-users").unwrap();
    let create = report.feature("create-user").unwrap();
    assert_eq!(list.result, Classification::Present);
    assert_eq!(create.result, Classification::Present);
    assert_eq!(list.implemented_in.as_deref(), Some("src/app.js"));
    assert_eq!(list.implemented_in, create.implemented_in);
    assert_eq!(list.line, create.line);
    assert!(report.extra_features.is_empty());
}

#[test]
fn test_typescript_and_tsx_sources() {
    let temp = project(&[
        (
            "routes.ts",
            "import { Router } from 'express';\nconst router: Router = Router();\nrouter.get('/users', (req, res) => res.send([]));\n",
        ),
        (
            "view.tsx",
            "const page = <div>hi</div>;\napp.get('/page', (req, res) => res.send(page));\n",
        ),
    ]);
    let intent = r#"
version: "1.0"
features:
  - id: get-users
    type: http-route
    method: GET
    path: /users
  - id: page
    type: http-route
    method: GET
    path: /page
"#;
    let report = reconcile(temp.path(), intent);

    assert_eq!(report.feature("get-users").unwrap().implemented_in.as_deref(), Some("routes.ts"));
    assert_eq!(report.feature("get-users").unwrap().line, Some(3));
    assert_eq!(report.feature("page").unwrap().implemented_in.as_deref(), Some("view.tsx"));
}

#[test]
fn test_scoped_middleware_constraint() {
    let source = "\
app.get(\"/api/a\", authenticate, handlerA);
app.get(\"/api/b\", handlerB);
app.get(\"/health\", health);
";
    let temp = project(&[("app.js", source)]);
    let intent = r#"
version: "1.0"
features:
  - id: api-auth
    type: constraint
    rule: routes-require-middleware
    scope: /api/*
    middleware: authenticate
"#;
    let report = reconcile(temp.path(), intent);

    let result = &report.constraints.as_ref().unwrap().results[0];
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].line, Some(2));
    assert!(result.violations[0].message.contains("/api/b"));
    assert!(!result.violations.iter().any(|v| v.message.contains("/health")));
    assert_eq!(report.drift.failed_constraints, 1);
    assert_eq!(report.drift.constraint_violations, 1);

    // Constraints never move the score.
    assert_eq!(report.summary.compliance_score, 100.0);
}

#[test]
fn test_async_handlers_need_try() {
    let source = "\
app.get(\"/a\", async (req, res) => {
  const data = await load();
  res.json(data);
});

app.get(\"/b\", async (req, res) => {
  try {
    res.json(await load());
  } catch (err) {
    res.status(500).end();
  }
});
";
    let temp = project(&[("app.js", source)]);
    let intent = r#"
version: "1.0"
features:
  - id: async-catch
    type: constraint
    rule: async-error-handling
    scope: "*"
"#;
    let report = reconcile(temp.path(), intent);

    let result = &report.constraints.as_ref().unwrap().results[0];
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].file, "app.js");
    assert_eq!(result.violations[0].line, Some(1));
}

#[test]
fn test_unknown_rule_is_skipped_with_warning() {
    let temp = project(&[("app.js", "app.get(\"/users\", handler);\n")]);
    let intent = r#"
version: "1.0"
features:
  - id: mystery
    type: constraint
    rule: no-such-rule
    scope: "*"
"#;
    let report = reconcile(temp.path(), intent);

    assert_eq!(report.summary.constraints_skipped, Some(1));
    assert_eq!(report.summary.constraints_checked, Some(0));
    assert_eq!(report.drift.failed_constraints, 0);
    assert!(report.warnings.iter().any(|w| w.contains("no-such-rule")));
}

#[test]
fn test_unparseable_file_does_not_abort() {
    let temp = project(&[
        ("broken.js", "app.get(\"/broken\", (req, res) => {\n"),
        ("app.js", "app.get(\"/users\", handler);\n"),
    ]);
    let report = reconcile(temp.path(), GET_USERS);

    assert_eq!(report.feature("get-users").unwrap().result, Classification::Present);
}

#[test]
fn test_normalization_is_idempotent() {
    for path in ["/users/:id", "/users/{id}/", "users/:id?", "/a//b/:x/c", "/"] {
        let once = normalize_path(path);
        assert_eq!(normalize_path(&once), once, "not idempotent for {}", path);
    }
    assert_eq!(normalize_path("/users/:userId"), normalize_path("/users/{id}"));
}
