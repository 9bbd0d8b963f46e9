//! Feature matcher.
//!
//! Classifies every declared (non-constraint) feature against the
//! implementations analyzers discovered, then reports undeclared
//! implementations as extras.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analyzer::{
    guarded, normalize_path, AnalyzerRegistry, ContractViolation, Implementation, RunOutput,
};
use crate::intent::{AuthRequirement, Feature, FeatureContract};

/// Terminal classification of one declared feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Present,
    Missing,
    Draft,
    Unanalyzable,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Present => write!(f, "present"),
            Classification::Missing => write!(f, "missing"),
            Classification::Draft => write!(f, "draft"),
            Classification::Unanalyzable => write!(f, "unanalyzable"),
        }
    }
}

/// Matcher output for one declared feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOutcome {
    pub feature: Feature,
    pub classification: Classification,
    /// Present, but declared deprecated.
    pub deprecated: bool,
    pub implemented_in: Option<String>,
    pub line: Option<usize>,
    pub analyzer: Option<String>,
    /// Whether a declared contract was evaluated against a match.
    pub contract_checked: bool,
    pub contract_violations: Vec<ContractViolation>,
    /// The implementation that satisfied the feature.
    pub matched: Option<Implementation>,
}

impl FeatureOutcome {
    fn terminal(feature: &Feature, classification: Classification) -> Self {
        Self {
            feature: feature.clone(),
            classification,
            deprecated: false,
            implemented_in: None,
            line: None,
            analyzer: None,
            contract_checked: false,
            contract_violations: Vec::new(),
            matched: None,
        }
    }
}

/// Everything the matcher produced in one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// One entry per declared non-constraint feature, in declaration order.
    pub features: Vec<FeatureOutcome>,
    /// Implementations not covered by any present or draft feature, sorted.
    pub extras: Vec<Implementation>,
    pub warnings: Vec<String>,
}

impl MatchOutcome {
    pub fn count(&self, classification: Classification) -> usize {
        self.features
            .iter()
            .filter(|f| f.classification == classification)
            .count()
    }
}

/// Evaluate a feature's contract against the implementation that matched it.
pub fn check_contract(
    contract: &FeatureContract,
    implementation: &Implementation,
    auth_middleware: &BTreeSet<String>,
) -> Vec<ContractViolation> {
    let mut violations = Vec::new();

    if let Some(auth) = contract.auth {
        let auth_present: Vec<&str> = implementation
            .middleware
            .iter()
            .filter(|m| auth_middleware.contains(*m))
            .map(|m| m.as_str())
            .collect();

        let actual = if auth_present.is_empty() {
            "none".to_string()
        } else {
            auth_present.join(", ")
        };

        match auth {
            AuthRequirement::Required if auth_present.is_empty() => {
                violations.push(ContractViolation {
                    field: "auth".to_string(),
                    expected: auth.to_string(),
                    actual,
                    message: format!(
                        "{} {} requires authentication middleware but has none",
                        implementation.method, implementation.path
                    ),
                });
            }
            AuthRequirement::None if !auth_present.is_empty() => {
                violations.push(ContractViolation {
                    field: "auth".to_string(),
                    expected: auth.to_string(),
                    message: format!(
                        "{} {} is declared public but uses authentication middleware: {}",
                        implementation.method, implementation.path, actual
                    ),
                    actual,
                });
            }
            _ => {}
        }
    }

    violations
}

/// Implementations with the feature's method and normalized path.
///
/// `file` narrows the search to the file an analyzer reported.
fn find_routes<'r>(
    feature: &'r Feature,
    implementations: &'r [Implementation],
    file: Option<&'r str>,
) -> impl Iterator<Item = &'r Implementation> + 'r {
    let wanted = match (feature.method.as_deref(), feature.path.as_deref()) {
        (Some(method), Some(path)) => Some((method, normalize_path(path))),
        _ => None,
    };
    implementations.iter().filter(move |imp| {
        let Some((method, path)) = &wanted else {
            return false;
        };
        imp.method.eq_ignore_ascii_case(method)
            && normalize_path(&imp.path) == *path
            && file.map_or(true, |f| imp.file == f)
    })
}

/// Matches declared features against discovered implementations.
pub struct FeatureMatcher<'a> {
    registry: &'a AnalyzerRegistry,
    auth_middleware: BTreeSet<String>,
}

impl<'a> FeatureMatcher<'a> {
    pub fn new<I, S>(registry: &'a AnalyzerRegistry, auth_middleware: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            registry,
            auth_middleware: auth_middleware.into_iter().map(Into::into).collect(),
        }
    }

    /// Classify all non-constraint features and compute extras.
    pub fn classify<'f>(
        &self,
        features: impl IntoIterator<Item = &'f Feature>,
        run: &RunOutput,
    ) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        for feature in features.into_iter().filter(|f| !f.is_constraint()) {
            let classified = self.classify_feature(feature, run, &mut outcome.warnings);
            tracing::debug!(
                feature = %feature.id,
                result = %classified.classification,
                "classified feature"
            );
            outcome.features.push(classified);
        }

        let mut covered: BTreeSet<_> = outcome
            .features
            .iter()
            .filter_map(|f| f.matched.as_ref())
            .map(|imp| imp.route_key())
            .collect();

        // Draft features never count, but their code is not undeclared either.
        for draft in outcome
            .features
            .iter()
            .filter(|f| f.classification == Classification::Draft)
        {
            for analyzer in self.registry.analyzers_for(&draft.feature.kind) {
                let implementations = run.for_analyzer(analyzer.name());
                covered.extend(find_routes(&draft.feature, implementations, None).map(|imp| imp.route_key()));
            }
        }

        let mut extras: Vec<Implementation> = run
            .all()
            .filter(|imp| !covered.contains(&imp.route_key()))
            .cloned()
            .collect();
        extras.sort_by(|a, b| {
            (a.sort_key(), a.analyzer.as_str()).cmp(&(b.sort_key(), b.analyzer.as_str()))
        });
        outcome.extras = extras;

        outcome
    }

    /// Run the per-feature state machine.
    pub fn classify_feature(
        &self,
        feature: &Feature,
        run: &RunOutput,
        warnings: &mut Vec<String>,
    ) -> FeatureOutcome {
        if !self.registry.supports_type(&feature.kind) {
            return FeatureOutcome::terminal(feature, Classification::Unanalyzable);
        }
        if feature.is_draft() {
            return FeatureOutcome::terminal(feature, Classification::Draft);
        }

        for analyzer in self.registry.analyzers_for(&feature.kind) {
            let name = analyzer.name();
            let implementations = run.for_analyzer(name);
            let result = match guarded(name, "match", || analyzer.match_feature(feature, implementations)) {
                Ok(result) => result,
                Err(warning) => {
                    warnings.push(warning);
                    continue;
                }
            };
            if !result.found {
                continue;
            }

            let matched = result.matched.or_else(|| {
                find_routes(feature, implementations, result.implemented_in.as_deref())
                    .next()
                    .cloned()
            });

            let mut contract_violations = result.contract_violations;
            let mut contract_checked = false;
            if let Some(contract) = feature.active_contract() {
                match matched.as_ref() {
                    Some(imp) => {
                        contract_checked = true;
                        contract_violations.extend(check_contract(contract, imp, &self.auth_middleware));
                    }
                    None => {
                        let warning = format!(
                            "feature {}: contract not checked, analyzer {} reported no implementation",
                            feature.id, name
                        );
                        tracing::warn!(feature = %feature.id, analyzer = name, "contract not checked");
                        warnings.push(warning);
                    }
                }
            }

            return FeatureOutcome {
                feature: feature.clone(),
                classification: Classification::Present,
                deprecated: feature.is_deprecated(),
                implemented_in: result.implemented_in,
                line: result.line,
                analyzer: Some(name.to_string()),
                contract_checked,
                contract_violations,
                matched,
            };
        }

        FeatureOutcome::terminal(feature, Classification::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalysisContext, Analyzer, MatchResult, ROUTE_ANALYZER};
    use crate::intent::{FeatureStatus, ROUTE_TYPE};
    use std::path::PathBuf;

    /// Reports matches with location only, never the implementation itself.
    struct LocationOnlyAnalyzer {
        types: Vec<String>,
    }

    impl Analyzer for LocationOnlyAnalyzer {
        fn name(&self) -> &str {
            "rpc-routes"
        }

        fn supported_types(&self) -> &[String] {
            &self.types
        }

        fn analyze(&self, _ctx: &AnalysisContext, _files: &[PathBuf]) -> anyhow::Result<Vec<Implementation>> {
            Ok(Vec::new())
        }

        fn match_feature(&self, feature: &Feature, implementations: &[Implementation]) -> anyhow::Result<MatchResult> {
            let hit = implementations.iter().find(|imp| Some(imp.path.as_str()) == feature.path.as_deref());
            Ok(match hit {
                Some(imp) => MatchResult {
                    found: true,
                    implemented_in: Some(imp.file.clone()),
                    line: imp.line,
                    ..Default::default()
                },
                None => MatchResult::not_found(),
            })
        }
    }

    fn run_with(routes: Vec<Implementation>) -> RunOutput {
        let mut run = RunOutput::default();
        let routes = routes
            .into_iter()
            .map(|mut imp| {
                imp.analyzer = ROUTE_ANALYZER.to_string();
                imp
            })
            .collect();
        run.implementations.insert(ROUTE_ANALYZER.to_string(), routes);
        run
    }

    fn route(method: &str, path: &str, middleware: &[&str]) -> Implementation {
        Implementation::route(ROUTE_TYPE, method, path, "src/app.js", 10)
            .with_middleware(middleware.iter().map(|m| m.to_string()).collect())
    }

    #[test]
    fn test_present_missing_and_extra() {
        let registry = AnalyzerRegistry::with_builtins();
        let matcher = FeatureMatcher::new(&registry, ["authenticate"]);
        let run = run_with(vec![route("GET", "/items", &[])]);

        let features = vec![
            Feature::route("get-users", "GET", "/users"),
            Feature::route("get-items", "GET", "/items"),
        ];
        let outcome = matcher.classify(&features, &run);

        assert_eq!(outcome.features[0].classification, Classification::Missing);
        assert_eq!(outcome.features[1].classification, Classification::Present);
        assert_eq!(outcome.features[1].implemented_in.as_deref(), Some("src/app.js"));
        assert_eq!(outcome.features[1].analyzer.as_deref(), Some(ROUTE_ANALYZER));
        assert!(outcome.extras.is_empty());

        let only_users = vec![Feature::route("get-users", "GET", "/users")];
        let outcome = matcher.classify(&only_users, &run);
        assert_eq!(outcome.extras.len(), 1);
        assert_eq!(outcome.extras[0].path, "/items");
    }

    #[test]
    fn test_draft_never_matches() {
        let registry = AnalyzerRegistry::with_builtins();
        let matcher = FeatureMatcher::new(&registry, Vec::<String>::new());
        let run = run_with(vec![route("GET", "/users", &[])]);

        let features = vec![Feature::route("get-users", "GET", "/users").with_status(FeatureStatus::Draft)];
        let outcome = matcher.classify(&features, &run);

        assert_eq!(outcome.features[0].classification, Classification::Draft);
        assert!(outcome.features[0].implemented_in.is_none());
        assert!(outcome.extras.is_empty());
    }

    #[test]
    fn test_draft_route_is_not_extra() {
        let registry = AnalyzerRegistry::with_builtins();
        let matcher = FeatureMatcher::new(&registry, Vec::<String>::new());
        let run = run_with(vec![route("GET", "/users", &[]), route("GET", "/search/:q", &[])]);

        let features = vec![
            Feature::route("get-users", "GET", "/users"),
            Feature::route("search", "get", "/search/{term}").with_status(FeatureStatus::Draft),
        ];
        let outcome = matcher.classify(&features, &run);

        assert_eq!(outcome.features[1].classification, Classification::Draft);
        assert!(outcome.features[1].matched.is_none());
        assert!(outcome.extras.is_empty());
    }

    #[test]
    fn test_location_only_match_still_checks_contract() {
        let mut registry = AnalyzerRegistry::new();
        registry
            .register(Box::new(LocationOnlyAnalyzer {
                types: vec!["rpc".to_string()],
            }))
            .unwrap();
        let matcher = FeatureMatcher::new(&registry, ["authenticate"]);

        let mut run = RunOutput::default();
        let mut ping = Implementation::route("rpc", "POST", "/rpc/ping", "src/rpc.js", 4);
        ping.analyzer = "rpc-routes".to_string();
        run.implementations.insert("rpc-routes".to_string(), vec![ping]);

        let mut feature = Feature::route("ping", "POST", "/rpc/ping").with_auth(AuthRequirement::Required);
        feature.kind = "rpc".to_string();
        let outcome = matcher.classify(&[feature], &run);

        let ping = &outcome.features[0];
        assert_eq!(ping.classification, Classification::Present);
        assert_eq!(ping.implemented_in.as_deref(), Some("src/rpc.js"));
        assert!(ping.contract_checked);
        assert_eq!(ping.contract_violations.len(), 1);
        assert!(outcome.extras.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_unresolvable_match_warns_about_contract() {
        let mut registry = AnalyzerRegistry::new();
        registry
            .register(Box::new(LocationOnlyAnalyzer {
                types: vec!["rpc".to_string()],
            }))
            .unwrap();
        let matcher = FeatureMatcher::new(&registry, ["authenticate"]);

        // Same path, but a method the feature does not declare.
        let mut run = RunOutput::default();
        let mut ping = Implementation::route("rpc", "GET", "/rpc/ping", "src/rpc.js", 4);
        ping.analyzer = "rpc-routes".to_string();
        run.implementations.insert("rpc-routes".to_string(), vec![ping]);

        let mut feature = Feature::route("ping", "POST", "/rpc/ping").with_auth(AuthRequirement::Required);
        feature.kind = "rpc".to_string();
        let outcome = matcher.classify(&[feature], &run);

        assert_eq!(outcome.features[0].classification, Classification::Present);
        assert!(!outcome.features[0].contract_checked);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("contract not checked"));
    }

    #[test]
    fn test_unanalyzable_before_draft() {
        let registry = AnalyzerRegistry::with_builtins();
        let matcher = FeatureMatcher::new(&registry, Vec::<String>::new());

        let mut feature = Feature::route("ws", "GET", "/socket").with_status(FeatureStatus::Draft);
        feature.kind = "websocket".to_string();
        let outcome = matcher.classify(&[feature], &RunOutput::default());
        assert_eq!(outcome.features[0].classification, Classification::Unanalyzable);
    }

    #[test]
    fn test_deprecated_present_is_flagged() {
        let registry = AnalyzerRegistry::with_builtins();
        let matcher = FeatureMatcher::new(&registry, Vec::<String>::new());
        let run = run_with(vec![route("DELETE", "/users/:id", &[])]);

        let features = vec![
            Feature::route("del-user", "DELETE", "/users/:userId").with_status(FeatureStatus::Deprecated),
        ];
        let outcome = matcher.classify(&features, &run);
        assert_eq!(outcome.features[0].classification, Classification::Present);
        assert!(outcome.features[0].deprecated);
    }

    #[test]
    fn test_auth_contract() {
        let registry = AnalyzerRegistry::with_builtins();
        let matcher = FeatureMatcher::new(&registry, ["authenticate", "requireAuth"]);
        let run = run_with(vec![
            route("POST", "/orders", &["validate"]),
            route("GET", "/orders", &["requireAuth"]),
            route("GET", "/health", &[]),
        ]);

        let features = vec![
            Feature::route("create-order", "POST", "/orders").with_auth(AuthRequirement::Required),
            Feature::route("list-orders", "GET", "/orders").with_auth(AuthRequirement::None),
            Feature::route("health", "GET", "/health").with_auth(AuthRequirement::None),
        ];
        let outcome = matcher.classify(&features, &run);

        for f in &outcome.features {
            assert_eq!(f.classification, Classification::Present);
            assert!(f.contract_checked);
        }
        assert_eq!(outcome.features[0].contract_violations.len(), 1);
        assert_eq!(outcome.features[0].contract_violations[0].actual, "none");
        assert_eq!(outcome.features[1].contract_violations.len(), 1);
        assert_eq!(outcome.features[1].contract_violations[0].actual, "requireAuth");
        assert!(outcome.features[2].contract_violations.is_empty());
    }

    #[test]
    fn test_constraints_are_excluded() {
        let registry = AnalyzerRegistry::with_builtins();
        let matcher = FeatureMatcher::new(&registry, Vec::<String>::new());
        let features = vec![Feature::constraint("c", "no-direct-import", "*").with_forbidden(&["pg"])];
        let outcome = matcher.classify(&features, &RunOutput::default());
        assert!(outcome.features.is_empty());
    }
}
