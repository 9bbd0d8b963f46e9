//! Declared intent document.
//!
//! An intent document lists the features a codebase is supposed to
//! implement: HTTP routes with optional contracts, and architectural
//! constraints evaluated over many files.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::constraint::{NO_DIRECT_IMPORT, ROUTES_REQUIRE_MIDDLEWARE};

/// Feature type handled by the built-in route analyzer.
pub const ROUTE_TYPE: &str = "http-route";

/// Feature type handled by the constraint engine.
pub const CONSTRAINT_TYPE: &str = "constraint";

/// Errors raised while loading or validating an intent document.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("failed to read intent file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse intent document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("feature #{index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("duplicate feature id {id:?}")]
    DuplicateId { id: String },

    #[error("feature {id:?} ({kind}) is missing required field {field:?}")]
    MissingField {
        id: String,
        kind: String,
        field: &'static str,
    },
}

/// Lifecycle status of a declared feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureStatus {
    Draft,
    #[default]
    Approved,
    Deprecated,
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureStatus::Draft => write!(f, "draft"),
            FeatureStatus::Approved => write!(f, "approved"),
            FeatureStatus::Deprecated => write!(f, "deprecated"),
        }
    }
}

/// Authentication requirement for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthRequirement {
    Required,
    None,
}

impl fmt::Display for AuthRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthRequirement::Required => write!(f, "required"),
            AuthRequirement::None => write!(f, "none"),
        }
    }
}

/// Sub-conditions checked when a route feature is matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureContract {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthRequirement>,
}

impl FeatureContract {
    pub fn is_empty(&self) -> bool {
        self.auth.is_none()
    }
}

/// A declared unit of intended behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: FeatureStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<FeatureContract>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Required middleware names (routes-require-middleware).
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub middleware: Vec<String>,
    /// Forbidden module names (no-direct-import).
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub forbidden: Vec<String>,
}

impl Feature {
    /// Create an approved route feature.
    pub fn route(id: &str, method: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: ROUTE_TYPE.to_string(),
            status: FeatureStatus::Approved,
            description: None,
            method: Some(method.to_string()),
            path: Some(path.to_string()),
            contract: None,
            rule: None,
            scope: None,
            middleware: Vec::new(),
            forbidden: Vec::new(),
        }
    }

    /// Create an approved constraint feature.
    pub fn constraint(id: &str, rule: &str, scope: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: CONSTRAINT_TYPE.to_string(),
            status: FeatureStatus::Approved,
            description: None,
            method: None,
            path: None,
            contract: None,
            rule: Some(rule.to_string()),
            scope: Some(scope.to_string()),
            middleware: Vec::new(),
            forbidden: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: FeatureStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_auth(mut self, auth: AuthRequirement) -> Self {
        self.contract = Some(FeatureContract { auth: Some(auth) });
        self
    }

    pub fn with_middleware(mut self, names: &[&str]) -> Self {
        self.middleware = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_forbidden(mut self, names: &[&str]) -> Self {
        self.forbidden = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn is_constraint(&self) -> bool {
        self.kind == CONSTRAINT_TYPE
    }

    pub fn is_draft(&self) -> bool {
        self.status == FeatureStatus::Draft
    }

    pub fn is_deprecated(&self) -> bool {
        self.status == FeatureStatus::Deprecated
    }

    /// Declared contract, if it carries any sub-condition.
    pub fn active_contract(&self) -> Option<&FeatureContract> {
        self.contract.as_ref().filter(|c| !c.is_empty())
    }
}

/// Optional document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Top-level intent document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentDocument {
    /// Document version; unquoted numbers such as `1.0` are accepted.
    #[serde(default, deserialize_with = "version_scalar")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<IntentMeta>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl IntentDocument {
    /// Parse an intent document from a YAML (or JSON) file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, IntentError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| IntentError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse_str(&content)
    }

    /// Parse an intent document from text.
    pub fn parse_str(content: &str) -> Result<Self, IntentError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Features handled by the feature matcher.
    pub fn matchable(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| !f.is_constraint())
    }

    /// Features handled by the constraint engine.
    pub fn constraints(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| f.is_constraint())
    }
}

/// Validate an intent document before any run starts.
pub fn validate(doc: &IntentDocument) -> Result<(), IntentError> {
    let mut seen = HashSet::new();

    for (index, feature) in doc.features.iter().enumerate() {
        if feature.id.trim().is_empty() {
            return Err(IntentError::EmptyField { index, field: "id" });
        }
        if feature.kind.trim().is_empty() {
            return Err(IntentError::EmptyField { index, field: "type" });
        }
        if !seen.insert(feature.id.as_str()) {
            return Err(IntentError::DuplicateId {
                id: feature.id.clone(),
            });
        }

        let missing = |field: &'static str| IntentError::MissingField {
            id: feature.id.clone(),
            kind: feature.kind.clone(),
            field,
        };

        if feature.kind == ROUTE_TYPE {
            if is_blank(&feature.method) {
                return Err(missing("method"));
            }
            if is_blank(&feature.path) {
                return Err(missing("path"));
            }
        }

        if feature.is_constraint() {
            if is_blank(&feature.rule) {
                return Err(missing("rule"));
            }
            if is_blank(&feature.scope) {
                return Err(missing("scope"));
            }
            match feature.rule.as_deref() {
                Some(ROUTES_REQUIRE_MIDDLEWARE) if feature.middleware.is_empty() => {
                    return Err(missing("middleware"));
                }
                Some(NO_DIRECT_IMPORT) if feature.forbidden.is_empty() => {
                    return Err(missing("forbidden"));
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|v| v.trim().is_empty()).unwrap_or(true)
}

/// Accept a version written as a string or as a bare YAML number.
fn version_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Integer(n) => n.to_string(),
        // Debug keeps the fractional part: 1.0 stays "1.0".
        Scalar::Float(f) => format!("{:?}", f),
    })
}

/// Accept either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version: "1.0"
meta:
  name: shop-api
features:
  - id: list-users
    type: http-route
    method: GET
    path: /users
  - id: create-order
    type: http-route
    method: POST
    path: /api/orders
    status: deprecated
    contract:
      auth: required
  - id: api-auth
    type: constraint
    rule: routes-require-middleware
    scope: /api/*
    middleware: authenticate
  - id: no-db-in-routes
    type: constraint
    rule: no-direct-import
    scope: route-handlers
    status: draft
    forbidden: [pg, mysql2]
"#;

    #[test]
    fn test_parse_intent() {
        let doc = IntentDocument::parse_str(SAMPLE).unwrap();
        assert_eq!(doc.version, "1.0");
        assert_eq!(doc.meta.as_ref().and_then(|m| m.name.as_deref()), Some("shop-api"));
        assert_eq!(doc.features.len(), 4);

        let first = &doc.features[0];
        assert_eq!(first.status, FeatureStatus::Approved);
        assert!(first.active_contract().is_none());

        let order = &doc.features[1];
        assert!(order.is_deprecated());
        assert_eq!(
            order.active_contract().and_then(|c| c.auth),
            Some(AuthRequirement::Required)
        );

        assert_eq!(doc.features[2].middleware, vec!["authenticate"]);
        assert_eq!(doc.features[3].forbidden, vec!["pg", "mysql2"]);
        assert!(doc.features[3].is_draft());

        assert_eq!(doc.matchable().count(), 2);
        assert_eq!(doc.constraints().count(), 2);
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn test_unquoted_version() {
        let doc = IntentDocument::parse_str("version: 1.0\nfeatures: []\n").unwrap();
        assert_eq!(doc.version, "1.0");

        let doc = IntentDocument::parse_str("version: 2\nfeatures: []\n").unwrap();
        assert_eq!(doc.version, "2");

        let doc = IntentDocument::parse_str("version: \"1.1\"\nfeatures: []\n").unwrap();
        assert_eq!(doc.version, "1.1");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let doc = IntentDocument {
            features: vec![
                Feature::route("a", "GET", "/a"),
                Feature::route("a", "POST", "/a"),
            ],
            ..Default::default()
        };
        assert!(matches!(validate(&doc), Err(IntentError::DuplicateId { id }) if id == "a"));
    }

    #[test]
    fn test_route_requires_method_and_path() {
        let mut feature = Feature::route("a", "GET", "/a");
        feature.path = None;
        let doc = IntentDocument {
            features: vec![feature],
            ..Default::default()
        };
        assert!(matches!(
            validate(&doc),
            Err(IntentError::MissingField { field: "path", .. })
        ));
    }

    #[test]
    fn test_constraint_parameters_required() {
        let doc = IntentDocument {
            features: vec![Feature::constraint("c", ROUTES_REQUIRE_MIDDLEWARE, "*")],
            ..Default::default()
        };
        assert!(matches!(
            validate(&doc),
            Err(IntentError::MissingField { field: "middleware", .. })
        ));

        let doc = IntentDocument {
            features: vec![Feature::constraint("c", NO_DIRECT_IMPORT, "*").with_forbidden(&["pg"])],
            ..Default::default()
        };
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn test_unknown_status_is_a_parse_error() {
        let err = IntentDocument::parse_str(
            "version: '1'\nfeatures:\n  - id: x\n    type: http-route\n    status: shipped\n",
        )
        .unwrap_err();
        assert!(matches!(err, IntentError::Parse(_)));
    }
}
