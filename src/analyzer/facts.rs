//! Fact structures produced by analyzers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::route::normalize_path;

/// A fact discovered in source code.
///
/// Created by an analyzer's `analyze` pass and never mutated afterwards,
/// except for the `analyzer` tag the runner stamps on at dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    /// Feature type this fact can satisfy (e.g. "http-route").
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    /// Owning file, relative to the scan root.
    pub file: String,
    /// Line number (1-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
    /// Name of the analyzer that produced this fact.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub analyzer: String,
}

impl Implementation {
    /// Create a route-shaped implementation.
    pub fn route(
        kind: &str,
        method: impl Into<String>,
        path: impl Into<String>,
        file: impl Into<String>,
        line: usize,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            method: method.into(),
            path: path.into(),
            file: file.into(),
            line: Some(line),
            middleware: Vec::new(),
            analyzer: String::new(),
        }
    }

    pub fn with_middleware(mut self, middleware: Vec<String>) -> Self {
        self.middleware = middleware;
        self
    }

    /// Whether this fact describes a route (has both a method and a path).
    pub fn is_route(&self) -> bool {
        !self.method.is_empty() && !self.path.is_empty()
    }

    /// Identity used to decide whether a present feature covers this fact.
    pub fn route_key(&self) -> RouteKey {
        RouteKey {
            file: self.file.clone(),
            method: self.method.to_ascii_uppercase(),
            path: normalize_path(&self.path),
        }
    }

    /// Ordering key that makes analyzer output deterministic.
    pub(crate) fn sort_key(&self) -> (&str, usize, &str, &str) {
        (
            self.file.as_str(),
            self.line.unwrap_or(0),
            self.method.as_str(),
            self.path.as_str(),
        )
    }
}

/// Post-normalization (file, method, path) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub file: String,
    pub method: String,
    pub path: String,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.method, self.path, self.file)
    }
}

/// A breach of a declared sub-condition on a matched feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractViolation {
    /// Contract field that failed (e.g. "auth").
    pub field: String,
    pub expected: String,
    pub actual: String,
    pub message: String,
}

/// Outcome of testing one feature against one analyzer's implementations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    pub found: bool,
    pub implemented_in: Option<String>,
    pub line: Option<usize>,
    pub contract_violations: Vec<ContractViolation>,
    /// The implementation that satisfied the feature, when found.
    pub matched: Option<Implementation>,
}

impl MatchResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn found(implementation: &Implementation) -> Self {
        Self {
            found: true,
            implemented_in: Some(implementation.file.clone()),
            line: implementation.line,
            contract_violations: Vec::new(),
            matched: Some(implementation.clone()),
        }
    }
}
