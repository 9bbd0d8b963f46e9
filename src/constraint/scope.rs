//! Constraint scope patterns.

use std::collections::BTreeSet;
use std::fmt;

use crate::analyzer::{normalize_path, Implementation};

/// A parsed scope pattern.
///
/// Scopes are resolved against detected routes: a file is in scope when it
/// contains at least one route the scope selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// `*`: every route-bearing file.
    All,
    /// `/prefix/*`: routes equal to or under the prefix.
    Prefix(String),
    /// `/exact/path`: that route only (after normalization).
    Exact(String),
    /// A bare identifier such as `route-handlers`: every route-bearing file.
    Named(String),
}

impl Scope {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == "*" {
            return Scope::All;
        }
        if !raw.starts_with('/') {
            return Scope::Named(raw.to_string());
        }
        if let Some(prefix) = raw.strip_suffix('*') {
            let prefix = prefix.trim_end_matches('/');
            return Scope::Prefix(normalize_path(prefix));
        }
        Scope::Exact(normalize_path(raw))
    }

    /// Check if a route path is selected by this scope.
    pub fn matches_path(&self, path: &str) -> bool {
        match self {
            Scope::All | Scope::Named(_) => true,
            Scope::Prefix(prefix) => {
                let path = normalize_path(path);
                prefix.is_empty() || path == *prefix || path.starts_with(&format!("{}/", prefix))
            }
            Scope::Exact(exact) => normalize_path(path) == *exact,
        }
    }

    /// Route implementations selected by this scope.
    pub fn routes<'a>(&self, implementations: &'a [Implementation]) -> Vec<&'a Implementation> {
        implementations
            .iter()
            .filter(|imp| imp.is_route() && self.matches_path(&imp.path))
            .collect()
    }

    /// Relative paths of files containing at least one selected route.
    pub fn files(&self, implementations: &[Implementation]) -> BTreeSet<String> {
        self.routes(implementations)
            .into_iter()
            .map(|imp| imp.file.clone())
            .collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => write!(f, "*"),
            Scope::Prefix(p) => write!(f, "{}/*", p),
            Scope::Exact(p) => write!(f, "{}", p),
            Scope::Named(n) => write!(f, "{}", n),
        }
    }
}
