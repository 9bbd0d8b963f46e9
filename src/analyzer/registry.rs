//! Ordered analyzer registry with a feature-type index.

use std::collections::{BTreeMap, BTreeSet};

use super::route::{RouteAnalyzer, ROUTE_ANALYZER};
use super::Analyzer;
use crate::config::AnalyzersConfig;

/// Factory function that creates an analyzer instance.
pub type AnalyzerFactory = fn() -> Box<dyn Analyzer>;

/// Names of the analyzers that ship with the crate.
pub const BUILTIN_ANALYZERS: &[&str] = &[ROUTE_ANALYZER];

/// Instantiate a built-in analyzer by name.
pub fn builtin(name: &str) -> Option<Box<dyn Analyzer>> {
    match name {
        ROUTE_ANALYZER => Some(Box::new(RouteAnalyzer::new())),
        _ => None,
    }
}

/// Errors raised when an analyzer fails the capability check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("analyzer has an empty name")]
    EmptyName,

    #[error("analyzer {name:?} declares no supported feature types")]
    NoSupportedTypes { name: String },

    #[error("analyzer {name:?} declares an empty feature type")]
    EmptyType { name: String },

    #[error("analyzer {name:?} is already registered")]
    DuplicateName { name: String },

    #[error("unknown analyzer {name:?}")]
    UnknownAnalyzer { name: String },
}

/// Named analyzer factories available to the `analyzers.custom` config list.
///
/// Custom analyzers are linked into the binary and looked up by name here;
/// there is no dynamic loading.
#[derive(Default)]
pub struct PluginCatalog {
    factories: BTreeMap<String, AnalyzerFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a name.
    pub fn register(&mut self, name: &str, factory: AnalyzerFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Build a fresh analyzer instance for a name.
    pub fn create(&self, name: &str) -> Option<Box<dyn Analyzer>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }
}

/// Ordered set of analyzers plus a feature-type index.
///
/// Order is registration order: built-ins first, then custom analyzers in
/// configuration order. Matching consults analyzers in this order.
#[derive(Default)]
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn Analyzer>>,
    by_type: BTreeMap<String, Vec<usize>>,
    warnings: Vec<String>,
}

impl AnalyzerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry containing every built-in analyzer.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for name in BUILTIN_ANALYZERS {
            registry.register_named(name, None);
        }
        registry
    }

    /// Build a registry from the `analyzers` configuration section.
    ///
    /// `include` selects built-ins (all of them when absent); `custom` names
    /// are resolved against the catalog. Anything that cannot be resolved or
    /// fails the capability check becomes a warning.
    pub fn from_config(config: &AnalyzersConfig, catalog: &PluginCatalog) -> Self {
        let mut registry = Self::new();

        match &config.include {
            Some(names) => {
                for name in names {
                    registry.register_named(name, None);
                }
            }
            None => {
                for name in BUILTIN_ANALYZERS {
                    registry.register_named(name, None);
                }
            }
        }

        for name in &config.custom {
            registry.register_named(name, Some(catalog));
        }

        registry
    }

    fn register_named(&mut self, name: &str, catalog: Option<&PluginCatalog>) {
        let analyzer = match catalog {
            Some(catalog) => catalog.create(name),
            None => builtin(name),
        };

        let result = match analyzer {
            Some(analyzer) => self.register(analyzer),
            None => Err(RegistrationError::UnknownAnalyzer {
                name: name.to_string(),
            }),
        };

        if let Err(e) = result {
            tracing::warn!(analyzer = name, error = %e, "analyzer not registered");
            self.warnings.push(format!("analyzer not registered: {}", e));
        }
    }

    /// Validate and register an analyzer.
    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) -> Result<(), RegistrationError> {
        self.check_capabilities(analyzer.as_ref())?;

        let index = self.analyzers.len();
        let types: BTreeSet<String> = analyzer.supported_types().iter().cloned().collect();
        for kind in types {
            self.by_type.entry(kind).or_default().push(index);
        }

        tracing::debug!(analyzer = analyzer.name(), "registered analyzer");
        self.analyzers.push(analyzer);
        Ok(())
    }

    fn check_capabilities(&self, analyzer: &dyn Analyzer) -> Result<(), RegistrationError> {
        let name = analyzer.name().trim();
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        let name = name.to_string();

        let types = analyzer.supported_types();
        if types.is_empty() {
            return Err(RegistrationError::NoSupportedTypes { name });
        }
        if types.iter().any(|t| t.trim().is_empty()) {
            return Err(RegistrationError::EmptyType { name });
        }
        if self.get(&name).is_some() {
            return Err(RegistrationError::DuplicateName { name });
        }
        Ok(())
    }

    /// All analyzers in registration order.
    pub fn analyzers(&self) -> impl Iterator<Item = &dyn Analyzer> {
        self.analyzers.iter().map(|a| a.as_ref())
    }

    /// Analyzers supporting a feature type, in registration order.
    pub fn analyzers_for<'a>(&'a self, kind: &str) -> impl Iterator<Item = &'a dyn Analyzer> + 'a {
        self.by_type
            .get(kind)
            .into_iter()
            .flatten()
            .map(move |&i| self.analyzers[i].as_ref())
    }

    /// Check if any analyzer can satisfy a feature type.
    pub fn supports_type(&self, kind: &str) -> bool {
        self.by_type.contains_key(kind)
    }

    /// Look up an analyzer by name.
    pub fn get(&self, name: &str) -> Option<&dyn Analyzer> {
        self.analyzers
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
    }

    /// Analyzer names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.analyzers.iter().map(|a| a.name().to_string()).collect()
    }

    /// Union of all file extensions requested by registered analyzers.
    pub fn wanted_extensions(&self) -> BTreeSet<String> {
        self.analyzers
            .iter()
            .filter_map(|a| a.file_extensions())
            .flatten()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect()
    }

    /// Warnings recorded while building the registry.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}
