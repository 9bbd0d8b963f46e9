//! intentcheck - declared-intent reconciliation for web services.
//!
//! intentcheck compares an intent document (the routes, contracts and
//! architectural rules a service is supposed to have) against what the
//! JavaScript/TypeScript code actually implements, and reports compliance
//! and drift between runs.
//!
//! # Architecture
//!
//! Data flows one way:
//!
//! ```text
//! files → syntax → analyzer → (matcher, constraint) → report
//! ```
//!
//! - `syntax`: tree-sitter parsing and cached structural queries per grammar
//! - `analyzer`: pluggable analyzers, ordered registry, isolated runner
//! - `matcher`: classifies declared features (present, missing, ...)
//! - `constraint`: cross-cutting rules over scoped files and routes
//! - `report`: versioned report, run-to-run diff, output formatting
//! - `score`: compliance score and pass/fail verdicts
//! - `engine`: the `Reconciler` that wires it all together
//!
//! # Adding an Analyzer
//!
//! Implement `Analyzer`, register a factory in a `PluginCatalog`, and list
//! its name under `analyzers.custom` in `intentcheck.yaml`.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constraint;
pub mod engine;
pub mod intent;
pub mod matcher;
pub mod report;
pub mod scanner;
pub mod score;
pub mod syntax;

pub use analyzer::{
    AnalysisContext, Analyzer, AnalyzerRegistry, AnalyzerRunner, Implementation, MatchResult,
    PluginCatalog, RouteAnalyzer,
};
pub use config::Config;
pub use constraint::{ConstraintEngine, ConstraintRule, ConstraintViolation};
pub use engine::{Reconciler, RunMeta};
pub use intent::{Feature, IntentDocument};
pub use matcher::{Classification, FeatureMatcher};
pub use report::{DiffResult, Report};
pub use syntax::{Grammar, SyntaxLayer, SyntaxTree};
