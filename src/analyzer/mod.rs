//! Pluggable analyzer framework.
//!
//! Analyzers turn source files into [`Implementation`] facts and decide
//! whether a declared feature is satisfied by them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌────────────────┐
//! │ Source Files    │────▶│ AnalyzerRunner   │────▶│ RunOutput      │
//! └─────────────────┘     │ (by extension,   │     │ (per-analyzer  │
//!                         │  panic-isolated) │     │ implementations│
//!                         └──────────────────┘     └────────────────┘
//!                                  ▲
//!                         ┌──────────────────┐
//!                         │ AnalyzerRegistry │
//!                         │ (ordered, typed) │
//!                         └──────────────────┘
//! ```
//!
//! # Adding an Analyzer
//!
//! 1. Implement the [`Analyzer`] trait
//! 2. Register a factory in a [`PluginCatalog`] under a name
//! 3. List that name under `analyzers.custom` in the configuration
//!
//! See `route.rs` for the built-in Express analyzer.

mod context;
mod facts;
mod registry;
mod route;
mod runner;
mod traits;

pub use context::AnalysisContext;
pub use facts::{ContractViolation, Implementation, MatchResult, RouteKey};
pub use registry::{
    builtin, AnalyzerFactory, AnalyzerRegistry, PluginCatalog, RegistrationError, BUILTIN_ANALYZERS,
};
pub use route::{normalize_path, RouteAnalyzer, PARAM_PLACEHOLDER, ROUTE_ANALYZER};
pub use runner::{AnalyzerRunner, RunOutput};
pub use traits::Analyzer;

pub(crate) use route::{call_arguments, is_http_verb, is_route_receiver, literal_string};
pub(crate) use runner::guarded;
