//! Analyzer runner that dispatches files and isolates failures.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use super::{AnalysisContext, Analyzer, AnalyzerRegistry, Implementation};

/// Implementations grouped by the analyzer that produced them.
#[derive(Debug, Default)]
pub struct RunOutput {
    pub implementations: BTreeMap<String, Vec<Implementation>>,
    pub warnings: Vec<String>,
}

impl RunOutput {
    /// Implementations produced by one analyzer.
    pub fn for_analyzer(&self, name: &str) -> &[Implementation] {
        self.implementations
            .get(name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Every implementation, grouped by analyzer name.
    pub fn all(&self) -> impl Iterator<Item = &Implementation> {
        self.implementations.values().flatten()
    }

    /// Total number of implementations.
    pub fn len(&self) -> usize {
        self.implementations.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extract a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run an analyzer operation behind a panic boundary.
///
/// Errors and panics are both turned into a warning message naming the
/// analyzer and the operation.
pub(crate) fn guarded<T>(
    analyzer: &str,
    operation: &str,
    f: impl FnOnce() -> anyhow::Result<T>,
) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::warn!(analyzer, operation, error = %e, "analyzer failed");
            Err(format!("analyzer {} failed during {}: {:#}", analyzer, operation, e))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(analyzer, operation, panic = %message, "analyzer panicked");
            Err(format!("analyzer {} panicked during {}: {}", analyzer, operation, message))
        }
    }
}

/// Dispatches files to every registered analyzer.
pub struct AnalyzerRunner<'a> {
    registry: &'a AnalyzerRegistry,
    ctx: &'a AnalysisContext,
}

impl<'a> AnalyzerRunner<'a> {
    pub fn new(registry: &'a AnalyzerRegistry, ctx: &'a AnalysisContext) -> Self {
        Self { registry, ctx }
    }

    /// Files whose extension the analyzer declared.
    pub fn files_for(analyzer: &dyn Analyzer, files: &[PathBuf]) -> Vec<PathBuf> {
        files
            .iter()
            .filter(|path| {
                extension_of(path)
                    .map(|ext| analyzer.handles_extension(ext))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Run every analyzer over its share of the files.
    ///
    /// A failing or panicking analyzer contributes no implementations and a
    /// warning; the rest of the run proceeds.
    pub fn run(&self, files: &[PathBuf]) -> RunOutput {
        let mut output = RunOutput::default();

        for analyzer in self.registry.analyzers() {
            let name = analyzer.name().to_string();
            let assigned = Self::files_for(analyzer, files);
            tracing::debug!(analyzer = %name, files = assigned.len(), "running analyzer");

            let result = guarded(&name, "analyze", || analyzer.analyze(self.ctx, &assigned));
            let mut implementations = match result {
                Ok(implementations) => implementations,
                Err(warning) => {
                    output.warnings.push(warning);
                    Vec::new()
                }
            };

            for implementation in &mut implementations {
                implementation.analyzer = name.clone();
            }
            implementations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

            output.implementations.insert(name, implementations);
        }

        output
    }
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}
