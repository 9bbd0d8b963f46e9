//! The capability contract every analyzer implements.

use std::path::PathBuf;

use super::{AnalysisContext, Implementation, MatchResult};
use crate::intent::Feature;

/// A pluggable component that turns source files into implementations
/// and matches declared features against them.
///
/// Built-in analyzers and externally supplied plugins share this trait.
/// Plugins are untrusted: the runner isolates every call behind a panic
/// boundary and treats errors as warnings.
pub trait Analyzer: Send + Sync {
    /// Unique analyzer name (e.g. "express-routes").
    fn name(&self) -> &str;

    /// Feature types this analyzer can satisfy (e.g. `["http-route"]`).
    fn supported_types(&self) -> &[String];

    /// File extensions (without dot) this analyzer wants.
    ///
    /// `None` means the analyzer receives no files at all; analyzers must
    /// opt in to file dispatch explicitly.
    fn file_extensions(&self) -> Option<&[String]> {
        None
    }

    /// Extract implementations from the given files.
    ///
    /// A file that fails to parse should be skipped, not fail the call.
    fn analyze(&self, ctx: &AnalysisContext, files: &[PathBuf]) -> anyhow::Result<Vec<Implementation>>;

    /// Test one feature against this analyzer's own implementations.
    fn match_feature(
        &self,
        feature: &Feature,
        implementations: &[Implementation],
    ) -> anyhow::Result<MatchResult>;

    /// Check if this analyzer handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.file_extensions()
            .map(|exts| exts.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Check if this analyzer can satisfy the given feature type.
    fn supports_type(&self, kind: &str) -> bool {
        self.supported_types().iter().any(|t| t == kind)
    }
}
