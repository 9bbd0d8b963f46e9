//! Analysis context for resolving paths and caching parsed files.
//!
//! The AnalysisContext provides:
//! - The syntax layer shared by analyzers and constraint rules
//! - Caching of parsed trees to avoid re-parsing a file per consumer
//! - Conversion between absolute paths and scan-root-relative paths

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::syntax::{SyntaxError, SyntaxLayer, SyntaxTree};

/// Analysis context for one scan root.
pub struct AnalysisContext {
    /// Base directory for relative path resolution.
    base_dir: PathBuf,
    syntax: SyntaxLayer,
    /// Parsed trees, keyed by absolute path.
    trees: RwLock<HashMap<PathBuf, Arc<SyntaxTree>>>,
}

impl AnalysisContext {
    /// Create a new analysis context with a fresh syntax layer.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self::with_syntax(base_dir, SyntaxLayer::new())
    }

    /// Create a context around an existing syntax layer.
    pub fn with_syntax<P: AsRef<Path>>(base_dir: P, syntax: SyntaxLayer) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            syntax,
            trees: RwLock::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn syntax(&self) -> &SyntaxLayer {
        &self.syntax
    }

    /// Resolve a (possibly relative) path against the base directory.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Path relative to the base directory, with `/` separators.
    pub fn relative_path<P: AsRef<Path>>(&self, path: P) -> String {
        let path = path.as_ref();
        path.strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Parse a file and cache the tree.
    ///
    /// Returns the cached tree if the file was already parsed.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Arc<SyntaxTree>, SyntaxError> {
        let abs_path = self.resolve(path);

        {
            let cache = self.trees.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(tree) = cache.get(&abs_path) {
                return Ok(Arc::clone(tree));
            }
        }

        let tree = Arc::new(self.syntax.parse_file(&abs_path)?);
        if tree.has_errors() {
            tracing::debug!(file = %abs_path.display(), "parsed with syntax errors");
        }

        let mut cache = self.trees.write().unwrap_or_else(PoisonError::into_inner);
        cache.insert(abs_path, Arc::clone(&tree));
        Ok(tree)
    }

    /// Number of trees currently cached.
    pub fn cached_files(&self) -> usize {
        self.trees.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
