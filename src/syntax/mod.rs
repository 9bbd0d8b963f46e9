//! Syntax access layer over tree-sitter.
//!
//! This module provides:
//! - `Grammar`: extension-to-grammar resolution with a JavaScript fallback
//! - `SyntaxLayer`: one parser and one compiled-query cache per grammar
//! - `SyntaxTree`: a parsed file, tagged with the grammar that produced it
//! - `CompiledQuery` / `CaptureSet`: structural pattern queries and results
//!
//! The layer is an explicit object. Construct one per process (or per run)
//! and hand it to consumers; there is no global registry behind it.

mod grammar;
mod query;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use once_cell::sync::OnceCell;
use tree_sitter::{Language, Node, Parser, Query, Tree};

pub use grammar::{is_fallback, language_for, Grammar, FALLBACK};
pub use query::{Capture, CaptureSet, CompiledQuery};

/// Errors raised by the syntax layer.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("failed to load {grammar} grammar: {message}")]
    Grammar { grammar: Grammar, message: String },

    #[error("invalid {grammar} query: {message}")]
    Query { grammar: Grammar, message: String },

    #[error("query compiled for {query} cannot run against a {tree} tree")]
    GrammarMismatch { query: Grammar, tree: Grammar },

    #[error("{grammar} parser produced no tree")]
    ParseFailed { grammar: Grammar },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A parsed source file.
pub struct SyntaxTree {
    grammar: Grammar,
    fallback: bool,
    tree: Tree,
    source: Vec<u8>,
}

impl SyntaxTree {
    /// The grammar that produced this tree.
    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// True when the extension was unknown and the fallback grammar was used.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Get text for a node of this tree.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Whether the parser had to insert ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// Per-grammar state: exactly one parser and one query cache.
struct GrammarSlot {
    language: Language,
    parser: Mutex<Parser>,
    queries: RwLock<HashMap<String, Arc<Query>>>,
}

impl GrammarSlot {
    fn new(grammar: Grammar) -> Result<Self, SyntaxError> {
        let language = grammar.language();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| SyntaxError::Grammar {
                grammar,
                message: e.to_string(),
            })?;

        tracing::debug!(grammar = %grammar, "initialized grammar slot");

        Ok(Self {
            language,
            parser: Mutex::new(parser),
            queries: RwLock::new(HashMap::new()),
        })
    }
}

/// Grammar-pluggable parsing and query toolkit.
///
/// Slots are created lazily on first use of a grammar. Query caches are
/// append-only: a compiled pattern is never invalidated.
#[derive(Default)]
pub struct SyntaxLayer {
    slots: [OnceCell<GrammarSlot>; 3],
}

impl SyntaxLayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, grammar: Grammar) -> Result<&GrammarSlot, SyntaxError> {
        self.slots[grammar.index()].get_or_try_init(|| GrammarSlot::new(grammar))
    }

    /// Resolve the grammar for an extension (fallback for unknown ones).
    pub fn language_for(&self, ext: &str) -> Grammar {
        language_for(ext)
    }

    /// Parse in-memory source text using the grammar for `ext`.
    pub fn parse(&self, source: impl Into<Vec<u8>>, ext: &str) -> Result<SyntaxTree, SyntaxError> {
        let grammar = language_for(ext);
        let source = source.into();
        let slot = self.slot(grammar)?;

        let parsed = {
            let mut parser = slot.parser.lock().unwrap_or_else(PoisonError::into_inner);
            parser.reset();
            parser.parse(&source, None)
        };
        let tree = parsed.ok_or(SyntaxError::ParseFailed { grammar })?;

        Ok(SyntaxTree {
            grammar,
            fallback: is_fallback(ext),
            tree,
            source,
        })
    }

    /// Read and parse a file, choosing the grammar from its extension.
    pub fn parse_file(&self, path: &Path) -> Result<SyntaxTree, SyntaxError> {
        let source = std::fs::read(path).map_err(|e| SyntaxError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.parse(source, ext)
    }

    /// Compile a pattern for a grammar, or return the cached compilation.
    pub fn compile_query(&self, grammar: Grammar, pattern: &str) -> Result<CompiledQuery, SyntaxError> {
        let slot = self.slot(grammar)?;

        {
            let cache = slot.queries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(query) = cache.get(pattern) {
                return Ok(CompiledQuery::new(grammar, Arc::clone(query)));
            }
        }

        let query = Query::new(&slot.language, pattern).map_err(|e| SyntaxError::Query {
            grammar,
            message: e.to_string(),
        })?;
        let query = Arc::new(query);

        let mut cache = slot.queries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = cache
            .entry(pattern.to_string())
            .or_insert_with(|| Arc::clone(&query));

        Ok(CompiledQuery::new(grammar, Arc::clone(entry)))
    }

    /// Run a compiled query against a tree of the same grammar.
    pub fn run_query<'t>(
        &self,
        query: &CompiledQuery,
        tree: &'t SyntaxTree,
    ) -> Result<Vec<CaptureSet<'t>>, SyntaxError> {
        query.captures(tree)
    }

    /// Compile `pattern` for the tree's own grammar and run it.
    pub fn query<'t>(&self, tree: &'t SyntaxTree, pattern: &str) -> Result<Vec<CaptureSet<'t>>, SyntaxError> {
        let compiled = self.compile_query(tree.grammar(), pattern)?;
        compiled.captures(tree)
    }

    /// Number of distinct patterns compiled for a grammar so far.
    pub fn cached_query_count(&self, grammar: Grammar) -> usize {
        self.slots[grammar.index()]
            .get()
            .map(|slot| {
                slot.queries
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len()
            })
            .unwrap_or(0)
    }
}
