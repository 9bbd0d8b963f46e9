//! Compiled queries and their capture sets.

use std::fmt;
use std::sync::Arc;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use super::{Grammar, SyntaxError, SyntaxTree};

/// A query compiled for one specific grammar.
///
/// Obtained from [`super::SyntaxLayer::compile_query`]. Running it against a
/// tree of another grammar is rejected with [`SyntaxError::GrammarMismatch`].
#[derive(Clone)]
pub struct CompiledQuery {
    grammar: Grammar,
    query: Arc<Query>,
}

impl fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("grammar", &self.grammar)
            .field("captures", &self.query.capture_names())
            .finish()
    }
}

impl CompiledQuery {
    pub(crate) fn new(grammar: Grammar, query: Arc<Query>) -> Self {
        Self { grammar, query }
    }

    /// The grammar this query was compiled for.
    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Names of every capture declared in the pattern source.
    pub fn capture_names(&self) -> &[&str] {
        self.query.capture_names()
    }

    /// Run the query over the whole tree.
    pub(crate) fn captures<'t>(
        &self,
        tree: &'t SyntaxTree,
    ) -> Result<Vec<CaptureSet<'t>>, SyntaxError> {
        if self.grammar != tree.grammar() {
            return Err(SyntaxError::GrammarMismatch {
                query: self.grammar,
                tree: tree.grammar(),
            });
        }

        let names = self.query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, tree.root(), tree.source());

        let mut sets = Vec::new();
        while let Some(m) = matches.next() {
            let captures = m
                .captures
                .iter()
                .map(|c| Capture {
                    name: names[c.index as usize].to_string(),
                    node: c.node,
                })
                .collect();
            sets.push(CaptureSet {
                pattern_index: m.pattern_index,
                captures,
            });
        }

        Ok(sets)
    }
}

/// One named capture inside a match.
#[derive(Debug, Clone)]
pub struct Capture<'t> {
    pub name: String,
    pub node: Node<'t>,
}

/// All captures produced by a single pattern match.
#[derive(Debug, Clone)]
pub struct CaptureSet<'t> {
    /// Index of the pattern (in source order) that produced this match.
    pub pattern_index: usize,
    pub captures: Vec<Capture<'t>>,
}

impl<'t> CaptureSet<'t> {
    /// First node captured under `name`.
    pub fn get(&self, name: &str) -> Option<Node<'t>> {
        self.captures
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.node)
    }

    /// Every node captured under `name`.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Node<'t>> + 'a {
        self.captures
            .iter()
            .filter(move |c| c.name == name)
            .map(|c| c.node)
    }
}
