//! Grammar selection by file extension.

use std::fmt;

use tree_sitter::Language;

/// A tree-sitter grammar the syntax layer can parse with.
///
/// The three dialects share node shapes (`call_expression`,
/// `member_expression`, `import_statement`, ...), so one query pattern
/// source is valid for all of them. Each still needs its own compiled query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grammar {
    JavaScript,
    TypeScript,
    Tsx,
}

/// Grammar used for extensions no dialect claims.
pub const FALLBACK: Grammar = Grammar::JavaScript;

impl Grammar {
    /// Every grammar, in slot order.
    pub const ALL: [Grammar; 3] = [Grammar::JavaScript, Grammar::TypeScript, Grammar::Tsx];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grammar::JavaScript => "javascript",
            Grammar::TypeScript => "typescript",
            Grammar::Tsx => "tsx",
        }
    }

    /// Slot index inside the syntax layer.
    pub(crate) fn index(self) -> usize {
        match self {
            Grammar::JavaScript => 0,
            Grammar::TypeScript => 1,
            Grammar::Tsx => 2,
        }
    }

    /// The tree-sitter language backing this grammar.
    pub fn language(&self) -> Language {
        match self {
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// File extensions (without dot) natively handled by this grammar.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Grammar::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Grammar::TypeScript => &["ts", "mts", "cts"],
            Grammar::Tsx => &["tsx"],
        }
    }

    /// Look up the grammar that natively handles an extension.
    ///
    /// Accepts extensions with or without a leading dot, in any case.
    pub fn for_extension(ext: &str) -> Option<Grammar> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Grammar::ALL
            .into_iter()
            .find(|g| g.extensions().contains(&ext.as_str()))
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolve an extension to a grammar, falling back to [`FALLBACK`].
///
/// Never fails. Trees parsed through a fallback grammar are best-effort.
pub fn language_for(ext: &str) -> Grammar {
    Grammar::for_extension(ext).unwrap_or(FALLBACK)
}

/// Whether an extension would only be handled by the fallback grammar.
pub fn is_fallback(ext: &str) -> bool {
    Grammar::for_extension(ext).is_none()
}
