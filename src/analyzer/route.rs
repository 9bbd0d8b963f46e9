//! Built-in analyzer for Express-style HTTP route registrations.
//!
//! Recognizes two call shapes:
//! - `app.get('/users', auth, handler)` where the receiver is a
//!   conventionally named router object and the method is an HTTP verb
//! - `router.route('/users').get(handler).post(handler)` chains, one route
//!   per chained verb, all reported at the `.route(...)` call's line
//!
//! Only literal paths are recognized. Template strings with substitutions,
//! variables and concatenations are skipped.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use phf::phf_set;
use regex::Regex;
use tree_sitter::Node;

use super::{AnalysisContext, Analyzer, Implementation, MatchResult};
use crate::intent::{Feature, ROUTE_TYPE};
use crate::syntax::{SyntaxError, SyntaxLayer, SyntaxTree};

/// Name of the built-in route analyzer.
pub const ROUTE_ANALYZER: &str = "express-routes";

/// Replacement for every path parameter after normalization.
pub const PARAM_PLACEHOLDER: &str = ":param";

/// Lowercase HTTP verbs recognized as route registrations.
static HTTP_VERBS: phf::Set<&'static str> = phf_set! {
    "get", "post", "put", "patch", "delete", "head", "options",
};

/// Conventional names for application/router objects.
static ROUTE_RECEIVERS: phf::Set<&'static str> = phf_set! {
    "app", "router", "server", "api", "routes",
};

lazy_static! {
    static ref PATH_PARAM: Regex =
        Regex::new(r":[A-Za-z_$][A-Za-z0-9_$]*\??|\{[^/{}]+\}").unwrap();
}

const MEMBER_CALL_QUERY: &str = r#"
(call_expression
  function: (member_expression
    object: (identifier) @receiver
    property: (property_identifier) @verb)
  arguments: (arguments) @args) @call
"#;

/// Collapse `:name`, `:name?` and `{name}` parameters to `:param`.
///
/// Idempotent; literal segments are untouched.
pub fn normalize_path(path: &str) -> String {
    PATH_PARAM.replace_all(path, PARAM_PLACEHOLDER).into_owned()
}

pub(crate) fn is_http_verb(name: &str) -> bool {
    HTTP_VERBS.contains(name)
}

pub(crate) fn is_route_receiver(name: &str) -> bool {
    ROUTE_RECEIVERS.contains(name)
}

/// Named arguments of an `arguments` node, ignoring comments.
pub(crate) fn call_arguments<'t>(args: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = args.walk();
    args.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Text of a literal string node without its delimiters.
///
/// Template strings qualify only when they contain no substitutions.
pub(crate) fn literal_string(tree: &SyntaxTree, node: Node) -> Option<String> {
    match node.kind() {
        "string" => {}
        "template_string" => {
            let mut cursor = node.walk();
            let dynamic = node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "template_substitution");
            if dynamic {
                return None;
            }
        }
        _ => return None,
    }

    let text = tree.node_text(node);
    if text.len() < 2 {
        return None;
    }
    Some(text[1..text.len() - 1].to_string())
}

/// Middleware reference text: an identifier, a dotted member expression,
/// or the callee of a call expression. Arrays are flattened.
fn middleware_names(tree: &SyntaxTree, node: Node, out: &mut Vec<String>) {
    match node.kind() {
        "identifier" | "member_expression" => out.push(tree.node_text(node).to_string()),
        "call_expression" => {
            if let Some(callee) = node.child_by_field_name("function") {
                if matches!(callee.kind(), "identifier" | "member_expression") {
                    out.push(tree.node_text(callee).to_string());
                }
            }
        }
        "array" => {
            for element in call_arguments(node) {
                middleware_names(tree, element, out);
            }
        }
        _ => {}
    }
}

/// Express route analyzer.
pub struct RouteAnalyzer {
    types: Vec<String>,
    extensions: Vec<String>,
}

impl Default for RouteAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteAnalyzer {
    pub fn new() -> Self {
        Self {
            types: vec![ROUTE_TYPE.to_string()],
            extensions: ["js", "jsx", "mjs", "cjs", "ts", "mts", "cts", "tsx"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }

    /// Extract routes from an already parsed tree.
    pub fn extract_routes(
        &self,
        syntax: &SyntaxLayer,
        tree: &SyntaxTree,
        file: &str,
    ) -> Result<Vec<Implementation>, SyntaxError> {
        let mut routes = Vec::new();

        for set in syntax.query(tree, MEMBER_CALL_QUERY)? {
            let (Some(receiver), Some(verb), Some(args), Some(call)) = (
                set.get("receiver"),
                set.get("verb"),
                set.get("args"),
                set.get("call"),
            ) else {
                continue;
            };

            if !is_route_receiver(tree.node_text(receiver)) {
                continue;
            }

            let verb = tree.node_text(verb);
            let line = call.start_position().row + 1;
            let arguments = call_arguments(args);
            let Some(path) = arguments.first().and_then(|a| literal_string(tree, *a)) else {
                continue;
            };

            if verb == "route" {
                routes.extend(self.chained_routes(tree, call, &path, file, line));
            } else if is_http_verb(verb) {
                let mut middleware = Vec::new();
                if arguments.len() > 2 {
                    for arg in &arguments[1..arguments.len() - 1] {
                        middleware_names(tree, *arg, &mut middleware);
                    }
                }
                routes.push(
                    Implementation::route(ROUTE_TYPE, verb.to_ascii_uppercase(), path, file, line)
                        .with_middleware(middleware),
                );
            }
        }

        Ok(routes)
    }

    /// Walk upward from a `.route(path)` call, emitting one route per
    /// chained verb call.
    fn chained_routes(
        &self,
        tree: &SyntaxTree,
        route_call: Node,
        path: &str,
        file: &str,
        line: usize,
    ) -> Vec<Implementation> {
        let mut routes = Vec::new();
        let mut current = route_call;

        loop {
            let Some(member) = current.parent() else { break };
            if member.kind() != "member_expression"
                || member.child_by_field_name("object") != Some(current)
            {
                break;
            }
            let Some(property) = member.child_by_field_name("property") else { break };
            let verb = tree.node_text(property);
            if !is_http_verb(verb) {
                break;
            }
            let Some(call) = member.parent() else { break };
            if call.kind() != "call_expression" || call.child_by_field_name("function") != Some(member) {
                break;
            }

            let mut middleware = Vec::new();
            if let Some(args) = call.child_by_field_name("arguments") {
                let arguments = call_arguments(args);
                if arguments.len() > 1 {
                    for arg in &arguments[..arguments.len() - 1] {
                        middleware_names(tree, *arg, &mut middleware);
                    }
                }
            }

            routes.push(
                Implementation::route(ROUTE_TYPE, verb.to_ascii_uppercase(), path, file, line)
                    .with_middleware(middleware),
            );
            current = call;
        }

        routes
    }

    fn analyze_file(&self, ctx: &AnalysisContext, path: &Path) -> anyhow::Result<Vec<Implementation>> {
        let tree = ctx.parse_file(path)?;
        if tree.is_fallback() {
            tracing::debug!(file = %path.display(), "analyzing with fallback grammar");
        }
        let file = ctx.relative_path(path);
        Ok(self.extract_routes(ctx.syntax(), &tree, &file)?)
    }
}

impl Analyzer for RouteAnalyzer {
    fn name(&self) -> &str {
        ROUTE_ANALYZER
    }

    fn supported_types(&self) -> &[String] {
        &self.types
    }

    fn file_extensions(&self) -> Option<&[String]> {
        Some(&self.extensions)
    }

    fn analyze(&self, ctx: &AnalysisContext, files: &[PathBuf]) -> anyhow::Result<Vec<Implementation>> {
        let mut routes = Vec::new();
        for path in files {
            match self.analyze_file(ctx, path) {
                Ok(found) => routes.extend(found),
                Err(e) => tracing::warn!(
                    analyzer = ROUTE_ANALYZER,
                    file = %path.display(),
                    error = %e,
                    "skipping file"
                ),
            }
        }
        Ok(routes)
    }

    fn match_feature(
        &self,
        feature: &Feature,
        implementations: &[Implementation],
    ) -> anyhow::Result<MatchResult> {
        let (Some(method), Some(path)) = (feature.method.as_deref(), feature.path.as_deref()) else {
            return Ok(MatchResult::not_found());
        };

        let wanted = normalize_path(path);
        let hit = implementations.iter().find(|imp| {
            imp.kind == ROUTE_TYPE
                && imp.method.eq_ignore_ascii_case(method)
                && normalize_path(&imp.path) == wanted
        });

        Ok(hit.map(MatchResult::found).unwrap_or_else(MatchResult::not_found))
    }
}
