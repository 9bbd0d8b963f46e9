//! Built-in constraint rules.

use std::collections::BTreeSet;

use tree_sitter::Node;

use super::{ConstraintViolation, Scope};
use crate::analyzer::{
    call_arguments, is_http_verb, is_route_receiver, literal_string, AnalysisContext,
    Implementation,
};
use crate::intent::Feature;
use crate::syntax::SyntaxTree;

pub const ROUTES_REQUIRE_MIDDLEWARE: &str = "routes-require-middleware";
pub const NO_DIRECT_IMPORT: &str = "no-direct-import";
pub const ASYNC_ERROR_HANDLING: &str = "async-error-handling";

/// Static `import ... from 'x'` and `require('x')` declarations.
const IMPORT_QUERY: &str = r#"
(import_statement
  source: (string) @source) @import

(call_expression
  function: (identifier) @callee (#eq? @callee "require")
  arguments: (arguments . (string) @source)) @import
"#;

/// Any `receiver.verb(...)` call; registration shape is checked in code.
const REGISTRATION_QUERY: &str = r#"
(call_expression
  function: (member_expression
    object: (_) @receiver
    property: (property_identifier) @verb)
  arguments: (arguments) @args) @call
"#;

/// Inputs available to every rule.
pub struct RuleContext<'a> {
    pub analysis: &'a AnalysisContext,
    /// Every implementation discovered in this run.
    pub implementations: &'a [Implementation],
}

impl<'a> RuleContext<'a> {
    /// Parse each in-scope file, skipping (with a warning) files that fail.
    fn scoped_trees(&self, scope: &Scope, rule: &str) -> Vec<(String, std::sync::Arc<SyntaxTree>)> {
        let mut trees = Vec::new();
        for file in scope.files(self.implementations) {
            match self.analysis.parse_file(&file) {
                Ok(tree) => trees.push((file, tree)),
                Err(e) => tracing::warn!(rule, file = %file, error = %e, "skipping file"),
            }
        }
        trees
    }
}

/// A cross-cutting architectural rule.
pub trait ConstraintRule: Send + Sync {
    /// Rule name referenced by `rule:` in a constraint feature.
    fn name(&self) -> &'static str;

    /// Evaluate the rule for one constraint feature.
    fn evaluate(
        &self,
        feature: &Feature,
        scope: &Scope,
        ctx: &RuleContext,
    ) -> anyhow::Result<Vec<ConstraintViolation>>;
}

/// Every route in scope must carry all required middleware.
///
/// Missing names are bundled into one violation per route.
pub struct RoutesRequireMiddleware;

impl ConstraintRule for RoutesRequireMiddleware {
    fn name(&self) -> &'static str {
        ROUTES_REQUIRE_MIDDLEWARE
    }

    fn evaluate(
        &self,
        feature: &Feature,
        scope: &Scope,
        ctx: &RuleContext,
    ) -> anyhow::Result<Vec<ConstraintViolation>> {
        let mut violations = Vec::new();

        for route in scope.routes(ctx.implementations) {
            let missing: Vec<&str> = feature
                .middleware
                .iter()
                .filter(|required| !route.middleware.contains(required))
                .map(|m| m.as_str())
                .collect();
            if missing.is_empty() {
                continue;
            }

            let actual = if route.middleware.is_empty() {
                "(none)".to_string()
            } else {
                route.middleware.join(", ")
            };
            violations.push(ConstraintViolation {
                constraint: feature.id.clone(),
                rule: self.name().to_string(),
                message: format!(
                    "{} {} is missing required middleware: {}",
                    route.method,
                    route.path,
                    missing.join(", ")
                ),
                file: route.file.clone(),
                line: route.line,
                expected: feature.middleware.join(", "),
                actual,
            });
        }

        Ok(violations)
    }
}

/// Files in scope must not import forbidden modules.
///
/// A forbidden name matches the module itself and any subpath (`pg` and
/// `pg/lib/client`), never a different package sharing the prefix.
pub struct NoDirectImport;

impl NoDirectImport {
    fn forbidden_match<'f>(forbidden: &'f [String], target: &str) -> Option<&'f str> {
        forbidden
            .iter()
            .find(|name| target == name.as_str() || target.starts_with(&format!("{}/", name)))
            .map(|name| name.as_str())
    }
}

impl ConstraintRule for NoDirectImport {
    fn name(&self) -> &'static str {
        NO_DIRECT_IMPORT
    }

    fn evaluate(
        &self,
        feature: &Feature,
        scope: &Scope,
        ctx: &RuleContext,
    ) -> anyhow::Result<Vec<ConstraintViolation>> {
        let mut violations = Vec::new();
        let syntax = ctx.analysis.syntax();

        for (file, tree) in ctx.scoped_trees(scope, self.name()) {
            let mut reported = BTreeSet::new();
            for set in syntax.query(&tree, IMPORT_QUERY)? {
                let (Some(statement), Some(source)) = (set.get("import"), set.get("source")) else {
                    continue;
                };
                let Some(target) = literal_string(&tree, source) else {
                    continue;
                };
                let Some(name) = Self::forbidden_match(&feature.forbidden, &target) else {
                    continue;
                };
                if !reported.insert(statement.id()) {
                    continue;
                }

                violations.push(ConstraintViolation {
                    constraint: feature.id.clone(),
                    rule: self.name().to_string(),
                    message: format!("{} imports forbidden module {:?}", file, target),
                    file: file.clone(),
                    line: Some(statement.start_position().row + 1),
                    expected: format!("no import of {}", name),
                    actual: target,
                });
            }
        }

        Ok(violations)
    }
}

/// Async route handlers must wrap their body in try/catch.
///
/// Only a `try_statement` that is a direct child of the handler's body
/// block counts. Expression-bodied async arrows always violate.
pub struct AsyncErrorHandling;

impl AsyncErrorHandling {
    /// `receiver.verb(...)` or `receiver.use(...)`, including verbs chained
    /// off `receiver.route(path)`.
    fn is_registration(tree: &SyntaxTree, receiver: Node, verb: &str) -> bool {
        if verb != "use" && !is_http_verb(verb) {
            return false;
        }
        match receiver.kind() {
            "identifier" => is_route_receiver(tree.node_text(receiver)),
            "call_expression" => Self::is_route_chain(tree, receiver),
            _ => false,
        }
    }

    /// Walk down a `.route(p).get(h).post(h)` chain to its root.
    fn is_route_chain(tree: &SyntaxTree, mut call: Node) -> bool {
        loop {
            let Some(member) = call.child_by_field_name("function") else {
                return false;
            };
            if member.kind() != "member_expression" {
                return false;
            }
            let (Some(object), Some(property)) = (
                member.child_by_field_name("object"),
                member.child_by_field_name("property"),
            ) else {
                return false;
            };

            let name = tree.node_text(property);
            if name == "route" {
                return object.kind() == "identifier" && is_route_receiver(tree.node_text(object));
            }
            if !is_http_verb(name) || object.kind() != "call_expression" {
                return false;
            }
            call = object;
        }
    }

    fn is_async_function(node: Node) -> bool {
        if !matches!(node.kind(), "arrow_function" | "function_expression" | "function") {
            return false;
        }
        let mut cursor = node.walk();
        let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");
        is_async
    }

    fn has_top_level_try(node: Node) -> bool {
        let Some(body) = node.child_by_field_name("body") else {
            return false;
        };
        if body.kind() != "statement_block" {
            return false;
        }
        let mut cursor = body.walk();
        let found = body
            .named_children(&mut cursor)
            .any(|c| c.kind() == "try_statement");
        found
    }
}

impl ConstraintRule for AsyncErrorHandling {
    fn name(&self) -> &'static str {
        ASYNC_ERROR_HANDLING
    }

    fn evaluate(
        &self,
        feature: &Feature,
        scope: &Scope,
        ctx: &RuleContext,
    ) -> anyhow::Result<Vec<ConstraintViolation>> {
        let mut violations = Vec::new();
        let syntax = ctx.analysis.syntax();

        for (file, tree) in ctx.scoped_trees(scope, self.name()) {
            for set in syntax.query(&tree, REGISTRATION_QUERY)? {
                let (Some(receiver), Some(verb), Some(args)) =
                    (set.get("receiver"), set.get("verb"), set.get("args"))
                else {
                    continue;
                };
                if !Self::is_registration(&tree, receiver, tree.node_text(verb)) {
                    continue;
                }

                for handler in call_arguments(args) {
                    if !Self::is_async_function(handler) || Self::has_top_level_try(handler) {
                        continue;
                    }
                    violations.push(ConstraintViolation {
                        constraint: feature.id.clone(),
                        rule: self.name().to_string(),
                        message: format!(
                            "async handler passed to .{}() has no top-level try/catch",
                            tree.node_text(verb)
                        ),
                        file: file.clone(),
                        line: Some(handler.start_position().row + 1),
                        expected: "try/catch at the top of the handler body".to_string(),
                        actual: "no try statement".to_string(),
                    });
                }
            }
        }

        Ok(violations)
    }
}

/// All rules that ship with the crate.
pub fn builtin_rules() -> Vec<Box<dyn ConstraintRule>> {
    vec![
        Box::new(RoutesRequireMiddleware),
        Box::new(NoDirectImport),
        Box::new(AsyncErrorHandling),
    ]
}
