//! Stdlib helper resolution.
//!
//! Calls such as `OpCodes.RotL32(x, 7)` name helpers that exist in no target
//! runtime. Before transformation, every helper the bridge knows is
//! prepended as a top-level function declaration and its call sites are
//! rewritten to call it by its bare name. Helpers calling other helpers are
//! resolved the same way.

use crate::unwrap::top_level_statements;
use retarget_il::{Identifier, Node, Program};
use retarget_stdlib::StdlibBridge;
use std::collections::HashSet;
use std::sync::Arc;

/// Resolve helper calls in a copy of `program`.
///
/// Returns `None` when the program calls no helper namespace at all, so the
/// caller can keep using the original tree.
pub fn resolve_helpers(
    program: &Program,
    bridge: &StdlibBridge,
    namespaces: &[String],
    warnings: &mut Vec<String>,
) -> Option<Program> {
    let mentions_helper = program.body.iter().any(|node| {
        node.any(&mut |n| {
            matches!(n, Node::CallExpression { callee, .. } if helper_name(callee, namespaces).is_some())
        })
    });
    if !mentions_helper {
        return None;
    }

    let mut body = top_level_statements(program);
    let declared = body
        .iter()
        .filter_map(|node| match node {
            Node::FunctionDeclaration(function) => function.name().map(str::to_string),
            _ => None,
        })
        .collect();
    let mut resolver = Resolver {
        bridge,
        namespaces,
        declared,
        added: Vec::new(),
        seen: HashSet::new(),
        missing: HashSet::new(),
        warnings,
    };
    for node in &mut body {
        resolver.rewrite(node);
    }

    let mut helpers = Vec::new();
    let mut next = 0;
    while let Some(function) = resolver.added.get(next).cloned() {
        let mut function = (*function).clone();
        resolver.rewrite(&mut function.body);
        helpers.push(Node::FunctionDeclaration(function));
        next += 1;
    }
    tracing::debug!(helpers = helpers.len(), "resolved stdlib helpers");

    helpers.extend(body);
    Some(Program::new(helpers))
}

/// `Namespace.method` when `callee` calls into a helper namespace.
fn helper_name(callee: &Node, namespaces: &[String]) -> Option<(String, String)> {
    let Node::MemberExpression {
        object,
        property,
        computed: false,
    } = callee
    else {
        return None;
    };
    let namespace = object.as_identifier()?;
    if !namespaces.iter().any(|ns| ns == namespace) {
        return None;
    }
    Some((namespace.to_string(), property.property_name()?))
}

struct Resolver<'a> {
    bridge: &'a StdlibBridge,
    namespaces: &'a [String],
    declared: HashSet<String>,
    added: Vec<Arc<retarget_il::Function>>,
    seen: HashSet<String>,
    missing: HashSet<String>,
    warnings: &'a mut Vec<String>,
}

impl Resolver<'_> {
    fn rewrite(&mut self, node: &mut Node) {
        node.walk_mut(&mut |n| {
            let Node::CallExpression { callee, .. } = n else {
                return;
            };
            let Some((namespace, method)) = helper_name(callee, self.namespaces) else {
                return;
            };
            if self.resolve(&namespace, &method) {
                **callee = Node::Identifier(Identifier::new(method));
            }
        });
    }

    fn resolve(&mut self, namespace: &str, method: &str) -> bool {
        if self.declared.contains(method) || self.seen.contains(method) {
            return true;
        }
        if self.missing.contains(method) {
            return false;
        }
        match self.bridge.get_method_ast(method) {
            Ok(Some(function)) => {
                self.seen.insert(method.to_string());
                self.added.push(function);
                true
            }
            Ok(None) => {
                self.missing.insert(method.to_string());
                self.warnings
                    .push(format!("unknown helper {namespace}.{method}; call left as is"));
                false
            }
            Err(err) => {
                self.missing.insert(method.to_string());
                tracing::warn!(%err, "stdlib lookup failed");
                self.warnings.push(format!("helper {namespace}.{method}: {err}"));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retarget_il::build::*;
    use retarget_stdlib::InMemorySource;

    fn namespaces() -> Vec<String> {
        vec!["OpCodes".to_string()]
    }

    fn opcodes(method: &str, args: Vec<Node>) -> Node {
        call(member(ident("OpCodes"), method), args)
    }

    fn bridge() -> StdlibBridge {
        StdlibBridge::new(
            InMemorySource::new()
                .with_method(
                    "RotL32",
                    function(Some("RotL32"), &["x", "n"], vec![ret(Some(opcodes("ToUint32", vec![ident("x")])))]),
                )
                .with_method(
                    "ToUint32",
                    function(Some("ToUint32"), &["x"], vec![ret(Some(ident("x")))]),
                ),
        )
    }

    #[test]
    fn test_helpers_are_prepended_transitively() {
        let program = Program::new(vec![expr_stmt(opcodes("RotL32", vec![ident("a"), int(7)]))]);
        let mut warnings = Vec::new();
        let resolved = resolve_helpers(&program, &bridge(), &namespaces(), &mut warnings).unwrap();

        let names: Vec<_> = resolved
            .body
            .iter()
            .filter_map(|n| match n {
                Node::FunctionDeclaration(f) => f.name(),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["RotL32", "ToUint32"]);
        assert_eq!(
            resolved.body[2],
            expr_stmt(call(ident("RotL32"), vec![ident("a"), int(7)]))
        );
        assert!(warnings.is_empty());
        // The caller's tree is untouched.
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_unknown_helpers_warn_once() {
        let program = Program::new(vec![
            expr_stmt(opcodes("Nope", vec![])),
            expr_stmt(opcodes("Nope", vec![])),
        ]);
        let mut warnings = Vec::new();
        let resolved = resolve_helpers(&program, &bridge(), &namespaces(), &mut warnings).unwrap();
        assert_eq!(resolved.body, program.body);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("OpCodes.Nope"), "{}", warnings[0]);
    }

    #[test]
    fn test_programs_without_helper_calls_are_not_copied() {
        let program = Program::new(vec![expr_stmt(call(member(ident("Math"), "floor"), vec![]))]);
        let mut warnings = Vec::new();
        assert!(resolve_helpers(&program, &bridge(), &namespaces(), &mut warnings).is_none());
    }
}
