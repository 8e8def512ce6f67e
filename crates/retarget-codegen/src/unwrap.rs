//! Module-wrapper unwrapping.
//!
//! Bundled sources often wrap a whole module in an immediately invoked
//! factory:
//!
//! ```text
//! (function () { "use strict"; class A {} ... })();
//! (function (root, factory) { ... })(this, function (deps) { class A {} ... });
//! ```
//!
//! [`top_level_statements`] peels these wrappers so transformers see the
//! declarations themselves. Inside an unwrapped body, directive strings,
//! feature-detection `if`s and the factory's `return` are dropped.

use retarget_il::{Function, Node, Program};

/// The program's effective top-level statements, with wrappers removed.
pub fn top_level_statements(program: &Program) -> Vec<Node> {
    let mut body = program.body.clone();
    let mut depth = 0;
    while let Some(inner) = unwrap_once(&body) {
        depth += 1;
        body = inner;
    }
    if depth > 0 {
        tracing::debug!(depth, statements = body.len(), "unwrapped module factory");
    }
    body
}

fn unwrap_once(body: &[Node]) -> Option<Vec<Node>> {
    let mut meaningful = body.iter().filter(|node| !is_directive(node) && !is_empty(node));
    let only = meaningful.next()?;
    if meaningful.next().is_some() {
        return None;
    }
    let Node::ExpressionStatement { expression } = only else {
        return None;
    };
    let factory = wrapped_factory(expression)?;
    Some(
        factory
            .body_statements()
            .iter()
            .filter(|node| {
                !is_directive(node)
                    && !is_empty(node)
                    && !matches!(node, Node::IfStatement { .. } | Node::ReturnStatement { .. })
            })
            .cloned()
            .collect(),
    )
}

/// The function whose body is the module, if `expression` is a wrapper call.
fn wrapped_factory(expression: &Node) -> Option<&Function> {
    let call = match expression {
        // `!function () {}()` and `void function () {}()`
        Node::UnaryExpression { argument, .. } => argument.as_ref(),
        other => other,
    };
    let Node::CallExpression { callee, arguments } = call else {
        return None;
    };
    let callee = callee.as_inline_function()?;
    if arguments.len() >= 2
        && let Some(factory) = arguments[1].as_inline_function()
    {
        return Some(factory);
    }
    // An arrow with an expression body has no statements to lift.
    matches!(*callee.body, Node::BlockStatement { .. }).then_some(callee)
}

fn is_directive(node: &Node) -> bool {
    matches!(node, Node::ExpressionStatement { expression } if expression.as_string_literal().is_some())
}

fn is_empty(node: &Node) -> bool {
    matches!(node, Node::EmptyStatement {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use retarget_il::build::*;

    fn names(body: &[Node]) -> Vec<String> {
        body.iter().map(|node| node.kind().to_string()).collect()
    }

    #[test]
    fn test_iife_wrapping_one_class_yields_the_class() {
        let program = Program::new(vec![iife(vec![
            expr_stmt(string("use strict")),
            class_decl("Cipher", None, vec![]),
        ])]);
        let body = top_level_statements(&program);
        assert_eq!(names(&body), ["ClassDeclaration"]);
    }

    #[test]
    fn test_factory_selection_call() {
        let umd = expr_stmt(call(
            function_expr(
                &["root", "factory"],
                vec![if_stmt(ident("define"), block(vec![]), None)],
            ),
            vec![
                this(),
                function_expr(
                    &["deps"],
                    vec![
                        class_decl("A", None, vec![]),
                        if_stmt(ident("module"), block(vec![]), None),
                        ret(Some(ident("A"))),
                    ],
                ),
            ],
        ));
        let body = top_level_statements(&Program::new(vec![umd]));
        assert_eq!(names(&body), ["ClassDeclaration"]);
    }

    #[test]
    fn test_unwrapping_is_idempotent() {
        let program = Program::new(vec![iife(vec![iife(vec![function_decl("f", &[], vec![])])])]);
        let once = top_level_statements(&program);
        let twice = top_level_statements(&Program::new(once.clone()));
        assert_eq!(once, twice);
        assert_eq!(names(&once), ["FunctionDeclaration"]);
    }

    #[test]
    fn test_non_wrapper_calls_are_left_alone() {
        let program = Program::new(vec![
            expr_stmt(call(ident("main"), vec![])),
            iife(vec![class_decl("A", None, vec![])]),
        ]);
        let body = top_level_statements(&program);
        assert_eq!(body, program.body);
    }
}
