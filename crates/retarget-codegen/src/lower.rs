//! IL queries shared by the transformers.

use retarget_il::{
    AssignmentOperator, Class, ClassMember, Function, MethodKind, Node, SwitchCase,
};

/// Consecutive `case` labels sharing one body.
#[derive(Debug)]
pub struct CaseGroup<'a> {
    /// Tests of the grouped labels; empty for a group holding only `default:`.
    pub tests: Vec<&'a Node>,
    pub is_default: bool,
    /// The body with a trailing `break` removed.
    pub body: &'a [Node],
    /// Whether control falls into the next group (no `break`, `return`,
    /// `throw` or `continue` at the end).
    pub falls_through: bool,
}

/// Group switch cases: empty cases merge into the next non-empty one.
pub fn switch_groups(cases: &[SwitchCase]) -> Vec<CaseGroup<'_>> {
    let mut groups = Vec::new();
    let mut tests = Vec::new();
    let mut is_default = false;
    for (i, case) in cases.iter().enumerate() {
        match &case.test {
            Some(test) => tests.push(test.as_ref()),
            None => is_default = true,
        }
        if case.consequent.is_empty() && i + 1 < cases.len() {
            continue;
        }
        let (body, falls_through) = match case.consequent.split_last() {
            Some((Node::BreakStatement {}, rest)) => (rest, false),
            Some((last, _)) => (case.consequent.as_slice(), !is_terminal(last)),
            None => (case.consequent.as_slice(), false),
        };
        groups.push(CaseGroup {
            tests: std::mem::take(&mut tests),
            is_default: std::mem::take(&mut is_default),
            body,
            falls_through: falls_through && i + 1 < cases.len(),
        });
    }
    groups
}

/// Whether evaluating `node` as a statement does anything.
pub fn has_effect(node: &Node) -> bool {
    matches!(
        node,
        Node::CallExpression { .. }
            | Node::NewExpression { .. }
            | Node::AssignmentExpression { .. }
            | Node::UpdateExpression { .. }
            | Node::AwaitExpression { .. }
            | Node::ArrayPush { .. }
            | Node::ArrayPop { .. }
            | Node::ArrayShift { .. }
            | Node::ArrayUnshift { .. }
            | Node::ArraySplice { .. }
            | Node::MapSet { .. }
            | Node::MapDelete { .. }
            | Node::DebugOutput { .. }
    )
}

/// Bodies each case group runs, following fall-through into later groups.
pub fn reachable_bodies<'a>(groups: &[CaseGroup<'a>]) -> Vec<Vec<&'a Node>> {
    (0..groups.len())
        .map(|start| {
            let mut body = Vec::new();
            for group in &groups[start..] {
                body.extend(group.body.iter());
                if !group.falls_through {
                    break;
                }
            }
            body
        })
        .collect()
}

/// Whether a statement never completes normally.
pub fn is_terminal(node: &Node) -> bool {
    match node {
        Node::ReturnStatement { .. }
        | Node::ThrowStatement { .. }
        | Node::BreakStatement {}
        | Node::ContinueStatement {} => true,
        Node::BlockStatement { body } => body.last().is_some_and(is_terminal),
        Node::IfStatement {
            consequent,
            alternate: Some(alternate),
            ..
        } => is_terminal(consequent) && is_terminal(alternate),
        _ => false,
    }
}

/// Whether a `break` inside `body` would leave the enclosing switch rather
/// than a loop nested in it.
pub fn breaks_switch(body: &[Node]) -> bool {
    fn visit(node: &Node) -> bool {
        match node {
            Node::BreakStatement {} => true,
            Node::ForStatement { .. }
            | Node::ForOfStatement { .. }
            | Node::ForInStatement { .. }
            | Node::WhileStatement { .. }
            | Node::DoWhileStatement { .. }
            | Node::SwitchStatement { .. }
            | Node::FunctionDeclaration(_)
            | Node::FunctionExpression(_)
            | Node::ArrowFunctionExpression(_)
            | Node::ClassDeclaration(_) => false,
            other => other.children().into_iter().any(visit),
        }
    }
    body.iter().any(visit)
}

/// Whether `body` contains a `continue` bound to the loop it sits in.
pub fn has_own_continue(body: &Node) -> bool {
    match body {
        Node::ContinueStatement {} => true,
        Node::ForStatement { .. }
        | Node::ForOfStatement { .. }
        | Node::ForInStatement { .. }
        | Node::WhileStatement { .. }
        | Node::DoWhileStatement { .. }
        | Node::FunctionDeclaration(_)
        | Node::FunctionExpression(_)
        | Node::ArrowFunctionExpression(_)
        | Node::ClassDeclaration(_) => false,
        other => other.children().into_iter().any(has_own_continue),
    }
}

/// The constructor of a class, if it declares one.
pub fn constructor(class: &Class) -> Option<&Function> {
    class.body.body.iter().find_map(|member| match member {
        ClassMember::MethodDefinition {
            kind: MethodKind::Constructor,
            value,
            ..
        } => Some(value),
        _ => None,
    })
}

/// Arguments of a leading `super(...)` call, and the statements after it.
pub fn split_super_call(body: &[Node]) -> (Option<&[Node]>, &[Node]) {
    if let Some((
        Node::ExpressionStatement { expression },
        rest,
    )) = body.split_first()
        && let Node::CallExpression { callee, arguments } = expression.as_ref()
        && matches!(callee.as_ref(), Node::Super {})
    {
        return (Some(arguments.as_slice()), rest);
    }
    (None, body)
}

/// A field assigned through `this.name = value` somewhere in the class but
/// not declared with a property definition.
#[derive(Debug)]
pub struct ImplicitField<'a> {
    pub name: String,
    /// The first value assigned, for type inference.
    pub value: &'a Node,
    pub is_static: bool,
}

/// Fields a class only creates by assignment, in first-assignment order.
pub fn implicit_fields(class: &Class) -> Vec<ImplicitField<'_>> {
    let declared: Vec<String> = class
        .body
        .body
        .iter()
        .filter_map(|member| match member {
            ClassMember::PropertyDefinition {
                key,
                computed: false,
                ..
            }
            | ClassMember::MethodDefinition {
                key,
                computed: false,
                ..
            } => key.property_name(),
            _ => None,
        })
        .collect();

    let mut found: Vec<ImplicitField<'_>> = Vec::new();
    for member in &class.body.body {
        let (body, is_static): (&Node, bool) = match member {
            ClassMember::MethodDefinition {
                value, is_static, ..
            } => (value.body.as_ref(), *is_static),
            _ => continue,
        };
        body.walk(&mut |node| {
            let Node::AssignmentExpression {
                operator: AssignmentOperator::Assign,
                left,
                right,
            } = node
            else {
                return;
            };
            let Node::MemberExpression {
                object,
                property,
                computed: false,
            } = left.as_ref()
            else {
                return;
            };
            if !matches!(object.as_ref(), Node::ThisExpression {}) {
                return;
            }
            let Some(name) = property.property_name() else {
                return;
            };
            if declared.contains(&name) || found.iter().any(|f| f.name == name) {
                return;
            }
            found.push(ImplicitField {
                name,
                value: right,
                is_static,
            });
        });
    }
    found
}

/// Every `return` value in a function body, skipping nested functions.
pub fn return_values(function: &Function) -> Vec<&Node> {
    fn visit<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
        match node {
            Node::ReturnStatement { argument } => {
                if let Some(argument) = argument {
                    out.push(argument);
                }
            }
            Node::FunctionDeclaration(_)
            | Node::FunctionExpression(_)
            | Node::ArrowFunctionExpression(_)
            | Node::ClassDeclaration(_) => {}
            other => {
                for child in other.children() {
                    visit(child, out);
                }
            }
        }
    }
    if function.expression {
        return vec![function.body.as_ref()];
    }
    let mut out = Vec::new();
    visit(&function.body, &mut out);
    out
}

/// Whether `node` constructs, or calls, anything named in `defined`.
pub fn references_any(node: &Node, defined: &[String]) -> bool {
    node.any(&mut |n| match n {
        Node::NewExpression { callee, .. } | Node::CallExpression { callee, .. } => callee
            .as_identifier()
            .is_some_and(|name| defined.iter().any(|d| d == name)),
        Node::Identifier(id) => defined.contains(&id.name),
        _ => false,
    })
}

/// Whether the function body awaits anything.
pub fn awaits(function: &Function) -> bool {
    function.is_async
        || function.body.any(&mut |n| matches!(n, Node::AwaitExpression { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use retarget_il::build::*;

    fn case(test: Option<Node>, consequent: Vec<Node>) -> SwitchCase {
        SwitchCase {
            test: test.map(Box::new),
            consequent,
        }
    }

    #[test]
    fn test_empty_cases_merge_into_the_next_body() {
        let cases = vec![
            case(Some(int(1)), vec![]),
            case(Some(int(2)), vec![expr_stmt(ident("a")), Node::BreakStatement {}]),
            case(None, vec![ret(None)]),
        ];
        let groups = switch_groups(&cases);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].tests.len(), 2);
        assert_eq!(groups[0].body.len(), 1);
        assert!(!groups[0].falls_through);
        assert!(groups[1].is_default);
    }

    #[test]
    fn test_fallthrough_is_detected() {
        let cases = vec![
            case(Some(int(1)), vec![expr_stmt(ident("a"))]),
            case(Some(int(2)), vec![expr_stmt(ident("b"))]),
        ];
        let groups = switch_groups(&cases);
        assert!(groups[0].falls_through);
        assert!(!groups[1].falls_through);
    }

    #[test]
    fn test_implicit_fields_come_from_this_assignments() {
        let class = class_decl(
            "Cipher",
            None,
            vec![
                field("rounds", Some(int(10))),
                method(
                    "constructor",
                    &["key"],
                    vec![
                        expr_stmt(assign(member(this(), "key"), ident("key"))),
                        expr_stmt(assign(member(this(), "rounds"), int(12))),
                    ],
                ),
                method("reset", &[], vec![expr_stmt(assign(member(this(), "state"), array(vec![])))]),
            ],
        );
        let Node::ClassDeclaration(class) = class else {
            unreachable!()
        };
        let names: Vec<_> = implicit_fields(&class).into_iter().map(|f| f.name).collect();
        assert_eq!(names, ["key", "state"]);
    }

    #[test]
    fn test_super_call_is_split_off() {
        let body = vec![
            expr_stmt(call(Node::Super {}, vec![ident("x")])),
            expr_stmt(ident("y")),
        ];
        let (args, rest) = split_super_call(&body);
        assert_eq!(args.map(<[Node]>::len), Some(1));
        assert_eq!(rest.len(), 1);
    }
}
