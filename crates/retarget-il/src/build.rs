//! Shorthand constructors for building IL trees in code and tests.

use crate::node::*;
use crate::operator::*;

pub fn ident(name: &str) -> Node {
    Node::Identifier(Identifier::new(name))
}

/// An identifier carrying a declared IL type.
pub fn typed_ident(name: &str, result_type: &str) -> Node {
    Node::Identifier(Identifier {
        name: name.to_string(),
        result_type: Some(result_type.to_string()),
    })
}

pub fn number(value: f64) -> Node {
    Node::Literal(Literal {
        value: LiteralValue::Number(value),
        raw: None,
        result_type: None,
    })
}

pub fn int(value: i64) -> Node {
    Node::Literal(Literal {
        value: LiteralValue::Number(value as f64),
        raw: Some(value.to_string()),
        result_type: None,
    })
}

/// An integer literal spelled in hexadecimal.
pub fn hex(value: u64) -> Node {
    Node::Literal(Literal {
        value: LiteralValue::Number(value as f64),
        raw: Some(format!("0x{value:X}")),
        result_type: None,
    })
}

pub fn string(value: &str) -> Node {
    Node::Literal(Literal {
        value: LiteralValue::String(value.to_string()),
        raw: None,
        result_type: None,
    })
}

pub fn boolean(value: bool) -> Node {
    Node::Literal(Literal {
        value: LiteralValue::Bool(value),
        raw: None,
        result_type: None,
    })
}

pub fn null() -> Node {
    Node::Literal(Literal {
        value: LiteralValue::Null,
        raw: None,
        result_type: None,
    })
}

pub fn this() -> Node {
    Node::ThisExpression {}
}

pub fn binary(operator: BinaryOperator, left: Node, right: Node) -> Node {
    Node::BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn logical(operator: LogicalOperator, left: Node, right: Node) -> Node {
    Node::LogicalExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn unary(operator: UnaryOperator, argument: Node) -> Node {
    Node::UnaryExpression {
        operator,
        argument: Box::new(argument),
    }
}

pub fn assign(left: Node, right: Node) -> Node {
    assign_op(AssignmentOperator::Assign, left, right)
}

pub fn assign_op(operator: AssignmentOperator, left: Node, right: Node) -> Node {
    Node::AssignmentExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn update(operator: UpdateOperator, prefix: bool, argument: Node) -> Node {
    Node::UpdateExpression {
        operator,
        prefix,
        argument: Box::new(argument),
    }
}

/// `object.property`
pub fn member(object: Node, property: &str) -> Node {
    Node::MemberExpression {
        object: Box::new(object),
        property: Box::new(ident(property)),
        computed: false,
    }
}

/// `object[index]`
pub fn index(object: Node, index: Node) -> Node {
    Node::MemberExpression {
        object: Box::new(object),
        property: Box::new(index),
        computed: true,
    }
}

pub fn call(callee: Node, arguments: Vec<Node>) -> Node {
    Node::CallExpression {
        callee: Box::new(callee),
        arguments,
    }
}

pub fn new_expr(callee: Node, arguments: Vec<Node>) -> Node {
    Node::NewExpression {
        callee: Box::new(callee),
        arguments,
    }
}

pub fn conditional(test: Node, consequent: Node, alternate: Node) -> Node {
    Node::ConditionalExpression {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
    }
}

pub fn array(elements: Vec<Node>) -> Node {
    Node::ArrayExpression {
        elements: elements.into_iter().map(Some).collect(),
    }
}

pub fn object(properties: Vec<(&str, Node)>) -> Node {
    Node::ObjectExpression {
        properties: properties
            .into_iter()
            .map(|(key, value)| property(key, value))
            .collect(),
    }
}

pub fn property(key: &str, value: Node) -> Node {
    Node::Property {
        key: Box::new(ident(key)),
        value: Box::new(value),
        computed: false,
        shorthand: false,
    }
}

pub fn expr_stmt(expression: Node) -> Node {
    Node::ExpressionStatement {
        expression: Box::new(expression),
    }
}

pub fn block(body: Vec<Node>) -> Node {
    Node::BlockStatement { body }
}

pub fn ret(argument: Option<Node>) -> Node {
    Node::ReturnStatement {
        argument: argument.map(Box::new),
    }
}

pub fn if_stmt(test: Node, consequent: Node, alternate: Option<Node>) -> Node {
    Node::IfStatement {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: alternate.map(Box::new),
    }
}

pub fn while_stmt(test: Node, body: Node) -> Node {
    Node::WhileStatement {
        test: Box::new(test),
        body: Box::new(body),
    }
}

pub fn throw(argument: Node) -> Node {
    Node::ThrowStatement {
        argument: Box::new(argument),
    }
}

/// `let name = init;`
pub fn var_decl(name: &str, init: Option<Node>) -> Node {
    declaration(DeclarationKind::Let, ident(name), init)
}

/// `const name = init;`
pub fn const_decl(name: &str, init: Node) -> Node {
    declaration(DeclarationKind::Const, ident(name), Some(init))
}

/// A single-declarator declaration binding `id` (an identifier or a pattern).
pub fn declaration(kind: DeclarationKind, id: Node, init: Option<Node>) -> Node {
    Node::VariableDeclaration {
        kind,
        declarations: vec![VariableDeclarator {
            id: Box::new(id),
            init: init.map(Box::new),
            result_type: None,
        }],
    }
}

pub fn function(name: Option<&str>, params: &[&str], body: Vec<Node>) -> Function {
    Function {
        id: name.map(Identifier::new),
        params: params.iter().map(|p| ident(p)).collect(),
        body: Box::new(block(body)),
        is_async: false,
        generator: false,
        expression: false,
        return_type: None,
        docs: None,
    }
}

pub fn function_decl(name: &str, params: &[&str], body: Vec<Node>) -> Node {
    Node::FunctionDeclaration(function(Some(name), params, body))
}

pub fn function_expr(params: &[&str], body: Vec<Node>) -> Node {
    Node::FunctionExpression(function(None, params, body))
}

/// `(params) => expression`
pub fn arrow(params: &[&str], expression: Node) -> Node {
    Node::ArrowFunctionExpression(Function {
        id: None,
        params: params.iter().map(|p| ident(p)).collect(),
        body: Box::new(expression),
        is_async: false,
        generator: false,
        expression: true,
        return_type: None,
        docs: None,
    })
}

pub fn class_decl(name: &str, super_class: Option<&str>, members: Vec<ClassMember>) -> Node {
    Node::ClassDeclaration(Class {
        id: Some(Identifier::new(name)),
        super_class: super_class.map(|s| Box::new(ident(s))),
        body: ClassBody { body: members },
        docs: None,
    })
}

pub fn method(name: &str, params: &[&str], body: Vec<Node>) -> ClassMember {
    ClassMember::MethodDefinition {
        key: Box::new(ident(name)),
        kind: if name == "constructor" {
            MethodKind::Constructor
        } else {
            MethodKind::Method
        },
        is_static: false,
        computed: false,
        value: function(None, params, body),
    }
}

pub fn field(name: &str, value: Option<Node>) -> ClassMember {
    ClassMember::PropertyDefinition {
        key: Box::new(ident(name)),
        value: value.map(Box::new),
        is_static: false,
        computed: false,
        result_type: None,
    }
}

/// Immediately invoked `(function () { body })()`.
pub fn iife(body: Vec<Node>) -> Node {
    expr_stmt(call(function_expr(&[], body), vec![]))
}
