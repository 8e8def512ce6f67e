//! Generic traversal over IL nodes.

use crate::node::{ClassMember, Node, Program};

// Both directions share one body; `$iter`/`$opt`/`$boxed` pick the shared or
// mutable accessor and match ergonomics pick the binding mode.
macro_rules! collect_children {
    ($node:expr, $out:ident, $iter:ident, $opt:ident, $boxed:ident) => {
        match $node {
            Node::Program(program) => $out.extend(program.body.$iter()),
            Node::VariableDeclaration { declarations, .. } => {
                for declarator in declarations.$iter() {
                    $out.push(declarator.id.$boxed());
                    $out.extend(declarator.init.$opt());
                }
            }
            Node::FunctionDeclaration(function)
            | Node::FunctionExpression(function)
            | Node::ArrowFunctionExpression(function) => {
                $out.extend(function.params.$iter());
                $out.push(function.body.$boxed());
            }
            Node::ClassDeclaration(class) => {
                $out.extend(class.super_class.$opt());
                for member in class.body.body.$iter() {
                    match member {
                        ClassMember::MethodDefinition { key, value, .. } => {
                            $out.push(key.$boxed());
                            $out.extend(value.params.$iter());
                            $out.push(value.body.$boxed());
                        }
                        ClassMember::PropertyDefinition { key, value, .. } => {
                            $out.push(key.$boxed());
                            $out.extend(value.$opt());
                        }
                        ClassMember::StaticBlock { body } => $out.extend(body.$iter()),
                        ClassMember::Unknown { .. } => {}
                    }
                }
            }
            Node::ExpressionStatement { expression } => $out.push(expression.$boxed()),
            Node::BlockStatement { body } => $out.extend(body.$iter()),
            Node::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                $out.push(test.$boxed());
                $out.push(consequent.$boxed());
                $out.extend(alternate.$opt());
            }
            Node::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                $out.extend(init.$opt());
                $out.extend(test.$opt());
                $out.extend(update.$opt());
                $out.push(body.$boxed());
            }
            Node::ForOfStatement { left, right, body }
            | Node::ForInStatement { left, right, body } => {
                $out.push(left.$boxed());
                $out.push(right.$boxed());
                $out.push(body.$boxed());
            }
            Node::WhileStatement { test, body } => {
                $out.push(test.$boxed());
                $out.push(body.$boxed());
            }
            Node::DoWhileStatement { body, test } => {
                $out.push(body.$boxed());
                $out.push(test.$boxed());
            }
            Node::SwitchStatement {
                discriminant,
                cases,
            } => {
                $out.push(discriminant.$boxed());
                for case in cases.$iter() {
                    $out.extend(case.test.$opt());
                    $out.extend(case.consequent.$iter());
                }
            }
            Node::ReturnStatement { argument } => $out.extend(argument.$opt()),
            Node::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                $out.push(block.$boxed());
                if let Some(handler) = handler {
                    $out.extend(handler.param.$opt());
                    $out.push(handler.body.$boxed());
                }
                $out.extend(finalizer.$opt());
            }
            Node::ThrowStatement { argument }
            | Node::SpreadElement { argument }
            | Node::AwaitExpression { argument }
            | Node::RestElement { argument }
            | Node::UnaryExpression { argument, .. }
            | Node::UpdateExpression { argument, .. }
            | Node::MathFloor { argument }
            | Node::MathCeil { argument }
            | Node::MathRound { argument }
            | Node::MathAbs { argument }
            | Node::MathSqrt { argument }
            | Node::MathTrunc { argument }
            | Node::MathSign { argument }
            | Node::MathLog { argument } => $out.push(argument.$boxed()),
            Node::TemplateLiteral { expressions, .. }
            | Node::SequenceExpression { expressions } => $out.extend(expressions.$iter()),
            Node::BinaryExpression { left, right, .. }
            | Node::LogicalExpression { left, right, .. }
            | Node::AssignmentExpression { left, right, .. }
            | Node::AssignmentPattern { left, right }
            | Node::ArrayXor { left, right } => {
                $out.push(left.$boxed());
                $out.push(right.$boxed());
            }
            Node::MemberExpression {
                object, property, ..
            } => {
                $out.push(object.$boxed());
                $out.push(property.$boxed());
            }
            Node::CallExpression { callee, arguments }
            | Node::NewExpression { callee, arguments } => {
                $out.push(callee.$boxed());
                $out.extend(arguments.$iter());
            }
            Node::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                $out.push(test.$boxed());
                $out.push(consequent.$boxed());
                $out.push(alternate.$boxed());
            }
            Node::ArrayExpression { elements } | Node::ArrayPattern { elements } => {
                $out.extend(elements.$iter().flatten())
            }
            Node::ObjectExpression { properties }
            | Node::ObjectPattern { properties }
            | Node::MapCreation {
                entries: properties,
            } => $out.extend(properties.$iter()),
            Node::Property { key, value, .. } => {
                $out.push(key.$boxed());
                $out.push(value.$boxed());
            }
            Node::MathMin { arguments }
            | Node::MathMax { arguments }
            | Node::DebugOutput { arguments, .. }
            | Node::StringFromCharCodes { codes: arguments }
            | Node::StringConcat { parts: arguments }
            | Node::PackBytes {
                bytes: arguments, ..
            } => $out.extend(arguments.$iter()),
            Node::ArrayLength { array }
            | Node::ArrayPop { array }
            | Node::ArrayShift { array }
            | Node::ArrayReverse { array }
            | Node::ArrayClear { array }
            | Node::ArrayUnique { array }
            | Node::CopyArray { array }
            | Node::ArrayFrom { iterable: array }
            | Node::MapKeys { map: array }
            | Node::MapValues { map: array }
            | Node::MapEntries { map: array }
            | Node::MapSize { map: array }
            | Node::ObjectFreeze { object: array }
            | Node::IsArray { value: array }
            | Node::IsInteger { value: array }
            | Node::UnpackBytes { value: array, .. }
            | Node::Cast {
                expression: array, ..
            }
            | Node::StringLength { string: array }
            | Node::StringToUpper { string: array }
            | Node::StringToLower { string: array }
            | Node::StringTrim { string: array }
            | Node::StringToBytes { string: array, .. }
            | Node::ParseFloat { string: array }
            | Node::HexDecode { string: array }
            | Node::Base64Decode { string: array }
            | Node::BytesToString { bytes: array, .. }
            | Node::HexEncode { bytes: array }
            | Node::Base64Encode { bytes: array } => $out.push(array.$boxed()),
            Node::ArrayPush { array, values }
            | Node::ArrayUnshift { array, values }
            | Node::ArrayConcat {
                array,
                others: values,
            } => {
                $out.push(array.$boxed());
                $out.extend(values.$iter());
            }
            Node::ArraySlice { array, start, end } => {
                $out.push(array.$boxed());
                $out.extend(start.$opt());
                $out.extend(end.$opt());
            }
            Node::ArraySplice {
                array,
                start,
                delete_count,
                items,
            } => {
                $out.push(array.$boxed());
                $out.push(start.$boxed());
                $out.extend(delete_count.$opt());
                $out.extend(items.$iter());
            }
            Node::ArrayIndexOf { array, value }
            | Node::ArrayIncludes { array, value }
            | Node::ArrayMap {
                array,
                callback: value,
            }
            | Node::ArrayFilter {
                array,
                callback: value,
            }
            | Node::ArrayForEach {
                array,
                callback: value,
            }
            | Node::ArrayFind {
                array,
                callback: value,
            }
            | Node::ArrayEvery {
                array,
                callback: value,
            }
            | Node::ArraySome {
                array,
                callback: value,
            }
            | Node::StringIndexOf {
                string: array,
                search: value,
            }
            | Node::StringStartsWith {
                string: array,
                search: value,
            }
            | Node::StringEndsWith {
                string: array,
                search: value,
            }
            | Node::StringIncludes {
                string: array,
                search: value,
            }
            | Node::StringRepeat {
                string: array,
                count: value,
            }
            | Node::StringCharAt {
                string: array,
                index: value,
            }
            | Node::StringCharCodeAt {
                string: array,
                index: value,
            }
            | Node::MathPow {
                base: array,
                exponent: value,
            }
            | Node::RotateLeft {
                value: array,
                amount: value,
                ..
            }
            | Node::RotateRight {
                value: array,
                amount: value,
                ..
            }
            | Node::MapGet { map: array, key: value }
            | Node::MapHas { map: array, key: value }
            | Node::MapDelete { map: array, key: value } => {
                $out.push(array.$boxed());
                $out.push(value.$boxed());
            }
            Node::ArrayJoin {
                array,
                separator: extra,
            }
            | Node::ArraySort {
                array,
                compare: extra,
            }
            | Node::StringSplit {
                string: array,
                separator: extra,
            }
            | Node::ParseInteger {
                string: array,
                radix: extra,
            }
            | Node::NumberToString {
                value: array,
                radix: extra,
            } => {
                $out.push(array.$boxed());
                $out.extend(extra.$opt());
            }
            Node::ArrayFill {
                array,
                value,
                start,
                end,
            } => {
                $out.push(array.$boxed());
                $out.push(value.$boxed());
                $out.extend(start.$opt());
                $out.extend(end.$opt());
            }
            Node::ArrayReduce {
                array,
                callback,
                initial,
            } => {
                $out.push(array.$boxed());
                $out.push(callback.$boxed());
                $out.extend(initial.$opt());
            }
            Node::StringSubstring { string, start, end } => {
                $out.push(string.$boxed());
                $out.push(start.$boxed());
                $out.extend(end.$opt());
            }
            Node::StringReplace {
                string,
                search,
                replacement,
                ..
            } => {
                $out.push(string.$boxed());
                $out.push(search.$boxed());
                $out.push(replacement.$boxed());
            }
            Node::StringPadStart {
                string,
                length,
                fill,
            }
            | Node::StringPadEnd {
                string,
                length,
                fill,
            } => {
                $out.push(string.$boxed());
                $out.push(length.$boxed());
                $out.extend(fill.$opt());
            }
            Node::MapSet { map, key, value } => {
                $out.push(map.$boxed());
                $out.push(key.$boxed());
                $out.push(value.$boxed());
            }
            Node::ArrayCreation { size, .. } | Node::ErrorCreation { message: size, .. } => {
                $out.extend(size.$opt())
            }
            Node::TypedArrayCreation { size, source, .. } => {
                $out.extend(size.$opt());
                $out.extend(source.$opt());
            }
            Node::EmptyStatement {}
            | Node::BreakStatement {}
            | Node::ContinueStatement {}
            | Node::ThisExpression {}
            | Node::Super {}
            | Node::MathRandom {}
            | Node::Literal(..)
            | Node::Identifier(..)
            | Node::Unknown { .. } => {}
        }
    };
}

impl Node {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = Vec::new();
        collect_children!(self, out, iter, as_deref, as_ref);
        out
    }

    pub fn children_mut(&mut self) -> Vec<&mut Node> {
        let mut out: Vec<&mut Node> = Vec::new();
        collect_children!(self, out, iter_mut, as_deref_mut, as_mut);
        out
    }

    /// Pre-order walk over this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Pre-order mutable walk. The callback sees a node before its children,
    /// so rewriting a node also rewrites what gets visited next.
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Node)) {
        visit(self);
        for child in self.children_mut() {
            child.walk_mut(visit);
        }
    }

    /// Whether this node or any descendant satisfies `pred`.
    pub fn any(&self, pred: &mut impl FnMut(&Node) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|child| child.any(pred))
    }
}

impl Program {
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        for node in &self.body {
            node.walk(visit);
        }
    }

    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Node)) {
        for node in &mut self.body {
            node.walk_mut(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::build::*;
    use crate::node::Node;
    use crate::operator::BinaryOperator;

    #[test]
    fn test_children_in_source_order() {
        let node = binary(BinaryOperator::Add, ident("a"), ident("b"));
        let names: Vec<_> = node
            .children()
            .into_iter()
            .filter_map(Node::as_identifier)
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_array_holes_are_not_children() {
        let node = Node::ArrayPattern {
            elements: vec![None, Some(ident("b")), None],
        };
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn test_walk_mut_renames_every_identifier() {
        let mut node = call(ident("f"), vec![ident("x"), member(ident("o"), "p")]);
        node.walk_mut(&mut |n| {
            if let Node::Identifier(id) = n {
                id.name = id.name.to_uppercase();
            }
        });
        let mut seen = Vec::new();
        node.walk(&mut |n| {
            if let Some(name) = n.as_identifier() {
                seen.push(name.to_string());
            }
        });
        assert_eq!(seen, ["F", "X", "O", "P"]);
    }

    #[test]
    fn test_any_finds_nested_construction() {
        let node = var_decl("x", Some(call(ident("wrap"), vec![new_expr(ident("A"), vec![])])));
        assert!(node.any(&mut |n| matches!(n, Node::NewExpression { .. })));
    }
}
