//! Lowering IL programs into the Python tree.
//!
//! Python has no block scope, no declarations and no C-style loops, so most
//! of the work here is scoping: `global`/`nonlocal` for assignments that
//! reach outward, counted `for` loops turned into `range()` or `while`, and
//! function expressions that cannot be lambdas lifted into named `def`s
//! placed right before the statement that used them.

use super::PythonOptions;
use super::ast::*;
use crate::destructure::{self, Access};
use crate::escape::{PYTHON_RESERVED, Rename, float_literal, sanitize_identifier};
use crate::infer::expression_type;
use crate::lower;
use crate::precedence::Op;
use crate::traits::Transformer;
use crate::types::{Primitive, TypeRef, TypeSyntax, parse_il_type};
use crate::unwrap::top_level_statements;
use retarget_il::{
    AssignmentOperator, BinaryOperator, Class, ClassMember, CompoundOperator, DeclarationKind,
    Function, Literal, LiteralValue, LogicalOperator, MethodKind, Node, Program, SwitchCase,
    UnaryOperator, UpdateOperator, VariableDeclarator,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Default)]
struct Scope {
    declared: HashSet<String>,
    /// Names bound to dict literals; member access on them is subscripting.
    dicts: HashSet<String>,
}

pub struct PythonTransformer {
    pub(super) options: PythonOptions,
    pub(super) warnings: Vec<String>,
    imports: BTreeSet<String>,
    from_imports: BTreeMap<String, BTreeSet<String>>,
    temps: usize,
    /// Definitions lifted out of the statement being lowered.
    pub(super) hoisted: Vec<Stmt>,
    scopes: Vec<Scope>,
    /// Per enclosing loop, the statements a `continue` must run first.
    pub(super) loops: Vec<Vec<Stmt>>,
    classes: HashSet<String>,
    /// Spelling of `this`: `self` in methods, the class name in static code.
    receivers: Vec<String>,
    /// Fields of the class being lowered that hold dicts.
    dict_fields: HashSet<String>,
}

impl PythonTransformer {
    pub fn new(options: PythonOptions) -> Self {
        Self {
            options,
            warnings: Vec::new(),
            imports: BTreeSet::new(),
            from_imports: BTreeMap::new(),
            temps: 0,
            hoisted: Vec::new(),
            scopes: Vec::new(),
            loops: Vec::new(),
            classes: HashSet::new(),
            receivers: Vec::new(),
            dict_fields: HashSet::new(),
        }
    }

    fn reset(&mut self) {
        self.warnings.clear();
        self.imports.clear();
        self.from_imports.clear();
        self.temps = 0;
        self.hoisted.clear();
        self.scopes.clear();
        self.loops.clear();
        self.classes.clear();
        self.receivers.clear();
        self.dict_fields.clear();
    }

    pub(super) fn import(&mut self, module: &str) {
        self.imports.insert(module.to_string());
    }

    pub(super) fn import_from(&mut self, module: &str, name: &str) {
        self.from_imports
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string());
    }

    fn take_imports(&mut self) -> Vec<Import> {
        let mut imports: Vec<Import> = std::mem::take(&mut self.imports)
            .into_iter()
            .map(|module| Import {
                module,
                names: Vec::new(),
            })
            .collect();
        imports.extend(
            std::mem::take(&mut self.from_imports)
                .into_iter()
                .map(|(module, names)| Import {
                    module,
                    names: names.into_iter().collect(),
                }),
        );
        imports
    }

    pub(super) fn temp(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.temps);
        self.temps += 1;
        name
    }

    pub(super) fn ident(&self, name: &str) -> String {
        sanitize_identifier(name, PYTHON_RESERVED, Rename::Suffix)
    }

    /// Report a construct with no Python spelling and stand in a placeholder.
    pub(super) fn unsupported(&mut self, what: impl Into<String>) -> Expr {
        let what = what.into();
        tracing::debug!(construct = %what, "no python lowering");
        self.warnings.push(format!("unsupported construct: {what}"));
        Expr::Placeholder(what)
    }

    fn unknown_kind(&mut self, kind: &str) {
        self.warnings.push(format!("unhandled kind: {kind}"));
    }

    /// Whether `name` is bound by the program rather than a JS global.
    pub(super) fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.declared.contains(name))
    }

    fn mark_dict(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.dicts.insert(name.to_string());
        }
    }

    pub(super) fn is_dict(&self, node: &Node) -> bool {
        match node {
            Node::Identifier(id) => self
                .scopes
                .iter()
                .rev()
                .find(|scope| scope.declared.contains(&id.name) || scope.dicts.contains(&id.name))
                .is_some_and(|scope| scope.dicts.contains(&id.name)),
            Node::MemberExpression {
                object,
                property,
                computed: false,
            } if matches!(object.as_ref(), Node::ThisExpression {}) => property
                .property_name()
                .is_some_and(|name| self.dict_fields.contains(&name)),
            _ => false,
        }
    }

    pub(super) fn annotation(&mut self, il_type: &str) -> Option<String> {
        if !self.options.type_hints {
            return None;
        }
        let ty = parse_il_type(il_type);
        let text = if ty == TypeRef::bytes() {
            "bytearray".to_string()
        } else {
            ty.render(&PythonTypes)
        };
        if text.contains("Any") {
            self.import_from("typing", "Any");
        }
        self.import_from("__future__", "annotations");
        Some(text)
    }

    fn docstring(&self, docs: Option<&str>) -> Option<String> {
        if !self.options.doc_comments {
            return None;
        }
        docs.map(str::trim)
            .filter(|docs| !docs.is_empty())
            .map(str::to_string)
    }

    fn receiver(&self) -> Expr {
        match self.receivers.last() {
            Some(receiver) => Expr::name(receiver),
            None => Expr::None,
        }
    }

    // ------------------------------------------------------------ statements

    pub(super) fn block(&mut self, nodes: &[Node]) -> Vec<Stmt> {
        let mut out = Vec::new();
        for node in nodes {
            out.extend(self.statement(node));
        }
        out
    }

    /// Lower one statement, with the definitions it lifted placed before it.
    fn statement(&mut self, node: &Node) -> Vec<Stmt> {
        self.hoisting(|this| this.lower_statement(node))
    }

    fn hoisting(&mut self, lower: impl FnOnce(&mut Self) -> Vec<Stmt>) -> Vec<Stmt> {
        let outer = std::mem::take(&mut self.hoisted);
        let lowered = lower(self);
        let mut out = std::mem::replace(&mut self.hoisted, outer);
        out.extend(lowered);
        out
    }

    fn body(&mut self, node: &Node) -> Vec<Stmt> {
        match node {
            Node::BlockStatement { body } => self.block(body),
            other => self.statement(other),
        }
    }

    fn lower_statement(&mut self, node: &Node) -> Vec<Stmt> {
        match node {
            Node::Program(program) => self.block(&program.body),
            Node::VariableDeclaration { declarations, .. } => {
                let mut out = Vec::new();
                for declarator in declarations {
                    out.extend(self.declarator(declarator));
                }
                out
            }
            Node::FunctionDeclaration(function) => {
                let name = self.ident(function.name().unwrap_or("_anonymous"));
                vec![Stmt::FunctionDef(self.function_def(function, &name))]
            }
            Node::ClassDeclaration(class) => self.class_def(class),
            Node::ExpressionStatement { expression } => self.expression_statement(expression),
            Node::BlockStatement { body } => self.block(body),
            Node::EmptyStatement {} => Vec::new(),
            Node::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                let test = self.expr(test);
                let body = self.body(consequent);
                let orelse = match alternate {
                    Some(alternate) => self.body(alternate),
                    None => Vec::new(),
                };
                vec![Stmt::If { test, body, orelse }]
            }
            Node::ForStatement {
                init,
                test,
                update,
                body,
            } => self.for_loop(init.as_deref(), test.as_deref(), update.as_deref(), body),
            Node::ForOfStatement { left, right, body } => self.for_each(left, right, body, false),
            Node::ForInStatement { left, right, body } => self.for_each(left, right, body, true),
            Node::WhileStatement { test, body } => {
                let test = self.expr(test);
                self.loops.push(Vec::new());
                let body = self.body(body);
                self.loops.pop();
                vec![Stmt::While { test, body }]
            }
            Node::DoWhileStatement { body, test } => {
                let check = Stmt::If {
                    test: Expr::not(self.expr(test)),
                    body: vec![Stmt::Break],
                    orelse: Vec::new(),
                };
                self.loops.push(vec![check.clone()]);
                let mut body = self.body(body);
                self.loops.pop();
                body.push(check);
                vec![Stmt::While {
                    test: Expr::Bool(true),
                    body,
                }]
            }
            Node::SwitchStatement {
                discriminant,
                cases,
            } => self.switch(discriminant, cases),
            Node::BreakStatement {} => vec![Stmt::Break],
            Node::ContinueStatement {} => {
                let mut out = self.loops.last().cloned().unwrap_or_default();
                out.push(Stmt::Continue);
                out
            }
            Node::ReturnStatement { argument } => {
                vec![Stmt::Return(argument.as_deref().map(|value| self.expr(value)))]
            }
            Node::ThrowStatement { argument } => vec![Stmt::Raise(Some(self.exception(argument)))],
            Node::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                let body = self.body(block);
                let mut handlers = Vec::new();
                if let Some(clause) = handler {
                    let mut prologue = Vec::new();
                    let name = match clause.param.as_deref() {
                        None => None,
                        Some(Node::Identifier(id)) => Some(self.ident(&id.name)),
                        Some(pattern) => {
                            let temp = self.temp("_err");
                            prologue = self.bind_pattern(pattern, Expr::name(&temp));
                            Some(temp)
                        }
                    };
                    prologue.extend(self.body(&clause.body));
                    handlers.push(Handler {
                        name,
                        body: prologue,
                    });
                }
                let finalbody = match finalizer {
                    Some(finalizer) => self.body(finalizer),
                    None => Vec::new(),
                };
                if handlers.is_empty() && finalbody.is_empty() {
                    return body;
                }
                vec![Stmt::Try {
                    body,
                    handlers,
                    finalbody,
                }]
            }
            Node::Unknown { kind } => {
                self.unknown_kind(kind);
                vec![Stmt::Placeholder(kind.clone())]
            }
            expression @ retarget_il::expression_kinds!() => self.expression_statement(expression),
        }
    }

    fn declarator(&mut self, declarator: &VariableDeclarator) -> Vec<Stmt> {
        let init = declarator.init.as_deref();
        let Node::Identifier(id) = declarator.id.as_ref() else {
            return self.destructure(&declarator.id, init);
        };
        let name = self.ident(&id.name);
        if let Some(function) = init.and_then(Node::as_inline_function) {
            return vec![Stmt::FunctionDef(self.function_def(function, &name))];
        }
        if init.is_some_and(is_dict_literal) {
            self.mark_dict(&id.name);
        }
        let value = match init {
            Some(init) => self.expr(init),
            None => Expr::None,
        };
        let annotation = declarator
            .result_type
            .as_deref()
            .or(id.result_type.as_deref())
            .and_then(|ty| self.annotation(ty));
        match annotation {
            Some(annotation) => vec![Stmt::AnnAssign {
                target: name,
                annotation,
                value: Some(value),
            }],
            None => vec![Stmt::assign(Expr::Name(name), value)],
        }
    }

    fn destructure(&mut self, pattern: &Node, init: Option<&Node>) -> Vec<Stmt> {
        for part in destructure::unsupported_parts(pattern) {
            self.unsupported(part);
        }
        let Some(init) = init else {
            return destructure::bindings(pattern)
                .into_iter()
                .map(|binding| Stmt::assign(Expr::Name(self.ident(&binding.name)), Expr::None))
                .collect();
        };
        if let Some(swap) = self.tuple_assignment(pattern, init) {
            return vec![swap];
        }
        let mut out = Vec::new();
        let value = self.expr(init);
        let source = if destructure::needs_temporary(init) {
            let temp = self.temp("_tmp");
            out.push(Stmt::assign(Expr::name(&temp), value));
            Expr::Name(temp)
        } else {
            value
        };
        out.extend(self.bind_pattern(pattern, source));
        out
    }

    /// `[a, b] = [b, a]` as one tuple assignment.
    fn tuple_assignment(&mut self, pattern: &Node, init: &Node) -> Option<Stmt> {
        let (Node::ArrayPattern { elements: targets }, Node::ArrayExpression { elements: values }) =
            (pattern, init)
        else {
            return None;
        };
        if targets.len() != values.len() || targets.len() < 2 {
            return None;
        }
        let mut names = Vec::new();
        for target in targets {
            match target {
                Some(Node::Identifier(id)) => names.push(Expr::Name(self.ident(&id.name))),
                _ => return None,
            }
        }
        if values
            .iter()
            .any(|value| !matches!(value, Some(v) if !matches!(v, Node::SpreadElement { .. })))
        {
            return None;
        }
        let items = values.iter().flatten().map(|value| self.expr(value)).collect();
        Some(Stmt::Assign {
            targets: vec![Expr::Tuple(names)],
            value: Expr::Tuple(items),
        })
    }

    /// One assignment per name bound by `pattern`, reading from `source`.
    pub(super) fn bind_pattern(&mut self, pattern: &Node, source: Expr) -> Vec<Stmt> {
        let mut out = Vec::new();
        for binding in destructure::bindings(pattern) {
            let mut value = source.clone();
            for access in &binding.path {
                value = match access {
                    Access::Index(i) => value.index(Expr::int(*i as i64)),
                    Access::Key(key) => value.index(Expr::str(key)),
                    Access::RestFrom(i) => value.slice(Some(Expr::int(*i as i64)), None),
                };
            }
            if let Some(default) = binding.default {
                let fallback = self.expr(default);
                value = Expr::if_exp(
                    Expr::bin(Op::IsNot, value.clone(), Expr::None),
                    value,
                    fallback,
                );
            }
            out.push(Stmt::assign(Expr::Name(self.ident(&binding.name)), value));
        }
        out
    }

    pub(super) fn expression_statement(&mut self, node: &Node) -> Vec<Stmt> {
        match node {
            Node::AssignmentExpression {
                operator,
                left,
                right,
            } => self.assignment(*operator, left, right),
            Node::UpdateExpression {
                operator, argument, ..
            } => vec![Stmt::AugAssign {
                target: self.expr(argument),
                op: match operator {
                    UpdateOperator::Increment => Op::Add,
                    UpdateOperator::Decrement => Op::Sub,
                },
                value: Expr::int(1),
            }],
            Node::SequenceExpression { expressions } => expressions
                .iter()
                .flat_map(|expression| self.expression_statement(expression))
                .collect(),
            Node::UnaryExpression {
                operator: UnaryOperator::Delete,
                argument,
            } => match argument.as_ref() {
                Node::MemberExpression {
                    object,
                    property,
                    computed: true,
                } => {
                    let object = self.expr(object);
                    let key = self.expr(property);
                    vec![Stmt::Expr(Expr::method(object, "pop", vec![key, Expr::None]))]
                }
                other => vec![Stmt::Delete(self.expr(other))],
            },
            Node::UnaryExpression {
                operator: UnaryOperator::Void,
                argument,
            } => self.expression_statement(argument),
            Node::LogicalExpression {
                operator,
                left,
                right,
            } if lower::has_effect(right) => {
                let value = self.expr(left);
                let test = match operator {
                    LogicalOperator::And => value,
                    LogicalOperator::Or => Expr::not(value),
                    LogicalOperator::Coalesce => Expr::bin(Op::Is, value, Expr::None),
                };
                let body = self.expression_statement(right);
                vec![Stmt::If {
                    test,
                    body,
                    orelse: Vec::new(),
                }]
            }
            Node::ConditionalExpression {
                test,
                consequent,
                alternate,
            } if lower::has_effect(consequent) || lower::has_effect(alternate) => {
                let test = self.expr(test);
                let body = self.expression_statement(consequent);
                let orelse = self.expression_statement(alternate);
                vec![Stmt::If { test, body, orelse }]
            }
            other => match self.semantic_statement(other) {
                Some(statements) => statements,
                None => vec![Stmt::Expr(self.expr(other))],
            },
        }
    }

    fn assignment(&mut self, operator: AssignmentOperator, left: &Node, right: &Node) -> Vec<Stmt> {
        match operator.compound() {
            None => {
                if destructure::is_pattern(left) {
                    return self.destructure(left, Some(right));
                }
                if let Node::MemberExpression {
                    object,
                    property,
                    computed: false,
                } = left
                    && property.property_name().as_deref() == Some("length")
                {
                    let object = self.expr(object);
                    let length = self.expr(right);
                    return vec![Stmt::Delete(object.slice(Some(length), None))];
                }
                if let Node::Identifier(id) = left
                    && is_dict_literal(right)
                {
                    self.mark_dict(&id.name);
                }
                let mut targets = vec![self.expr(left)];
                let mut value = right;
                while let Node::AssignmentExpression {
                    operator: AssignmentOperator::Assign,
                    left,
                    right,
                } = value
                    && !destructure::is_pattern(left)
                {
                    targets.push(self.expr(left));
                    value = right.as_ref();
                }
                let value = self.expr(value);
                vec![Stmt::Assign { targets, value }]
            }
            Some(CompoundOperator::Binary(BinaryOperator::UShr)) => {
                let target = self.expr(left);
                let value = self.binary(BinaryOperator::UShr, left, right);
                vec![Stmt::assign(target, value)]
            }
            Some(CompoundOperator::Binary(BinaryOperator::Add))
                if self.is_stringy(left) || self.is_stringy(right) =>
            {
                let target = self.expr(left);
                let value = self.as_text(right);
                vec![Stmt::AugAssign {
                    target,
                    op: Op::Add,
                    value,
                }]
            }
            Some(CompoundOperator::Binary(operator)) => {
                let target = self.expr(left);
                let value = self.expr(right);
                match Op::from_binary(operator) {
                    Some(op) => vec![Stmt::AugAssign { target, op, value }],
                    None => vec![Stmt::Expr(self.unsupported(format!("{}=", operator.as_str())))],
                }
            }
            Some(CompoundOperator::Logical(operator)) => {
                let target = self.expr(left);
                let value = self.expr(right);
                let test = match operator {
                    LogicalOperator::And => target.clone(),
                    LogicalOperator::Or => Expr::not(target.clone()),
                    LogicalOperator::Coalesce => Expr::bin(Op::Is, target.clone(), Expr::None),
                };
                vec![Stmt::If {
                    test,
                    body: vec![Stmt::assign(target, value)],
                    orelse: Vec::new(),
                }]
            }
        }
    }

    fn for_loop(
        &mut self,
        init: Option<&Node>,
        test: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
    ) -> Vec<Stmt> {
        if let Some(range) = self.range_loop(init, test, update, body) {
            return vec![range];
        }
        let mut out = match init {
            Some(init @ Node::VariableDeclaration { .. }) => self.lower_statement(init),
            Some(init) => self.expression_statement(init),
            None => Vec::new(),
        };
        let test = match test {
            Some(test) => self.expr(test),
            None => Expr::Bool(true),
        };
        let update = match update {
            Some(update) => self.expression_statement(update),
            None => Vec::new(),
        };
        self.loops.push(update.clone());
        let mut lowered = self.body(body);
        self.loops.pop();
        if !lowered.last().is_some_and(is_exit) {
            lowered.extend(update);
        }
        out.push(Stmt::While {
            test,
            body: lowered,
        });
        out
    }

    /// `for (let i = a; i < b; i++)` as `for i in range(a, b)` when the loop
    /// variable and the bound are left alone by the body.
    fn range_loop(
        &mut self,
        init: Option<&Node>,
        test: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
    ) -> Option<Stmt> {
        let Node::VariableDeclaration {
            kind: DeclarationKind::Let,
            declarations,
        } = init?
        else {
            return None;
        };
        let [declarator] = declarations.as_slice() else {
            return None;
        };
        let var = declarator.id.as_identifier()?;
        let start = declarator.init.as_deref()?;
        let Node::BinaryExpression {
            operator,
            left,
            right: bound,
        } = test?
        else {
            return None;
        };
        if left.as_identifier() != Some(var) {
            return None;
        }
        let step = match update? {
            Node::UpdateExpression {
                operator, argument, ..
            } if argument.as_identifier() == Some(var) => match operator {
                UpdateOperator::Increment => 1,
                UpdateOperator::Decrement => -1,
            },
            Node::AssignmentExpression {
                operator: AssignmentOperator::Add,
                left,
                right,
            } if left.as_identifier() == Some(var) => int_literal(right).filter(|n| *n > 0)?,
            Node::AssignmentExpression {
                operator: AssignmentOperator::Sub,
                left,
                right,
            } if left.as_identifier() == Some(var) => -int_literal(right).filter(|n| *n > 0)?,
            _ => return None,
        };
        let inclusive = match (operator, step > 0) {
            (BinaryOperator::Lt, true) | (BinaryOperator::Gt, false) => false,
            (BinaryOperator::Le, true) | (BinaryOperator::Ge, false) => true,
            _ => return None,
        };
        if assigns(body, var) || !is_stable_bound(bound, body) {
            return None;
        }

        let start = self.expr(start);
        let mut stop = self.expr(bound);
        if inclusive {
            let widen = if step > 0 { Op::Add } else { Op::Sub };
            stop = Expr::bin(widen, stop, Expr::int(1));
        }
        let args = if step == 1 && start == Expr::int(0) {
            vec![stop]
        } else if step == 1 {
            vec![start, stop]
        } else {
            vec![start, stop, Expr::int(step)]
        };
        self.loops.push(Vec::new());
        let body = self.body(body);
        self.loops.pop();
        Some(Stmt::For {
            target: Expr::Name(self.ident(var)),
            iter: Expr::call_named("range", args),
            body,
        })
    }

    fn for_each(&mut self, left: &Node, right: &Node, body: &Node, keys: bool) -> Vec<Stmt> {
        let binding = match left {
            Node::VariableDeclaration { declarations, .. } => {
                declarations.first().map(|declarator| declarator.id.as_ref())
            }
            other => Some(other),
        };
        let Some(binding) = binding else {
            return vec![Stmt::Expr(self.unsupported("loop without a binding"))];
        };
        let mut iter = self.expr(right);
        if keys && expression_type(right).is_some_and(|ty| ty.is_array() || ty.is_list()) {
            iter = Expr::call_named("range", vec![Expr::call_named("len", vec![iter])]);
        }
        let mut prologue = Vec::new();
        let target = match binding {
            Node::Identifier(id) => Expr::Name(self.ident(&id.name)),
            Node::ArrayPattern { elements }
                if elements
                    .iter()
                    .all(|element| matches!(element, Some(Node::Identifier(_)))) =>
            {
                if !keys && elements.len() == 2 && self.is_dict(right) {
                    iter = Expr::method(iter, "items", Vec::new());
                }
                Expr::Tuple(elements.iter().flatten().map(|element| self.expr(element)).collect())
            }
            pattern => {
                let temp = self.temp("_item");
                prologue = self.bind_pattern(pattern, Expr::name(&temp));
                Expr::Name(temp)
            }
        };
        self.loops.push(Vec::new());
        prologue.extend(self.body(body));
        self.loops.pop();
        vec![Stmt::For {
            target,
            iter,
            body: prologue,
        }]
    }

    fn switch(&mut self, discriminant: &Node, cases: &[SwitchCase]) -> Vec<Stmt> {
        let groups = lower::switch_groups(cases);
        let mut out = Vec::new();
        let value = self.expr(discriminant);
        let subject = if value.is_simple() {
            value
        } else {
            let temp = self.temp("_switch");
            out.push(Stmt::assign(Expr::name(&temp), value));
            Expr::Name(temp)
        };
        // A `break` left inside a case body must leave the switch only.
        let exits_early = groups.iter().any(|group| lower::breaks_switch(group.body));

        let mut branches = Vec::new();
        let mut default = None;
        for (i, group) in groups.iter().enumerate() {
            let mut body = self.block(group.body);
            let mut next = i;
            while groups[next].falls_through && next + 1 < groups.len() {
                next += 1;
                body.extend(self.block(groups[next].body));
            }
            if group.is_default {
                default = Some(body);
                continue;
            }
            let tests: Vec<Expr> = group.tests.iter().map(|test| self.expr(test)).collect();
            let test = match <[Expr; 1]>::try_from(tests) {
                Ok([single]) => Expr::bin(Op::Eq, subject.clone(), single),
                Err(tests) => Expr::bin(Op::In, subject.clone(), Expr::Tuple(tests)),
            };
            branches.push((test, body));
        }

        let mut chain = default.unwrap_or_default();
        for (test, body) in branches.into_iter().rev() {
            chain = vec![Stmt::If {
                test,
                body,
                orelse: chain,
            }];
        }
        if exits_early {
            chain.push(Stmt::Break);
            out.push(Stmt::While {
                test: Expr::Bool(true),
                body: chain,
            });
        } else {
            out.extend(chain);
        }
        out
    }

    fn exception(&mut self, argument: &Node) -> Expr {
        let value = self.expr(argument);
        match argument {
            Node::NewExpression { .. }
            | Node::ErrorCreation { .. }
            | Node::Identifier(_)
            | Node::MemberExpression { .. }
            | Node::CallExpression { .. } => value,
            _ => Expr::call_named("Exception", vec![value]),
        }
    }

    // ------------------------------------------------------------- functions

    pub(super) fn function_def(&mut self, function: &Function, name: &str) -> FunctionDef {
        self.function_with(function, name, None, Vec::new())
    }

    /// Lower a function. `field_inits` run right after a leading `super()`
    /// call, or first when there is none.
    fn function_with(
        &mut self,
        function: &Function,
        name: &str,
        receiver: Option<&str>,
        field_inits: Vec<Stmt>,
    ) -> FunctionDef {
        let mut declared = collect_declared(function.body_statements());
        for param in &function.params {
            let bound = match param {
                Node::RestElement { argument } => argument.as_ref(),
                other => other,
            };
            declared.extend(destructure::bindings(bound).into_iter().map(|b| b.name));
        }

        let mut params = Vec::new();
        if let Some(receiver) = receiver {
            params.push(Param::plain(receiver));
        }
        let mut prologue = Vec::new();
        for param in &function.params {
            params.push(self.param(param, &mut prologue));
        }

        let outer_loops = std::mem::take(&mut self.loops);
        self.scopes.push(Scope {
            declared: declared.clone(),
            dicts: HashSet::new(),
        });
        let mut body = prologue;
        if function.expression {
            body.extend(self.hoisting(|this| vec![Stmt::Return(Some(this.expr(&function.body)))]));
        } else {
            let statements = function.body_statements();
            let (head, rest) = match lower::split_super_call(statements) {
                (Some(_), rest) if !field_inits.is_empty() => (&statements[..1], rest),
                _ => (&statements[..0], statements),
            };
            body.extend(self.block(head));
            body.extend(field_inits);
            body.extend(self.block(rest));
        }
        self.scopes.pop();
        self.loops = outer_loops;

        let mut globals = Vec::new();
        let mut nonlocals = Vec::new();
        for assigned in assigned_names(function) {
            if declared.contains(&assigned) {
                continue;
            }
            let spelled = self.ident(&assigned);
            let list = match self.scopes.iter().rposition(|scope| scope.declared.contains(&assigned)) {
                Some(0) => &mut globals,
                Some(_) => &mut nonlocals,
                None => continue,
            };
            if !list.contains(&spelled) {
                list.push(spelled);
            }
        }
        let mut statements = Vec::new();
        if !globals.is_empty() {
            statements.push(Stmt::Global(globals));
        }
        if !nonlocals.is_empty() {
            statements.push(Stmt::Nonlocal(nonlocals));
        }
        statements.extend(body);

        FunctionDef {
            name: name.to_string(),
            params,
            returns: function
                .return_type
                .as_deref()
                .and_then(|ty| self.annotation(ty)),
            body: statements,
            is_async: function.is_async,
            decorators: Vec::new(),
            docstring: self.docstring(function.docs.as_deref()),
        }
    }

    fn param(&mut self, param: &Node, prologue: &mut Vec<Stmt>) -> Param {
        match param {
            Node::Identifier(id) => Param {
                name: self.ident(&id.name),
                annotation: id.result_type.as_deref().and_then(|ty| self.annotation(ty)),
                default: None,
                variadic: false,
            },
            Node::AssignmentPattern { left, right } if matches!(left.as_ref(), Node::Identifier(_)) => {
                let mut param = self.param(left, prologue);
                let default = self.expr(right);
                // Python evaluates defaults once; JS evaluates them per call.
                if matches!(default, Expr::List(_) | Expr::Dict(_) | Expr::Call { .. }) {
                    prologue.push(Stmt::If {
                        test: Expr::bin(Op::Is, Expr::name(&param.name), Expr::None),
                        body: vec![Stmt::assign(Expr::name(&param.name), default)],
                        orelse: Vec::new(),
                    });
                    param.default = Some(Expr::None);
                } else {
                    param.default = Some(default);
                }
                param
            }
            Node::RestElement { argument } => match argument.as_ref() {
                Node::Identifier(id) => {
                    let name = self.ident(&id.name);
                    prologue.push(Stmt::assign(
                        Expr::name(&name),
                        Expr::call_named("list", vec![Expr::name(&name)]),
                    ));
                    Param {
                        variadic: true,
                        ..Param::plain(&name)
                    }
                }
                pattern => {
                    let name = self.temp("_args");
                    prologue.extend(self.bind_pattern(
                        pattern,
                        Expr::call_named("list", vec![Expr::name(&name)]),
                    ));
                    Param {
                        variadic: true,
                        ..Param::plain(&name)
                    }
                }
            },
            pattern => {
                let name = self.temp("_arg");
                prologue.extend(self.bind_pattern(pattern, Expr::name(&name)));
                Param::plain(&name)
            }
        }
    }

    /// A function in expression position: a lambda when the body is one
    /// expression, otherwise a lifted `def`.
    fn function_value(&mut self, function: &Function) -> Expr {
        if let Some(lambda) = self.lambda(function) {
            return lambda;
        }
        let name = self.temp("_fn");
        let def = self.function_def(function, &name);
        self.hoisted.push(Stmt::FunctionDef(def));
        Expr::Name(name)
    }

    fn lambda(&mut self, function: &Function) -> Option<Expr> {
        if function.is_async {
            return None;
        }
        let (params, body) = self.inline_callback(function, usize::MAX)?;
        let body = self.expr(body);
        Some(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    /// Parameter names and the single returned expression of a function
    /// simple enough to inline, with at most `arity` parameters.
    pub(super) fn inline_callback<'n>(
        &self,
        function: &'n Function,
        arity: usize,
    ) -> Option<(Vec<String>, &'n Node)> {
        if function.is_async || function.params.len() > arity {
            return None;
        }
        let body = if function.expression {
            function.body.as_ref()
        } else {
            match function.body_statements() {
                [Node::ReturnStatement {
                    argument: Some(value),
                }] => value.as_ref(),
                _ => return None,
            }
        };
        // Assignments would bind inside the lambda instead of outside it.
        if body.any(&mut |n| {
            matches!(
                n,
                Node::AssignmentExpression { .. } | Node::UpdateExpression { .. }
            )
        }) {
            return None;
        }
        let params = function
            .params
            .iter()
            .map(|param| param.as_identifier().map(|name| self.ident(name)))
            .collect::<Option<Vec<_>>>()?;
        Some((params, body))
    }

    // --------------------------------------------------------------- classes

    fn class_def(&mut self, class: &Class) -> Vec<Stmt> {
        let name = self.ident(class.name().unwrap_or("_Anonymous"));
        let bases = match class.super_class.as_deref() {
            None => Vec::new(),
            Some(base) => vec![match base.as_identifier().and_then(builtin_exception) {
                Some(exception) => Expr::name(exception),
                None => self.expr(base),
            }],
        };
        let outer_fields = std::mem::replace(&mut self.dict_fields, dict_fields(class));

        let mut body = Vec::new();
        let mut field_inits = Vec::new();
        let mut methods = Vec::new();
        let mut after = Vec::new();
        let mut constructor = None;
        for member in &class.body.body {
            match member {
                ClassMember::PropertyDefinition {
                    key,
                    value,
                    is_static,
                    computed,
                    result_type,
                } => {
                    let Some(field) = key.property_name().filter(|_| !computed) else {
                        body.push(Stmt::Expr(self.unsupported("computed class field")));
                        continue;
                    };
                    let field = self.ident(&field);
                    let receiver = if *is_static { name.clone() } else { "self".to_string() };
                    self.receivers.push(receiver);
                    let value = match value {
                        Some(value) => self.expr(value),
                        None => Expr::None,
                    };
                    self.receivers.pop();
                    if *is_static {
                        let annotation = result_type.as_deref().and_then(|ty| self.annotation(ty));
                        body.push(match annotation {
                            Some(annotation) => Stmt::AnnAssign {
                                target: field,
                                annotation,
                                value: Some(value),
                            },
                            None => Stmt::assign(Expr::Name(field), value),
                        });
                    } else {
                        field_inits.push(Stmt::assign(Expr::name("self").attr(&field), value));
                    }
                }
                ClassMember::MethodDefinition {
                    kind: MethodKind::Constructor,
                    value,
                    ..
                } => constructor = Some(value),
                ClassMember::MethodDefinition {
                    key,
                    kind,
                    is_static,
                    computed,
                    value,
                } => {
                    let Some(method) = key.property_name().filter(|_| !computed) else {
                        body.push(Stmt::Expr(self.unsupported("computed method name")));
                        continue;
                    };
                    let method = self.ident(&method);
                    methods.push(self.method_def(&name, &method, *kind, *is_static, value));
                }
                ClassMember::StaticBlock { body: statements } => {
                    self.receivers.push(name.clone());
                    after.extend(self.block(statements));
                    self.receivers.pop();
                }
                ClassMember::Unknown { kind } => {
                    self.unknown_kind(kind);
                    body.push(Stmt::Placeholder(kind.clone()));
                }
            }
        }

        let init = match constructor {
            Some(constructor) => {
                self.receivers.push("self".to_string());
                let init = self.function_with(constructor, "__init__", Some("self"), field_inits);
                self.receivers.pop();
                Some(init)
            }
            None if !field_inits.is_empty() => {
                let mut params = vec![Param::plain("self")];
                let mut statements = Vec::new();
                if !bases.is_empty() {
                    params.push(Param {
                        variadic: true,
                        ..Param::plain("args")
                    });
                    statements.push(Stmt::Expr(Expr::method(
                        Expr::call_named("super", Vec::new()),
                        "__init__",
                        vec![Expr::Starred(Box::new(Expr::name("args")))],
                    )));
                }
                statements.extend(field_inits);
                Some(FunctionDef {
                    name: "__init__".to_string(),
                    params,
                    returns: None,
                    body: statements,
                    is_async: false,
                    decorators: Vec::new(),
                    docstring: None,
                })
            }
            None => None,
        };
        body.extend(init.map(Stmt::FunctionDef));
        body.extend(methods.into_iter().map(Stmt::FunctionDef));
        self.dict_fields = outer_fields;

        let mut out = vec![Stmt::ClassDef(ClassDef {
            name,
            bases,
            body,
            docstring: self.docstring(class.docs.as_deref()),
        })];
        out.extend(after);
        out
    }

    fn method_def(
        &mut self,
        class: &str,
        name: &str,
        kind: MethodKind,
        is_static: bool,
        function: &Function,
    ) -> FunctionDef {
        if is_static {
            self.receivers.push(class.to_string());
            let mut def = self.function_with(function, name, None, Vec::new());
            self.receivers.pop();
            def.decorators.push("staticmethod".to_string());
            return def;
        }
        self.receivers.push("self".to_string());
        let mut def = self.function_with(function, name, Some("self"), Vec::new());
        self.receivers.pop();
        match kind {
            MethodKind::Get => def.decorators.push("property".to_string()),
            MethodKind::Set => def.decorators.push(format!("{name}.setter")),
            MethodKind::Method | MethodKind::Constructor => {}
        }
        def
    }

    fn stubs(&self, body: &[Node]) -> Vec<Stmt> {
        let mut names: Vec<String> = Vec::new();
        for node in body {
            node.walk(&mut |n| {
                if let Node::ClassDeclaration(class) = n
                    && let Some(base) = class.super_class.as_deref().and_then(Node::as_identifier)
                    && !self.classes.contains(base)
                    && builtin_exception(base).is_none()
                    && !names.iter().any(|name| name == base)
                {
                    names.push(base.to_string());
                }
            });
        }
        names
            .into_iter()
            .map(|name| {
                Stmt::ClassDef(ClassDef {
                    name: self.ident(&name),
                    bases: Vec::new(),
                    body: Vec::new(),
                    docstring: None,
                })
            })
            .collect()
    }

    // ----------------------------------------------------------- expressions

    pub(super) fn arguments(&mut self, arguments: &[Node]) -> Vec<Expr> {
        arguments.iter().map(|argument| self.expr(argument)).collect()
    }

    pub(super) fn expr(&mut self, node: &Node) -> Expr {
        match node {
            Node::Literal(literal) => self.literal(literal),
            Node::TemplateLiteral {
                quasis,
                expressions,
            } => {
                let mut parts = Vec::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    if !quasi.text().is_empty() {
                        parts.push(FPart::Text(quasi.text().to_string()));
                    }
                    if let Some(expression) = expressions.get(i) {
                        parts.push(FPart::Expr(self.expr(expression)));
                    }
                }
                Expr::FString(parts)
            }
            Node::Identifier(id) => self.identifier(&id.name),
            Node::ThisExpression {} => self.receiver(),
            Node::Super {} => Expr::call_named("super", Vec::new()),
            Node::BinaryExpression {
                operator,
                left,
                right,
            } => self.binary(*operator, left, right),
            Node::LogicalExpression {
                operator,
                left,
                right,
            } => {
                let left = self.expr(left);
                let right = self.expr(right);
                match operator {
                    LogicalOperator::And => Expr::bin(Op::And, left, right),
                    LogicalOperator::Or => Expr::bin(Op::Or, left, right),
                    LogicalOperator::Coalesce => {
                        let (test, value) = self.twice(left);
                        Expr::if_exp(Expr::bin(Op::IsNot, test, Expr::None), value, right)
                    }
                }
            }
            Node::UnaryExpression { operator, argument } => self.unary(*operator, argument),
            Node::UpdateExpression {
                operator,
                prefix,
                argument,
            } => self.update(*operator, *prefix, argument),
            Node::AssignmentExpression {
                operator,
                left,
                right,
            } => self.assignment_value(*operator, left, right),
            Node::MemberExpression {
                object,
                property,
                computed,
            } => self.member(object, property, *computed),
            Node::CallExpression { callee, arguments } => self.call(callee, arguments),
            Node::NewExpression { callee, arguments } => self.construct(callee, arguments),
            Node::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                let test = self.expr(test);
                let body = self.expr(consequent);
                let orelse = self.expr(alternate);
                Expr::if_exp(test, body, orelse)
            }
            Node::ArrayExpression { elements } => Expr::List(
                elements
                    .iter()
                    .map(|element| match element {
                        Some(element) => self.expr(element),
                        None => Expr::None,
                    })
                    .collect(),
            ),
            Node::ObjectExpression { properties } => self.dict(properties),
            Node::SpreadElement { argument } => Expr::Starred(Box::new(self.expr(argument))),
            Node::FunctionExpression(function) | Node::ArrowFunctionExpression(function) => {
                self.function_value(function)
            }
            Node::SequenceExpression { expressions } => {
                Expr::Tuple(self.arguments(expressions)).index(Expr::int(-1))
            }
            Node::AwaitExpression { argument } => Expr::Await(Box::new(self.expr(argument))),
            Node::ArrayPattern { elements } => Expr::Tuple(
                elements
                    .iter()
                    .map(|element| match element {
                        Some(element) => self.expr(element),
                        None => Expr::name("_"),
                    })
                    .collect(),
            ),
            Node::Property { .. }
            | Node::ObjectPattern { .. }
            | Node::AssignmentPattern { .. }
            | Node::RestElement { .. } => {
                self.unsupported(format!("{} in expression position", node.kind()))
            }
            retarget_il::semantic_kinds!() => self.semantic(node),
            retarget_il::statement_kinds!() => {
                self.unsupported(format!("{} in expression position", node.kind()))
            }
            Node::Unknown { kind } => {
                self.unknown_kind(kind);
                Expr::Placeholder(kind.clone())
            }
        }
    }

    fn literal(&mut self, literal: &Literal) -> Expr {
        match &literal.value {
            LiteralValue::Null => Expr::None,
            LiteralValue::Bool(value) => Expr::Bool(*value),
            LiteralValue::String(value) => Expr::Str(value.clone()),
            LiteralValue::Number(value) => match literal.as_integer() {
                Some(int) if literal.is_hex() && int >= 0 => Expr::Int(format!("0x{int:X}")),
                Some(int) => Expr::Int(int.to_string()),
                None if value.is_nan() => self.math_constant("nan"),
                None if value.is_infinite() && *value > 0.0 => self.math_constant("inf"),
                None if value.is_infinite() => Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(self.math_constant("inf")),
                },
                None => Expr::Float(float_literal(*value)),
            },
        }
    }

    pub(super) fn math_constant(&mut self, name: &str) -> Expr {
        self.import("math");
        Expr::name("math").attr(name)
    }

    fn identifier(&mut self, name: &str) -> Expr {
        match name {
            "undefined" => Expr::None,
            "NaN" => self.math_constant("nan"),
            "Infinity" => self.math_constant("inf"),
            _ => Expr::Name(self.ident(name)),
        }
    }

    pub(super) fn is_stringy(&self, node: &Node) -> bool {
        node.as_string_literal().is_some()
            || matches!(node, Node::TemplateLiteral { .. })
            || expression_type(node).is_some_and(|ty| ty.is_string())
    }

    /// `node` as a string operand: wrapped in `str()` unless already text.
    pub(super) fn as_text(&mut self, node: &Node) -> Expr {
        let value = self.expr(node);
        if self.is_stringy(node) {
            value
        } else {
            Expr::call_named("str", vec![value])
        }
    }

    /// An expression usable twice: simple ones as they are, anything else
    /// bound with `:=` on first use.
    pub(super) fn twice(&mut self, value: Expr) -> (Expr, Expr) {
        if value.is_simple() {
            return (value.clone(), value);
        }
        let temp = self.temp("_v");
        (
            Expr::Walrus {
                target: temp.clone(),
                value: Box::new(value),
            },
            Expr::Name(temp),
        )
    }

    pub(super) fn binary(&mut self, operator: BinaryOperator, left: &Node, right: &Node) -> Expr {
        use BinaryOperator as B;
        match operator {
            B::Eq | B::StrictEq | B::Ne | B::StrictNe if is_nullish(left) || is_nullish(right) => {
                let subject = if is_nullish(right) { left } else { right };
                let op = if matches!(operator, B::Eq | B::StrictEq) {
                    Op::Is
                } else {
                    Op::IsNot
                };
                Expr::bin(op, self.expr(subject), Expr::None)
            }
            B::Add if self.is_stringy(left) || self.is_stringy(right) => {
                let left = self.as_text(left);
                let right = self.as_text(right);
                Expr::bin(Op::Add, left, right)
            }
            B::UShr => {
                let value = self.expr(left);
                let amount = self.expr(right);
                Expr::bin(
                    Op::Shr,
                    Expr::bin(Op::BitAnd, value, Expr::hex(0xFFFF_FFFF)),
                    amount,
                )
            }
            B::In => {
                let key = self.expr(left);
                let container = self.expr(right);
                Expr::bin(Op::In, key, container)
            }
            B::InstanceOf => {
                let value = self.expr(left);
                let class = self.type_object(right);
                Expr::call_named("isinstance", vec![value, class])
            }
            other => {
                let left = self.expr(left);
                let right = self.expr(right);
                match Op::from_binary(other) {
                    Some(op) => Expr::bin(op, left, right),
                    None => self.unsupported(other.as_str()),
                }
            }
        }
    }

    /// The Python class matching a JS constructor name.
    fn type_object(&mut self, node: &Node) -> Expr {
        let Some(name) = node.as_identifier() else {
            return self.expr(node);
        };
        if let Some(exception) = builtin_exception(name) {
            return Expr::name(exception);
        }
        match name {
            "Array" => Expr::name("list"),
            "Object" | "Map" => Expr::name("dict"),
            "Set" => Expr::name("set"),
            "String" => Expr::name("str"),
            "Number" => Expr::Tuple(vec![Expr::name("int"), Expr::name("float")]),
            "Boolean" => Expr::name("bool"),
            "Uint8Array" => Expr::name("bytearray"),
            _ => self.expr(node),
        }
    }

    fn unary(&mut self, operator: UnaryOperator, argument: &Node) -> Expr {
        let wrap = |op, operand| Expr::Unary {
            op,
            operand: Box::new(operand),
        };
        match operator {
            UnaryOperator::Neg => wrap(UnaryOp::Neg, self.expr(argument)),
            UnaryOperator::Plus if self.is_stringy(argument) => {
                Expr::call_named("float", vec![self.expr(argument)])
            }
            UnaryOperator::Plus => wrap(UnaryOp::Pos, self.expr(argument)),
            UnaryOperator::Not => Expr::not(self.expr(argument)),
            UnaryOperator::BitNot => wrap(UnaryOp::Invert, self.expr(argument)),
            UnaryOperator::TypeOf => Expr::call_named("type", vec![self.expr(argument)]).attr("__name__"),
            UnaryOperator::Void => Expr::None,
            UnaryOperator::Delete => match argument {
                Node::MemberExpression {
                    object,
                    property,
                    computed,
                } => {
                    let object = self.expr(object);
                    let key = match property.property_name().filter(|_| !computed) {
                        Some(name) => Expr::Str(name),
                        None => self.expr(property),
                    };
                    Expr::method(object, "pop", vec![key, Expr::None])
                }
                _ => Expr::Bool(true),
            },
        }
    }

    /// Write `value` into the place `target` reads from, as an expression.
    fn store(&mut self, target: Expr, value: Expr) -> Expr {
        match target {
            Expr::Name(name) => Expr::Walrus {
                target: name,
                value: Box::new(value),
            },
            Expr::Attribute { value: object, attr } => {
                Expr::call_named("setattr", vec![*object, Expr::Str(attr), value])
            }
            Expr::Subscript {
                value: object,
                index,
            } => Expr::method(*object, "__setitem__", vec![*index, value]),
            _ => self.unsupported("assignment to a computed value inside an expression"),
        }
    }

    fn update(&mut self, operator: UpdateOperator, prefix: bool, argument: &Node) -> Expr {
        let read = self.expr(argument);
        let (step, undo) = match operator {
            UpdateOperator::Increment => (Op::Add, Op::Sub),
            UpdateOperator::Decrement => (Op::Sub, Op::Add),
        };
        let next = Expr::bin(step, read.clone(), Expr::int(1));
        if let Expr::Name(_) = read {
            let walrus = self.store(read, next);
            return if prefix {
                walrus
            } else {
                Expr::bin(undo, walrus, Expr::int(1))
            };
        }
        let write = self.store(read.clone(), next);
        if prefix {
            Expr::Tuple(vec![write, read]).index(Expr::int(1))
        } else {
            Expr::Tuple(vec![read, write]).index(Expr::int(0))
        }
    }

    fn assignment_value(&mut self, operator: AssignmentOperator, left: &Node, right: &Node) -> Expr {
        if destructure::is_pattern(left) {
            return self.unsupported("destructuring assignment inside an expression");
        }
        let read = self.expr(left);
        let value = match operator.compound() {
            None => self.expr(right),
            Some(CompoundOperator::Binary(operator)) => self.binary(operator, left, right),
            Some(CompoundOperator::Logical(operator)) => {
                let value = self.expr(right);
                match operator {
                    LogicalOperator::And => Expr::bin(Op::And, read.clone(), value),
                    LogicalOperator::Or => Expr::bin(Op::Or, read.clone(), value),
                    LogicalOperator::Coalesce => Expr::if_exp(
                        Expr::bin(Op::IsNot, read.clone(), Expr::None),
                        read.clone(),
                        value,
                    ),
                }
            }
        };
        if let Expr::Name(_) = read {
            return self.store(read, value);
        }
        let write = self.store(read.clone(), value);
        Expr::Tuple(vec![write, read]).index(Expr::int(1))
    }

    fn member(&mut self, object: &Node, property: &Node, computed: bool) -> Expr {
        if computed {
            let value = self.expr(object);
            let index = self.expr(property);
            return value.index(index);
        }
        let Some(name) = property.property_name() else {
            return self.unsupported("member access with a non-identifier key");
        };
        if let Some(constant) = self.global_constant(object, &name) {
            return constant;
        }
        if name == "length" {
            return Expr::call_named("len", vec![self.expr(object)]);
        }
        let dict = self.is_dict(object);
        let value = self.expr(object);
        if dict {
            value.index(Expr::Str(name))
        } else {
            value.attr(&self.ident(&name))
        }
    }

    fn call(&mut self, callee: &Node, arguments: &[Node]) -> Expr {
        if let Node::Super {} = callee {
            let args = self.arguments(arguments);
            return Expr::method(Expr::call_named("super", Vec::new()), "__init__", args);
        }
        if let Node::MemberExpression {
            object,
            property,
            computed: false,
        } = callee
            && let (Some(owner), Some(method)) = (object.as_identifier(), property.property_name())
            && let Some(lowered) = self.global_call(owner, &method, arguments)
        {
            return lowered;
        }
        if let Some(name) = callee.as_identifier()
            && let Some(lowered) = self.builtin_call(name, arguments)
        {
            return lowered;
        }
        if let Node::MemberExpression {
            object,
            property,
            computed: false,
        } = callee
            && arguments.is_empty()
            && property.property_name().as_deref() == Some("toString")
        {
            return Expr::call_named("str", vec![self.expr(object)]);
        }
        let func = self.expr(callee);
        let args = self.arguments(arguments);
        Expr::call(func, args)
    }

    fn construct(&mut self, callee: &Node, arguments: &[Node]) -> Expr {
        let Some(name) = callee.as_identifier().filter(|name| !self.is_local(name)) else {
            let func = self.expr(callee);
            let args = self.arguments(arguments);
            return Expr::call(func, args);
        };
        if let Some(exception) = builtin_exception(name) {
            return Expr::call_named(exception, self.arguments(arguments));
        }
        if let Some(element) = retarget_il::NumericType::parse(name).filter(|_| name.ends_with("Array")) {
            return match arguments {
                [] => self.typed_array(element, None, None),
                [single] if is_size(single) => {
                    let size = self.expr(single);
                    self.typed_array(element, Some(size), None)
                }
                [source, ..] => {
                    let source = self.expr(source);
                    self.typed_array(element, None, Some(source))
                }
            };
        }
        match (name, arguments) {
            ("Array", [size]) if is_size(size) => {
                let size = self.expr(size);
                Expr::bin(Op::Mul, Expr::List(vec![Expr::None]), size)
            }
            ("Array", _) => Expr::List(self.arguments(arguments)),
            ("Map" | "Object", _) => Expr::call_named("dict", self.arguments(arguments)),
            ("Set", _) => Expr::call_named("set", self.arguments(arguments)),
            _ => {
                let class = Expr::Name(self.ident(name));
                Expr::call(class, self.arguments(arguments))
            }
        }
    }

    pub(super) fn dict(&mut self, properties: &[Node]) -> Expr {
        let mut items = Vec::new();
        for property in properties {
            match property {
                Node::Property {
                    key,
                    value,
                    computed,
                    ..
                } => {
                    let key = match key.property_name().filter(|_| !computed) {
                        Some(name) => Expr::Str(name),
                        None => self.expr(key),
                    };
                    let value = self.expr(value);
                    items.push(DictItem::Pair(key, value));
                }
                Node::SpreadElement { argument } => items.push(DictItem::Spread(self.expr(argument))),
                other => {
                    let placeholder = self.unsupported(format!("{} in an object literal", other.kind()));
                    items.push(DictItem::Spread(placeholder));
                }
            }
        }
        Expr::Dict(items)
    }
}

impl Transformer for PythonTransformer {
    type Unit = Module;

    fn transform(&mut self, program: &Program) -> Module {
        self.reset();
        let body = top_level_statements(program);
        for node in &body {
            node.walk(&mut |n| {
                if let Node::ClassDeclaration(class) = n
                    && let Some(name) = class.name()
                {
                    self.classes.insert(name.to_string());
                }
            });
        }
        self.scopes.push(Scope {
            declared: collect_declared(&body),
            dicts: HashSet::new(),
        });
        let statements = self.block(&body);
        self.scopes.pop();
        let stubs = if self.options.framework_stubs {
            self.stubs(&body)
        } else {
            Vec::new()
        };
        tracing::debug!(
            statements = statements.len(),
            stubs = stubs.len(),
            "lowered to python"
        );
        Module {
            docstring: self.options.module_docstring.clone(),
            imports: self.take_imports(),
            stubs,
            body: statements,
        }
    }

    fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

struct PythonTypes;

impl TypeSyntax for PythonTypes {
    fn primitive(&self, primitive: Primitive) -> &'static str {
        match primitive {
            Primitive::Float32 | Primitive::Float64 => "float",
            Primitive::Bool => "bool",
            Primitive::Char | Primitive::String => "str",
            Primitive::Void => "None",
            Primitive::Any => "Any",
            _ => "int",
        }
    }

    fn named(&self, name: &str, args: &[String]) -> String {
        let base = match name {
            "List" => "list",
            "Map" => "dict",
            "Set" => "set",
            "Error" | "Exception" => "Exception",
            other => other,
        };
        if args.is_empty() {
            base.to_string()
        } else {
            format!("{base}[{}]", args.join(", "))
        }
    }

    fn array(&self, element: String) -> String {
        format!("list[{element}]")
    }

    fn nullable(&self, inner: String) -> String {
        format!("{inner} | None")
    }

    fn tuple(&self, items: Vec<String>) -> String {
        format!("tuple[{}]", items.join(", "))
    }
}

/// Python exception class for a JS error constructor.
pub(super) fn builtin_exception(name: &str) -> Option<&'static str> {
    Some(match name {
        "Error" => "Exception",
        "TypeError" => "TypeError",
        "RangeError" => "ValueError",
        "ReferenceError" => "NameError",
        "SyntaxError" => "SyntaxError",
        _ => return None,
    })
}

fn is_nullish(node: &Node) -> bool {
    matches!(node, Node::Literal(Literal { value: LiteralValue::Null, .. }))
        || node.as_identifier() == Some("undefined")
}

fn is_dict_literal(node: &Node) -> bool {
    match node {
        Node::ObjectExpression { .. } | Node::MapCreation { .. } => true,
        Node::NewExpression { callee, .. } => matches!(callee.as_identifier(), Some("Map" | "Object")),
        _ => false,
    }
}

/// Whether a single constructor argument is a length rather than contents.
pub(super) fn is_size(node: &Node) -> bool {
    matches!(node, Node::Literal(Literal { value: LiteralValue::Number(_), .. }))
        || expression_type(node).is_some_and(|ty| ty.primitive().is_some_and(Primitive::is_integer))
}

pub(super) fn int_literal(node: &Node) -> Option<i64> {
    match node {
        Node::Literal(literal) => literal.as_integer().and_then(|n| i64::try_from(n).ok()),
        _ => None,
    }
}

/// Expressions worth keeping as statements when they sit in `a && b()`.
fn is_exit(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Return(_) | Stmt::Raise(_) | Stmt::Break | Stmt::Continue
    )
}

fn dict_fields(class: &Class) -> HashSet<String> {
    let mut fields = HashSet::new();
    for member in &class.body.body {
        match member {
            ClassMember::PropertyDefinition {
                key,
                value: Some(value),
                ..
            } if is_dict_literal(value) => fields.extend(key.property_name()),
            ClassMember::MethodDefinition { value, .. } => value.body.walk(&mut |node| {
                if let Node::AssignmentExpression { left, right, .. } = node
                    && is_dict_literal(right)
                    && let Node::MemberExpression {
                        object,
                        property,
                        computed: false,
                    } = left.as_ref()
                    && matches!(object.as_ref(), Node::ThisExpression {})
                {
                    fields.extend(property.property_name());
                }
            }),
            _ => {}
        }
    }
    fields
}

/// Names a statement list binds in its own function scope.
fn collect_declared(body: &[Node]) -> HashSet<String> {
    fn visit(node: &Node, out: &mut HashSet<String>) {
        match node {
            Node::VariableDeclaration { declarations, .. } => {
                for declarator in declarations {
                    out.extend(destructure::bindings(&declarator.id).into_iter().map(|b| b.name));
                }
            }
            Node::FunctionDeclaration(function) => out.extend(function.name().map(str::to_string)),
            Node::ClassDeclaration(class) => out.extend(class.name().map(str::to_string)),
            Node::TryStatement { handler, .. } => {
                if let Some(param) = handler.as_ref().and_then(|clause| clause.param.as_deref()) {
                    out.extend(destructure::bindings(param).into_iter().map(|b| b.name));
                }
                for child in node.children() {
                    visit(child, out);
                }
            }
            other if other.is_statement() => {
                for child in other.children() {
                    visit(child, out);
                }
            }
            _ => {}
        }
    }
    let mut out = HashSet::new();
    for node in body {
        visit(node, &mut out);
    }
    out
}

/// Names a function assigns, without looking into nested functions.
fn assigned_names(function: &Function) -> Vec<String> {
    fn targets(node: &Node, out: &mut Vec<String>) {
        match node {
            Node::Identifier(id) => out.push(id.name.clone()),
            pattern if destructure::is_pattern(pattern) => {
                out.extend(destructure::bindings(pattern).into_iter().map(|b| b.name));
            }
            _ => {}
        }
    }
    fn visit(node: &Node, out: &mut Vec<String>) {
        match node {
            Node::FunctionDeclaration(_)
            | Node::FunctionExpression(_)
            | Node::ArrowFunctionExpression(_)
            | Node::ClassDeclaration(_) => return,
            Node::AssignmentExpression { left, .. } => targets(left, out),
            Node::UpdateExpression { argument, .. } => targets(argument, out),
            Node::ForOfStatement { left, .. } | Node::ForInStatement { left, .. } => targets(left, out),
            _ => {}
        }
        for child in node.children() {
            visit(child, out);
        }
    }
    let mut out = Vec::new();
    if function.expression {
        visit(&function.body, &mut out);
    } else {
        for statement in function.body_statements() {
            visit(statement, &mut out);
        }
    }
    out
}

fn assigns(body: &Node, name: &str) -> bool {
    body.any(&mut |node| match node {
        Node::AssignmentExpression { left, .. } => left.as_identifier() == Some(name),
        Node::UpdateExpression { argument, .. } => argument.as_identifier() == Some(name),
        _ => false,
    })
}

/// Whether a loop bound keeps its value while `body` runs.
fn is_stable_bound(bound: &Node, body: &Node) -> bool {
    let volatile = bound.any(&mut |node| {
        matches!(
            node,
            Node::BinaryExpression {
                operator: BinaryOperator::Div,
                ..
            } | Node::CallExpression { .. }
                | Node::NewExpression { .. }
                | Node::AssignmentExpression { .. }
                | Node::UpdateExpression { .. }
        )
    });
    if volatile {
        return false;
    }
    let mut names = Vec::new();
    bound.walk(&mut |node| {
        if let Node::Identifier(id) = node {
            names.push(id.name.as_str());
        }
    });
    !names.iter().any(|name| assigns(body, name) || mutates(body, name))
}

fn mutates(body: &Node, name: &str) -> bool {
    body.any(&mut |node| match node {
        Node::ArrayPush { array, .. }
        | Node::ArrayPop { array }
        | Node::ArrayShift { array }
        | Node::ArrayUnshift { array, .. }
        | Node::ArraySplice { array, .. }
        | Node::ArrayClear { array } => array.as_identifier() == Some(name),
        Node::CallExpression { callee, .. } => matches!(
            callee.as_ref(),
            Node::MemberExpression { object, .. } if object.as_identifier() == Some(name)
        ),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use retarget_il::build::*;

    fn lower(body: Vec<Node>) -> (Module, Vec<String>) {
        let mut transformer = PythonTransformer::new(PythonOptions::default());
        let module = transformer.transform(&Program::new(body));
        (module, transformer.take_warnings())
    }

    #[test]
    fn test_counted_loop_becomes_range() {
        let (module, _) = lower(vec![Node::ForStatement {
            init: Some(Box::new(declaration(DeclarationKind::Let, ident("i"), Some(int(0))))),
            test: Some(Box::new(binary(BinaryOperator::Lt, ident("i"), ident("n")))),
            update: Some(Box::new(update(UpdateOperator::Increment, false, ident("i")))),
            body: Box::new(block(vec![expr_stmt(call(ident("f"), vec![ident("i")]))])),
        }]);
        let Stmt::For { iter, .. } = &module.body[0] else {
            panic!("expected a for loop, got {:?}", module.body[0]);
        };
        assert_eq!(*iter, Expr::call_named("range", vec![Expr::name("n")]));
    }

    #[test]
    fn test_loop_mutating_its_variable_stays_while() {
        let (module, _) = lower(vec![Node::ForStatement {
            init: Some(Box::new(declaration(DeclarationKind::Let, ident("i"), Some(int(0))))),
            test: Some(Box::new(binary(BinaryOperator::Lt, ident("i"), int(10)))),
            update: Some(Box::new(update(UpdateOperator::Increment, false, ident("i")))),
            body: Box::new(block(vec![expr_stmt(assign_op(
                AssignmentOperator::Add,
                ident("i"),
                int(2),
            ))])),
        }]);
        assert!(matches!(module.body[0], Stmt::Assign { .. }));
        assert!(matches!(module.body[1], Stmt::While { .. }));
    }

    #[test]
    fn test_continue_runs_the_update_first() {
        let (module, _) = lower(vec![Node::ForStatement {
            init: None,
            test: Some(Box::new(ident("go"))),
            update: Some(Box::new(update(UpdateOperator::Increment, false, ident("i")))),
            body: Box::new(block(vec![if_stmt(
                ident("skip"),
                Node::ContinueStatement {},
                None,
            )])),
        }]);
        let Stmt::While { body, .. } = &module.body[0] else {
            panic!("expected while");
        };
        let Stmt::If { body: branch, .. } = &body[0] else {
            panic!("expected if");
        };
        assert!(matches!(branch[0], Stmt::AugAssign { op: Op::Add, .. }));
        assert_eq!(branch[1], Stmt::Continue);
    }

    #[test]
    fn test_module_assignment_from_function_is_global() {
        let (module, _) = lower(vec![
            var_decl("count", Some(int(0))),
            function_decl(
                "bump",
                &[],
                vec![expr_stmt(update(UpdateOperator::Increment, false, ident("count")))],
            ),
        ]);
        let Stmt::FunctionDef(def) = &module.body[1] else {
            panic!("expected def");
        };
        assert_eq!(def.body[0], Stmt::Global(vec!["count".to_string()]));
    }

    #[test]
    fn test_multi_statement_callback_is_lifted() {
        let callback = function_expr(
            &["x"],
            vec![
                const_decl("y", binary(BinaryOperator::Mul, ident("x"), int(2))),
                ret(Some(ident("y"))),
            ],
        );
        let (module, _) = lower(vec![expr_stmt(call(ident("run"), vec![callback]))]);
        assert!(matches!(&module.body[0], Stmt::FunctionDef(def) if def.name == "_fn0"));
        assert_eq!(
            module.body[1],
            Stmt::Expr(Expr::call_named("run", vec![Expr::name("_fn0")]))
        );
    }

    #[test]
    fn test_unknown_kind_warns_and_leaves_placeholder() {
        let (module, warnings) = lower(vec![Node::Unknown {
            kind: "WithStatement".into(),
        }]);
        assert_eq!(module.body, [Stmt::Placeholder("WithStatement".into())]);
        assert_eq!(warnings, ["unhandled kind: WithStatement"]);
    }

    #[test]
    fn test_external_base_gets_a_stub() {
        let (module, _) = lower(vec![
            class_decl("A", Some("Algorithm"), vec![]),
            class_decl("B", Some("A"), vec![]),
            class_decl("E", Some("Error"), vec![]),
        ]);
        let names: Vec<_> = module
            .stubs
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::ClassDef(class) => Some(class.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["Algorithm"]);
    }

    #[test]
    fn test_switch_with_inner_break_is_wrapped() {
        let cases = vec![
            SwitchCase {
                test: Some(Box::new(int(1))),
                consequent: vec![
                    if_stmt(ident("done"), Node::BreakStatement {}, None),
                    expr_stmt(call(ident("f"), vec![])),
                    Node::BreakStatement {},
                ],
            },
            SwitchCase {
                test: None,
                consequent: vec![expr_stmt(call(ident("g"), vec![]))],
            },
        ];
        let (module, _) = lower(vec![Node::SwitchStatement {
            discriminant: Box::new(ident("x")),
            cases,
        }]);
        let Stmt::While { body, .. } = &module.body[0] else {
            panic!("expected wrapper loop, got {:?}", module.body[0]);
        };
        assert_eq!(body.last(), Some(&Stmt::Break));
    }
}
