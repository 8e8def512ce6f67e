//! Lowering IL programs into the C# tree.
//!
//! Everything declared at the top level lands in one static class: functions
//! become static methods and variables static fields, while the remaining
//! statements form `Main`. Types come from IL annotations when present and
//! from [`crate::infer`] otherwise, with `dynamic` as the fallback.

use super::ast::*;
use super::runtime::Helper;
use super::{AsyncStyle, CSharpOptions};
use crate::destructure::{self, Access};
use crate::escape::{CSHARP_RESERVED, Rename, float_literal, sanitize_identifier};
use crate::infer::{expression_type, name_hint};
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
use std::collections::{BTreeSet, HashMap, HashSet};

/// C# spelling of the shared type model.
pub(super) struct CSharpTypes {
    pub nullable: bool,
}

const VALUE_TYPES: &[&str] = &[
    "sbyte", "byte", "short", "ushort", "int", "uint", "long", "ulong", "float", "double", "bool",
    "char",
];

impl TypeSyntax for CSharpTypes {
    fn primitive(&self, primitive: Primitive) -> &'static str {
        match primitive {
            Primitive::Int8 => "sbyte",
            Primitive::UInt8 => "byte",
            Primitive::Int16 => "short",
            Primitive::UInt16 => "ushort",
            Primitive::Int32 => "int",
            Primitive::UInt32 => "uint",
            Primitive::Int64 => "long",
            Primitive::UInt64 => "ulong",
            Primitive::Float32 => "float",
            Primitive::Float64 => "double",
            Primitive::Bool => "bool",
            Primitive::Char => "char",
            Primitive::String => "string",
            Primitive::Void => "void",
            Primitive::Any => "dynamic",
        }
    }

    fn named(&self, name: &str, args: &[String]) -> String {
        let name = match name {
            "Map" => "Dictionary",
            "Set" => "HashSet",
            "Error" => "Exception",
            other => other,
        };
        if args.is_empty() {
            name.to_string()
        } else {
            format!("{name}<{}>", args.join(", "))
        }
    }

    fn array(&self, element: String) -> String {
        format!("{element}[]")
    }

    fn nullable(&self, inner: String) -> String {
        if self.nullable || VALUE_TYPES.contains(&inner.as_str()) {
            format!("{inner}?")
        } else {
            inner
        }
    }

    fn tuple(&self, items: Vec<String>) -> String {
        format!("({})", items.join(", "))
    }
}

/// Map JS error constructors onto BCL exceptions.
pub(super) fn exception_type(name: &str) -> Option<&'static str> {
    match name {
        "Error" => Some("Exception"),
        "TypeError" => Some("ArgumentException"),
        "RangeError" => Some("OverflowException"),
        "SyntaxError" => Some("FormatException"),
        "ReferenceError" => Some("InvalidOperationException"),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct ClassInfo {
    base: Option<String>,
    methods: HashSet<String>,
    fields: HashMap<String, TypeRef>,
}

/// Where a `break` goes.
#[derive(Debug, Clone)]
enum BreakTarget {
    /// A loop or a native `switch`.
    Native,
    /// A `switch` lowered to an `if` chain ending at this label.
    Label(String),
}

pub struct CSharpTransformer {
    pub(super) options: CSharpOptions,
    pub(super) warnings: Vec<String>,
    usings: BTreeSet<&'static str>,
    helpers: BTreeSet<Helper>,
    temps: usize,
    /// Local types, one map per enclosing function.
    scopes: Vec<HashMap<String, TypeRef>>,
    /// Static fields of the program class.
    globals: HashMap<String, TypeRef>,
    global_functions: HashSet<String>,
    classes: HashMap<String, ClassInfo>,
    current_class: Option<String>,
    /// Spelling of `this`: `this` in instance code, the class name in static code.
    receivers: Vec<Expr>,
    breaks: Vec<BreakTarget>,
    /// Classes declared inside functions, moved to namespace level.
    lifted: Vec<ClassDecl>,
}

impl CSharpTransformer {
    pub fn new(options: CSharpOptions) -> Self {
        Self {
            options,
            warnings: Vec::new(),
            usings: BTreeSet::new(),
            helpers: BTreeSet::new(),
            temps: 0,
            scopes: Vec::new(),
            globals: HashMap::new(),
            global_functions: HashSet::new(),
            classes: HashMap::new(),
            current_class: None,
            receivers: Vec::new(),
            breaks: Vec::new(),
            lifted: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.warnings.clear();
        self.usings.clear();
        self.helpers.clear();
        self.temps = 0;
        self.scopes.clear();
        self.globals.clear();
        self.global_functions.clear();
        self.classes.clear();
        self.current_class = None;
        self.receivers.clear();
        self.breaks.clear();
        self.lifted.clear();
    }

    pub(super) fn using(&mut self, namespace: &'static str) {
        self.usings.insert(namespace);
    }

    /// Reference a runtime helper, qualified when called from another class.
    pub(super) fn helper(&mut self, helper: Helper) -> Expr {
        self.helpers.insert(helper);
        match self.current_class {
            Some(_) => Expr::name(&format!("{}.{}", self.options.class_name, helper.name())),
            None => Expr::name(helper.name()),
        }
    }

    pub(super) fn temp(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.temps);
        self.temps += 1;
        name
    }

    pub(super) fn ident(&self, name: &str) -> String {
        sanitize_identifier(name, CSHARP_RESERVED, Rename::Verbatim)
    }

    pub(super) fn unsupported(&mut self, what: impl Into<String>) -> Expr {
        let what = what.into();
        tracing::debug!(construct = %what, "no c# lowering");
        self.warnings.push(format!("unsupported construct: {what}"));
        Expr::Placeholder(what)
    }

    fn unknown_kind(&mut self, kind: &str) {
        self.warnings.push(format!("unhandled kind: {kind}"));
    }

    pub(super) fn ty(&self, ty: &TypeRef) -> String {
        ty.render(&CSharpTypes {
            nullable: self.options.nullable,
        })
    }

    pub(super) fn declare(&mut self, name: &str, ty: TypeRef) {
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(name.to_string(), ty);
            }
            None => {
                self.globals.insert(name.to_string(), ty);
            }
        }
    }

    pub(super) fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    fn field_type(&self, class: &str, field: &str) -> Option<TypeRef> {
        let mut seen = HashSet::new();
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                break;
            }
            let info = self.classes.get(&name)?;
            if let Some(ty) = info.fields.get(field) {
                return Some(ty.clone());
            }
            current = info.base.clone();
        }
        None
    }

    /// The static type of an IL expression, from local declarations first.
    pub(super) fn type_of(&self, node: &Node) -> Option<TypeRef> {
        match node {
            Node::Identifier(id) => self
                .scopes
                .iter()
                .rev()
                .find_map(|scope| scope.get(&id.name))
                .or_else(|| self.globals.get(&id.name))
                .cloned()
                .or_else(|| expression_type(node)),
            Node::MemberExpression {
                object,
                property,
                computed: false,
            } if matches!(object.as_ref(), Node::ThisExpression {}) => {
                let class = self.current_class.as_deref()?;
                self.field_type(class, &property.property_name()?)
            }
            Node::MemberExpression {
                object,
                computed: true,
                ..
            } => self.type_of(object)?.element().cloned(),
            _ => expression_type(node),
        }
        .filter(|ty| !ty.is_any())
    }

    pub(super) fn is_integer(&self, node: &Node) -> bool {
        self.type_of(node)
            .and_then(|ty| ty.primitive())
            .is_some_and(Primitive::is_integer)
    }

    pub(super) fn is_stringy(&self, node: &Node) -> bool {
        node.as_string_literal().is_some()
            || matches!(node, Node::TemplateLiteral { .. })
            || self.type_of(node).is_some_and(|ty| ty.is_string())
    }

    /// Declared type of a binding, from its annotation or initializer.
    fn binding_type(&self, name: &str, annotation: Option<&str>, init: Option<&Node>) -> TypeRef {
        if let Some(annotation) = annotation {
            return parse_il_type(annotation);
        }
        let inferred = init
            .and_then(|init| self.type_of(init))
            .or_else(|| name_hint(name))
            .unwrap_or(TypeRef::ANY);
        // `let x = null` is assigned something else later.
        match inferred {
            TypeRef::Nullable(inner) if matches!(&*inner, TypeRef::Named { name, .. } if name == "object") => {
                TypeRef::ANY
            }
            other => other,
        }
    }

    fn doc(&self, docs: Option<&str>) -> Option<String> {
        if !self.options.doc_comments {
            return None;
        }
        docs.map(str::trim)
            .filter(|docs| !docs.is_empty())
            .map(str::to_string)
    }

    fn receiver(&self) -> Expr {
        self.receivers.last().cloned().unwrap_or_else(Expr::null)
    }

    fn is_async(&self, function: &Function) -> bool {
        self.options.async_style == AsyncStyle::Task && lower::awaits(function)
    }

    // --------------------------------------------------------------- program

    fn collect_classes(&mut self, body: &[Node]) {
        for node in body {
            node.walk(&mut |n| {
                let Node::ClassDeclaration(class) = n else {
                    return;
                };
                let Some(name) = class.name() else {
                    return;
                };
                let mut info = ClassInfo {
                    base: class
                        .super_class
                        .as_deref()
                        .and_then(Node::as_identifier)
                        .map(str::to_string),
                    ..ClassInfo::default()
                };
                for member in &class.body.body {
                    match member {
                        ClassMember::MethodDefinition {
                            key,
                            kind: MethodKind::Method,
                            is_static: false,
                            computed: false,
                            ..
                        } => {
                            if let Some(method) = key.property_name() {
                                info.methods.insert(method);
                            }
                        }
                        ClassMember::PropertyDefinition {
                            key,
                            value,
                            computed: false,
                            result_type,
                            ..
                        } => {
                            if let Some(field) = key.property_name() {
                                let ty = self.binding_type(&field, result_type.as_deref(), value.as_deref());
                                info.fields.insert(field, ty);
                            }
                        }
                        _ => {}
                    }
                }
                for field in lower::implicit_fields(class) {
                    let ty = self.binding_type(&field.name, None, Some(field.value));
                    info.fields.entry(field.name).or_insert(ty);
                }
                self.classes.insert(name.to_string(), info);
            });
        }
    }

    fn collect_globals(&mut self, body: &[Node]) {
        for node in body {
            match node {
                Node::FunctionDeclaration(function) => {
                    if let Some(name) = function.name() {
                        self.global_functions.insert(name.to_string());
                    }
                }
                Node::VariableDeclaration { declarations, .. } => {
                    for declarator in declarations {
                        let init = declarator.init.as_deref();
                        match declarator.id.as_ref() {
                            Node::Identifier(id) if init.and_then(Node::as_inline_function).is_some() => {
                                self.global_functions.insert(id.name.clone());
                            }
                            Node::Identifier(id) => {
                                let annotation = declarator
                                    .result_type
                                    .as_deref()
                                    .or(id.result_type.as_deref());
                                let ty = self.binding_type(&id.name, annotation, init);
                                self.globals.insert(id.name.clone(), ty);
                            }
                            pattern => {
                                for binding in destructure::bindings(pattern) {
                                    self.globals.insert(binding.name, TypeRef::ANY);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn global_declarator(
        &mut self,
        kind: DeclarationKind,
        declarator: &VariableDeclarator,
        members: &mut Vec<Member>,
        main: &mut Vec<Stmt>,
    ) {
        let init = declarator.init.as_deref();
        let Node::Identifier(id) = declarator.id.as_ref() else {
            for binding in destructure::bindings(&declarator.id) {
                members.push(Member::Field {
                    modifiers: vec!["public", "static"],
                    ty: self.ty(&TypeRef::ANY),
                    name: self.ident(&binding.name),
                    value: None,
                });
            }
            main.extend(self.destructure(&declarator.id, init, false));
            return;
        };
        let name = self.ident(&id.name);
        if let Some(function) = init.and_then(Node::as_inline_function) {
            members.push(Member::Method(self.method(
                function,
                &name,
                vec!["public", "static"],
            )));
            return;
        }
        let ty = self.globals.get(&id.name).cloned().unwrap_or(TypeRef::ANY);
        let spelled = self.ty(&ty);
        // Field initializers run before `Main`; once `Main` has statements,
        // later initializers must wait their turn.
        let value = match init {
            Some(init) if main.is_empty() || is_constant(init) => Some(self.expr_as(init, &ty)),
            Some(init) => {
                let value = self.expr_as(init, &ty);
                main.push(Stmt::Expr(Expr::assign(Expr::name(&name), value)));
                None
            }
            None => None,
        };
        let mut modifiers = vec!["public", "static"];
        if kind == DeclarationKind::Const && value.is_some() {
            modifiers.push("readonly");
        }
        members.push(Member::Field {
            modifiers,
            ty: spelled,
            name,
            value,
        });
    }

    fn stubs(&self, classes: &[ClassDecl]) -> Vec<ClassDecl> {
        if !self.options.framework_stubs {
            return Vec::new();
        }
        let mut stubs: Vec<ClassDecl> = Vec::new();
        for class in classes {
            let Some(base) = &class.base else { continue };
            if self.classes.contains_key(base)
                || exception_type(base).is_some()
                || base.ends_with("Exception")
                || stubs.iter().any(|stub| &stub.name == base)
            {
                continue;
            }
            stubs.push(ClassDecl {
                name: base.clone(),
                modifiers: vec!["public"],
                ..ClassDecl::default()
            });
        }
        stubs
    }

    // ------------------------------------------------------------ statements

    pub(super) fn block(&mut self, nodes: &[Node]) -> Vec<Stmt> {
        let mut out = Vec::new();
        for node in nodes {
            out.extend(self.statement(node));
        }
        out
    }

    fn body(&mut self, node: &Node) -> Vec<Stmt> {
        match node {
            Node::BlockStatement { body } => self.block(body),
            other => self.statement(other),
        }
    }

    fn looped(&mut self, body: &Node) -> Vec<Stmt> {
        self.in_loop(|this| this.body(body))
    }

    /// Run `lower` with `break` bound to a native loop.
    pub(super) fn in_loop<R>(&mut self, lower: impl FnOnce(&mut Self) -> R) -> R {
        self.breaks.push(BreakTarget::Native);
        let out = lower(self);
        self.breaks.pop();
        out
    }

    pub(super) fn statement(&mut self, node: &Node) -> Vec<Stmt> {
        match node {
            Node::Program(program) => self.block(&program.body),
            Node::VariableDeclaration { declarations, .. } => declarations
                .iter()
                .flat_map(|declarator| self.declarator(declarator))
                .collect(),
            Node::FunctionDeclaration(function) => {
                let name = self.ident(function.name().unwrap_or("_anonymous"));
                self.declare(function.name().unwrap_or("_anonymous"), TypeRef::ANY);
                vec![Stmt::LocalFunction(self.method(function, &name, Vec::new()))]
            }
            Node::ClassDeclaration(class) => {
                let decl = self.class_decl(class);
                self.lifted.push(decl);
                Vec::new()
            }
            Node::ExpressionStatement { expression } => self.expression_statement(expression),
            Node::BlockStatement { body } => vec![Stmt::Block(self.block(body))],
            Node::EmptyStatement {} => Vec::new(),
            Node::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                let test = self.condition(test);
                let then = self.body(consequent);
                let otherwise = match alternate {
                    Some(alternate) => self.body(alternate),
                    None => Vec::new(),
                };
                vec![Stmt::If {
                    test,
                    then,
                    otherwise,
                }]
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
                let test = self.condition(test);
                let body = self.looped(body);
                vec![Stmt::While { test, body }]
            }
            Node::DoWhileStatement { body, test } => {
                let body = self.looped(body);
                let test = self.condition(test);
                vec![Stmt::DoWhile { body, test }]
            }
            Node::SwitchStatement {
                discriminant,
                cases,
            } => self.switch(discriminant, cases),
            Node::BreakStatement {} => match self.breaks.last() {
                Some(BreakTarget::Label(label)) => vec![Stmt::Goto(GotoTarget::Label(label.clone()))],
                _ => vec![Stmt::Break],
            },
            Node::ContinueStatement {} => vec![Stmt::Continue],
            Node::ReturnStatement { argument } => {
                vec![Stmt::Return(argument.as_deref().map(|value| self.expr(value)))]
            }
            Node::ThrowStatement { argument } => vec![Stmt::Throw(Some(self.exception(argument)))],
            Node::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                let body = self.body(block);
                let catch = handler.as_ref().map(|clause| {
                    let mut prologue = Vec::new();
                    let name = match clause.param.as_deref() {
                        None => None,
                        Some(Node::Identifier(id)) => {
                            self.declare(&id.name, TypeRef::named("Exception"));
                            Some(self.ident(&id.name))
                        }
                        Some(pattern) => {
                            let temp = self.temp("_err");
                            self.declare(&temp, TypeRef::named("Exception"));
                            prologue = self.bind_pattern(pattern, Expr::name(&temp), true);
                            Some(temp)
                        }
                    };
                    prologue.extend(self.body(&clause.body));
                    Catch {
                        name,
                        body: prologue,
                    }
                });
                let finally = match finalizer {
                    Some(finalizer) => self.body(finalizer),
                    None => Vec::new(),
                };
                if catch.is_none() && finally.is_empty() {
                    return vec![Stmt::Block(body)];
                }
                vec![Stmt::Try {
                    body,
                    catch,
                    finally,
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
            return self.destructure(&declarator.id, init, true);
        };
        let name = self.ident(&id.name);
        if let Some(function) = init.and_then(Node::as_inline_function) {
            self.declare(&id.name, TypeRef::ANY);
            return vec![Stmt::LocalFunction(self.method(function, &name, Vec::new()))];
        }
        let annotation = declarator
            .result_type
            .as_deref()
            .or(id.result_type.as_deref());
        let ty = self.binding_type(&id.name, annotation, init);
        let value = init.map(|init| self.expr_as(init, &ty));
        self.declare(&id.name, ty.clone());
        let spelled = match &value {
            Some(value) if !self.options.explicit_types && !is_null(value) => None,
            _ => Some(self.ty(&ty)),
        };
        vec![Stmt::Local {
            ty: spelled,
            name,
            value,
        }]
    }

    /// `init` evaluated once, then one binding per pattern name.
    fn destructure(&mut self, pattern: &Node, init: Option<&Node>, declare: bool) -> Vec<Stmt> {
        for part in destructure::unsupported_parts(pattern) {
            self.unsupported(part);
        }
        let Some(init) = init else {
            if !declare {
                return Vec::new();
            }
            return destructure::bindings(pattern)
                .into_iter()
                .map(|binding| {
                    self.declare(&binding.name, TypeRef::ANY);
                    Stmt::Local {
                        ty: Some(self.ty(&TypeRef::ANY)),
                        name: self.ident(&binding.name),
                        value: None,
                    }
                })
                .collect();
        };
        let mut out = Vec::new();
        let value = self.expr(init);
        let source = if destructure::needs_temporary(init) {
            let temp = self.temp("_tmp");
            out.push(Stmt::Local {
                ty: None,
                name: temp.clone(),
                value: Some(value),
            });
            Expr::Name(temp)
        } else {
            value
        };
        out.extend(self.bind_pattern(pattern, source, declare));
        out
    }

    pub(super) fn bind_pattern(&mut self, pattern: &Node, source: Expr, declare: bool) -> Vec<Stmt> {
        let mut out = Vec::new();
        for binding in destructure::bindings(pattern) {
            let mut value = source.clone();
            for access in &binding.path {
                value = match access {
                    Access::Index(i) => value.index(Expr::int(*i as i64)),
                    Access::Key(key) => value.index(Expr::Str(key.clone())),
                    Access::RestFrom(i) => Expr::call_path(
                        "Enumerable.ToList",
                        vec![Expr::call_path(
                            "Enumerable.Skip<dynamic>",
                            vec![value, Expr::int(*i as i64)],
                        )],
                    ),
                };
            }
            if let Some(default) = binding.default {
                let fallback = self.expr(default);
                value = Expr::bin(Op::Coalesce, value, fallback);
            }
            let name = self.ident(&binding.name);
            if declare {
                self.declare(&binding.name, TypeRef::ANY);
                out.push(Stmt::Local {
                    ty: self.options.explicit_types.then(|| self.ty(&TypeRef::ANY)),
                    name,
                    value: Some(value),
                });
            } else {
                out.push(Stmt::Expr(Expr::assign(Expr::Name(name), value)));
            }
        }
        out
    }

    pub(super) fn expression_statement(&mut self, node: &Node) -> Vec<Stmt> {
        match node {
            Node::AssignmentExpression {
                operator: AssignmentOperator::Assign,
                left,
                right,
            } if destructure::is_pattern(left) => self.destructure(left, Some(right), false),
            Node::AssignmentExpression {
                operator: AssignmentOperator::Assign,
                left,
                right,
            } if is_length_member(left) => {
                let Node::MemberExpression { object, .. } = left.as_ref() else {
                    return Vec::new();
                };
                let list = self.expr(object);
                let length = self.expr(right);
                let mut out = Vec::new();
                let length = if length.is_simple() {
                    length
                } else {
                    let temp = self.temp("_len");
                    out.push(Stmt::Local {
                        ty: Some("int".to_string()),
                        name: temp.clone(),
                        value: Some(length),
                    });
                    Expr::Name(temp)
                };
                let excess = Expr::bin(Op::Sub, list.clone().member("Count"), length.clone());
                out.push(Stmt::Expr(list.method("RemoveRange", vec![length, excess])));
                out
            }
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
                    computed,
                } => {
                    let object = self.expr(object);
                    let key = if *computed {
                        self.expr(property)
                    } else {
                        Expr::Str(property.property_name().unwrap_or_default())
                    };
                    vec![Stmt::Expr(object.method("Remove", vec![key]))]
                }
                _ => vec![Stmt::Expr(self.unsupported("delete of a plain name"))],
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
                    LogicalOperator::Or => Expr::unary(UnaryOp::Not, value),
                    LogicalOperator::Coalesce => Expr::bin(Op::Eq, value, Expr::null()),
                };
                let then = self.expression_statement(right);
                vec![Stmt::If {
                    test,
                    then,
                    otherwise: Vec::new(),
                }]
            }
            Node::ConditionalExpression {
                test,
                consequent,
                alternate,
            } if lower::has_effect(consequent) || lower::has_effect(alternate) => {
                let test = self.condition(test);
                let then = self.expression_statement(consequent);
                let otherwise = self.expression_statement(alternate);
                vec![Stmt::If {
                    test,
                    then,
                    otherwise,
                }]
            }
            other => match self.semantic_statement(other) {
                Some(statements) => statements,
                None => {
                    let value = self.expr(other);
                    statement_of(value).into_iter().collect()
                }
            },
        }
    }

    fn for_loop(
        &mut self,
        init: Option<&Node>,
        test: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
    ) -> Vec<Stmt> {
        let init = match init {
            Some(init @ Node::VariableDeclaration { .. }) => self.statement(init),
            Some(init) => self.expression_statement(init),
            None => Vec::new(),
        };
        let test = test.map(|test| self.condition(test));
        let update = match update {
            Some(Node::SequenceExpression { expressions }) => {
                expressions.iter().map(|expression| self.expr(expression)).collect()
            }
            Some(update) => vec![self.expr(update)],
            None => Vec::new(),
        };
        let body = self.looped(body);
        let inline = init.len() <= 1
            && init
                .iter()
                .all(|stmt| matches!(stmt, Stmt::Local { .. } | Stmt::Expr(_)));
        if inline {
            return vec![Stmt::For {
                init,
                test,
                update,
                body,
            }];
        }
        let mut scoped = init;
        scoped.push(Stmt::For {
            init: Vec::new(),
            test,
            update,
            body,
        });
        vec![Stmt::Block(scoped)]
    }

    fn for_each(&mut self, left: &Node, right: &Node, body: &Node, keys: bool) -> Vec<Stmt> {
        let source_type = self.type_of(right);
        let collection = self.expr(right);
        let (iter, element) = if keys {
            match &source_type {
                Some(ty) if ty.is_list() || ty.is_array() => {
                    let length = if ty.is_array() { "Length" } else { "Count" };
                    (
                        Expr::call_path(
                            "Enumerable.Range",
                            vec![Expr::int(0), collection.member(length)],
                        ),
                        TypeRef::INT,
                    )
                }
                _ => (collection.member("Keys"), TypeRef::STRING),
            }
        } else {
            let element = source_type
                .as_ref()
                .and_then(|ty| {
                    if ty.is_string() {
                        Some(TypeRef::Primitive(Primitive::Char))
                    } else {
                        ty.element().cloned()
                    }
                })
                .unwrap_or(TypeRef::ANY);
            (collection, element)
        };

        let mut prologue = Vec::new();
        let name = match left {
            Node::VariableDeclaration { declarations, .. } => match declarations.first() {
                Some(declarator) => match declarator.id.as_ref() {
                    Node::Identifier(id) => {
                        self.declare(&id.name, element.clone());
                        self.ident(&id.name)
                    }
                    pattern => {
                        let temp = self.temp("_item");
                        prologue = self.bind_pattern(pattern, Expr::name(&temp), true);
                        temp
                    }
                },
                None => self.temp("_item"),
            },
            target => {
                let temp = self.temp("_item");
                let target = self.expr(target);
                prologue.push(Stmt::Expr(Expr::assign(target, Expr::name(&temp))));
                temp
            }
        };
        prologue.extend(self.looped(body));
        let ty = self
            .options
            .explicit_types
            .then(|| self.ty(&element));
        vec![Stmt::ForEach {
            ty,
            name,
            iter,
            body: prologue,
        }]
    }

    /// A native `switch` for constant labels; an `if` chain otherwise.
    fn switch(&mut self, discriminant: &Node, cases: &[SwitchCase]) -> Vec<Stmt> {
        let groups = lower::switch_groups(cases);
        let constant = groups
            .iter()
            .flat_map(|group| group.tests.iter())
            .all(|test| is_constant(test));
        if constant {
            return self.native_switch(discriminant, &groups);
        }

        let mut out = Vec::new();
        let value = self.expr(discriminant);
        let subject = if value.is_simple() {
            value
        } else {
            let temp = self.temp("_switch");
            out.push(Stmt::Local {
                ty: None,
                name: temp.clone(),
                value: Some(value),
            });
            Expr::Name(temp)
        };
        let label = self.temp("_switchEnd");
        let jumps = groups.iter().any(|group| lower::breaks_switch(group.body));
        self.breaks.push(BreakTarget::Label(label.clone()));
        let bodies = lower::reachable_bodies(&groups);
        let mut chain: Vec<(Expr, Vec<Stmt>)> = Vec::new();
        let mut fallback = Vec::new();
        for (group, body) in groups.iter().zip(&bodies) {
            let lowered: Vec<Stmt> = body.iter().flat_map(|node| self.statement(node)).collect();
            if group.is_default {
                fallback = lowered.clone();
            }
            let mut tests = group
                .tests
                .iter()
                .map(|test| {
                    let test = self.expr(test);
                    Expr::bin(Op::Eq, subject.clone(), test)
                })
                .collect::<Vec<_>>()
                .into_iter();
            if let Some(first) = tests.next() {
                let test = tests.fold(first, |acc, test| Expr::bin(Op::Or, acc, test));
                chain.push((test, lowered));
            }
        }
        self.breaks.pop();

        let mut tail = fallback;
        for (test, then) in chain.into_iter().rev() {
            tail = vec![Stmt::If {
                test,
                then,
                otherwise: tail,
            }];
        }
        out.extend(tail);
        if jumps {
            out.push(Stmt::Label(label));
        }
        out
    }

    fn native_switch(&mut self, discriminant: &Node, groups: &[lower::CaseGroup<'_>]) -> Vec<Stmt> {
        let mut subject = self.expr(discriminant);
        if self.type_of(discriminant).is_none() {
            let strings = groups
                .iter()
                .flat_map(|group| group.tests.iter())
                .all(|test| test.as_string_literal().is_some());
            subject = Expr::cast(if strings { "string" } else { "int" }, subject);
        }
        self.breaks.push(BreakTarget::Native);
        let mut sections = Vec::new();
        for (i, group) in groups.iter().enumerate() {
            let mut labels: Vec<Option<Expr>> =
                group.tests.iter().map(|test| Some(self.expr(test))).collect();
            if group.is_default {
                labels.push(None);
            }
            let mut body = self.block(group.body);
            if group.falls_through {
                let next = groups.get(i + 1);
                body.push(Stmt::Goto(match next.and_then(|g| g.tests.first()) {
                    Some(test) => GotoTarget::Case(self.expr(test)),
                    None => GotoTarget::Default,
                }));
            } else if !body.last().is_some_and(is_exit) {
                body.push(Stmt::Break);
            }
            sections.push(SwitchSection { labels, body });
        }
        self.breaks.pop();
        vec![Stmt::Switch { subject, sections }]
    }

    fn exception(&mut self, node: &Node) -> Expr {
        if self.is_stringy(node) {
            let message = self.expr(node);
            return Expr::construct("Exception", vec![message]);
        }
        self.expr(node)
    }

    /// A test expression; C# conditions must be `bool`.
    pub(super) fn condition(&mut self, node: &Node) -> Expr {
        let value = self.expr(node);
        match self.type_of(node) {
            Some(ty) if ty.primitive().is_some_and(Primitive::is_numeric) => {
                Expr::bin(Op::Ne, value, Expr::int(0))
            }
            Some(ty) if !ty.is_string() && ty.primitive().is_none() => {
                Expr::bin(Op::Ne, value, Expr::null())
            }
            _ => value,
        }
    }

    // ------------------------------------------------------------- functions

    pub(super) fn method(
        &mut self,
        function: &Function,
        name: &str,
        mut modifiers: Vec<&'static str>,
    ) -> Method {
        self.scopes.push(HashMap::new());
        let outer_breaks = std::mem::take(&mut self.breaks);
        let mut prologue = Vec::new();
        let params = function
            .params
            .iter()
            .map(|param| self.param(param, &mut prologue))
            .collect();
        let mut body = prologue;
        if function.expression {
            let value = self.expr(&function.body);
            body.push(Stmt::Return(Some(value)));
        } else {
            body.extend(self.block(function.body_statements()));
        }
        let mut returns = self.return_type(function);
        self.breaks = outer_breaks;
        self.scopes.pop();

        if self.is_async(function) {
            self.using("System.Threading.Tasks");
            modifiers.push("async");
            returns = match returns.as_str() {
                "void" => "Task".to_string(),
                other => format!("Task<{other}>"),
            };
        }
        Method {
            modifiers,
            returns,
            name: name.to_string(),
            params,
            body,
            doc: self.doc(function.docs.as_deref()),
        }
    }

    fn return_type(&self, function: &Function) -> String {
        if let Some(annotation) = function.return_type.as_deref() {
            return self.ty(&parse_il_type(annotation));
        }
        let values = lower::return_values(function);
        if values.is_empty() {
            return "void".to_string();
        }
        let mut types = values.iter().map(|value| self.type_of(value));
        let first = types.next().flatten();
        match first {
            Some(first) if types.all(|ty| ty.as_ref() == Some(&first)) => self.ty(&first),
            _ => self.ty(&TypeRef::ANY),
        }
    }

    fn param(&mut self, param: &Node, prologue: &mut Vec<Stmt>) -> Param {
        match param {
            Node::Identifier(id) => {
                let ty = match id.result_type.as_deref() {
                    Some(annotation) => parse_il_type(annotation),
                    None => name_hint(&id.name).unwrap_or(TypeRef::ANY),
                };
                self.declare(&id.name, ty.clone());
                Param {
                    ty: self.ty(&ty),
                    name: self.ident(&id.name),
                    default: None,
                    variadic: false,
                }
            }
            Node::AssignmentPattern { left, right } if matches!(left.as_ref(), Node::Identifier(_)) => {
                let Node::Identifier(id) = left.as_ref() else {
                    return self.pattern_param(param, prologue);
                };
                let ty = match id.result_type.as_deref() {
                    Some(annotation) => parse_il_type(annotation),
                    None => self
                        .type_of(right)
                        .or_else(|| name_hint(&id.name))
                        .unwrap_or(TypeRef::ANY),
                };
                self.declare(&id.name, ty.clone());
                let name = self.ident(&id.name);
                let default = self.expr(right);
                // Optional parameters need compile-time constants.
                if ty.primitive().is_some_and(|p| p != Primitive::Any) && is_constant(right) {
                    return Param {
                        ty: self.ty(&ty),
                        name,
                        default: Some(default),
                        variadic: false,
                    };
                }
                prologue.push(Stmt::Expr(Expr::Assign {
                    op: Some(Op::Coalesce),
                    target: Box::new(Expr::name(&name)),
                    value: Box::new(default),
                }));
                Param {
                    ty: self.ty(&TypeRef::ANY),
                    name,
                    default: Some(Expr::null()),
                    variadic: false,
                }
            }
            Node::RestElement { argument } if matches!(argument.as_ref(), Node::Identifier(_)) => {
                let name = argument.as_identifier().unwrap_or("rest");
                self.declare(name, TypeRef::array(TypeRef::ANY));
                Param {
                    ty: self.ty(&TypeRef::array(TypeRef::ANY)),
                    name: self.ident(name),
                    default: None,
                    variadic: true,
                }
            }
            pattern => self.pattern_param(pattern, prologue),
        }
    }

    fn pattern_param(&mut self, pattern: &Node, prologue: &mut Vec<Stmt>) -> Param {
        let name = self.temp("_arg");
        let (pattern, variadic) = match pattern {
            Node::RestElement { argument } => (argument.as_ref(), true),
            other => (other, false),
        };
        prologue.extend(self.bind_pattern(pattern, Expr::name(&name), true));
        let ty = if variadic {
            TypeRef::array(TypeRef::ANY)
        } else {
            TypeRef::ANY
        };
        Param {
            ty: self.ty(&ty),
            name,
            default: None,
            variadic,
        }
    }

    /// A function in expression position.
    pub(super) fn lambda(&mut self, function: &Function) -> Expr {
        self.scopes.push(HashMap::new());
        let outer_breaks = std::mem::take(&mut self.breaks);
        let mut prologue = Vec::new();
        let mut params = Vec::new();
        for param in &function.params {
            match param {
                Node::Identifier(id) => {
                    self.declare(&id.name, TypeRef::ANY);
                    params.push(self.ident(&id.name));
                }
                pattern => {
                    let temp = self.temp("_arg");
                    prologue.extend(self.bind_pattern(pattern, Expr::name(&temp), true));
                    params.push(temp);
                }
            }
        }
        let body = if function.expression && prologue.is_empty() {
            LambdaBody::Expr(Box::new(self.expr(&function.body)))
        } else if function.expression {
            let value = self.expr(&function.body);
            prologue.push(Stmt::Return(Some(value)));
            LambdaBody::Block(prologue)
        } else {
            prologue.extend(self.block(function.body_statements()));
            LambdaBody::Block(prologue)
        };
        self.breaks = outer_breaks;
        self.scopes.pop();
        Expr::Lambda {
            params,
            body,
            is_async: self.is_async(function),
        }
    }

    /// A lambda passed where the callee's parameter is `dynamic`: the
    /// delegate type has to be spelled out.
    fn delegate(&mut self, function: &Function) -> Expr {
        let arity = function.params.len();
        let returns = function.expression || !lower::return_values(function).is_empty();
        let ty = match (returns, arity) {
            (false, 0) => "Action".to_string(),
            (false, n) => format!("Action<{}>", vec!["dynamic"; n].join(", ")),
            (true, n) => format!("Func<{}>", vec!["dynamic"; n + 1].join(", ")),
        };
        let lambda = self.lambda(function);
        Expr::cast(&ty, lambda)
    }

    // --------------------------------------------------------------- classes

    fn inherits_method(&self, class: &str, method: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.classes.get(class).and_then(|info| info.base.clone());
        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                return false;
            }
            let Some(info) = self.classes.get(&name) else {
                return false;
            };
            if info.methods.contains(method) {
                return true;
            }
            current = info.base.clone();
        }
        false
    }

    fn is_overridden(&self, class: &str, method: &str) -> bool {
        self.classes.iter().any(|(name, info)| {
            name != class && info.methods.contains(method) && self.descends_from(name, class)
        })
    }

    fn descends_from(&self, class: &str, ancestor: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.classes.get(class).and_then(|info| info.base.clone());
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            if !seen.insert(name.clone()) {
                return false;
            }
            current = self.classes.get(&name).and_then(|info| info.base.clone());
        }
        false
    }

    fn class_decl(&mut self, class: &Class) -> ClassDecl {
        let raw_name = class.name().unwrap_or("_Anonymous").to_string();
        let name = self.ident(&raw_name);
        let base = class.super_class.as_deref().map(|base| match base.as_identifier() {
            Some(base) => exception_type(base)
                .map(str::to_string)
                .unwrap_or_else(|| self.ident(base)),
            None => "object".to_string(),
        });
        let outer_class = self.current_class.replace(raw_name.clone());
        let outer_scopes = std::mem::take(&mut self.scopes);

        let mut members = Vec::new();
        let declared: HashSet<String> = class
            .body
            .body
            .iter()
            .filter_map(|member| match member {
                ClassMember::PropertyDefinition { key, .. } => key.property_name(),
                _ => None,
            })
            .collect();
        for field in lower::implicit_fields(class) {
            if declared.contains(&field.name) {
                continue;
            }
            let ty = self
                .field_type(&raw_name, &field.name)
                .unwrap_or(TypeRef::ANY);
            let mut modifiers = vec!["public"];
            if field.is_static {
                modifiers.push("static");
            }
            members.push(Member::Field {
                modifiers,
                ty: self.ty(&ty),
                name: self.ident(&field.name),
                value: None,
            });
        }

        // Initializers that read `this` run in the constructor instead.
        let mut field_inits = Vec::new();
        let mut constructor = None;
        let mut static_body: Option<usize> = None;
        let mut accessors: HashMap<String, usize> = HashMap::new();
        for member in &class.body.body {
            match member {
                ClassMember::PropertyDefinition {
                    key,
                    value,
                    is_static,
                    computed,
                    ..
                } => {
                    let Some(field) = key.property_name().filter(|_| !computed) else {
                        let what = self.unsupported("computed class field");
                        members.push(Member::Placeholder(placeholder_text(&what)));
                        continue;
                    };
                    let ty = self.field_type(&raw_name, &field).unwrap_or(TypeRef::ANY);
                    let spelled = self.ty(&ty);
                    let target = self.ident(&field);
                    self.receivers.push(if *is_static {
                        Expr::name(&name)
                    } else {
                        Expr::name("this")
                    });
                    let value = value.as_deref().map(|value| {
                        let reads_this = value.any(&mut |n| matches!(n, Node::ThisExpression {}));
                        (reads_this, self.expr_as(value, &ty))
                    });
                    self.receivers.pop();
                    let value = match value {
                        Some((true, value)) if !is_static => {
                            field_inits.push(Stmt::Expr(Expr::assign(
                                Expr::name("this").member(&target),
                                value,
                            )));
                            None
                        }
                        Some((_, value)) => Some(value),
                        None => None,
                    };
                    let mut modifiers = vec!["public"];
                    if *is_static {
                        modifiers.push("static");
                    }
                    members.push(Member::Field {
                        modifiers,
                        ty: spelled,
                        name: target,
                        value,
                    });
                }
                ClassMember::MethodDefinition {
                    kind: MethodKind::Constructor,
                    ..
                } => {
                    // Filled in below, once every field initializer is known.
                    constructor = Some(members.len());
                    members.push(Member::Placeholder(String::new()));
                }
                ClassMember::MethodDefinition {
                    key,
                    kind,
                    is_static,
                    computed,
                    value,
                } => {
                    let Some(method) = key.property_name().filter(|_| !computed) else {
                        let what = self.unsupported("computed method name");
                        members.push(Member::Placeholder(placeholder_text(&what)));
                        continue;
                    };
                    let spelled = self.ident(&method);
                    self.receivers.push(if *is_static {
                        Expr::name(&name)
                    } else {
                        Expr::name("this")
                    });
                    match kind {
                        MethodKind::Get | MethodKind::Set => {
                            let lowered = self.accessor(value, *kind == MethodKind::Set);
                            match accessors.get(&method) {
                                Some(&at) => {
                                    if let Member::Property { getter, setter, .. } = &mut members[at] {
                                        if *kind == MethodKind::Get {
                                            *getter = Some(lowered);
                                        } else {
                                            *setter = Some(lowered);
                                        }
                                    }
                                }
                                None => {
                                    accessors.insert(method.clone(), members.len());
                                    let mut modifiers = vec!["public"];
                                    if *is_static {
                                        modifiers.push("static");
                                    }
                                    let (getter, setter) = if *kind == MethodKind::Get {
                                        (Some(lowered), None)
                                    } else {
                                        (None, Some(lowered))
                                    };
                                    members.push(Member::Property {
                                        modifiers,
                                        ty: self.ty(&TypeRef::ANY),
                                        name: spelled,
                                        getter,
                                        setter,
                                    });
                                }
                            }
                        }
                        MethodKind::Method | MethodKind::Constructor => {
                            let mut modifiers = vec!["public"];
                            if *is_static {
                                modifiers.push("static");
                            } else if self.inherits_method(&raw_name, &method) {
                                modifiers.push("override");
                            } else if self.is_overridden(&raw_name, &method) {
                                modifiers.push("virtual");
                            }
                            members.push(Member::Method(self.method(value, &spelled, modifiers)));
                        }
                    }
                    self.receivers.pop();
                }
                ClassMember::StaticBlock { body } => {
                    self.receivers.push(Expr::name(&name));
                    let lowered = self.block(body);
                    self.receivers.pop();
                    match static_body {
                        Some(at) => {
                            if let Member::StaticConstructor { body, .. } = &mut members[at] {
                                body.extend(lowered);
                            }
                        }
                        None => {
                            static_body = Some(members.len());
                            members.push(Member::StaticConstructor {
                                name: name.clone(),
                                body: lowered,
                            });
                        }
                    }
                }
                ClassMember::Unknown { kind } => {
                    self.unknown_kind(kind);
                    members.push(Member::Placeholder(kind.clone()));
                }
            }
        }

        let ctor = match lower::constructor(class) {
            Some(function) => Some(self.constructor(&name, function, base.is_some(), field_inits)),
            None if !field_inits.is_empty() => Some(Member::Constructor {
                name: name.clone(),
                params: Vec::new(),
                base_args: None,
                body: field_inits,
                doc: None,
            }),
            None => None,
        };
        match (constructor, ctor) {
            (Some(at), Some(ctor)) => members[at] = ctor,
            (None, Some(ctor)) => members.push(ctor),
            _ => {}
        }

        self.scopes = outer_scopes;
        self.current_class = outer_class;
        ClassDecl {
            name,
            modifiers: vec!["public"],
            base,
            members,
            doc: self.doc(class.docs.as_deref()),
        }
    }

    fn constructor(
        &mut self,
        name: &str,
        function: &Function,
        has_base: bool,
        field_inits: Vec<Stmt>,
    ) -> Member {
        self.receivers.push(Expr::name("this"));
        self.scopes.push(HashMap::new());
        let mut prologue = Vec::new();
        let params = function
            .params
            .iter()
            .map(|param| self.param(param, &mut prologue))
            .collect();
        let (super_args, rest) = lower::split_super_call(function.body_statements());
        let base_args = match super_args {
            Some(args) if has_base => Some(self.arguments(args)),
            _ => None,
        };
        let mut body = prologue;
        body.extend(field_inits);
        body.extend(self.block(rest));
        self.scopes.pop();
        self.receivers.pop();
        Member::Constructor {
            name: name.to_string(),
            params,
            base_args,
            body,
            doc: self.doc(function.docs.as_deref()),
        }
    }

    /// Body of a `get`/`set` accessor. The setter's parameter is `value`.
    fn accessor(&mut self, function: &Function, setter: bool) -> Vec<Stmt> {
        self.scopes.push(HashMap::new());
        let mut body = Vec::new();
        if setter
            && let Some(param) = function.params.first().and_then(Node::as_identifier)
        {
            self.declare(param, TypeRef::ANY);
            let name = self.ident(param);
            if name != "value" {
                body.push(Stmt::Local {
                    ty: Some(self.ty(&TypeRef::ANY)),
                    name,
                    value: Some(Expr::name("value")),
                });
            }
        }
        body.extend(self.block(function.body_statements()));
        self.scopes.pop();
        body
    }

    // ----------------------------------------------------------- expressions

    pub(super) fn arguments(&mut self, arguments: &[Node]) -> Vec<Expr> {
        arguments
            .iter()
            .map(|argument| match argument {
                Node::SpreadElement { argument } => {
                    let value = self.sequence(argument);
                    value.method("ToArray", Vec::new())
                }
                other => match other.as_inline_function() {
                    Some(function) => self.delegate(function),
                    None => self.expr(other),
                },
            })
            .collect()
    }

    /// `node` as an `IEnumerable` LINQ can extend; `dynamic` receivers
    /// cannot take extension methods.
    pub(super) fn sequence(&mut self, node: &Node) -> Expr {
        let known = self
            .type_of(node)
            .is_some_and(|ty| ty.is_list() || ty.is_array() || ty.is_string() || ty.is_map());
        let value = self.expr(node);
        if known {
            value
        } else {
            Expr::cast("IEnumerable<dynamic>", value)
        }
    }

    /// Lower `node` for a slot of type `ty`, shaping literals to match.
    pub(super) fn expr_as(&mut self, node: &Node, ty: &TypeRef) -> Expr {
        match (node, ty) {
            (Node::ArrayExpression { elements }, TypeRef::Array(element)) => {
                let items = elements
                    .iter()
                    .map(|item| match item {
                        Some(item) => self.expr_as(item, element),
                        None => Expr::literal("default"),
                    })
                    .collect();
                Expr::NewArray {
                    element: self.ty(element),
                    size: None,
                    items,
                }
            }
            (Node::ArrayExpression { elements }, _) if ty.is_list() => {
                let element = ty.element().cloned().unwrap_or(TypeRef::ANY);
                self.list_literal(elements, &element)
            }
            (Node::ObjectExpression { properties }, _) if ty.is_map() => {
                let spelled = self.ty(ty);
                self.dictionary(properties, &spelled)
            }
            _ => {
                let value = self.expr(node);
                let narrowing = ty.primitive().filter(|p| p.is_integer() && *p != Primitive::Int32);
                let source = self.type_of(node).and_then(|t| t.primitive());
                match (narrowing, source) {
                    (Some(target), Some(source))
                        if source.is_numeric() && source != target && !is_constant(node) =>
                    {
                        Expr::Unchecked(Box::new(Expr::cast(&self.ty(ty), value)))
                    }
                    _ => value,
                }
            }
        }
    }

    fn list_literal(&mut self, elements: &[Option<Node>], element: &TypeRef) -> Expr {
        let ty = self.ty(&TypeRef::list(element.clone()));
        if elements
            .iter()
            .any(|item| matches!(item, Some(Node::SpreadElement { .. })))
        {
            // Spreads concatenate; plain items travel as one-element lists.
            let mut parts = Vec::new();
            for item in elements.iter().flatten() {
                parts.push(match item {
                    Node::SpreadElement { argument } => self.sequence(argument),
                    other => {
                        let value = self.expr_as(other, element);
                        Expr::New {
                            ty: ty.clone(),
                            args: Vec::new(),
                            init: Some(Initializer::Items(vec![value])),
                        }
                    }
                });
            }
            let mut parts = parts.into_iter();
            let Some(first) = parts.next() else {
                return Expr::construct(&ty, Vec::new());
            };
            return parts
                .fold(first, |acc, part| acc.method("Concat", vec![part]))
                .method("ToList", Vec::new());
        }
        let items: Vec<Expr> = elements
            .iter()
            .map(|item| match item {
                Some(item) => self.expr_as(item, element),
                None => Expr::null(),
            })
            .collect();
        Expr::New {
            ty,
            args: Vec::new(),
            init: (!items.is_empty()).then_some(Initializer::Items(items)),
        }
    }

    pub(super) fn dictionary(&mut self, properties: &[Node], ty: &str) -> Expr {
        let mut entries = Vec::new();
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
                    let value = match value.as_inline_function() {
                        Some(function) => self.delegate(function),
                        None => self.expr(value),
                    };
                    entries.push((key, value));
                }
                other => {
                    let what = self.unsupported(format!("{} in object literal", other.kind()));
                    entries.push((Expr::Str(placeholder_text(&what)), what));
                }
            }
        }
        Expr::New {
            ty: ty.to_string(),
            args: Vec::new(),
            init: (!entries.is_empty()).then_some(Initializer::Entries(entries)),
        }
    }

    pub(super) fn expr(&mut self, node: &Node) -> Expr {
        match node {
            Node::Literal(literal) => literal_expr(literal),
            Node::TemplateLiteral {
                quasis,
                expressions,
            } => {
                let mut parts = Vec::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    if !quasi.text().is_empty() {
                        parts.push(InterpolationPart::Text(quasi.text().to_string()));
                    }
                    if let Some(expression) = expressions.get(i) {
                        parts.push(InterpolationPart::Hole(self.expr(expression)));
                    }
                }
                Expr::Interpolated(parts)
            }
            Node::Identifier(id) => self.identifier(&id.name),
            Node::ThisExpression {} => self.receiver(),
            Node::Super {} => Expr::name("base"),
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
                let untyped = self
                    .type_of(left)
                    .is_none_or(|ty| ty.primitive().is_none());
                match operator {
                    LogicalOperator::Or if is_default_value(right) && untyped => {
                        let left = self.expr(left);
                        Expr::bin(Op::Coalesce, left, self.expr(right))
                    }
                    LogicalOperator::Coalesce => {
                        let left = self.expr(left);
                        Expr::bin(Op::Coalesce, left, self.expr(right))
                    }
                    other => {
                        let left = self.condition(left);
                        Expr::bin(Op::from_logical(*other), left, self.condition(right))
                    }
                }
            }
            Node::UnaryExpression { operator, argument } => self.unary(*operator, argument),
            Node::UpdateExpression {
                operator,
                prefix,
                argument,
            } => {
                let op = match (operator, prefix) {
                    (UpdateOperator::Increment, true) => UnaryOp::PreIncrement,
                    (UpdateOperator::Increment, false) => UnaryOp::PostIncrement,
                    (UpdateOperator::Decrement, true) => UnaryOp::PreDecrement,
                    (UpdateOperator::Decrement, false) => UnaryOp::PostDecrement,
                };
                Expr::unary(op, self.expr(argument))
            }
            Node::AssignmentExpression {
                operator,
                left,
                right,
            } => self.assignment(*operator, left, right),
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
                let test = self.condition(test);
                let then = self.expr(consequent);
                let otherwise = self.expr(alternate);
                Expr::conditional(test, then, otherwise)
            }
            Node::ArrayExpression { elements } => self.list_literal(elements, &TypeRef::ANY),
            Node::ObjectExpression { properties } => {
                let ty = self.ty(&TypeRef::map(TypeRef::STRING, TypeRef::ANY));
                self.dictionary(properties, &ty)
            }
            Node::SpreadElement { .. } => self.unsupported("spread element"),
            Node::FunctionExpression(function) | Node::ArrowFunctionExpression(function) => {
                self.lambda(function)
            }
            Node::SequenceExpression { expressions } => match expressions.split_last() {
                Some((last, [])) => self.expr(last),
                _ => self.unsupported("comma expression"),
            },
            Node::AwaitExpression { argument } => {
                let value = self.expr(argument);
                match self.options.async_style {
                    AsyncStyle::Task => Expr::Await(Box::new(value)),
                    AsyncStyle::None => value,
                }
            }
            Node::Property { .. }
            | Node::ArrayPattern { .. }
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

    fn identifier(&mut self, name: &str) -> Expr {
        match name {
            "undefined" => Expr::null(),
            "NaN" => Expr::name("double.NaN"),
            "Infinity" => Expr::name("double.PositiveInfinity"),
            _ => {
                let spelled = self.ident(name);
                let global = !self.is_local(name)
                    && (self.globals.contains_key(name) || self.global_functions.contains(name));
                if global && self.current_class.is_some() {
                    Expr::name(&self.options.class_name).member(&spelled)
                } else {
                    Expr::Name(spelled)
                }
            }
        }
    }

    fn binary(&mut self, operator: BinaryOperator, left: &Node, right: &Node) -> Expr {
        match operator {
            BinaryOperator::Pow => {
                let args = vec![self.expr(left), self.expr(right)];
                Expr::call_path("Math.Pow", args)
            }
            BinaryOperator::In => {
                let key = self.expr(left);
                self.expr(right).method("ContainsKey", vec![key])
            }
            BinaryOperator::InstanceOf => {
                let value = self.expr(left);
                let ty = match right.as_identifier() {
                    Some(name) => exception_type(name)
                        .map(str::to_string)
                        .unwrap_or_else(|| self.ident(name)),
                    None => return self.unsupported("instanceof with a computed type"),
                };
                Expr::Is {
                    value: Box::new(value),
                    ty,
                }
            }
            BinaryOperator::UShr if int_literal(right) == Some(0) => {
                let value = self.expr(left);
                Expr::Unchecked(Box::new(Expr::cast("uint", value)))
            }
            // `>>>` on an `int` stays signed; shift the `uint` bit pattern instead.
            BinaryOperator::UShr => {
                let value = self.expr(left);
                let value = if self.is_uint(left) {
                    value
                } else {
                    Expr::Unchecked(Box::new(Expr::cast("uint", value)))
                };
                let amount = self.shift_amount(right);
                Expr::bin(Op::Shr, value, amount)
            }
            BinaryOperator::Shl | BinaryOperator::Shr if self.is_uint(left) || self.is_uint(right) => {
                let value = self.expr(left);
                let value = if self.is_uint(left) {
                    Expr::Unchecked(Box::new(Expr::cast("int", value)))
                } else {
                    value
                };
                let amount = self.shift_amount(right);
                let op = if operator == BinaryOperator::Shl { Op::Shl } else { Op::Shr };
                Expr::bin(op, value, amount)
            }
            BinaryOperator::Div if self.is_integer(left) && self.is_integer(right) => {
                let dividend = Expr::cast("double", self.expr(left));
                Expr::bin(Op::Div, dividend, self.expr(right))
            }
            other => {
                // `uint` mixed with `int` widens to `long`; JS arithmetic stays 32-bit.
                let narrow = !other.is_comparison()
                    && (self.is_uint(left) || self.is_uint(right))
                    && self.is_integer(left)
                    && self.is_integer(right);
                let left = self.expr(left);
                let right = self.expr(right);
                match Op::from_binary(other) {
                    Some(op) if narrow => {
                        Expr::Unchecked(Box::new(Expr::cast("int", Expr::bin(op, left, right))))
                    }
                    Some(op) => Expr::bin(op, left, right),
                    None => self.unsupported(format!("operator {}", other.as_str())),
                }
            }
        }
    }

    fn is_uint(&self, node: &Node) -> bool {
        self.type_of(node).and_then(|ty| ty.primitive()) == Some(Primitive::UInt32)
    }

    /// C# shift counts are `int`.
    fn shift_amount(&mut self, right: &Node) -> Expr {
        let amount = self.expr(right);
        if self.is_uint(right) {
            Expr::Unchecked(Box::new(Expr::cast("int", amount)))
        } else {
            amount
        }
    }

    fn unary(&mut self, operator: UnaryOperator, argument: &Node) -> Expr {
        let op = match operator {
            UnaryOperator::Neg => UnaryOp::Neg,
            UnaryOperator::Plus => UnaryOp::Plus,
            UnaryOperator::Not => UnaryOp::Not,
            UnaryOperator::BitNot => UnaryOp::BitNot,
            UnaryOperator::TypeOf => return self.unsupported("typeof"),
            UnaryOperator::Void => return Expr::null(),
            UnaryOperator::Delete => return self.unsupported("delete in expression position"),
        };
        if op == UnaryOp::Not {
            let value = self.condition(argument);
            return Expr::unary(op, value);
        }
        Expr::unary(op, self.expr(argument))
    }

    fn assignment(&mut self, operator: AssignmentOperator, left: &Node, right: &Node) -> Expr {
        if destructure::is_pattern(left) {
            return self.unsupported("destructuring assignment in expression position");
        }
        let target = self.expr(left);
        match operator.compound() {
            None => {
                let ty = self.type_of(left).unwrap_or(TypeRef::ANY);
                let value = self.expr_as(right, &ty);
                Expr::assign(target, value)
            }
            Some(CompoundOperator::Binary(BinaryOperator::Pow)) => {
                let value = self.expr(right);
                let power = Expr::call_path("Math.Pow", vec![target.clone(), value]);
                Expr::assign(target, power)
            }
            Some(CompoundOperator::Binary(operator)) => {
                let value = self.expr(right);
                match Op::from_binary(operator) {
                    Some(op) => Expr::Assign {
                        op: Some(op),
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    None => self.unsupported(format!("{}=", operator.as_str())),
                }
            }
            Some(CompoundOperator::Logical(LogicalOperator::Coalesce)) => Expr::Assign {
                op: Some(Op::Coalesce),
                target: Box::new(target),
                value: Box::new(self.expr(right)),
            },
            Some(CompoundOperator::Logical(operator)) => {
                let value = self.expr(right);
                let combined = Expr::bin(Op::from_logical(operator), target.clone(), value);
                Expr::assign(target, combined)
            }
        }
    }

    fn member(&mut self, object: &Node, property: &Node, computed: bool) -> Expr {
        if computed {
            let index = self.expr(property);
            return self.expr(object).index(index);
        }
        let Some(name) = property.property_name() else {
            return self.unsupported("member without a name");
        };
        if let Some(global) = object.as_identifier()
            && !self.is_local(global)
            && let Some(constant) = global_constant(global, &name)
        {
            return Expr::name(constant);
        }
        let object_type = self.type_of(object);
        let value = self.expr(object);
        match object_type {
            Some(ty) if ty.is_map() => value.index(Expr::Str(name)),
            Some(ty) if name == "length" => {
                let length = if ty.is_list() { "Count" } else { "Length" };
                value.member(length)
            }
            Some(TypeRef::Named { name: class, .. }) if class == "Exception" => match name.as_str() {
                "message" => value.member("Message"),
                "stack" => value.member("StackTrace"),
                other => value.member(&self.ident(other)),
            },
            _ if name == "length" => value.member("Count"),
            _ => value.member(&self.ident(&name)),
        }
    }

    fn call(&mut self, callee: &Node, arguments: &[Node]) -> Expr {
        if let Node::MemberExpression {
            object,
            property,
            computed: false,
        } = callee
            && let (Some(global), Some(method)) = (object.as_identifier(), property.property_name())
            && !self.is_local(global)
            && let Some(mapped) = self.global_call(global, &method, arguments)
        {
            return mapped;
        }
        if let Some(name) = callee.as_identifier()
            && !self.is_local(name)
            && !self.global_functions.contains(name)
            && let Some(mapped) = self.builtin_call(name, arguments)
        {
            return mapped;
        }
        if matches!(callee, Node::Super {}) {
            return self.unsupported("super call outside a constructor");
        }
        let args = self.arguments(arguments);
        let func = self.expr(callee);
        Expr::call(func, args)
    }

    fn construct(&mut self, callee: &Node, arguments: &[Node]) -> Expr {
        let Some(name) = callee.as_identifier() else {
            return self.unsupported("constructor call on an expression");
        };
        let args = self.arguments(arguments);
        if let Some(exception) = exception_type(name) {
            return Expr::construct(exception, args);
        }
        match name {
            "Map" => Expr::construct(&self.ty(&TypeRef::map(TypeRef::ANY, TypeRef::ANY)), Vec::new()),
            "Set" => Expr::construct("HashSet<dynamic>", args),
            "Array" => Expr::construct("List<dynamic>", Vec::new()),
            "Object" => Expr::construct(
                &self.ty(&TypeRef::map(TypeRef::STRING, TypeRef::ANY)),
                Vec::new(),
            ),
            other => Expr::construct(&self.ident(other), args),
        }
    }
}

impl Transformer for CSharpTransformer {
    type Unit = CompilationUnit;

    fn transform(&mut self, program: &Program) -> CompilationUnit {
        self.reset();
        for namespace in ["System", "System.Collections.Generic", "System.Linq"] {
            self.using(namespace);
        }
        let body = top_level_statements(program);
        self.collect_classes(&body);
        self.collect_globals(&body);

        let mut classes = Vec::new();
        let mut members = Vec::new();
        let mut main = Vec::new();
        for node in &body {
            match node {
                Node::ClassDeclaration(class) => classes.push(self.class_decl(class)),
                Node::FunctionDeclaration(function) => {
                    let name = self.ident(function.name().unwrap_or("_anonymous"));
                    members.push(Member::Method(self.method(
                        function,
                        &name,
                        vec!["public", "static"],
                    )));
                }
                Node::VariableDeclaration { kind, declarations } => {
                    for declarator in declarations {
                        self.global_declarator(*kind, declarator, &mut members, &mut main);
                    }
                }
                other => {
                    self.scopes.push(HashMap::new());
                    main.extend(self.statement(other));
                    self.scopes.pop();
                }
            }
        }
        classes.append(&mut self.lifted);

        let has_main = !main.is_empty();
        if has_main {
            let awaits = main.iter().any(stmt_awaits);
            let returns = if awaits {
                self.using("System.Threading.Tasks");
                "Task"
            } else {
                "void"
            };
            let mut modifiers = vec!["public", "static"];
            if awaits {
                modifiers.push("async");
            }
            members.push(Member::Method(Method {
                modifiers,
                returns: returns.to_string(),
                name: "Main".to_string(),
                params: vec![Param {
                    ty: "string[]".to_string(),
                    name: "args".to_string(),
                    default: None,
                    variadic: false,
                }],
                body: main,
                doc: None,
            }));
        }
        for helper in std::mem::take(&mut self.helpers) {
            members.push(Member::Verbatim(helper.source()));
        }

        let stubs = self.stubs(&classes);
        CompilationUnit {
            nullable: self.options.nullable,
            usings: self.usings.iter().map(|u| u.to_string()).collect(),
            namespace: self.options.namespace.clone(),
            stubs,
            classes,
            program: ClassDecl {
                name: self.ident(&self.options.class_name),
                modifiers: vec!["public", "static"],
                base: None,
                members,
                doc: None,
            },
            has_main,
        }
    }

    fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

pub(super) fn literal_expr(literal: &Literal) -> Expr {
    match &literal.value {
        LiteralValue::Null => Expr::null(),
        LiteralValue::Bool(value) => Expr::literal(value.to_string()),
        LiteralValue::String(value) => Expr::Str(value.clone()),
        LiteralValue::Number(value) => match literal.as_integer() {
            Some(int) if literal.is_hex() && int >= 0 => Expr::literal(format!("0x{int:X}")),
            Some(int) => Expr::literal(int.to_string()),
            None if value.is_nan() => Expr::name("double.NaN"),
            None if value.is_infinite() && *value > 0.0 => Expr::name("double.PositiveInfinity"),
            None if value.is_infinite() => Expr::name("double.NegativeInfinity"),
            None => Expr::literal(float_literal(*value)),
        },
    }
}

/// `Math.PI`-style members of JS globals.
fn global_constant(global: &str, name: &str) -> Option<&'static str> {
    Some(match (global, name) {
        ("Math", "PI") => "Math.PI",
        ("Math", "E") => "Math.E",
        ("Math", "LN2") => "Math.Log(2)",
        ("Number", "MAX_SAFE_INTEGER") => "9007199254740991L",
        ("Number", "MIN_SAFE_INTEGER") => "-9007199254740991L",
        ("Number", "MAX_VALUE") => "double.MaxValue",
        ("Number", "EPSILON") => "double.Epsilon",
        ("Number", "POSITIVE_INFINITY") => "double.PositiveInfinity",
        ("Number", "NEGATIVE_INFINITY") => "double.NegativeInfinity",
        _ => return None,
    })
}

pub(super) fn int_literal(node: &Node) -> Option<i64> {
    match node {
        Node::Literal(literal) => literal.as_integer().and_then(|n| i64::try_from(n).ok()),
        _ => None,
    }
}

/// Literals usable as `case` labels, optional-parameter defaults and
/// eagerly initialized fields.
fn is_constant(node: &Node) -> bool {
    match node {
        Node::Literal(_) => true,
        Node::UnaryExpression {
            operator: UnaryOperator::Neg,
            argument,
        } => matches!(argument.as_ref(), Node::Literal(_)),
        _ => false,
    }
}

/// Right-hand sides of `x || fallback` that make it a default-value idiom.
fn is_default_value(node: &Node) -> bool {
    match node {
        Node::Literal(literal) => !matches!(literal.value, LiteralValue::Bool(_)),
        Node::ArrayExpression { .. }
        | Node::ObjectExpression { .. }
        | Node::NewExpression { .. }
        | Node::TemplateLiteral { .. } => true,
        _ => false,
    }
}

fn is_length_member(node: &Node) -> bool {
    matches!(
        node,
        Node::MemberExpression { property, computed: false, .. }
            if property.property_name().as_deref() == Some("length")
    )
}

fn is_null(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(text) if text == "null")
}

pub(super) fn is_exit(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Return(_) | Stmt::Throw(_) | Stmt::Break | Stmt::Continue | Stmt::Goto(_)
    )
}

pub(super) fn placeholder_text(expr: &Expr) -> String {
    match expr {
        Expr::Placeholder(what) => what.clone(),
        _ => String::new(),
    }
}

/// Wrap an expression as a statement. C# only allows calls, assignments,
/// increments, `await` and `new` there; anything else is discarded.
pub(super) fn statement_of(value: Expr) -> Option<Stmt> {
    match value {
        Expr::Call { .. }
        | Expr::Assign { .. }
        | Expr::Await(_)
        | Expr::New { .. }
        | Expr::Placeholder(_)
        | Expr::Unary {
            op: UnaryOp::PreIncrement
            | UnaryOp::PreDecrement
            | UnaryOp::PostIncrement
            | UnaryOp::PostDecrement,
            ..
        } => Some(Stmt::Expr(value)),
        other if other.is_simple() => None,
        other => Some(Stmt::Expr(Expr::assign(Expr::name("_"), other))),
    }
}

fn stmt_awaits(stmt: &Stmt) -> bool {
    fn expr_awaits(expr: &Expr) -> bool {
        match expr {
            Expr::Await(_) => true,
            Expr::Call { func, args } => expr_awaits(func) || args.iter().any(expr_awaits),
            Expr::Assign { target, value, .. } => expr_awaits(target) || expr_awaits(value),
            Expr::Binary { left, right, .. } => expr_awaits(left) || expr_awaits(right),
            Expr::Member { object, .. } => expr_awaits(object),
            _ => false,
        }
    }
    match stmt {
        Stmt::Expr(expr) | Stmt::Return(Some(expr)) => expr_awaits(expr),
        Stmt::Local { value: Some(value), .. } => expr_awaits(value),
        Stmt::If {
            then, otherwise, ..
        } => then.iter().chain(otherwise).any(stmt_awaits),
        Stmt::While { body, .. }
        | Stmt::DoWhile { body, .. }
        | Stmt::For { body, .. }
        | Stmt::ForEach { body, .. }
        | Stmt::Block(body) => body.iter().any(stmt_awaits),
        Stmt::Try {
            body,
            catch,
            finally,
        } => body
            .iter()
            .chain(catch.iter().flat_map(|c| c.body.iter()))
            .chain(finally)
            .any(stmt_awaits),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retarget_il::build::*;

    fn lower(body: Vec<Node>) -> (CompilationUnit, Vec<String>) {
        let mut transformer = CSharpTransformer::new(CSharpOptions::default());
        let unit = transformer.transform(&Program::new(body));
        (unit, transformer.take_warnings())
    }

    fn find_method<'a>(unit: &'a CompilationUnit, name: &str) -> &'a Method {
        unit.program
            .members
            .iter()
            .find_map(|member| match member {
                Member::Method(method) if method.name == name => Some(method),
                _ => None,
            })
            .expect("method")
    }

    #[test]
    fn test_unsigned_shift_reinterprets_as_uint() {
        let mut f = function(
            Some("f"),
            &["a", "h"],
            vec![
                declaration(
                    DeclarationKind::Let,
                    ident("k"),
                    Some(binary(BinaryOperator::UShr, ident("a"), int(3))),
                ),
                ret(Some(binary(BinaryOperator::Add, ident("h"), ident("k")))),
            ],
        );
        f.params = vec![typed_ident("a", "int32"), typed_ident("h", "int32")];
        let (unit, warnings) = lower(vec![Node::FunctionDeclaration(f)]);
        assert!(warnings.is_empty(), "{warnings:?}");
        let method = find_method(&unit, "f");
        assert_eq!(method.returns, "int");
        let Stmt::Local { value: Some(shifted), .. } = &method.body[0] else {
            panic!("expected a local, got {:?}", method.body[0]);
        };
        assert_eq!(
            *shifted,
            Expr::bin(
                Op::Shr,
                Expr::Unchecked(Box::new(Expr::cast("uint", Expr::name("a")))),
                Expr::int(3)
            )
        );
        let sum = Expr::bin(Op::Add, Expr::name("h"), Expr::name("k"));
        assert_eq!(
            method.body[1],
            Stmt::Return(Some(Expr::Unchecked(Box::new(Expr::cast("int", sum)))))
        );
    }

    #[test]
    fn test_object_rest_pattern_warns() {
        let pattern = Node::ObjectPattern {
            properties: vec![
                property("x", ident("x")),
                Node::RestElement {
                    argument: Box::new(ident("others")),
                },
            ],
        };
        let (_, warnings) = lower(vec![declaration(
            DeclarationKind::Const,
            pattern,
            Some(ident("point")),
        )]);
        assert!(
            warnings.iter().any(|w| w == "unsupported construct: object rest pattern"),
            "{warnings:?}"
        );
    }

    #[test]
    fn test_top_level_code_becomes_main() {
        let (unit, warnings) = lower(vec![
            function_decl("twice", &["n"], vec![ret(Some(binary(
                BinaryOperator::Mul,
                ident("n"),
                int(2),
            )))]),
            expr_stmt(call(ident("twice"), vec![int(4)])),
        ]);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert!(unit.has_main);
        let twice = find_method(&unit, "twice");
        assert_eq!(twice.modifiers, ["public", "static"]);
        assert_eq!(twice.returns, "int");
        assert_eq!(find_method(&unit, "Main").body.len(), 1);
    }

    #[test]
    fn test_locals_take_inferred_types() {
        let (unit, _) = lower(vec![function_decl(
            "f",
            &[],
            vec![
                const_decl("n", hex(0x9E37_79B9)),
                const_decl("name", string("x")),
                var_decl("state", None),
            ],
        )]);
        let body = &find_method(&unit, "f").body;
        let types: Vec<_> = body
            .iter()
            .map(|stmt| match stmt {
                Stmt::Local { ty, .. } => ty.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(
            types,
            [
                Some("uint".to_string()),
                Some("string".to_string()),
                Some("dynamic".to_string())
            ]
        );
    }

    #[test]
    fn test_destructuring_holes_read_original_index() {
        let pattern = Node::ArrayPattern {
            elements: vec![None, Some(ident("b")), None],
        };
        let (unit, _) = lower(vec![function_decl(
            "f",
            &["arr"],
            vec![declaration(DeclarationKind::Const, pattern, Some(ident("arr")))],
        )]);
        let body = &find_method(&unit, "f").body;
        assert_eq!(
            body,
            &[Stmt::Local {
                ty: Some("dynamic".to_string()),
                name: "b".to_string(),
                value: Some(Expr::name("arr").index(Expr::int(1))),
            }]
        );
    }

    #[test]
    fn test_subclass_methods_override() {
        let (unit, _) = lower(vec![
            class_decl("Base", None, vec![method("run", &[], vec![])]),
            class_decl("Derived", Some("Base"), vec![method("run", &[], vec![])]),
        ]);
        let modifiers: Vec<_> = unit
            .classes
            .iter()
            .map(|class| match &class.members[0] {
                Member::Method(method) => method.modifiers.clone(),
                other => panic!("unexpected member {other:?}"),
            })
            .collect();
        assert_eq!(modifiers, [vec!["public", "virtual"], vec!["public", "override"]]);
        assert!(unit.stubs.is_empty());
    }

    #[test]
    fn test_external_base_gets_a_stub() {
        let (unit, _) = lower(vec![class_decl("Cipher", Some("BlockCipher"), vec![])]);
        assert_eq!(unit.stubs.len(), 1);
        assert_eq!(unit.stubs[0].name, "BlockCipher");
    }

    #[test]
    fn test_non_constant_switch_becomes_if_chain() {
        let cases = vec![
            SwitchCase {
                test: Some(Box::new(ident("A"))),
                consequent: vec![expr_stmt(call(ident("a"), vec![])), Node::BreakStatement {}],
            },
            SwitchCase {
                test: None,
                consequent: vec![expr_stmt(call(ident("b"), vec![]))],
            },
        ];
        let (unit, _) = lower(vec![function_decl(
            "f",
            &["x"],
            vec![Node::SwitchStatement {
                discriminant: Box::new(ident("x")),
                cases,
            }],
        )]);
        let body = &find_method(&unit, "f").body;
        assert!(matches!(body.as_slice(), [Stmt::If { otherwise, .. }] if otherwise.len() == 1));
    }

    #[test]
    fn test_unknown_kind_warns() {
        let (unit, warnings) = lower(vec![Node::Unknown {
            kind: "WithStatement".into(),
        }]);
        assert_eq!(warnings, ["unhandled kind: WithStatement"]);
        assert_eq!(
            find_method(&unit, "Main").body,
            [Stmt::Placeholder("WithStatement".into())]
        );
    }

    #[test]
    fn test_state_resets_between_runs() {
        let mut transformer = CSharpTransformer::new(CSharpOptions::default());
        let program = Program::new(vec![Node::Unknown {
            kind: "WithStatement".into(),
        }]);
        let first = transformer.transform(&program);
        let first_warnings = transformer.take_warnings();
        let second = transformer.transform(&program);
        assert_eq!(first, second);
        assert_eq!(first_warnings, transformer.take_warnings());
    }
}
