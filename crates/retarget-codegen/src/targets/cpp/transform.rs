//! Lowering IL programs into the C++ tree.
//!
//! Top-level functions, variables and classes become namespace-scope
//! declarations and the remaining top-level statements run in `main`.
//! Class instances live behind `std::shared_ptr`. Untyped values use `auto`
//! where C++ can deduce a type and `std::any` where it cannot.

use super::CppOptions;
use super::ast::*;
use super::runtime::Helper;
use crate::destructure::{self, Access};
use crate::escape::{CPP_RESERVED, Rename, float_literal, sanitize_identifier};
use crate::infer::{expression_type, name_hint};
use crate::lower;
use crate::precedence::Op;
use crate::traits::Transformer;
use crate::types::{Primitive, TypeRef, TypeSyntax, parse_il_type};
use crate::unwrap::top_level_statements;
use retarget_il::{
    self as il, AssignmentOperator, BinaryOperator, ClassMember, CompoundOperator,
    DeclarationKind, Literal, LiteralValue, LogicalOperator, MethodKind, Node, NumericType,
    Program, SwitchCase, TemplateElement, UnaryOperator, UpdateOperator, VariableDeclarator,
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// C++ spelling of the shared type model.
pub(super) struct CppTypes;

impl TypeSyntax for CppTypes {
    fn primitive(&self, primitive: Primitive) -> &'static str {
        match primitive {
            Primitive::Int8 => "int8_t",
            Primitive::UInt8 => "uint8_t",
            Primitive::Int16 => "int16_t",
            Primitive::UInt16 => "uint16_t",
            Primitive::Int32 => "int32_t",
            Primitive::UInt32 => "uint32_t",
            Primitive::Int64 => "int64_t",
            Primitive::UInt64 => "uint64_t",
            Primitive::Float32 => "float",
            Primitive::Float64 => "double",
            Primitive::Bool => "bool",
            Primitive::Char => "char",
            Primitive::String => "std::string",
            Primitive::Void => "void",
            Primitive::Any => "std::any",
        }
    }

    fn named(&self, name: &str, args: &[String]) -> String {
        match (name, args) {
            ("List", [element]) => format!("std::vector<{element}>"),
            ("List", _) => "std::vector<std::any>".to_string(),
            ("Map", [key, value]) => format!("std::map<{}, {value}>", ordered(key)),
            ("Map", _) => "std::map<std::string, std::any>".to_string(),
            ("Set", [element]) => format!("std::set<{}>", ordered(element)),
            ("Set", _) => "std::set<std::string>".to_string(),
            ("Promise", [inner]) => inner.clone(),
            ("object" | "Object" | "Promise", _) => "std::any".to_string(),
            ("Exception", _) => "std::runtime_error".to_string(),
            (name, _) => match exception_type(name) {
                Some(exception) => exception.to_string(),
                None => format!("std::shared_ptr<{name}>"),
            },
        }
    }

    fn array(&self, element: String) -> String {
        format!("std::vector<{element}>")
    }

    fn nullable(&self, inner: String) -> String {
        if inner == "std::any"
            || inner.starts_with("std::shared_ptr<")
            || inner.starts_with("std::optional<")
        {
            inner
        } else {
            format!("std::optional<{inner}>")
        }
    }

    fn tuple(&self, items: Vec<String>) -> String {
        format!("std::tuple<{}>", items.join(", "))
    }
}

/// Ordered containers cannot key on `std::any`.
fn ordered(key: &str) -> &str {
    if key == "std::any" { "std::string" } else { key }
}

/// Map JS error constructors onto `<stdexcept>`.
pub(super) fn exception_type(name: &str) -> Option<&'static str> {
    match name {
        "Error" | "SyntaxError" => Some("std::runtime_error"),
        "TypeError" => Some("std::invalid_argument"),
        "RangeError" => Some("std::range_error"),
        "ReferenceError" => Some("std::logic_error"),
        _ => None,
    }
}

const LIBRARY_TYPES: &[&str] = &["List", "Map", "Set", "Promise", "object", "Object", "Exception"];

/// The class a value of `ty` points to.
pub(super) fn class_name(ty: &TypeRef) -> Option<&str> {
    match ty {
        TypeRef::Named { name, .. }
            if !LIBRARY_TYPES.contains(&name.as_str()) && exception_type(name).is_none() =>
        {
            Some(name)
        }
        TypeRef::Nullable(inner) => class_name(inner),
        _ => None,
    }
}

pub(super) fn is_container(ty: &TypeRef) -> bool {
    ty.is_list()
        || ty.is_array()
        || ty.is_map()
        || matches!(ty, TypeRef::Named { name, .. } if name == "Set")
}

#[derive(Debug, Default)]
struct ClassInfo {
    base: Option<String>,
    methods: HashSet<String>,
    fields: HashMap<String, TypeRef>,
    getters: HashSet<String>,
    setters: HashSet<String>,
}

/// Where a `break` goes.
#[derive(Debug, Clone)]
enum BreakTarget {
    /// A loop or a native `switch`.
    Native,
    /// A `switch` lowered to an `if` chain ending at this label.
    Label(String),
}

pub struct CppTransformer {
    pub(super) options: CppOptions,
    pub(super) warnings: Vec<String>,
    helpers: BTreeSet<Helper>,
    temps: usize,
    /// Local types, one map per enclosing function.
    scopes: Vec<HashMap<String, TypeRef>>,
    globals: HashMap<String, TypeRef>,
    global_functions: HashSet<String>,
    classes: HashMap<String, ClassInfo>,
    current_class: Option<String>,
    /// Spelling of `this`: `this` in instance code, the class name in static code.
    receivers: Vec<Expr>,
    breaks: Vec<BreakTarget>,
    /// Classes declared inside functions, moved to namespace scope.
    lifted: Vec<ClassDecl>,
    /// Inside a coroutine body, where `return` is `co_return`.
    coroutine: bool,
}

impl CppTransformer {
    pub fn new(options: CppOptions) -> Self {
        Self {
            options,
            warnings: Vec::new(),
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
            coroutine: false,
        }
    }

    fn reset(&mut self) {
        self.warnings.clear();
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
        self.coroutine = false;
    }

    /// Reference a runtime helper, pulling in the helpers it calls.
    pub(super) fn helper(&mut self, helper: Helper) -> Expr {
        self.require(helper);
        Expr::name(helper.path())
    }

    fn require(&mut self, helper: Helper) {
        if self.helpers.insert(helper) {
            for dependency in helper.requires() {
                self.require(*dependency);
            }
        }
    }

    pub(super) fn temp(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.temps);
        self.temps += 1;
        name
    }

    pub(super) fn ident(&self, name: &str) -> String {
        sanitize_identifier(name, CPP_RESERVED, Rename::Suffix)
    }

    pub(super) fn unsupported(&mut self, what: impl Into<String>) -> Expr {
        let what = what.into();
        tracing::debug!(construct = %what, "no c++ lowering");
        self.warnings.push(format!("unsupported construct: {what}"));
        Expr::Placeholder(what)
    }

    fn unknown_kind(&mut self, kind: &str) {
        self.warnings.push(format!("unhandled kind: {kind}"));
    }

    pub(super) fn ty(&self, ty: &TypeRef) -> String {
        ty.render(&CppTypes)
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
            Node::ThisExpression {} => self.current_class.as_deref().map(TypeRef::named),
            Node::MemberExpression {
                object,
                property,
                computed: false,
            } => {
                let class = match object.as_ref() {
                    Node::ThisExpression {} => self.current_class.clone()?,
                    other => class_name(&self.type_of(other)?)?.to_string(),
                };
                self.field_type(&class, &property.property_name()?)
            }
            Node::MemberExpression {
                object,
                computed: true,
                ..
            } => {
                let container = self.type_of(object)?;
                if container.is_string() {
                    return Some(TypeRef::STRING);
                }
                container.element().cloned()
            }
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

    /// The unit class behind a value, for `->` access and accessor calls.
    fn class_of(&self, node: &Node) -> Option<String> {
        match node {
            Node::ThisExpression {} => self.current_class.clone(),
            Node::Identifier(id) if !self.is_local(&id.name) && self.classes.contains_key(&id.name) => {
                Some(id.name.clone())
            }
            other => self
                .type_of(other)
                .as_ref()
                .and_then(class_name)
                .map(str::to_string),
        }
    }

    fn has_accessor(&self, class: &str, name: &str, setter: bool) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(class.to_string());
        while let Some(class) = current {
            if !seen.insert(class.clone()) {
                break;
            }
            let Some(info) = self.classes.get(&class) else {
                break;
            };
            let accessors = if setter { &info.setters } else { &info.getters };
            if accessors.contains(name) {
                return true;
            }
            current = info.base.clone();
        }
        false
    }

    /// Whether `class` derives from a standard exception.
    fn is_exception_class(&self, class: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            if exception_type(&name).is_some() {
                return true;
            }
            if !seen.insert(name.clone()) {
                return false;
            }
            current = self.classes.get(&name).and_then(|info| info.base.clone());
        }
        false
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
        match (inferred, init) {
            // `let x = null` is assigned something else later.
            (TypeRef::Nullable(inner), _)
                if matches!(&*inner, TypeRef::Named { name, .. } if name == "object") =>
            {
                TypeRef::ANY
            }
            (list, Some(Node::ArrayExpression { elements }))
                if list.is_list() && list.element().is_none_or(TypeRef::is_any) =>
            {
                TypeRef::list(self.element_type(elements))
            }
            (other, _) => other,
        }
    }

    /// The element type shared by every item of an array literal.
    fn element_type(&self, elements: &[Option<Node>]) -> TypeRef {
        let mut types = elements.iter().map(|item| match item {
            Some(Node::SpreadElement { argument }) => {
                self.type_of(argument).and_then(|ty| ty.element().cloned())
            }
            Some(item) => self.type_of(item),
            None => None,
        });
        match types.next().flatten() {
            Some(first) if types.all(|ty| ty.as_ref() == Some(&first)) => first,
            _ => TypeRef::ANY,
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

    /// Lambda capture for the current position.
    pub(super) fn capture(&self) -> &'static str {
        if !self.scopes.is_empty() {
            "&"
        } else if matches!(self.receivers.last(), Some(Expr::Name(name)) if name == "this") {
            "this"
        } else {
            ""
        }
    }

    /// Element count as a signed integer.
    pub(super) fn length(&self, value: Expr) -> Expr {
        // A literal is a char array; its length is known in UTF-16 units.
        let literal = match &value {
            Expr::Str(text) => Some(text),
            Expr::Construct { ty, args } if ty == "std::string" => match args.as_slice() {
                [Expr::Str(text)] => Some(text),
                _ => None,
            },
            _ => None,
        };
        if let Some(text) = literal {
            return Expr::int(text.encode_utf16().count() as i64);
        }
        if self.options.standard.is_cpp20() {
            Expr::call_path("std::ssize", vec![value])
        } else {
            Expr::cast("int", value.method("size", Vec::new()))
        }
    }

    /// Key lookup on a map or set.
    pub(super) fn contains(&self, map: Expr, key: Expr) -> Expr {
        if self.options.standard.is_cpp20() {
            map.method("contains", vec![key])
        } else {
            Expr::bin(Op::Gt, map.method("count", vec![key]), Expr::int(0))
        }
    }

    /// `node` as a `std::string`.
    pub(super) fn stringify(&mut self, node: &Node) -> Expr {
        if self.is_stringy(node) {
            return self.expr(node);
        }
        let value = self.expr(node);
        Expr::call(self.helper(Helper::ToString), vec![value])
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
                            kind,
                            is_static,
                            computed: false,
                            ..
                        } => {
                            let Some(method) = key.property_name() else {
                                continue;
                            };
                            match kind {
                                MethodKind::Get => {
                                    info.getters.insert(method);
                                }
                                MethodKind::Set => {
                                    info.setters.insert(method);
                                }
                                MethodKind::Method if !is_static => {
                                    info.methods.insert(method);
                                }
                                _ => {}
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
        items: &mut Vec<Item>,
    ) {
        let main_started = items.iter().any(|item| matches!(item, Item::Statement(_)));
        let init = declarator.init.as_deref();
        let Node::Identifier(id) = declarator.id.as_ref() else {
            for binding in destructure::bindings(&declarator.id) {
                items.push(Item::Variable(Variable {
                    ty: "std::any".to_string(),
                    name: self.ident(&binding.name),
                    value: None,
                    is_const: false,
                }));
            }
            self.scopes.push(HashMap::new());
            let assignments = self.destructure(&declarator.id, init, false);
            self.scopes.pop();
            items.extend(assignments.into_iter().map(Item::Statement));
            return;
        };
        let name = self.ident(&id.name);
        if let Some(function) = init.and_then(Node::as_inline_function) {
            items.push(Item::Function(self.function(function, &name, Vec::new())));
            return;
        }
        let ty = self.globals.get(&id.name).cloned().unwrap_or(TypeRef::ANY);
        // Namespace-scope initializers run before `main`; once `main` has
        // statements, later initializers must wait their turn.
        let (value, deferred) = match init {
            Some(init) if main_started && !is_constant(init) => (None, Some(self.expr_as(init, &ty))),
            Some(init) => (Some(self.expr_as(init, &ty)), None),
            None => (None, None),
        };
        let spelled = match &value {
            Some(_) if ty.is_any() => "auto".to_string(),
            _ => self.ty(&ty),
        };
        let is_const = kind == DeclarationKind::Const
            && value.is_some()
            && ty.primitive().is_some_and(|p| p != Primitive::Any);
        items.push(Item::Variable(Variable {
            ty: spelled,
            name: name.clone(),
            value,
            is_const,
        }));
        if let Some(value) = deferred {
            items.push(Item::Statement(Stmt::Expr(Expr::assign(Expr::Name(name), value))));
        }
    }

    fn stubs(&self, items: &[Item]) -> Vec<ClassDecl> {
        if !self.options.framework_stubs {
            return Vec::new();
        }
        let defined: HashSet<&str> = items
            .iter()
            .filter_map(|item| match item {
                Item::Class(class) => Some(class.name.as_str()),
                _ => None,
            })
            .collect();
        let mut stubs: Vec<ClassDecl> = Vec::new();
        for item in items {
            let Item::Class(ClassDecl {
                base: Some(base), ..
            }) = item
            else {
                continue;
            };
            if defined.contains(base.as_str())
                || base.starts_with("std::")
                || stubs.iter().any(|stub| &stub.name == base)
            {
                continue;
            }
            stubs.push(ClassDecl {
                name: base.clone(),
                has_subclasses: true,
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
                vec![self.local_function(function.name().unwrap_or("_anonymous"), function)]
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
                Some(BreakTarget::Label(label)) => vec![Stmt::Goto(label.clone())],
                _ => vec![Stmt::Break],
            },
            Node::ContinueStatement {} => vec![Stmt::Continue],
            Node::ReturnStatement { argument } => {
                let value = argument.as_deref().map(|value| self.expr(value));
                vec![self.return_stmt(value)]
            }
            Node::ThrowStatement { argument } => vec![Stmt::Throw(Some(self.exception(argument)))],
            Node::TryStatement {
                block,
                handler,
                finalizer,
            } => self.try_statement(block, handler.as_ref(), finalizer.as_deref()),
            Node::Unknown { kind } => {
                self.unknown_kind(kind);
                vec![Stmt::Placeholder(kind.clone())]
            }
            expression @ retarget_il::expression_kinds!() => self.expression_statement(expression),
        }
    }

    fn return_stmt(&self, value: Option<Expr>) -> Stmt {
        if self.coroutine {
            Stmt::CoReturn(value.unwrap_or_else(|| Expr::init("std::any", Vec::new())))
        } else {
            Stmt::Return(value)
        }
    }

    /// A nested function becomes a lambda bound to a local.
    fn local_function(&mut self, raw: &str, function: &il::Function) -> Stmt {
        self.declare(raw, TypeRef::ANY);
        if function.body.any(&mut |node| node.as_identifier() == Some(raw)) {
            let what = self.unsupported(format!("recursive local function {raw}"));
            return Stmt::Placeholder(placeholder_text(&what));
        }
        Stmt::Local {
            ty: "auto".to_string(),
            name: self.ident(raw),
            value: Some(self.lambda(function)),
        }
    }

    fn declarator(&mut self, declarator: &VariableDeclarator) -> Vec<Stmt> {
        let init = declarator.init.as_deref();
        let Node::Identifier(id) = declarator.id.as_ref() else {
            return self.destructure(&declarator.id, init, true);
        };
        if let Some(function) = init.and_then(Node::as_inline_function) {
            return vec![self.local_function(&id.name, function)];
        }
        let annotation = declarator
            .result_type
            .as_deref()
            .or(id.result_type.as_deref());
        let ty = self.binding_type(&id.name, annotation, init);
        let value = init.map(|init| self.expr_as(init, &ty));
        self.declare(&id.name, ty.clone());
        let spelled = match &value {
            Some(_) if ty.is_any() => "auto".to_string(),
            _ => self.ty(&ty),
        };
        vec![Stmt::Local {
            ty: spelled,
            name: self.ident(&id.name),
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
                        ty: "std::any".to_string(),
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
                ty: "auto".to_string(),
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
            let mut parent = None;
            for access in &binding.path {
                let container = value.clone();
                value = match access {
                    Access::Index(i) => value.index(Expr::int(*i as i64)),
                    Access::Key(key) => value.index(Expr::Str(key.clone())),
                    Access::RestFrom(i) => {
                        Expr::call(self.helper(Helper::Slice), vec![value, Expr::int(*i as i64)])
                    }
                };
                parent = Some((container, access));
            }
            if let (Some(default), Some((container, access))) = (binding.default, parent) {
                let present = match access {
                    Access::Index(i) => Some(Expr::bin(Op::Lt, Expr::int(*i as i64), self.length(container))),
                    Access::Key(key) => Some(self.contains(container, Expr::Str(key.clone()))),
                    Access::RestFrom(_) => None,
                };
                if let Some(present) = present {
                    let fallback = self.expr(default);
                    value = Expr::conditional(present, value, fallback);
                }
            }
            let name = self.ident(&binding.name);
            if declare {
                self.declare(&binding.name, TypeRef::ANY);
                out.push(Stmt::Local {
                    ty: "auto".to_string(),
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
                vec![Stmt::Expr(list.method("resize", vec![length]))]
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
                    vec![Stmt::Expr(object.method("erase", vec![key]))]
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
                let test = match operator {
                    LogicalOperator::And => self.condition(left),
                    LogicalOperator::Or => Expr::unary(UnaryOp::Not, self.condition(left)),
                    LogicalOperator::Coalesce => self.null_test(Op::Eq, left),
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
        // One declaration statement may declare several names of one type.
        let inline = match init.as_slice() {
            [] | [Stmt::Expr(_)] => true,
            [Stmt::Local { ty, .. }, rest @ ..] => rest
                .iter()
                .all(|stmt| matches!(stmt, Stmt::Local { ty: other, value: Some(_), .. } if other == ty && ty != "auto")),
            _ => false,
        };
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
        let indexed = keys
            && source_type
                .as_ref()
                .is_some_and(|ty| ty.is_list() || ty.is_array() || ty.is_string());
        if indexed {
            return self.index_loop(left, right, body);
        }
        let pairs = source_type.as_ref().is_some_and(TypeRef::is_map)
            || matches!(right, Node::MapEntries { .. });
        let mut collection = self.expr(right);
        let element = if keys {
            TypeRef::STRING
        } else if source_type.as_ref().is_some_and(TypeRef::is_string) {
            collection = Expr::call(self.helper(Helper::Chars), vec![collection]);
            TypeRef::STRING
        } else {
            source_type
                .as_ref()
                .and_then(|ty| ty.element().cloned())
                .unwrap_or(TypeRef::ANY)
        };

        let mut prologue = Vec::new();
        let target = match left {
            Node::VariableDeclaration { declarations, .. } => {
                declarations.first().map(|declarator| declarator.id.as_ref())
            }
            _ => None,
        };
        let (ty, name) = match target {
            Some(Node::Identifier(id)) if keys => {
                self.declare(&id.name, TypeRef::STRING);
                let value = self.temp("_value");
                ("const auto&", format!("[{}, {value}]", self.ident(&id.name)))
            }
            Some(Node::Identifier(id)) => {
                self.declare(&id.name, element.clone());
                ("auto", self.ident(&id.name))
            }
            Some(Node::ArrayPattern { elements }) if pairs && structured(elements) => {
                let names: Vec<String> = elements
                    .iter()
                    .flatten()
                    .filter_map(Node::as_identifier)
                    .map(|name| {
                        self.declare(name, TypeRef::ANY);
                        self.ident(name)
                    })
                    .collect();
                ("auto", format!("[{}]", names.join(", ")))
            }
            Some(pattern) => {
                let temp = self.temp("_item");
                prologue = self.bind_pattern(pattern, Expr::name(&temp), true);
                ("auto", temp)
            }
            None => {
                let temp = self.temp("_item");
                if !matches!(left, Node::VariableDeclaration { .. }) {
                    let target = self.expr(left);
                    prologue.push(Stmt::Expr(Expr::assign(target, Expr::name(&temp))));
                }
                let ty = if keys { "const auto&" } else { "auto" };
                let name = if keys {
                    let value = self.temp("_value");
                    format!("[{temp}, {value}]")
                } else {
                    temp
                };
                (ty, name)
            }
        };
        prologue.extend(self.looped(body));
        vec![Stmt::ForEach {
            ty: ty.to_string(),
            name,
            iter: collection,
            body: prologue,
        }]
    }

    /// `for (k in list)` counts indices.
    fn index_loop(&mut self, left: &Node, right: &Node, body: &Node) -> Vec<Stmt> {
        let name = match left {
            Node::VariableDeclaration { declarations, .. } => declarations
                .first()
                .and_then(|declarator| declarator.id.as_identifier())
                .map(str::to_string),
            _ => None,
        };
        let mut prologue = Vec::new();
        let index = match &name {
            Some(name) => {
                self.declare(name, TypeRef::INT);
                self.ident(name)
            }
            None => {
                let temp = self.temp("_i");
                if !matches!(left, Node::VariableDeclaration { .. }) {
                    let target = self.expr(left);
                    prologue.push(Stmt::Expr(Expr::assign(target, Expr::name(&temp))));
                }
                temp
            }
        };
        let collection = self.expr(right);
        prologue.extend(self.looped(body));
        vec![Stmt::For {
            init: vec![Stmt::Local {
                ty: "int".to_string(),
                name: index.clone(),
                value: Some(Expr::int(0)),
            }],
            test: Some(Expr::bin(Op::Lt, Expr::name(&index), self.length(collection))),
            update: vec![Expr::unary(UnaryOp::PreIncrement, Expr::name(&index))],
            body: prologue,
        }]
    }

    /// A native `switch` for integer labels; an `if` chain otherwise.
    fn switch(&mut self, discriminant: &Node, cases: &[SwitchCase]) -> Vec<Stmt> {
        let groups = lower::switch_groups(cases);
        let integral = self
            .type_of(discriminant)
            .is_none_or(|ty| ty.primitive().is_some_and(Primitive::is_integer));
        let constant = integral
            && groups
                .iter()
                .flat_map(|group| group.tests.iter())
                .all(|test| int_constant(test).is_some());
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
                ty: "auto".to_string(),
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
            let tests: Vec<Expr> = group
                .tests
                .iter()
                .map(|test| {
                    let test = self.expr(test);
                    Expr::bin(Op::Eq, subject.clone(), test)
                })
                .collect();
            if let Some(test) = tests.into_iter().reduce(|acc, test| Expr::bin(Op::Or, acc, test)) {
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
            subject = Expr::cast("int", subject);
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
            let falls_through = group.falls_through && i + 1 < groups.len();
            if !falls_through && !body.last().is_some_and(is_exit) {
                body.push(Stmt::Break);
            }
            sections.push(SwitchSection {
                labels,
                body,
                falls_through,
            });
        }
        self.breaks.pop();
        vec![Stmt::Switch { subject, sections }]
    }

    fn try_statement(
        &mut self,
        block: &Node,
        handler: Option<&il::CatchClause>,
        finalizer: Option<&Node>,
    ) -> Vec<Stmt> {
        let body = self.body(block);
        let catch = handler.map(|clause| {
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
                ty: Some("const std::exception&".to_string()),
                name,
                body: prologue,
            }
        });
        let finally = match finalizer {
            Some(finalizer) => self.body(finalizer),
            None => Vec::new(),
        };
        let guarded = match catch {
            Some(catch) => vec![Stmt::Try {
                body,
                catches: vec![catch],
            }],
            None if finally.is_empty() => return vec![Stmt::Block(body)],
            None => body,
        };
        if finally.is_empty() {
            return guarded;
        }
        // No `finally` in C++: run it on the way out of a throw, then after
        // normal completion.
        let mut rethrow = finally.clone();
        rethrow.push(Stmt::Throw(None));
        let mut out = vec![Stmt::Try {
            body: guarded,
            catches: vec![Catch {
                ty: None,
                name: None,
                body: rethrow,
            }],
        }];
        if finally.iter().any(|stmt| matches!(stmt, Stmt::Local { .. })) {
            out.push(Stmt::Block(finally));
        } else {
            out.extend(finally);
        }
        out
    }

    /// The operand of `throw`. Exceptions are thrown by value.
    fn exception(&mut self, node: &Node) -> Expr {
        if self.is_stringy(node) {
            let message = self.expr(node);
            return Expr::construct("std::runtime_error", vec![message]);
        }
        if let Node::NewExpression { callee, arguments } = node
            && let Some(name) = callee.as_identifier()
            && self.is_exception_class(name)
        {
            let mut args = self.arguments(arguments);
            if args.is_empty() {
                args.push(Expr::Str(String::new()));
            }
            let ty = exception_type(name)
                .map(str::to_string)
                .unwrap_or_else(|| self.ident(name));
            return Expr::construct(&ty, args);
        }
        let pointer = self
            .class_of(node)
            .is_some_and(|class| self.is_exception_class(&class));
        let value = self.expr(node);
        if pointer {
            Expr::unary(UnaryOp::Deref, value)
        } else {
            value
        }
    }

    /// A test expression.
    pub(super) fn condition(&mut self, node: &Node) -> Expr {
        let ty = self.type_of(node);
        let value = self.expr(node);
        match ty {
            Some(ty) if ty.is_string() => Expr::unary(UnaryOp::Not, value.method("empty", Vec::new())),
            Some(ty) if is_container(&ty) && value.is_simple() => Expr::literal("true"),
            _ => value,
        }
    }

    /// `node == null` or `node != null`, spelled for the value's type.
    fn null_test(&mut self, op: Op, node: &Node) -> Expr {
        let ty = self.type_of(node);
        let value = self.expr(node);
        let null = match &ty {
            Some(TypeRef::Nullable(inner)) if class_name(inner).is_none() => Expr::name("std::nullopt"),
            Some(ty) if (ty.primitive().is_some() || is_container(ty)) && value.is_simple() => {
                return Expr::literal(if op == Op::Eq { "false" } else { "true" });
            }
            _ => Expr::null(),
        };
        Expr::bin(op, value, null)
    }

    // ------------------------------------------------------------- functions

    pub(super) fn function(
        &mut self,
        function: &il::Function,
        name: &str,
        specifiers: Vec<&'static str>,
    ) -> Function {
        self.scopes.push(HashMap::new());
        let outer_breaks = std::mem::take(&mut self.breaks);
        let coroutine = self.options.use_coroutines && lower::awaits(function);
        let outer_coroutine = std::mem::replace(&mut self.coroutine, coroutine);
        let mut prologue = Vec::new();
        let params = function
            .params
            .iter()
            .map(|param| self.param(param, function, &mut prologue))
            .collect();
        let mut body = prologue;
        if function.expression {
            let value = self.expr(&function.body);
            body.push(self.return_stmt(Some(value)));
        } else {
            body.extend(self.block(function.body_statements()));
        }
        let mut returns = self.return_type(function);
        self.coroutine = outer_coroutine;
        self.breaks = outer_breaks;
        self.scopes.pop();

        if coroutine {
            returns = Helper::Task.path().to_string();
            self.require(Helper::Task);
            if !matches!(body.last(), Some(Stmt::CoReturn(_))) {
                body.push(Stmt::CoReturn(Expr::init("std::any", Vec::new())));
            }
        }
        Function {
            specifiers,
            returns,
            name: name.to_string(),
            params,
            qualifiers: Vec::new(),
            body,
            doc: self.doc(function.docs.as_deref()),
        }
    }

    fn return_type(&self, function: &il::Function) -> String {
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
            _ => "auto".to_string(),
        }
    }

    /// Untyped parameters are generic where the standard allows it.
    fn generic_param(&self) -> String {
        if self.options.standard.is_cpp20() {
            "auto".to_string()
        } else {
            "std::any".to_string()
        }
    }

    /// Containers the body changes in place are taken by reference, the
    /// rest by const reference. Strings and scalars are copied.
    fn param_type(&self, ty: &TypeRef, name: &str, function: &il::Function) -> String {
        if ty.is_any() {
            return self.generic_param();
        }
        let spelled = self.ty(ty);
        if !is_container(ty) {
            return spelled;
        }
        if mutates(&function.body, name) {
            format!("{spelled}&")
        } else if ty.is_map() {
            // `operator[]` is non-const.
            spelled
        } else {
            format!("const {spelled}&")
        }
    }

    fn param(&mut self, param: &Node, function: &il::Function, prologue: &mut Vec<Stmt>) -> Param {
        match param {
            Node::Identifier(id) => {
                let ty = match id.result_type.as_deref() {
                    Some(annotation) => parse_il_type(annotation),
                    None => name_hint(&id.name).unwrap_or(TypeRef::ANY),
                };
                self.declare(&id.name, ty.clone());
                Param {
                    ty: self.param_type(&ty, &id.name, function),
                    name: self.ident(&id.name),
                    default: None,
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
                let default = self.expr_as(right, &ty);
                self.declare(&id.name, ty.clone());
                // A defaulted parameter is copied; a temporary cannot bind
                // to a mutable reference.
                Param {
                    ty: self.ty(&ty),
                    name: self.ident(&id.name),
                    default: Some(default),
                }
            }
            Node::RestElement { argument } if matches!(argument.as_ref(), Node::Identifier(_)) => {
                let name = argument.as_identifier().unwrap_or("rest");
                let ty = TypeRef::list(TypeRef::ANY);
                self.declare(name, ty.clone());
                Param {
                    ty: self.ty(&ty),
                    name: self.ident(name),
                    default: None,
                }
            }
            pattern => self.pattern_param(pattern, prologue),
        }
    }

    fn pattern_param(&mut self, pattern: &Node, prologue: &mut Vec<Stmt>) -> Param {
        let name = self.temp("_arg");
        let pattern = match pattern {
            Node::RestElement { argument } => argument.as_ref(),
            other => other,
        };
        prologue.extend(self.bind_pattern(pattern, Expr::name(&name), true));
        Param {
            ty: self.generic_param(),
            name,
            default: None,
        }
    }

    /// A function in expression position.
    pub(super) fn lambda(&mut self, function: &il::Function) -> Expr {
        let capture = self.capture();
        self.scopes.push(HashMap::new());
        let outer_breaks = std::mem::take(&mut self.breaks);
        let outer_coroutine = std::mem::replace(&mut self.coroutine, false);
        let mut prologue = Vec::new();
        let mut params = Vec::new();
        for param in &function.params {
            match param {
                Node::Identifier(id) => {
                    let ty = id.result_type.as_deref().map(parse_il_type);
                    self.declare(&id.name, ty.clone().unwrap_or(TypeRef::ANY));
                    params.push(Param {
                        ty: ty
                            .filter(|ty| !ty.is_any())
                            .map(|ty| self.ty(&ty))
                            .unwrap_or_else(|| "auto".to_string()),
                        name: self.ident(&id.name),
                        default: None,
                    });
                }
                pattern => {
                    let temp = self.temp("_arg");
                    prologue.extend(self.bind_pattern(pattern, Expr::name(&temp), true));
                    params.push(Param {
                        ty: "auto".to_string(),
                        name: temp,
                        default: None,
                    });
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
        self.coroutine = outer_coroutine;
        self.breaks = outer_breaks;
        self.scopes.pop();
        Expr::Lambda {
            capture,
            params,
            body,
        }
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

    fn base_spelling(&self, base: &str) -> String {
        exception_type(base)
            .map(str::to_string)
            .unwrap_or_else(|| self.ident(base))
    }

    fn class_decl(&mut self, class: &il::Class) -> ClassDecl {
        let raw_name = class.name().unwrap_or("_Anonymous").to_string();
        let name = self.ident(&raw_name);
        let base = match class.super_class.as_deref() {
            Some(base) => match base.as_identifier() {
                Some(base) => Some(self.base_spelling(base)),
                None => {
                    self.unsupported("class extending an expression");
                    None
                }
            },
            None => None,
        };
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
            members.push(Member::Field {
                is_static: field.is_static,
                ty: self.ty(&ty),
                name: self.ident(&field.name),
                value: None,
            });
        }

        let mut constructor = None;
        let mut static_body: Option<usize> = None;
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
                    self.receivers.push(if *is_static {
                        Expr::name(&name)
                    } else {
                        Expr::name("this")
                    });
                    let value = value.as_deref().map(|value| self.expr_as(value, &ty));
                    self.receivers.pop();
                    let spelled = match &value {
                        Some(_) if ty.is_any() && *is_static => "auto".to_string(),
                        _ => self.ty(&ty),
                    };
                    members.push(Member::Field {
                        is_static: *is_static,
                        ty: spelled,
                        name: self.ident(&field),
                        value,
                    });
                }
                ClassMember::MethodDefinition {
                    kind: MethodKind::Constructor,
                    ..
                } => {
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
                    self.receivers.push(if *is_static {
                        Expr::name(&name)
                    } else {
                        Expr::name("this")
                    });
                    let spelled = match kind {
                        MethodKind::Get => format!("get_{method}"),
                        MethodKind::Set => format!("set_{method}"),
                        _ => method.clone(),
                    };
                    let spelled = self.ident(&spelled);
                    let specifiers = if *is_static { vec!["static"] } else { Vec::new() };
                    let mut lowered = self.function(value, &spelled, specifiers);
                    if !is_static && *kind == MethodKind::Method && lowered.has_prototype() {
                        if self.inherits_method(&raw_name, &method) {
                            lowered.qualifiers.push("override");
                        } else if self.is_overridden(&raw_name, &method) {
                            lowered.specifiers.push("virtual");
                        }
                    }
                    members.push(Member::Method(lowered));
                    self.receivers.pop();
                }
                ClassMember::StaticBlock { body } => {
                    self.receivers.push(Expr::name(&name));
                    self.scopes.push(HashMap::new());
                    let lowered = self.block(body);
                    self.scopes.pop();
                    self.receivers.pop();
                    match static_body {
                        Some(at) => {
                            if let Member::StaticInit { body, .. } = &mut members[at] {
                                body.extend(lowered);
                            }
                        }
                        None => {
                            static_body = Some(members.len());
                            members.push(Member::StaticInit {
                                name: format!("{name}_static_init"),
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
            Some(function) => Some(self.constructor(&name, function, base.as_deref())),
            None => base.as_deref().map(|base| {
                let short = base.rsplit("::").next().unwrap_or(base);
                Member::InheritConstructors(format!("{base}::{short}"))
            }),
        };
        match (constructor, ctor) {
            (Some(at), Some(ctor)) => members[at] = ctor,
            (None, Some(ctor)) => members.insert(0, ctor),
            _ => {}
        }

        self.scopes = outer_scopes;
        self.current_class = outer_class;
        let has_subclasses = self
            .classes
            .values()
            .any(|info| info.base.as_deref() == Some(raw_name.as_str()));
        ClassDecl {
            name,
            base,
            members,
            doc: self.doc(class.docs.as_deref()),
            has_subclasses,
        }
    }

    fn constructor(&mut self, name: &str, function: &il::Function, base: Option<&str>) -> Member {
        self.receivers.push(Expr::name("this"));
        self.scopes.push(HashMap::new());
        let mut prologue = Vec::new();
        let params = function
            .params
            .iter()
            .map(|param| self.param(param, function, &mut prologue))
            .collect();
        let (super_args, rest) = lower::split_super_call(function.body_statements());
        let base_args = match (super_args, base) {
            (Some(args), Some(_)) => Some(self.arguments(args)),
            // Standard exceptions have no default constructor.
            (None, Some(base)) if base.starts_with("std::") => Some(vec![Expr::Str(String::new())]),
            _ => None,
        };
        let mut body = prologue;
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

    // ----------------------------------------------------------- expressions

    pub(super) fn arguments(&mut self, arguments: &[Node]) -> Vec<Expr> {
        arguments
            .iter()
            .map(|argument| match argument {
                Node::SpreadElement { .. } => self.unsupported("spread argument"),
                other => match other.as_inline_function() {
                    Some(function) => self.lambda(function),
                    None => self.expr(other),
                },
            })
            .collect()
    }

    /// Lower `node` for a slot of type `ty`, shaping literals to match.
    pub(super) fn expr_as(&mut self, node: &Node, ty: &TypeRef) -> Expr {
        if is_nullish(node) {
            return match ty {
                TypeRef::Nullable(inner) if class_name(inner).is_none() => Expr::name("std::nullopt"),
                _ if class_name(ty).is_some() => Expr::null(),
                _ => Expr::init(&self.ty(ty), Vec::new()),
            };
        }
        match node {
            Node::ArrayExpression { elements } if ty.is_list() || ty.is_array() => {
                let element = match ty.element() {
                    Some(element) if !element.is_any() => element.clone(),
                    _ => self.element_type(elements),
                };
                self.list_literal(elements, &element)
            }
            Node::ObjectExpression { properties } if ty.is_map() => self.dictionary(properties, ty),
            _ => {
                let value = self.expr(node);
                let target = ty.primitive().filter(|p| p.is_numeric());
                let source = self.type_of(node).and_then(|t| t.primitive());
                match (target, source) {
                    (Some(target), Some(source))
                        if source.is_numeric() && source != target && !is_constant(node) =>
                    {
                        Expr::cast(&self.ty(ty), value)
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
            // Spreads concatenate; plain items travel as one-element vectors.
            let mut parts = Vec::new();
            for item in elements.iter().flatten() {
                parts.push(match item {
                    Node::SpreadElement { argument } => self.expr(argument),
                    other => {
                        let value = self.expr_as(other, element);
                        Expr::init(&ty, vec![value])
                    }
                });
            }
            if parts.is_empty() {
                return Expr::init(&ty, Vec::new());
            }
            return Expr::call(self.helper(Helper::Concat), parts);
        }
        let items: Vec<Expr> = elements
            .iter()
            .map(|item| match item {
                Some(item) => self.expr_as(item, element),
                None => Expr::init(&self.ty(element), Vec::new()),
            })
            .collect();
        Expr::init(&ty, items)
    }

    pub(super) fn dictionary(&mut self, properties: &[Node], ty: &TypeRef) -> Expr {
        let value_type = match ty {
            TypeRef::Named { args, .. } => args.get(1).cloned().unwrap_or(TypeRef::ANY),
            _ => TypeRef::ANY,
        };
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
                        Some(function) => self.lambda(function),
                        None => self.expr_as(value, &value_type),
                    };
                    entries.push(Expr::init("", vec![key, value]));
                }
                other => {
                    let what = self.unsupported(format!("{} in object literal", other.kind()));
                    entries.push(what);
                }
            }
        }
        Expr::init(&self.ty(ty), entries)
    }

    pub(super) fn expr(&mut self, node: &Node) -> Expr {
        match node {
            Node::Literal(literal) => literal_expr(literal),
            Node::TemplateLiteral {
                quasis,
                expressions,
            } => self.template(quasis, expressions),
            Node::Identifier(id) => self.identifier(&id.name),
            Node::ThisExpression {} => self.receiver(),
            Node::Super {} => self.unsupported("super as a value"),
            Node::BinaryExpression {
                operator,
                left,
                right,
            } => self.binary(*operator, left, right),
            Node::LogicalExpression {
                operator,
                left,
                right,
            } => match operator {
                LogicalOperator::Or
                    if is_default_value(right) && self.type_of(left) != Some(TypeRef::BOOL) =>
                {
                    let ty = self.type_of(left).unwrap_or(TypeRef::ANY);
                    let test = self.condition(left);
                    let value = self.expr(left);
                    let fallback = self.expr_as(right, &ty);
                    Expr::conditional(test, value, fallback)
                }
                LogicalOperator::Coalesce => self.coalesce(left, right),
                other => {
                    let left = self.condition(left);
                    Expr::bin(Op::from_logical(*other), left, self.condition(right))
                }
            },
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
                let ty = self.type_of(consequent).unwrap_or(TypeRef::ANY);
                let test = self.condition(test);
                let then = self.expr(consequent);
                let otherwise = self.expr_as(alternate, &ty);
                Expr::conditional(test, then, otherwise)
            }
            Node::ArrayExpression { elements } => {
                let element = self.element_type(elements);
                self.list_literal(elements, &element)
            }
            Node::ObjectExpression { properties } => {
                self.dictionary(properties, &TypeRef::map(TypeRef::STRING, TypeRef::ANY))
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
                if self.coroutine {
                    Expr::Await(Box::new(value))
                } else if self.options.use_coroutines {
                    value.method("await_resume", Vec::new())
                } else {
                    value
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

    /// `std::format` under C++20, string concatenation before.
    fn template(&mut self, quasis: &[TemplateElement], expressions: &[Node]) -> Expr {
        if expressions.is_empty() {
            let text: String = quasis.iter().map(TemplateElement::text).collect();
            return Expr::construct("std::string", vec![Expr::Str(text)]);
        }
        if self.options.standard.is_cpp20() {
            let mut format = String::new();
            let mut args = Vec::new();
            for (i, quasi) in quasis.iter().enumerate() {
                format.push_str(&quasi.text().replace('{', "{{").replace('}', "}}"));
                if let Some(expression) = expressions.get(i) {
                    format.push_str("{}");
                    let printable = self.type_of(expression).is_some_and(|ty| {
                        ty.is_string() || ty.primitive().is_some_and(|p| p.is_numeric() || p == Primitive::Bool)
                    });
                    args.push(if printable {
                        self.expr(expression)
                    } else {
                        self.stringify(expression)
                    });
                }
            }
            args.insert(0, Expr::Str(format));
            return Expr::call_path("std::format", args);
        }
        let mut parts = Vec::new();
        for (i, quasi) in quasis.iter().enumerate() {
            if !quasi.text().is_empty() {
                parts.push(Expr::Str(quasi.text().to_string()));
            }
            if let Some(expression) = expressions.get(i) {
                parts.push(self.stringify(expression));
            }
        }
        let mut parts = parts.into_iter();
        let first = match parts.next() {
            Some(Expr::Str(text)) => Expr::construct("std::string", vec![Expr::Str(text)]),
            Some(other) => other,
            None => Expr::construct("std::string", Vec::new()),
        };
        parts.fold(first, |acc, part| Expr::bin(Op::Add, acc, part))
    }

    fn identifier(&mut self, name: &str) -> Expr {
        match name {
            "undefined" => Expr::init("std::any", Vec::new()),
            "NaN" => Expr::call_path("std::numeric_limits<double>::quiet_NaN", Vec::new()),
            "Infinity" => Expr::call_path("std::numeric_limits<double>::infinity", Vec::new()),
            _ => Expr::Name(self.ident(name)),
        }
    }

    fn binary(&mut self, operator: BinaryOperator, left: &Node, right: &Node) -> Expr {
        match operator {
            BinaryOperator::Eq | BinaryOperator::StrictEq | BinaryOperator::Ne | BinaryOperator::StrictNe
                if is_nullish(left) || is_nullish(right) =>
            {
                let op = if matches!(operator, BinaryOperator::Eq | BinaryOperator::StrictEq) {
                    Op::Eq
                } else {
                    Op::Ne
                };
                let value = if is_nullish(right) { left } else { right };
                self.null_test(op, value)
            }
            BinaryOperator::Add if self.is_stringy(left) || self.is_stringy(right) => {
                let left = match left.as_string_literal() {
                    Some(text) => Expr::construct("std::string", vec![Expr::Str(text.to_string())]),
                    None => self.stringify(left),
                };
                let right = match right.as_string_literal() {
                    Some(text) => Expr::Str(text.to_string()),
                    None => self.stringify(right),
                };
                Expr::bin(Op::Add, left, right)
            }
            BinaryOperator::Pow => {
                let args = vec![self.expr(left), self.expr(right)];
                Expr::call_path("std::pow", args)
            }
            BinaryOperator::In => {
                let key = self.expr(left);
                let map = self.expr(right);
                self.contains(map, key)
            }
            BinaryOperator::InstanceOf => self.instance_of(left, right),
            BinaryOperator::UShr if int_literal(right) == Some(0) => {
                let value = self.expr(left);
                Expr::cast("uint32_t", value)
            }
            BinaryOperator::UShr => {
                let value = Expr::cast("uint32_t", self.expr(left));
                Expr::bin(Op::Shr, value, self.expr(right))
            }
            BinaryOperator::BitOr if int_literal(right) == Some(0) => {
                let value = self.expr(left);
                Expr::cast("int32_t", value)
            }
            BinaryOperator::Div if self.is_integer(left) && self.is_integer(right) => {
                let dividend = Expr::cast("double", self.expr(left));
                Expr::bin(Op::Div, dividend, self.expr(right))
            }
            BinaryOperator::Mod if self.is_float(left) || self.is_float(right) => {
                let args = vec![self.expr(left), self.expr(right)];
                Expr::call_path("std::fmod", args)
            }
            other => {
                let left = self.expr(left);
                let right = self.expr(right);
                match Op::from_binary(other) {
                    Some(op) => Expr::bin(op, left, right),
                    None => self.unsupported(format!("operator {}", other.as_str())),
                }
            }
        }
    }

    fn is_float(&self, node: &Node) -> bool {
        self.type_of(node)
            .and_then(|ty| ty.primitive())
            .is_some_and(|p| matches!(p, Primitive::Float32 | Primitive::Float64))
    }

    fn instance_of(&mut self, left: &Node, right: &Node) -> Expr {
        let Some(name) = right.as_identifier() else {
            return self.unsupported("instanceof with a computed type");
        };
        let caught = self
            .type_of(left)
            .is_some_and(|ty| matches!(&ty, TypeRef::Named { name, .. } if name == "Exception"));
        let value = self.expr(left);
        if caught {
            let target = exception_type(name)
                .map(str::to_string)
                .unwrap_or_else(|| self.ident(name));
            let cast = Expr::call_path(
                &format!("dynamic_cast<const {target}*>"),
                vec![Expr::unary(UnaryOp::AddressOf, value)],
            );
            return Expr::bin(Op::Ne, cast, Expr::null());
        }
        let cast = Expr::call_path(&format!("std::dynamic_pointer_cast<{}>", self.ident(name)), vec![value]);
        Expr::bin(Op::Ne, cast, Expr::null())
    }

    /// `left ?? right`, spelled for the left operand's type.
    fn coalesce(&mut self, left: &Node, right: &Node) -> Expr {
        match self.type_of(left) {
            Some(TypeRef::Nullable(inner)) if class_name(&inner).is_none() => {
                let value = self.expr(left);
                let fallback = self.expr_as(right, &inner);
                value.method("value_or", vec![fallback])
            }
            Some(ty) if ty.primitive().is_some() || is_container(&ty) => self.expr(left),
            _ => {
                let value = self.expr(left);
                let fallback = self.expr(right);
                Expr::conditional(value.clone(), value, fallback)
            }
        }
    }

    fn unary(&mut self, operator: UnaryOperator, argument: &Node) -> Expr {
        let op = match operator {
            UnaryOperator::Neg => UnaryOp::Neg,
            UnaryOperator::Plus => UnaryOp::Plus,
            UnaryOperator::Not => UnaryOp::Not,
            UnaryOperator::BitNot => UnaryOp::BitNot,
            UnaryOperator::TypeOf => return self.unsupported("typeof"),
            UnaryOperator::Void => return Expr::init("std::any", Vec::new()),
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
        if let Node::MemberExpression {
            object,
            property,
            computed: false,
        } = left
            && let Some(name) = property.property_name()
            && let Some(class) = self.accessor_class(object)
            && self.has_accessor(&class, &name, true)
        {
            let value = match operator.compound() {
                None => self.expr(right),
                Some(CompoundOperator::Binary(operator)) => {
                    let current = self.expr(left);
                    let value = self.expr(right);
                    match Op::from_binary(operator) {
                        Some(op) => Expr::bin(op, current, value),
                        None => return self.unsupported(format!("{}= on a setter", operator.as_str())),
                    }
                }
                Some(CompoundOperator::Logical(_)) => {
                    return self.unsupported("logical assignment through a setter");
                }
            };
            let setter = self.member_access(object, &format!("set_{name}"));
            return Expr::call(setter, vec![value]);
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
                let power = Expr::call_path("std::pow", vec![target.clone(), value]);
                Expr::assign(target, power)
            }
            Some(CompoundOperator::Binary(BinaryOperator::UShr)) => {
                let value = self.expr(right);
                let shifted = Expr::bin(Op::Shr, Expr::cast("uint32_t", target.clone()), value);
                Expr::assign(target, shifted)
            }
            Some(CompoundOperator::Binary(BinaryOperator::Add))
                if self.is_stringy(left) && !self.is_stringy(right) =>
            {
                let value = self.stringify(right);
                Expr::Assign {
                    op: Some(Op::Add),
                    target: Box::new(target),
                    value: Box::new(value),
                }
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
            Some(CompoundOperator::Logical(LogicalOperator::Coalesce)) => {
                let value = self.coalesce(left, right);
                Expr::assign(target, value)
            }
            Some(CompoundOperator::Logical(operator)) => {
                let current = self.condition(left);
                let value = self.condition(right);
                Expr::assign(target, Expr::bin(Op::from_logical(operator), current, value))
            }
        }
    }

    /// The class whose accessors `object.name` may call.
    fn accessor_class(&self, object: &Node) -> Option<String> {
        self.class_of(object)
    }

    /// `object.name` as member access, before any getter or map lookup.
    fn member_access(&mut self, object: &Node, name: &str) -> Expr {
        let spelled = self.ident(name);
        match object {
            Node::Super {} => {
                let base = self
                    .current_class
                    .as_ref()
                    .and_then(|class| self.classes.get(class))
                    .and_then(|info| info.base.clone());
                match base {
                    Some(base) => Expr::Name(format!("{}::{spelled}", self.base_spelling(&base))),
                    None => self.unsupported("super outside a subclass"),
                }
            }
            Node::ThisExpression {} => match self.receiver() {
                Expr::Name(receiver) if receiver != "this" => {
                    Expr::Name(format!("{receiver}::{spelled}"))
                }
                receiver => receiver.arrow(&spelled),
            },
            Node::Identifier(id) if !self.is_local(&id.name) && self.classes.contains_key(&id.name) => {
                Expr::Name(format!("{}::{spelled}", self.ident(&id.name)))
            }
            other => {
                let pointer = self.class_of(other).is_some();
                let value = self.expr(other);
                if pointer {
                    value.arrow(&spelled)
                } else {
                    value.dot(&spelled)
                }
            }
        }
    }

    fn member(&mut self, object: &Node, property: &Node, computed: bool) -> Expr {
        if computed {
            let stringy = self.type_of(object).is_some_and(|ty| ty.is_string());
            let index = self.expr(property);
            let value = self.expr(object).index(index);
            if stringy {
                return Expr::construct("std::string", vec![Expr::int(1), value]);
            }
            return value;
        }
        let Some(name) = property.property_name() else {
            return self.unsupported("member without a name");
        };
        if let Some(global) = object.as_identifier()
            && !self.is_local(global)
            && let Some(constant) = self.global_constant(global, &name)
        {
            return constant;
        }
        if let Some(class) = self.accessor_class(object)
            && self.has_accessor(&class, &name, false)
        {
            let getter = self.member_access(object, &format!("get_{name}"));
            return Expr::call(getter, Vec::new());
        }
        let object_type = self.type_of(object);
        match object_type {
            Some(ty) if ty.is_map() => {
                let value = self.expr(object);
                value.index(Expr::Str(name))
            }
            Some(TypeRef::Named { name: class, .. }) if class == "Exception" && name == "message" => {
                let value = self.expr(object);
                Expr::construct("std::string", vec![value.method("what", Vec::new())])
            }
            _ if name == "length" && !matches!(object, Node::ThisExpression {}) => {
                let value = self.expr(object);
                self.length(value)
            }
            _ => self.member_access(object, &name),
        }
    }

    /// `Math.PI`-style members of JS globals.
    fn global_constant(&self, global: &str, name: &str) -> Option<Expr> {
        let cpp20 = self.options.standard.is_cpp20();
        let limit = |what: &str| {
            Expr::call_path(&format!("std::numeric_limits<double>::{what}"), Vec::new())
        };
        Some(match (global, name) {
            ("Math", "PI") if cpp20 => Expr::name("std::numbers::pi"),
            ("Math", "E") if cpp20 => Expr::name("std::numbers::e"),
            ("Math", "LN2") if cpp20 => Expr::name("std::numbers::ln2"),
            ("Math", "PI") => Expr::literal("3.141592653589793"),
            ("Math", "E") => Expr::literal("2.718281828459045"),
            ("Math", "LN2") => Expr::literal("0.6931471805599453"),
            ("Number", "MAX_SAFE_INTEGER") => Expr::literal("9007199254740991LL"),
            ("Number", "MIN_SAFE_INTEGER") => Expr::literal("-9007199254740991LL"),
            ("Number", "MAX_VALUE") => limit("max"),
            ("Number", "EPSILON") => limit("epsilon"),
            ("Number", "POSITIVE_INFINITY") => limit("infinity"),
            ("Number", "NEGATIVE_INFINITY") => Expr::unary(UnaryOp::Neg, limit("infinity")),
            _ => return None,
        })
    }

    fn call(&mut self, callee: &Node, arguments: &[Node]) -> Expr {
        if let Node::MemberExpression {
            object,
            property,
            computed: false,
        } = callee
            && let (Some(global), Some(method)) = (object.as_identifier(), property.property_name())
            && !self.is_local(global)
            && !self.classes.contains_key(global)
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
        let func = match callee {
            Node::MemberExpression {
                object,
                property,
                computed: false,
            } => match property.property_name() {
                Some(method) => self.member_access(object, &method),
                None => self.unsupported("call of a nameless member"),
            },
            other => self.expr(other),
        };
        Expr::call(func, args)
    }

    fn construct(&mut self, callee: &Node, arguments: &[Node]) -> Expr {
        let Some(name) = callee.as_identifier() else {
            return self.unsupported("constructor call on an expression");
        };
        if let Some(exception) = exception_type(name) {
            let mut args = self.arguments(arguments);
            if args.is_empty() {
                args.push(Expr::Str(String::new()));
            }
            return Expr::construct(exception, args);
        }
        if let Some(numeric) = NumericType::parse(name).filter(|_| name.ends_with("Array")) {
            let ty = self.ty(&TypeRef::array(TypeRef::Primitive(numeric.into())));
            return match arguments {
                [] => Expr::init(&ty, Vec::new()),
                [source] if self.type_of(source).is_some_and(|t| is_container(&t)) => {
                    let value = self.expr(source);
                    Expr::construct(&ty, value.range().into())
                }
                [size] => {
                    let size = self.expr(size);
                    Expr::construct(&ty, vec![size])
                }
                _ => self.unsupported(format!("{name} with several arguments")),
            };
        }
        match name {
            "Map" | "Object" => {
                let ty = self.ty(&TypeRef::map(TypeRef::STRING, TypeRef::ANY));
                Expr::init(&ty, Vec::new())
            }
            "Set" => {
                let ty = self.ty(&TypeRef::generic("Set", vec![TypeRef::ANY]));
                match arguments {
                    [source] => {
                        let value = self.expr(source);
                        Expr::construct(&ty, value.range().into())
                    }
                    _ => Expr::init(&ty, Vec::new()),
                }
            }
            "Array" => {
                let ty = self.ty(&TypeRef::list(TypeRef::ANY));
                match arguments {
                    [size] => {
                        let size = self.expr(size);
                        Expr::construct(&ty, vec![size])
                    }
                    _ => Expr::init(&ty, Vec::new()),
                }
            }
            other => {
                let args = self.arguments(arguments);
                Expr::call_path(&format!("std::make_shared<{}>", self.ident(other)), args)
            }
        }
    }
}

impl Transformer for CppTransformer {
    type Unit = TranslationUnit;

    fn transform(&mut self, program: &Program) -> TranslationUnit {
        self.reset();
        let body = top_level_statements(program);
        self.collect_classes(&body);
        self.collect_globals(&body);

        let mut items = Vec::new();
        for node in &body {
            match node {
                Node::ClassDeclaration(class) => {
                    let decl = self.class_decl(class);
                    items.push(Item::Class(decl));
                }
                Node::FunctionDeclaration(function) => {
                    let name = self.ident(function.name().unwrap_or("_anonymous"));
                    items.push(Item::Function(self.function(function, &name, Vec::new())));
                }
                Node::VariableDeclaration { kind, declarations } => {
                    for declarator in declarations {
                        self.global_declarator(*kind, declarator, &mut items);
                    }
                }
                other => {
                    self.scopes.push(HashMap::new());
                    let statements = self.statement(other);
                    self.scopes.pop();
                    items.extend(statements.into_iter().map(Item::Statement));
                }
            }
        }
        items.extend(self.lifted.drain(..).map(Item::Class));

        let stubs = self.stubs(&items);
        let includes: BTreeSet<&str> = self
            .helpers
            .iter()
            .flat_map(|helper| helper.includes().iter().copied())
            .collect();
        TranslationUnit {
            includes: includes.into_iter().map(str::to_string).collect(),
            namespace: self.options.namespace.clone(),
            helpers: self.helpers.iter().map(|helper| helper.source()).collect(),
            stubs,
            items,
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
            Some(int) if literal.is_hex() && int > i128::from(u32::MAX) => {
                Expr::literal(format!("0x{int:X}ULL"))
            }
            Some(int) if literal.is_hex() && int >= 0 => Expr::literal(format!("0x{int:X}")),
            Some(int) if int > i128::from(i32::MAX) || int < i128::from(i32::MIN) => {
                Expr::literal(format!("{int}LL"))
            }
            Some(int) => Expr::literal(int.to_string()),
            None if value.is_nan() => {
                Expr::call_path("std::numeric_limits<double>::quiet_NaN", Vec::new())
            }
            None if value.is_infinite() => {
                let infinity = Expr::call_path("std::numeric_limits<double>::infinity", Vec::new());
                if *value > 0.0 {
                    infinity
                } else {
                    Expr::unary(UnaryOp::Neg, infinity)
                }
            }
            None => Expr::literal(float_literal(*value)),
        },
    }
}

pub(super) fn int_literal(node: &Node) -> Option<i64> {
    match node {
        Node::Literal(literal) => literal.as_integer().and_then(|n| i64::try_from(n).ok()),
        _ => None,
    }
}

/// Integer `case` labels, negatives included.
fn int_constant(node: &Node) -> Option<i64> {
    match node {
        Node::UnaryExpression {
            operator: UnaryOperator::Neg,
            argument,
        } => int_literal(argument).map(|n| -n),
        other => int_literal(other),
    }
}

/// Literals that can initialize a namespace-scope variable eagerly.
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

fn is_nullish(node: &Node) -> bool {
    match node {
        Node::Literal(literal) => matches!(literal.value, LiteralValue::Null),
        Node::Identifier(id) => id.name == "undefined",
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

/// `[k, v]` with two plain names, bindable as a structured binding.
fn structured(elements: &[Option<Node>]) -> bool {
    elements.len() == 2
        && elements
            .iter()
            .all(|item| item.as_ref().and_then(Node::as_identifier).is_some())
}

/// The variable an lvalue chain starts from: `a` for `a.b[i]`.
fn root_name(node: &Node) -> Option<&str> {
    match node {
        Node::Identifier(id) => Some(&id.name),
        Node::MemberExpression { object, .. } => root_name(object),
        _ => None,
    }
}

/// Whether `body` may change the container bound to `name` in place:
/// element stores, mutating array and map operations, or handing it to
/// another function.
fn mutates(body: &Node, name: &str) -> bool {
    let element_of = |node: &Node| {
        matches!(node, Node::MemberExpression { .. }) && root_name(node) == Some(name)
    };
    body.any(&mut |node| match node {
        Node::AssignmentExpression { left, .. } => element_of(left),
        Node::UpdateExpression { argument, .. } => element_of(argument),
        Node::CallExpression { arguments, .. } | Node::NewExpression { arguments, .. } => {
            arguments.iter().any(|argument| argument.as_identifier() == Some(name))
        }
        Node::ArrayPush { array, .. }
        | Node::ArrayPop { array }
        | Node::ArrayShift { array }
        | Node::ArrayUnshift { array, .. }
        | Node::ArraySplice { array, .. }
        | Node::ArrayReverse { array }
        | Node::ArraySort { array, .. }
        | Node::ArrayFill { array, .. }
        | Node::ArrayClear { array } => root_name(array) == Some(name),
        Node::MapSet { map, .. } | Node::MapDelete { map, .. } => root_name(map) == Some(name),
        _ => false,
    })
}

pub(super) fn is_exit(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Return(_)
            | Stmt::CoReturn(_)
            | Stmt::Throw(_)
            | Stmt::Break
            | Stmt::Continue
            | Stmt::Goto(_)
    )
}

pub(super) fn placeholder_text(expr: &Expr) -> String {
    match expr {
        Expr::Placeholder(what) => what.clone(),
        _ => String::new(),
    }
}

/// Wrap an expression as a statement, dropping values without effects.
pub(super) fn statement_of(value: Expr) -> Option<Stmt> {
    if value.is_simple() {
        None
    } else {
        Some(Stmt::Expr(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::cpp::Standard;
    use retarget_il::build::*;

    fn lower_with(options: CppOptions, body: Vec<Node>) -> (TranslationUnit, Vec<String>) {
        let mut transformer = CppTransformer::new(options);
        let unit = transformer.transform(&Program::new(body));
        (unit, transformer.take_warnings())
    }

    fn lower(body: Vec<Node>) -> (TranslationUnit, Vec<String>) {
        lower_with(CppOptions::default(), body)
    }

    fn find_function<'a>(unit: &'a TranslationUnit, name: &str) -> &'a Function {
        unit.items
            .iter()
            .find_map(|item| match item {
                Item::Function(function) if function.name == name => Some(function),
                _ => None,
            })
            .expect("function")
    }

    fn classes(unit: &TranslationUnit) -> Vec<&ClassDecl> {
        unit.items
            .iter()
            .filter_map(|item| match item {
                Item::Class(class) => Some(class),
                _ => None,
            })
            .collect()
    }

    fn typed_function(name: &str, params: Vec<Node>, body: Vec<Node>) -> Node {
        let mut function = function(Some(name), &[], body);
        function.params = params;
        Node::FunctionDeclaration(function)
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
        assert!(unit.has_main());
        let twice = find_function(&unit, "twice");
        assert_eq!(twice.returns, "int32_t");
        assert_eq!(twice.params[0].ty, "auto");
        assert!(!twice.has_prototype());
        let main: Vec<_> = unit
            .items
            .iter()
            .filter(|item| matches!(item, Item::Statement(_)))
            .collect();
        assert_eq!(main.len(), 1);
    }

    #[test]
    fn test_locals_take_inferred_types() {
        let (unit, _) = lower(vec![function_decl(
            "f",
            &[],
            vec![
                const_decl("n", hex(0x9E37_79B9)),
                const_decl("name", string("x")),
                const_decl("result", call(ident("compute"), vec![])),
                var_decl("state", None),
            ],
        )]);
        let types: Vec<_> = find_function(&unit, "f")
            .body
            .iter()
            .map(|stmt| match stmt {
                Stmt::Local { ty, .. } => ty.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(types, ["uint32_t", "std::string", "auto", "std::any"]);
    }

    #[test]
    fn test_literal_arrays_take_their_element_type() {
        let (unit, _) = lower(vec![function_decl(
            "f",
            &[],
            vec![const_decl("table", array(vec![int(1), int(2)]))],
        )]);
        let body = &find_function(&unit, "f").body;
        assert_eq!(
            body,
            &[Stmt::Local {
                ty: "std::vector<int32_t>".to_string(),
                name: "table".to_string(),
                value: Some(Expr::init("std::vector<int32_t>", vec![Expr::int(1), Expr::int(2)])),
            }]
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
        assert_eq!(
            find_function(&unit, "f").body,
            [Stmt::Local {
                ty: "auto".to_string(),
                name: "b".to_string(),
                value: Some(Expr::name("arr").index(Expr::int(1))),
            }]
        );
    }

    #[test]
    fn test_containers_pass_by_reference_only_when_mutated() {
        let (unit, _) = lower(vec![
            typed_function(
                "clear",
                vec![typed_ident("block", "uint8[]")],
                vec![expr_stmt(assign(index(ident("block"), int(0)), int(0)))],
            ),
            typed_function(
                "first",
                vec![typed_ident("block", "uint8[]")],
                vec![ret(Some(index(ident("block"), int(0))))],
            ),
        ]);
        assert_eq!(find_function(&unit, "clear").params[0].ty, "std::vector<uint8_t>&");
        assert_eq!(find_function(&unit, "first").params[0].ty, "const std::vector<uint8_t>&");
    }

    #[test]
    fn test_subclass_methods_override() {
        let (unit, _) = lower(vec![
            class_decl("Base", None, vec![method("run", &[], vec![])]),
            class_decl("Derived", Some("Base"), vec![method("run", &[], vec![])]),
        ]);
        let classes = classes(&unit);
        let method = |class: &ClassDecl| {
            class
                .members
                .iter()
                .find_map(|member| match member {
                    Member::Method(method) => Some((method.specifiers.clone(), method.qualifiers.clone())),
                    _ => None,
                })
                .expect("method")
        };
        assert_eq!(method(classes[0]), (vec!["virtual"], vec![]));
        assert_eq!(method(classes[1]), (vec![], vec!["override"]));
        assert!(classes[0].has_subclasses);
        assert!(!classes[1].has_subclasses);
        assert_eq!(
            classes[1].members[0],
            Member::InheritConstructors("Base::Base".to_string())
        );
        assert!(unit.stubs.is_empty());
    }

    #[test]
    fn test_external_base_gets_a_stub() {
        let (unit, _) = lower(vec![
            class_decl("Cipher", Some("BlockCipher"), vec![]),
            class_decl("Failure", Some("Error"), vec![]),
        ]);
        assert_eq!(unit.stubs.len(), 1);
        assert_eq!(unit.stubs[0].name, "BlockCipher");
        assert_eq!(classes(&unit)[1].base.as_deref(), Some("std::runtime_error"));
    }

    #[test]
    fn test_thrown_subclass_is_a_value() {
        let (unit, _) = lower(vec![
            class_decl("Failure", Some("Error"), vec![]),
            function_decl(
                "f",
                &[],
                vec![throw(new_expr(ident("Failure"), vec![string("bad")]))],
            ),
        ]);
        assert_eq!(
            find_function(&unit, "f").body,
            [Stmt::Throw(Some(Expr::construct(
                "Failure",
                vec![Expr::Str("bad".to_string())]
            )))]
        );
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
        let body = &find_function(&unit, "f").body;
        assert!(matches!(body.as_slice(), [Stmt::If { otherwise, .. }] if otherwise.len() == 1));
    }

    #[test]
    fn test_integer_switch_marks_fallthrough() {
        let cases = vec![
            SwitchCase {
                test: Some(Box::new(int(1))),
                consequent: vec![expr_stmt(call(ident("a"), vec![]))],
            },
            SwitchCase {
                test: Some(Box::new(int(2))),
                consequent: vec![expr_stmt(call(ident("b"), vec![])), Node::BreakStatement {}],
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
        let [Stmt::Switch { subject, sections }] = find_function(&unit, "f").body.as_slice() else {
            panic!("expected a native switch");
        };
        assert_eq!(subject, &Expr::cast("int", Expr::name("x")));
        assert!(sections[0].falls_through);
        assert_eq!(sections[1].body.last(), Some(&Stmt::Break));
    }

    #[test]
    fn test_async_functions_become_coroutines() {
        let mut load = function(
            Some("load"),
            &[],
            vec![expr_stmt(Node::AwaitExpression {
                argument: Box::new(call(ident("fetch"), vec![])),
            })],
        );
        load.is_async = true;
        let options = CppOptions {
            use_coroutines: true,
            ..CppOptions::default()
        };
        let (unit, _) = lower_with(options, vec![Node::FunctionDeclaration(load)]);
        let load = find_function(&unit, "load");
        assert_eq!(load.returns, "rt::Task");
        assert!(matches!(load.body.last(), Some(Stmt::CoReturn(_))));
        assert!(matches!(&load.body[0], Stmt::Expr(Expr::Await(_))));
        assert_eq!(unit.helpers.len(), 1);
    }

    #[test]
    fn test_cpp17_lengths_avoid_ssize() {
        let options = CppOptions {
            standard: Standard::Cpp17,
            ..CppOptions::default()
        };
        let (unit, _) = lower_with(
            options,
            vec![function_decl("f", &["items"], vec![ret(Some(member(ident("items"), "length")))])],
        );
        assert_eq!(
            find_function(&unit, "f").body,
            [Stmt::Return(Some(Expr::cast(
                "int",
                Expr::name("items").method("size", Vec::new())
            )))]
        );
    }

    #[test]
    fn test_unknown_kind_warns() {
        let (unit, warnings) = lower(vec![Node::Unknown {
            kind: "WithStatement".into(),
        }]);
        assert_eq!(warnings, ["unhandled kind: WithStatement"]);
        assert_eq!(
            unit.items,
            [Item::Statement(Stmt::Placeholder("WithStatement".into()))]
        );
    }

    #[test]
    fn test_state_resets_between_runs() {
        let mut transformer = CppTransformer::new(CppOptions::default());
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
