//! C++ source printer. K&R braces; declarations are grouped so every name
//! is declared before its first use, and `#include`s are derived from the
//! printed text.

use std::collections::BTreeSet;

use super::ast::*;
use crate::escape::{comment_text, cpp_string};
use crate::precedence::{Assoc, Op, Side, needs_parens};
use crate::reorder::{Bucket, bases_first, reorder};
use crate::traits::Emitter;
use crate::writer::{EmitError, Indented, SourceWriter};

// Precedence levels, loosest first.
const ASSIGN: u8 = 1;
const CONDITIONAL: u8 = 2;
const OR: u8 = 4;
const AND: u8 = 5;
const BIT_OR: u8 = 6;
const BIT_XOR: u8 = 7;
const BIT_AND: u8 = 8;
const EQUALITY: u8 = 9;
const RELATIONAL: u8 = 10;
const SHIFT: u8 = 11;
const ADDITIVE: u8 = 12;
const MULTIPLICATIVE: u8 = 13;
const UNARY: u8 = 14;
const POSTFIX: u8 = 15;
const ATOM: u8 = 16;

/// Standard-library spellings and the header that declares them.
const HEADERS: &[(&str, &str)] = &[
    ("std::vector", "vector"),
    ("std::string", "string"),
    ("std::to_string", "string"),
    ("std::sto", "string"),
    ("std::map", "map"),
    ("std::set", "set"),
    ("std::any", "any"),
    ("std::optional", "optional"),
    ("std::nullopt", "optional"),
    ("std::shared_ptr", "memory"),
    ("std::make_shared", "memory"),
    ("std::dynamic_pointer_cast", "memory"),
    ("std::function", "functional"),
    ("std::tuple", "tuple"),
    ("std::tie", "tuple"),
    ("std::get<", "tuple"),
    ("std::runtime_error", "stdexcept"),
    ("std::invalid_argument", "stdexcept"),
    ("std::range_error", "stdexcept"),
    ("std::out_of_range", "stdexcept"),
    ("std::logic_error", "stdexcept"),
    ("std::exception", "exception"),
    ("std::cout", "iostream"),
    ("std::cerr", "iostream"),
    ("std::format", "format"),
    ("std::numbers", "numbers"),
    ("std::numeric_limits", "limits"),
    ("std::pow", "cmath"),
    ("std::sqrt", "cmath"),
    ("std::floor", "cmath"),
    ("std::ceil", "cmath"),
    ("std::trunc", "cmath"),
    ("std::fmod", "cmath"),
    ("std::abs", "cmath"),
    ("std::log", "cmath"),
    ("std::exp", "cmath"),
    ("std::sin", "cmath"),
    ("std::cos", "cmath"),
    ("std::tan", "cmath"),
    ("std::atan", "cmath"),
    ("std::hypot", "cmath"),
    ("std::isnan", "cmath"),
    ("std::isfinite", "cmath"),
    ("std::rotl", "bit"),
    ("std::rotr", "bit"),
    ("std::sort", "algorithm"),
    ("std::reverse", "algorithm"),
    ("std::find", "algorithm"),
    ("std::all_of", "algorithm"),
    ("std::any_of", "algorithm"),
    ("std::for_each", "algorithm"),
    ("std::min", "algorithm"),
    ("std::max", "algorithm"),
    ("std::fill", "algorithm"),
    ("std::copy", "algorithm"),
    ("std::accumulate", "numeric"),
    ("std::ssize", "iterator"),
    ("std::size_t", "cstddef"),
    ("int8_t", "cstdint"),
    ("int16_t", "cstdint"),
    ("int32_t", "cstdint"),
    ("int64_t", "cstdint"),
];

struct Rendered {
    text: String,
    level: u8,
}

impl Rendered {
    fn new(text: String, level: u8) -> Self {
        Self { text, level }
    }

    fn atom(text: String) -> Self {
        Self::new(text, ATOM)
    }

    fn at_least(self, min: u8) -> String {
        if self.level < min {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

pub struct CppEmitter {
    out: SourceWriter,
    unit: String,
    warnings: Vec<String>,
}

impl CppEmitter {
    pub fn new(indent: &str) -> Self {
        Self {
            out: SourceWriter::new(indent),
            unit: indent.to_string(),
            warnings: Vec::new(),
        }
    }

    /// Print with a fresh emitter at level zero.
    fn nested(&mut self, body: impl FnOnce(&mut CppEmitter)) -> String {
        let mut nested = CppEmitter::new(&self.unit);
        body(&mut nested);
        self.warnings.append(&mut nested.warnings);
        nested.out.finish().trim_end().to_string()
    }

    fn translation_unit(&mut self, unit: &TranslationUnit) {
        let (statements, declarations): (Vec<&Item>, Vec<&Item>) =
            unit.items.iter().partition(|item| matches!(item, Item::Statement(_)));
        let declarations = bases_first(
            declarations,
            |item| match item {
                Item::Class(class) => class.name.as_str(),
                _ => "",
            },
            |item| match item {
                Item::Class(class) => class.base.as_deref(),
                _ => None,
            },
        );

        let mut texts: Vec<String> = declarations.iter().map(|item| self.item_text(item, true)).collect();
        let names: Vec<&str> = declarations.iter().map(|item| item_name(item)).collect();

        // A prototype is needed once some other declaration calls the function.
        let prototyped: Vec<bool> = declarations
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Item::Function(function) if function.has_prototype() => texts
                    .iter()
                    .enumerate()
                    .any(|(j, text)| j != i && mentions(text, &function.name)),
                _ => false,
            })
            .collect();

        let buckets = late_buckets(&declarations, &texts, &names);
        for (i, item) in declarations.iter().enumerate() {
            if prototyped[i] {
                texts[i] = self.item_text(item, false);
            }
        }
        let order = reorder((0..declarations.len()).collect(), |i: &usize| buckets[*i]);

        if !unit.helpers.is_empty() {
            self.out.line("namespace rt {");
            for helper in &unit.helpers {
                self.out.blank();
                self.out.lines(helper);
            }
            self.out.blank();
            self.out.line("}  // namespace rt");
        }
        if let Some(namespace) = &unit.namespace {
            self.out.blank();
            self.out.line(&format!("namespace {namespace} {{"));
        }
        for stub in &unit.stubs {
            self.out.blank();
            self.class(stub);
        }

        let classes: Vec<&str> = declarations
            .iter()
            .filter_map(|item| match item {
                Item::Class(class) => Some(class.name.as_str()),
                _ => None,
            })
            .collect();
        let prototypes: Vec<String> = declarations
            .iter()
            .zip(&prototyped)
            .filter(|(_, needed)| **needed)
            .filter_map(|(item, _)| match item {
                Item::Function(function) => self.prototype(function),
                _ => None,
            })
            .collect();
        if classes.len() > 1 || !prototypes.is_empty() {
            self.out.blank();
            for class in &classes {
                self.out.line(&format!("class {class};"));
            }
        }
        if !prototypes.is_empty() {
            self.out.blank();
            for prototype in &prototypes {
                self.out.lines(prototype);
            }
        }

        for i in order {
            self.out.blank();
            self.out.lines(&texts[i]);
        }
        if let Some(namespace) = &unit.namespace {
            self.out.blank();
            self.out.line(&format!("}}  // namespace {namespace}"));
        }

        if statements.is_empty() {
            return;
        }
        self.out.blank();
        self.out.line("int main() {");
        self.indented(|this| {
            if let Some(namespace) = &unit.namespace {
                this.out.line(&format!("using namespace {namespace};"));
            }
            for item in &statements {
                if let Item::Statement(stmt) = item {
                    this.statement(stmt);
                }
            }
            this.out.line("return 0;");
        });
        self.out.line("}");
    }

    /// One declaration printed on its own; `defaults` keeps parameter
    /// defaults on functions, which move to the prototype when there is one.
    fn item_text(&mut self, item: &Item, defaults: bool) -> String {
        self.nested(|this| match item {
            Item::Class(class) => this.class(class),
            Item::Function(function) => this.function(function, defaults),
            Item::Variable(variable) => this.variable(variable),
            Item::Statement(stmt) => this.statement(stmt),
        })
    }

    fn prototype(&mut self, function: &Function) -> Option<String> {
        self.signature(function, true).ok().map(|signature| format!("{signature};"))
    }

    fn doc(&mut self, doc: Option<&str>) {
        let Some(doc) = doc else {
            return;
        };
        let lines: Vec<String> = doc.lines().map(|line| doc_text(line.trim_end())).collect();
        if let [single] = lines.as_slice() {
            self.out.line(&format!("/** {single} */"));
            return;
        }
        self.out.line("/**");
        for line in &lines {
            if line.is_empty() {
                self.out.line(" *");
            } else {
                self.out.line(&format!(" * {line}"));
            }
        }
        self.out.line(" */");
    }

    fn class(&mut self, class: &ClassDecl) {
        self.doc(class.doc.as_deref());
        let mut header = format!("class {}", class.name);
        if let Some(base) = &class.base {
            header.push_str(" : public ");
            header.push_str(base);
        }
        self.out.line(&format!("{header} {{"));
        self.out.line("public:");
        self.indented(|this| {
            let mut previous_field = None;
            if class.has_subclasses && class.base.is_none() {
                this.out.line(&format!("virtual ~{}() = default;", class.name));
                previous_field = Some(false);
            }
            for member in &class.members {
                if matches!(member, Member::StaticInit { .. }) {
                    continue;
                }
                let field = matches!(member, Member::Field { .. } | Member::InheritConstructors(_));
                if previous_field.is_some() && !(field && previous_field == Some(true)) {
                    this.out.blank();
                }
                this.member(member, class.base.as_deref());
                previous_field = Some(field);
            }
        });
        self.out.line("};");
        for member in &class.members {
            if let Member::StaticInit { name, body } = member {
                self.out.blank();
                self.out.line(&format!("static const bool {name} = [] {{"));
                self.indented(|this| {
                    this.statements(body);
                    this.out.line("return true;");
                });
                self.out.line("}();");
            }
        }
    }

    fn member(&mut self, member: &Member, base: Option<&str>) {
        if let Some(err) = self.guarded(|this| this.try_member(member, base)) {
            self.marker(&err);
        }
    }

    fn marker(&mut self, err: &EmitError) {
        self.out.line(&format!("/* {} */", comment_text(&err.to_string())));
        if err.is_new() {
            self.warnings.push(err.to_string());
        }
    }

    fn try_member(&mut self, member: &Member, base: Option<&str>) -> Result<(), EmitError> {
        match member {
            Member::Field {
                is_static,
                ty,
                name,
                value,
            } => {
                let prefix = if *is_static { "inline static " } else { "" };
                let text = match value {
                    Some(value) => format!("{prefix}{ty} {name} = {}", self.render(value)?.at_least(ASSIGN)),
                    None => format!("{prefix}{ty} {name}{{}}"),
                };
                self.out.lines(&format!("{text};"));
            }
            Member::Constructor {
                name,
                params,
                base_args,
                body,
                doc,
            } => {
                let params = self.params(params, true)?;
                let mut header = format!("{name}({params})");
                if let (Some(args), Some(base)) = (base_args, base) {
                    let args = self.list(args)?.join(", ");
                    header.push_str(&format!(" : {base}({args})"));
                }
                self.doc(doc.as_deref());
                self.braced(&header, body);
            }
            Member::InheritConstructors(spelling) => self.out.line(&format!("using {spelling};")),
            Member::Method(function) => self.try_function(function, true)?,
            Member::StaticInit { .. } => {}
            Member::Placeholder(what) => return Err(EmitError::Placeholder(what.clone())),
        }
        Ok(())
    }

    fn variable(&mut self, variable: &Variable) {
        let Some(err) = self.guarded(|this| {
            let prefix = if variable.is_const { "const " } else { "" };
            let text = match &variable.value {
                Some(value) => format!(
                    "{prefix}{} {} = {}",
                    variable.ty,
                    variable.name,
                    this.render(value)?.at_least(ASSIGN)
                ),
                None => format!("{prefix}{} {}{{}}", variable.ty, variable.name),
            };
            this.out.lines(&format!("{text};"));
            Ok(())
        }) else {
            return;
        };
        self.failed_declaration(&variable.ty, &variable.name, &err);
    }

    /// A declaration whose value could not be printed still declares its
    /// name so later uses resolve.
    fn failed_declaration(&mut self, ty: &str, name: &str, err: &EmitError) {
        let ty = if ty.contains("auto") { "std::any" } else { ty };
        let marker = format!("/* {} */", comment_text(&err.to_string()));
        self.out.line(&format!("{ty} {name}{{}} {marker};"));
        if err.is_new() {
            self.warnings.push(err.to_string());
        }
    }

    fn function(&mut self, function: &Function, defaults: bool) {
        if let Some(err) = self.guarded(|this| this.try_function(function, defaults)) {
            self.marker(&err);
        }
    }

    fn try_function(&mut self, function: &Function, defaults: bool) -> Result<(), EmitError> {
        let signature = self.signature(function, defaults)?;
        self.doc(function.doc.as_deref());
        self.braced(&signature, &function.body);
        Ok(())
    }

    fn signature(&mut self, function: &Function, defaults: bool) -> Result<String, EmitError> {
        let params = self.params(&function.params, defaults)?;
        let mut text: String = function.specifiers.iter().map(|s| format!("{s} ")).collect();
        text.push_str(&format!("{} {}({params})", function.returns, function.name));
        for qualifier in &function.qualifiers {
            text.push(' ');
            text.push_str(qualifier);
        }
        Ok(text)
    }

    fn params(&mut self, params: &[Param], defaults: bool) -> Result<String, EmitError> {
        let mut rendered = Vec::with_capacity(params.len());
        for param in params {
            let mut text = format!("{} {}", param.ty, param.name);
            if let (true, Some(default)) = (defaults, &param.default) {
                text.push_str(" = ");
                text.push_str(&self.render(default)?.at_least(ASSIGN));
            }
            rendered.push(text);
        }
        Ok(rendered.join(", "))
    }

    /// `header { ... }`, or `header {}` when empty.
    fn braced(&mut self, header: &str, body: &[Stmt]) {
        if body.is_empty() {
            self.out.lines(&format!("{header} {{}}"));
            return;
        }
        self.out.lines(&format!("{header} {{"));
        self.indented(|this| this.statements(body));
        self.out.line("}");
    }

    fn statements(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.statement(stmt);
        }
    }

    /// Print one statement; a failure leaves a comment marker in its place.
    fn statement(&mut self, stmt: &Stmt) {
        let Some(err) = self.guarded(|this| this.try_statement(stmt)) else {
            return;
        };
        match stmt {
            Stmt::Local { ty, name, .. } => self.failed_declaration(ty, name, &err),
            _ => self.marker(&err),
        }
    }

    fn try_statement(&mut self, stmt: &Stmt) -> Result<(), EmitError> {
        match stmt {
            Stmt::Expr(expr) => {
                let text = self.expr_text(expr)?;
                self.out.lines(&format!("{text};"));
            }
            Stmt::Local { .. } => {
                let text = self.local(stmt)?;
                self.out.lines(&format!("{text};"));
            }
            Stmt::If {
                test,
                then,
                otherwise,
            } => self.if_chain(test, then, otherwise)?,
            Stmt::While { test, body } => {
                let test = self.expr_text(test)?;
                self.braced(&format!("while ({test})"), body);
            }
            Stmt::DoWhile { body, test } => {
                let test = self.expr_text(test)?;
                self.out.line("do {");
                self.indented(|this| this.statements(body));
                self.out.lines(&format!("}} while ({test});"));
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let init = self.for_init(init)?;
                let test = match test {
                    Some(test) => format!(" {}", self.expr_text(test)?),
                    None => String::new(),
                };
                let update = self.list(update)?.join(", ");
                let update = if update.is_empty() {
                    update
                } else {
                    format!(" {update}")
                };
                self.braced(&format!("for ({init};{test};{update})"), body);
            }
            Stmt::ForEach { ty, name, iter, body } => {
                let iter = self.expr_text(iter)?;
                self.braced(&format!("for ({ty} {name} : {iter})"), body);
            }
            Stmt::Switch { subject, sections } => self.switch(subject, sections)?,
            Stmt::Break => self.out.line("break;"),
            Stmt::Continue => self.out.line("continue;"),
            Stmt::Return(None) => self.out.line("return;"),
            Stmt::Return(Some(value)) => {
                let value = self.expr_text(value)?;
                self.out.lines(&format!("return {value};"));
            }
            Stmt::CoReturn(value) => {
                let value = self.expr_text(value)?;
                self.out.lines(&format!("co_return {value};"));
            }
            Stmt::Throw(None) => self.out.line("throw;"),
            Stmt::Throw(Some(value)) => {
                let value = self.expr_text(value)?;
                self.out.lines(&format!("throw {value};"));
            }
            Stmt::Try { body, catches } => {
                self.out.line("try {");
                self.indented(|this| this.statements(body));
                for catch in catches {
                    let clause = match (&catch.ty, &catch.name) {
                        (Some(ty), Some(name)) => format!("const {ty}& {name}"),
                        (Some(ty), None) => format!("const {ty}&"),
                        (None, _) => "...".to_string(),
                    };
                    self.out.line(&format!("}} catch ({clause}) {{"));
                    self.indented(|this| this.statements(&catch.body));
                }
                self.out.line("}");
            }
            Stmt::Block(body) => {
                self.out.line("{");
                self.indented(|this| this.statements(body));
                self.out.line("}");
            }
            Stmt::Goto(label) => self.out.line(&format!("goto {label};")),
            Stmt::Label(label) => self.out.line(&format!("{label}:;")),
            Stmt::Placeholder(what) => return Err(EmitError::Placeholder(what.clone())),
        }
        Ok(())
    }

    fn if_chain(&mut self, test: &Expr, then: &[Stmt], otherwise: &[Stmt]) -> Result<(), EmitError> {
        let test = self.expr_text(test)?;
        self.out.lines(&format!("if ({test}) {{"));
        self.indented(|this| this.statements(then));
        let mut otherwise = otherwise;
        loop {
            match otherwise {
                [] => break,
                [
                    Stmt::If {
                        test,
                        then,
                        otherwise: rest,
                    },
                ] => {
                    let test = self.expr_text(test)?;
                    self.out.lines(&format!("}} else if ({test}) {{"));
                    self.indented(|this| this.statements(then));
                    otherwise = rest;
                }
                _ => {
                    self.out.line("} else {");
                    self.indented(|this| this.statements(otherwise));
                    break;
                }
            }
        }
        self.out.line("}");
        Ok(())
    }

    fn switch(&mut self, subject: &Expr, sections: &[SwitchSection]) -> Result<(), EmitError> {
        let subject = self.expr_text(subject)?;
        let mut labels = Vec::with_capacity(sections.len());
        for section in sections {
            let mut rendered = Vec::with_capacity(section.labels.len());
            for label in &section.labels {
                rendered.push(match label {
                    Some(value) => format!("case {}:", self.expr_text(value)?),
                    None => "default:".to_string(),
                });
            }
            labels.push(rendered);
        }
        self.out.lines(&format!("switch ({subject}) {{"));
        self.indented(|this| {
            for (section, mut labels) in sections.iter().zip(labels) {
                // Declarations need their own scope to be jumped over.
                let scoped = section.body.iter().any(|stmt| matches!(stmt, Stmt::Local { .. }));
                let last = labels.pop().unwrap_or_else(|| "default:".to_string());
                for label in labels {
                    this.out.line(&label);
                }
                this.out.line(&if scoped { format!("{last} {{") } else { last });
                this.indented(|this| {
                    this.statements(&section.body);
                    if section.falls_through {
                        this.out.line("[[fallthrough]];");
                    }
                });
                if scoped {
                    this.out.line("}");
                }
            }
        });
        self.out.line("}");
        Ok(())
    }

    /// `T name = value` without the semicolon.
    fn local(&mut self, stmt: &Stmt) -> Result<String, EmitError> {
        let Stmt::Local { ty, name, value } = stmt else {
            return Err(EmitError::Invalid("declaration".into()));
        };
        Ok(match value {
            Some(value) => format!("{ty} {name} = {}", self.render(value)?.at_least(ASSIGN)),
            None => format!("{ty} {name}{{}}"),
        })
    }

    /// The initializer clause of a `for`: one declaration list or expressions.
    fn for_init(&mut self, init: &[Stmt]) -> Result<String, EmitError> {
        match init {
            [] => Ok(String::new()),
            [local @ Stmt::Local { .. }] => self.local(local),
            [Stmt::Local { ty: first, .. }, ..]
                if init
                    .iter()
                    .all(|stmt| matches!(stmt, Stmt::Local { ty, value: Some(_), .. } if ty == first)) =>
            {
                let mut parts = Vec::with_capacity(init.len());
                for stmt in init {
                    if let Stmt::Local {
                        name,
                        value: Some(value),
                        ..
                    } = stmt
                    {
                        parts.push(format!("{name} = {}", self.render(value)?.at_least(ASSIGN)));
                    }
                }
                Ok(format!("{first} {}", parts.join(", ")))
            }
            _ => {
                let mut parts = Vec::with_capacity(init.len());
                for stmt in init {
                    match stmt {
                        Stmt::Expr(expr) => parts.push(self.render(expr)?.at_least(ASSIGN)),
                        _ => return Err(EmitError::Invalid("mixed for initializer".into())),
                    }
                }
                Ok(parts.join(", "))
            }
        }
    }

    fn expr_text(&mut self, expr: &Expr) -> Result<String, EmitError> {
        Ok(self.render(expr)?.text)
    }

    fn list(&mut self, items: &[Expr]) -> Result<Vec<String>, EmitError> {
        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            rendered.push(self.render(item)?.at_least(ASSIGN));
        }
        Ok(rendered)
    }

    fn render(&mut self, expr: &Expr) -> Result<Rendered, EmitError> {
        Ok(match expr {
            Expr::Name(name) => Rendered::atom(name.clone()),
            Expr::Literal(text) => {
                let level = if text.starts_with('-') { UNARY } else { ATOM };
                Rendered::new(text.clone(), level)
            }
            Expr::Str(value) => Rendered::atom(cpp_string(value)),
            Expr::Char(c) => Rendered::atom(char_literal(*c)),
            Expr::Binary { op, left, right } => {
                let (spelling, level, assoc) = op_info(*op)?;
                let left = self.render(left)?;
                let right = self.render(right)?;
                let left = if needs_parens(level, left.level, Side::Left, assoc) {
                    format!("({})", left.text)
                } else {
                    left.text
                };
                let right = if needs_parens(level, right.level, Side::Right, assoc) {
                    format!("({})", right.text)
                } else {
                    right.text
                };
                Rendered::new(format!("{left} {spelling} {right}"), level)
            }
            Expr::Unary { op, operand } => {
                let operand = self.render(operand)?;
                match op {
                    UnaryOp::PostIncrement => Rendered::new(format!("{}++", operand.at_least(POSTFIX)), POSTFIX),
                    UnaryOp::PostDecrement => Rendered::new(format!("{}--", operand.at_least(POSTFIX)), POSTFIX),
                    prefix => {
                        let spelling = match prefix {
                            UnaryOp::Neg => "-",
                            UnaryOp::Plus => "+",
                            UnaryOp::Not => "!",
                            UnaryOp::BitNot => "~",
                            UnaryOp::PreIncrement => "++",
                            UnaryOp::PreDecrement => "--",
                            UnaryOp::Deref => "*",
                            _ => "&",
                        };
                        let mut operand = operand.at_least(UNARY);
                        // `- -x` must not fuse into `--x`, nor `& &x` into `&&x`.
                        let fuses = match spelling {
                            "-" | "+" | "++" | "--" => operand.starts_with(['-', '+']),
                            "&" => operand.starts_with('&'),
                            _ => false,
                        };
                        if fuses {
                            operand = format!("({operand})");
                        }
                        Rendered::new(format!("{spelling}{operand}"), UNARY)
                    }
                }
            }
            Expr::Assign { op, target, value } => {
                let spelling = match op {
                    Some(op) => format!("{}=", op_info(*op)?.0),
                    None => "=".to_string(),
                };
                let target = self.render(target)?.at_least(UNARY);
                let value = self.render(value)?.at_least(ASSIGN);
                Rendered::new(format!("{target} {spelling} {value}"), ASSIGN)
            }
            Expr::Call { func, args } => {
                let func = self.render(func)?.at_least(POSTFIX);
                let args = self.list(args)?;
                Rendered::new(format!("{func}({})", args.join(", ")), POSTFIX)
            }
            Expr::Member { object, name, arrow } => {
                let object = self.render(object)?.at_least(POSTFIX);
                let access = if *arrow { "->" } else { "." };
                Rendered::new(format!("{object}{access}{name}"), POSTFIX)
            }
            Expr::Index { object, index } => {
                let object = self.render(object)?.at_least(POSTFIX);
                let index = self.render(index)?.text;
                Rendered::new(format!("{object}[{index}]"), POSTFIX)
            }
            Expr::Construct { ty, args } => {
                let args = self.list(args)?;
                Rendered::new(format!("{ty}({})", args.join(", ")), POSTFIX)
            }
            Expr::Init { ty, items } => {
                let items = self.list(items)?;
                Rendered::new(format!("{ty}{{{}}}", items.join(", ")), POSTFIX)
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                let test = self.render(test)?.at_least(OR);
                let then = self.render(then)?.at_least(CONDITIONAL);
                let otherwise = self.render(otherwise)?.at_least(CONDITIONAL);
                Rendered::new(format!("{test} ? {then} : {otherwise}"), CONDITIONAL)
            }
            Expr::Lambda { capture, params, body } => {
                let params = self.params(params, true)?;
                let head = format!("[{capture}]({params})");
                match body {
                    LambdaBody::Expr(body) => {
                        let body = self.render(body)?.at_least(ASSIGN);
                        Rendered::new(format!("{head} {{ return {body}; }}"), POSTFIX)
                    }
                    LambdaBody::Block(body) if body.is_empty() => Rendered::new(format!("{head} {{}}"), POSTFIX),
                    LambdaBody::Block(body) => {
                        let inner = self.nested(|this| this.indented(|this| this.statements(body)));
                        Rendered::new(format!("{head} {{\n{inner}\n}}"), POSTFIX)
                    }
                }
            }
            Expr::Cast { ty, value } => {
                let value = self.render(value)?.text;
                Rendered::new(format!("static_cast<{ty}>({value})"), POSTFIX)
            }
            Expr::Await(value) => {
                let value = self.render(value)?.at_least(UNARY);
                Rendered::new(format!("co_await {value}"), UNARY)
            }
            Expr::Placeholder(what) => return Err(EmitError::Placeholder(what.clone())),
        })
    }
}

impl Indented for CppEmitter {
    fn writer(&mut self) -> &mut SourceWriter {
        &mut self.out
    }
}

impl Emitter for CppEmitter {
    type Unit = TranslationUnit;

    fn emit(&mut self, unit: &TranslationUnit) -> String {
        self.out = SourceWriter::new(&self.unit);
        self.translation_unit(unit);
        let body = std::mem::replace(&mut self.out, SourceWriter::new(&self.unit)).finish();

        let mut headers: BTreeSet<&str> = unit.includes.iter().map(String::as_str).collect();
        headers.extend(
            HEADERS
                .iter()
                .filter(|(needle, _)| body.contains(needle))
                .map(|(_, header)| *header),
        );
        let mut text = String::new();
        for header in &headers {
            text.push_str(&format!("#include <{header}>\n"));
        }
        if !headers.is_empty() && !body.is_empty() {
            text.push('\n');
        }
        text.push_str(&body);
        text
    }

    fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

fn item_name(item: &Item) -> &str {
    match item {
        Item::Class(class) => &class.name,
        Item::Function(function) => &function.name,
        Item::Variable(variable) => &variable.name,
        Item::Statement(_) => "",
    }
}

/// Bucket per declaration. Classes, and functions that cannot be
/// prototyped, are late: they are only usable below their definition. A
/// function or variable that mentions a late name moves below the classes,
/// and a moved variable is late in turn.
fn late_buckets(declarations: &[&Item], texts: &[String], names: &[&str]) -> Vec<Bucket> {
    let mut late: Vec<&str> = declarations
        .iter()
        .filter_map(|item| match item {
            Item::Class(class) => Some(class.name.as_str()),
            Item::Function(function) if !function.has_prototype() => Some(function.name.as_str()),
            _ => None,
        })
        .collect();
    let mut buckets: Vec<Bucket> = declarations
        .iter()
        .map(|item| match item {
            Item::Class(_) => Bucket::Type,
            Item::Function(_) => Bucket::Function,
            Item::Variable(_) => Bucket::PlainVariable,
            Item::Statement(_) => Bucket::Other,
        })
        .collect();
    loop {
        let mut changed = false;
        for (i, item) in declarations.iter().enumerate() {
            if !matches!(buckets[i], Bucket::Function | Bucket::PlainVariable) {
                continue;
            }
            if late.iter().any(|name| *name != names[i] && mentions(&texts[i], name)) {
                buckets[i] = Bucket::ConstructingVariable;
                if let Item::Variable(variable) = item {
                    late.push(&variable.name);
                }
                changed = true;
            }
        }
        if !changed {
            return buckets;
        }
    }
}

/// Whether `text` uses `name` as a whole identifier, not as a member.
fn mentions(text: &str, name: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    text.match_indices(name).any(|(at, _)| {
        let before = &text[..at];
        let after = text[at + name.len()..].chars().next();
        !before.ends_with(is_ident)
            && !before.ends_with('.')
            && !before.ends_with("->")
            && !after.is_some_and(is_ident)
    })
}

fn doc_text(text: &str) -> String {
    text.replace("*/", "* /")
}

fn char_literal(c: char) -> String {
    match c {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\r' => "'\\r'".to_string(),
        '\t' => "'\\t'".to_string(),
        '\0' => "'\\0'".to_string(),
        c if (c as u32) < 0x20 || c as u32 == 0x7F => format!("'\\x{:02X}'", c as u32),
        c => format!("'{c}'"),
    }
}

fn op_info(op: Op) -> Result<(&'static str, u8, Assoc), EmitError> {
    Ok(match op {
        Op::Or => ("||", OR, Assoc::Left),
        Op::And => ("&&", AND, Assoc::Left),
        Op::BitOr => ("|", BIT_OR, Assoc::Left),
        Op::BitXor => ("^", BIT_XOR, Assoc::Left),
        Op::BitAnd => ("&", BIT_AND, Assoc::Left),
        Op::Eq => ("==", EQUALITY, Assoc::Left),
        Op::Ne => ("!=", EQUALITY, Assoc::Left),
        Op::Lt => ("<", RELATIONAL, Assoc::Left),
        Op::Le => ("<=", RELATIONAL, Assoc::Left),
        Op::Gt => (">", RELATIONAL, Assoc::Left),
        Op::Ge => (">=", RELATIONAL, Assoc::Left),
        Op::Shl => ("<<", SHIFT, Assoc::Left),
        Op::Shr => (">>", SHIFT, Assoc::Left),
        Op::Add => ("+", ADDITIVE, Assoc::Left),
        Op::Sub => ("-", ADDITIVE, Assoc::Left),
        Op::Mul => ("*", MULTIPLICATIVE, Assoc::Left),
        Op::Div | Op::FloorDiv => ("/", MULTIPLICATIVE, Assoc::Left),
        Op::Mod => ("%", MULTIPLICATIVE, Assoc::Left),
        Op::UShr | Op::Pow | Op::Coalesce | Op::Is | Op::IsNot | Op::In | Op::NotIn => {
            return Err(EmitError::Invalid(format!("operator {}", op.c_spelling())));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Expr {
        Expr::name(n)
    }

    fn text(expr: &Expr) -> String {
        CppEmitter::new("    ").expr_text(expr).unwrap()
    }

    fn function(name: &str, returns: &str, body: Vec<Stmt>) -> Function {
        Function {
            specifiers: vec![],
            returns: returns.into(),
            name: name.into(),
            params: vec![],
            qualifiers: vec![],
            body,
            doc: None,
        }
    }

    fn emit(items: Vec<Item>) -> (String, Vec<String>) {
        let mut emitter = CppEmitter::new("    ");
        let code = emitter.emit(&TranslationUnit {
            items,
            ..TranslationUnit::default()
        });
        (code, emitter.take_warnings())
    }

    #[test]
    fn test_operands_keep_their_parentheses() {
        let masked = Expr::bin(Op::Eq, Expr::bin(Op::BitAnd, name("x"), Expr::int(1)), Expr::int(0));
        assert_eq!(text(&masked), "(x & 1) == 0");
        let nested = Expr::bin(Op::Sub, name("a"), Expr::bin(Op::Sub, name("b"), name("c")));
        assert_eq!(text(&nested), "a - (b - c)");
        let sum = Expr::bin(Op::Mul, Expr::bin(Op::Add, name("a"), name("b")), name("c"));
        assert_eq!(text(&sum), "(a + b) * c");
        let streamed = Expr::bin(
            Op::Shl,
            Expr::bin(Op::Shl, name("std::cout"), Expr::bin(Op::Lt, name("a"), name("b"))),
            Expr::Char('\n'),
        );
        assert_eq!(text(&streamed), "std::cout << (a < b) << '\\n'");
    }

    #[test]
    fn test_unary_operators_do_not_fuse() {
        let negated = Expr::unary(UnaryOp::Neg, Expr::unary(UnaryOp::Neg, name("x")));
        assert_eq!(text(&negated), "-(-x)");
        let deref = Expr::unary(UnaryOp::Deref, name("it")).dot("first");
        assert_eq!(text(&deref), "(*it).first");
        let cast = Expr::cast("uint8_t", Expr::bin(Op::Shr, name("x"), Expr::int(8)));
        assert_eq!(text(&cast), "static_cast<uint8_t>(x >> 8)");
        assert_eq!(text(&name("p").arrow("next").arrow("value")), "p->next->value");
    }

    #[test]
    fn test_lambdas_and_initializers() {
        let square = Expr::Lambda {
            capture: "&",
            params: vec![Param {
                ty: "auto".into(),
                name: "x".into(),
                default: None,
            }],
            body: LambdaBody::Expr(Box::new(Expr::bin(Op::Mul, name("x"), name("x")))),
        };
        assert_eq!(text(&square), "[&](auto x) { return x * x; }");
        let list = Expr::init("std::vector<int32_t>", vec![Expr::int(1), Expr::int(2)]);
        assert_eq!(text(&list), "std::vector<int32_t>{1, 2}");
        assert_eq!(text(&Expr::init("", vec![])), "{}");
        let pick = Expr::conditional(
            Expr::assign(name("a"), name("b")),
            Expr::int(1),
            Expr::int(2),
        );
        assert_eq!(text(&pick), "(a = b) ? 1 : 2");
    }

    #[test]
    fn test_top_level_code_runs_in_main() {
        let counter = ClassDecl {
            name: "Counter".into(),
            members: vec![
                Member::Field {
                    is_static: false,
                    ty: "int32_t".into(),
                    name: "count".into(),
                    value: Some(Expr::int(0)),
                },
                Member::Method(function(
                    "bump",
                    "void",
                    vec![Stmt::Expr(Expr::unary(
                        UnaryOp::PostIncrement,
                        name("this").arrow("count"),
                    ))],
                )),
            ],
            doc: Some("Counts things.".into()),
            ..ClassDecl::default()
        };
        let (code, warnings) = emit(vec![
            Item::Variable(Variable {
                ty: "auto".into(),
                name: "counter".into(),
                value: Some(Expr::call_path("std::make_shared<Counter>", vec![])),
                is_const: false,
            }),
            Item::Class(counter),
            Item::Statement(Stmt::Expr(Expr::call(name("counter").arrow("bump"), vec![]))),
        ]);
        assert!(warnings.is_empty());
        insta::assert_snapshot!(code, @r"
        #include <cstdint>
        #include <memory>

        /** Counts things. */
        class Counter {
        public:
            int32_t count = 0;

            void bump() {
                this->count++;
            }
        };

        auto counter = std::make_shared<Counter>();

        int main() {
            counter->bump();
            return 0;
        }
        ");
    }

    #[test]
    fn test_called_functions_get_prototypes() {
        let mut is_even = function(
            "isEven",
            "bool",
            vec![Stmt::Return(Some(Expr::call_path("isOdd", vec![name("n")])))],
        );
        is_even.params = vec![Param {
            ty: "int32_t".into(),
            name: "n".into(),
            default: Some(Expr::int(0)),
        }];
        let mut is_odd = function(
            "isOdd",
            "bool",
            vec![Stmt::Return(Some(Expr::call_path("isEven", vec![name("n")])))],
        );
        is_odd.params = vec![Param {
            ty: "int32_t".into(),
            name: "n".into(),
            default: None,
        }];
        let (code, _) = emit(vec![Item::Function(is_even), Item::Function(is_odd)]);
        insta::assert_snapshot!(code, @r"
        #include <cstdint>

        bool isEven(int32_t n = 0);
        bool isOdd(int32_t n);

        bool isEven(int32_t n) {
            return isOdd(n);
        }

        bool isOdd(int32_t n) {
            return isEven(n);
        }
        ");
    }

    #[test]
    fn test_bases_precede_subclasses() {
        let derived = ClassDecl {
            name: "Derived".into(),
            base: Some("Base".into()),
            ..ClassDecl::default()
        };
        let base = ClassDecl {
            name: "Base".into(),
            has_subclasses: true,
            ..ClassDecl::default()
        };
        let (code, _) = emit(vec![Item::Class(derived), Item::Class(base)]);
        insta::assert_snapshot!(code, @r"
        class Base;
        class Derived;

        class Base {
        public:
            virtual ~Base() = default;
        };

        class Derived : public Base {
        public:
        };
        ");
    }

    #[test]
    fn test_switch_sections_scope_declarations() {
        let (code, _) = emit(vec![Item::Statement(Stmt::Switch {
            subject: name("op"),
            sections: vec![
                SwitchSection {
                    labels: vec![Some(Expr::int(1)), Some(Expr::int(2))],
                    body: vec![Stmt::Local {
                        ty: "int32_t".into(),
                        name: "x".into(),
                        value: Some(Expr::int(3)),
                    }],
                    falls_through: true,
                },
                SwitchSection {
                    labels: vec![None],
                    body: vec![Stmt::Break],
                    falls_through: false,
                },
            ],
        })]);
        insta::assert_snapshot!(code, @r"
        #include <cstdint>

        int main() {
            switch (op) {
                case 1:
                case 2: {
                    int32_t x = 3;
                    [[fallthrough]];
                }
                default:
                    break;
            }
            return 0;
        }
        ");
    }

    #[test]
    fn test_failed_local_still_declares_its_name() {
        let (code, warnings) = emit(vec![Item::Function(function(
            "run",
            "void",
            vec![
                Stmt::Local {
                    ty: "auto".into(),
                    name: "x".into(),
                    value: Some(Expr::Placeholder("WithStatement".into())),
                },
                Stmt::Expr(Expr::bin(Op::Pow, name("a"), name("b"))),
            ],
        ))]);
        assert!(
            code.contains("std::any x{} /* unsupported construct: WithStatement */;"),
            "{code}"
        );
        assert!(code.contains("/* unsupported construct: operator ** */"), "{code}");
        assert!(code.starts_with("#include <any>\n"), "{code}");
        assert_eq!(warnings, ["unsupported construct: operator **"]);
    }

    #[test]
    fn test_namespace_wraps_declarations_and_main_uses_it() {
        let mut emitter = CppEmitter::new("  ");
        let code = emitter.emit(&TranslationUnit {
            namespace: Some("cipher".into()),
            helpers: vec!["inline int one() {\n    return 1;\n}"],
            items: vec![
                Item::Variable(Variable {
                    ty: "int".into(),
                    name: "rounds".into(),
                    value: Some(Expr::int(8)),
                    is_const: true,
                }),
                Item::Statement(Stmt::Return(None)),
            ],
            ..TranslationUnit::default()
        });
        insta::assert_snapshot!(code, @r"
        namespace rt {

        inline int one() {
            return 1;
        }

        }  // namespace rt

        namespace cipher {

        const int rounds = 8;

        }  // namespace cipher

        int main() {
          using namespace cipher;
          return;
          return 0;
        }
        ");
    }

    #[test]
    fn test_else_if_chains_and_catches() {
        let (code, _) = emit(vec![Item::Statement(Stmt::Try {
            body: vec![Stmt::If {
                test: name("a"),
                then: vec![Stmt::Throw(None)],
                otherwise: vec![Stmt::If {
                    test: name("b"),
                    then: vec![],
                    otherwise: vec![Stmt::Break],
                }],
            }],
            catches: vec![
                Catch {
                    ty: Some("std::exception".into()),
                    name: Some("e".into()),
                    body: vec![],
                },
                Catch {
                    ty: None,
                    name: None,
                    body: vec![],
                },
            ],
        })]);
        insta::assert_snapshot!(code, @r"
        #include <exception>

        int main() {
            try {
                if (a) {
                    throw;
                } else if (b) {
                } else {
                    break;
                }
            } catch (const std::exception& e) {
            } catch (...) {
            }
            return 0;
        }
        ");
    }

    #[test]
    fn test_mentions_skip_members() {
        assert!(mentions("auto x = make(1);", "make"));
        assert!(!mentions("auto x = remake(1);", "make"));
        assert!(!mentions("p->make(1);", "make"));
        assert!(!mentions("p.make(1);", "make"));
    }
}
