//! Python source printer.

use super::ast::*;
use crate::escape::{comment_text, python_string};
use crate::precedence::{Assoc, Op, Side, needs_parens};
use crate::reorder::{Bucket, reorder};
use crate::traits::Emitter;
use crate::writer::{EmitError, Indented, SourceWriter};
use std::collections::HashSet;

// Precedence levels, loosest first.
const LAMBDA: u8 = 1;
const IF_EXP: u8 = 2;
const OR: u8 = 3;
const AND: u8 = 4;
const NOT: u8 = 5;
const COMPARE: u8 = 6;
const BIT_OR: u8 = 7;
const BIT_XOR: u8 = 8;
const BIT_AND: u8 = 9;
const SHIFT: u8 = 10;
const ARITH: u8 = 11;
const TERM: u8 = 12;
const UNARY: u8 = 13;
const POWER: u8 = 14;
const AWAIT: u8 = 15;
const PRIMARY: u8 = 16;
const ATOM: u8 = 17;

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

    /// The text, parenthesized when it binds looser than `min`.
    fn at_least(self, min: u8) -> String {
        if self.level < min {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

pub struct PythonEmitter {
    out: SourceWriter,
    unit: String,
    warnings: Vec<String>,
}

impl PythonEmitter {
    pub fn new(indent: &str) -> Self {
        Self {
            out: SourceWriter::new(indent),
            unit: indent.to_string(),
            warnings: Vec::new(),
        }
    }

    fn module(&mut self, module: &Module) {
        if let Some(docstring) = &module.docstring {
            self.docstring(docstring);
        }
        self.imports(&module.imports);

        let mut classes: HashSet<&str> = HashSet::new();
        for stmt in module.stubs.iter().chain(&module.body) {
            if let Stmt::ClassDef(class) = stmt {
                classes.insert(class.name.as_str());
            }
        }
        let body = order_declarations(&module.body, &classes);
        if !module.imports.is_empty() && !(module.stubs.is_empty() && body.is_empty()) {
            self.out.blank();
        }
        self.top_level(module.stubs.iter().chain(body));
    }

    fn imports(&mut self, imports: &[Import]) {
        let (future, rest): (Vec<&Import>, Vec<&Import>) =
            imports.iter().partition(|import| import.module == "__future__");
        let (plain, from): (Vec<&Import>, Vec<&Import>) =
            rest.into_iter().partition(|import| import.names.is_empty());
        for import in future {
            self.out
                .line(&format!("from {} import {}", import.module, import.names.join(", ")));
        }
        for import in plain {
            self.out.line(&format!("import {}", import.module));
        }
        for import in from {
            self.out
                .line(&format!("from {} import {}", import.module, import.names.join(", ")));
        }
    }

    /// Module-level statements, with two blank lines around definitions.
    fn top_level<'a>(&mut self, stmts: impl Iterator<Item = &'a Stmt>) {
        let mut after_definition = false;
        for stmt in stmts {
            let definition = matches!(stmt, Stmt::FunctionDef(_) | Stmt::ClassDef(_));
            if definition || after_definition {
                self.out.blank_lines(2);
            }
            self.statement(stmt);
            after_definition = definition;
        }
    }

    fn docstring(&mut self, text: &str) {
        let mut escaped = text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"");
        if escaped.ends_with('"') {
            escaped.pop();
            escaped.push_str("\\\"");
        }
        if escaped.contains('\n') {
            let mut lines = escaped.lines();
            let first = lines.next().unwrap_or_default();
            self.out.line(&format!("\"\"\"{first}"));
            for line in lines {
                self.out.line(line.trim_end());
            }
            self.out.line("\"\"\"");
        } else {
            self.out.line(&format!("\"\"\"{escaped}\"\"\""));
        }
    }

    /// Print one statement; a failure leaves a `pass` marker in its place.
    fn statement(&mut self, stmt: &Stmt) {
        if let Some(err) = self.guarded(|this| this.try_statement(stmt)) {
            self.out.line(&format!("pass  # {}", comment_text(&err.to_string())));
            if err.is_new() {
                self.warnings.push(err.to_string());
            }
        }
    }

    fn block(&mut self, body: &[Stmt]) {
        self.indented(|this| {
            if body.is_empty() {
                this.out.line("pass");
            }
            for stmt in body {
                this.statement(stmt);
            }
        });
    }

    fn try_statement(&mut self, stmt: &Stmt) -> Result<(), EmitError> {
        match stmt {
            Stmt::Expr(expr) => {
                let text = expr_text(expr)?;
                self.out.line(&text);
            }
            Stmt::Assign { targets, value } => {
                let mut parts = Vec::with_capacity(targets.len() + 1);
                for target in targets {
                    parts.push(bare_tuple(target)?);
                }
                parts.push(bare_tuple(value)?);
                self.out.line(&parts.join(" = "));
            }
            Stmt::AnnAssign {
                target,
                annotation,
                value,
            } => match value {
                Some(value) => {
                    let value = bare_tuple(value)?;
                    self.out.line(&format!("{target}: {annotation} = {value}"));
                }
                None => self.out.line(&format!("{target}: {annotation}")),
            },
            Stmt::AugAssign { target, op, value } => {
                let (spelling, _, _) = op_info(*op)?;
                let target = expr_text(target)?;
                let value = bare_tuple(value)?;
                self.out.line(&format!("{target} {spelling}= {value}"));
            }
            Stmt::If { test, body, orelse } => self.if_chain("if", test, body, orelse)?,
            Stmt::While { test, body } => {
                let test = expr_text(test)?;
                self.out.line(&format!("while {test}:"));
                self.block(body);
            }
            Stmt::For { target, iter, body } => {
                let target = bare_tuple(target)?;
                let iter = bare_tuple(iter)?;
                self.out.line(&format!("for {target} in {iter}:"));
                self.block(body);
            }
            Stmt::Return(None) => self.out.line("return"),
            Stmt::Return(Some(value)) => {
                let value = bare_tuple(value)?;
                self.out.line(&format!("return {value}"));
            }
            Stmt::Break => self.out.line("break"),
            Stmt::Continue => self.out.line("continue"),
            Stmt::Pass => self.out.line("pass"),
            Stmt::Raise(None) => self.out.line("raise"),
            Stmt::Raise(Some(exception)) => {
                let exception = expr_text(exception)?;
                self.out.line(&format!("raise {exception}"));
            }
            Stmt::Try {
                body,
                handlers,
                finalbody,
            } => {
                self.out.line("try:");
                self.block(body);
                for handler in handlers {
                    match &handler.name {
                        Some(name) => self.out.line(&format!("except Exception as {name}:")),
                        None => self.out.line("except Exception:"),
                    }
                    self.block(&handler.body);
                }
                if !finalbody.is_empty() || handlers.is_empty() {
                    self.out.line("finally:");
                    self.block(finalbody);
                }
            }
            Stmt::FunctionDef(def) => self.function(def)?,
            Stmt::ClassDef(class) => self.class(class)?,
            Stmt::Global(names) => self.out.line(&format!("global {}", names.join(", "))),
            Stmt::Nonlocal(names) => self.out.line(&format!("nonlocal {}", names.join(", "))),
            Stmt::Delete(target) => {
                let target = expr_text(target)?;
                self.out.line(&format!("del {target}"));
            }
            Stmt::Placeholder(what) => return Err(EmitError::Placeholder(what.clone())),
        }
        Ok(())
    }

    fn if_chain(
        &mut self,
        keyword: &str,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> Result<(), EmitError> {
        let test = expr_text(test)?;
        self.out.line(&format!("{keyword} {test}:"));
        self.block(body);
        match orelse {
            [] => {}
            [Stmt::If { test, body, orelse }] => self.if_chain("elif", test, body, orelse)?,
            _ => {
                self.out.line("else:");
                self.block(orelse);
            }
        }
        Ok(())
    }

    fn function(&mut self, def: &FunctionDef) -> Result<(), EmitError> {
        let mut params = Vec::with_capacity(def.params.len());
        for param in &def.params {
            params.push(param_text(param)?);
        }
        let returns = match &def.returns {
            Some(returns) => format!(" -> {returns}"),
            None => String::new(),
        };
        for decorator in &def.decorators {
            self.out.line(&format!("@{decorator}"));
        }
        let keyword = if def.is_async { "async def" } else { "def" };
        self.out
            .line(&format!("{keyword} {}({}){returns}:", def.name, params.join(", ")));
        match &def.docstring {
            Some(docstring) => self.indented(|this| {
                this.docstring(docstring);
                for stmt in &def.body {
                    this.statement(stmt);
                }
            }),
            None => self.block(&def.body),
        }
        Ok(())
    }

    fn class(&mut self, class: &ClassDef) -> Result<(), EmitError> {
        let mut bases = Vec::with_capacity(class.bases.len());
        for base in &class.bases {
            bases.push(expr_text(base)?);
        }
        if bases.is_empty() {
            self.out.line(&format!("class {}:", class.name));
        } else {
            self.out.line(&format!("class {}({}):", class.name, bases.join(", ")));
        }
        self.indented(|this| {
            if let Some(docstring) = &class.docstring {
                this.docstring(docstring);
            } else if class.body.is_empty() {
                this.out.line("pass");
            }
            let mut after_definition = class.docstring.is_some();
            for stmt in &class.body {
                let definition = matches!(stmt, Stmt::FunctionDef(_));
                if definition || after_definition {
                    this.out.blank();
                }
                this.statement(stmt);
                after_definition = definition;
            }
        });
        Ok(())
    }
}

impl Indented for PythonEmitter {
    fn writer(&mut self) -> &mut SourceWriter {
        &mut self.out
    }
}

impl Emitter for PythonEmitter {
    type Unit = Module;

    fn emit(&mut self, module: &Module) -> String {
        self.out = SourceWriter::new(&self.unit);
        self.module(module);
        std::mem::replace(&mut self.out, SourceWriter::new(&self.unit)).finish()
    }

    fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

/// Module statements grouped so that every class exists before module code
/// instantiates it.
fn order_declarations<'a>(body: &'a [Stmt], classes: &HashSet<&str>) -> Vec<&'a Stmt> {
    // Names whose definition moves behind the plain variables.
    let mut late: HashSet<&str> = body
        .iter()
        .filter_map(|stmt| match stmt {
            Stmt::FunctionDef(def) => Some(def.name.as_str()),
            Stmt::ClassDef(class) => Some(class.name.as_str()),
            _ => None,
        })
        .collect();
    let mut constructing: HashSet<usize> = HashSet::new();
    loop {
        let mut changed = false;
        for (i, stmt) in body.iter().enumerate() {
            if constructing.contains(&i) {
                continue;
            }
            let Some((names, value)) = variable(stmt) else {
                continue;
            };
            let Some(value) = value else {
                continue;
            };
            let builds = value.any(&mut |expr| match expr {
                Expr::Call { func, .. } => {
                    matches!(func.as_ref(), Expr::Name(name) if classes.contains(name.as_str()))
                }
                Expr::Name(name) => late.contains(name.as_str()),
                _ => false,
            });
            if builds {
                constructing.insert(i);
                late.extend(names);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let indexed: Vec<(usize, &Stmt)> = body.iter().enumerate().collect();
    reorder(indexed, |(i, stmt)| match stmt {
        Stmt::FunctionDef(_) => Bucket::Function,
        Stmt::ClassDef(_) => Bucket::Type,
        _ if variable(stmt).is_none() => Bucket::Other,
        _ if constructing.contains(i) => Bucket::ConstructingVariable,
        _ => Bucket::PlainVariable,
    })
    .into_iter()
    .map(|(_, stmt)| stmt)
    .collect()
}

/// Names bound by a plain variable assignment, and the assigned value.
fn variable(stmt: &Stmt) -> Option<(Vec<&str>, Option<&Expr>)> {
    match stmt {
        Stmt::Assign { targets, value } => {
            let mut names = Vec::new();
            for target in targets {
                match target {
                    Expr::Name(name) => names.push(name.as_str()),
                    _ => return None,
                }
            }
            Some((names, Some(value)))
        }
        Stmt::AnnAssign { target, value, .. } => Some((vec![target.as_str()], value.as_ref())),
        _ => None,
    }
}

fn op_info(op: Op) -> Result<(&'static str, u8, Assoc), EmitError> {
    Ok(match op {
        Op::Or => ("or", OR, Assoc::Left),
        Op::And => ("and", AND, Assoc::Left),
        Op::Eq => ("==", COMPARE, Assoc::None),
        Op::Ne => ("!=", COMPARE, Assoc::None),
        Op::Lt => ("<", COMPARE, Assoc::None),
        Op::Le => ("<=", COMPARE, Assoc::None),
        Op::Gt => (">", COMPARE, Assoc::None),
        Op::Ge => (">=", COMPARE, Assoc::None),
        Op::Is => ("is", COMPARE, Assoc::None),
        Op::IsNot => ("is not", COMPARE, Assoc::None),
        Op::In => ("in", COMPARE, Assoc::None),
        Op::NotIn => ("not in", COMPARE, Assoc::None),
        Op::BitOr => ("|", BIT_OR, Assoc::Left),
        Op::BitXor => ("^", BIT_XOR, Assoc::Left),
        Op::BitAnd => ("&", BIT_AND, Assoc::Left),
        Op::Shl => ("<<", SHIFT, Assoc::Left),
        Op::Shr => (">>", SHIFT, Assoc::Left),
        Op::Add => ("+", ARITH, Assoc::Left),
        Op::Sub => ("-", ARITH, Assoc::Left),
        Op::Mul => ("*", TERM, Assoc::Left),
        Op::Div => ("/", TERM, Assoc::Left),
        Op::FloorDiv => ("//", TERM, Assoc::Left),
        Op::Mod => ("%", TERM, Assoc::Left),
        Op::Pow => ("**", POWER, Assoc::Right),
        Op::UShr | Op::Coalesce => {
            return Err(EmitError::Invalid(format!("operator {}", op.c_spelling())));
        }
    })
}

fn expr_text(expr: &Expr) -> Result<String, EmitError> {
    Ok(render(expr)?.text)
}

/// Tuples without their parentheses, where Python allows it.
fn bare_tuple(expr: &Expr) -> Result<String, EmitError> {
    match expr {
        Expr::Tuple(items) if items.len() > 1 => Ok(list_text(items)?.join(", ")),
        other => expr_text(other),
    }
}

fn list_text(items: &[Expr]) -> Result<Vec<String>, EmitError> {
    items.iter().map(|item| Ok(render(item)?.at_least(LAMBDA))).collect()
}

fn param_text(param: &Param) -> Result<String, EmitError> {
    let star = if param.variadic { "*" } else { "" };
    let mut text = format!("{star}{}", param.name);
    if let Some(annotation) = &param.annotation {
        text.push_str(": ");
        text.push_str(annotation);
    }
    if let Some(default) = &param.default {
        let default = render(default)?.at_least(IF_EXP);
        let equals = if param.annotation.is_some() { " = " } else { "=" };
        text.push_str(equals);
        text.push_str(&default);
    }
    Ok(text)
}

fn render(expr: &Expr) -> Result<Rendered, EmitError> {
    Ok(match expr {
        Expr::Name(name) => Rendered::atom(name.clone()),
        Expr::Int(text) | Expr::Float(text) => {
            let level = if text.starts_with('-') { UNARY } else { ATOM };
            Rendered::new(text.clone(), level)
        }
        Expr::Str(value) => Rendered::atom(python_string(value)),
        Expr::Bool(true) => Rendered::atom("True".into()),
        Expr::Bool(false) => Rendered::atom("False".into()),
        Expr::None => Rendered::atom("None".into()),
        Expr::FString(parts) => fstring(parts)?,
        Expr::BinOp { op, left, right } => {
            let (spelling, level, assoc) = op_info(*op)?;
            let left = render(left)?;
            let right = render(right)?;
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
            let operand = render(operand)?;
            match op {
                UnaryOp::Not => Rendered::new(format!("not {}", operand.at_least(NOT)), NOT),
                UnaryOp::Neg => Rendered::new(format!("-{}", operand.at_least(UNARY)), UNARY),
                UnaryOp::Pos => Rendered::new(format!("+{}", operand.at_least(UNARY)), UNARY),
                UnaryOp::Invert => Rendered::new(format!("~{}", operand.at_least(UNARY)), UNARY),
            }
        }
        Expr::Call {
            func,
            args,
            keywords,
        } => {
            let func = render(func)?.at_least(PRIMARY);
            let mut rendered = Vec::with_capacity(args.len() + keywords.len());
            match (args.as_slice(), keywords.is_empty()) {
                ([generator @ Expr::Comprehension { kind: CompKind::Generator, .. }], true) => {
                    rendered.push(comprehension_body(generator)?);
                }
                _ => rendered.extend(list_text(args)?),
            }
            for (name, value) in keywords {
                rendered.push(format!("{name}={}", render(value)?.at_least(LAMBDA)));
            }
            Rendered::new(format!("{func}({})", rendered.join(", ")), PRIMARY)
        }
        Expr::Attribute { value, attr } => {
            let value = match value.as_ref() {
                Expr::Int(_) | Expr::Float(_) => format!("({})", render(value)?.text),
                other => render(other)?.at_least(PRIMARY),
            };
            Rendered::new(format!("{value}.{attr}"), PRIMARY)
        }
        Expr::Subscript { value, index } => {
            let value = render(value)?.at_least(PRIMARY);
            let index = match index.as_ref() {
                Expr::Slice { lower, upper, step } => {
                    let part = |part: &Option<Box<Expr>>| -> Result<String, EmitError> {
                        match part {
                            Some(part) => Ok(render(part)?.at_least(IF_EXP)),
                            None => Ok(String::new()),
                        }
                    };
                    let mut text = format!("{}:{}", part(lower)?, part(upper)?);
                    if step.is_some() {
                        text.push(':');
                        text.push_str(&part(step)?);
                    }
                    text
                }
                other => render(other)?.text,
            };
            Rendered::new(format!("{value}[{index}]"), PRIMARY)
        }
        Expr::Slice { .. } => {
            return Err(EmitError::Invalid("slice outside a subscript".into()));
        }
        Expr::List(items) => Rendered::atom(format!("[{}]", list_text(items)?.join(", "))),
        Expr::Tuple(items) => match items.as_slice() {
            [single] => Rendered::atom(format!("({},)", render(single)?.at_least(LAMBDA))),
            _ => Rendered::atom(format!("({})", list_text(items)?.join(", "))),
        },
        Expr::Dict(items) => {
            let mut rendered = Vec::with_capacity(items.len());
            for item in items {
                rendered.push(match item {
                    DictItem::Pair(key, value) => format!(
                        "{}: {}",
                        render(key)?.at_least(IF_EXP),
                        render(value)?.at_least(LAMBDA)
                    ),
                    DictItem::Spread(value) => format!("**{}", render(value)?.at_least(BIT_OR)),
                });
            }
            Rendered::atom(format!("{{{}}}", rendered.join(", ")))
        }
        Expr::Lambda { params, body } => {
            let body = render(body)?.at_least(LAMBDA);
            if params.is_empty() {
                Rendered::new(format!("lambda: {body}"), LAMBDA)
            } else {
                Rendered::new(format!("lambda {}: {body}", params.join(", ")), LAMBDA)
            }
        }
        Expr::IfExp { test, body, orelse } => {
            let body = render(body)?.at_least(IF_EXP + 1);
            let test = render(test)?.at_least(IF_EXP + 1);
            let orelse = render(orelse)?.at_least(IF_EXP);
            Rendered::new(format!("{body} if {test} else {orelse}"), IF_EXP)
        }
        Expr::Comprehension { kind, .. } => {
            let body = comprehension_body(expr)?;
            match kind {
                CompKind::List => Rendered::atom(format!("[{body}]")),
                CompKind::Generator => Rendered::atom(format!("({body})")),
            }
        }
        Expr::Starred(value) => Rendered::atom(format!("*{}", render(value)?.at_least(BIT_OR))),
        Expr::Await(value) => {
            Rendered::new(format!("await {}", render(value)?.at_least(PRIMARY)), AWAIT)
        }
        Expr::Walrus { target, value } => {
            Rendered::atom(format!("({target} := {})", render(value)?.at_least(LAMBDA)))
        }
        Expr::Placeholder(what) => return Err(EmitError::Placeholder(what.clone())),
    })
}

/// `element for target in iter if condition`, without brackets.
fn comprehension_body(expr: &Expr) -> Result<String, EmitError> {
    let Expr::Comprehension {
        element,
        target,
        iter,
        condition,
        ..
    } = expr
    else {
        return Err(EmitError::Invalid("comprehension".into()));
    };
    let mut text = format!(
        "{} for {} in {}",
        render(element)?.at_least(IF_EXP),
        bare_tuple(target)?,
        render(iter)?.at_least(OR)
    );
    if let Some(condition) = condition {
        text.push_str(" if ");
        text.push_str(&render(condition)?.at_least(OR));
    }
    Ok(text)
}

/// An f-string, or a `+` chain when a hole holds text an f-string cannot.
fn fstring(parts: &[FPart]) -> Result<Rendered, EmitError> {
    let mut text = String::from("f\"");
    let mut portable = true;
    for part in parts {
        match part {
            FPart::Text(literal) => {
                for c in literal.chars() {
                    match c {
                        '{' => text.push_str("{{"),
                        '}' => text.push_str("}}"),
                        '"' => text.push_str("\\\""),
                        '\\' => text.push_str("\\\\"),
                        '\n' => text.push_str("\\n"),
                        '\r' => text.push_str("\\r"),
                        '\t' => text.push_str("\\t"),
                        c => text.push(c),
                    }
                }
            }
            FPart::Expr(expr) => {
                let hole = render(expr)?.at_least(IF_EXP);
                if hole.contains(['"', '\'', '\\', '#', '\n']) {
                    portable = false;
                    break;
                }
                text.push('{');
                if hole.starts_with('{') {
                    text.push(' ');
                }
                text.push_str(&hole);
                text.push('}');
            }
        }
    }
    if portable {
        text.push('"');
        return Ok(Rendered::atom(text));
    }

    let mut chain: Option<Expr> = None;
    for part in parts {
        let piece = match part {
            FPart::Text(literal) => Expr::Str(literal.clone()),
            FPart::Expr(expr) => Expr::call_named("str", vec![expr.clone()]),
        };
        chain = Some(match chain {
            Some(chain) => Expr::bin(Op::Add, chain, piece),
            None => piece,
        });
    }
    render(&chain.unwrap_or_else(|| Expr::str("")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(body: Vec<Stmt>) -> (String, Vec<String>) {
        let mut emitter = PythonEmitter::new("    ");
        let code = emitter.emit(&Module {
            body,
            ..Module::default()
        });
        (code, emitter.take_warnings())
    }

    fn name(n: &str) -> Expr {
        Expr::name(n)
    }

    #[test]
    fn test_grouping_parentheses_survive() {
        let sum_times = Expr::bin(Op::Mul, Expr::bin(Op::Add, name("a"), name("b")), name("c"));
        let nested_sub = Expr::bin(Op::Sub, name("a"), Expr::bin(Op::Sub, name("b"), name("c")));
        assert_eq!(expr_text(&sum_times).unwrap(), "(a + b) * c");
        assert_eq!(expr_text(&nested_sub).unwrap(), "a - (b - c)");
        assert_eq!(
            expr_text(&Expr::bin(Op::Sub, Expr::bin(Op::Sub, name("a"), name("b")), name("c"))).unwrap(),
            "a - b - c"
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let right = Expr::bin(Op::Pow, name("a"), Expr::bin(Op::Pow, name("b"), name("c")));
        let left = Expr::bin(Op::Pow, Expr::bin(Op::Pow, name("a"), name("b")), name("c"));
        assert_eq!(expr_text(&right).unwrap(), "a ** b ** c");
        assert_eq!(expr_text(&left).unwrap(), "(a ** b) ** c");
    }

    #[test]
    fn test_comparisons_do_not_chain() {
        let nested = Expr::bin(Op::Eq, Expr::bin(Op::Lt, name("a"), name("b")), Expr::Bool(true));
        assert_eq!(expr_text(&nested).unwrap(), "(a < b) == True");
    }

    #[test]
    fn test_else_if_becomes_elif() {
        let (code, _) = emit(vec![Stmt::If {
            test: name("a"),
            body: vec![Stmt::Pass],
            orelse: vec![Stmt::If {
                test: name("b"),
                body: vec![],
                orelse: vec![Stmt::Break],
            }],
        }]);
        assert_eq!(code, "if a:\n    pass\nelif b:\n    pass\nelse:\n    break\n");
    }

    #[test]
    fn test_fstring_falls_back_to_concatenation() {
        let simple = Expr::FString(vec![FPart::Text("n=".into()), FPart::Expr(name("n"))]);
        assert_eq!(expr_text(&simple).unwrap(), "f\"n={n}\"");
        let quoted = Expr::FString(vec![
            FPart::Text("k=".into()),
            FPart::Expr(name("d").index(Expr::str("k"))),
        ]);
        assert_eq!(expr_text(&quoted).unwrap(), "\"k=\" + str(d[\"k\"])");
    }

    #[test]
    fn test_placeholder_leaves_marker_without_new_warning() {
        let (code, warnings) = emit(vec![
            Stmt::assign(name("x"), Expr::Placeholder("WithStatement".into())),
            Stmt::Expr(Expr::bin(Op::Coalesce, name("a"), name("b"))),
        ]);
        assert!(code.contains("pass  # unsupported construct: WithStatement"), "{code}");
        assert_eq!(warnings, ["unsupported construct: operator ??"]);
    }

    #[test]
    fn test_classes_precede_their_construction() {
        let class = Stmt::ClassDef(ClassDef {
            name: "A".into(),
            bases: vec![],
            body: vec![],
            docstring: None,
        });
        let (code, _) = emit(vec![
            Stmt::assign(name("x"), Expr::call_named("A", vec![])),
            Stmt::assign(name("n"), Expr::int(1)),
            class,
        ]);
        assert_eq!(code, "n = 1\n\n\nclass A:\n    pass\n\n\nx = A()\n");
    }

    #[test]
    fn test_sole_generator_argument_drops_parens() {
        let call = Expr::call_named(
            "any",
            vec![Expr::Comprehension {
                kind: CompKind::Generator,
                element: Box::new(name("x")),
                target: Box::new(name("x")),
                iter: Box::new(name("xs")),
                condition: None,
            }],
        );
        assert_eq!(expr_text(&call).unwrap(), "any(x for x in xs)");
    }
}
