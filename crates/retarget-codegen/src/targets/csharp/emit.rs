//! C# source printer. Braces go on their own lines.

use super::ast::*;
use crate::escape::{comment_text, csharp_string};
use crate::precedence::{Assoc, Op, Side, needs_parens};
use crate::traits::Emitter;
use crate::writer::{EmitError, Indented, SourceWriter};

// Precedence levels, loosest first.
const ASSIGN: u8 = 1;
const CONDITIONAL: u8 = 2;
const COALESCE: u8 = 3;
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
const PRIMARY: u8 = 15;
const ATOM: u8 = 16;

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

pub struct CSharpEmitter {
    out: SourceWriter,
    unit: String,
    warnings: Vec<String>,
}

impl CSharpEmitter {
    pub fn new(indent: &str) -> Self {
        Self {
            out: SourceWriter::new(indent),
            unit: indent.to_string(),
            warnings: Vec::new(),
        }
    }

    fn compilation_unit(&mut self, unit: &CompilationUnit) {
        if unit.nullable {
            self.out.line("#nullable enable");
            self.out.blank();
        }
        for using in &unit.usings {
            self.out.line(&format!("using {using};"));
        }
        self.out.blank();
        self.out.line(&format!("namespace {};", unit.namespace));
        for class in unit.stubs.iter().chain(&unit.classes) {
            self.out.blank();
            self.class(class);
        }
        self.out.blank();
        self.class(&unit.program);
    }

    fn doc(&mut self, doc: Option<&str>) {
        let Some(doc) = doc else {
            return;
        };
        self.out.line("/// <summary>");
        for line in doc.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                self.out.line("///");
            } else {
                self.out.line(&format!("/// {}", xml_text(line)));
            }
        }
        self.out.line("/// </summary>");
    }

    fn class(&mut self, class: &ClassDecl) {
        self.doc(class.doc.as_deref());
        let mut header = modifiers(&class.modifiers);
        header.push_str("class ");
        header.push_str(&class.name);
        if let Some(base) = &class.base {
            header.push_str(" : ");
            header.push_str(base);
        }
        self.out.line(&header);
        self.out.line("{");
        self.indented(|this| {
            let mut previous_field = None;
            for member in &class.members {
                let field = matches!(member, Member::Field { .. });
                // Fields group together; everything else is spaced out.
                if previous_field.is_some() && !(field && previous_field == Some(true)) {
                    this.out.blank();
                }
                this.member(member);
                previous_field = Some(field);
            }
        });
        self.out.line("}");
    }

    fn member(&mut self, member: &Member) {
        if let Some(err) = self.guarded(|this| this.try_member(member)) {
            self.out.line(&format!("/* {} */", comment_text(&err.to_string())));
            if err.is_new() {
                self.warnings.push(err.to_string());
            }
        }
    }

    fn try_member(&mut self, member: &Member) -> Result<(), EmitError> {
        match member {
            Member::Field {
                modifiers: mods,
                ty,
                name,
                value,
            } => {
                let mut text = format!("{}{ty} {name}", modifiers(mods));
                if let Some(value) = value {
                    text.push_str(" = ");
                    text.push_str(&self.render(value)?.at_least(ASSIGN));
                }
                text.push(';');
                self.out.lines(&text);
            }
            Member::Property {
                modifiers: mods,
                ty,
                name,
                getter,
                setter,
            } => {
                self.out.line(&format!("{}{ty} {name}", modifiers(mods)));
                self.out.line("{");
                self.indented(|this| {
                    if let Some(getter) = getter {
                        this.out.line("get");
                        this.block(getter);
                    }
                    if let Some(setter) = setter {
                        this.out.line("set");
                        this.block(setter);
                    }
                });
                self.out.line("}");
            }
            Member::Constructor {
                name,
                params,
                base_args,
                body,
                doc,
            } => {
                let params = self.params(params)?;
                let chained = match base_args {
                    Some(args) => format!(" : base({})", self.list(args)?.join(", ")),
                    None => String::new(),
                };
                self.doc(doc.as_deref());
                self.out.line(&format!("public {name}({params}){chained}"));
                self.block(body);
            }
            Member::StaticConstructor { name, body } => {
                self.out.line(&format!("static {name}()"));
                self.block(body);
            }
            Member::Method(method) => self.method(method)?,
            Member::Verbatim(text) => self.out.lines(text),
            Member::Placeholder(what) => return Err(EmitError::Placeholder(what.clone())),
        }
        Ok(())
    }

    fn method(&mut self, method: &Method) -> Result<(), EmitError> {
        let params = self.params(&method.params)?;
        self.doc(method.doc.as_deref());
        self.out.line(&format!(
            "{}{} {}({params})",
            modifiers(&method.modifiers),
            method.returns,
            method.name
        ));
        self.block(&method.body);
        Ok(())
    }

    fn params(&mut self, params: &[Param]) -> Result<String, EmitError> {
        let mut rendered = Vec::with_capacity(params.len());
        for param in params {
            let mut text = String::new();
            if param.variadic {
                text.push_str("params ");
            }
            text.push_str(&param.ty);
            text.push(' ');
            text.push_str(&param.name);
            if let Some(default) = &param.default {
                text.push_str(" = ");
                text.push_str(&self.render(default)?.at_least(ASSIGN));
            }
            rendered.push(text);
        }
        Ok(rendered.join(", "))
    }

    /// `{ ... }` on lines of their own.
    fn block(&mut self, body: &[Stmt]) {
        self.out.line("{");
        self.indented(|this| {
            for stmt in body {
                this.statement(stmt);
            }
        });
        self.out.line("}");
    }

    /// Print one statement; a failure leaves a comment marker in its place.
    /// A failed local still declares its name so later uses resolve.
    fn statement(&mut self, stmt: &Stmt) {
        let Some(err) = self.guarded(|this| this.try_statement(stmt)) else {
            return;
        };
        let marker = format!("/* {} */", comment_text(&err.to_string()));
        match stmt {
            Stmt::Local { ty, name, .. } => {
                let ty = ty.as_deref().unwrap_or("dynamic");
                self.out.line(&format!("{ty} {name} = default! {marker};"));
            }
            _ => self.out.line(&marker),
        }
        if err.is_new() {
            self.warnings.push(err.to_string());
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
            } => self.if_chain("if", test, then, otherwise)?,
            Stmt::While { test, body } => {
                let test = self.expr_text(test)?;
                self.out.lines(&format!("while ({test})"));
                self.block(body);
            }
            Stmt::DoWhile { body, test } => {
                let test = self.expr_text(test)?;
                self.out.line("do");
                self.block(body);
                self.out.lines(&format!("while ({test});"));
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
                self.out.lines(&format!("for ({init};{test};{update})"));
                self.block(body);
            }
            Stmt::ForEach {
                ty,
                name,
                iter,
                body,
            } => {
                let iter = self.expr_text(iter)?;
                let ty = ty.as_deref().unwrap_or("var");
                self.out.lines(&format!("foreach ({ty} {name} in {iter})"));
                self.block(body);
            }
            Stmt::Switch { subject, sections } => {
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
                self.out.lines(&format!("switch ({subject})"));
                self.out.line("{");
                self.indented(|this| {
                    for (section, labels) in sections.iter().zip(labels) {
                        for label in labels {
                            this.out.line(&label);
                        }
                        this.indented(|this| {
                            for stmt in &section.body {
                                this.statement(stmt);
                            }
                        });
                    }
                });
                self.out.line("}");
            }
            Stmt::Break => self.out.line("break;"),
            Stmt::Continue => self.out.line("continue;"),
            Stmt::Return(None) => self.out.line("return;"),
            Stmt::Return(Some(value)) => {
                let value = self.expr_text(value)?;
                self.out.lines(&format!("return {value};"));
            }
            Stmt::Throw(None) => self.out.line("throw;"),
            Stmt::Throw(Some(value)) => {
                let value = self.expr_text(value)?;
                self.out.lines(&format!("throw {value};"));
            }
            Stmt::Try {
                body,
                catch,
                finally,
            } => {
                self.out.line("try");
                self.block(body);
                if let Some(catch) = catch {
                    match &catch.name {
                        Some(name) => self.out.line(&format!("catch (Exception {name})")),
                        None => self.out.line("catch"),
                    }
                    self.block(&catch.body);
                }
                if !finally.is_empty() || catch.is_none() {
                    self.out.line("finally");
                    self.block(finally);
                }
            }
            Stmt::Block(body) => self.block(body),
            Stmt::LocalFunction(method) => self.method(method)?,
            Stmt::Goto(GotoTarget::Label(label)) => self.out.line(&format!("goto {label};")),
            Stmt::Goto(GotoTarget::Case(value)) => {
                let value = self.expr_text(value)?;
                self.out.line(&format!("goto case {value};"));
            }
            Stmt::Goto(GotoTarget::Default) => self.out.line("goto default;"),
            Stmt::Label(label) => self.out.line(&format!("{label}: ;")),
            Stmt::Placeholder(what) => return Err(EmitError::Placeholder(what.clone())),
        }
        Ok(())
    }

    fn if_chain(&mut self, keyword: &str, test: &Expr, then: &[Stmt], otherwise: &[Stmt]) -> Result<(), EmitError> {
        let test = self.expr_text(test)?;
        self.out.lines(&format!("{keyword} ({test})"));
        self.block(then);
        match otherwise {
            [] => {}
            [
                Stmt::If {
                    test,
                    then,
                    otherwise,
                },
            ] => self.if_chain("else if", test, then, otherwise)?,
            _ => {
                self.out.line("else");
                self.block(otherwise);
            }
        }
        Ok(())
    }

    /// `T name = value` without the semicolon.
    fn local(&mut self, stmt: &Stmt) -> Result<String, EmitError> {
        let Stmt::Local { ty, name, value } = stmt else {
            return Err(EmitError::Invalid("declaration".into()));
        };
        Ok(match (ty, value) {
            (Some(ty), Some(value)) => format!("{ty} {name} = {}", self.render(value)?.at_least(ASSIGN)),
            (None, Some(value)) => format!("var {name} = {}", self.render(value)?.at_least(ASSIGN)),
            (Some(ty), None) => format!("{ty} {name}"),
            (None, None) => format!("dynamic {name}"),
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
                    .all(|stmt| matches!(stmt, Stmt::Local { ty, value: Some(_), .. } if ty == first && ty.is_some())) =>
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
                Ok(format!("{} {}", first.as_deref().unwrap_or("var"), parts.join(", ")))
            }
            _ => {
                let mut parts = Vec::with_capacity(init.len());
                for stmt in init {
                    match stmt {
                        Stmt::Expr(expr) => parts.push(self.expr_text(expr)?),
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

    /// Statements of a block lambda, at indentation level zero.
    fn nested_block(&mut self, body: &[Stmt]) -> String {
        let mut nested = CSharpEmitter::new(&self.unit);
        nested.block(body);
        self.warnings.append(&mut nested.warnings);
        nested.out.finish().trim_end().to_string()
    }

    fn render(&mut self, expr: &Expr) -> Result<Rendered, EmitError> {
        Ok(match expr {
            Expr::Name(name) => Rendered::atom(name.clone()),
            Expr::Literal(text) => {
                let level = if text.starts_with('-') { UNARY } else { ATOM };
                Rendered::new(text.clone(), level)
            }
            Expr::Str(value) => Rendered::atom(csharp_string(value)),
            Expr::Char(c) => Rendered::atom(char_literal(*c)),
            Expr::Interpolated(parts) => self.interpolated(parts)?,
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
                    UnaryOp::PostIncrement => Rendered::new(format!("{}++", operand.at_least(PRIMARY)), PRIMARY),
                    UnaryOp::PostDecrement => Rendered::new(format!("{}--", operand.at_least(PRIMARY)), PRIMARY),
                    prefix => {
                        let spelling = match prefix {
                            UnaryOp::Neg => "-",
                            UnaryOp::Plus => "+",
                            UnaryOp::Not => "!",
                            UnaryOp::BitNot => "~",
                            UnaryOp::PreIncrement => "++",
                            _ => "--",
                        };
                        let mut operand = operand.at_least(UNARY);
                        // `- -x` and `-(--x)` must not fuse into `--x`.
                        if matches!(spelling, "-" | "+" | "++" | "--") && operand.starts_with(['-', '+']) {
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
                let func = self.render(func)?.at_least(PRIMARY);
                let args = self.list(args)?;
                Rendered::new(format!("{func}({})", args.join(", ")), PRIMARY)
            }
            Expr::Member { object, name } => {
                let object = self.render(object)?.at_least(PRIMARY);
                Rendered::new(format!("{object}.{name}"), PRIMARY)
            }
            Expr::Index { object, index } => {
                let object = self.render(object)?.at_least(PRIMARY);
                let index = self.render(index)?.at_least(ASSIGN);
                Rendered::new(format!("{object}[{index}]"), PRIMARY)
            }
            Expr::New { ty, args, init } => {
                let mut text = format!("new {ty}");
                if !args.is_empty() || init.is_none() {
                    text.push_str(&format!("({})", self.list(args)?.join(", ")));
                }
                match init {
                    Some(Initializer::Items(items)) => {
                        text.push_str(&initializer(self.list(items)?));
                    }
                    Some(Initializer::Entries(entries)) => {
                        let mut rendered = Vec::with_capacity(entries.len());
                        for (key, value) in entries {
                            let key = self.render(key)?.at_least(ASSIGN);
                            let value = self.render(value)?.at_least(ASSIGN);
                            rendered.push(format!("[{key}] = {value}"));
                        }
                        text.push_str(&initializer(rendered));
                    }
                    None => {}
                }
                Rendered::new(text, PRIMARY)
            }
            Expr::NewArray { element, size, items } => {
                // `new int[n][]` for jagged arrays: the size goes first.
                let (base, rank) = match element.find('[') {
                    Some(at) => element.split_at(at),
                    None => (element.as_str(), ""),
                };
                let text = match size {
                    Some(size) => {
                        let size = self.render(size)?.at_least(ASSIGN);
                        format!("new {base}[{size}]{rank}")
                    }
                    None => format!("new {element}[]{}", initializer(self.list(items)?)),
                };
                Rendered::new(text, PRIMARY)
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                let test = self.render(test)?.at_least(COALESCE);
                let then = self.render(then)?.at_least(CONDITIONAL);
                let otherwise = self.render(otherwise)?.at_least(CONDITIONAL);
                Rendered::new(format!("{test} ? {then} : {otherwise}"), CONDITIONAL)
            }
            Expr::Lambda { params, body, is_async } => {
                let params = match params.as_slice() {
                    [single] if !single.contains(' ') => single.clone(),
                    params => format!("({})", params.join(", ")),
                };
                let prefix = if *is_async { "async " } else { "" };
                match body {
                    LambdaBody::Expr(body) => {
                        let body = self.render(body)?.at_least(ASSIGN);
                        Rendered::new(format!("{prefix}{params} => {body}"), ASSIGN)
                    }
                    LambdaBody::Block(body) => {
                        let block = self.nested_block(body);
                        Rendered::new(format!("{prefix}{params} =>\n{block}"), ASSIGN)
                    }
                }
            }
            Expr::Cast { ty, value } => {
                let value = self.render(value)?.at_least(PRIMARY);
                Rendered::new(format!("({ty}){value}"), UNARY)
            }
            Expr::Is { value, ty } => {
                let value = self.render(value)?.at_least(SHIFT);
                Rendered::new(format!("{value} is {ty}"), RELATIONAL)
            }
            Expr::Await(value) => {
                let value = self.render(value)?.at_least(UNARY);
                Rendered::new(format!("await {value}"), UNARY)
            }
            Expr::Unchecked(value) => {
                let value = self.render(value)?.text;
                Rendered::atom(format!("unchecked({value})"))
            }
            Expr::Placeholder(what) => return Err(EmitError::Placeholder(what.clone())),
        })
    }

    fn interpolated(&mut self, parts: &[InterpolationPart]) -> Result<Rendered, EmitError> {
        let mut text = String::from("$\"");
        for part in parts {
            match part {
                InterpolationPart::Text(literal) => {
                    let quoted = csharp_string(literal);
                    let inner = &quoted[1..quoted.len() - 1];
                    text.push_str(&inner.replace('{', "{{").replace('}', "}}"));
                }
                InterpolationPart::Hole(expr) => {
                    // A bare `:` would start a format specifier.
                    let hole = self.render(expr)?.at_least(COALESCE);
                    text.push('{');
                    text.push_str(&hole);
                    text.push('}');
                }
            }
        }
        text.push('"');
        Ok(Rendered::atom(text))
    }
}

impl Indented for CSharpEmitter {
    fn writer(&mut self) -> &mut SourceWriter {
        &mut self.out
    }
}

impl Emitter for CSharpEmitter {
    type Unit = CompilationUnit;

    fn emit(&mut self, unit: &CompilationUnit) -> String {
        self.out = SourceWriter::new(&self.unit);
        self.compilation_unit(unit);
        std::mem::replace(&mut self.out, SourceWriter::new(&self.unit)).finish()
    }

    fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

fn modifiers(modifiers: &[&str]) -> String {
    modifiers.iter().map(|m| format!("{m} ")).collect()
}

fn initializer(items: Vec<String>) -> String {
    if items.is_empty() {
        " { }".to_string()
    } else {
        format!(" {{ {} }}", items.join(", "))
    }
}

fn xml_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn char_literal(c: char) -> String {
    match c {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\r' => "'\\r'".to_string(),
        '\t' => "'\\t'".to_string(),
        '\0' => "'\\0'".to_string(),
        c if (c as u32) < 0x20 || c as u32 == 0x7F => format!("'\\u{:04X}'", c as u32),
        c => format!("'{c}'"),
    }
}

fn op_info(op: Op) -> Result<(&'static str, u8, Assoc), EmitError> {
    Ok(match op {
        Op::Coalesce => ("??", COALESCE, Assoc::Right),
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
        Op::UShr => (">>>", SHIFT, Assoc::Left),
        Op::Add => ("+", ADDITIVE, Assoc::Left),
        Op::Sub => ("-", ADDITIVE, Assoc::Left),
        Op::Mul => ("*", MULTIPLICATIVE, Assoc::Left),
        Op::Div | Op::FloorDiv => ("/", MULTIPLICATIVE, Assoc::Left),
        Op::Mod => ("%", MULTIPLICATIVE, Assoc::Left),
        Op::Pow | Op::Is | Op::IsNot | Op::In | Op::NotIn => {
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
        CSharpEmitter::new("    ").expr_text(expr).unwrap()
    }

    fn emit_method(body: Vec<Stmt>) -> (String, Vec<String>) {
        let mut emitter = CSharpEmitter::new("    ");
        let code = emitter.emit(&CompilationUnit {
            namespace: "Generated".into(),
            program: ClassDecl {
                name: "Program".into(),
                modifiers: vec!["public", "static"],
                members: vec![Member::Method(Method {
                    modifiers: vec!["public", "static"],
                    returns: "void".into(),
                    name: "Run".into(),
                    params: vec![],
                    body,
                    doc: None,
                })],
                ..ClassDecl::default()
            },
            ..CompilationUnit::default()
        });
        (code, emitter.take_warnings())
    }

    #[test]
    fn test_masks_keep_their_parentheses() {
        let masked = Expr::bin(Op::Eq, Expr::bin(Op::BitAnd, name("x"), Expr::int(1)), Expr::int(0));
        assert_eq!(text(&masked), "(x & 1) == 0");
        let mixed = Expr::bin(Op::BitAnd, Expr::bin(Op::BitOr, name("a"), name("b")), name("c"));
        assert_eq!(text(&mixed), "(a | b) & c");
        let nested = Expr::bin(Op::Sub, name("a"), Expr::bin(Op::Sub, name("b"), name("c")));
        assert_eq!(text(&nested), "a - (b - c)");
    }

    #[test]
    fn test_cast_wraps_compound_operands() {
        let cast = Expr::cast("byte", Expr::bin(Op::Shr, name("x"), Expr::int(8)));
        assert_eq!(text(&cast), "(byte)(x >> 8)");
        assert_eq!(text(&cast.clone().method("ToString", vec![])), "((byte)(x >> 8)).ToString()");
        let negated = Expr::unary(UnaryOp::Neg, Expr::unary(UnaryOp::Neg, name("x")));
        assert_eq!(text(&negated), "-(-x)");
    }

    #[test]
    fn test_jagged_array_size_comes_first() {
        let array = Expr::NewArray {
            element: "int[]".into(),
            size: Some(Box::new(Expr::int(4))),
            items: vec![],
        };
        assert_eq!(text(&array), "new int[4][]");
        let listed = Expr::NewArray {
            element: "byte".into(),
            size: None,
            items: vec![Expr::int(1), Expr::int(2)],
        };
        assert_eq!(text(&listed), "new byte[] { 1, 2 }");
    }

    #[test]
    fn test_interpolation_escapes_braces() {
        let interpolated = Expr::Interpolated(vec![
            InterpolationPart::Text("{n}=".into()),
            InterpolationPart::Hole(Expr::conditional(name("a"), Expr::int(1), Expr::int(2))),
        ]);
        assert_eq!(text(&interpolated), "$\"{{n}}={(a ? 1 : 2)}\"");
    }

    #[test]
    fn test_else_if_chains_flatten() {
        let (code, _) = emit_method(vec![Stmt::If {
            test: name("a"),
            then: vec![Stmt::Return(None)],
            otherwise: vec![Stmt::If {
                test: name("b"),
                then: vec![],
                otherwise: vec![Stmt::Break],
            }],
        }]);
        insta::assert_snapshot!(code, @r"
        namespace Generated;

        public static class Program
        {
            public static void Run()
            {
                if (a)
                {
                    return;
                }
                else if (b)
                {
                }
                else
                {
                    break;
                }
            }
        }
        ");
    }

    #[test]
    fn test_block_lambdas_indent_with_their_statement() {
        let lambda = Expr::Lambda {
            params: vec!["x".into()],
            body: LambdaBody::Block(vec![Stmt::Expr(name("f").method("Invoke", vec![name("x")]))]),
            is_async: false,
        };
        let (code, _) = emit_method(vec![Stmt::Expr(name("items").method("ForEach", vec![lambda]))]);
        assert!(
            code.contains("        items.ForEach(x =>\n        {\n            f.Invoke(x);\n        });\n"),
            "{code}"
        );
    }

    #[test]
    fn test_failed_local_still_declares_its_name() {
        let (code, warnings) = emit_method(vec![
            Stmt::Local {
                ty: Some("int".into()),
                name: "x".into(),
                value: Some(Expr::Placeholder("WithStatement".into())),
            },
            Stmt::Expr(Expr::bin(Op::Pow, name("a"), name("b"))),
        ]);
        assert!(
            code.contains("int x = default! /* unsupported construct: WithStatement */;"),
            "{code}"
        );
        assert!(code.contains("/* unsupported construct: operator ** */"), "{code}");
        assert_eq!(warnings, ["unsupported construct: operator **"]);
    }

    #[test]
    fn test_doc_comments_are_xml_escaped() {
        let mut emitter = CSharpEmitter::new("    ");
        emitter.doc(Some("Returns a < b\n\nfor all & any"));
        assert_eq!(
            emitter.out.finish(),
            "/// <summary>\n/// Returns a &lt; b\n///\n/// for all &amp; any\n/// </summary>\n"
        );
    }
}
