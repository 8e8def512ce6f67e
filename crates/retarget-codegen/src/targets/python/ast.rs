//! Python target tree.

use crate::precedence::Op;

/// One generated module.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub docstring: Option<String>,
    pub imports: Vec<Import>,
    /// Placeholder definitions for external base classes.
    pub stubs: Vec<Stmt>,
    pub body: Vec<Stmt>,
}

/// `import module` when `names` is empty, else `from module import names`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Import {
    pub module: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    Invert,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FPart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompKind {
    List,
    Generator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DictItem {
    Pair(Expr, Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    /// Integer literal, spelled as in the source (`0xFF` stays hex).
    Int(String),
    Float(String),
    Str(String),
    Bool(bool),
    None,
    FString(Vec<FPart>),
    /// Arithmetic, comparison and boolean operators.
    BinOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<(String, Expr)>,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    /// Only valid as a subscript index.
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<DictItem>),
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Comprehension {
        kind: CompKind,
        element: Box<Expr>,
        target: Box<Expr>,
        iter: Box<Expr>,
        condition: Option<Box<Expr>>,
    },
    Starred(Box<Expr>),
    Await(Box<Expr>),
    /// `(name := value)`
    Walrus {
        target: String,
        value: Box<Expr>,
    },
    Placeholder(String),
}

impl Expr {
    pub fn name(name: &str) -> Self {
        Expr::Name(name.to_string())
    }

    pub fn int(value: i64) -> Self {
        Expr::Int(value.to_string())
    }

    pub fn hex(value: u64) -> Self {
        Expr::Int(format!("0x{value:X}"))
    }

    pub fn str(value: &str) -> Self {
        Expr::Str(value.to_string())
    }

    pub fn bin(op: Op, left: Expr, right: Expr) -> Self {
        Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: Box::new(func),
            args,
            keywords: Vec::new(),
        }
    }

    /// Call a builtin or imported function by name.
    pub fn call_named(func: &str, args: Vec<Expr>) -> Self {
        Expr::call(Expr::name(func), args)
    }

    pub fn method(value: Expr, attr: &str, args: Vec<Expr>) -> Self {
        Expr::call(value.attr(attr), args)
    }

    pub fn attr(self, attr: &str) -> Self {
        Expr::Attribute {
            value: Box::new(self),
            attr: attr.to_string(),
        }
    }

    pub fn index(self, index: Expr) -> Self {
        Expr::Subscript {
            value: Box::new(self),
            index: Box::new(index),
        }
    }

    pub fn slice(self, lower: Option<Expr>, upper: Option<Expr>) -> Self {
        self.index(Expr::Slice {
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            step: None,
        })
    }

    pub fn if_exp(test: Expr, body: Expr, orelse: Expr) -> Self {
        Expr::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        }
    }

    /// Whether evaluating the expression twice is harmless.
    pub fn is_simple(&self) -> bool {
        match self {
            Expr::Name(_) | Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) | Expr::None => true,
            Expr::Attribute { value, .. } => value.is_simple(),
            _ => false,
        }
    }

    /// Whether this expression or any sub-expression satisfies `pred`.
    pub fn any(&self, pred: &mut impl FnMut(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        let mut any = |expr: &Expr| expr.any(&mut *pred);
        match self {
            Expr::Name(_)
            | Expr::Int(_)
            | Expr::Float(_)
            | Expr::Str(_)
            | Expr::Bool(_)
            | Expr::None
            | Expr::Placeholder(_) => false,
            Expr::FString(parts) => parts.iter().any(|part| match part {
                FPart::Expr(expr) => any(expr),
                FPart::Text(_) => false,
            }),
            Expr::BinOp { left, right, .. } => any(left) || any(right),
            Expr::Unary { operand, .. } => any(operand),
            Expr::Call {
                func,
                args,
                keywords,
            } => any(func) || args.iter().any(&mut any) || keywords.iter().any(|(_, v)| any(v)),
            Expr::Attribute { value, .. } => any(value),
            Expr::Subscript { value, index } => any(value) || any(index),
            Expr::Slice { lower, upper, step } => [lower, upper, step]
                .into_iter()
                .flatten()
                .any(|e| any(e)),
            Expr::List(items) | Expr::Tuple(items) => items.iter().any(&mut any),
            Expr::Dict(items) => items.iter().any(|item| match item {
                DictItem::Pair(k, v) => any(k) || any(v),
                DictItem::Spread(e) => any(e),
            }),
            Expr::Lambda { body, .. } => any(body),
            Expr::IfExp { test, body, orelse } => any(test) || any(body) || any(orelse),
            Expr::Comprehension {
                element,
                target,
                iter,
                condition,
                ..
            } => any(element) || any(target) || any(iter) || condition.as_deref().is_some_and(&mut any),
            Expr::Starred(e) | Expr::Await(e) => any(e),
            Expr::Walrus { value, .. } => any(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<Expr>,
    /// `*name`
    pub variadic: bool,
}

impl Param {
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            annotation: None,
            default: None,
            variadic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Option<String>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub docstring: Option<String>,
}

/// `except Exception as name:`
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    /// `a = b = value`
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AnnAssign {
        target: String,
        annotation: String,
        value: Option<Expr>,
    },
    AugAssign {
        target: Expr,
        op: Op,
        value: Expr,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Pass,
    Raise(Option<Expr>),
    Try {
        body: Vec<Stmt>,
        handlers: Vec<Handler>,
        finalbody: Vec<Stmt>,
    },
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Global(Vec<String>),
    Nonlocal(Vec<String>),
    Delete(Expr),
    Placeholder(String),
}

impl Stmt {
    pub fn assign(target: Expr, value: Expr) -> Self {
        Stmt::Assign {
            targets: vec![target],
            value,
        }
    }
}
