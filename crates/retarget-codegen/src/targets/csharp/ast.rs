//! C# target tree.

use crate::precedence::Op;

/// One generated `.cs` file: a file-scoped namespace holding the program's
/// classes and a static class for everything declared at top level.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompilationUnit {
    pub nullable: bool,
    pub usings: Vec<String>,
    pub namespace: String,
    /// Placeholder definitions for base classes defined outside the unit.
    pub stubs: Vec<ClassDecl>,
    pub classes: Vec<ClassDecl>,
    pub program: ClassDecl,
    /// Whether `program` carries a `Main` entry point.
    pub has_main: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassDecl {
    pub name: String,
    pub modifiers: Vec<&'static str>,
    pub base: Option<String>,
    pub members: Vec<Member>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: String,
    pub name: String,
    pub default: Option<Expr>,
    /// `params T[] name`
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub modifiers: Vec<&'static str>,
    pub returns: String,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field {
        modifiers: Vec<&'static str>,
        ty: String,
        name: String,
        value: Option<Expr>,
    },
    /// A property with block-bodied accessors.
    Property {
        modifiers: Vec<&'static str>,
        ty: String,
        name: String,
        getter: Option<Vec<Stmt>>,
        setter: Option<Vec<Stmt>>,
    },
    Constructor {
        name: String,
        params: Vec<Param>,
        /// `: base(args)`
        base_args: Option<Vec<Expr>>,
        body: Vec<Stmt>,
        doc: Option<String>,
    },
    StaticConstructor {
        name: String,
        body: Vec<Stmt>,
    },
    Method(Method),
    /// Runtime support code, printed as is.
    Verbatim(&'static str),
    Placeholder(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationPart {
    Text(String),
    Hole(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    /// `{ a, b }`
    Items(Vec<Expr>),
    /// `{ [k] = v }`
    Entries(Vec<(Expr, Expr)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    /// Numeric, boolean and `null` literals, spelled out already.
    Literal(String),
    Str(String),
    Char(char),
    Interpolated(Vec<InterpolationPart>),
    Binary {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `target = value`, or `target op= value` with `op`.
    Assign {
        op: Option<Op>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        name: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    New {
        ty: String,
        args: Vec<Expr>,
        init: Option<Initializer>,
    },
    /// `new T[size]` or `new T[] { items }`.
    NewArray {
        element: String,
        size: Option<Box<Expr>>,
        items: Vec<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Lambda {
        params: Vec<String>,
        body: LambdaBody,
        is_async: bool,
    },
    Cast {
        ty: String,
        value: Box<Expr>,
    },
    /// `value is T`
    Is {
        value: Box<Expr>,
        ty: String,
    },
    Await(Box<Expr>),
    /// `unchecked(expr)`
    Unchecked(Box<Expr>),
    Placeholder(String),
}

impl Expr {
    pub fn name(name: &str) -> Self {
        Expr::Name(name.to_string())
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Expr::Literal(text.into())
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(value.to_string())
    }

    pub fn null() -> Self {
        Expr::literal("null")
    }

    pub fn bin(op: Op, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: Box::new(func),
            args,
        }
    }

    /// A static call such as `Math.Floor(x)`, or a call of a helper by name.
    pub fn call_path(path: &str, args: Vec<Expr>) -> Self {
        Expr::call(Expr::name(path), args)
    }

    pub fn member(self, name: &str) -> Self {
        Expr::Member {
            object: Box::new(self),
            name: name.to_string(),
        }
    }

    pub fn method(self, name: &str, args: Vec<Expr>) -> Self {
        Expr::call(self.member(name), args)
    }

    pub fn index(self, index: Expr) -> Self {
        Expr::Index {
            object: Box::new(self),
            index: Box::new(index),
        }
    }

    pub fn construct(ty: &str, args: Vec<Expr>) -> Self {
        Expr::New {
            ty: ty.to_string(),
            args,
            init: None,
        }
    }

    pub fn cast(ty: &str, value: Expr) -> Self {
        Expr::Cast {
            ty: ty.to_string(),
            value: Box::new(value),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn conditional(test: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Single-parameter expression lambda.
    pub fn lambda(param: &str, body: Expr) -> Self {
        Expr::Lambda {
            params: vec![param.to_string()],
            body: LambdaBody::Expr(Box::new(body)),
            is_async: false,
        }
    }

    /// Whether evaluating the expression twice is harmless.
    pub fn is_simple(&self) -> bool {
        match self {
            Expr::Name(_) | Expr::Literal(_) | Expr::Str(_) | Expr::Char(_) => true,
            Expr::Member { object, .. } => object.is_simple(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchSection {
    /// `None` is `default:`.
    pub labels: Vec<Option<Expr>>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

/// Where a `goto` jumps.
#[derive(Debug, Clone, PartialEq)]
pub enum GotoTarget {
    Label(String),
    /// `goto case X;` inside a switch section.
    Case(Expr),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    /// `T name = value;`; a `None` type is `var`.
    Local {
        ty: Option<String>,
        name: String,
        value: Option<Expr>,
    },
    If {
        test: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        test: Expr,
    },
    For {
        init: Vec<Stmt>,
        test: Option<Expr>,
        update: Vec<Expr>,
        body: Vec<Stmt>,
    },
    ForEach {
        ty: Option<String>,
        name: String,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Switch {
        subject: Expr,
        sections: Vec<SwitchSection>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Throw(Option<Expr>),
    Try {
        body: Vec<Stmt>,
        catch: Option<Catch>,
        finally: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    LocalFunction(Method),
    Goto(GotoTarget),
    /// `name: ;`
    Label(String),
    Placeholder(String),
}
