//! C++ target tree.

use crate::precedence::Op;

/// One generated `.cpp` file. Items keep source order; the emitter groups
/// them so every name is declared before use.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranslationUnit {
    /// Header names without brackets (`vector`, `memory`).
    pub includes: Vec<String>,
    pub namespace: Option<String>,
    /// Runtime support code, printed inside `namespace rt`.
    pub helpers: Vec<&'static str>,
    /// Placeholder definitions for base classes defined outside the unit.
    pub stubs: Vec<ClassDecl>,
    pub items: Vec<Item>,
}

impl TranslationUnit {
    pub fn has_main(&self) -> bool {
        self.items.iter().any(|item| matches!(item, Item::Statement(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Class(ClassDecl),
    Function(Function),
    Variable(Variable),
    /// Top-level code; runs in `main`.
    Statement(Stmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub ty: String,
    pub name: String,
    pub value: Option<Expr>,
    pub is_const: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassDecl {
    pub name: String,
    pub base: Option<String>,
    pub members: Vec<Member>,
    pub doc: Option<String>,
    /// Whether another class in the unit derives from this one.
    pub has_subclasses: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: String,
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Leading specifiers: `static`, `virtual`.
    pub specifiers: Vec<&'static str>,
    pub returns: String,
    pub name: String,
    pub params: Vec<Param>,
    /// Trailing specifiers: `override`.
    pub qualifiers: Vec<&'static str>,
    pub body: Vec<Stmt>,
    pub doc: Option<String>,
}

impl Function {
    /// A prototype can only be written for a signature without `auto`.
    pub fn has_prototype(&self) -> bool {
        !self.returns.contains("auto") && self.params.iter().all(|p| !p.ty.contains("auto"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field {
        is_static: bool,
        ty: String,
        name: String,
        value: Option<Expr>,
    },
    Constructor {
        name: String,
        params: Vec<Param>,
        /// `: Base(args)`
        base_args: Option<Vec<Expr>>,
        body: Vec<Stmt>,
        doc: Option<String>,
    },
    /// Static block, run once through an initialized static flag.
    StaticInit {
        name: String,
        body: Vec<Stmt>,
    },
    /// `using Base::Base;`
    InheritConstructors(String),
    Method(Function),
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
    Deref,
    AddressOf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A name, possibly qualified (`std::cout`, `Cipher::rounds`).
    Name(String),
    /// Numeric, boolean and `nullptr` literals, spelled out already.
    Literal(String),
    Str(String),
    Char(char),
    Binary {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Assign {
        op: Option<Op>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `object.name`, or `object->name` through a pointer.
    Member {
        object: Box<Expr>,
        name: String,
        arrow: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    /// `T(args)`
    Construct {
        ty: String,
        args: Vec<Expr>,
    },
    /// `T{items}`; an empty type is a bare braced list.
    Init {
        ty: String,
        items: Vec<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Lambda {
        /// `&` inside functions, empty at namespace scope.
        capture: &'static str,
        params: Vec<Param>,
        body: LambdaBody,
    },
    /// `static_cast<T>(value)`
    Cast {
        ty: String,
        value: Box<Expr>,
    },
    /// `co_await value`
    Await(Box<Expr>),
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
        Expr::literal("nullptr")
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

    pub fn call_path(path: &str, args: Vec<Expr>) -> Self {
        Expr::call(Expr::name(path), args)
    }

    pub fn dot(self, name: &str) -> Self {
        Expr::Member {
            object: Box::new(self),
            name: name.to_string(),
            arrow: false,
        }
    }

    pub fn arrow(self, name: &str) -> Self {
        Expr::Member {
            object: Box::new(self),
            name: name.to_string(),
            arrow: true,
        }
    }

    pub fn method(self, name: &str, args: Vec<Expr>) -> Self {
        Expr::call(self.dot(name), args)
    }

    pub fn index(self, index: Expr) -> Self {
        Expr::Index {
            object: Box::new(self),
            index: Box::new(index),
        }
    }

    pub fn construct(ty: &str, args: Vec<Expr>) -> Self {
        Expr::Construct {
            ty: ty.to_string(),
            args,
        }
    }

    pub fn init(ty: &str, items: Vec<Expr>) -> Self {
        Expr::Init {
            ty: ty.to_string(),
            items,
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

    /// `value.begin(), value.end()`
    pub fn range(self) -> [Expr; 2] {
        [self.clone().method("begin", Vec::new()), self.method("end", Vec::new())]
    }

    /// Whether evaluating the expression twice is harmless.
    pub fn is_simple(&self) -> bool {
        match self {
            Expr::Name(_) | Expr::Literal(_) | Expr::Str(_) | Expr::Char(_) => true,
            Expr::Member { object, .. } => object.is_simple(),
            _ => false,
        }
    }

    /// Whether `pred` holds for this expression or any expression inside it.
    pub fn any(&self, pred: &mut impl FnMut(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Expr::Binary { left, right, .. } => left.any(pred) || right.any(pred),
            Expr::Unary { operand, .. } | Expr::Cast { value: operand, .. } | Expr::Await(operand) => {
                operand.any(pred)
            }
            Expr::Assign { target, value, .. } => target.any(pred) || value.any(pred),
            Expr::Call { func, args } => func.any(pred) || args.iter().any(|arg| arg.any(pred)),
            Expr::Member { object, .. } => object.any(pred),
            Expr::Index { object, index } => object.any(pred) || index.any(pred),
            Expr::Construct { args: items, .. } | Expr::Init { items, .. } => {
                items.iter().any(|item| item.any(pred))
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => test.any(pred) || then.any(pred) || otherwise.any(pred),
            Expr::Lambda {
                body: LambdaBody::Expr(body),
                ..
            } => body.any(pred),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchSection {
    /// `None` is `default:`.
    pub labels: Vec<Option<Expr>>,
    pub body: Vec<Stmt>,
    /// Ends in `[[fallthrough]];`.
    pub falls_through: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    /// `None` catches everything (`catch (...)`).
    pub ty: Option<String>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Local {
        ty: String,
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
    /// `for (ty name : iter)`
    ForEach {
        ty: String,
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
    /// `co_return value;`
    CoReturn(Expr),
    /// `throw;` when empty.
    Throw(Option<Expr>),
    Try {
        body: Vec<Stmt>,
        catches: Vec<Catch>,
    },
    Block(Vec<Stmt>),
    Goto(String),
    Label(String),
    Placeholder(String),
}
