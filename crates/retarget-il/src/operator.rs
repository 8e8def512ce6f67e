//! Operator and small enumerated vocabularies used by IL nodes.

use serde::{Deserialize, Serialize};

/// Infix operators of `BinaryExpression`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "===")]
    StrictEq,
    #[serde(rename = "!==")]
    StrictNe,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
    #[serde(rename = ">>>")]
    UShr,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "**")]
    Pow,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "instanceof")]
    InstanceOf,
}

impl BinaryOperator {
    /// Source spelling of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::StrictEq => "===",
            BinaryOperator::StrictNe => "!==",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::UShr => ">>>",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Pow => "**",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::In => "in",
            BinaryOperator::InstanceOf => "instanceof",
        }
    }

    /// Equality and relational operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::StrictEq
                | BinaryOperator::StrictNe
                | BinaryOperator::Lt
                | BinaryOperator::Le
                | BinaryOperator::Gt
                | BinaryOperator::Ge
                | BinaryOperator::In
                | BinaryOperator::InstanceOf
        )
    }

    /// Operators producing a number from numbers (including bitwise ones).
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Sub
                | BinaryOperator::Mul
                | BinaryOperator::Div
                | BinaryOperator::Mod
                | BinaryOperator::Pow
                | BinaryOperator::Shl
                | BinaryOperator::Shr
                | BinaryOperator::UShr
                | BinaryOperator::BitOr
                | BinaryOperator::BitXor
                | BinaryOperator::BitAnd
        )
    }
}

/// Short-circuit operators of `LogicalExpression`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "??")]
    Coalesce,
}

/// Prefix operators of `UnaryExpression`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "~")]
    BitNot,
    #[serde(rename = "typeof")]
    TypeOf,
    #[serde(rename = "void")]
    Void,
    #[serde(rename = "delete")]
    Delete,
}

/// `++` / `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateOperator {
    #[serde(rename = "++")]
    Increment,
    #[serde(rename = "--")]
    Decrement,
}

/// Operators of `AssignmentExpression`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentOperator {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    Add,
    #[serde(rename = "-=")]
    Sub,
    #[serde(rename = "*=")]
    Mul,
    #[serde(rename = "/=")]
    Div,
    #[serde(rename = "%=")]
    Mod,
    #[serde(rename = "**=")]
    Pow,
    #[serde(rename = "<<=")]
    Shl,
    #[serde(rename = ">>=")]
    Shr,
    #[serde(rename = ">>>=")]
    UShr,
    #[serde(rename = "|=")]
    BitOr,
    #[serde(rename = "^=")]
    BitXor,
    #[serde(rename = "&=")]
    BitAnd,
    #[serde(rename = "&&=")]
    And,
    #[serde(rename = "||=")]
    Or,
    #[serde(rename = "??=")]
    Coalesce,
}

/// The arithmetic half of a compound assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOperator {
    Binary(BinaryOperator),
    Logical(LogicalOperator),
}

impl AssignmentOperator {
    /// Split `a op= b` into its operator; `None` for plain `=`.
    pub fn compound(self) -> Option<CompoundOperator> {
        use CompoundOperator::{Binary, Logical};
        Some(match self {
            AssignmentOperator::Assign => return None,
            AssignmentOperator::Add => Binary(BinaryOperator::Add),
            AssignmentOperator::Sub => Binary(BinaryOperator::Sub),
            AssignmentOperator::Mul => Binary(BinaryOperator::Mul),
            AssignmentOperator::Div => Binary(BinaryOperator::Div),
            AssignmentOperator::Mod => Binary(BinaryOperator::Mod),
            AssignmentOperator::Pow => Binary(BinaryOperator::Pow),
            AssignmentOperator::Shl => Binary(BinaryOperator::Shl),
            AssignmentOperator::Shr => Binary(BinaryOperator::Shr),
            AssignmentOperator::UShr => Binary(BinaryOperator::UShr),
            AssignmentOperator::BitOr => Binary(BinaryOperator::BitOr),
            AssignmentOperator::BitXor => Binary(BinaryOperator::BitXor),
            AssignmentOperator::BitAnd => Binary(BinaryOperator::BitAnd),
            AssignmentOperator::And => Logical(LogicalOperator::And),
            AssignmentOperator::Or => Logical(LogicalOperator::Or),
            AssignmentOperator::Coalesce => Logical(LogicalOperator::Coalesce),
        })
    }
}

/// `var` / `let` / `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Var,
    #[default]
    Let,
    Const,
}

/// Kind of a class `MethodDefinition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Constructor,
    #[default]
    Method,
    Get,
    Set,
}

/// Fixed-width numeric types named by `Cast` and typed-array creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
}

impl NumericType {
    pub fn bits(self) -> u32 {
        match self {
            NumericType::Int8 | NumericType::Uint8 => 8,
            NumericType::Int16 | NumericType::Uint16 => 16,
            NumericType::Int32 | NumericType::Uint32 | NumericType::Float32 => 32,
            NumericType::Int64 | NumericType::Uint64 | NumericType::Float64 => 64,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            NumericType::Int8 | NumericType::Int16 | NumericType::Int32 | NumericType::Int64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, NumericType::Float32 | NumericType::Float64)
    }

    /// All-ones mask for integer types (`0xFF` for 8 bits).
    pub fn mask(self) -> Option<u64> {
        if self.is_float() {
            return None;
        }
        Some(match self.bits() {
            64 => u64::MAX,
            bits => (1u64 << bits) - 1,
        })
    }

    /// Lower-case IL spelling (`uint8`, `float64`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            NumericType::Int8 => "int8",
            NumericType::Uint8 => "uint8",
            NumericType::Int16 => "int16",
            NumericType::Uint16 => "uint16",
            NumericType::Int32 => "int32",
            NumericType::Uint32 => "uint32",
            NumericType::Int64 => "int64",
            NumericType::Uint64 => "uint64",
            NumericType::Float32 => "float32",
            NumericType::Float64 => "float64",
        }
    }

    /// Parse the IL spelling, accepting the JavaScript typed-array names as well.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "int8" | "Int8Array" | "sbyte" => NumericType::Int8,
            "uint8" | "Uint8Array" | "Uint8ClampedArray" | "byte" => NumericType::Uint8,
            "int16" | "Int16Array" | "short" => NumericType::Int16,
            "uint16" | "Uint16Array" | "ushort" | "word" => NumericType::Uint16,
            "int32" | "Int32Array" | "int" => NumericType::Int32,
            "uint32" | "Uint32Array" | "uint" | "dword" => NumericType::Uint32,
            "int64" | "BigInt64Array" | "long" => NumericType::Int64,
            "uint64" | "BigUint64Array" | "ulong" | "qword" => NumericType::Uint64,
            "float32" | "Float32Array" | "float" => NumericType::Float32,
            "float64" | "Float64Array" | "double" | "number" => NumericType::Float64,
            _ => return None,
        })
    }
}

/// Byte order for `PackBytes` / `UnpackBytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// Severity of a `DebugOutput` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    #[default]
    Log,
    Info,
    Warn,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_spelling_roundtrips_through_serde() {
        let op: BinaryOperator = serde_json::from_str("\">>>\"").unwrap();
        assert_eq!(op, BinaryOperator::UShr);
        assert_eq!(op.as_str(), ">>>");
        assert!(BinaryOperator::StrictEq.is_comparison());
        assert!(!BinaryOperator::StrictEq.is_arithmetic());
    }

    #[test]
    fn test_compound_assignment_split() {
        assert_eq!(AssignmentOperator::Assign.compound(), None);
        assert_eq!(
            AssignmentOperator::UShr.compound(),
            Some(CompoundOperator::Binary(BinaryOperator::UShr))
        );
        assert_eq!(
            AssignmentOperator::Coalesce.compound(),
            Some(CompoundOperator::Logical(LogicalOperator::Coalesce))
        );
    }

    #[test]
    fn test_numeric_type_masks() {
        assert_eq!(NumericType::Uint8.mask(), Some(0xFF));
        assert_eq!(NumericType::Int32.mask(), Some(0xFFFF_FFFF));
        assert_eq!(NumericType::Uint64.mask(), Some(u64::MAX));
        assert_eq!(NumericType::Float64.mask(), None);
        assert_eq!(NumericType::parse("Uint16Array"), Some(NumericType::Uint16));
    }
}
