//! Operators shared by the target trees, and the parenthesization rule.
//!
//! Each target assigns its own precedence levels (higher binds tighter); the
//! rule for when a child needs parentheses is the same everywhere.

use retarget_il::{BinaryOperator, LogicalOperator};

/// Binary operators as the target trees name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    /// Integer division where the target distinguishes it (Python `//`).
    FloorDiv,
    Mod,
    Pow,
    Shl,
    Shr,
    /// Logical (zero-filling) right shift.
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    /// `??`
    Coalesce,
    /// Identity comparison (Python `is`).
    Is,
    IsNot,
    /// Membership (Python `in`).
    In,
    NotIn,
}

impl Op {
    pub fn from_binary(operator: BinaryOperator) -> Option<Op> {
        Some(match operator {
            BinaryOperator::Eq | BinaryOperator::StrictEq => Op::Eq,
            BinaryOperator::Ne | BinaryOperator::StrictNe => Op::Ne,
            BinaryOperator::Lt => Op::Lt,
            BinaryOperator::Le => Op::Le,
            BinaryOperator::Gt => Op::Gt,
            BinaryOperator::Ge => Op::Ge,
            BinaryOperator::Shl => Op::Shl,
            BinaryOperator::Shr => Op::Shr,
            BinaryOperator::UShr => Op::UShr,
            BinaryOperator::Add => Op::Add,
            BinaryOperator::Sub => Op::Sub,
            BinaryOperator::Mul => Op::Mul,
            BinaryOperator::Div => Op::Div,
            BinaryOperator::Mod => Op::Mod,
            BinaryOperator::Pow => Op::Pow,
            BinaryOperator::BitOr => Op::BitOr,
            BinaryOperator::BitXor => Op::BitXor,
            BinaryOperator::BitAnd => Op::BitAnd,
            BinaryOperator::In | BinaryOperator::InstanceOf => return None,
        })
    }

    pub fn from_logical(operator: LogicalOperator) -> Op {
        match operator {
            LogicalOperator::And => Op::And,
            LogicalOperator::Or => Op::Or,
            LogicalOperator::Coalesce => Op::Coalesce,
        }
    }

    /// C-family spelling; targets override the few that differ.
    pub fn c_spelling(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div | Op::FloorDiv => "/",
            Op::Mod => "%",
            Op::Pow => "**",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::UShr => ">>>",
            Op::BitAnd => "&",
            Op::BitOr => "|",
            Op::BitXor => "^",
            Op::Eq | Op::Is => "==",
            Op::Ne | Op::IsNot => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::And => "&&",
            Op::Or => "||",
            Op::Coalesce => "??",
            Op::In => "in",
            Op::NotIn => "not in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    /// Equal-precedence chains mean something else (Python comparisons).
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Whether a child expression at `child` precedence needs parentheses under
/// a parent binary operator at `parent` precedence.
///
/// For left-associative operators the left child is wrapped when strictly
/// lower and the right child when lower or equal. Right-associative operators
/// mirror that, and non-associative ones wrap on equality on both sides.
pub fn needs_parens(parent: u8, child: u8, side: Side, assoc: Assoc) -> bool {
    match (assoc, side) {
        (Assoc::Left, Side::Left) | (Assoc::Right, Side::Right) => child < parent,
        (Assoc::Left, Side::Right) | (Assoc::Right, Side::Left) | (Assoc::None, _) => {
            child <= parent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_associative_rule() {
        // (a + b) * c: left child lower than parent
        assert!(needs_parens(12, 11, Side::Left, Assoc::Left));
        // a - (b - c): right child equal to parent
        assert!(needs_parens(11, 11, Side::Right, Assoc::Left));
        // (a - b) - c needs nothing
        assert!(!needs_parens(11, 11, Side::Left, Assoc::Left));
    }

    #[test]
    fn test_right_associative_mirrors() {
        // a ** (b ** c) stays bare, (a ** b) ** c keeps its parentheses
        assert!(!needs_parens(14, 14, Side::Right, Assoc::Right));
        assert!(needs_parens(14, 14, Side::Left, Assoc::Right));
    }

    #[test]
    fn test_strict_equality_collapses() {
        assert_eq!(Op::from_binary(BinaryOperator::StrictEq), Some(Op::Eq));
        assert_eq!(Op::from_binary(BinaryOperator::InstanceOf), None);
    }
}
