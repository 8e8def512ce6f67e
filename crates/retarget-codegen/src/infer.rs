//! Best-effort type inference for statically typed targets.
//!
//! Rules are tried in order and the first one that answers wins:
//!
//! 0. an explicit IL `resultType` annotation;
//! 1. a literal initializer's runtime kind;
//! 2. the initializer's structure (constructor calls, typed arrays,
//!    operators, string-producing semantic ops);
//! 3. fragments of the variable name (`dataLength` is an integer);
//! 4. the target's any type.
//!
//! None of this is sound. It only has to be plausible enough that the
//! generated program compiles in the common cases.

use crate::types::{Primitive, TypeRef, parse_il_type};
use retarget_il::{BinaryOperator, Literal, LiteralValue, Node, NumericType, UnaryOperator};

/// Infer the declared type of a binding.
pub fn infer_type(name: &str, annotation: Option<&str>, init: Option<&Node>) -> TypeRef {
    if let Some(annotation) = annotation {
        return parse_il_type(annotation);
    }
    init.and_then(expression_type)
        .or_else(|| name_hint(name))
        .unwrap_or(TypeRef::ANY)
}

/// The type an expression evaluates to, when its shape says so.
pub fn expression_type(node: &Node) -> Option<TypeRef> {
    match node {
        Node::Literal(literal) => Some(
            literal
                .result_type
                .as_deref()
                .map(parse_il_type)
                .unwrap_or_else(|| literal_type(literal)),
        ),
        Node::Identifier(id) => id.result_type.as_deref().map(parse_il_type),
        Node::TemplateLiteral { .. } => Some(TypeRef::STRING),
        Node::ArrayExpression { .. } => Some(TypeRef::list(TypeRef::ANY)),
        Node::ObjectExpression { .. } | Node::MapCreation { .. } => {
            Some(TypeRef::map(TypeRef::STRING, TypeRef::ANY))
        }
        Node::NewExpression { callee, .. } => constructed_type(callee),
        Node::TypedArrayCreation { element_type, .. } => {
            Some(TypeRef::array(TypeRef::Primitive((*element_type).into())))
        }
        Node::ArrayCreation { element_type, .. } => Some(match element_type {
            Some(element) => TypeRef::array(parse_il_type(element)),
            None => TypeRef::list(TypeRef::ANY),
        }),
        Node::BinaryExpression {
            operator,
            left,
            right,
        } => {
            if operator.is_comparison() {
                Some(TypeRef::BOOL)
            } else if *operator == BinaryOperator::Add
                && (is_stringy(left) || is_stringy(right))
            {
                Some(TypeRef::STRING)
            } else if *operator == BinaryOperator::UShr {
                Some(TypeRef::UINT)
            } else if *operator == BinaryOperator::Div || *operator == BinaryOperator::Pow {
                Some(TypeRef::DOUBLE)
            } else {
                Some(TypeRef::INT)
            }
        }
        Node::LogicalExpression { .. } => Some(TypeRef::BOOL),
        Node::UnaryExpression { operator, .. } => match operator {
            UnaryOperator::Not | UnaryOperator::Delete => Some(TypeRef::BOOL),
            UnaryOperator::Neg | UnaryOperator::Plus | UnaryOperator::BitNot => {
                Some(TypeRef::INT)
            }
            UnaryOperator::TypeOf => Some(TypeRef::STRING),
            UnaryOperator::Void => None,
        },
        Node::ConditionalExpression { consequent, .. } => expression_type(consequent),
        Node::StringSubstring { .. }
        | Node::StringToUpper { .. }
        | Node::StringToLower { .. }
        | Node::StringTrim { .. }
        | Node::StringRepeat { .. }
        | Node::StringPadStart { .. }
        | Node::StringPadEnd { .. }
        | Node::StringCharAt { .. }
        | Node::StringFromCharCodes { .. }
        | Node::StringConcat { .. }
        | Node::StringReplace { .. }
        | Node::BytesToString { .. }
        | Node::HexEncode { .. }
        | Node::Base64Encode { .. }
        | Node::NumberToString { .. }
        | Node::ArrayJoin { .. } => Some(TypeRef::STRING),
        Node::StringLength { .. }
        | Node::ArrayLength { .. }
        | Node::StringIndexOf { .. }
        | Node::ArrayIndexOf { .. }
        | Node::StringCharCodeAt { .. }
        | Node::MapSize { .. }
        | Node::ParseInteger { .. }
        | Node::MathFloor { .. }
        | Node::MathCeil { .. }
        | Node::MathRound { .. }
        | Node::MathTrunc { .. }
        | Node::MathSign { .. } => Some(TypeRef::INT),
        Node::ParseFloat { .. }
        | Node::MathSqrt { .. }
        | Node::MathPow { .. }
        | Node::MathLog { .. }
        | Node::MathRandom {} => Some(TypeRef::DOUBLE),
        Node::StringStartsWith { .. }
        | Node::StringEndsWith { .. }
        | Node::StringIncludes { .. }
        | Node::ArrayIncludes { .. }
        | Node::ArrayEvery { .. }
        | Node::ArraySome { .. }
        | Node::MapHas { .. }
        | Node::MapDelete { .. }
        | Node::IsArray { .. }
        | Node::IsInteger { .. } => Some(TypeRef::BOOL),
        Node::StringToBytes { .. }
        | Node::HexDecode { .. }
        | Node::Base64Decode { .. }
        | Node::ArrayXor { .. }
        | Node::UnpackBytes { .. } => Some(TypeRef::bytes()),
        Node::StringSplit { .. } => Some(TypeRef::list(TypeRef::STRING)),
        Node::RotateLeft { bits, .. } | Node::RotateRight { bits, .. } => {
            Some(unsigned_of_width(*bits))
        }
        Node::PackBytes { bits, .. } => Some(unsigned_of_width(*bits)),
        Node::Cast { target_type, .. } => Some(TypeRef::Primitive((*target_type).into())),
        Node::CopyArray { array }
        | Node::ArraySlice { array, .. }
        | Node::ArrayConcat { array, .. }
        | Node::ArrayFilter { array, .. }
        | Node::ArrayReverse { array }
        | Node::ArraySort { array, .. } => expression_type(array),
        Node::MathAbs { argument } => expression_type(argument),
        _ => None,
    }
}

fn literal_type(literal: &Literal) -> TypeRef {
    match &literal.value {
        LiteralValue::Null => TypeRef::named("object").nullable(),
        LiteralValue::Bool(_) => TypeRef::BOOL,
        LiteralValue::String(_) => TypeRef::STRING,
        LiteralValue::Number(_) => match literal.as_integer() {
            Some(value) if value >= i32::MIN as i128 && value <= i32::MAX as i128 => TypeRef::INT,
            Some(value) if value > i32::MAX as i128 && value <= u32::MAX as i128 => TypeRef::UINT,
            Some(_) => TypeRef::Primitive(Primitive::Int64),
            None => TypeRef::DOUBLE,
        },
    }
}

fn constructed_type(callee: &Node) -> Option<TypeRef> {
    let name = callee.as_identifier()?;
    Some(match name {
        "Array" => TypeRef::list(TypeRef::ANY),
        "Map" => TypeRef::map(TypeRef::ANY, TypeRef::ANY),
        "Set" => TypeRef::generic("Set", vec![TypeRef::ANY]),
        "Error" | "TypeError" | "RangeError" => TypeRef::named("Exception"),
        other => match NumericType::parse(other) {
            Some(numeric) if other.ends_with("Array") => {
                TypeRef::array(TypeRef::Primitive(numeric.into()))
            }
            _ => TypeRef::named(other),
        },
    })
}

fn unsigned_of_width(bits: u32) -> TypeRef {
    TypeRef::Primitive(match bits {
        8 => Primitive::UInt8,
        16 => Primitive::UInt16,
        64 => Primitive::UInt64,
        _ => Primitive::UInt32,
    })
}

fn is_stringy(node: &Node) -> bool {
    node.as_string_literal().is_some()
        || matches!(node, Node::TemplateLiteral { .. })
        || expression_type(node).is_some_and(|ty| ty.is_string())
}

#[derive(Clone, Copy)]
enum Hint {
    Bytes,
    Text,
    Integer,
    Flag,
}

const NAME_FRAGMENTS: &[(&str, Hint)] = &[
    ("data", Hint::Bytes),
    ("bytes", Hint::Bytes),
    ("buffer", Hint::Bytes),
    ("block", Hint::Bytes),
    ("key", Hint::Text),
    ("text", Hint::Text),
    ("message", Hint::Text),
    ("name", Hint::Text),
    ("index", Hint::Integer),
    ("length", Hint::Integer),
    ("count", Hint::Integer),
    ("size", Hint::Integer),
    ("rounds", Hint::Integer),
    ("flag", Hint::Flag),
    ("enabled", Hint::Flag),
];

/// Guess a type from the variable name. When several fragments occur, the
/// one ending furthest to the right wins: `keySize` is a size, `sizeKey` a key.
pub fn name_hint(name: &str) -> Option<TypeRef> {
    let lower = name.to_ascii_lowercase();
    let (_, hint) = NAME_FRAGMENTS
        .iter()
        .filter_map(|(fragment, hint)| lower.rfind(fragment).map(|at| (at + fragment.len(), *hint)))
        .max_by_key(|(end, _)| *end)?;
    Some(match hint {
        Hint::Bytes => TypeRef::bytes(),
        Hint::Text => TypeRef::STRING,
        Hint::Integer => TypeRef::INT,
        Hint::Flag => TypeRef::BOOL,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use retarget_il::build::*;

    #[test]
    fn test_annotation_wins() {
        assert_eq!(
            infer_type("data", Some("uint32"), Some(&string("x"))),
            TypeRef::UINT
        );
    }

    #[test]
    fn test_literal_kinds() {
        assert_eq!(infer_type("x", None, Some(&int(7))), TypeRef::INT);
        assert_eq!(infer_type("x", None, Some(&hex(0x9E37_79B9))), TypeRef::UINT);
        assert_eq!(infer_type("x", None, Some(&number(0.5))), TypeRef::DOUBLE);
        assert_eq!(infer_type("x", None, Some(&string("s"))), TypeRef::STRING);
        assert_eq!(infer_type("x", None, Some(&boolean(true))), TypeRef::BOOL);
        assert!(matches!(
            infer_type("x", None, Some(&null())),
            TypeRef::Nullable(_)
        ));
    }

    #[test]
    fn test_structural_rules() {
        assert_eq!(
            infer_type("x", None, Some(&new_expr(ident("Cipher"), vec![]))),
            TypeRef::named("Cipher")
        );
        assert_eq!(
            infer_type("x", None, Some(&array(vec![]))),
            TypeRef::list(TypeRef::ANY)
        );
        assert_eq!(
            infer_type(
                "x",
                None,
                Some(&binary(BinaryOperator::Lt, ident("a"), ident("b")))
            ),
            TypeRef::BOOL
        );
        assert_eq!(
            infer_type(
                "x",
                None,
                Some(&binary(BinaryOperator::BitXor, ident("a"), ident("b")))
            ),
            TypeRef::INT
        );
    }

    #[test]
    fn test_name_fragments() {
        assert_eq!(infer_type("inputData", None, None), TypeRef::bytes());
        assert_eq!(infer_type("keySize", None, None), TypeRef::INT);
        assert_eq!(infer_type("userName", None, None), TypeRef::STRING);
        assert_eq!(infer_type("isEnabled", None, None), TypeRef::BOOL);
        assert_eq!(infer_type("state", None, None), TypeRef::ANY);
    }
}
