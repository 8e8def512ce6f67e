//! Node kinds and families.
//!
//! [`Node::kind`] is an exhaustive match, so adding a variant without naming it
//! here fails to compile. The `statement_kinds!` / `expression_kinds!` pattern
//! macros let backends write exhaustive dispatch without a wildcard arm.

use crate::node::Node;

/// Which family a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Statement,
    Expression,
    /// Produced by the loader for kinds outside the vocabulary.
    Unknown,
}

/// Pattern matching every statement kind.
///
/// ```ignore
/// match node {
///     retarget_il::statement_kinds!() => { /* ... */ }
///     _ => {}
/// }
/// ```
#[macro_export]
macro_rules! statement_kinds {
    () => {
        ($crate::Node::Program(..)
            | $crate::Node::VariableDeclaration { .. }
            | $crate::Node::FunctionDeclaration(..)
            | $crate::Node::ClassDeclaration(..)
            | $crate::Node::ExpressionStatement { .. }
            | $crate::Node::BlockStatement { .. }
            | $crate::Node::EmptyStatement { .. }
            | $crate::Node::IfStatement { .. }
            | $crate::Node::ForStatement { .. }
            | $crate::Node::ForOfStatement { .. }
            | $crate::Node::ForInStatement { .. }
            | $crate::Node::WhileStatement { .. }
            | $crate::Node::DoWhileStatement { .. }
            | $crate::Node::SwitchStatement { .. }
            | $crate::Node::BreakStatement { .. }
            | $crate::Node::ContinueStatement { .. }
            | $crate::Node::ReturnStatement { .. }
            | $crate::Node::ThrowStatement { .. }
            | $crate::Node::TryStatement { .. })
    };
}

/// Pattern matching the structural (non-semantic) expression kinds,
/// including patterns and object-literal members.
#[macro_export]
macro_rules! structural_expression_kinds {
    () => {
        ($crate::Node::Literal(..)
            | $crate::Node::TemplateLiteral { .. }
            | $crate::Node::Identifier(..)
            | $crate::Node::ThisExpression { .. }
            | $crate::Node::Super { .. }
            | $crate::Node::BinaryExpression { .. }
            | $crate::Node::LogicalExpression { .. }
            | $crate::Node::UnaryExpression { .. }
            | $crate::Node::UpdateExpression { .. }
            | $crate::Node::AssignmentExpression { .. }
            | $crate::Node::MemberExpression { .. }
            | $crate::Node::CallExpression { .. }
            | $crate::Node::NewExpression { .. }
            | $crate::Node::ConditionalExpression { .. }
            | $crate::Node::ArrayExpression { .. }
            | $crate::Node::ObjectExpression { .. }
            | $crate::Node::Property { .. }
            | $crate::Node::SpreadElement { .. }
            | $crate::Node::FunctionExpression(..)
            | $crate::Node::ArrowFunctionExpression(..)
            | $crate::Node::SequenceExpression { .. }
            | $crate::Node::AwaitExpression { .. }
            | $crate::Node::ArrayPattern { .. }
            | $crate::Node::ObjectPattern { .. }
            | $crate::Node::AssignmentPattern { .. }
            | $crate::Node::RestElement { .. })
    };
}

/// Pattern matching every semantic operation kind.
#[macro_export]
macro_rules! semantic_kinds {
    () => {
        ($crate::Node::ArrayLength { .. }
            | $crate::Node::ArrayPush { .. }
            | $crate::Node::ArrayPop { .. }
            | $crate::Node::ArrayShift { .. }
            | $crate::Node::ArrayUnshift { .. }
            | $crate::Node::ArraySlice { .. }
            | $crate::Node::ArraySplice { .. }
            | $crate::Node::ArrayConcat { .. }
            | $crate::Node::ArrayIndexOf { .. }
            | $crate::Node::ArrayIncludes { .. }
            | $crate::Node::ArrayJoin { .. }
            | $crate::Node::ArrayReverse { .. }
            | $crate::Node::ArraySort { .. }
            | $crate::Node::ArrayFill { .. }
            | $crate::Node::ArrayMap { .. }
            | $crate::Node::ArrayFilter { .. }
            | $crate::Node::ArrayForEach { .. }
            | $crate::Node::ArrayReduce { .. }
            | $crate::Node::ArrayFind { .. }
            | $crate::Node::ArrayEvery { .. }
            | $crate::Node::ArraySome { .. }
            | $crate::Node::ArrayCreation { .. }
            | $crate::Node::TypedArrayCreation { .. }
            | $crate::Node::ArrayFrom { .. }
            | $crate::Node::ArrayClear { .. }
            | $crate::Node::ArrayUnique { .. }
            | $crate::Node::ArrayXor { .. }
            | $crate::Node::CopyArray { .. }
            | $crate::Node::StringLength { .. }
            | $crate::Node::StringSplit { .. }
            | $crate::Node::StringSubstring { .. }
            | $crate::Node::StringIndexOf { .. }
            | $crate::Node::StringReplace { .. }
            | $crate::Node::StringToUpper { .. }
            | $crate::Node::StringToLower { .. }
            | $crate::Node::StringTrim { .. }
            | $crate::Node::StringStartsWith { .. }
            | $crate::Node::StringEndsWith { .. }
            | $crate::Node::StringIncludes { .. }
            | $crate::Node::StringRepeat { .. }
            | $crate::Node::StringPadStart { .. }
            | $crate::Node::StringPadEnd { .. }
            | $crate::Node::StringCharAt { .. }
            | $crate::Node::StringCharCodeAt { .. }
            | $crate::Node::StringFromCharCodes { .. }
            | $crate::Node::StringConcat { .. }
            | $crate::Node::StringToBytes { .. }
            | $crate::Node::BytesToString { .. }
            | $crate::Node::MathFloor { .. }
            | $crate::Node::MathCeil { .. }
            | $crate::Node::MathRound { .. }
            | $crate::Node::MathAbs { .. }
            | $crate::Node::MathMin { .. }
            | $crate::Node::MathMax { .. }
            | $crate::Node::MathPow { .. }
            | $crate::Node::MathSqrt { .. }
            | $crate::Node::MathRandom { .. }
            | $crate::Node::MathTrunc { .. }
            | $crate::Node::MathSign { .. }
            | $crate::Node::MathLog { .. }
            | $crate::Node::RotateLeft { .. }
            | $crate::Node::RotateRight { .. }
            | $crate::Node::Cast { .. }
            | $crate::Node::PackBytes { .. }
            | $crate::Node::UnpackBytes { .. }
            | $crate::Node::ParseInteger { .. }
            | $crate::Node::ParseFloat { .. }
            | $crate::Node::NumberToString { .. }
            | $crate::Node::IsInteger { .. }
            | $crate::Node::HexEncode { .. }
            | $crate::Node::HexDecode { .. }
            | $crate::Node::Base64Encode { .. }
            | $crate::Node::Base64Decode { .. }
            | $crate::Node::MapCreation { .. }
            | $crate::Node::MapGet { .. }
            | $crate::Node::MapSet { .. }
            | $crate::Node::MapHas { .. }
            | $crate::Node::MapDelete { .. }
            | $crate::Node::MapKeys { .. }
            | $crate::Node::MapValues { .. }
            | $crate::Node::MapEntries { .. }
            | $crate::Node::MapSize { .. }
            | $crate::Node::ObjectFreeze { .. }
            | $crate::Node::IsArray { .. }
            | $crate::Node::DebugOutput { .. }
            | $crate::Node::ErrorCreation { .. })
    };
}

/// Pattern matching every expression kind, structural and semantic.
#[macro_export]
macro_rules! expression_kinds {
    () => {
        ($crate::structural_expression_kinds!() | $crate::semantic_kinds!())
    };
}

/// Kinds accepted by the loader. Auxiliary shapes that only appear nested
/// inside a parent (declarators, class bodies, switch cases, ...) are listed
/// too so the loader does not mistake them for unknown nodes.
pub const KNOWN_KINDS: &[&str] = &[
    "Program",
    "VariableDeclaration",
    "FunctionDeclaration",
    "ClassDeclaration",
    "ExpressionStatement",
    "BlockStatement",
    "EmptyStatement",
    "IfStatement",
    "ForStatement",
    "ForOfStatement",
    "ForInStatement",
    "WhileStatement",
    "DoWhileStatement",
    "SwitchStatement",
    "BreakStatement",
    "ContinueStatement",
    "ReturnStatement",
    "ThrowStatement",
    "TryStatement",
    "Literal",
    "TemplateLiteral",
    "Identifier",
    "ThisExpression",
    "Super",
    "BinaryExpression",
    "LogicalExpression",
    "UnaryExpression",
    "UpdateExpression",
    "AssignmentExpression",
    "MemberExpression",
    "CallExpression",
    "NewExpression",
    "ConditionalExpression",
    "ArrayExpression",
    "ObjectExpression",
    "Property",
    "SpreadElement",
    "FunctionExpression",
    "ArrowFunctionExpression",
    "SequenceExpression",
    "AwaitExpression",
    "ArrayPattern",
    "ObjectPattern",
    "AssignmentPattern",
    "RestElement",
    "ArrayLength",
    "ArrayPush",
    "ArrayPop",
    "ArrayShift",
    "ArrayUnshift",
    "ArraySlice",
    "ArraySplice",
    "ArrayConcat",
    "ArrayIndexOf",
    "ArrayIncludes",
    "ArrayJoin",
    "ArrayReverse",
    "ArraySort",
    "ArrayFill",
    "ArrayMap",
    "ArrayFilter",
    "ArrayForEach",
    "ArrayReduce",
    "ArrayFind",
    "ArrayEvery",
    "ArraySome",
    "ArrayCreation",
    "TypedArrayCreation",
    "ArrayFrom",
    "ArrayClear",
    "ArrayUnique",
    "ArrayXor",
    "CopyArray",
    "StringLength",
    "StringSplit",
    "StringSubstring",
    "StringIndexOf",
    "StringReplace",
    "StringToUpper",
    "StringToLower",
    "StringTrim",
    "StringStartsWith",
    "StringEndsWith",
    "StringIncludes",
    "StringRepeat",
    "StringPadStart",
    "StringPadEnd",
    "StringCharAt",
    "StringCharCodeAt",
    "StringFromCharCodes",
    "StringConcat",
    "StringToBytes",
    "BytesToString",
    "MathFloor",
    "MathCeil",
    "MathRound",
    "MathAbs",
    "MathMin",
    "MathMax",
    "MathPow",
    "MathSqrt",
    "MathRandom",
    "MathTrunc",
    "MathSign",
    "MathLog",
    "RotateLeft",
    "RotateRight",
    "Cast",
    "PackBytes",
    "UnpackBytes",
    "ParseInteger",
    "ParseFloat",
    "NumberToString",
    "IsInteger",
    "HexEncode",
    "HexDecode",
    "Base64Encode",
    "Base64Decode",
    "MapCreation",
    "MapGet",
    "MapSet",
    "MapHas",
    "MapDelete",
    "MapKeys",
    "MapValues",
    "MapEntries",
    "MapSize",
    "ObjectFreeze",
    "IsArray",
    "DebugOutput",
    "ErrorCreation",
    // nested shapes
    "VariableDeclarator",
    "ClassBody",
    "MethodDefinition",
    "PropertyDefinition",
    "StaticBlock",
    "SwitchCase",
    "CatchClause",
    "TemplateElement",
];

pub fn is_known_kind(kind: &str) -> bool {
    KNOWN_KINDS.contains(&kind)
}

/// Whether `kind` is an auxiliary shape that never stands alone as a node.
pub fn is_nested_shape(kind: &str) -> bool {
    matches!(
        kind,
        "VariableDeclarator"
            | "ClassBody"
            | "MethodDefinition"
            | "PropertyDefinition"
            | "StaticBlock"
            | "SwitchCase"
            | "CatchClause"
            | "TemplateElement"
    )
}

impl Node {
    /// The node's discriminant, spelled as on the wire.
    pub fn kind(&self) -> &str {
        match self {
            Node::Program(..) => "Program",
            Node::VariableDeclaration { .. } => "VariableDeclaration",
            Node::FunctionDeclaration(..) => "FunctionDeclaration",
            Node::ClassDeclaration(..) => "ClassDeclaration",
            Node::ExpressionStatement { .. } => "ExpressionStatement",
            Node::BlockStatement { .. } => "BlockStatement",
            Node::EmptyStatement { .. } => "EmptyStatement",
            Node::IfStatement { .. } => "IfStatement",
            Node::ForStatement { .. } => "ForStatement",
            Node::ForOfStatement { .. } => "ForOfStatement",
            Node::ForInStatement { .. } => "ForInStatement",
            Node::WhileStatement { .. } => "WhileStatement",
            Node::DoWhileStatement { .. } => "DoWhileStatement",
            Node::SwitchStatement { .. } => "SwitchStatement",
            Node::BreakStatement { .. } => "BreakStatement",
            Node::ContinueStatement { .. } => "ContinueStatement",
            Node::ReturnStatement { .. } => "ReturnStatement",
            Node::ThrowStatement { .. } => "ThrowStatement",
            Node::TryStatement { .. } => "TryStatement",
            Node::Literal(..) => "Literal",
            Node::TemplateLiteral { .. } => "TemplateLiteral",
            Node::Identifier(..) => "Identifier",
            Node::ThisExpression { .. } => "ThisExpression",
            Node::Super { .. } => "Super",
            Node::BinaryExpression { .. } => "BinaryExpression",
            Node::LogicalExpression { .. } => "LogicalExpression",
            Node::UnaryExpression { .. } => "UnaryExpression",
            Node::UpdateExpression { .. } => "UpdateExpression",
            Node::AssignmentExpression { .. } => "AssignmentExpression",
            Node::MemberExpression { .. } => "MemberExpression",
            Node::CallExpression { .. } => "CallExpression",
            Node::NewExpression { .. } => "NewExpression",
            Node::ConditionalExpression { .. } => "ConditionalExpression",
            Node::ArrayExpression { .. } => "ArrayExpression",
            Node::ObjectExpression { .. } => "ObjectExpression",
            Node::Property { .. } => "Property",
            Node::SpreadElement { .. } => "SpreadElement",
            Node::FunctionExpression(..) => "FunctionExpression",
            Node::ArrowFunctionExpression(..) => "ArrowFunctionExpression",
            Node::SequenceExpression { .. } => "SequenceExpression",
            Node::AwaitExpression { .. } => "AwaitExpression",
            Node::ArrayPattern { .. } => "ArrayPattern",
            Node::ObjectPattern { .. } => "ObjectPattern",
            Node::AssignmentPattern { .. } => "AssignmentPattern",
            Node::RestElement { .. } => "RestElement",
            Node::ArrayLength { .. } => "ArrayLength",
            Node::ArrayPush { .. } => "ArrayPush",
            Node::ArrayPop { .. } => "ArrayPop",
            Node::ArrayShift { .. } => "ArrayShift",
            Node::ArrayUnshift { .. } => "ArrayUnshift",
            Node::ArraySlice { .. } => "ArraySlice",
            Node::ArraySplice { .. } => "ArraySplice",
            Node::ArrayConcat { .. } => "ArrayConcat",
            Node::ArrayIndexOf { .. } => "ArrayIndexOf",
            Node::ArrayIncludes { .. } => "ArrayIncludes",
            Node::ArrayJoin { .. } => "ArrayJoin",
            Node::ArrayReverse { .. } => "ArrayReverse",
            Node::ArraySort { .. } => "ArraySort",
            Node::ArrayFill { .. } => "ArrayFill",
            Node::ArrayMap { .. } => "ArrayMap",
            Node::ArrayFilter { .. } => "ArrayFilter",
            Node::ArrayForEach { .. } => "ArrayForEach",
            Node::ArrayReduce { .. } => "ArrayReduce",
            Node::ArrayFind { .. } => "ArrayFind",
            Node::ArrayEvery { .. } => "ArrayEvery",
            Node::ArraySome { .. } => "ArraySome",
            Node::ArrayCreation { .. } => "ArrayCreation",
            Node::TypedArrayCreation { .. } => "TypedArrayCreation",
            Node::ArrayFrom { .. } => "ArrayFrom",
            Node::ArrayClear { .. } => "ArrayClear",
            Node::ArrayUnique { .. } => "ArrayUnique",
            Node::ArrayXor { .. } => "ArrayXor",
            Node::CopyArray { .. } => "CopyArray",
            Node::StringLength { .. } => "StringLength",
            Node::StringSplit { .. } => "StringSplit",
            Node::StringSubstring { .. } => "StringSubstring",
            Node::StringIndexOf { .. } => "StringIndexOf",
            Node::StringReplace { .. } => "StringReplace",
            Node::StringToUpper { .. } => "StringToUpper",
            Node::StringToLower { .. } => "StringToLower",
            Node::StringTrim { .. } => "StringTrim",
            Node::StringStartsWith { .. } => "StringStartsWith",
            Node::StringEndsWith { .. } => "StringEndsWith",
            Node::StringIncludes { .. } => "StringIncludes",
            Node::StringRepeat { .. } => "StringRepeat",
            Node::StringPadStart { .. } => "StringPadStart",
            Node::StringPadEnd { .. } => "StringPadEnd",
            Node::StringCharAt { .. } => "StringCharAt",
            Node::StringCharCodeAt { .. } => "StringCharCodeAt",
            Node::StringFromCharCodes { .. } => "StringFromCharCodes",
            Node::StringConcat { .. } => "StringConcat",
            Node::StringToBytes { .. } => "StringToBytes",
            Node::BytesToString { .. } => "BytesToString",
            Node::MathFloor { .. } => "MathFloor",
            Node::MathCeil { .. } => "MathCeil",
            Node::MathRound { .. } => "MathRound",
            Node::MathAbs { .. } => "MathAbs",
            Node::MathMin { .. } => "MathMin",
            Node::MathMax { .. } => "MathMax",
            Node::MathPow { .. } => "MathPow",
            Node::MathSqrt { .. } => "MathSqrt",
            Node::MathRandom { .. } => "MathRandom",
            Node::MathTrunc { .. } => "MathTrunc",
            Node::MathSign { .. } => "MathSign",
            Node::MathLog { .. } => "MathLog",
            Node::RotateLeft { .. } => "RotateLeft",
            Node::RotateRight { .. } => "RotateRight",
            Node::Cast { .. } => "Cast",
            Node::PackBytes { .. } => "PackBytes",
            Node::UnpackBytes { .. } => "UnpackBytes",
            Node::ParseInteger { .. } => "ParseInteger",
            Node::ParseFloat { .. } => "ParseFloat",
            Node::NumberToString { .. } => "NumberToString",
            Node::IsInteger { .. } => "IsInteger",
            Node::HexEncode { .. } => "HexEncode",
            Node::HexDecode { .. } => "HexDecode",
            Node::Base64Encode { .. } => "Base64Encode",
            Node::Base64Decode { .. } => "Base64Decode",
            Node::MapCreation { .. } => "MapCreation",
            Node::MapGet { .. } => "MapGet",
            Node::MapSet { .. } => "MapSet",
            Node::MapHas { .. } => "MapHas",
            Node::MapDelete { .. } => "MapDelete",
            Node::MapKeys { .. } => "MapKeys",
            Node::MapValues { .. } => "MapValues",
            Node::MapEntries { .. } => "MapEntries",
            Node::MapSize { .. } => "MapSize",
            Node::ObjectFreeze { .. } => "ObjectFreeze",
            Node::IsArray { .. } => "IsArray",
            Node::DebugOutput { .. } => "DebugOutput",
            Node::ErrorCreation { .. } => "ErrorCreation",
            Node::Unknown { kind } => kind,
        }
    }

    pub fn family(&self) -> Family {
        match self {
            statement_kinds!() => Family::Statement,
            expression_kinds!() => Family::Expression,
            Node::Unknown { .. } => Family::Unknown,
        }
    }

    pub fn is_statement(&self) -> bool {
        self.family() == Family::Statement
    }

    pub fn is_expression(&self) -> bool {
        self.family() == Family::Expression
    }

    /// The identifier name, if this is an `Identifier`.
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Node::Identifier(id) => Some(&id.name),
            _ => None,
        }
    }

    /// Whether this is an inline function (`function () {}` or an arrow).
    pub fn as_inline_function(&self) -> Option<&crate::node::Function> {
        match self {
            Node::FunctionExpression(f) | Node::ArrowFunctionExpression(f) => Some(f),
            _ => None,
        }
    }

    /// Whether this is a string literal.
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            Node::Literal(crate::node::Literal {
                value: crate::node::LiteralValue::String(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    /// The name a property key spells, for non-computed keys.
    pub fn property_name(&self) -> Option<String> {
        match self {
            Node::Identifier(id) => Some(id.name.clone()),
            Node::Literal(lit) => match &lit.value {
                crate::node::LiteralValue::String(s) => Some(s.clone()),
                crate::node::LiteralValue::Number(n) => Some(n.to_string()),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_known_kind_deserializes_as_a_variant_name() {
        // A minimal object carrying only the tag either parses or fails on a
        // missing field; it must never fail with "unknown variant".
        for kind in KNOWN_KINDS {
            let value = serde_json::json!({ "type": kind });
            if let Err(err) = serde_json::from_value::<Node>(value) {
                let nested = matches!(
                    *kind,
                    "VariableDeclarator"
                        | "ClassBody"
                        | "MethodDefinition"
                        | "PropertyDefinition"
                        | "StaticBlock"
                        | "SwitchCase"
                        | "CatchClause"
                        | "TemplateElement"
                );
                assert!(
                    nested || !err.to_string().contains("unknown variant"),
                    "{kind}: {err}"
                );
            }
        }
    }

    #[test]
    fn test_family_of_unknown() {
        let node = Node::Unknown {
            kind: "WithStatement".into(),
        };
        assert_eq!(node.family(), Family::Unknown);
        assert_eq!(node.kind(), "WithStatement");
    }
}
