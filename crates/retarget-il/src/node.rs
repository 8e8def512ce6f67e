//! The IL node taxonomy.
//!
//! Nodes follow ESTree naming for the structural part of the tree (statements,
//! expressions, patterns) and add *semantic operation* kinds for operations
//! every backend spells differently (array push, bit rotation, hex encoding, ...).
//!
//! The wire format is JSON with a `"type"` discriminant and camelCase fields.

use crate::operator::*;
use serde::{Deserialize, Serialize};

/// A whole IL program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub body: Vec<Node>,
}

impl Program {
    pub fn new(body: Vec<Node>) -> Self {
        Self { body }
    }
}

/// A named binding; also used for function and class names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub name: String,
    /// Declared IL type, e.g. `uint32` or `uint8[]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result_type: None,
        }
    }
}

/// The runtime value of a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Literal {
    pub value: LiteralValue,
    /// Original spelling; keeps hex constants like `0xFF` intact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
}

impl Literal {
    /// The literal as an integer, when it is a whole number.
    pub fn as_integer(&self) -> Option<i128> {
        if let Some(raw) = &self.raw
            && let Some(value) = parse_integer_literal(raw)
        {
            return Some(value);
        }
        match self.value {
            LiteralValue::Number(n) if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e19 => {
                Some(n as i128)
            }
            _ => None,
        }
    }

    /// Whether the literal was written in hexadecimal.
    pub fn is_hex(&self) -> bool {
        self.raw
            .as_deref()
            .is_some_and(|raw| raw.starts_with("0x") || raw.starts_with("0X"))
    }
}

fn parse_integer_literal(raw: &str) -> Option<i128> {
    let raw = raw.trim_end_matches('n').replace('_', "");
    let (digits, radix) = match raw.get(..2) {
        Some("0x") | Some("0X") => (&raw[2..], 16),
        Some("0b") | Some("0B") => (&raw[2..], 2),
        Some("0o") | Some("0O") => (&raw[2..], 8),
        _ => (raw.as_str(), 10),
    };
    i128::from_str_radix(digits, radix).ok()
}

/// A function body plus signature, shared by declarations, expressions,
/// arrows and class methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    #[serde(default)]
    pub id: Option<Identifier>,
    #[serde(default)]
    pub params: Vec<Node>,
    /// A `BlockStatement`, or an expression for concise arrows.
    pub body: Box<Node>,
    #[serde(default, rename = "async")]
    pub is_async: bool,
    #[serde(default)]
    pub generator: bool,
    /// True for arrows whose body is a bare expression.
    #[serde(default)]
    pub expression: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

impl Function {
    pub fn name(&self) -> Option<&str> {
        self.id.as_ref().map(|id| id.name.as_str())
    }

    /// Statements of a block body; empty for concise arrow bodies.
    pub fn body_statements(&self) -> &[Node] {
        match self.body.as_ref() {
            Node::BlockStatement { body } => body,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    #[serde(default)]
    pub id: Option<Identifier>,
    #[serde(default)]
    pub super_class: Option<Box<Node>>,
    pub body: ClassBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

impl Class {
    pub fn name(&self) -> Option<&str> {
        self.id.as_ref().map(|id| id.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassBody {
    #[serde(default)]
    pub body: Vec<ClassMember>,
}

/// Members of a class body, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClassMember {
    MethodDefinition {
        key: Box<Node>,
        #[serde(default)]
        kind: MethodKind,
        #[serde(default, rename = "static")]
        is_static: bool,
        #[serde(default)]
        computed: bool,
        value: Function,
    },
    PropertyDefinition {
        key: Box<Node>,
        #[serde(default)]
        value: Option<Box<Node>>,
        #[serde(default, rename = "static")]
        is_static: bool,
        #[serde(default)]
        computed: bool,
        #[serde(default)]
        result_type: Option<String>,
    },
    StaticBlock {
        #[serde(default)]
        body: Vec<Node>,
    },
    /// A member whose kind this vocabulary does not know.
    Unknown { kind: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDeclarator {
    /// An `Identifier`, `ArrayPattern` or `ObjectPattern`.
    pub id: Box<Node>,
    #[serde(default)]
    pub init: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` for `default:`.
    #[serde(default)]
    pub test: Option<Box<Node>>,
    #[serde(default)]
    pub consequent: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    #[serde(default)]
    pub param: Option<Box<Node>>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateElement {
    #[serde(default)]
    pub value: TemplateValue,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateValue {
    #[serde(default)]
    pub cooked: Option<String>,
    #[serde(default)]
    pub raw: String,
}

impl TemplateElement {
    pub fn text(&self) -> &str {
        self.value.cooked.as_deref().unwrap_or(&self.value.raw)
    }
}

/// One IL node. The variant name is the node's `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Node {
    // ---------------------------------------------------------------- statements
    Program(Program),
    VariableDeclaration {
        #[serde(default)]
        kind: DeclarationKind,
        declarations: Vec<VariableDeclarator>,
    },
    FunctionDeclaration(Function),
    ClassDeclaration(Class),
    ExpressionStatement {
        expression: Box<Node>,
    },
    BlockStatement {
        #[serde(default)]
        body: Vec<Node>,
    },
    EmptyStatement {},
    IfStatement {
        test: Box<Node>,
        consequent: Box<Node>,
        #[serde(default)]
        alternate: Option<Box<Node>>,
    },
    ForStatement {
        #[serde(default)]
        init: Option<Box<Node>>,
        #[serde(default)]
        test: Option<Box<Node>>,
        #[serde(default)]
        update: Option<Box<Node>>,
        body: Box<Node>,
    },
    ForOfStatement {
        left: Box<Node>,
        right: Box<Node>,
        body: Box<Node>,
    },
    ForInStatement {
        left: Box<Node>,
        right: Box<Node>,
        body: Box<Node>,
    },
    WhileStatement {
        test: Box<Node>,
        body: Box<Node>,
    },
    DoWhileStatement {
        body: Box<Node>,
        test: Box<Node>,
    },
    SwitchStatement {
        discriminant: Box<Node>,
        #[serde(default)]
        cases: Vec<SwitchCase>,
    },
    BreakStatement {},
    ContinueStatement {},
    ReturnStatement {
        #[serde(default)]
        argument: Option<Box<Node>>,
    },
    ThrowStatement {
        argument: Box<Node>,
    },
    TryStatement {
        block: Box<Node>,
        #[serde(default)]
        handler: Option<CatchClause>,
        #[serde(default)]
        finalizer: Option<Box<Node>>,
    },

    // --------------------------------------------------------------- expressions
    Literal(Literal),
    TemplateLiteral {
        #[serde(default)]
        quasis: Vec<TemplateElement>,
        #[serde(default)]
        expressions: Vec<Node>,
    },
    Identifier(Identifier),
    ThisExpression {},
    Super {},
    BinaryExpression {
        operator: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    LogicalExpression {
        operator: LogicalOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryExpression {
        operator: UnaryOperator,
        argument: Box<Node>,
    },
    UpdateExpression {
        operator: UpdateOperator,
        #[serde(default)]
        prefix: bool,
        argument: Box<Node>,
    },
    AssignmentExpression {
        operator: AssignmentOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    MemberExpression {
        object: Box<Node>,
        property: Box<Node>,
        #[serde(default)]
        computed: bool,
    },
    CallExpression {
        callee: Box<Node>,
        #[serde(default)]
        arguments: Vec<Node>,
    },
    NewExpression {
        callee: Box<Node>,
        #[serde(default)]
        arguments: Vec<Node>,
    },
    ConditionalExpression {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    ArrayExpression {
        #[serde(default)]
        elements: Vec<Option<Node>>,
    },
    ObjectExpression {
        #[serde(default)]
        properties: Vec<Node>,
    },
    Property {
        key: Box<Node>,
        value: Box<Node>,
        #[serde(default)]
        computed: bool,
        #[serde(default)]
        shorthand: bool,
    },
    SpreadElement {
        argument: Box<Node>,
    },
    FunctionExpression(Function),
    ArrowFunctionExpression(Function),
    SequenceExpression {
        expressions: Vec<Node>,
    },
    AwaitExpression {
        argument: Box<Node>,
    },
    ArrayPattern {
        /// `None` marks a hole (`[, b]`).
        #[serde(default)]
        elements: Vec<Option<Node>>,
    },
    ObjectPattern {
        #[serde(default)]
        properties: Vec<Node>,
    },
    AssignmentPattern {
        left: Box<Node>,
        right: Box<Node>,
    },
    RestElement {
        argument: Box<Node>,
    },

    // ---------------------------------------------------------- semantic: arrays
    ArrayLength {
        array: Box<Node>,
    },
    ArrayPush {
        array: Box<Node>,
        #[serde(default)]
        values: Vec<Node>,
    },
    ArrayPop {
        array: Box<Node>,
    },
    ArrayShift {
        array: Box<Node>,
    },
    ArrayUnshift {
        array: Box<Node>,
        #[serde(default)]
        values: Vec<Node>,
    },
    ArraySlice {
        array: Box<Node>,
        #[serde(default)]
        start: Option<Box<Node>>,
        #[serde(default)]
        end: Option<Box<Node>>,
    },
    ArraySplice {
        array: Box<Node>,
        start: Box<Node>,
        #[serde(default)]
        delete_count: Option<Box<Node>>,
        #[serde(default)]
        items: Vec<Node>,
    },
    ArrayConcat {
        array: Box<Node>,
        #[serde(default)]
        others: Vec<Node>,
    },
    ArrayIndexOf {
        array: Box<Node>,
        value: Box<Node>,
    },
    ArrayIncludes {
        array: Box<Node>,
        value: Box<Node>,
    },
    ArrayJoin {
        array: Box<Node>,
        #[serde(default)]
        separator: Option<Box<Node>>,
    },
    ArrayReverse {
        array: Box<Node>,
    },
    ArraySort {
        array: Box<Node>,
        #[serde(default)]
        compare: Option<Box<Node>>,
    },
    ArrayFill {
        array: Box<Node>,
        value: Box<Node>,
        #[serde(default)]
        start: Option<Box<Node>>,
        #[serde(default)]
        end: Option<Box<Node>>,
    },
    ArrayMap {
        array: Box<Node>,
        callback: Box<Node>,
    },
    ArrayFilter {
        array: Box<Node>,
        callback: Box<Node>,
    },
    ArrayForEach {
        array: Box<Node>,
        callback: Box<Node>,
    },
    ArrayReduce {
        array: Box<Node>,
        callback: Box<Node>,
        #[serde(default)]
        initial: Option<Box<Node>>,
    },
    ArrayFind {
        array: Box<Node>,
        callback: Box<Node>,
    },
    ArrayEvery {
        array: Box<Node>,
        callback: Box<Node>,
    },
    ArraySome {
        array: Box<Node>,
        callback: Box<Node>,
    },
    /// `new Array(n)`: a zero-filled array of `size` elements, or empty.
    ArrayCreation {
        #[serde(default)]
        size: Option<Box<Node>>,
        #[serde(default)]
        element_type: Option<String>,
    },
    /// `new Uint8Array(n)` or `new Uint8Array(source)`.
    TypedArrayCreation {
        element_type: NumericType,
        #[serde(default)]
        size: Option<Box<Node>>,
        #[serde(default)]
        source: Option<Box<Node>>,
    },
    ArrayFrom {
        iterable: Box<Node>,
    },
    ArrayClear {
        array: Box<Node>,
    },
    /// Remove duplicates, keeping first occurrences in order.
    ArrayUnique {
        array: Box<Node>,
    },
    /// Element-wise XOR of two byte arrays, truncated to the shorter one.
    ArrayXor {
        left: Box<Node>,
        right: Box<Node>,
    },
    CopyArray {
        array: Box<Node>,
    },

    // --------------------------------------------------------- semantic: strings
    StringLength {
        string: Box<Node>,
    },
    StringSplit {
        string: Box<Node>,
        #[serde(default)]
        separator: Option<Box<Node>>,
    },
    StringSubstring {
        string: Box<Node>,
        start: Box<Node>,
        #[serde(default)]
        end: Option<Box<Node>>,
    },
    StringIndexOf {
        string: Box<Node>,
        search: Box<Node>,
    },
    StringReplace {
        string: Box<Node>,
        search: Box<Node>,
        replacement: Box<Node>,
        #[serde(default)]
        all: bool,
    },
    StringToUpper {
        string: Box<Node>,
    },
    StringToLower {
        string: Box<Node>,
    },
    StringTrim {
        string: Box<Node>,
    },
    StringStartsWith {
        string: Box<Node>,
        search: Box<Node>,
    },
    StringEndsWith {
        string: Box<Node>,
        search: Box<Node>,
    },
    StringIncludes {
        string: Box<Node>,
        search: Box<Node>,
    },
    StringRepeat {
        string: Box<Node>,
        count: Box<Node>,
    },
    /// Left-pad to `length` (zero-padding hex digits is the common case).
    StringPadStart {
        string: Box<Node>,
        length: Box<Node>,
        #[serde(default)]
        fill: Option<Box<Node>>,
    },
    StringPadEnd {
        string: Box<Node>,
        length: Box<Node>,
        #[serde(default)]
        fill: Option<Box<Node>>,
    },
    StringCharAt {
        string: Box<Node>,
        index: Box<Node>,
    },
    StringCharCodeAt {
        string: Box<Node>,
        index: Box<Node>,
    },
    StringFromCharCodes {
        #[serde(default)]
        codes: Vec<Node>,
    },
    StringConcat {
        #[serde(default)]
        parts: Vec<Node>,
    },
    StringToBytes {
        string: Box<Node>,
        #[serde(default)]
        encoding: Option<String>,
    },
    BytesToString {
        bytes: Box<Node>,
        #[serde(default)]
        encoding: Option<String>,
    },

    // ------------------------------------------------------------ semantic: math
    MathFloor {
        argument: Box<Node>,
    },
    MathCeil {
        argument: Box<Node>,
    },
    MathRound {
        argument: Box<Node>,
    },
    MathAbs {
        argument: Box<Node>,
    },
    MathMin {
        #[serde(default)]
        arguments: Vec<Node>,
    },
    MathMax {
        #[serde(default)]
        arguments: Vec<Node>,
    },
    MathPow {
        base: Box<Node>,
        exponent: Box<Node>,
    },
    MathSqrt {
        argument: Box<Node>,
    },
    MathRandom {},
    MathTrunc {
        argument: Box<Node>,
    },
    MathSign {
        argument: Box<Node>,
    },
    MathLog {
        argument: Box<Node>,
    },

    // ---------------------------------------------------- semantic: bits/numbers
    RotateLeft {
        value: Box<Node>,
        amount: Box<Node>,
        #[serde(default = "default_word_bits")]
        bits: u32,
    },
    RotateRight {
        value: Box<Node>,
        amount: Box<Node>,
        #[serde(default = "default_word_bits")]
        bits: u32,
    },
    /// Reinterpret or narrow a number to a fixed-width type.
    Cast {
        expression: Box<Node>,
        target_type: NumericType,
    },
    /// Combine bytes (most significant first for big-endian) into a word.
    PackBytes {
        bytes: Vec<Node>,
        #[serde(default = "default_word_bits")]
        bits: u32,
        #[serde(default)]
        endian: Endian,
    },
    /// Split a word into `bits / 8` bytes.
    UnpackBytes {
        value: Box<Node>,
        #[serde(default = "default_word_bits")]
        bits: u32,
        #[serde(default)]
        endian: Endian,
    },
    ParseInteger {
        string: Box<Node>,
        #[serde(default)]
        radix: Option<Box<Node>>,
    },
    ParseFloat {
        string: Box<Node>,
    },
    NumberToString {
        value: Box<Node>,
        #[serde(default)]
        radix: Option<Box<Node>>,
    },
    IsInteger {
        value: Box<Node>,
    },

    // ------------------------------------------------------- semantic: encodings
    HexEncode {
        bytes: Box<Node>,
    },
    HexDecode {
        string: Box<Node>,
    },
    Base64Encode {
        bytes: Box<Node>,
    },
    Base64Decode {
        string: Box<Node>,
    },

    // ------------------------------------------------------------ semantic: maps
    MapCreation {
        /// `Property` nodes.
        #[serde(default)]
        entries: Vec<Node>,
    },
    MapGet {
        map: Box<Node>,
        key: Box<Node>,
    },
    MapSet {
        map: Box<Node>,
        key: Box<Node>,
        value: Box<Node>,
    },
    MapHas {
        map: Box<Node>,
        key: Box<Node>,
    },
    MapDelete {
        map: Box<Node>,
        key: Box<Node>,
    },
    MapKeys {
        map: Box<Node>,
    },
    MapValues {
        map: Box<Node>,
    },
    MapEntries {
        map: Box<Node>,
    },
    MapSize {
        map: Box<Node>,
    },
    ObjectFreeze {
        object: Box<Node>,
    },
    IsArray {
        value: Box<Node>,
    },

    // ------------------------------------------------------------ semantic: misc
    DebugOutput {
        #[serde(default)]
        arguments: Vec<Node>,
        #[serde(default)]
        level: DebugLevel,
    },
    ErrorCreation {
        #[serde(default)]
        error_type: Option<String>,
        #[serde(default)]
        message: Option<Box<Node>>,
    },

    /// A node whose `type` this vocabulary does not know. Produced by the loader.
    Unknown {
        kind: String,
    },
}

fn default_word_bits() -> u32 {
    32
}
