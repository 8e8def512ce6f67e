//! Language-agnostic intermediate tree for the `retarget` code generator.
//!
//! The IL is an ESTree-shaped tree extended with *semantic operation* kinds:
//! nodes such as [`Node::ArrayPush`] or [`Node::RotateLeft`] that name an
//! operation instead of spelling it, so each backend can pick its own idiom.
//!
//! # Wire format
//!
//! ```json
//! { "type": "Program", "body": [
//!   { "type": "ExpressionStatement",
//!     "expression": { "type": "RotateLeft",
//!                     "value": { "type": "Identifier", "name": "x" },
//!                     "amount": { "type": "Literal", "value": 7 } } } ] }
//! ```
//!
//! Use [`load_program`] rather than plain `serde_json::from_value` so unknown
//! kinds degrade to [`Node::Unknown`] instead of failing the whole document.

pub mod build;
pub mod kind;
pub mod load;
pub mod node;
pub mod operator;
pub mod visit;

pub use kind::{Family, KNOWN_KINDS, is_known_kind};
pub use load::{LoadError, load_program, load_program_str};
pub use node::{
    CatchClause, Class, ClassBody, ClassMember, Function, Identifier, Literal, LiteralValue, Node,
    Program, SwitchCase, TemplateElement, TemplateValue, VariableDeclarator,
};
pub use operator::{
    AssignmentOperator, BinaryOperator, CompoundOperator, DebugLevel, DeclarationKind, Endian,
    LogicalOperator, MethodKind, NumericType, UnaryOperator, UpdateOperator,
};
