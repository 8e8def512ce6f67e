//! Loading IL programs from JSON.
//!
//! Loading is lenient about vocabulary and strict about shape: an object whose
//! `type` names no known kind becomes an [`Node::Unknown`] placeholder, while a
//! known kind with missing or mistyped fields is a [`LoadError::Invalid`]
//! carrying the JSON path of the offending value.

use crate::kind::{is_known_kind, is_nested_shape};
use crate::node::{Node, Program};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("malformed IL: root is not an object (found {0})")]
    NotAnObject(&'static str),

    #[error("malformed IL: root object has no \"type\" field")]
    MissingType,

    #[error("malformed IL at {path}: {message}")]
    Invalid { path: String, message: String },

    #[error("malformed IL: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load a program from a parsed JSON value.
///
/// A root that is a single statement or expression rather than a `Program` is
/// wrapped in one.
pub fn load_program(value: &Value) -> Result<Program, LoadError> {
    let root = value
        .as_object()
        .ok_or_else(|| LoadError::NotAnObject(json_type_name(value)))?;
    if !root.get("type").is_some_and(Value::is_string) {
        return Err(LoadError::MissingType);
    }

    let normalized = normalize_unknown_kinds(value);
    let node: Node = serde_path_to_error::deserialize(&normalized).map_err(|err| {
        // Paths stop at the internally tagged `Node` enum; blame the innermost
        // node that fails on its own instead.
        match innermost_invalid(&normalized, &mut Vec::new()) {
            Some((path, message)) => LoadError::Invalid { path, message },
            None => LoadError::Invalid {
                path: err.path().to_string(),
                message: err.inner().to_string(),
            },
        }
    })?;

    let program = match node {
        Node::Program(program) => program,
        node if node.is_expression() => Program::new(vec![Node::ExpressionStatement {
            expression: Box::new(node),
        }]),
        node => Program::new(vec![node]),
    };
    tracing::debug!(statements = program.body.len(), "loaded IL program");
    Ok(program)
}

/// Load a program from JSON text.
pub fn load_program_str(text: &str) -> Result<Program, LoadError> {
    let value: Value = serde_json::from_str(text)?;
    load_program(&value)
}

/// Rewrite objects tagged with an unrecognized `type` into `Unknown` nodes.
fn normalize_unknown_kinds(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(kind)) = map.get("type")
                && !is_known_kind(kind)
            {
                tracing::trace!(kind = %kind, "unknown IL kind");
                let mut unknown = Map::new();
                unknown.insert("type".into(), Value::String("Unknown".into()));
                unknown.insert("kind".into(), Value::String(kind.clone()));
                return Value::Object(unknown);
            }
            Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), normalize_unknown_kinds(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_unknown_kinds).collect()),
        other => other.clone(),
    }
}

enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Path and message of the deepest tagged node that does not deserialize.
fn innermost_invalid<'a>(value: &'a Value, path: &mut Vec<Segment<'a>>) -> Option<(String, String)> {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(Segment::Index(i));
                let found = innermost_invalid(item, path);
                path.pop();
                if found.is_some() {
                    return found;
                }
            }
            None
        }
        Value::Object(map) => {
            for (key, child) in map {
                path.push(Segment::Key(key));
                let found = innermost_invalid(child, path);
                path.pop();
                if found.is_some() {
                    return found;
                }
            }
            let kind = map.get("type").and_then(Value::as_str)?;
            if is_nested_shape(kind) {
                return None;
            }
            serde_json::from_value::<Node>(value.clone())
                .err()
                .map(|err| (render_path(path), err.to_string()))
        }
        _ => None,
    }
}

fn render_path(path: &[Segment<'_>]) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let mut text = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) if text.is_empty() => text.push_str(key),
            Segment::Key(key) => {
                text.push('.');
                text.push_str(key);
            }
            Segment::Index(i) => text.push_str(&format!("[{i}]")),
        }
    }
    text
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_root_is_rejected() {
        let err = load_program(&Value::Null).unwrap_err();
        assert!(matches!(err, LoadError::NotAnObject("null")));
    }

    #[test]
    fn test_root_without_type_is_rejected() {
        let err = load_program(&json!({ "body": [] })).unwrap_err();
        assert!(matches!(err, LoadError::MissingType));
    }

    #[test]
    fn test_unknown_kind_becomes_placeholder() {
        let program = load_program(&json!({
            "type": "Program",
            "body": [
                { "type": "WithStatement", "object": { "type": "Identifier", "name": "o" } },
                { "type": "ExpressionStatement", "expression": { "type": "Decorator" } }
            ]
        }))
        .unwrap();
        assert_eq!(program.body[0].kind(), "WithStatement");
        let Node::ExpressionStatement { expression } = &program.body[1] else {
            panic!("expected expression statement");
        };
        assert_eq!(expression.kind(), "Decorator");
        assert!(matches!(**expression, Node::Unknown { .. }));
    }

    #[test]
    fn test_malformed_known_node_is_an_error() {
        let err = load_program(&json!({
            "type": "Program",
            "body": [{ "type": "ReturnStatement", "argument": { "type": "BinaryExpression", "operator": "+" } }]
        }))
        .unwrap_err();
        match &err {
            LoadError::Invalid { message, .. } => assert!(message.contains("left"), "{message}"),
            other => panic!("expected invalid node error, got {other}"),
        }
    }

    #[test]
    fn test_invalid_node_error_names_its_path() {
        let err = load_program(&json!({
            "type": "Program",
            "body": [
                { "type": "EmptyStatement" },
                { "type": "IfStatement", "test": { "type": "Identifier", "name": "ok" },
                  "consequent": { "type": "BlockStatement", "body": [{ "type": "ExpressionStatement" }] } }
            ]
        }))
        .unwrap_err();
        match &err {
            LoadError::Invalid { path, message } => {
                assert_eq!(path, "body[1].consequent.body[0]");
                assert!(message.contains("expression"), "{message}");
            }
            other => panic!("expected invalid node error, got {other}"),
        }
    }

    #[test]
    fn test_non_program_root_is_wrapped() {
        let program = load_program(&json!({ "type": "Identifier", "name": "x" })).unwrap();
        assert_eq!(program.body.len(), 1);
        assert_eq!(program.body[0].kind(), "ExpressionStatement");

        let program = load_program(&json!({ "type": "EmptyStatement" })).unwrap();
        assert_eq!(program.body[0].kind(), "EmptyStatement");
    }

    #[test]
    fn test_hex_literal_keeps_raw_spelling() {
        let program = load_program(&json!({
            "type": "ExpressionStatement",
            "expression": { "type": "Literal", "value": 255, "raw": "0xFF" }
        }))
        .unwrap();
        let Node::ExpressionStatement { expression } = &program.body[0] else {
            panic!("expected expression statement");
        };
        let Node::Literal(literal) = expression.as_ref() else {
            panic!("expected literal");
        };
        assert!(literal.is_hex());
        assert_eq!(literal.as_integer(), Some(255));
    }
}
