use retarget_il::build::*;
use retarget_il::{BinaryOperator, ClassMember, Node, NumericType, load_program};
use serde_json::json;

#[test]
fn test_serialized_shape_is_estree() {
    let node = binary(BinaryOperator::Add, ident("a"), string("b"));
    insta::assert_json_snapshot!(node, @r#"
    {
      "type": "BinaryExpression",
      "operator": "+",
      "left": {
        "type": "Identifier",
        "name": "a"
      },
      "right": {
        "type": "Literal",
        "value": "b"
      }
    }
    "#);
}

#[test]
fn test_loads_wrapped_class_module() {
    let program = load_program(&json!({
        "type": "Program",
        "body": [{
            "type": "ExpressionStatement",
            "expression": {
                "type": "CallExpression",
                "callee": {
                    "type": "FunctionExpression",
                    "params": [],
                    "body": { "type": "BlockStatement", "body": [
                        { "type": "ExpressionStatement",
                          "expression": { "type": "Literal", "value": "use strict" } },
                        { "type": "ClassDeclaration",
                          "id": { "type": "Identifier", "name": "Cipher" },
                          "superClass": { "type": "Identifier", "name": "BlockCipherAlgorithm" },
                          "body": { "type": "ClassBody", "body": [
                              { "type": "MethodDefinition", "kind": "constructor",
                                "key": { "type": "Identifier", "name": "constructor" },
                                "value": { "type": "FunctionExpression", "params": [],
                                           "body": { "type": "BlockStatement", "body": [] } } },
                              { "type": "PropertyDefinition", "static": true,
                                "key": { "type": "Identifier", "name": "ROUNDS" },
                                "value": { "type": "Literal", "value": 16 } },
                              { "type": "AccessorProperty" }
                          ] } }
                    ] }
                },
                "arguments": []
            }
        }]
    }))
    .unwrap();

    let Node::ExpressionStatement { expression } = &program.body[0] else {
        panic!("expected expression statement");
    };
    let Node::CallExpression { callee, .. } = expression.as_ref() else {
        panic!("expected call");
    };
    let function = callee.as_inline_function().expect("inline function");
    let Node::ClassDeclaration(class) = &function.body_statements()[1] else {
        panic!("expected class");
    };
    assert_eq!(class.name(), Some("Cipher"));
    assert_eq!(class.body.body.len(), 3);
    assert!(matches!(
        class.body.body[1],
        ClassMember::PropertyDefinition { is_static: true, .. }
    ));
    assert!(matches!(
        &class.body.body[2],
        ClassMember::Unknown { kind } if kind == "AccessorProperty"
    ));
}

#[test]
fn test_semantic_nodes_use_camel_case_fields() {
    let program = load_program(&json!({
        "type": "ExpressionStatement",
        "expression": {
            "type": "TypedArrayCreation",
            "elementType": "uint8",
            "size": { "type": "Literal", "value": 16 }
        }
    }))
    .unwrap();
    let Node::ExpressionStatement { expression } = &program.body[0] else {
        panic!("expected expression statement");
    };
    assert!(matches!(
        expression.as_ref(),
        Node::TypedArrayCreation {
            element_type: NumericType::Uint8,
            size: Some(_),
            source: None,
        }
    ));
}

#[test]
fn test_rotation_width_defaults_to_32_bits() {
    let node: Node = serde_json::from_value(json!({
        "type": "RotateLeft",
        "value": { "type": "Identifier", "name": "x" },
        "amount": { "type": "Literal", "value": 7 }
    }))
    .unwrap();
    assert!(matches!(node, Node::RotateLeft { bits: 32, .. }));
}
