//! Properties every built-in target must hold, checked on JSON IL fixtures.

use retarget_codegen::{GenerateOptions, Generated, generate_from_json};
use retarget_tools::{Language, check_balanced};
use serde_json::{Value, json};

const TARGETS: &[(&str, Language)] = &[
    ("python", Language::Python),
    ("csharp", Language::CSharp),
    ("cpp", Language::Cpp),
];

fn id(name: &str) -> Value {
    json!({ "type": "Identifier", "name": name })
}

fn num(value: i64) -> Value {
    json!({ "type": "Literal", "value": value, "raw": value.to_string() })
}

fn binary(operator: &str, left: Value, right: Value) -> Value {
    json!({ "type": "BinaryExpression", "operator": operator, "left": left, "right": right })
}

fn stmt(expression: Value) -> Value {
    json!({ "type": "ExpressionStatement", "expression": expression })
}

fn declare(kind: &str, target: Value, init: Value) -> Value {
    json!({
        "type": "VariableDeclaration",
        "kind": kind,
        "declarations": [{ "type": "VariableDeclarator", "id": target, "init": init }]
    })
}

fn block(body: Vec<Value>) -> Value {
    json!({ "type": "BlockStatement", "body": body })
}

fn class(name: &str, members: Vec<Value>) -> Value {
    json!({ "type": "ClassDeclaration", "id": id(name), "body": { "type": "ClassBody", "body": members } })
}

fn program(body: Vec<Value>) -> Value {
    json!({ "type": "Program", "body": body })
}

fn generate(il: &Value, target: &str) -> Generated {
    generate_from_json(il, target, &GenerateOptions::new())
        .unwrap_or_else(|err| panic!("{target}: {err}"))
}

/// A small block cipher exercising classes, loops, switches and semantic kinds.
fn cipher() -> Value {
    let rounds = json!({
        "type": "PropertyDefinition",
        "static": true,
        "key": id("ROUNDS"),
        "value": num(8)
    });
    let constructor = json!({
        "type": "MethodDefinition",
        "kind": "constructor",
        "key": id("constructor"),
        "value": {
            "type": "FunctionExpression",
            "params": [json!({ "type": "Identifier", "name": "key", "resultType": "uint8[]" })],
            "body": block(vec![stmt(json!({
                "type": "AssignmentExpression",
                "operator": "=",
                "left": { "type": "MemberExpression", "object": { "type": "ThisExpression" },
                          "property": id("key"), "computed": false },
                "right": id("key")
            }))])
        }
    });
    let mix = json!({
        "type": "MethodDefinition",
        "kind": "method",
        "key": id("mix"),
        "value": {
            "type": "FunctionExpression",
            "params": [json!({ "type": "Identifier", "name": "word", "resultType": "uint32" })],
            "returnType": "uint32",
            "docs": "Rotate and fold one word.",
            "body": block(vec![
                declare("let", json!({ "type": "Identifier", "name": "x", "resultType": "uint32" }), id("word")),
                json!({
                    "type": "ForStatement",
                    "init": declare("let", id("i"), num(0)),
                    "test": binary("<", id("i"), num(4)),
                    "update": { "type": "UpdateExpression", "operator": "++", "prefix": false, "argument": id("i") },
                    "body": block(vec![stmt(json!({
                        "type": "AssignmentExpression",
                        "operator": "=",
                        "left": id("x"),
                        "right": { "type": "RotateLeft", "value": id("x"), "amount": num(7), "bits": 32 }
                    }))])
                }),
                json!({
                    "type": "SwitchStatement",
                    "discriminant": binary("&", id("x"), num(3)),
                    "cases": [
                        { "test": num(0), "consequent": [
                            stmt(json!({ "type": "AssignmentExpression", "operator": "^=",
                                         "left": id("x"), "right": { "type": "Literal", "value": 255, "raw": "0xFF" } })),
                            { "type": "BreakStatement" }
                        ] },
                        { "test": null, "consequent": [{ "type": "BreakStatement" }] }
                    ]
                }),
                json!({ "type": "ReturnStatement", "argument": id("x") }),
            ])
        }
    });
    program(vec![
        class("Cipher", vec![rounds, constructor, mix]),
        declare(
            "const",
            id("cipher"),
            json!({ "type": "NewExpression", "callee": id("Cipher"),
                    "arguments": [{ "type": "ArrayExpression", "elements": [num(1), num(2)] }] }),
        ),
        stmt(json!({
            "type": "DebugOutput",
            "arguments": [{ "type": "CallExpression",
                            "callee": { "type": "MemberExpression", "object": id("cipher"),
                                        "property": id("mix"), "computed": false },
                            "arguments": [num(42)] }]
        })),
    ])
}

#[test]
fn test_output_is_balanced_for_every_target() {
    let il = cipher();
    for (target, language) in TARGETS {
        let generated = generate(&il, target);
        assert!(
            check_balanced(&generated.code, *language).is_ok(),
            "{target} output is unbalanced:\n{}",
            generated.code
        );
        assert!(generated.code.contains("Cipher"), "{target}:\n{}", generated.code);
    }
}

#[test]
fn test_generation_is_idempotent() {
    let il = cipher();
    for (target, _) in TARGETS {
        let first = generate(&il, target);
        let second = generate(&il, target);
        assert_eq!(first, second, "{target} differs between runs");
    }
}

#[test]
fn test_parentheses_follow_precedence() {
    let il = program(vec![
        declare("let", id("a"), num(1)),
        declare("let", id("b"), num(2)),
        declare("let", id("c"), num(3)),
        declare("let", id("x"), binary("*", binary("+", id("a"), id("b")), id("c"))),
        declare("let", id("y"), binary("-", id("a"), binary("-", id("b"), id("c")))),
        declare("let", id("z"), binary("-", binary("-", id("a"), id("b")), id("c"))),
    ]);
    for (target, _) in TARGETS {
        let code = generate(&il, target).code;
        assert!(code.contains("(a + b) * c"), "{target}:\n{code}");
        assert!(code.contains("a - (b - c)"), "{target}:\n{code}");
        assert!(code.contains("a - b - c"), "{target}:\n{code}");
    }
}

#[test]
fn test_wrapper_around_one_class_yields_the_class() {
    let wrapped = program(vec![stmt(json!({
        "type": "CallExpression",
        "callee": {
            "type": "FunctionExpression",
            "params": [],
            "body": block(vec![
                stmt(json!({ "type": "Literal", "value": "use strict" })),
                class("Cipher", vec![]),
            ])
        },
        "arguments": []
    }))]);
    let bare = program(vec![class("Cipher", vec![])]);
    for (target, _) in TARGETS {
        let code = generate(&wrapped, target).code;
        assert_eq!(code, generate(&bare, target).code, "{target}");
        assert_eq!(code.matches("class Cipher").count(), 1, "{target}:\n{code}");
    }
}

#[test]
fn test_unknown_kind_degrades_to_a_warning() {
    let il = program(vec![
        json!({ "type": "WithStatement", "object": id("scope") }),
        declare("let", id("after"), num(1)),
    ]);
    for (target, language) in TARGETS {
        let generated = generate(&il, target);
        assert!(
            generated.warnings.iter().any(|w| w.contains("WithStatement")),
            "{target}: {:?}",
            generated.warnings
        );
        assert!(generated.code.contains("WithStatement"), "{target}:\n{}", generated.code);
        assert!(generated.code.contains("after"), "{target}:\n{}", generated.code);
        assert!(check_balanced(&generated.code, *language).is_ok(), "{target}");
    }
}

#[test]
fn test_classes_are_defined_before_construction() {
    let il = program(vec![
        declare("const", id("instance"), json!({ "type": "NewExpression", "callee": id("Widget"), "arguments": [] })),
        class("Widget", vec![]),
    ]);
    for target in ["python", "cpp"] {
        let code = generate(&il, target).code;
        let defined = code.find("class Widget").unwrap_or_else(|| panic!("{target}:\n{code}"));
        let constructed = code.find("instance =").unwrap_or_else(|| panic!("{target}:\n{code}"));
        assert!(defined < constructed, "{target}:\n{code}");
    }
}

#[test]
fn test_destructuring_holes_bind_only_named_elements() {
    let pattern = json!({ "type": "ArrayPattern", "elements": [null, id("b"), null] });
    let il = program(vec![json!({
        "type": "FunctionDeclaration",
        "id": id("second"),
        "params": [id("arr")],
        "body": block(vec![
            declare("const", pattern, id("arr")),
            json!({ "type": "ReturnStatement", "argument": id("b") }),
        ])
    })]);
    for (target, _) in TARGETS {
        let code = generate(&il, target).code;
        assert!(code.contains("arr[1]"), "{target}:\n{code}");
        assert!(!code.contains("arr[0]"), "{target}:\n{code}");
        assert!(!code.contains("arr[2]"), "{target}:\n{code}");
    }
}

#[test]
fn test_build_files_follow_the_target() {
    let il = cipher();
    let csharp = generate(&il, "csharp");
    assert_eq!(csharp.dependencies.len(), 1);
    assert!(csharp.dependencies[0].path.ends_with(".csproj"));
    let cpp = generate(&il, "cpp");
    assert_eq!(cpp.dependencies[0].path, "CMakeLists.txt");
    assert!(cpp.dependencies[0].contents.contains("add_executable"));
    assert!(generate(&il, "python").dependencies.is_empty());
}

#[test]
fn test_targets_resolve_by_extension() {
    let il = program(vec![declare("let", id("x"), num(1))]);
    for (name, extension) in [("python", "py"), ("csharp", "cs"), ("cpp", "cpp")] {
        assert_eq!(generate(&il, name), generate(&il, extension), "{name}");
    }
}
