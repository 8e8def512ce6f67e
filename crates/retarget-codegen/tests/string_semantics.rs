//! What the string and bit kinds compute once emitted, per target.

use retarget_codegen::{GenerateOptions, Generated, generate_from_json};
use serde_json::{Value, json};
use std::process::Command;

fn id(name: &str) -> Value {
    json!({ "type": "Identifier", "name": name })
}

fn num(value: i64) -> Value {
    json!({ "type": "Literal", "value": value, "raw": value.to_string() })
}

fn text(value: &str) -> Value {
    json!({ "type": "Literal", "value": value, "raw": format!("{value:?}") })
}

fn log(value: Value) -> Value {
    json!({
        "type": "ExpressionStatement",
        "expression": { "type": "DebugOutput", "arguments": [value] }
    })
}

fn program(body: Vec<Value>) -> Value {
    json!({ "type": "Program", "body": body })
}

fn generate(il: &Value, target: &str) -> Generated {
    generate_from_json(il, target, &GenerateOptions::new())
        .unwrap_or_else(|err| panic!("{target}: {err}"))
}

/// Substring with swapped and negative bounds, padding with a two-character
/// fill, `charAt` past the end and the length of a non-ASCII literal.
fn string_kinds() -> Value {
    program(vec![
        log(json!({ "type": "StringSubstring", "string": text("hello"), "start": num(3), "end": num(1) })),
        log(json!({ "type": "StringSubstring", "string": text("hello"), "start": num(-2) })),
        log(json!({ "type": "StringPadStart", "string": text("abc"), "length": num(6), "fill": text("xy") })),
        log(json!({ "type": "StringPadEnd", "string": text("abc"), "length": num(6), "fill": text("xy") })),
        log(json!({ "type": "StringCharAt", "string": text("abc"), "index": num(5) })),
        log(json!({ "type": "StringLength", "string": text("h\u{e9}llo") })),
    ])
}

#[test]
fn test_python_string_kinds() {
    let generated = generate(&string_kinds(), "python");
    assert!(generated.warnings.is_empty(), "{:?}", generated.warnings);
    let code = generated.code;
    for expected in [
        "print(\"hello\"[1:3])",
        "print(\"hello\"[0:])",
        "print((\"xy\" * 6)[:max(6 - len(\"abc\"), 0)] + \"abc\")",
        "print(\"abc\" + (\"xy\" * 6)[:max(6 - len(\"abc\"), 0)])",
        "print(\"abc\"[5:5 + 1])",
    ] {
        assert!(code.contains(expected), "missing {expected}:\n{code}");
    }
    assert!(!code.contains("rjust"), "{code}");
}

#[test]
fn test_python_string_kinds_run_like_js() {
    let generated = generate(&string_kinds(), "python");
    // Only checked where an interpreter is installed.
    let Ok(output) = Command::new("python3").arg("-c").arg(&generated.code).output() else {
        return;
    };
    assert!(
        output.status.success(),
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        generated.code
    );
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "el\nhello\nxyxabc\nabcxyx\n\n5\n"
    );
}

#[test]
fn test_csharp_string_kinds() {
    let code = generate(&string_kinds(), "csharp").code;
    for expected in [
        "Substring(\"hello\", 3, 1)",
        "PadStart(\"abc\", 6, \"xy\")",
        "PadEnd(\"abc\", 6, \"xy\")",
        "CharAt(\"abc\", 5)",
        "internal static string PadStart(string text, int length, string fill)",
        "internal static string CharAt(string text, int index)",
    ] {
        assert!(code.contains(expected), "missing {expected}:\n{code}");
    }
    assert!(!code.contains("PadLeft"), "{code}");
}

#[test]
fn test_cpp_literal_length_and_byte_output() {
    let il = program(vec![
        log(json!({ "type": "StringLength", "string": text("h\u{e9}llo") })),
        log(json!({ "type": "RotateLeft", "value": num(129), "amount": num(1), "bits": 8 })),
        log(json!({ "type": "Cast", "expression": num(200), "targetType": "int8" })),
    ]);
    let code = generate(&il, "cpp").code;
    for expected in [
        "std::cout << 5 << '\\n'",
        "static_cast<int>(std::rotl(static_cast<uint8_t>(129), 1))",
        "static_cast<int>(static_cast<int8_t>(200))",
    ] {
        assert!(code.contains(expected), "missing {expected}:\n{code}");
    }
    assert!(!code.contains("std::ssize(\""), "{code}");
}

#[test]
fn test_degenerate_rotation_only_warns() {
    let il = program(vec![
        log(json!({ "type": "RotateLeft", "value": id("x"), "amount": num(1), "bits": 0 })),
        log(num(1)),
    ]);
    for target in ["python", "csharp", "cpp"] {
        let generated = generate(&il, target);
        assert!(
            generated.warnings.iter().any(|w| w == "unsupported construct: 0-bit rotation"),
            "{target}: {:?}",
            generated.warnings
        );
    }
}

#[test]
fn test_object_rest_pattern_warns() {
    let pattern = json!({
        "type": "ObjectPattern",
        "properties": [
            { "type": "Property", "key": id("x"), "value": id("x") },
            { "type": "RestElement", "argument": id("others") }
        ]
    });
    let il = program(vec![json!({
        "type": "FunctionDeclaration",
        "id": id("split"),
        "params": [id("point")],
        "body": { "type": "BlockStatement", "body": [{
            "type": "VariableDeclaration",
            "kind": "const",
            "declarations": [{ "type": "VariableDeclarator", "id": pattern, "init": id("point") }]
        }] }
    })]);
    for target in ["python", "csharp", "cpp"] {
        let generated = generate(&il, target);
        assert!(
            generated.warnings.iter().any(|w| w == "unsupported construct: object rest pattern"),
            "{target}: {:?}",
            generated.warnings
        );
    }
}
