//! End-to-end runs of the `retarget` binary.

use serde_json::{Value, json};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn retarget(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_retarget"))
        .args(args)
        .current_dir(dir)
        // Keep the user's global config out of the runs.
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run retarget")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn id(name: &str) -> Value {
    json!({ "type": "Identifier", "name": name })
}

fn num(value: i64) -> Value {
    json!({ "type": "Literal", "value": value, "raw": value.to_string() })
}

/// `const total = 1 + 2;`
fn sum_program() -> Value {
    json!({
        "type": "Program",
        "body": [{
            "type": "VariableDeclaration",
            "kind": "const",
            "declarations": [{
                "type": "VariableDeclarator",
                "id": id("total"),
                "init": { "type": "BinaryExpression", "operator": "+", "left": num(1), "right": num(2) }
            }]
        }]
    })
}

fn write_json(dir: &Path, name: &str, value: &Value) {
    std::fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

#[test]
fn test_targets_lists_builtins() {
    let dir = TempDir::new().unwrap();
    let output = retarget(dir.path(), &["targets"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    for name in ["python", "csharp", "cpp"] {
        assert!(text.contains(name), "{name} missing from:\n{text}");
    }

    let output = retarget(dir.path(), &["targets", "--json"]);
    let listing: Value = serde_json::from_slice(&output.stdout).unwrap();
    let csharp = listing
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "csharp")
        .unwrap();
    assert_eq!(csharp["extension"], "cs");
    assert_eq!(csharp["defaults"]["namespace"], "Generated");
}

#[test]
fn test_generate_prints_single_target() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "sum.json", &sum_program());

    let output = retarget(dir.path(), &["generate", "sum.json", "--target", "py"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("total = 1 + 2"), "{}", stdout(&output));
}

#[test]
fn test_generate_writes_each_target_into_its_own_directory() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "sum.json", &sum_program());

    let output = retarget(
        dir.path(),
        &["generate", "sum.json", "--target", "python,csharp", "--target", "cpp", "-o", "out"],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let out = dir.path().join("out");
    for path in [
        "python/sum.py",
        "csharp/sum.cs",
        "csharp/Generated.csproj",
        "cpp/sum.cpp",
        "cpp/CMakeLists.txt",
    ] {
        assert!(out.join(path).is_file(), "{path} not written; stdout:\n{}", stdout(&output));
    }
}

#[test]
fn test_config_and_set_layering() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "sum.json", &sum_program());
    std::fs::write(
        dir.path().join("retarget.toml"),
        r#"
[generate]
targets = ["csharp"]
output = "out"

[targets.csharp]
namespace = "FromConfig"
className = "Totals"
"#,
    )
    .unwrap();

    let output = retarget(dir.path(), &["generate", "sum.json"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let code = std::fs::read_to_string(dir.path().join("out/sum.cs")).unwrap();
    assert!(code.contains("namespace FromConfig"), "{code}");
    assert!(code.contains("Totals"), "{code}");

    let output = retarget(dir.path(), &["generate", "sum.json", "--set", "csharp.namespace=FromFlag"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let code = std::fs::read_to_string(dir.path().join("out/sum.cs")).unwrap();
    assert!(code.contains("namespace FromFlag"), "{code}");
    assert!(code.contains("Totals"), "{code}");
    assert!(dir.path().join("out/FromFlag.csproj").is_file());
}

#[test]
fn test_explicit_config_file() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "three.json",
        &json!({
            "type": "Program",
            "body": [{
                "type": "FunctionDeclaration",
                "id": id("three"),
                "params": [],
                "body": { "type": "BlockStatement", "body": [{
                    "type": "ReturnStatement",
                    "argument": { "type": "BinaryExpression", "operator": "+", "left": num(1), "right": num(2) }
                }] }
            }]
        }),
    );
    std::fs::write(dir.path().join("custom.toml"), "[generate]\nindent = \"\\t\"\n").unwrap();

    let output = retarget(
        dir.path(),
        &["generate", "three.json", "-t", "cpp", "--config", "custom.toml", "--json"],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    let code = report[0]["code"].as_str().unwrap();
    assert!(code.contains("\n\treturn 1 + 2;"), "{code}");
}

#[test]
fn test_malformed_input_fails_without_output() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "bad.json", &json!([1, 2]));

    let output = retarget(dir.path(), &["generate", "bad.json", "-t", "python", "-o", "out"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("malformed IL"), "{}", stderr(&output));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_unknown_target_lists_available() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "sum.json", &sum_program());

    let output = retarget(dir.path(), &["generate", "sum.json", "-t", "cobol"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("unknown target `cobol`"), "{err}");
    assert!(err.contains("python, csharp, cpp"), "{err}");
}

#[test]
fn test_stdlib_helpers_are_prepended() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("stdlib")).unwrap();
    write_json(
        &dir.path().join("stdlib"),
        "Double.json",
        &json!({
            "type": "FunctionDeclaration",
            "id": id("Double"),
            "params": [id("x")],
            "body": { "type": "BlockStatement", "body": [{
                "type": "ReturnStatement",
                "argument": { "type": "BinaryExpression", "operator": "*", "left": id("x"), "right": num(2) }
            }] }
        }),
    );
    write_json(
        dir.path(),
        "twice.json",
        &json!({
            "type": "Program",
            "body": [{
                "type": "ExpressionStatement",
                "expression": {
                    "type": "CallExpression",
                    "callee": { "type": "MemberExpression", "object": id("OpCodes"), "property": id("Double"), "computed": false },
                    "arguments": [num(21)]
                }
            }]
        }),
    );

    let output = retarget(dir.path(), &["generate", "twice.json", "-t", "python", "--stdlib", "stdlib"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let code = stdout(&output);
    assert!(code.contains("def Double("), "{code}");
    assert!(code.contains("Double(21)"), "{code}");
    assert!(!code.contains("OpCodes"), "{code}");
}

#[test]
fn test_generate_validates_with_fallback() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "sum.json", &sum_program());

    // A zero timeout stops any installed compiler, so the balance scan decides.
    let output = retarget(
        dir.path(),
        &["generate", "sum.json", "-t", "cpp", "--validate", "--timeout", "0", "--json"],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report[0]["validation"]["passed"], true);
    assert_eq!(report[0]["validation"]["method"]["kind"], "balance");
}

#[test]
fn test_check_reports_first_imbalance() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("good.py"), "def f(x):\n    return (x + 1)\n").unwrap();
    std::fs::write(dir.path().join("bad.cpp"), "int main() {\n    return (1;\n}\n").unwrap();

    let output = retarget(dir.path(), &["check", "good.py", "--no-compiler"]);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("good.py: ok"));

    let output = retarget(dir.path(), &["check", "bad.cpp", "--no-compiler", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let validation: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(validation["passed"], false);
    assert_eq!(validation["diagnostics"][0]["line"], 3);
}

#[test]
fn test_check_needs_a_known_language() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "(").unwrap();
    let output = retarget(dir.path(), &["check", "notes.txt"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--language"), "{}", stderr(&output));
}
