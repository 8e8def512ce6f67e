use retarget_il::build::*;
use retarget_il::{BinaryOperator, Node};
use retarget_stdlib::{JsonDirSource, MethodSource, StdlibBridge, StdlibError};
use std::fs;

fn write(dir: &std::path::Path, name: &str, node: &Node) {
    let text = serde_json::to_string_pretty(node).unwrap();
    fs::write(dir.join(format!("{name}.json")), text).unwrap();
}

#[test]
fn test_loads_declarations_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "Xor",
        &function_decl(
            "Xor",
            &["a", "b"],
            vec![ret(Some(binary(BinaryOperator::BitXor, ident("a"), ident("b"))))],
        ),
    );
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let source = JsonDirSource::new(dir.path());
    assert_eq!(source.names(), ["Xor"]);

    let function = source.load("Xor").unwrap().unwrap();
    assert_eq!(function.name(), Some("Xor"));
    assert_eq!(function.params.len(), 2);
    assert!(source.load("Missing").unwrap().is_none());
}

#[test]
fn test_anonymous_arrow_gets_requested_name_and_block_body() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Double", &arrow(&["x"], binary(BinaryOperator::Mul, ident("x"), int(2))));

    let bridge = StdlibBridge::new(JsonDirSource::new(dir.path()));
    let function = bridge.get_method_ast("Double").unwrap().unwrap();
    assert_eq!(function.name(), Some("Double"));
    assert!(!function.expression);
    assert!(matches!(
        function.body_statements(),
        [Node::ReturnStatement { argument: Some(_) }]
    ));
}

#[test]
fn test_non_function_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Answer", &const_decl("Answer", int(42)));

    let err = JsonDirSource::new(dir.path()).load("Answer").unwrap_err();
    assert!(matches!(err, StdlibError::NotAFunction { ref kind, .. } if kind == "VariableDeclaration"));
}

#[test]
fn test_malformed_json_names_the_method() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Broken.json"), "{ not json").unwrap();

    let err = JsonDirSource::new(dir.path()).load("Broken").unwrap_err();
    assert!(err.to_string().contains("Broken"), "{err}");
}

#[test]
fn test_path_like_names_are_never_read() {
    let dir = tempfile::tempdir().unwrap();
    let source = JsonDirSource::new(dir.path().join("lib"));
    assert!(source.load("../secret").unwrap().is_none());
    assert!(source.names().is_empty());
}
