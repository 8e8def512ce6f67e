//! `python3 -m py_compile` adapter.

use super::{Validator, ValidatorInfo};
use crate::{Diagnostic, Language, ValidateOptions};
use std::path::Path;
use std::process::Command;

/// Byte-compiles the file, which reports syntax errors only.
pub struct PyCompile;

const PY_COMPILE_INFO: ValidatorInfo = ValidatorInfo {
    name: "py_compile",
    language: Language::Python,
    binaries: &["python3", "python"],
    website: "https://docs.python.org/3/library/py_compile.html",
};

impl Validator for PyCompile {
    fn info(&self) -> &ValidatorInfo {
        &PY_COMPILE_INFO
    }

    fn command(&self, binary: &Path, file: &Path, scratch: &Path, _options: &ValidateOptions) -> Command {
        let mut command = Command::new(binary);
        command
            .arg("-m")
            .arg("py_compile")
            .arg(file)
            .env("PYTHONPYCACHEPREFIX", scratch)
            .current_dir(scratch);
        command
    }

    fn parse(&self, output: &str) -> Vec<Diagnostic> {
        parse_py_compile_output(output)
    }
}

/// Parse traceback-style output:
///
/// ```text
///   File "generated.py", line 3
///     x = (
///         ^
/// SyntaxError: '(' was never closed
/// ```
fn parse_py_compile_output(output: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut line = None;
    for text in output.lines() {
        let trimmed = text.trim();
        if let Some(rest) = trimmed.strip_prefix("File \"")
            && let Some((_, position)) = rest.split_once("\", line ")
        {
            line = position
                .split(|c: char| !c.is_ascii_digit())
                .next()
                .and_then(|digits| digits.parse().ok());
            continue;
        }
        let message = trimmed.strip_prefix("Sorry: ").unwrap_or(trimmed);
        if let Some((kind, _)) = message.split_once(": ")
            && kind.ends_with("Error")
            && !kind.contains(' ')
        {
            diagnostics.push(Diagnostic {
                line,
                message: message.to_string(),
            });
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_syntax_errors() {
        let output = "  File \"/tmp/x/generated.py\", line 3\n    x = (\n        ^\nSyntaxError: '(' was never closed\n";
        assert_eq!(
            parse_py_compile_output(output),
            [Diagnostic {
                line: Some(3),
                message: "SyntaxError: '(' was never closed".to_string(),
            }]
        );
    }

    #[test]
    fn test_parses_sorry_lines() {
        let output = "Sorry: IndentationError: unexpected indent (generated.py, line 2)\n";
        let diagnostics = parse_py_compile_output(output);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with("IndentationError"));
    }
}
