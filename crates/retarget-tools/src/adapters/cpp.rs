//! `g++`/`clang++ -fsyntax-only` adapter.

use super::{Validator, ValidatorInfo};
use crate::{Diagnostic, Language, ValidateOptions};
use std::path::Path;
use std::process::Command;

/// Parses and type-checks the file without code generation.
pub struct Cxx;

const CXX_INFO: ValidatorInfo = ValidatorInfo {
    name: "c++",
    language: Language::Cpp,
    binaries: &["g++", "clang++", "c++"],
    website: "https://gcc.gnu.org/",
};

impl Validator for Cxx {
    fn info(&self) -> &ValidatorInfo {
        &CXX_INFO
    }

    fn command(&self, binary: &Path, file: &Path, scratch: &Path, options: &ValidateOptions) -> Command {
        let mut command = Command::new(binary);
        command
            .arg(format!("-std={}", options.cpp_standard))
            .arg("-fsyntax-only")
            .arg(file)
            .current_dir(scratch);
        command
    }

    fn parse(&self, output: &str) -> Vec<Diagnostic> {
        parse_gcc_output(output)
    }
}

/// Format: `generated.cpp:3:5: error: expected ';' before '}' token`
fn parse_gcc_output(output: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for text in output.lines() {
        let Some((location, message)) = text.split_once(": error: ") else {
            continue;
        };
        let mut parts = location.rsplitn(3, ':');
        let _column = parts.next();
        let line = parts.next().and_then(|line| line.parse().ok());
        diagnostics.push(Diagnostic {
            line,
            message: format!("error: {message}"),
        });
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_gcc_errors() {
        let output = "/tmp/a/generated.cpp: In function 'int main()':\n/tmp/a/generated.cpp:3:5: error: expected ';' before '}' token\n";
        assert_eq!(
            parse_gcc_output(output),
            [Diagnostic {
                line: Some(3),
                message: "error: expected ';' before '}' token".to_string(),
            }]
        );
    }
}
