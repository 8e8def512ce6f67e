//! Roslyn `csc` adapter.

use super::{Validator, ValidatorInfo};
use crate::{Diagnostic, Language, ValidateOptions};
use std::path::Path;
use std::process::Command;

/// Compiles the file as a library into the scratch directory.
pub struct Csc;

const CSC_INFO: ValidatorInfo = ValidatorInfo {
    name: "csc",
    language: Language::CSharp,
    binaries: &["csc"],
    website: "https://github.com/dotnet/roslyn",
};

impl Validator for Csc {
    fn info(&self) -> &ValidatorInfo {
        &CSC_INFO
    }

    fn command(&self, binary: &Path, file: &Path, scratch: &Path, _options: &ValidateOptions) -> Command {
        let mut command = Command::new(binary);
        command
            .arg("-nologo")
            .arg("-target:library")
            .arg(format!("-out:{}", scratch.join("generated.dll").display()))
            .arg(file)
            .current_dir(scratch);
        command
    }

    fn parse(&self, output: &str) -> Vec<Diagnostic> {
        parse_csc_output(output)
    }
}

/// Format: `generated.cs(10,5): error CS1002: ; expected`
fn parse_csc_output(output: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for text in output.lines() {
        let Some((location, rest)) = text.split_once("): ") else {
            continue;
        };
        if !rest.starts_with("error") {
            continue;
        }
        let line = location
            .rsplit_once('(')
            .and_then(|(_, position)| position.split(',').next())
            .and_then(|line| line.parse().ok());
        diagnostics.push(Diagnostic {
            line,
            message: rest.to_string(),
        });
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_errors_and_skips_warnings() {
        let output = "generated.cs(4,9): warning CS0168: unused\ngenerated.cs(10,5): error CS1002: ; expected\n";
        assert_eq!(
            parse_csc_output(output),
            [Diagnostic {
                line: Some(10),
                message: "error CS1002: ; expected".to_string(),
            }]
        );
    }
}
