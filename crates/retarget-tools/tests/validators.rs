use retarget_tools::{
    Diagnostic, Language, Method, ValidateError, ValidateOptions, Validator, ValidatorInfo, run_validator,
    validate,
};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// A validator whose executable does not exist.
struct Missing;

const MISSING_INFO: ValidatorInfo = ValidatorInfo {
    name: "missing",
    language: Language::Python,
    binaries: &["retarget-test-no-such-compiler"],
    website: "",
};

impl Validator for Missing {
    fn info(&self) -> &ValidatorInfo {
        &MISSING_INFO
    }

    fn command(&self, binary: &Path, _file: &Path, _scratch: &Path, _options: &ValidateOptions) -> Command {
        Command::new(binary)
    }

    fn parse(&self, _output: &str) -> Vec<Diagnostic> {
        Vec::new()
    }
}

/// A shell stand-in that rejects any file containing `BAD`.
#[cfg(unix)]
struct Grep;

#[cfg(unix)]
const GREP_INFO: ValidatorInfo = ValidatorInfo {
    name: "grep-check",
    language: Language::Cpp,
    binaries: &["sh"],
    website: "",
};

#[cfg(unix)]
impl Validator for Grep {
    fn info(&self) -> &ValidatorInfo {
        &GREP_INFO
    }

    fn command(&self, binary: &Path, file: &Path, _scratch: &Path, _options: &ValidateOptions) -> Command {
        let mut command = Command::new(binary);
        command.arg("-c").arg(
            "if grep -n BAD \"$1\"; then echo \"$1:$(grep -n BAD \"$1\" | cut -d: -f1):1: error: bad\"; exit 1; fi",
        );
        command.arg("sh").arg(file);
        command
    }

    fn parse(&self, output: &str) -> Vec<Diagnostic> {
        output
            .lines()
            .filter_map(|line| line.split_once(": error: "))
            .map(|(location, message)| Diagnostic {
                line: location.split(':').nth(1).and_then(|n| n.parse().ok()),
                message: message.to_string(),
            })
            .collect()
    }
}

#[test]
fn test_missing_compiler_is_not_available() {
    let err = run_validator(&Missing, "x = 1\n", &ValidateOptions::default()).unwrap_err();
    assert!(matches!(err, ValidateError::NotAvailable(_)), "{err}");
    assert!(!Missing.is_available());
}

#[cfg(unix)]
#[test]
fn test_compiler_verdicts_carry_diagnostics() {
    let options = ValidateOptions::default();
    let good = run_validator(&Grep, "int main() {}\n", &options).unwrap();
    assert!(good.passed);
    assert_eq!(good.method, Method::Compiler("grep-check".into()));

    let bad = run_validator(&Grep, "int main() {\n    BAD;\n}\n", &options).unwrap();
    assert!(!bad.passed);
    assert_eq!(
        bad.diagnostics,
        [Diagnostic {
            line: Some(2),
            message: "bad".into()
        }]
    );
}

#[cfg(unix)]
#[test]
fn test_cancelled_validation_is_an_error() {
    let options = ValidateOptions::default();
    options.cancel.store(true, std::sync::atomic::Ordering::Relaxed);
    let err = run_validator(&Grep, "int main() {}\n", &options).unwrap_err();
    assert!(matches!(err, ValidateError::Cancelled), "{err}");
}

#[test]
fn test_validate_falls_back_to_balance_scan() {
    // A zero timeout makes any installed compiler time out, so the scan
    // always produces the verdict.
    let options = ValidateOptions {
        timeout: Duration::ZERO,
        ..ValidateOptions::default()
    };
    let validation = validate("int main() {\n    return 0;\n", Language::Cpp, &options);
    assert_eq!(validation.method, Method::Balance);
    assert!(!validation.passed);
    assert!(validation.fallback.is_some());
    assert!(validation.diagnostics[0].message.contains("never closed"));
}

#[test]
fn test_python_syntax_errors_are_reported() {
    if which::which("python3").is_err() {
        return;
    }
    let validation = validate("def f(:\n    pass\n", Language::Python, &ValidateOptions::default());
    assert_eq!(validation.method, Method::Compiler("py_compile".into()));
    assert!(!validation.passed);
    assert_eq!(validation.diagnostics[0].line, Some(1));
}
