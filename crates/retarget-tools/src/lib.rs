//! Checks for generated source text.
//!
//! Two methods, tried in order:
//! - an external compiler in syntax-only mode (`python3 -m py_compile`,
//!   `csc`, `g++ -fsyntax-only`), run with a timeout and a cancellation flag
//! - a local scan that brackets are balanced outside strings and comments
//!
//! A missing compiler is never an error: [`validate`] falls back to the
//! local scan and reports which method produced the verdict.

pub mod adapters;
pub mod balance;
pub mod process;

pub use adapters::{Validator, ValidatorInfo, all_validators, run_validator, validator_for};
pub use balance::{Imbalance, check_balanced};

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Languages the checks understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    CSharp,
    Cpp,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" => Some(Language::Python),
            "cs" => Some(Language::CSharp),
            "cpp" | "cc" | "cxx" | "hpp" | "h" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Language of a code generation target, by target name or extension.
    pub fn from_target(name: &str) -> Option<Self> {
        match name {
            "python" => Some(Language::Python),
            "csharp" => Some(Language::CSharp),
            _ => Self::from_extension(name),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::CSharp => "cs",
            Language::Cpp => "cpp",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::CSharp => "csharp",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("no validator available: {0}")]
    NotAvailable(String),

    #[error("{tool} timed out after {}ms", after.as_millis())]
    TimedOut { tool: String, after: Duration },

    #[error("validation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a verdict was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tool", rename_all = "lowercase")]
pub enum Method {
    Compiler(String),
    Balance,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Compiler(tool) => write!(f, "{tool}"),
            Method::Balance => f.write_str("balanced-syntax check"),
        }
    }
}

/// One problem reported by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub method: Method,
    pub passed: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Why the compiler was not used, when the balance scan stood in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Try external compilers before the balance scan.
    pub use_compilers: bool,
    pub timeout: Duration,
    /// Set from another thread to stop a running compiler.
    pub cancel: Arc<AtomicBool>,
    /// `-std=` value passed to C++ compilers.
    pub cpp_standard: String,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            use_compilers: true,
            timeout: Duration::from_secs(30),
            cancel: Arc::new(AtomicBool::new(false)),
            cpp_standard: "c++20".to_string(),
        }
    }
}

/// Check `source` with the best available method.
pub fn validate(source: &str, language: Language, options: &ValidateOptions) -> Validation {
    let fallback = if options.use_compilers {
        match validator_for(language) {
            Some(validator) => match run_validator(validator, source, options) {
                Ok(validation) => return validation,
                Err(err) => {
                    tracing::debug!(validator = validator.info().name, %err, "falling back to balance scan");
                    Some(err.to_string())
                }
            },
            None => Some(ValidateError::NotAvailable(format!("no {language} compiler on PATH")).to_string()),
        }
    } else {
        None
    };

    let diagnostics = match check_balanced(source, language) {
        Ok(()) => Vec::new(),
        Err(imbalance) => vec![Diagnostic {
            line: Some(imbalance.line()),
            message: imbalance.to_string(),
        }],
    };
    Validation {
        method: Method::Balance,
        passed: diagnostics.is_empty(),
        diagnostics,
        fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_lookup() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_target("csharp"), Some(Language::CSharp));
        assert_eq!(Language::from_target("cpp"), Some(Language::Cpp));
        assert_eq!(Language::from_path(Path::new("out/main.cs")), Some(Language::CSharp));
        assert_eq!(Language::from_extension("rs"), None);
    }

    #[test]
    fn test_balance_only_validation() {
        let options = ValidateOptions {
            use_compilers: false,
            ..ValidateOptions::default()
        };
        let ok = validate("def f():\n    return (1, [2])\n", Language::Python, &options);
        assert_eq!(ok.method, Method::Balance);
        assert!(ok.passed);
        assert_eq!(ok.fallback, None);

        let broken = validate("int main() {\n    return (1;\n}\n", Language::Cpp, &options);
        assert!(!broken.passed);
        assert_eq!(broken.diagnostics[0].line, Some(3));
    }
}
