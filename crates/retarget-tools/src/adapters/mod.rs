//! Compiler validators.
//!
//! Each adapter wraps one external compiler and provides:
//! - executable discovery on `PATH`
//! - the syntax-only command line
//! - output parsing to diagnostics

#[cfg(feature = "validator-cpp")]
mod cpp;
#[cfg(feature = "validator-csharp")]
mod csharp;
#[cfg(feature = "validator-python")]
mod python;

#[cfg(feature = "validator-cpp")]
pub use cpp::Cxx;
#[cfg(feature = "validator-csharp")]
pub use csharp::Csc;
#[cfg(feature = "validator-python")]
pub use python::PyCompile;

use crate::{Diagnostic, Language, Method, ValidateError, ValidateOptions, Validation, process};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Static description of a validator.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorInfo {
    pub name: &'static str,
    pub language: Language,
    /// Executables tried in order.
    pub binaries: &'static [&'static str],
    pub website: &'static str,
}

pub trait Validator: Send + Sync {
    fn info(&self) -> &ValidatorInfo;

    /// First of [`ValidatorInfo::binaries`] found on `PATH`.
    fn binary(&self) -> Option<PathBuf> {
        self.info()
            .binaries
            .iter()
            .find_map(|name| which::which(name).ok())
    }

    fn is_available(&self) -> bool {
        self.binary().is_some()
    }

    /// Command checking `file`. `scratch` is a writable directory for
    /// by-products such as object files.
    fn command(&self, binary: &Path, file: &Path, scratch: &Path, options: &ValidateOptions) -> Command;

    /// Problems named in the tool's combined output.
    fn parse(&self, output: &str) -> Vec<Diagnostic>;
}

/// All built-in validators.
#[allow(clippy::vec_init_then_push)]
pub fn all_validators() -> Vec<&'static dyn Validator> {
    let mut validators: Vec<&'static dyn Validator> = Vec::new();
    #[cfg(feature = "validator-python")]
    {
        static PY_COMPILE: PyCompile = PyCompile;
        validators.push(&PY_COMPILE);
    }
    #[cfg(feature = "validator-csharp")]
    {
        static CSC: Csc = Csc;
        validators.push(&CSC);
    }
    #[cfg(feature = "validator-cpp")]
    {
        static CXX: Cxx = Cxx;
        validators.push(&CXX);
    }
    validators
}

/// The first available validator for `language`.
pub fn validator_for(language: Language) -> Option<&'static dyn Validator> {
    all_validators()
        .into_iter()
        .find(|validator| validator.info().language == language && validator.is_available())
}

/// Check `source` with one validator, in a scratch directory that is
/// removed afterwards.
pub fn run_validator(
    validator: &dyn Validator,
    source: &str,
    options: &ValidateOptions,
) -> Result<Validation, ValidateError> {
    let info = validator.info();
    let binary = validator
        .binary()
        .ok_or_else(|| ValidateError::NotAvailable(format!("{} not found", info.name)))?;
    let scratch = tempfile::tempdir()?;
    let file = scratch
        .path()
        .join(format!("generated.{}", info.language.extension()));
    std::fs::write(&file, source)?;

    let command = validator.command(&binary, &file, scratch.path(), options);
    let output = process::run(command, options.timeout, &options.cancel)?;
    let passed = output.status.success();
    let mut diagnostics = Vec::new();
    if !passed {
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        diagnostics = validator.parse(&combined);
        if diagnostics.is_empty() {
            let message = match combined.trim() {
                "" => format!("{} exited with {}", info.name, output.status),
                text => text.to_string(),
            };
            diagnostics.push(Diagnostic { line: None, message });
        }
    }
    tracing::debug!(validator = info.name, passed, diagnostics = diagnostics.len(), "validated");
    Ok(Validation {
        method: Method::Compiler(info.name.to_string()),
        passed,
        diagnostics,
        fallback: None,
    })
}
