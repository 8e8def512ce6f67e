//! The public generation entry points.

use crate::helpers::resolve_helpers;
use crate::options::GenerateOptions;
use crate::registry::resolve_target;
use crate::traits::{Backend, Generated};
use retarget_il::{LoadError, Node, Program, load_program};
use retarget_stdlib::{StdlibBridge, StdlibError};
use serde_json::Value;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    MalformedInput(#[from] LoadError),

    #[error("unknown target `{0}`")]
    UnknownTarget(String),

    #[error("internal error in {target} target: {message}")]
    Internal { target: String, message: String },

    #[error(transparent)]
    Stdlib(#[from] StdlibError),
}

/// Runs generations, optionally resolving stdlib helpers through a bridge.
///
/// Each call builds a fresh transformer and emitter, so one `Generator` can
/// serve any number of generations, including concurrent ones.
#[derive(Clone, Default)]
pub struct Generator {
    stdlib: Option<Arc<StdlibBridge>>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdlib(mut self, bridge: Arc<StdlibBridge>) -> Self {
        self.stdlib = Some(bridge);
        self
    }

    pub fn stdlib(&self) -> Option<&StdlibBridge> {
        self.stdlib.as_deref()
    }

    /// Generate `target` source for an already loaded program.
    pub fn generate_from_ast(
        &self,
        program: &Program,
        target: &str,
        options: &GenerateOptions,
    ) -> Result<Generated, GenerateError> {
        let backend =
            resolve_target(target).ok_or_else(|| GenerateError::UnknownTarget(target.to_string()))?;
        let options = options.merged_over(&backend.default_options());

        let mut warnings = Vec::new();
        let resolved = match &self.stdlib {
            Some(bridge) => {
                let namespaces = options.helper_namespaces(&mut warnings);
                resolve_helpers(program, bridge, &namespaces, &mut warnings)
            }
            None => None,
        };
        let program = resolved.as_ref().unwrap_or(program);

        let mut generated = run_guarded(backend, program, &options)?;
        tracing::debug!(
            target_name = backend.name(),
            bytes = generated.code.len(),
            warnings = generated.warnings.len() + warnings.len(),
            "generated"
        );
        warnings.append(&mut generated.warnings);
        generated.warnings = warnings;
        Ok(generated)
    }

    /// Validate and load a JSON IL document, then generate.
    pub fn generate_from_json(
        &self,
        value: &Value,
        target: &str,
        options: &GenerateOptions,
    ) -> Result<Generated, GenerateError> {
        let program = load_program(value)?;
        self.generate_from_ast(&program, target, options)
    }

    /// Helper `name` rendered for `target`, cached in the bridge.
    ///
    /// `Ok(None)` when there is no bridge or the bridge does not know `name`.
    pub fn helper_code(&self, name: &str, target: &str) -> Result<Option<String>, GenerateError> {
        let Some(bridge) = &self.stdlib else {
            return Ok(None);
        };
        let backend =
            resolve_target(target).ok_or_else(|| GenerateError::UnknownTarget(target.to_string()))?;
        let options = backend.default_options();
        let code = bridge.get_method_code(name, backend.name(), |function| {
            let program = Program::new(vec![Node::FunctionDeclaration(function.clone())]);
            run_guarded(backend, &program, &options)
                .map(|generated| generated.code)
                .ok()
        })?;
        Ok(code)
    }
}

/// Generate with the default [`Generator`] (no stdlib bridge).
pub fn generate_from_ast(
    program: &Program,
    target: &str,
    options: &GenerateOptions,
) -> Result<Generated, GenerateError> {
    Generator::new().generate_from_ast(program, target, options)
}

/// Load and generate with the default [`Generator`].
pub fn generate_from_json(
    value: &Value,
    target: &str,
    options: &GenerateOptions,
) -> Result<Generated, GenerateError> {
    Generator::new().generate_from_json(value, target, options)
}

fn run_guarded(
    backend: &dyn Backend,
    program: &Program,
    options: &GenerateOptions,
) -> Result<Generated, GenerateError> {
    catch_unwind(AssertUnwindSafe(|| backend.generate(program, options))).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::warn!(target_name = backend.name(), %message, "generation panicked");
        GenerateError::Internal {
            target: backend.name().to_string(),
            message,
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_malformed_roots_are_rejected() {
        for value in [json!(null), json!([1, 2]), json!({ "body": [] })] {
            let err = generate_from_json(&value, "python", &GenerateOptions::new()).unwrap_err();
            assert!(matches!(err, GenerateError::MalformedInput(_)), "{err}");
        }
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        let err = generate_from_ast(&Program::default(), "cobol", &GenerateOptions::new()).unwrap_err();
        assert!(matches!(err, GenerateError::UnknownTarget(ref name) if name == "cobol"));
    }

    #[test]
    fn test_panic_messages_are_extracted() {
        let result: std::thread::Result<()> = catch_unwind(|| panic!("boom {}", 1));
        let payload = result.unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
    }
}
