//! Python 3.10+ target.

pub mod ast;
mod emit;
mod semantic;
mod transform;

pub use emit::PythonEmitter;
pub use transform::PythonTransformer;

use crate::options::{FlagReader, GenerateOptions};
use crate::traits::Target;

/// Options understood by the Python target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonOptions {
    /// Annotate parameters, returns and variables with typed IL hints.
    pub type_hints: bool,
    /// Keep IL docs as docstrings.
    pub doc_comments: bool,
    /// Emit `class Base: pass` for base classes defined outside the unit.
    pub framework_stubs: bool,
    pub module_docstring: Option<String>,
}

impl Default for PythonOptions {
    fn default() -> Self {
        Self {
            type_hints: true,
            doc_comments: true,
            framework_stubs: true,
            module_docstring: None,
        }
    }
}

pub struct PythonTarget;

pub static PYTHON_TARGET: PythonTarget = PythonTarget;

impl Target for PythonTarget {
    type Options = PythonOptions;
    type Unit = ast::Module;
    type Transformer = PythonTransformer;
    type Emitter = PythonEmitter;

    fn name(&self) -> &'static str {
        "python"
    }

    fn extension(&self) -> &'static str {
        "py"
    }

    fn description(&self) -> &'static str {
        "Python 3.10+ module"
    }

    fn default_options(&self) -> GenerateOptions {
        let defaults = PythonOptions::default();
        GenerateOptions::new()
            .with_flag("typeHints", defaults.type_hints)
            .with_flag("docComments", defaults.doc_comments)
            .with_flag("frameworkStubs", defaults.framework_stubs)
    }

    fn configure(&self, flags: &mut FlagReader<'_>) -> PythonOptions {
        let defaults = PythonOptions::default();
        PythonOptions {
            type_hints: flags.bool("typeHints", defaults.type_hints),
            doc_comments: flags.bool("docComments", defaults.doc_comments),
            framework_stubs: flags.bool("frameworkStubs", defaults.framework_stubs),
            module_docstring: flags.opt_string("moduleDocstring"),
        }
    }

    fn transformer(&self, options: &PythonOptions) -> PythonTransformer {
        PythonTransformer::new(options.clone())
    }

    fn emitter(&self, _options: &PythonOptions, indent: &str) -> PythonEmitter {
        PythonEmitter::new(indent)
    }
}
