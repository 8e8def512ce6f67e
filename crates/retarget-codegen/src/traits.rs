//! Traits every target implements.
//!
//! A target is a typed pair: a [`Transformer`] lowering the IL into the
//! target's own tree, and an [`Emitter`] printing that tree. [`Target`] ties
//! the pair to its options; the blanket [`Backend`] impl erases the types so
//! targets can sit in one registry.

use crate::options::{FlagReader, GenerateOptions};
use retarget_il::Program;
use serde::Serialize;

/// Lowers an IL program into a target compilation unit.
///
/// Implementations keep per-run state (scopes, temp counters, hoisted
/// definitions) and must reset it at the start of every `transform` call.
pub trait Transformer {
    type Unit;

    fn transform(&mut self, program: &Program) -> Self::Unit;

    /// Diagnostics collected by the last `transform` call.
    fn take_warnings(&mut self) -> Vec<String>;
}

/// Prints a target compilation unit as source text.
pub trait Emitter {
    type Unit;

    fn emit(&mut self, unit: &Self::Unit) -> String;

    fn take_warnings(&mut self) -> Vec<String>;
}

/// An auxiliary file a generated program needs to build (`.csproj`, `CMakeLists.txt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildFile {
    pub path: String,
    pub contents: String,
}

/// The result of one successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Generated {
    pub code: String,
    pub dependencies: Vec<BuildFile>,
    pub warnings: Vec<String>,
}

/// A code generation target with typed options and a typed unit.
pub trait Target: Send + Sync {
    type Options;
    type Unit;
    type Transformer: Transformer<Unit = Self::Unit>;
    type Emitter: Emitter<Unit = Self::Unit>;

    /// Target identifier (e.g., "python", "csharp").
    fn name(&self) -> &'static str;

    /// File extension for output (e.g., "py").
    fn extension(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Every flag this target understands, with its default value.
    fn default_options(&self) -> GenerateOptions;

    /// Read typed options; wrong-typed flags fall back to defaults with a warning.
    fn configure(&self, flags: &mut FlagReader<'_>) -> Self::Options;

    fn transformer(&self, options: &Self::Options) -> Self::Transformer;

    fn emitter(&self, options: &Self::Options, indent: &str) -> Self::Emitter;

    fn build_files(&self, _options: &Self::Options, _unit: &Self::Unit) -> Vec<BuildFile> {
        Vec::new()
    }
}

/// Object-safe view of a [`Target`], used by the registry.
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    fn extension(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn default_options(&self) -> GenerateOptions;

    /// Run transformer, emitter and build-file collection.
    ///
    /// `options` are expected to be merged over [`Backend::default_options`] already.
    fn generate(&self, program: &Program, options: &GenerateOptions) -> Generated;
}

impl<T: Target> Backend for T {
    fn name(&self) -> &'static str {
        Target::name(self)
    }

    fn extension(&self) -> &'static str {
        Target::extension(self)
    }

    fn description(&self) -> &'static str {
        Target::description(self)
    }

    fn default_options(&self) -> GenerateOptions {
        Target::default_options(self)
    }

    fn generate(&self, program: &Program, options: &GenerateOptions) -> Generated {
        let mut warnings = Vec::new();
        let mut reader = FlagReader::new(options, &mut warnings);
        let typed = self.configure(&mut reader);
        reader.finish();

        let mut transformer = self.transformer(&typed);
        let unit = transformer.transform(program);
        warnings.extend(transformer.take_warnings());

        let indent = options.indent.as_deref().unwrap_or("    ");
        let mut emitter = self.emitter(&typed, indent);
        let code = emitter.emit(&unit);
        warnings.extend(emitter.take_warnings());

        let line_ending = options.line_ending.unwrap_or_default();
        Generated {
            code: line_ending.apply(code),
            dependencies: self
                .build_files(&typed, &unit)
                .into_iter()
                .map(|file| BuildFile {
                    contents: line_ending.apply(file.contents),
                    ..file
                })
                .collect(),
            warnings,
        }
    }
}
