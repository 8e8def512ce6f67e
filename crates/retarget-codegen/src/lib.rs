//! Retargetable code generation from the `retarget` IL.
//!
//! Generation is a two-stage pipeline per target: a [`Transformer`] lowers the
//! IL into a target tree, an [`Emitter`] prints that tree. Targets register in
//! a process-wide registry and are looked up by name:
//!
//! ```ignore
//! use retarget_codegen::{GenerateOptions, generate_from_json};
//!
//! let generated = generate_from_json(&il, "python", &GenerateOptions::new())?;
//! println!("{}", generated.code);
//! for warning in &generated.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! ```
//!
//! Nothing a target does can fail the whole generation: unsupported nodes turn
//! into marker comments plus warnings. Only malformed input, an unknown target
//! name, or a panic inside a target is reported as an error.

pub mod destructure;
pub mod escape;
pub mod helpers;
pub mod infer;
pub mod lower;
pub mod options;
pub mod pipeline;
pub mod precedence;
pub mod registry;
pub mod reorder;
pub mod targets;
pub mod traits;
pub mod types;
pub mod unwrap;
pub mod writer;

pub use options::{FlagReader, GenerateOptions, LineEnding, OptionError};
pub use pipeline::{GenerateError, Generator, generate_from_ast, generate_from_json};
pub use registry::{register_target, resolve_target, target_for_extension, target_for_name, targets as list_targets};
pub use traits::{Backend, BuildFile, Emitter, Generated, Target, Transformer};
pub use types::{Primitive, TypeRef, TypeSyntax};
