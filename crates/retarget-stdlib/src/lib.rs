//! Standard-library helpers for generated code.
//!
//! IL programs may call helpers such as `OpCodes.RotL32(x, n)` that are not
//! part of any target's runtime. Their canonical bodies are themselves IL
//! functions, provided by a [`MethodSource`]; the [`StdlibBridge`] fetches
//! them by name and caches both the AST and each target's rendering of it.
//!
//! ```ignore
//! let bridge = StdlibBridge::new(JsonDirSource::new("stdlib/"));
//! let rotl = bridge.get_method_ast("RotL32")?;
//! ```

mod bridge;
mod source;

pub use bridge::StdlibBridge;
pub use source::{InMemorySource, JsonDirSource, MethodSource};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StdlibError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stdlib method {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: retarget_il::LoadError,
    },

    #[error("stdlib method {name} is not a function (found {kind})")]
    NotAFunction { name: String, kind: String },
}
