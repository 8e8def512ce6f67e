//! Registry of code generation targets.
//!
//! Built-in targets register themselves on first lookup. Custom targets can be
//! added with [`register_target`]:
//!
//! ```ignore
//! use retarget_codegen::{Target, register_target};
//!
//! static LUA: LuaTarget = LuaTarget;
//! register_target(&LUA);
//! ```
//!
//! Lookups are exact-match and case-sensitive.

use crate::traits::Backend;
use std::sync::{OnceLock, PoisonError, RwLock};

static TARGETS: RwLock<Vec<&'static dyn Backend>> = RwLock::new(Vec::new());
static TARGETS_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Register a custom target. If two targets share a name, the first one
/// registered wins.
pub fn register_target(target: &'static dyn Backend) {
    tracing::debug!(target_name = target.name(), "registering target");
    TARGETS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(target);
}

fn init_targets() {
    TARGETS_INITIALIZED.get_or_init(|| {
        #[cfg(feature = "target-python")]
        {
            register_target(&crate::targets::python::PYTHON_TARGET);
        }
        #[cfg(feature = "target-csharp")]
        {
            register_target(&crate::targets::csharp::CSHARP_TARGET);
        }
        #[cfg(feature = "target-cpp")]
        {
            register_target(&crate::targets::cpp::CPP_TARGET);
        }
    });
}

fn find(pred: impl Fn(&&'static dyn Backend) -> bool) -> Option<&'static dyn Backend> {
    init_targets();
    TARGETS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .find(|t| pred(t))
        .copied()
}

/// Get a target by name (e.g., "python").
pub fn target_for_name(name: &str) -> Option<&'static dyn Backend> {
    find(|t| t.name() == name)
}

/// Get a target by output file extension (e.g., "py").
pub fn target_for_extension(ext: &str) -> Option<&'static dyn Backend> {
    find(|t| t.extension() == ext)
}

/// Resolve a target given either its name or its extension.
pub fn resolve_target(name_or_ext: &str) -> Option<&'static dyn Backend> {
    target_for_name(name_or_ext).or_else(|| target_for_extension(name_or_ext))
}

/// All registered targets, in registration order.
pub fn targets() -> Vec<&'static dyn Backend> {
    init_targets();
    TARGETS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "target-python")]
    fn test_python_lookup() {
        let target = target_for_name("python").expect("python target");
        assert_eq!(target.extension(), "py");
        let target = target_for_extension("py").expect("py extension");
        assert_eq!(target.name(), "python");
    }

    #[test]
    #[cfg(feature = "target-csharp")]
    fn test_lookup_is_case_sensitive() {
        assert!(target_for_name("csharp").is_some());
        assert!(target_for_name("CSharp").is_none());
        assert!(target_for_extension("CS").is_none());
    }

    #[test]
    #[cfg(feature = "target-cpp")]
    fn test_resolve_by_extension() {
        let target = resolve_target("cpp").expect("cpp target");
        assert_eq!(target.name(), "cpp");
        assert!(resolve_target("cobol").is_none());
    }

    #[test]
    fn test_targets_lists_builtins() {
        let names: Vec<_> = targets().iter().map(|t| t.name()).collect();
        #[cfg(feature = "target-python")]
        assert!(names.contains(&"python"));
        #[cfg(feature = "target-csharp")]
        assert!(names.contains(&"csharp"));
        let _ = names;
    }
}
