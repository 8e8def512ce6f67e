//! Cached access to helper ASTs and their per-target renderings.

use crate::StdlibError;
use crate::source::MethodSource;
use retarget_il::Function;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Looks up standard-library helpers by name and caches both the parsed AST
/// and the code each target renders from it.
///
/// Lookups of unknown names are cached too, so a missing helper is only
/// searched for once. Safe to share across threads.
pub struct StdlibBridge {
    source: Box<dyn MethodSource>,
    asts: RwLock<HashMap<String, Option<Arc<Function>>>>,
    code: RwLock<HashMap<(String, String), Option<String>>>,
}

impl StdlibBridge {
    pub fn new(source: impl MethodSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            asts: RwLock::new(HashMap::new()),
            code: RwLock::new(HashMap::new()),
        }
    }

    /// The AST of helper `name`, or `None` if the source does not have it.
    pub fn get_method_ast(&self, name: &str) -> Result<Option<Arc<Function>>, StdlibError> {
        if let Ok(asts) = self.asts.read()
            && let Some(cached) = asts.get(name)
        {
            return Ok(cached.clone());
        }

        let loaded = self.source.load(name)?.map(Arc::new);
        match &loaded {
            Some(_) => tracing::debug!(name, "loaded stdlib method"),
            None => tracing::debug!(name, "stdlib method not found"),
        }
        if let Ok(mut asts) = self.asts.write() {
            asts.insert(name.to_string(), loaded.clone());
        }
        Ok(loaded)
    }

    /// ASTs for every name the source knows, in the order requested.
    /// Unknown names are skipped.
    pub fn get_methods_as_ast(&self, names: &[&str]) -> Result<Vec<Arc<Function>>, StdlibError> {
        let mut found = Vec::with_capacity(names.len());
        for name in names {
            if let Some(function) = self.get_method_ast(name)? {
                found.push(function);
            }
        }
        Ok(found)
    }

    /// Helper `name` rendered for `target`.
    ///
    /// `render` is only called on a cache miss; its result, including
    /// `None`, is cached per (name, target).
    pub fn get_method_code(
        &self,
        name: &str,
        target: &str,
        render: impl FnOnce(&Function) -> Option<String>,
    ) -> Result<Option<String>, StdlibError> {
        let key = (name.to_string(), target.to_string());
        if let Ok(code) = self.code.read()
            && let Some(cached) = code.get(&key)
        {
            return Ok(cached.clone());
        }

        let rendered = match self.get_method_ast(name)? {
            Some(function) => render(&function),
            None => None,
        };
        if let Ok(mut code) = self.code.write() {
            code.insert(key, rendered.clone());
        }
        Ok(rendered)
    }

    /// Names the underlying source can provide.
    pub fn available(&self) -> Vec<String> {
        self.source.names()
    }

    /// Drop both caches.
    pub fn clear_cache(&self) {
        if let Ok(mut asts) = self.asts.write() {
            asts.clear();
        }
        if let Ok(mut code) = self.code.write() {
            code.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemorySource;
    use retarget_il::build::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: InMemorySource,
        loads: Arc<AtomicUsize>,
    }

    impl MethodSource for Counting {
        fn load(&self, name: &str) -> Result<Option<Function>, StdlibError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(name)
        }

        fn names(&self) -> Vec<String> {
            self.inner.names()
        }
    }

    fn rotl() -> Function {
        function(Some("RotL32"), &["x", "n"], vec![ret(Some(ident("x")))])
    }

    #[test]
    fn test_ast_lookups_are_cached() {
        let loads = Arc::new(AtomicUsize::new(0));
        let bridge = StdlibBridge::new(Counting {
            inner: InMemorySource::new().with_method("RotL32", rotl()),
            loads: loads.clone(),
        });

        assert!(bridge.get_method_ast("RotL32").unwrap().is_some());
        assert!(bridge.get_method_ast("RotL32").unwrap().is_some());
        assert!(bridge.get_method_ast("Missing").unwrap().is_none());
        assert!(bridge.get_method_ast("Missing").unwrap().is_none());
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        bridge.clear_cache();
        bridge.get_method_ast("RotL32").unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_methods_as_ast_skip_unknown_names() {
        let bridge = StdlibBridge::new(InMemorySource::new().with_method("RotL32", rotl()));
        let found = bridge.get_methods_as_ast(&["Nope", "RotL32"]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), Some("RotL32"));
    }

    #[test]
    fn test_code_is_rendered_once_per_target() {
        let bridge = StdlibBridge::new(InMemorySource::new().with_method("RotL32", rotl()));
        let mut renders = 0;
        for _ in 0..3 {
            let code = bridge
                .get_method_code("RotL32", "python", |f| {
                    renders += 1;
                    Some(format!("def {}(): ...", f.name().unwrap_or_default()))
                })
                .unwrap();
            assert_eq!(code.as_deref(), Some("def RotL32(): ..."));
        }
        assert_eq!(renders, 1);

        let other = bridge
            .get_method_code("RotL32", "cpp", |_| Some("auto RotL32() {}".into()))
            .unwrap();
        assert_eq!(other.as_deref(), Some("auto RotL32() {}"));
    }
}
