//! Where helper function bodies come from.

use crate::StdlibError;
use retarget_il::{Function, Identifier, Node, load_program_str};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A provider of helper function ASTs by name.
pub trait MethodSource: Send + Sync {
    /// Load one method; `Ok(None)` when the source does not know the name.
    fn load(&self, name: &str) -> Result<Option<Function>, StdlibError>;

    /// Every name this source can provide, sorted.
    fn names(&self) -> Vec<String>;
}

/// Methods held in memory, e.g. registered by an embedding application.
#[derive(Default)]
pub struct InMemorySource {
    methods: BTreeMap<String, Function>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, name: &str, function: Function) -> Self {
        self.insert(name, function);
        self
    }

    pub fn insert(&mut self, name: &str, function: Function) {
        self.methods.insert(name.to_string(), function);
    }
}

impl MethodSource for InMemorySource {
    fn load(&self, name: &str) -> Result<Option<Function>, StdlibError> {
        Ok(self.methods.get(name).cloned())
    }

    fn names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }
}

/// A directory of `<name>.json` files, each holding one IL function
/// (a `FunctionDeclaration`, or a `Program` whose first statement is one).
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        // Names are identifiers; anything else cannot be a helper file.
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            return None;
        }
        Some(self.root.join(format!("{name}.json")))
    }
}

impl MethodSource for JsonDirSource {
    fn load(&self, name: &str) -> Result<Option<Function>, StdlibError> {
        let Some(path) = self.path_for(name) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|source| StdlibError::Io {
            path: path.clone(),
            source,
        })?;
        let program = load_program_str(&text).map_err(|source| StdlibError::Parse {
            name: name.to_string(),
            source,
        })?;
        let node = program
            .body
            .into_iter()
            .next()
            .ok_or_else(|| StdlibError::NotAFunction {
                name: name.to_string(),
                kind: "empty program".to_string(),
            })?;
        as_function(name, node).map(Some)
    }

    fn names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                (path.extension()? == "json")
                    .then(|| path.file_stem()?.to_str().map(str::to_string))
                    .flatten()
            })
            .collect();
        names.sort();
        names
    }
}

/// Accept a function declaration or a bound function expression, and make
/// sure the result carries `name`.
pub(crate) fn as_function(name: &str, node: Node) -> Result<Function, StdlibError> {
    let mut function = match node {
        Node::FunctionDeclaration(function)
        | Node::FunctionExpression(function)
        | Node::ArrowFunctionExpression(function) => function,
        Node::ExpressionStatement { expression } => return as_function(name, *expression),
        other => {
            return Err(StdlibError::NotAFunction {
                name: name.to_string(),
                kind: other.kind().to_string(),
            });
        }
    };
    if function.id.as_ref().is_none_or(|id| id.name != name) {
        function.id = Some(Identifier::new(name));
    }
    // Helpers become declarations; a concise arrow body gets a block.
    if function.expression || !matches!(*function.body, Node::BlockStatement { .. }) {
        let body = std::mem::replace(
            &mut function.body,
            Box::new(Node::BlockStatement { body: Vec::new() }),
        );
        function.body = Box::new(Node::BlockStatement {
            body: vec![Node::ReturnStatement {
                argument: Some(body),
            }],
        });
        function.expression = false;
    }
    Ok(function)
}
