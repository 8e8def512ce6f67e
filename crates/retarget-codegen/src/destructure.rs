//! Flattening destructuring patterns into single bindings.
//!
//! `const [a, , [b, c], ...rest] = arr;` becomes one binding per name, each
//! carrying the access path from the destructured value:
//!
//! ```text
//! a    <- [0]
//! b    <- [2][0]
//! c    <- [2][1]
//! rest <- [3..]
//! ```
//!
//! Holes produce no binding, and every binding keeps the index it had in
//! the pattern.

use retarget_il::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Index(usize),
    Key(String),
    /// Everything from this index on (`...rest`).
    RestFrom(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternBinding<'a> {
    pub name: String,
    pub path: Vec<Access>,
    /// Default from `[a = 1] = ...`.
    pub default: Option<&'a Node>,
}

/// Whether `id` is a pattern rather than a plain name.
pub fn is_pattern(id: &Node) -> bool {
    matches!(id, Node::ArrayPattern { .. } | Node::ObjectPattern { .. })
}

/// Flatten `pattern` into bindings, in source order.
pub fn bindings(pattern: &Node) -> Vec<PatternBinding<'_>> {
    let mut out = Vec::new();
    collect(pattern, Vec::new(), None, &mut out);
    out
}

fn collect<'a>(
    node: &'a Node,
    path: Vec<Access>,
    default: Option<&'a Node>,
    out: &mut Vec<PatternBinding<'a>>,
) {
    match node {
        Node::Identifier(id) => out.push(PatternBinding {
            name: id.name.clone(),
            path,
            default,
        }),
        Node::AssignmentPattern { left, right } => collect(left, path, Some(&**right), out),
        Node::ArrayPattern { elements } => {
            for (index, element) in elements.iter().enumerate() {
                let Some(element) = element else { continue };
                let mut child = path.clone();
                match element {
                    Node::RestElement { argument } => {
                        child.push(Access::RestFrom(index));
                        collect(argument, child, None, out);
                    }
                    other => {
                        child.push(Access::Index(index));
                        collect(other, child, None, out);
                    }
                }
            }
        }
        Node::ObjectPattern { properties } => {
            for property in properties {
                let Node::Property {
                    key,
                    value,
                    computed: false,
                    ..
                } = property
                else {
                    continue;
                };
                let Some(key) = key.property_name() else {
                    continue;
                };
                let mut child = path.clone();
                child.push(Access::Key(key));
                collect(value, child, None, out);
            }
        }
        _ => {}
    }
}

/// Pattern parts [`bindings`] cannot express, described for a warning.
pub fn unsupported_parts(pattern: &Node) -> Vec<&'static str> {
    let mut parts = Vec::new();
    pattern.walk(&mut |node| {
        if let Node::ObjectPattern { properties } = node {
            for property in properties {
                match property {
                    Node::RestElement { .. } => parts.push("object rest pattern"),
                    Node::Property { key, computed, .. } if *computed || key.property_name().is_none() => {
                        parts.push("computed pattern key")
                    }
                    _ => {}
                }
            }
        }
    });
    parts
}

/// Whether destructuring `init` directly would evaluate it more than once
/// with side effects. Names, `this` and plain member chains are safe to
/// repeat; anything else goes through a temporary first.
pub fn needs_temporary(init: &Node) -> bool {
    match init {
        Node::Identifier(_) | Node::ThisExpression {} => false,
        Node::MemberExpression {
            object,
            property,
            computed,
        } => needs_temporary(object) || (*computed && !matches!(**property, Node::Literal(_))),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retarget_il::build::*;

    #[test]
    fn test_holes_keep_original_indices() {
        let pattern = Node::ArrayPattern {
            elements: vec![None, Some(ident("b")), None],
        };
        let bound = bindings(&pattern);
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].name, "b");
        assert_eq!(bound[0].path, [Access::Index(1)]);
    }

    #[test]
    fn test_nested_rest_and_defaults() {
        let pattern = Node::ArrayPattern {
            elements: vec![
                Some(Node::AssignmentPattern {
                    left: Box::new(ident("a")),
                    right: Box::new(int(1)),
                }),
                Some(Node::ArrayPattern {
                    elements: vec![Some(ident("b"))],
                }),
                Some(Node::RestElement {
                    argument: Box::new(ident("rest")),
                }),
            ],
        };
        let bound = bindings(&pattern);
        let names: Vec<_> = bound.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "rest"]);
        assert!(bound[0].default.is_some());
        assert_eq!(bound[1].path, [Access::Index(1), Access::Index(0)]);
        assert_eq!(bound[2].path, [Access::RestFrom(2)]);
    }

    #[test]
    fn test_object_pattern_reads_keys() {
        let pattern = Node::ObjectPattern {
            properties: vec![property("x", ident("px")), property("y", ident("y"))],
        };
        let bound = bindings(&pattern);
        assert_eq!(bound[0].name, "px");
        assert_eq!(bound[0].path, [Access::Key("x".into())]);
    }

    #[test]
    fn test_object_rest_is_reported() {
        let pattern = Node::ObjectPattern {
            properties: vec![
                property("x", ident("x")),
                Node::RestElement {
                    argument: Box::new(ident("others")),
                },
            ],
        };
        assert_eq!(bindings(&pattern).len(), 1);
        assert_eq!(unsupported_parts(&pattern), ["object rest pattern"]);
        assert!(unsupported_parts(&Node::ArrayPattern { elements: vec![Some(ident("a"))] }).is_empty());
    }

    #[test]
    fn test_calls_need_a_temporary() {
        assert!(!needs_temporary(&member(this(), "state")));
        assert!(needs_temporary(&call(ident("split"), vec![])));
        assert!(needs_temporary(&index(ident("a"), ident("i"))));
    }
}
