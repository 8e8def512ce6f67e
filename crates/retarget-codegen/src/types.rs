//! The type model used by statically typed targets.
//!
//! A [`TypeRef`] is built by wrapping: `uint8[][]` is `Array(Array(UInt8))`,
//! never a string with brackets appended. Rendering walks the wrappers with a
//! target's [`TypeSyntax`], so one value always prints the same way.

use retarget_il::NumericType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Bool,
    Char,
    String,
    Void,
    /// The target's dynamic/any type.
    Any,
}

impl Primitive {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Primitive::Int8
                | Primitive::UInt8
                | Primitive::Int16
                | Primitive::UInt16
                | Primitive::Int32
                | Primitive::UInt32
                | Primitive::Int64
                | Primitive::UInt64
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, Primitive::Float32 | Primitive::Float64)
    }
}

impl From<NumericType> for Primitive {
    fn from(ty: NumericType) -> Self {
        match ty {
            NumericType::Int8 => Primitive::Int8,
            NumericType::Uint8 => Primitive::UInt8,
            NumericType::Int16 => Primitive::Int16,
            NumericType::Uint16 => Primitive::UInt16,
            NumericType::Int32 => Primitive::Int32,
            NumericType::Uint32 => Primitive::UInt32,
            NumericType::Int64 => Primitive::Int64,
            NumericType::Uint64 => Primitive::UInt64,
            NumericType::Float32 => Primitive::Float32,
            NumericType::Float64 => Primitive::Float64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(Primitive),
    /// A class or generic type: `List<T>`, `Map<K, V>`, `Cipher`.
    Named { name: String, args: Vec<TypeRef> },
    Array(Box<TypeRef>),
    Nullable(Box<TypeRef>),
    Pointer(Box<TypeRef>),
    Reference(Box<TypeRef>),
    Tuple(Vec<TypeRef>),
}

impl TypeRef {
    pub const ANY: TypeRef = TypeRef::Primitive(Primitive::Any);
    pub const INT: TypeRef = TypeRef::Primitive(Primitive::Int32);
    pub const UINT: TypeRef = TypeRef::Primitive(Primitive::UInt32);
    pub const DOUBLE: TypeRef = TypeRef::Primitive(Primitive::Float64);
    pub const BOOL: TypeRef = TypeRef::Primitive(Primitive::Bool);
    pub const STRING: TypeRef = TypeRef::Primitive(Primitive::String);
    pub const VOID: TypeRef = TypeRef::Primitive(Primitive::Void);

    pub fn named(name: &str) -> Self {
        TypeRef::Named {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: &str, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.to_string(),
            args,
        }
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn list(element: TypeRef) -> Self {
        TypeRef::generic("List", vec![element])
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::generic("Map", vec![key, value])
    }

    /// A byte sequence.
    pub fn bytes() -> Self {
        TypeRef::array(TypeRef::Primitive(Primitive::UInt8))
    }

    pub fn nullable(self) -> Self {
        match self {
            TypeRef::Nullable(_) => self,
            other => TypeRef::Nullable(Box::new(other)),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TypeRef::Primitive(Primitive::Any))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, TypeRef::Primitive(Primitive::String))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, TypeRef::Named { name, .. } if name == "List")
    }

    pub fn is_map(&self) -> bool {
        matches!(self, TypeRef::Named { name, .. } if name == "Map")
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            TypeRef::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Element type of an array or list.
    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(inner) => Some(inner),
            TypeRef::Named { name, args } if name == "List" => args.first(),
            TypeRef::Nullable(inner) | TypeRef::Reference(inner) => inner.element(),
            _ => None,
        }
    }

    pub fn render(&self, syntax: &impl TypeSyntax) -> String {
        match self {
            TypeRef::Primitive(p) => syntax.primitive(*p).to_string(),
            TypeRef::Named { name, args } => {
                let args: Vec<String> = args.iter().map(|arg| arg.render(syntax)).collect();
                syntax.named(name, &args)
            }
            TypeRef::Array(inner) => syntax.array(inner.render(syntax)),
            TypeRef::Nullable(inner) => syntax.nullable(inner.render(syntax)),
            TypeRef::Pointer(inner) => syntax.pointer(inner.render(syntax)),
            TypeRef::Reference(inner) => syntax.reference(inner.render(syntax)),
            TypeRef::Tuple(items) => {
                syntax.tuple(items.iter().map(|item| item.render(syntax)).collect())
            }
        }
    }
}

/// How a target spells each part of the type model.
pub trait TypeSyntax {
    fn primitive(&self, primitive: Primitive) -> &'static str;

    /// `name` with already-rendered type arguments. Targets map the neutral
    /// `List`/`Map` names here.
    fn named(&self, name: &str, args: &[String]) -> String;

    fn array(&self, element: String) -> String;

    fn nullable(&self, inner: String) -> String;

    fn pointer(&self, inner: String) -> String {
        format!("{inner}*")
    }

    fn reference(&self, inner: String) -> String {
        format!("{inner}&")
    }

    fn tuple(&self, items: Vec<String>) -> String;
}

/// Parse an IL type annotation (`uint32`, `uint8[]`, `List<string>`,
/// `Map<string, int32>`, `Cipher?`).
pub fn parse_il_type(text: &str) -> TypeRef {
    let text = text.trim();
    if let Some(inner) = text.strip_suffix("[]") {
        return TypeRef::array(parse_il_type(inner));
    }
    if let Some(inner) = text.strip_suffix('?') {
        return parse_il_type(inner).nullable();
    }
    if let Some(open) = text.find('<')
        && text.ends_with('>')
    {
        let name = text[..open].trim();
        let args = split_type_args(&text[open + 1..text.len() - 1])
            .into_iter()
            .map(parse_il_type)
            .collect();
        return match name {
            "Array" | "List" => TypeRef::generic("List", args),
            "Map" | "Record" | "Dictionary" => TypeRef::generic("Map", args),
            other => TypeRef::generic(other, args),
        };
    }
    if let Some(numeric) = NumericType::parse(text) {
        // Typed-array names describe arrays, not scalars.
        if text.ends_with("Array") {
            return TypeRef::array(TypeRef::Primitive(numeric.into()));
        }
        return TypeRef::Primitive(numeric.into());
    }
    match text {
        "bool" | "boolean" => TypeRef::BOOL,
        "string" => TypeRef::STRING,
        "char" => TypeRef::Primitive(Primitive::Char),
        "void" | "undefined" => TypeRef::VOID,
        "" | "any" | "object" | "unknown" | "dynamic" => TypeRef::ANY,
        "bytes" => TypeRef::bytes(),
        other => TypeRef::named(other),
    }
}

/// Split at top-level commas: `string, List<int32>` → `["string", "List<int32>"]`.
fn split_type_args(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Angle;

    impl TypeSyntax for Angle {
        fn primitive(&self, primitive: Primitive) -> &'static str {
            match primitive {
                Primitive::UInt8 => "u8",
                Primitive::String => "str",
                _ => "x",
            }
        }

        fn named(&self, name: &str, args: &[String]) -> String {
            if args.is_empty() {
                name.to_string()
            } else {
                format!("{name}<{}>", args.join(", "))
            }
        }

        fn array(&self, element: String) -> String {
            format!("[{element}]")
        }

        fn nullable(&self, inner: String) -> String {
            format!("{inner}?")
        }

        fn tuple(&self, items: Vec<String>) -> String {
            format!("({})", items.join(", "))
        }
    }

    #[test]
    fn test_nested_types_compose_by_wrapping() {
        let ty = parse_il_type("Map<string, uint8[][]>");
        assert_eq!(
            ty,
            TypeRef::map(
                TypeRef::STRING,
                TypeRef::array(TypeRef::array(TypeRef::Primitive(Primitive::UInt8)))
            )
        );
        assert_eq!(ty.render(&Angle), "Map<str, [[u8]]>");
        assert_eq!(ty.render(&Angle), ty.clone().render(&Angle));
    }

    #[test]
    fn test_typed_array_names_are_arrays() {
        assert_eq!(parse_il_type("Uint8Array"), TypeRef::bytes());
        assert_eq!(parse_il_type("uint8"), TypeRef::Primitive(Primitive::UInt8));
        assert_eq!(parse_il_type("Cipher?"), TypeRef::named("Cipher").nullable());
    }

    #[test]
    fn test_nullable_does_not_stack() {
        let ty = TypeRef::STRING.nullable().nullable();
        assert_eq!(ty.render(&Angle), "str?");
    }
}
