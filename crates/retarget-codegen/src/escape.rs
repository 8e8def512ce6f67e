//! String literal escaping and identifier sanitization.

use std::fmt::Write;

/// Python keywords, plus builtins the generated code relies on.
pub const PYTHON_RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield", "print", "len", "list", "dict", "str", "int", "bytes", "type",
];

pub const CSHARP_RESERVED: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

pub const CPP_RESERVED: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "class", "const", "constexpr", "const_cast", "continue", "decltype", "default", "delete",
    "do", "double", "dynamic_cast", "else", "enum", "explicit", "export", "extern", "false",
    "float", "for", "friend", "goto", "if", "inline", "int", "long", "mutable", "namespace",
    "new", "noexcept", "not", "nullptr", "operator", "or", "private", "protected", "public",
    "register", "reinterpret_cast", "return", "short", "signed", "sizeof", "static",
    "static_assert", "static_cast", "struct", "switch", "template", "this", "throw", "true",
    "try", "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual", "void",
    "volatile", "while", "xor", "main",
];

/// How a reserved name is made legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rename {
    /// `class` → `class_`
    Suffix,
    /// `class` → `@class` (C# verbatim identifiers)
    Verbatim,
}

/// Make an IL identifier legal in a target: `$` becomes `_`, reserved
/// words are renamed.
pub fn sanitize_identifier(name: &str, reserved: &[&str], rename: Rename) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if reserved.contains(&out.as_str()) {
        match rename {
            Rename::Suffix => out.push('_'),
            Rename::Verbatim => out.insert(0, '@'),
        }
    }
    out
}

/// Double-quoted C# literal.
pub fn csharp_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if (c as u32) < 0x20 || c as u32 == 0x7F => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Double-quoted C++ literal. Control bytes use three-digit octal escapes,
/// which cannot swallow a following digit the way `\x` can.
pub fn cpp_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7F => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Python literal. Double quotes are the default; single quotes are used
/// when they need fewer escapes.
pub fn python_string(value: &str) -> String {
    let doubles = value.matches('"').count();
    let singles = value.matches('\'').count();
    let quote = if doubles > singles { '\'' } else { '"' };

    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7F => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Decimal spelling of a non-integral or out-of-range number, always
/// recognizable as floating point (`2.0`, `0.5`, `1e300`).
pub fn float_literal(value: f64) -> String {
    let text = if value.abs() >= 1e21 || (value != 0.0 && value.abs() < 1e-6) {
        format!("{value:e}")
    } else {
        value.to_string()
    };
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

/// Text of a line comment, with line breaks flattened.
pub fn comment_text(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_switches_delimiter() {
        assert_eq!(python_string("plain"), "\"plain\"");
        assert_eq!(python_string("say \"hi\""), "'say \"hi\"'");
        assert_eq!(python_string("it's"), "\"it's\"");
        assert_eq!(python_string("a\"b'c"), "\"a\\\"b'c\"");
    }

    #[test]
    fn test_float_literals_look_like_floats() {
        assert_eq!(float_literal(2.0), "2.0");
        assert_eq!(float_literal(0.5), "0.5");
        assert_eq!(float_literal(1e300), "1e300");
        assert_eq!(float_literal(1.5e-7), "1.5e-7");
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(csharp_string("a\u{1}"), "\"a\\u0001\"");
        assert_eq!(cpp_string("a\u{1}9"), "\"a\\0019\"");
        assert_eq!(python_string("\u{0}"), "\"\\x00\"");
    }

    #[test]
    fn test_reserved_words() {
        assert_eq!(sanitize_identifier("class", PYTHON_RESERVED, Rename::Suffix), "class_");
        assert_eq!(sanitize_identifier("lambda", PYTHON_RESERVED, Rename::Suffix), "lambda_");
        assert_eq!(sanitize_identifier("params", CSHARP_RESERVED, Rename::Verbatim), "@params");
        assert_eq!(sanitize_identifier("$el", CPP_RESERVED, Rename::Suffix), "_el");
        assert_eq!(sanitize_identifier("value", CPP_RESERVED, Rename::Suffix), "value");
    }
}
