//! Generation options.
//!
//! Options travel as one loosely typed record: `indent`, `lineEnding`, and a
//! flat map of per-target flags. Each target reads the flags it knows through
//! a [`FlagReader`], which is where wrong types turn into warnings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flags read by the pipeline itself rather than a target.
pub const SHARED_FLAGS: &[&str] = &["helperNamespaces"];

/// Namespaces whose calls are resolved through the stdlib bridge by default.
pub const DEFAULT_HELPER_NAMESPACES: &[&str] = &["OpCodes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    /// Convert `\n`-terminated text to this line ending.
    pub fn apply(self, text: String) -> String {
        match self {
            LineEnding::Lf => text,
            LineEnding::Crlf => text.replace('\n', "\r\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOptions {
    /// One indentation unit; targets default to four spaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_ending: Option<LineEnding>,
    /// Per-target flags (`typeHints`, `namespace`, ...).
    #[serde(flatten)]
    pub flags: Map<String, Value>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.flags.insert(key.to_string(), value.into());
        self
    }

    pub fn with_indent(mut self, indent: &str) -> Self {
        self.indent = Some(indent.to_string());
        self
    }

    /// These options layered over `base`: set values win, unset fall through.
    pub fn merged_over(&self, base: &GenerateOptions) -> GenerateOptions {
        let mut flags = base.flags.clone();
        for (key, value) in &self.flags {
            flags.insert(key.clone(), value.clone());
        }
        GenerateOptions {
            indent: self.indent.clone().or_else(|| base.indent.clone()),
            line_ending: self.line_ending.or(base.line_ending),
            flags,
        }
    }

    /// Namespaces routed to the stdlib bridge.
    pub fn helper_namespaces(&self, warnings: &mut Vec<String>) -> Vec<String> {
        FlagReader::new(self, warnings).strings("helperNamespaces", DEFAULT_HELPER_NAMESPACES)
    }

    /// Apply a `key=value` assignment. `indent` and `lineEnding` set the
    /// top-level fields; anything else becomes a flag.
    pub fn set(&mut self, assignment: &str) -> Result<(), OptionError> {
        let (key, value) = parse_assignment(assignment)?;
        match key.as_str() {
            "indent" => match value {
                Value::String(s) => self.indent = Some(unescape_indent(&s)),
                Value::Number(n) => {
                    let width = n.as_u64().ok_or_else(|| OptionError::InvalidValue {
                        key: key.clone(),
                        value: n.to_string(),
                        allowed: "a width or an indent string",
                    })?;
                    self.indent = Some(" ".repeat(width as usize));
                }
                other => {
                    return Err(OptionError::WrongType {
                        key,
                        expected: "string",
                        found: json_type(&other),
                    });
                }
            },
            "lineEnding" => {
                self.line_ending = Some(serde_json::from_value(value.clone()).map_err(|_| {
                    OptionError::InvalidValue {
                        key: key.clone(),
                        value: value.to_string(),
                        allowed: "lf or crlf",
                    }
                })?)
            }
            _ => {
                self.flags.insert(key, value);
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OptionError {
    #[error("expected key=value, got `{0}`")]
    MalformedAssignment(String),

    #[error("option `{key}` expects {expected}, got {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("option `{key}` has invalid value {value} (expected {allowed})")]
    InvalidValue {
        key: String,
        value: String,
        allowed: &'static str,
    },
}

/// Split `key=value`; the value is parsed as JSON when it is valid JSON and
/// taken as a plain string otherwise (`namespace=Crypto` needs no quotes).
pub fn parse_assignment(assignment: &str) -> Result<(String, Value), OptionError> {
    let (key, raw) = assignment
        .split_once('=')
        .ok_or_else(|| OptionError::MalformedAssignment(assignment.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(OptionError::MalformedAssignment(assignment.to_string()));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn unescape_indent(raw: &str) -> String {
    raw.replace("\\t", "\t")
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed access to option flags.
///
/// Every read marks the flag as recognized; [`FlagReader::finish`] logs the
/// rest, which are otherwise ignored.
pub struct FlagReader<'a> {
    options: &'a GenerateOptions,
    warnings: &'a mut Vec<String>,
    seen: Vec<&'static str>,
}

impl<'a> FlagReader<'a> {
    pub fn new(options: &'a GenerateOptions, warnings: &'a mut Vec<String>) -> Self {
        Self {
            options,
            warnings,
            seen: SHARED_FLAGS.to_vec(),
        }
    }

    fn get(&mut self, key: &'static str) -> Option<&'a Value> {
        self.seen.push(key);
        self.options.flags.get(key).filter(|value| !value.is_null())
    }

    fn wrong_type(&mut self, key: &'static str, expected: &'static str, found: &Value, default: &str) {
        let err = OptionError::WrongType {
            key: key.to_string(),
            expected,
            found: json_type(found),
        };
        tracing::warn!(%err, "falling back to default");
        self.warnings.push(format!("{err}; using default {default}"));
    }

    pub fn bool(&mut self, key: &'static str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                self.wrong_type(key, "a boolean", other, &default.to_string());
                default
            }
        }
    }

    pub fn string(&mut self, key: &'static str, default: &str) -> String {
        self.opt_string(key).unwrap_or_else(|| default.to_string())
    }

    pub fn opt_string(&mut self, key: &'static str) -> Option<String> {
        match self.get(key) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.wrong_type(key, "a string", other, "(unset)");
                None
            }
        }
    }

    /// A string restricted to `allowed`.
    pub fn choice(&mut self, key: &'static str, allowed: &[&'static str], default: &'static str) -> String {
        let value = self.string(key, default);
        if allowed.contains(&value.as_str()) {
            return value;
        }
        let err = OptionError::InvalidValue {
            key: key.to_string(),
            value: format!("\"{value}\""),
            allowed: "one of the documented values",
        };
        self.warnings
            .push(format!("{err} [{}]; using default {default}", allowed.join(", ")));
        default.to_string()
    }

    pub fn strings(&mut self, key: &'static str, default: &[&str]) -> Vec<String> {
        let fallback = || -> Vec<String> { default.iter().map(|s| s.to_string()).collect() };
        match self.get(key) {
            None => fallback(),
            Some(Value::Array(items)) if items.iter().all(Value::is_string) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            Some(other) => {
                self.wrong_type(key, "an array of strings", other, &format!("{default:?}"));
                fallback()
            }
        }
    }

    /// Log flags nobody asked for.
    pub fn finish(self) {
        for key in self.options.flags.keys() {
            if !self.seen.contains(&key.as_str()) {
                tracing::debug!(flag = %key, "ignoring unrecognized option");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_caller_flags_override_defaults() {
        let defaults = GenerateOptions::new()
            .with_flag("typeHints", true)
            .with_flag("docComments", true);
        let caller = GenerateOptions::new().with_flag("typeHints", false);
        let merged = caller.merged_over(&defaults);
        assert_eq!(merged.flags["typeHints"], json!(false));
        assert_eq!(merged.flags["docComments"], json!(true));
    }

    #[test]
    fn test_wrong_type_falls_back_with_warning() {
        let options = GenerateOptions::new().with_flag("typeHints", "yes");
        let mut warnings = Vec::new();
        let mut reader = FlagReader::new(&options, &mut warnings);
        assert!(reader.bool("typeHints", true));
        reader.finish();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("typeHints"), "{}", warnings[0]);
    }

    #[test]
    fn test_unknown_flags_are_ignored() {
        let options = GenerateOptions::new().with_flag("frobnicate", 3);
        let mut warnings = Vec::new();
        let mut reader = FlagReader::new(&options, &mut warnings);
        assert!(reader.bool("docComments", true));
        reader.finish();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_assignment_parsing() {
        let mut options = GenerateOptions::new();
        options.set("namespace=Crypto").unwrap();
        options.set("typeHints=false").unwrap();
        options.set("helperNamespaces=[\"OpCodes\",\"Bits\"]").unwrap();
        options.set("indent=2").unwrap();
        assert_eq!(options.flags["namespace"], json!("Crypto"));
        assert_eq!(options.flags["typeHints"], json!(false));
        assert_eq!(options.indent.as_deref(), Some("  "));
        let mut warnings = Vec::new();
        assert_eq!(options.helper_namespaces(&mut warnings), ["OpCodes", "Bits"]);
        assert!(matches!(
            options.set("novalue"),
            Err(OptionError::MalformedAssignment(_))
        ));
    }

    #[test]
    fn test_options_deserialize_from_camel_case() {
        let options: GenerateOptions =
            serde_json::from_value(json!({ "indent": "\t", "lineEnding": "crlf", "namespace": "X" }))
                .unwrap();
        assert_eq!(options.line_ending, Some(LineEnding::Crlf));
        assert_eq!(options.flags["namespace"], json!("X"));
        assert_eq!(LineEnding::Crlf.apply("a\nb\n".into()), "a\r\nb\r\n");
    }
}
