//! Configuration for the `retarget` CLI.
//!
//! Loads config from:
//! 1. Global: ~/.config/retarget/config.toml
//! 2. Per-project: ./retarget.toml (overrides global)
//!
//! or only from the file named by `--config`.
//!
//! Example retarget.toml:
//! ```toml
//! [generate]
//! targets = ["python", "cpp"]
//! output = "generated"
//! indent = "  "
//! helperNamespaces = ["OpCodes", "Bits"]
//!
//! [targets.cpp]
//! namespace = "cipher"
//! standard = "c++17"
//! ```
//!
//! Generation options are layered: target defaults < `[generate]` <
//! `[targets.<name>]` < `--set`.

use anyhow::Context;
use retarget_codegen::{GenerateOptions, LineEnding, OptionError};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The `[generate]` table.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateConfig {
    /// Targets used when `--target` is not given.
    pub targets: Vec<String>,
    pub output: Option<PathBuf>,
    /// Directory of `<name>.json` stdlib helpers.
    pub stdlib: Option<PathBuf>,
    pub validate: Option<bool>,
    pub indent: Option<String>,
    pub line_ending: Option<LineEnding>,
    /// Flags shared by every target (`helperNamespaces`, `docComments`, ...).
    #[serde(flatten)]
    pub flags: toml::Table,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RetargetConfig {
    pub generate: GenerateConfig,
    /// Per-target flag tables, keyed by target name.
    pub targets: BTreeMap<String, toml::Table>,
}

impl RetargetConfig {
    /// Load the global config, then `retarget.toml` under `root`.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(global_path) = Self::global_config_path()
            && global_path.is_file()
        {
            config = config.merge(Self::load_file(&global_path)?);
        }
        let project_path = root.join("retarget.toml");
        if project_path.is_file() {
            config = config.merge(Self::load_file(&project_path)?);
        }
        Ok(config)
    }

    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("retarget").join("config.toml"))
    }

    /// Load config from a file path.
    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Merge another config into this one. Values set in `other` win; flag
    /// tables merge key by key.
    pub fn merge(self, other: Self) -> Self {
        let mut generate = self.generate;
        let theirs = other.generate;
        if !theirs.targets.is_empty() {
            generate.targets = theirs.targets;
        }
        generate.output = theirs.output.or(generate.output);
        generate.stdlib = theirs.stdlib.or(generate.stdlib);
        generate.validate = theirs.validate.or(generate.validate);
        generate.indent = theirs.indent.or(generate.indent);
        generate.line_ending = theirs.line_ending.or(generate.line_ending);
        generate.flags.extend(theirs.flags);

        let mut targets = self.targets;
        for (name, table) in other.targets {
            targets.entry(name).or_default().extend(table);
        }
        Self { generate, targets }
    }

    /// Options for `target` from the config alone; target defaults are
    /// layered underneath by the generator.
    pub fn options_for(&self, target: &str) -> GenerateOptions {
        let mut flags = to_json_map(&self.generate.flags);
        if let Some(table) = self.targets.get(target) {
            flags.extend(to_json_map(table));
        }
        GenerateOptions {
            indent: self.generate.indent.clone(),
            line_ending: self.generate.line_ending,
            flags,
        }
    }
}

/// One `--set key=value`, optionally scoped with a target prefix
/// (`cpp.namespace=cipher`).
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Option<String>,
    pub assignment: String,
}

impl Assignment {
    /// Split off a leading `<target>.` when it names one of `known`.
    pub fn parse(raw: &str, known: &[&str]) -> Self {
        if let Some((key, _)) = raw.split_once('=')
            && let Some((prefix, _)) = key.split_once('.')
            && known.contains(&prefix)
        {
            return Self {
                target: Some(prefix.to_string()),
                assignment: raw[prefix.len() + 1..].to_string(),
            };
        }
        Self {
            target: None,
            assignment: raw.to_string(),
        }
    }

    /// Apply to `options` if this assignment concerns `target`.
    pub fn apply(&self, target: &str, options: &mut GenerateOptions) -> Result<(), OptionError> {
        match &self.target {
            Some(scope) if scope != target => Ok(()),
            _ => options.set(&self.assignment),
        }
    }
}

fn to_json_map(table: &toml::Table) -> Map<String, Value> {
    table
        .iter()
        .filter_map(|(key, value)| match serde_json::to_value(value) {
            Ok(json) => Some((key.clone(), json)),
            Err(err) => {
                tracing::debug!(%key, %err, "skipping config value");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[generate]
targets = ["python", "cpp"]
indent = "  "
lineEnding = "crlf"
docComments = false

[targets.cpp]
namespace = "cipher"
docComments = true
"#;

    #[test]
    fn test_default_config() {
        let config = RetargetConfig::default();
        assert!(config.generate.targets.is_empty());
        assert_eq!(config.options_for("python"), GenerateOptions::default());
    }

    #[test]
    fn test_load_project_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("retarget.toml"), CONFIG).unwrap();

        let config = RetargetConfig::load_file(&dir.path().join("retarget.toml")).unwrap();
        assert_eq!(config.generate.targets, ["python", "cpp"]);

        let python = config.options_for("python");
        assert_eq!(python.indent.as_deref(), Some("  "));
        assert_eq!(python.line_ending, Some(LineEnding::Crlf));
        assert_eq!(python.flags.get("docComments"), Some(&json!(false)));
        assert!(!python.flags.contains_key("namespace"));

        let cpp = config.options_for("cpp");
        assert_eq!(cpp.flags.get("namespace"), Some(&json!("cipher")));
        assert_eq!(cpp.flags.get("docComments"), Some(&json!(true)));
    }

    #[test]
    fn test_invalid_config_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("retarget.toml");
        std::fs::write(&path, "[generate\n").unwrap();
        let err = RetargetConfig::load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("retarget.toml"), "{err:#}");
    }

    #[test]
    fn test_merge_prefers_later_values() {
        let base: RetargetConfig = toml::from_str(CONFIG).unwrap();
        let overlay: RetargetConfig = toml::from_str(
            r#"
[generate]
indent = "\t"

[targets.cpp]
standard = "c++17"
"#,
        )
        .unwrap();
        let merged = base.merge(overlay);
        assert_eq!(merged.generate.targets, ["python", "cpp"]);
        assert_eq!(merged.generate.indent.as_deref(), Some("\t"));

        let cpp = merged.options_for("cpp");
        assert_eq!(cpp.flags.get("namespace"), Some(&json!("cipher")));
        assert_eq!(cpp.flags.get("standard"), Some(&json!("c++17")));
    }

    #[test]
    fn test_scoped_assignments() {
        let known = ["python", "cpp"];
        let scoped = Assignment::parse("cpp.namespace=crypto", &known);
        assert_eq!(scoped.target.as_deref(), Some("cpp"));

        let mut python = GenerateOptions::default();
        scoped.apply("python", &mut python).unwrap();
        assert!(python.flags.is_empty());

        let mut cpp = GenerateOptions::default();
        scoped.apply("cpp", &mut cpp).unwrap();
        assert_eq!(cpp.flags.get("namespace"), Some(&json!("crypto")));

        let shared = Assignment::parse("typeHints=false", &known);
        assert_eq!(shared.target, None);
        shared.apply("python", &mut python).unwrap();
        assert_eq!(python.flags.get("typeHints"), Some(&json!(false)));
    }
}
