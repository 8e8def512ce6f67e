//! Generate source for one or more targets.
//!
//! Each target runs its own pipeline on the shared, already loaded program;
//! several targets are generated in parallel.

use crate::config::{Assignment, RetargetConfig};
use anyhow::{Context, anyhow, bail};
use clap::Args;
use rayon::prelude::*;
use retarget_codegen::{Backend, GenerateError, GenerateOptions, Generated, Generator, list_targets, resolve_target};
use retarget_il::load_program;
use retarget_stdlib::{JsonDirSource, StdlibBridge};
use retarget_tools::{Language, ValidateOptions, Validation, validate};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args)]
pub struct GenerateArgs {
    /// IL program as JSON (`-` reads stdin)
    pub input: PathBuf,

    /// Target name or extension; repeat or comma-separate for several
    #[arg(short, long = "target", value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Directory to write code and build files into (stdout otherwise)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file instead of ~/.config/retarget/config.toml and ./retarget.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory of `<name>.json` stdlib helper functions
    #[arg(long)]
    pub stdlib: Option<PathBuf>,

    /// Check the generated code with a compiler or the balance scan
    #[arg(long)]
    pub validate: bool,

    /// Seconds to wait for an external compiler
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Override an option, e.g. `indent=2`, `typeHints=false`, `cpp.namespace=cipher`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub sets: Vec<String>,
}

/// Outcome for one target.
struct TargetRun {
    backend: &'static dyn Backend,
    generated: Result<Generated, GenerateError>,
    validation: Option<Validation>,
    written: Vec<PathBuf>,
}

pub fn cmd_generate(args: &GenerateArgs, json: bool) -> anyhow::Result<i32> {
    let config = match &args.config {
        Some(path) => RetargetConfig::load_file(path)?,
        None => RetargetConfig::load(Path::new("."))?,
    };

    let backends = select_backends(args, &config)?;
    let program = {
        let text = read_input(&args.input)?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", input_label(&args.input)))?;
        load_program(&value).with_context(|| format!("cannot load {}", input_label(&args.input)))?
    };

    let mut generator = Generator::new();
    if let Some(dir) = args.stdlib.as_ref().or(config.generate.stdlib.as_ref()) {
        if !dir.is_dir() {
            bail!("stdlib directory {} does not exist", dir.display());
        }
        tracing::debug!(dir = %dir.display(), "using stdlib directory");
        generator = generator.with_stdlib(Arc::new(StdlibBridge::new(JsonDirSource::new(dir.clone()))));
    }

    let known: Vec<&str> = list_targets().iter().map(|t| t.name()).collect();
    let assignments: Vec<Assignment> = args.sets.iter().map(|raw| Assignment::parse(raw, &known)).collect();
    let jobs = backends
        .into_iter()
        .map(|backend| {
            let mut options = config.options_for(backend.name());
            for assignment in &assignments {
                assignment
                    .apply(backend.name(), &mut options)
                    .with_context(|| format!("invalid --set {}", assignment.assignment))?;
            }
            Ok((backend, options))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let validate_output = args.validate || config.generate.validate.unwrap_or(false);
    let timeout = Duration::from_secs(args.timeout);
    let mut runs: Vec<TargetRun> = jobs
        .par_iter()
        .map(|(backend, options)| {
            let generated = generator.generate_from_ast(&program, backend.name(), options);
            let validation = match &generated {
                Ok(generated) if validate_output => check_generated(*backend, options, &generated.code, timeout),
                _ => None,
            };
            TargetRun {
                backend: *backend,
                generated,
                validation,
                written: Vec::new(),
            }
        })
        .collect();

    let output_dir = args.output.as_ref().or(config.generate.output.as_ref());
    if let Some(dir) = output_dir {
        let stem = args
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| *s != "-")
            .unwrap_or("program");
        let per_target = runs.len() > 1;
        for run in &mut runs {
            let Ok(generated) = &run.generated else { continue };
            let dir = if per_target {
                dir.join(run.backend.name())
            } else {
                dir.to_path_buf()
            };
            run.written = write_outputs(&dir, stem, run.backend, generated)?;
        }
    }

    if json {
        print_json(&runs, output_dir.is_some())?;
    } else {
        print_human(&runs, output_dir.is_some());
    }

    let failed = runs.iter().any(|run| {
        run.generated.is_err() || run.validation.as_ref().is_some_and(|v| !v.passed)
    });
    Ok(if failed { 1 } else { 0 })
}

fn select_backends(args: &GenerateArgs, config: &RetargetConfig) -> anyhow::Result<Vec<&'static dyn Backend>> {
    let requested = if args.targets.is_empty() {
        &config.generate.targets
    } else {
        &args.targets
    };
    if requested.is_empty() {
        bail!("no target given; pass --target ({})", available_targets());
    }
    let mut backends: Vec<&'static dyn Backend> = Vec::new();
    for name in requested {
        let backend = resolve_target(name)
            .ok_or_else(|| anyhow!("unknown target `{name}` (available: {})", available_targets()))?;
        if !backends.iter().any(|b| b.name() == backend.name()) {
            backends.push(backend);
        }
    }
    Ok(backends)
}

fn available_targets() -> String {
    list_targets()
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn input_label(path: &Path) -> String {
    if path == Path::new("-") {
        "stdin".to_string()
    } else {
        path.display().to_string()
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

fn check_generated(
    backend: &dyn Backend,
    options: &GenerateOptions,
    code: &str,
    timeout: Duration,
) -> Option<Validation> {
    let Some(language) = Language::from_target(backend.name()) else {
        tracing::debug!(target_name = backend.name(), "no validator for target");
        return None;
    };
    let mut validate_options = ValidateOptions {
        timeout,
        ..ValidateOptions::default()
    };
    if let Some(standard) = options.flags.get("standard").and_then(Value::as_str) {
        validate_options.cpp_standard = standard.to_string();
    }
    Some(validate(code, language, &validate_options))
}

/// Write the code file and its build files into `dir`.
fn write_outputs(
    dir: &Path,
    stem: &str,
    backend: &dyn Backend,
    generated: &Generated,
) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let mut written = Vec::new();

    let code_path = dir.join(format!("{stem}.{}", backend.extension()));
    std::fs::write(&code_path, &generated.code)
        .with_context(|| format!("failed to write {}", code_path.display()))?;
    written.push(code_path);

    for file in &generated.dependencies {
        let path = dir.join(&file.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, &file.contents).with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    tracing::debug!(target_name = backend.name(), files = written.len(), "wrote outputs");
    Ok(written)
}

fn print_human(runs: &[TargetRun], wrote_files: bool) {
    let headed = runs.len() > 1;
    for run in runs {
        let name = run.backend.name();
        match &run.generated {
            Ok(generated) => {
                for warning in &generated.warnings {
                    eprintln!("warning[{name}]: {warning}");
                }
                if wrote_files {
                    for path in &run.written {
                        println!("wrote {}", path.display());
                    }
                } else {
                    if headed {
                        println!("==> {name} <==");
                    }
                    print!("{}", generated.code);
                    if !generated.dependencies.is_empty() {
                        tracing::info!(target_name = name, "build files are only written with --output");
                    }
                }
            }
            Err(err) => eprintln!("error[{name}]: {err}"),
        }
        if let Some(validation) = &run.validation {
            super::print_validation(name, validation);
        }
    }
}

fn print_json(runs: &[TargetRun], wrote_files: bool) -> anyhow::Result<()> {
    let report: Vec<Value> = runs
        .iter()
        .map(|run| {
            let mut entry = serde_json::json!({ "target": run.backend.name() });
            match &run.generated {
                Ok(generated) => {
                    entry["warnings"] = serde_json::json!(generated.warnings);
                    if wrote_files {
                        let files: Vec<String> = run.written.iter().map(|p| p.display().to_string()).collect();
                        entry["files"] = serde_json::json!(files);
                    } else {
                        entry["code"] = serde_json::json!(generated.code);
                        entry["dependencies"] = serde_json::json!(generated.dependencies);
                    }
                }
                Err(err) => entry["error"] = serde_json::json!(err.to_string()),
            }
            if let Some(validation) = &run.validation {
                entry["validation"] = serde_json::json!(validation);
            }
            entry
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
