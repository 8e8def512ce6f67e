//! Check an existing source file.

use anyhow::{Context, anyhow};
use clap::Args;
use retarget_tools::{Language, ValidateOptions, validate};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct CheckArgs {
    /// File to check
    pub file: PathBuf,

    /// Language (python, csharp, cpp or an extension); guessed from the file name by default
    #[arg(short, long)]
    pub language: Option<String>,

    /// Skip external compilers and only run the balance scan
    #[arg(long)]
    pub no_compiler: bool,

    /// Seconds to wait for an external compiler
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// C++ standard passed to the compiler
    #[arg(long, default_value = "c++20")]
    pub cpp_standard: String,
}

pub fn cmd_check(args: &CheckArgs, json: bool) -> anyhow::Result<i32> {
    let language = match &args.language {
        Some(name) => Language::from_target(name).ok_or_else(|| anyhow!("unknown language `{name}`"))?,
        None => Language::from_path(&args.file).ok_or_else(|| {
            anyhow!(
                "cannot tell the language of {}; pass --language",
                args.file.display()
            )
        })?,
    };
    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let options = ValidateOptions {
        use_compilers: !args.no_compiler,
        timeout: Duration::from_secs(args.timeout),
        cpp_standard: args.cpp_standard.clone(),
        ..ValidateOptions::default()
    };
    let validation = validate(&source, language, &options);

    if json {
        println!("{}", serde_json::to_string_pretty(&validation)?);
    } else {
        super::print_validation(&args.file.display().to_string(), &validation);
    }
    Ok(if validation.passed { 0 } else { 1 })
}
