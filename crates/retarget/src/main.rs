//! `retarget`: generate Python, C# or C++ source from IL JSON.

mod commands;
mod config;

use clap::{ArgAction, Parser, Subcommand};
use commands::check::CheckArgs;
use commands::generate::GenerateArgs;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retarget", version, about = "Generate source code for several languages from one IL program")]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate source for one or more targets
    Generate(GenerateArgs),
    /// List registered targets and their default options
    Targets,
    /// Check an existing source file with a compiler or the balance scan
    Check(CheckArgs),
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Reset SIGPIPE to default behavior so piping to `head` etc. doesn't panic.
#[cfg(unix)]
fn reset_sigpipe() {
    // SAFETY: libc::signal only changes the process's SIGPIPE disposition
    // back to terminate-on-broken-pipe.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
fn reset_sigpipe() {}

fn main() {
    reset_sigpipe();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::cmd_generate(&args, cli.json),
        Commands::Targets => commands::targets::cmd_targets(cli.json),
        Commands::Check(args) => commands::check::cmd_check(&args, cli.json),
    };
    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
