//! CLI command implementations - one command per file.

pub mod check;
pub mod generate;
pub mod targets;

use retarget_tools::Validation;

/// Human-readable report of a validation verdict, one line per diagnostic.
pub(crate) fn print_validation(label: &str, validation: &Validation) {
    let verdict = if validation.passed { "ok" } else { "failed" };
    println!("{label}: {verdict} ({})", validation.method);
    for diagnostic in &validation.diagnostics {
        println!("  {diagnostic}");
    }
    if let Some(reason) = &validation.fallback {
        println!("  note: compiler not used: {reason}");
    }
}
