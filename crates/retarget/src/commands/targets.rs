//! List registered code generation targets.

use retarget_codegen::list_targets;

pub fn cmd_targets(json: bool) -> anyhow::Result<i32> {
    let targets = list_targets();
    if json {
        let listing: Vec<_> = targets
            .iter()
            .map(|target| {
                serde_json::json!({
                    "name": target.name(),
                    "extension": target.extension(),
                    "description": target.description(),
                    "defaults": target.default_options(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        let width = targets.iter().map(|t| t.name().len()).max().unwrap_or(0);
        for target in &targets {
            println!(
                "{:width$}  .{:<4} {}",
                target.name(),
                target.extension(),
                target.description()
            );
        }
    }
    Ok(0)
}
