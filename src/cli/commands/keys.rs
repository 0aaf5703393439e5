//! Keys command - print each dependency's cache key

use crate::cache::CacheKey;
use crate::cli::args::{KeysArgs, OutputFormat};
use crate::cli::commands::load_project;
use crate::error::DobroResult;
use crate::manifest::PackageSpec;
use crate::pipeline::preflight;
use console::style;

/// Execute the keys command
pub async fn execute(args: KeysArgs) -> DobroResult<()> {
    let (_, manifest) = load_project(&args.project).await?;
    let keys = preflight(&manifest.dependencies)?;
    let rows: Vec<(&PackageSpec, CacheKey)> = manifest.dependencies.iter().zip(keys).collect();

    match args.format {
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Json => println!("{}", render_json(&rows)?),
        OutputFormat::Plain => {
            for (_, key) in &rows {
                println!("{}", key);
            }
        }
    }

    Ok(())
}

fn print_table(rows: &[(&PackageSpec, CacheKey)]) {
    if rows.is_empty() {
        println!("No dependencies listed.");
        return;
    }

    let width = rows
        .iter()
        .map(|(spec, _)| spec.name.len())
        .max()
        .unwrap_or(0)
        .max(4);

    println!(
        "{:<width$}  {:<4}  {}",
        "NAME",
        "TYPE",
        "KEY",
        width = width
    );
    println!("{}", style("-".repeat(width + 8 + 40)).dim());
    for (spec, key) in rows {
        println!(
            "{:<width$}  {:<4}  {}",
            spec.name,
            spec.kind().to_string(),
            key,
            width = width
        );
    }
}

fn render_json(rows: &[(&PackageSpec, CacheKey)]) -> DobroResult<String> {
    let entries: Vec<serde_json::Value> = rows
        .iter()
        .map(|(spec, key)| {
            serde_json::json!({
                "name": spec.name,
                "type": spec.kind().to_string(),
                "key": key.as_str(),
            })
        })
        .collect();

    Ok(serde_json::to_string_pretty(&entries)?)
}
