//! Cache command - inspect or clear local cache storage

use crate::cli::args::{CacheAction, CacheArgs, OutputFormat, ProjectArgs};
use crate::cli::commands::load_project;
use crate::error::DobroResult;
use crate::events::TracingSink;
use crate::storage::{LocalBackend, LocalEntry, StorageBackend, StorageConfig};
use crate::ui::{self, UiContext};
use chrono::{DateTime, Local};
use console::style;
use std::sync::Arc;

/// Execute the cache command
pub async fn execute(args: CacheArgs) -> DobroResult<()> {
    match args.action {
        CacheAction::List { project, format } => list_entries(&project, format).await,
        CacheAction::Clear { project, yes } => clear_entries(&project, yes).await,
    }
}

/// Local backends of the manifest's storage chain, in chain order
fn local_backends(storage: &[StorageConfig]) -> Vec<LocalBackend> {
    storage
        .iter()
        .filter_map(|config| match config {
            StorageConfig::Local { path, readonly } => {
                Some(LocalBackend::new(path, *readonly, Arc::new(TracingSink)))
            }
            StorageConfig::Svn { .. } => None,
        })
        .collect()
}

async fn collect(backends: &[LocalBackend]) -> DobroResult<Vec<(String, LocalEntry)>> {
    let mut rows = Vec::new();
    for backend in backends {
        for entry in backend.entries().await? {
            rows.push((backend.describe(), entry));
        }
    }
    Ok(rows)
}

async fn list_entries(project: &ProjectArgs, format: OutputFormat) -> DobroResult<()> {
    let (_, manifest) = load_project(project).await?;
    let backends = local_backends(&manifest.storage);

    if backends.is_empty() {
        println!("No local storage configured in {}.", manifest.path.display());
        return Ok(());
    }

    let rows = collect(&backends).await?;

    match format {
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Json => println!("{}", render_json(&rows)?),
        OutputFormat::Plain => {
            for (_, entry) in &rows {
                println!("{}", entry.key);
            }
        }
    }

    Ok(())
}

fn print_table(rows: &[(String, LocalEntry)]) {
    if rows.is_empty() {
        println!("No cached packages found.");
        return;
    }

    println!(
        "{:<40} {:>10} {:<17} {}",
        "KEY", "SIZE", "MODIFIED", "STORAGE"
    );
    println!("{}", "-".repeat(90));

    for (storage, entry) in rows {
        println!(
            "{:<40} {:>10} {:<17} {}",
            entry.key.as_str(),
            format_bytes(entry.size),
            modified(entry)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
            style(storage).dim()
        );
    }

    let total: u64 = rows.iter().map(|(_, e)| e.size).sum();
    println!();
    println!("Total: {} entr(ies), {}", rows.len(), format_bytes(total));
}

fn render_json(rows: &[(String, LocalEntry)]) -> DobroResult<String> {
    #[derive(serde::Serialize)]
    struct EntryJson {
        key: String,
        size: u64,
        modified: Option<String>,
        storage: String,
    }

    let entries: Vec<EntryJson> = rows
        .iter()
        .map(|(storage, entry)| EntryJson {
            key: entry.key.to_string(),
            size: entry.size,
            modified: modified(entry).map(|t| t.to_rfc3339()),
            storage: storage.clone(),
        })
        .collect();

    Ok(serde_json::to_string_pretty(&entries)?)
}

fn modified(entry: &LocalEntry) -> Option<DateTime<Local>> {
    entry.modified.map(DateTime::<Local>::from)
}

async fn clear_entries(project: &ProjectArgs, yes: bool) -> DobroResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let (_, manifest) = load_project(project).await?;

    let (readonly, writable): (Vec<_>, Vec<_>) = local_backends(&manifest.storage)
        .into_iter()
        .partition(|b| b.is_readonly());

    for backend in &readonly {
        ui::step_info(&ctx, &format!("Skipping readonly {}", backend.describe()));
    }

    let mut targets = Vec::new();
    for backend in &writable {
        for entry in backend.entries().await? {
            targets.push((backend, entry));
        }
    }

    if targets.is_empty() {
        println!("No cached packages to clear.");
        return Ok(());
    }

    println!("This will remove {} cached package(s):", targets.len());
    for (backend, entry) in &targets {
        println!(
            "  {} {} {}",
            style("•").red(),
            entry.key,
            style(backend.describe()).dim()
        );
    }
    println!();

    if !ui::confirm(&ctx, "Remove these entries?", false).await? {
        ui::step_warn(&ctx, "Aborted");
        return Ok(());
    }

    for (backend, entry) in &targets {
        backend.remove(&entry.key).await?;
    }

    ui::step_ok(&ctx, &format!("Cleared {} cached package(s)", targets.len()));
    Ok(())
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use std::path::PathBuf;
    use std::time::SystemTime;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn only_local_storage_is_listed() {
        let storage = vec![
            StorageConfig::Svn {
                url: "https://svn.example.com/cache".into(),
                readonly: false,
            },
            StorageConfig::Local {
                path: PathBuf::from("/var/cache/dobro"),
                readonly: true,
            },
        ];

        let backends = local_backends(&storage);
        assert_eq!(backends.len(), 1);
        assert!(backends[0].is_readonly());
        assert_eq!(backends[0].root(), PathBuf::from("/var/cache/dobro"));
    }

    #[test]
    fn json_rows() {
        let rows = vec![(
            "local:/c".to_string(),
            LocalEntry {
                key: CacheKey::new("lib_1"),
                size: 2048,
                modified: Some(SystemTime::now()),
            },
        )];

        let json: serde_json::Value = serde_json::from_str(&render_json(&rows).unwrap()).unwrap();
        assert_eq!(json[0]["key"], "lib_1");
        assert_eq!(json[0]["size"], 2048);
        assert!(json[0]["modified"].is_string());
    }
}
