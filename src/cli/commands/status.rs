//! Status command - check the external tools installs rely on

use crate::error::DobroResult;
use crate::manifest::Manifest;
use crate::process::tool_available;
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

/// A tool probed by `dobro status`
struct Tool {
    name: &'static str,
    probe: &'static [&'static str],
    needed_for: &'static str,
}

const TOOLS: &[Tool] = &[
    Tool {
        name: "git",
        probe: &["--version"],
        needed_for: "git packages",
    },
    Tool {
        name: "svn",
        probe: &["--version", "--quiet"],
        needed_for: "svn packages and svn storage",
    },
    Tool {
        name: "npm",
        probe: &["--version"],
        needed_for: "npm packages",
    },
    Tool {
        name: "sh",
        probe: &["-c", "true"],
        needed_for: "postinstall scripts",
    },
];

/// Execute the status command
pub async fn execute() -> DobroResult<()> {
    println!("{}", style("Dobro Status").bold().magenta());
    println!();

    println!("{}", style("Tools:").bold());
    let mut missing = 0;
    for tool in TOOLS {
        if tool_available(tool.name, tool.probe).await {
            println!("  {} {}", CHECK, style(tool.name).green());
        } else {
            missing += 1;
            println!(
                "  {} {} - needed for {}",
                CROSS,
                style(tool.name).red(),
                tool.needed_for
            );
        }
    }

    println!();
    println!("{}", style("Manifest:").bold());
    check_manifest().await;

    println!();
    if missing == 0 {
        println!("{}", style("All tools available").green().bold());
    } else {
        println!(
            "{}",
            style(format!("{} tool(s) missing - see above", missing))
                .yellow()
                .bold()
        );
    }

    Ok(())
}

async fn check_manifest() {
    let Ok(cwd) = std::env::current_dir() else {
        println!("  {} Can't read current directory", WARN);
        return;
    };

    let path = match Manifest::find(&cwd) {
        Ok(path) => path,
        Err(e) => {
            println!("  {} {} - Run: dobro init", WARN, style(e).yellow());
            return;
        }
    };

    match Manifest::load(&path).await {
        Ok(manifest) => {
            println!(
                "  {} {} ({} package(s))",
                CHECK,
                path.display(),
                manifest.dependencies.len()
            );
            if manifest.storage.is_empty() {
                println!("  {} No storage configured, packages are never cached", WARN);
            }
            for storage in &manifest.storage {
                let mode = if storage.is_readonly() {
                    "readonly"
                } else {
                    "read-write"
                };
                println!("  {} Storage {} ({})", CHECK, storage, mode);
            }
        }
        Err(e) => println!("  {} {}", CROSS, style(e).red()),
    }
}
