//! Init command - create a starter dobro.json

use crate::cli::args::InitArgs;
use crate::error::{DobroError, DobroResult};
use crate::manifest::MANIFEST_FILE;
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;

/// Starter manifest: one writable local cache next to the manifest, no packages
const INIT_TEMPLATE: &str = r#"{
  "storage": [
    { "type": "local", "path": ".dobro-cache" }
  ],
  "dependencies": []
}
"#;

/// Execute the init command
pub async fn execute(args: InitArgs) -> DobroResult<()> {
    let ctx = UiContext::detect();

    let target_dir = match args.path {
        Some(ref p) => p.clone(),
        None => {
            std::env::current_dir().map_err(|e| DobroError::io("getting current directory", e))?
        }
    };

    let manifest_path = target_dir.join(MANIFEST_FILE);

    if manifest_path.exists() && !args.force {
        return Err(DobroError::User(format!(
            "{} already exists. Use --force to overwrite.",
            manifest_path.display()
        )));
    }

    ensure_dir(&target_dir).await?;

    fs::write(&manifest_path, INIT_TEMPLATE)
        .await
        .map_err(|e| DobroError::io(format!("writing {}", manifest_path.display()), e))?;

    ui::step_ok_detail(
        &ctx,
        "Created manifest",
        &manifest_path.display().to_string(),
    );
    ui::remark(&ctx, "Add packages under \"dependencies\", then run: dobro install");

    Ok(())
}

async fn ensure_dir(dir: &Path) -> DobroResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| DobroError::io(format!("creating directory {}", dir.display()), e))?;
    }
    Ok(())
}
