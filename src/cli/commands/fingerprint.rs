//! Fingerprint command - print the bundle fingerprint

use crate::cache::bundle_fingerprint;
use crate::cli::args::ProjectArgs;
use crate::cli::commands::load_project;
use crate::error::DobroResult;

/// Execute the fingerprint command
pub async fn execute(args: ProjectArgs) -> DobroResult<()> {
    let (_, manifest) = load_project(&args).await?;
    println!("{}", bundle_fingerprint(&manifest.dependencies));
    Ok(())
}
