//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::DobroResult;
use crate::ui::{self, UiContext};

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> DobroResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> DobroResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> DobroResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path().display().to_string();

    if manager.write_defaults(force).await? {
        ui::step_ok_detail(&ctx, "Configuration initialized", &path);
    } else {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path),
            "Use --force to overwrite",
        );
    }

    Ok(())
}
