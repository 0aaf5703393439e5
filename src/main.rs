//! Dobro - dependency installer with a shared build cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use dobro::cli::{Cli, Commands};
use dobro::config::{Config, ConfigManager};
use dobro::error::DobroResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            match e.package() {
                Some(package) => eprintln!("  {} (package {})", style(e.kind()).dim(), package),
                None => eprintln!("  {}", style(e.kind()).dim()),
            }
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DobroResult<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::locate(cli.config.clone());
    let mut config = config_manager.load().await?;
    if cli.verbose > 0 {
        config.general.verbose = true;
    }

    init_logging(cli.verbose, &config);
    dobro::ui::init_theme();

    match cli.command {
        Commands::Install(args) => dobro::cli::commands::install(args, &config).await,
        Commands::Keys(args) => dobro::cli::commands::keys(args).await,
        Commands::Fingerprint(args) => dobro::cli::commands::fingerprint(args).await,
        Commands::Init(args) => dobro::cli::commands::init(args).await,
        Commands::Status => dobro::cli::commands::status().await,
        Commands::Config(args) => {
            dobro::cli::commands::config(args, &config, &config_manager).await
        }
        Commands::Cache(args) => dobro::cli::commands::cache(args).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; RUST_LOG wins when set
fn init_logging(verbose: u8, config: &Config) {
    let level = match verbose {
        0 if config.general.verbose => "dobro=info",
        0 => "dobro=warn",
        1 => "dobro=info",
        _ => "dobro=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
