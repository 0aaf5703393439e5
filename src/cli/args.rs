//! CLI argument definitions using clap derive

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Dobro - dependency installer with a shared build cache
///
/// Installs the packages listed in dobro.json from git, svn or npm, and
/// keeps built packages in local or SVN storage so other checkouts can
/// reuse them.
#[derive(Parser, Debug)]
#[command(name = "dobro")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DOBRO_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the manifest's dependencies into the project
    Install(InstallArgs),

    /// Print each dependency's cache key
    Keys(KeysArgs),

    /// Print the fingerprint of the whole dependency set
    Fingerprint(ProjectArgs),

    /// Write a starter dobro.json
    Init(InitArgs),

    /// Check that git, svn, npm and sh are available
    Status,

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Inspect or clear local cache storage
    Cache(CacheArgs),
}

/// Manifest and project location
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Manifest path (defaults to <project>/dobro.json)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Project directory (defaults to current directory)
    #[arg(short, long)]
    pub project: Option<PathBuf>,
}

impl ProjectArgs {
    /// Project directory, falling back to `cwd`
    pub fn project_dir(&self, cwd: &Path) -> PathBuf {
        match &self.project {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        }
    }
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Install from sources only, bypassing the cache
    #[arg(long)]
    pub local: bool,

    /// Consult the cache but never write to it
    #[arg(long)]
    pub no_push: bool,

    /// Packages processed concurrently (default: from config)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Arguments for the keys command
#[derive(Parser, Debug)]
pub struct KeysArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite existing dobro.json
    #[arg(short, long)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List entries held by the manifest's local storage
    List {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove all entries from writable local storage
    Clear {
        #[command(flatten)]
        project: ProjectArgs,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_install() {
        let cli = Cli::parse_from(["dobro", "install", "--no-push", "--jobs", "4"]);
        match cli.command {
            Commands::Install(args) => {
                assert!(args.no_push);
                assert!(!args.local);
                assert_eq!(args.jobs, Some(4));
                assert!(args.project.manifest.is_none());
            }
            _ => panic!("expected Install command"),
        }
    }

    #[test]
    fn cli_parses_install_local_with_paths() {
        let cli = Cli::parse_from([
            "dobro",
            "install",
            "--local",
            "--manifest",
            "deps.json",
            "--project",
            "/srv/app",
        ]);
        match cli.command {
            Commands::Install(args) => {
                assert!(args.local);
                assert_eq!(args.project.manifest, Some(PathBuf::from("deps.json")));
                assert_eq!(
                    args.project.project_dir(Path::new("/home")),
                    PathBuf::from("/srv/app")
                );
            }
            _ => panic!("expected Install command"),
        }
    }

    #[test]
    fn cli_parses_keys_format() {
        let cli = Cli::parse_from(["dobro", "keys", "--format", "json"]);
        match cli.command {
            Commands::Keys(args) => assert!(matches!(args.format, OutputFormat::Json)),
            _ => panic!("expected Keys command"),
        }
    }

    #[test]
    fn cli_parses_status() {
        let cli = Cli::parse_from(["dobro", "status"]);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn cli_parses_init_force() {
        let cli = Cli::parse_from(["dobro", "init", "--force"]);
        match cli.command {
            Commands::Init(args) => assert!(args.force),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn cli_parses_cache_clear() {
        let cli = Cli::parse_from(["dobro", "cache", "clear", "--yes"]);
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Clear { yes, .. },
            }) => assert!(yes),
            _ => panic!("expected cache clear"),
        }
    }

    #[test]
    fn relative_project_resolves_against_cwd() {
        let args = ProjectArgs {
            manifest: None,
            project: Some(PathBuf::from("app")),
        };
        assert_eq!(args.project_dir(Path::new("/work")), PathBuf::from("/work/app"));
        assert_eq!(
            ProjectArgs::default().project_dir(Path::new("/work")),
            PathBuf::from("/work")
        );
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["dobro", "status"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["dobro", "-v", "status"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["dobro", "-vv", "status"]);
        assert_eq!(cli.verbose, 2);
    }
}
