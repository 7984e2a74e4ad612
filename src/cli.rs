use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the profile's packages on every matching host
    InstallPackages(ProfileArgs),

    /// Point every host's package manager at a build's repositories
    InstallRepos(InstallReposArgs),

    /// Disable the firewall on every host
    StopFirewall(ProfileArgs),

    /// Download a single file unless it is already present
    Fetch(FetchArgs),

    /// Mirror a remote directory tree with wget
    FetchDir(FetchDirArgs),

    /// Validate the given YAML profile
    Validate(CommonArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Commands {
    /// Log level requested by the subcommand, if it takes one.
    pub fn log_level(&self) -> Option<LogLevel> {
        match self {
            Commands::InstallPackages(opts) | Commands::StopFirewall(opts) => {
                Some(opts.common.log_level)
            }
            Commands::InstallRepos(opts) => Some(opts.profile.common.log_level),
            Commands::Fetch(opts) => Some(opts.log_level),
            Commands::FetchDir(opts) => Some(opts.log_level),
            Commands::Validate(opts) => Some(opts.log_level),
            Commands::Completions(_) => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to the YAML file defining the profile
    #[arg(short, long, default_value = "profile.yaml")]
    pub file: Utf8PathBuf,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Do not run, just show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct InstallReposArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Build SHA whose repositories should be installed
    #[arg(long)]
    pub sha: String,

    /// Local directory for fetched artifacts (overrides the profile)
    #[arg(long)]
    pub configs_dir: Option<Utf8PathBuf>,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// URL of the directory serving the file
    #[arg(long)]
    pub base_url: String,

    /// Name of the file to fetch
    #[arg(long)]
    pub file_name: String,

    /// Local destination directory
    #[arg(long)]
    pub dest: Utf8PathBuf,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct FetchDirArgs {
    /// URL of the remote directory
    #[arg(long)]
    pub url: String,

    /// Local destination directory
    #[arg(long)]
    pub dest: Utf8PathBuf,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Do not run, just show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Log levels for the `--log-level` flag, mapped onto `tracing` levels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

pub fn parse_args() -> Result<Cli> {
    Ok(Cli::parse())
}
