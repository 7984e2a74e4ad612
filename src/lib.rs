pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod firewall;
pub mod host;
pub mod packages;
pub mod platform;
pub mod repos;

pub use error::RsprovisionError;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::executor::CommandExecutor;
use crate::fetch::HttpFetch;
use crate::host::{Host, SshHost};
use crate::platform::PlatformMatcher;

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Loads and validates the profile named by the common arguments.
fn load_valid_profile(opts: &cli::CommonArgs) -> Result<config::Profile> {
    let profile = config::load_profile(&opts.file)
        .with_context(|| format!("failed to load profile from {}", opts.file))?;
    profile.validate().context("profile validation failed")?;
    Ok(profile)
}

fn ssh_hosts(
    profile: &config::Profile,
    executor: &Arc<dyn CommandExecutor>,
    matcher: &PlatformMatcher,
) -> Vec<SshHost> {
    profile
        .hosts
        .iter()
        .map(|host| SshHost::new(host, &profile.ssh, Arc::clone(executor), matcher.clone()))
        .collect()
}

pub fn run_install_packages(
    opts: &cli::ProfileArgs,
    executor: Arc<dyn CommandExecutor>,
) -> Result<()> {
    let profile = load_valid_profile(&opts.common)?;
    if profile.packages.is_empty() {
        info!("profile declares no packages, nothing to install");
        return Ok(());
    }

    let matcher = PlatformMatcher::default();
    let hosts = ssh_hosts(&profile, &executor, &matcher);
    let hosts: Vec<&dyn Host> = hosts.iter().map(|h| h as &dyn Host).collect();
    packages::install_packages(
        &hosts,
        &profile.packages,
        &profile.install_options(),
        &matcher,
    )?;

    info!("package installation completed on {} host(s)", hosts.len());
    Ok(())
}

pub fn run_install_repos(
    opts: &cli::InstallReposArgs,
    executor: Arc<dyn CommandExecutor>,
    fetcher: Arc<dyn HttpFetch>,
) -> Result<()> {
    let profile = load_valid_profile(&opts.profile.common)?;
    let configs_dir = opts
        .configs_dir
        .clone()
        .unwrap_or_else(|| profile.repo_configs_dir.clone());

    let installer =
        repos::RepoInstaller::new(fetcher, Arc::clone(&executor), profile.build.clone());
    for host in ssh_hosts(&profile, &executor, &PlatformMatcher::default()) {
        installer
            .install_repos(&host, &opts.sha, &configs_dir)
            .with_context(|| {
                format!("failed to install repositories on {}", host.name())
            })?;
    }
    Ok(())
}

pub fn run_stop_firewall(
    opts: &cli::ProfileArgs,
    executor: Arc<dyn CommandExecutor>,
) -> Result<()> {
    let profile = load_valid_profile(&opts.common)?;
    for host in ssh_hosts(&profile, &executor, &PlatformMatcher::default()) {
        firewall::stop_firewall(&host)?;
    }
    Ok(())
}

pub fn run_fetch(opts: &cli::FetchArgs, fetcher: &dyn HttpFetch) -> Result<()> {
    let path = fetch::fetch_http_file(fetcher, &opts.base_url, &opts.file_name, &opts.dest)?;
    info!("fetched {}", path);
    Ok(())
}

pub fn run_fetch_dir(opts: &cli::FetchDirArgs, executor: &dyn CommandExecutor) -> Result<()> {
    let path = fetch::fetch_remote_dir(executor, &opts.url, &opts.dest)?;
    info!("mirrored into {}", path);
    Ok(())
}

pub fn run_validate(opts: &cli::CommonArgs) -> Result<()> {
    let profile = load_valid_profile(opts)?;
    let matcher = PlatformMatcher::default();
    for host in &profile.hosts {
        match matcher.classify(&host.platform) {
            Ok(category) => info!(host = %host.name, "platform {} is {}", host.platform, category),
            Err(e) => tracing::warn!(host = %host.name, "{}", e),
        }
    }
    info!("validation successful:\n{:#?}", profile);
    Ok(())
}
