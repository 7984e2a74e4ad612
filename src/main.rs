use std::io;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;
use rsprovision::cli::{self, Commands};
use rsprovision::executor::{CommandExecutor, RealCommandExecutor};
use rsprovision::fetch::{HttpFetch, ReqwestFetcher};
use tracing::error;

fn run(args: &cli::Cli) -> Result<()> {
    match &args.command {
        Commands::InstallPackages(opts) => {
            let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor {
                dry_run: opts.dry_run,
            });
            rsprovision::run_install_packages(opts, executor)
        }
        Commands::InstallRepos(opts) => {
            let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor {
                dry_run: opts.profile.dry_run,
            });
            let fetcher: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new()?);
            rsprovision::run_install_repos(opts, executor, fetcher)
        }
        Commands::StopFirewall(opts) => {
            let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor {
                dry_run: opts.dry_run,
            });
            rsprovision::run_stop_firewall(opts, executor)
        }
        Commands::Fetch(opts) => rsprovision::run_fetch(opts, &ReqwestFetcher::new()?),
        Commands::FetchDir(opts) => rsprovision::run_fetch_dir(
            opts,
            &RealCommandExecutor {
                dry_run: opts.dry_run,
            },
        ),
        Commands::Validate(opts) => rsprovision::run_validate(opts),
        Commands::Completions(opts) => {
            let mut cmd = cli::Cli::command();
            let name = cmd.get_name().to_string();
            generate(opts.shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

fn main() {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(2);
        }
    };

    if let Some(level) = args.command.log_level()
        && let Err(e) = rsprovision::init_logging(level)
    {
        eprintln!("{:#}", e);
        process::exit(1);
    }

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        process::exit(1);
    }
}
