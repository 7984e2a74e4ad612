//! YUM repository installation for Fedora, EL and CentOS hosts.

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::{debug, info};

use super::{
    REMOTE_STAGING_DIR, RepoInstallContext, RepoInstaller, patch_files, remove_staged, sed_literal,
};
use crate::error::RsprovisionError;
use crate::fetch::{fetch_http_file, fetch_remote_dir, join_url};
use crate::host::{Host, RemoteCommand};

const YUM_REPOS_DIR: &str = "/etc/yum.repos.d/";

/// Repository locations probed in order for the build's packages.
const REPO_KINDS: [&str; 2] = ["products", "devel"];

pub(super) fn install(
    installer: &RepoInstaller,
    host: &dyn Host,
    ctx: &RepoInstallContext,
) -> Result<()> {
    let fetcher = installer.fetcher.as_ref();
    let build = &installer.build;
    let build_root = installer.build_root(&ctx.sha);
    let dest = ctx.platform_configs_dir.as_path();

    let rpm_name = format!("puppetlabs-release-{}-{}.noarch.rpm", ctx.variant, ctx.version);
    let rpm = fetch_http_file(fetcher, &build.yum_release_url, &rpm_name, dest)?;

    let repo_name = format!(
        "pl-{}-{}-{}-{}-{}.repo",
        build.project,
        ctx.sha,
        ctx.variant,
        ctx.prefixed_version(),
        ctx.arch
    );
    let repo = fetch_http_file(
        fetcher,
        &format!("{}/repo_configs/rpm/", build_root),
        &repo_name,
        dest,
    )?;

    let link = find_repo_link(installer, &build_root, ctx)?;
    let repo_dir = fetch_remote_dir(installer.executor.as_ref(), &link, dest)?;

    stage(host, ctx, &[rpm.as_path(), repo.as_path(), repo_dir.as_path()])?;

    let staged_repo = format!("{}/{}", REMOTE_STAGING_DIR, repo_name);
    host.exec(&RemoteCommand::new("mv", [staged_repo.as_str(), YUM_REPOS_DIR]))?;

    let expression = format!(
        "s#^baseurl\\s*=\\s*{}.*$#baseurl=file:///root/{}#",
        sed_literal(build.builds_url.trim_end_matches('/')),
        ctx.arch
    );
    host.exec(&patch_files(YUM_REPOS_DIR, "*.repo", expression))?;

    let staged_rpm = format!("{}/{}", REMOTE_STAGING_DIR, rpm_name);
    host.exec(&RemoteCommand::new("rpm", ["-Uvh", "--force", staged_rpm.as_str()]))
        .with_context(|| format!("failed to install {} on {}", rpm_name, host.name()))?;

    info!(host = host.name(), "yum repositories installed for build {}", ctx.sha);
    Ok(())
}

/// Returns the first reachable repository directory, products before devel.
fn find_repo_link(
    installer: &RepoInstaller,
    build_root: &str,
    ctx: &RepoInstallContext,
) -> Result<String, RsprovisionError> {
    let links: Vec<(&str, String)> = REPO_KINDS
        .iter()
        .map(|kind| {
            let path = format!(
                "repos/{}/{}/{}/{}/",
                ctx.variant,
                ctx.prefixed_version(),
                kind,
                ctx.arch
            );
            (*kind, join_url(build_root, &path))
        })
        .collect();

    for (kind, link) in &links {
        if installer.fetcher.exists(link)? {
            debug!("using {} repository at {}", kind, link);
            return Ok(link.clone());
        }
        debug!("{} repository not reachable at {}", kind, link);
    }
    Err(RsprovisionError::RepoUnavailable {
        link: links.last().map(|(_, link)| link.clone()).unwrap_or_default(),
    })
}

/// Clears earlier staging on the host and copies the new artifacts over.
fn stage(host: &dyn Host, ctx: &RepoInstallContext, artifacts: &[&Utf8Path]) -> Result<()> {
    host.exec(&remove_staged(&["*.repo", "*.rpm"]))?;
    let old_mirror = format!("{}/{}", REMOTE_STAGING_DIR, ctx.arch);
    host.exec(&RemoteCommand::new("rm", ["-rf", old_mirror.as_str()]))?;

    for artifact in artifacts {
        host.scp_to(artifact, REMOTE_STAGING_DIR)?;
    }
    Ok(())
}
