//! APT repository installation for Debian and Ubuntu hosts.

use anyhow::{Context, Result};
use tracing::info;

use super::{
    REMOTE_STAGING_DIR, RepoInstallContext, RepoInstaller, patch_files, remove_staged, sed_literal,
};
use crate::fetch::{fetch_http_file, fetch_remote_dir};
use crate::host::{Host, RemoteCommand};

const SOURCES_LIST_DIR: &str = "/etc/apt/sources.list.d/";

pub(super) fn install(
    installer: &RepoInstaller,
    host: &dyn Host,
    ctx: &RepoInstallContext,
) -> Result<()> {
    let fetcher = installer.fetcher.as_ref();
    let build = &installer.build;
    let build_root = installer.build_root(&ctx.sha);
    let dest = ctx.platform_configs_dir.as_path();
    let codename = ctx.version.as_str();

    let deb_name = format!("puppetlabs-release-{}.deb", codename);
    let deb = fetch_http_file(fetcher, &build.apt_release_url, &deb_name, dest)?;

    let list_name = format!("pl-{}-{}-{}.list", build.project, ctx.sha, codename);
    let list = fetch_http_file(
        fetcher,
        &format!("{}/repo_configs/deb/", build_root),
        &list_name,
        dest,
    )?;

    let repo_dir = fetch_remote_dir(
        installer.executor.as_ref(),
        &format!("{}/repos/apt/{}", build_root, codename),
        dest,
    )?;

    host.exec(&remove_staged(&["*.list", "*.deb"]))?;
    let old_mirror = format!("{}/{}", REMOTE_STAGING_DIR, codename);
    host.exec(&RemoteCommand::new("rm", ["-rf", old_mirror.as_str()]))?;

    for artifact in [&deb, &list, &repo_dir] {
        host.scp_to(artifact, REMOTE_STAGING_DIR)?;
    }

    let staged_list = format!("{}/{}", REMOTE_STAGING_DIR, list_name);
    host.exec(&RemoteCommand::new("mv", [staged_list.as_str(), SOURCES_LIST_DIR]))?;

    let expression = format!(
        "s#^deb\\s+{}.*$#deb file:///root/{} {} main#",
        sed_literal(build.builds_url.trim_end_matches('/')),
        codename,
        codename
    );
    host.exec(&patch_files(SOURCES_LIST_DIR, "*.list", expression))?;

    let staged_deb = format!("{}/{}", REMOTE_STAGING_DIR, deb_name);
    host.exec(&RemoteCommand::new("dpkg", ["-i", "--force-all", staged_deb.as_str()]))
        .with_context(|| format!("failed to install {} on {}", deb_name, host.name()))?;
    host.exec(&RemoteCommand::new("apt-get", ["update"]))?;

    info!(host = host.name(), "apt repositories installed for build {}", ctx.sha);
    Ok(())
}
