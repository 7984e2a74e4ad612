//! Build repository installation.
//!
//! Points a host's package manager at the artifacts of one build: the vendor
//! release package, the build's repo definition, and a local mirror of the
//! build's repository tree, copied onto the host and patched in place.

mod apt;
mod rpm;

use std::sync::{Arc, LazyLock};

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tracing::info;

use crate::config::BuildServerConfig;
use crate::executor::CommandExecutor;
use crate::fetch::HttpFetch;
use crate::host::{Host, RemoteCommand};
use crate::platform::with_version_codename;

/// Directory on the host that receives the copied artifacts.
pub const REMOTE_STAGING_DIR: &str = "/root";

static RPM_PLATFORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(fedora|el|centos)-(\d+)-(.+)$").expect("rpm platform pattern is valid")
});

static APT_PLATFORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(debian|ubuntu)-([^-]+)-(.+)$").expect("apt platform pattern is valid")
});

/// Package format family of a platform, for repository purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoFamily {
    Rpm,
    Apt,
}

/// Values derived from a platform string for a single repo installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInstallContext {
    pub family: RepoFamily,
    /// `el`, `fedora`, `debian` or `ubuntu` (CentOS is reported as `el`).
    pub variant: String,
    /// Release version; a codename for Debian-like platforms.
    pub version: String,
    pub arch: String,
    /// Prepended to the version in build paths (`f` for Fedora).
    pub version_prefix: &'static str,
    pub sha: String,
    /// Local directory the artifacts are fetched into.
    pub platform_configs_dir: Utf8PathBuf,
}

impl RepoInstallContext {
    /// Parses `platform` (already codename-normalized) into a context.
    ///
    /// Returns `None` for platforms outside the RPM and APT families.
    pub fn parse(platform: &str, sha: &str, repo_configs_dir: &Utf8Path) -> Option<Self> {
        let platform_configs_dir = repo_configs_dir.join(platform);

        if let Some(caps) = RPM_PLATFORM.captures(platform) {
            let variant = match &caps[1] {
                "centos" => "el",
                other => other,
            };
            return Some(Self {
                family: RepoFamily::Rpm,
                variant: variant.to_string(),
                version: caps[2].to_string(),
                arch: caps[3].to_string(),
                version_prefix: if variant == "fedora" { "f" } else { "" },
                sha: sha.to_string(),
                platform_configs_dir,
            });
        }

        if let Some(caps) = APT_PLATFORM.captures(platform) {
            return Some(Self {
                family: RepoFamily::Apt,
                variant: caps[1].to_string(),
                version: caps[2].to_string(),
                arch: caps[3].to_string(),
                version_prefix: "",
                sha: sha.to_string(),
                platform_configs_dir,
            });
        }

        None
    }

    /// `<prefix><version>`, as used in build server paths.
    pub fn prefixed_version(&self) -> String {
        format!("{}{}", self.version_prefix, self.version)
    }
}

/// Escapes `text` for use as a literal inside a sed extended regex.
pub(crate) fn sed_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if ".[]*^$\\+?(){}|#".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Removes staged files matching `patterns` directly under the staging dir.
pub(crate) fn remove_staged(patterns: &[&str]) -> RemoteCommand {
    let mut args = vec![
        REMOTE_STAGING_DIR.to_string(),
        "-maxdepth".to_string(),
        "1".to_string(),
        "-type".to_string(),
        "f".to_string(),
        "(".to_string(),
    ];
    for (index, pattern) in patterns.iter().enumerate() {
        if index > 0 {
            args.push("-o".to_string());
        }
        args.push("-name".to_string());
        args.push((*pattern).to_string());
    }
    args.push(")".to_string());
    args.push("-delete".to_string());
    RemoteCommand::new("find", args)
}

/// Applies a sed expression to every file named `name_pattern` in `dir`.
pub(crate) fn patch_files(dir: &str, name_pattern: &str, expression: String) -> RemoteCommand {
    RemoteCommand::new(
        "find",
        [
            dir.to_string(),
            "-name".to_string(),
            name_pattern.to_string(),
            "-exec".to_string(),
            "sed".to_string(),
            "-i".to_string(),
            "-E".to_string(),
            expression,
            "{}".to_string(),
            ";".to_string(),
        ],
    )
}

/// Installs build repositories on hosts.
pub struct RepoInstaller {
    fetcher: Arc<dyn HttpFetch>,
    executor: Arc<dyn CommandExecutor>,
    build: BuildServerConfig,
}

impl RepoInstaller {
    pub fn new(
        fetcher: Arc<dyn HttpFetch>,
        executor: Arc<dyn CommandExecutor>,
        build: BuildServerConfig,
    ) -> Self {
        Self {
            fetcher,
            executor,
            build,
        }
    }

    /// Wires `host` up to the repositories of build `sha`.
    ///
    /// Artifacts are fetched into `repo_configs_dir/<platform>`. Platforms
    /// outside the RPM and APT families are logged and left alone.
    pub fn install_repos(
        &self,
        host: &dyn Host,
        sha: &str,
        repo_configs_dir: &Utf8Path,
    ) -> Result<()> {
        let platform = with_version_codename(host.platform());
        let Some(ctx) = RepoInstallContext::parse(&platform, sha, repo_configs_dir) else {
            info!("No repository installation step for {} yet...", platform);
            return Ok(());
        };

        info!(
            host = host.name(),
            variant = %ctx.variant,
            version = %ctx.version,
            arch = %ctx.arch,
            "installing repositories for build {}",
            sha
        );

        match ctx.family {
            RepoFamily::Rpm => rpm::install(self, host, &ctx),
            RepoFamily::Apt => apt::install(self, host, &ctx),
        }
    }

    /// `<builds_url>/<project>/<sha>`
    fn build_root(&self, sha: &str) -> String {
        format!(
            "{}/{}/{}",
            self.build.builds_url.trim_end_matches('/'),
            self.build.project,
            sha
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(platform: &str) -> Option<RepoInstallContext> {
        RepoInstallContext::parse(platform, "abc123", Utf8Path::new("/tmp/configs"))
    }

    #[test]
    fn centos_is_normalized_to_el() {
        let ctx = parse("centos-7-x86_64").unwrap();
        assert_eq!(ctx.family, RepoFamily::Rpm);
        assert_eq!(ctx.variant, "el");
        assert_eq!(ctx.version, "7");
        assert_eq!(ctx.arch, "x86_64");
        assert_eq!(ctx.prefixed_version(), "7");
        assert_eq!(ctx.platform_configs_dir, "/tmp/configs/centos-7-x86_64");
    }

    #[test]
    fn fedora_gets_f_prefix() {
        let ctx = parse("fedora-20-i386").unwrap();
        assert_eq!(ctx.variant, "fedora");
        assert_eq!(ctx.prefixed_version(), "f20");
    }

    #[test]
    fn apt_platform_keeps_codename() {
        let ctx = parse("ubuntu-trusty-amd64").unwrap();
        assert_eq!(ctx.family, RepoFamily::Apt);
        assert_eq!(ctx.variant, "ubuntu");
        assert_eq!(ctx.version, "trusty");
        assert_eq!(ctx.arch, "amd64");
    }

    #[test]
    fn other_platforms_do_not_parse() {
        assert!(parse("windows-2012-x86_64").is_none());
        assert!(parse("solaris-11-i386").is_none());
        assert!(parse("el-seven-x86_64").is_none());
    }

    #[test]
    fn sed_literal_escapes_dots() {
        assert_eq!(sed_literal("http://builds.example.lan"), r"http://builds\.example\.lan");
    }

    #[test]
    fn remove_staged_builds_grouped_find() {
        let cmd = remove_staged(&["*.repo", "*.rpm"]);
        assert_eq!(
            cmd.to_string(),
            "find /root -maxdepth 1 -type f ( -name *.repo -o -name *.rpm ) -delete"
        );
        assert_eq!(
            cmd.to_shell(),
            "find /root -maxdepth 1 -type f '(' -name '*.repo' -o -name '*.rpm' ')' -delete"
        );
    }
}
