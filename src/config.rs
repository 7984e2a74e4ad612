//! Profile loading and validation.
//!
//! A profile is a YAML file describing the test hosts, the packages each
//! platform family needs, and where build artifacts are served from.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::error::RsprovisionError;
use crate::packages::{InstallOptions, PackageTable};

fn default_repo_configs_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("repo-configs")
}

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_builds_url() -> String {
    "http://builds.puppetlabs.lan".to_string()
}

fn default_yum_release_url() -> String {
    "http://yum.puppetlabs.com".to_string()
}

fn default_apt_release_url() -> String {
    "http://apt.puppetlabs.com".to_string()
}

fn default_project() -> String {
    "puppet".to_string()
}

/// A test host as declared in the profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Name used in logs
    pub name: String,
    /// Address passed to ssh/scp
    pub hostname: String,
    /// Platform string, e.g. `centos-7-x86_64`
    pub platform: String,
}

/// Connection settings shared by all hosts.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SshConfig {
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<Utf8PathBuf>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: default_user(),
            port: default_port(),
            identity_file: None,
        }
    }
}

/// Where release packages and per-build artifacts are served from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildServerConfig {
    /// Build server root; repo files pointing here get rewritten to the local mirror.
    #[serde(default = "default_builds_url")]
    pub builds_url: String,
    #[serde(default = "default_yum_release_url")]
    pub yum_release_url: String,
    #[serde(default = "default_apt_release_url")]
    pub apt_release_url: String,
    /// Project directory on the build server
    #[serde(default = "default_project")]
    pub project: String,
}

impl Default for BuildServerConfig {
    fn default() -> Self {
        Self {
            builds_url: default_builds_url(),
            yum_release_url: default_yum_release_url(),
            apt_release_url: default_apt_release_url(),
            project: default_project(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Local directory receiving fetched repo artifacts, one subdirectory per platform
    #[serde(default = "default_repo_configs_dir")]
    pub repo_configs_dir: Utf8PathBuf,
    /// Skip packages whose probe reports them as installed
    #[serde(default)]
    pub check_if_exists: bool,
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(default)]
    pub build: BuildServerConfig,
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub packages: PackageTable,
}

impl Profile {
    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            check_if_exists: self.check_if_exists,
        }
    }

    /// Resolves relative paths against the directory holding the profile.
    fn resolve_paths(&mut self, base_dir: &Utf8Path) {
        if self.repo_configs_dir.is_relative() {
            self.repo_configs_dir = base_dir.join(&self.repo_configs_dir);
        }
        if let Some(ref mut identity) = self.ssh.identity_file {
            if let Some(rest) = identity.as_str().strip_prefix("~/") {
                // ssh is spawned without a shell, so `~` is never expanded for us.
                if let Ok(home) = std::env::var("HOME") {
                    *identity = Utf8PathBuf::from(home).join(rest);
                }
            } else if identity.is_relative() {
                *identity = base_dir.join(&*identity);
            }
        }
    }

    pub fn validate(&self) -> Result<(), RsprovisionError> {
        if self.hosts.is_empty() {
            return Err(RsprovisionError::Validation(
                "profile must declare at least one host".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (index, host) in self.hosts.iter().enumerate() {
            for (field, value) in [
                ("name", &host.name),
                ("hostname", &host.hostname),
                ("platform", &host.platform),
            ] {
                if value.trim().is_empty() {
                    return Err(RsprovisionError::Validation(format!(
                        "host {} {} must not be empty",
                        index + 1,
                        field
                    )));
                }
            }
            if !seen.insert(host.name.as_str()) {
                return Err(RsprovisionError::Validation(format!(
                    "duplicate host name: {}",
                    host.name
                )));
            }
        }

        for (category, packages) in self.packages.entries() {
            for spec in packages {
                if spec.probe().trim().is_empty() || spec.package().trim().is_empty() {
                    return Err(RsprovisionError::Validation(format!(
                        "package names under {} must not be empty",
                        category
                    )));
                }
            }
        }

        if self.ssh.port == 0 {
            return Err(RsprovisionError::Validation("ssh port must not be 0".to_string()));
        }

        Ok(())
    }
}

/// Loads a profile from a YAML file.
///
/// Relative paths inside the profile are resolved against the profile's
/// directory. Unknown package table keys are rejected here.
pub fn load_profile(path: &Utf8Path) -> Result<Profile, RsprovisionError> {
    let file = File::open(path).map_err(|e| RsprovisionError::io(path.as_str(), e))?;
    let reader = BufReader::new(file);
    let mut profile: Profile = serde_yaml::from_reader(reader)
        .map_err(|e| RsprovisionError::Config(format!("failed to parse {}: {}", path, e)))?;

    let base_dir = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    profile.resolve_paths(base_dir);

    Ok(profile)
}
