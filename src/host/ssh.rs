//! `ssh`/`scp` backed host.

use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::debug;

use super::{Host, RemoteCommand};
use crate::config::{HostConfig, SshConfig};
use crate::executor::{CommandExecutor, CommandSpec};
use crate::platform::{PlatformCategory, PlatformMatcher};

const CYGWIN_SETUP: &str = "setup-x86_64.exe";
const CYGWIN_ROOT: &str = r"C:\cygwin64";
const CYGWIN_MIRROR: &str = "http://cygwin.osuosl.org";

/// Exit code `ssh` uses for its own failures (connection, authentication).
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// A test host reached over `ssh`, with files copied by `scp`.
pub struct SshHost {
    name: String,
    hostname: String,
    platform: String,
    ssh: SshConfig,
    executor: Arc<dyn CommandExecutor>,
    matcher: PlatformMatcher,
}

impl SshHost {
    /// Creates a host whose package commands are chosen by `matcher`.
    pub fn new(
        host: &HostConfig,
        ssh: &SshConfig,
        executor: Arc<dyn CommandExecutor>,
        matcher: PlatformMatcher,
    ) -> Self {
        Self {
            name: host.name.clone(),
            hostname: host.hostname.clone(),
            platform: host.platform.clone(),
            ssh: ssh.clone(),
            executor,
            matcher,
        }
    }

    fn target(&self) -> String {
        format!("{}@{}", self.ssh.user, self.hostname)
    }

    /// Options shared by `ssh` and `scp`.
    fn common_options(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if let Some(ref identity) = self.ssh.identity_file {
            args.push("-i".to_string());
            args.push(identity.to_string());
        }
        args
    }

    fn ssh_spec(&self, command: &RemoteCommand) -> CommandSpec {
        let mut args = self.common_options();
        args.push("-p".to_string());
        args.push(self.ssh.port.to_string());
        args.push(self.target());
        args.push(command.to_shell());
        CommandSpec::new("ssh", args)
    }

    fn category(&self) -> Result<PlatformCategory> {
        Ok(self.matcher.classify(&self.platform)?)
    }

    fn query_command(&self, name: &str) -> Result<RemoteCommand> {
        let command = match self.category()? {
            PlatformCategory::RedHat => RemoteCommand::new("rpm", ["-q", name]),
            PlatformCategory::Debian | PlatformCategory::DebianRuby18 => {
                RemoteCommand::new("dpkg", ["-s", name])
            }
            PlatformCategory::Solaris => RemoteCommand::new("pkginfo", [name]),
            PlatformCategory::Windows => RemoteCommand::new("cygcheck", [name]),
        };
        Ok(command)
    }

    fn install_command(&self, name: &str, extra_flags: &[String]) -> Result<RemoteCommand> {
        let command = match self.category()? {
            PlatformCategory::RedHat => {
                let mut args = vec!["-y".to_string()];
                args.extend(extra_flags.iter().cloned());
                args.push("install".to_string());
                args.push(name.to_string());
                RemoteCommand::new("yum", args)
            }
            PlatformCategory::Debian | PlatformCategory::DebianRuby18 => {
                let mut args = vec!["install".to_string(), "-y".to_string()];
                args.extend(extra_flags.iter().cloned());
                args.push(name.to_string());
                RemoteCommand::new("apt-get", args)
            }
            PlatformCategory::Solaris => {
                let mut args = vec!["install".to_string()];
                args.extend(extra_flags.iter().cloned());
                args.push(name.to_string());
                RemoteCommand::new("pkg", args)
            }
            PlatformCategory::Windows => RemoteCommand::new(
                CYGWIN_SETUP,
                ["-q", "-n", "-N", "-d", "-R", CYGWIN_ROOT, "-s", CYGWIN_MIRROR, "-P", name],
            ),
        };
        Ok(command)
    }
}

impl Host for SshHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> &str {
        &self.platform
    }

    fn check_for_package(&self, name: &str) -> Result<bool> {
        let command = self.query_command(name)?;
        let spec = self.ssh_spec(&command);
        let result = self
            .executor
            .execute(&spec)
            .with_context(|| format!("failed to probe {} on {}", name, self.name))?;
        if result.code() == Some(SSH_TRANSPORT_FAILURE) {
            result
                .ensure_success(&spec)
                .with_context(|| format!("could not reach {} to probe {}", self.name, name))?;
        }
        // No exit status means nothing ran (dry run): report the package missing
        // so the install that would follow is shown as well.
        let present = result.status.is_some_and(|status| status.success());
        debug!(host = %self.name, package = name, present, "package probe");
        Ok(present)
    }

    fn install_package(&self, name: &str, extra_flags: &[String]) -> Result<()> {
        let command = self.install_command(name, extra_flags)?;
        self.exec(&command)
            .with_context(|| format!("failed to install {} on {}", name, self.name))
    }

    fn exec(&self, command: &RemoteCommand) -> Result<()> {
        debug!(host = %self.name, "running: {}", command);
        let spec = self.ssh_spec(command);
        let result = self
            .executor
            .execute(&spec)
            .with_context(|| format!("failed to run `{}` on {}", command, self.name))?;
        result
            .ensure_success(&spec)
            .with_context(|| format!("`{}` failed on {}", command, self.name))?;
        Ok(())
    }

    fn scp_to(&self, local: &Utf8Path, remote_dir: &str) -> Result<()> {
        debug!(host = %self.name, "copying {} to {}", local, remote_dir);
        let mut args = vec!["-r".to_string()];
        args.extend(self.common_options());
        args.push("-P".to_string());
        args.push(self.ssh.port.to_string());
        args.push(local.to_string());
        args.push(format!("{}:{}", self.target(), remote_dir));
        let spec = CommandSpec::new("scp", args);
        let result = self
            .executor
            .execute(&spec)
            .with_context(|| format!("failed to copy {} to {}", local, self.name))?;
        result
            .ensure_success(&spec)
            .with_context(|| format!("copying {} to {}:{} failed", local, self.name, remote_dir))?;
        Ok(())
    }
}
