//! Test host abstraction.
//!
//! The provisioning routines never create or destroy hosts; they read a
//! host's platform string and drive it through the [`Host`] trait. The
//! production implementation is [`SshHost`], which shells out to `ssh` and
//! `scp` via a [`CommandExecutor`](crate::executor::CommandExecutor).

mod ssh;

use anyhow::Result;
use camino::Utf8Path;

pub use ssh::SshHost;

/// A command to run on a remote host, kept as a structured argument list.
///
/// Arguments are quoted individually when rendered for the remote shell,
/// so shell metacharacters (including glob patterns meant for `find -name`)
/// reach the remote program unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RemoteCommand {
    /// Creates a command from a program and its arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Renders the command as a single string safe to hand to a POSIX shell.
    pub fn to_shell(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Quotes a word for a POSIX shell.
///
/// Words made only of safe characters are returned as-is; everything else
/// is wrapped in single quotes with embedded quotes escaped.
pub(crate) fn shell_quote(word: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c);
    if !word.is_empty() && word.chars().all(is_safe) {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// A provisioned test machine.
pub trait Host {
    /// Human-readable host name used in log messages.
    fn name(&self) -> &str;

    /// The platform string the host reports (e.g. `centos-7-x86_64`).
    fn platform(&self) -> &str;

    /// Returns true if `name` is already installed on the host.
    fn check_for_package(&self, name: &str) -> Result<bool>;

    /// Installs `name`, passing `extra_flags` to the package manager.
    fn install_package(&self, name: &str, extra_flags: &[String]) -> Result<()>;

    /// Runs a command on the host, failing on non-zero exit.
    fn exec(&self, command: &RemoteCommand) -> Result<()>;

    /// Copies a local file or directory tree into `remote_dir` on the host.
    fn scp_to(&self, local: &Utf8Path, remote_dir: &str) -> Result<()>;
}
