//! Command execution abstraction for rsprovision.
//!
//! This module provides:
//! - [`CommandSpec`]: Specification for commands to execute
//! - [`ExecutionResult`]: Result of command execution
//! - [`CommandExecutor`]: Trait for command execution strategies
//! - [`RealCommandExecutor`]: Production implementation using `std::process::Command`
//!
//! Both local tools (`wget`) and the remote transport (`ssh`, `scp`) go
//! through this trait, so tests can record every command without a network.

mod pipe;
mod real;

use std::process::ExitStatus;

use anyhow::Result;

use crate::error::RsprovisionError;

pub use real::RealCommandExecutor;

/// Formats string arguments into a space-separated, debug-quoted string.
///
/// Used by error messages and dry-run output to consistently format
/// command arguments (e.g., `"-nv" "-P" "/tmp/configs"`).
pub(crate) fn format_command_args(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log level used for the streamed output of a child process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputLevel {
    /// stdout at INFO, stderr at WARN.
    #[default]
    Progress,
    /// Both streams at DEBUG.
    Debug,
}

/// Specification for a command to be executed
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The command to execute (e.g., "wget")
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Level at which child output is logged
    pub output: OutputLevel,
}

impl CommandSpec {
    /// Creates a new CommandSpec with command and args
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            output: OutputLevel::default(),
        }
    }

    /// Sets the level used to log child output
    #[must_use]
    pub fn with_output(mut self, output: OutputLevel) -> Self {
        self.output = output;
        self
    }

    /// Renders the command line for log and error messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, format_command_args(&self.args))
        }
    }
}

/// Result of command execution
#[derive(Debug)]
pub struct ExecutionResult {
    /// Exit status of the command (None in dry-run mode)
    pub status: Option<ExitStatus>,
}

impl ExecutionResult {
    /// Returns true if the command executed successfully.
    ///
    /// In dry-run mode (status is None), this always returns true.
    pub fn success(&self) -> bool {
        self.status.is_none_or(|s| s.success())
    }

    /// Returns the exit code if available
    pub fn code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }

    /// Converts a non-zero exit into [`RsprovisionError::Execution`].
    pub fn ensure_success(&self, spec: &CommandSpec) -> Result<(), RsprovisionError> {
        if self.success() {
            return Ok(());
        }
        let status = match (self.code(), self.status) {
            (Some(code), _) => format!("exit code {}", code),
            (None, Some(status)) => status.to_string(),
            (None, None) => "unknown status".to_string(),
        };
        Err(RsprovisionError::Execution {
            command: spec.display(),
            status,
        })
    }
}

/// Trait for command execution.
///
/// Implementations must be `Send + Sync` so a single executor can be shared
/// through `Arc<dyn CommandExecutor>` by the fetchers and every host.
pub trait CommandExecutor: Send + Sync {
    /// Executes a command with the given specification.
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult>;
}
