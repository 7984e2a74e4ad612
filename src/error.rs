//! Domain-specific error types for rsprovision.
//!
//! This module defines `RsprovisionError`, a `thiserror`-based enum that
//! provides typed error variants for common failure modes. Public API
//! functions return `Result<T, RsprovisionError>` for programmatic error
//! handling, while orchestration code and trait boundaries use `anyhow::Result`.
//!
//! `RsprovisionError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at boundaries that return `anyhow::Result`.

use std::io;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent messages for common IO error kinds (e.g.,
/// "I/O error: not found") instead of the OS-level messages. For
/// unrecognized kinds, falls back to the OS-level error message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for rsprovision.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RsprovisionError {
    /// A validation constraint was violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// No platform rule matched the host's platform string.
    #[error("Unknown platform '{platform}'")]
    UnknownPlatform {
        /// The platform string that failed to classify.
        platform: String,
    },

    /// A package table named a category key that has no platform rule.
    #[error("Unknown platform '{key}' in package table")]
    UnknownCategory {
        /// The offending category key.
        key: String,
    },

    /// A command was not found in PATH.
    #[error("command not found in PATH: {command}")]
    CommandNotFound {
        /// The command that could not be resolved.
        command: String,
    },

    /// A command execution failed (non-zero exit, spawn failure, wait failure, thread panic, etc.).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed.
        command: String,
        /// Human-readable reason for the failure.
        status: String,
    },

    /// An HTTP transfer failed.
    #[error("failed to fetch {url}: {message}")]
    Fetch {
        /// The URL being fetched.
        url: String,
        /// Transport or status error description.
        message: String,
    },

    /// Neither the products nor the devel repository location was reachable.
    #[error("Unable to reach a repo directory at {link}")]
    RepoUnavailable {
        /// The last link that was probed.
        link: String,
    },

    /// A configuration file could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred, usually a path.
        context: String,
        /// Message derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl RsprovisionError {
    /// Creates an `Io` variant with the `message` field derived from `source`.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Creates a `Fetch` variant from any displayable transport error.
    pub(crate) fn fetch(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }
}
