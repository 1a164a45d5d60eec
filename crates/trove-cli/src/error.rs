//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use miette::Diagnostic;
use thiserror::Error;
use trove_core::CoreError;
use trove_repo::RepoError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid arguments, configuration or input
    #[error("{message}")]
    #[diagnostic(code(trove::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Some dependencies have no satisfying package
    #[error("Dependency resolution failed: {message}")]
    #[diagnostic(
        code(trove::cli::unresolved),
        help("Check the dependency names and the configured remotes with 'trove remote list'")
    )]
    Unresolved { message: String },

    /// Some items of a multi-step operation failed
    #[error("{failed} operation(s) failed")]
    #[diagnostic(code(trove::cli::partial))]
    Partial { failed: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(trove::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(trove::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Unresolved { .. } => exit_codes::UNRESOLVED,
            CliError::Partial { .. } => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a usage error (user provided invalid input)
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    /// Create a usage error with help text
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn unresolved(message: impl Into<String>) -> Self {
        Self::Unresolved {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::Archive { .. } => CliError::Other {
                message: err.to_string(),
            },
            other => CliError::usage(other.to_string()),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Io(e) => e.into(),
            RepoError::Core(e) => e.into(),
            RepoError::InvalidConfig { .. } => CliError::usage_with_help(
                err.to_string(),
                "Pass --config-dir or set TROVE_CONFIG_DIR",
            ),
            RepoError::RemoteNotFound { .. } => CliError::usage_with_help(
                err.to_string(),
                "List configured remotes with 'trove remote list'",
            ),
            RepoError::RemoteAlreadyExists { .. }
            | RepoError::UnresolvedRepository { .. }
            | RepoError::ForeignPackage { .. }
            | RepoError::AnchorOccupied { .. }
            | RepoError::InvalidPackageFileName { .. } => CliError::usage(err.to_string()),
            RepoError::Serialization(_) => CliError::Other {
                message: err.to_string(),
            },
        }
    }
}

impl From<miette::Report> for CliError {
    fn from(err: miette::Report) -> Self {
        CliError::Other {
            message: format!("{:?}", err),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
