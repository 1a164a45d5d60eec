//! Error types for repository operations

use std::path::PathBuf;
use thiserror::Error;
use trove_core::CoreError;

/// Repository operation errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Configuration Errors ============
    #[error("Remote repository not found: {name}")]
    RemoteNotFound { name: String },

    #[error("Remote repository already exists: {name}")]
    RemoteAlreadyExists { name: String },

    #[error("Invalid repository configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Could not resolve repository from '{input}'")]
    UnresolvedRepository { input: String },

    // ============ Usage Errors ============
    #[error("Package {package} does not belong to repository {repository}")]
    ForeignPackage { package: String, repository: String },

    #[error("Invalid package file name '{file_name}': expected <name>-<version>.trove")]
    InvalidPackageFileName { file_name: String },

    #[error("Cannot anchor at '{}': the path is not an anchor", path.display())]
    AnchorOccupied { path: PathBuf },

    // ============ Core Errors ============
    #[error(transparent)]
    Core(#[from] CoreError),

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}
