//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid version: '{input}'")]
    InvalidVersion { input: String },

    #[error("Invalid dependency '{input}': {reason}")]
    InvalidDependency { input: String, reason: String },

    #[error("Invalid package name '{name}': expected <name>-<version>")]
    InvalidPackageName { name: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
