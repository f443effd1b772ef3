//! CLI-specific error types and mappings.
//!
//! This module provides error types for the CLI adapter and mappings
//! from library errors to exit codes.

use preload_core::ConfigError;
use preload_http::HttpError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A manifest file could not be parsed.
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// The run finished with failed items.
    #[error("{failed} of {total} item(s) failed to load")]
    Load { failed: usize, total: usize },
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Load { .. } => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Manifest(_) => 65, // EX_DATAERR
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<HttpError> for CliError {
    fn from(err: HttpError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
