//! Error types for the Seed deployment engine.
//!
//! This module provides the error hierarchy for every phase of a node's
//! lifecycle: configuration, command execution, network fetches,
//! reconciliation and backups.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Seed deployment engine.
#[derive(Debug, Error)]
pub enum SeedDeployError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// External command errors.
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Network fetch errors.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Reconciliation errors.
    #[error("Deployment failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Backup and restore errors.
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    /// The operator cancelled an interactive flow.
    #[error("{message}")]
    Cancelled {
        /// What was cancelled.
        message: String,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// A configuration value was rejected.
    #[error("Invalid value for {field}: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: String,
    },

    /// The configuration could not be written.
    #[error("Failed to write configuration to {path}: {message}")]
    WriteFailed {
        /// Destination path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// External command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not be started.
    #[error("Failed to spawn `{command}`: {message}")]
    Spawn {
        /// The command line.
        command: String,
        /// Description of the spawn failure.
        message: String,
    },

    /// The command exited with a non-zero status.
    #[error("`{command}` exited with status {status}: {stderr}")]
    Failed {
        /// The command line.
        command: String,
        /// Exit code, or -1 when killed by a signal.
        status: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// The command did not finish in time.
    #[error("`{command}` timed out after {timeout_secs}s")]
    Timeout {
        /// The command line.
        command: String,
        /// Timeout that was exceeded.
        timeout_secs: u64,
    },
}

/// Network fetch errors.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("GET {url} returned status {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The request could not be completed.
    #[error("GET {url} failed: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Description of the failure.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The workspace could not be prepared.
    #[error("could not prepare {path}: {reason}")]
    SetupFailed {
        /// Path being prepared.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// `docker compose up` failed.
    #[error("docker compose up failed: {reason}{}", rolled_back_suffix(.rolled_back))]
    ApplyFailed {
        /// Reason for failure.
        reason: String,
        /// Whether a rollback was attempted.
        rolled_back: bool,
    },

    /// Containers did not become healthy.
    #[error(
        "containers did not become healthy after {attempts} checks{}",
        rolled_back_suffix(.rolled_back)
    )]
    HealthCheckFailed {
        /// Number of health checks performed.
        attempts: u32,
        /// Whether a rollback was attempted.
        rolled_back: bool,
    },
}

/// Backup and restore errors.
#[derive(Debug, Error)]
pub enum BackupError {
    /// No configuration exists to back up.
    #[error("No configuration found at {path}; nothing to back up")]
    NotConfigured {
        /// Expected config path.
        path: PathBuf,
    },

    /// The archive could not be written or read.
    #[error("Archive error for {path}: {message}")]
    Archive {
        /// Archive path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The archive has no embedded metadata.
    #[error("{path} is not a Seed backup (missing {file})")]
    MissingMetadata {
        /// Archive path.
        path: PathBuf,
        /// Expected metadata file name.
        file: String,
    },

    /// No archive was found to restore.
    #[error("No backup archives found in {dir}")]
    NoArchives {
        /// Directory that was searched.
        dir: PathBuf,
    },
}

const fn rolled_back_suffix(rolled_back: &bool) -> &'static str {
    if *rolled_back {
        " (rolled back to previous images)"
    } else {
        ""
    }
}

/// Result type alias for Seed deployment operations.
pub type Result<T> = std::result::Result<T, SeedDeployError>;

impl SeedDeployError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a cancellation error with the given message.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Returns true if the operator cancelled the operation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns true if a rollback ran before this error was raised.
    #[must_use]
    pub const fn rolled_back(&self) -> bool {
        matches!(
            self,
            Self::Reconcile(
                ReconcileError::ApplyFailed {
                    rolled_back: true,
                    ..
                } | ReconcileError::HealthCheckFailed {
                    rolled_back: true,
                    ..
                }
            )
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: field.into(),
        }
    }
}

impl FetchError {
    /// Creates a network error.
    #[must_use]
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl BackupError {
    /// Creates an archive error.
    #[must_use]
    pub fn archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.into(),
        }
    }
}
