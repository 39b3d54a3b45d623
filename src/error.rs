//! Error types shared across the engine.
//!
//! Only [`OrganizeError::InvalidSourcePath`] aborts a whole operation before
//! it starts. Everything that can go wrong with a single file is recorded as a
//! [`FailureEntry`](crate::executor::FailureEntry) instead and the run
//! continues.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop an operation as a whole.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The source directory is missing or cannot be listed.
    #[error("invalid source path {}: {source}", path.display())]
    InvalidSourcePath {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Undo was requested while the journal is empty.
    #[error("no previous move to undo")]
    NoHistory,
    /// A rule index passed to a reorder operation does not exist.
    #[error("rule index {index} is out of range (rule count {len})")]
    RuleIndexOutOfRange { index: usize, len: usize },
    /// The journal file could not be read or written.
    #[error("journal file {}: {reason}", path.display())]
    Journal { path: PathBuf, reason: String },
}

/// Failure to create or use a resolved destination directory.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DestinationError {
    #[error("destination {} is unreachable: {reason}", path.display())]
    Unreachable { path: PathBuf, reason: String },
}

/// Failure of the rename conflict policy to find a free name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("no free name found for {} after {attempts} attempts", path.display())]
    RenameExhausted { path: PathBuf, attempts: u32 },
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern in the snapshot filters.
    #[error("invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// A schedule entry is not a valid `HH:MM` time of day.
    #[error("invalid schedule time '{0}': expected HH:MM")]
    InvalidScheduleTime(String),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Result type for operation-level failures.
pub type OrganizeResult<T> = Result<T, OrganizeError>;
