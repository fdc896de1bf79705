//! Error types for the timing core.
//!
//! All errors implement `std::error::Error` and carry enough context to tell a
//! transient memory hiccup apart from a broken configuration.
//!
//! ## Error Categories
//!
//! - **File Errors**: configuration, replay and track files that cannot be read
//! - **Memory Errors**: reads outside the attached game image
//! - **Validation Errors**: counters that fail sanity checks (car count, laps)
//! - **Parse Errors**: YAML or text that cannot be interpreted
//! - **Provider Errors**: snapshot sources that fail while polling
//! - **Lap Log Errors**: CSV rows that cannot be written
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use icr2_timing::TimingError;
//!
//! let error = TimingError::memory_read_failed(0xE1DC4, 0x214);
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for timing operations.
pub type Result<T, E = TimingError> = std::result::Result<T, E>;

/// Main error type for timing operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TimingError {
    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Memory read of {len} bytes at offset {offset:#x} failed")]
    Memory { offset: u32, len: usize },

    #[error("Invalid {field} value {value}")]
    InvalidValue { field: String, value: i64 },

    #[error("Unsupported memory version '{version}' (expected REND32A, DOS or WINDY)")]
    UnsupportedVersion { version: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Snapshot provider failed: {reason}")]
    Provider {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Lap log write failed")]
    LapLog {
        #[from]
        source: csv::Error,
    },
}

impl TimingError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TimingError::Memory { .. } => true,
            TimingError::InvalidValue { .. } => true,
            TimingError::Provider { .. } => true,
            TimingError::File { .. } => false,
            TimingError::Parse { .. } => false,
            TimingError::UnsupportedVersion { .. } => false,
            TimingError::Config { .. } => false,
            TimingError::LapLog { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TimingError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
                "Verify the path in the configuration file",
            ],
            TimingError::Parse { .. } => vec![
                "Check file format compatibility",
                "Verify source data integrity",
            ],
            TimingError::Memory { .. } => vec![
                "Ensure the game is running inside DOSBox",
                "Verify the configured memory version matches the executable",
                "Wait for the race session to load",
            ],
            TimingError::InvalidValue { .. } => vec![
                "Wait for the race session to finish loading",
                "Verify the configured memory version matches the executable",
            ],
            TimingError::UnsupportedVersion { .. } => {
                vec!["Set memory.version to REND32A, DOS or WINDY"]
            }
            TimingError::Config { .. } => vec![
                "Check the YAML syntax of the configuration file",
                "Remove unknown or mistyped keys",
            ],
            TimingError::Provider { .. } => vec![
                "Check that the snapshot source is still available",
                "Restart the timing connection",
            ],
            TimingError::LapLog { .. } => vec![
                "Check free disk space",
                "Check write permissions of the lap log directory",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TimingError::File { path, source }
    }

    /// Helper constructor for failed memory reads.
    pub fn memory_read_failed(offset: u32, len: usize) -> Self {
        TimingError::Memory { offset, len }
    }

    /// Helper constructor for counters that fail validation.
    pub fn invalid_value(field: impl Into<String>, value: i64) -> Self {
        TimingError::InvalidValue { field: field.into(), value }
    }

    /// Helper constructor for provider failures.
    ///
    /// For custom [`Provider`](crate::provider::Provider) implementations; the
    /// driver retries these with backoff.
    pub fn provider_failed(reason: impl Into<String>) -> Self {
        TimingError::Provider { reason: reason.into(), source: None }
    }

    /// Helper constructor for provider failures with source, for custom providers.
    pub fn provider_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TimingError::Provider { reason: reason.into(), source: Some(source) }
    }
}

impl From<std::io::Error> for TimingError {
    fn from(err: std::io::Error) -> Self {
        TimingError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
