//! Error types for Jobsift.
//!
//! Library crates use [`JobsiftError`] via `thiserror`.
//! App crates (cli) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Jobsift operations.
#[derive(Debug, thiserror::Error)]
pub enum JobsiftError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A source could not supply its raw document (missing file, unreadable export).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Message extraction from an exported document failed.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// Database or storage layer error. Fatal for a run.
    #[error("storage error: {0}")]
    Storage(String),

    /// Data validation error (missing required field, invalid record shape).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, JobsiftError>;

impl JobsiftError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = JobsiftError::config("missing database path");
        assert_eq!(err.to_string(), "config error: missing database path");

        let err = JobsiftError::Fetch("export not found: chat.html".into());
        assert!(err.to_string().contains("chat.html"));

        let err = JobsiftError::validation("role must not be empty");
        assert!(err.to_string().contains("role must not be empty"));
    }
}
