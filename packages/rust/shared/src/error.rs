//! Error types for CourseScope.
//!
//! Library crates use [`CourseScopeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all CourseScope operations.
#[derive(Debug, thiserror::Error)]
pub enum CourseScopeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the catalog.
    #[error("network error: {0}")]
    Network(String),

    /// Browser automation error (launch, navigation, DOM read).
    #[error("browser error: {0}")]
    Browser(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// CSV read/write error.
    #[error("csv error at {path:?}: {message}")]
    Csv { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing columns, bad prefix list, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The catalog's term selector had no usable code for a term.
    #[error("could not resolve term '{term}': {message}")]
    TermResolution { term: String, message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CourseScopeError>;

impl CourseScopeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

    /// Create a CSV error for the file at `path`.
    pub fn csv(path: impl Into<PathBuf>, msg: impl std::fmt::Display) -> Self {
        Self::Csv {
            path: path.into(),
            message: msg.to_string(),
        }
    }

    /// Create a term-resolution error.
    pub fn term(term: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::TermResolution {
            term: term.into(),
            message: msg.into(),
        }
    }
}
