//! Error types for dexrefresh.
//!
//! Library crates use [`DexError`] via `thiserror`. A refresh run reports at
//! most one [`PipelineError`], which tags the underlying failure with the stage
//! that produced it. The CLI wraps both with `color-eyre`.

use std::path::PathBuf;

/// Top-level error type for collaborator operations.
#[derive(Debug, thiserror::Error)]
pub enum DexError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while resolving an ability.
    #[error("network error: {0}")]
    Network(String),

    /// Record or response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Cache storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad header, malformed reference, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A pipeline task panicked or was aborted.
    #[error("task failed: {0}")]
    Task(String),

    /// The operation observed a cancelled token.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DexError>;

impl DexError {
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
}

/// The single terminal error of a refresh run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The record source was unavailable or a row failed to parse.
    #[error("reading records: {0}")]
    Read(#[source] DexError),

    /// An ability reference could not be resolved.
    #[error("fetching ability: {0}")]
    Fetch(#[source] DexError),

    /// The cache sink rejected the enriched collection.
    #[error("saving creatures in cache: {0}")]
    Save(#[source] DexError),

    /// The caller cancelled the refresh.
    #[error("refresh cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Short stage label for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Fetch(_) => "fetch",
            Self::Save(_) => "save",
            Self::Cancelled => "cancelled",
        }
    }
}
