//! Error types for the menu module.

use thiserror::Error;

/// Errors that can occur while building or caching trees.
#[derive(Debug, Error)]
pub enum MenuError {
    /// Cache configured with zero entries.
    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,

    /// Label overrides could not be parsed.
    #[error("invalid labels: {0}")]
    Labels(String),

    /// JSON encoding of a tree failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL generation failed.
    #[error("format error: {0}")]
    Format(#[from] stockroom_format::FormatError),

    /// Hierarchy lookup failed.
    #[error("core error: {0}")]
    Core(#[from] stockroom_core::CoreError),
}

/// Result type for menu operations.
pub type Result<T> = std::result::Result<T, MenuError>;
