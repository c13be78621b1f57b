//! Error types for the format helpers.

use thiserror::Error;

/// Errors from formatting options and URL generation.
#[derive(Debug, Error)]
pub enum FormatError {
    /// An option value is out of range.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Unknown URL method name.
    #[error("unknown url method: {0}")]
    UnknownMethod(String),

    /// The target has no page for this method.
    #[error("{target} has no {method} page")]
    UnsupportedMethod { target: String, method: String },

    /// The method needs an id, none was given.
    #[error("{method} url for {target} needs an id")]
    MissingId { target: String, method: String },

    /// A converter pattern failed to compile.
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for format operations.
pub type Result<T> = std::result::Result<T, FormatError>;
