//! Error types for the permissions module.

use stockroom_core::{NodeId, UserId};
use thiserror::Error;

/// Errors that can occur during permission operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// User not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// Group not found.
    #[error("group not found: {0}")]
    GroupNotFound(NodeId),

    /// A node handed to the group tree is not a group.
    #[error("invalid group: {0}")]
    InvalidGroup(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] stockroom_core::CoreError),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
