//! Error types for Stockroom Core.

use thiserror::Error;

use crate::types::{EntityKind, NodeId};

/// Errors raised by the permission store, the schema and the hierarchy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Unknown category, bad bit offset, or otherwise malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown permission: {permission}.{operation}")]
    UnknownPermission {
        permission: String,
        operation: String,
    },

    /// Ancestry was compared across two different entity kinds.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Reparenting would make a node its own ancestor.
    #[error("cycle detected: {node} cannot be placed under {parent}")]
    CycleDetected { node: NodeId, parent: NodeId },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

impl CoreError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidArgument(msg.into())
    }

    pub(crate) fn unknown(permission: &str, operation: &str) -> Self {
        CoreError::UnknownPermission {
            permission: permission.to_string(),
            operation: operation.to_string(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
