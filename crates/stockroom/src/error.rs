//! Error types for the Inventory.

use stockroom_core::{CoreError, UserId};
use stockroom_format::FormatError;
use stockroom_menu::MenuError;
use stockroom_perms::PermsError;
use stockroom_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Permission store, schema or hierarchy error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Permission error.
    #[error("permission error: {0}")]
    Permission(#[from] PermsError),

    #[error("menu error: {0}")]
    Menu(#[from] MenuError),

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// Login names are unique.
    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Snapshot could not be encoded, decoded or applied.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Invalid operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for Inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
