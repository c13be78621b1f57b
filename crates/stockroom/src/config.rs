//! Inventory configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stockroom_core::{DeletePolicy, PermissionSchema};

use crate::error::{InventoryError, Result};

/// Where the permission catalog comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    /// The catalog shipped with the crate.
    #[default]
    Builtin,
    /// A JSON catalog on disk.
    File(PathBuf),
}

impl SchemaSource {
    pub fn load(&self) -> Result<PermissionSchema> {
        let schema = match self {
            SchemaSource::Builtin => PermissionSchema::builtin()?,
            SchemaSource::File(path) => PermissionSchema::from_file(path)?,
        };
        Ok(schema)
    }
}

/// Configuration for the Inventory.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "delete_policy": "cascade", "locale_prefix": "de" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Permission catalog, loaded once at open.
    pub permissions: SchemaSource,
    /// Applied by `delete_element` and `delete_group`.
    pub delete_policy: DeletePolicy,
    /// Upper bound on cached menu trees.
    pub menu_cache_capacity: usize,
    /// ISO code used when a price has no currency.
    pub base_currency: String,
    /// First path segment of generated URLs.
    pub locale_prefix: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            permissions: SchemaSource::Builtin,
            delete_policy: DeletePolicy::ReassignToParent,
            menu_cache_capacity: 256,
            base_currency: "EUR".to_string(),
            locale_prefix: "en".to_string(),
        }
    }
}

impl InventoryConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| InventoryError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| InventoryError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}
