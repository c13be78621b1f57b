//! The permission catalog.
//!
//! A schema lists the permission categories (one per backing integer) and,
//! per category, its operations in order. The n-th operation owns the slot at
//! bit offset `2 * n`. The catalog is loaded once at startup and never
//! changes afterwards.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::BitOffset;

/// Name of the pseudo group holding categories without an explicit group.
pub const OTHER_GROUP: &str = "*";

const BUILTIN: &str = include_str!("../config/permissions.json");

/// Serialized form of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionConfig {
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    pub perms: Vec<CategoryConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub operations: Vec<OperationConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Display group of categories in the permission editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGroup {
    name: String,
    label: Option<String>,
}

impl PermissionGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label, falling back to the name.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// A single operation slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    name: String,
    label: Option<String>,
    offset: BitOffset,
}

impl Operation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn offset(&self) -> BitOffset {
        self.offset
    }
}

/// A permission category (one backing integer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    label: Option<String>,
    group: Option<String>,
    operations: Vec<Operation>,
}

impl Category {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }
}

/// Immutable permission catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSchema {
    groups: Vec<PermissionGroup>,
    categories: Vec<Category>,
    index: HashMap<String, usize>,
}

impl PermissionSchema {
    /// Build the catalog, assigning offsets by position.
    pub fn load(config: &PermissionConfig) -> Result<Self> {
        let mut group_names = HashSet::new();
        let mut groups = Vec::with_capacity(config.groups.len());
        for group in &config.groups {
            if group.name == OTHER_GROUP || !group_names.insert(group.name.as_str()) {
                return Err(CoreError::invalid(format!(
                    "duplicate or reserved permission group: {}",
                    group.name
                )));
            }
            groups.push(PermissionGroup {
                name: group.name.clone(),
                label: group.label.clone(),
            });
        }

        let mut index = HashMap::with_capacity(config.perms.len());
        let mut categories = Vec::with_capacity(config.perms.len());

        for (position, perm) in config.perms.iter().enumerate() {
            if index.insert(perm.name.clone(), position).is_some() {
                return Err(CoreError::invalid(format!(
                    "duplicate permission category: {}",
                    perm.name
                )));
            }

            if let Some(group) = &perm.group {
                if !group_names.contains(group.as_str()) {
                    return Err(CoreError::invalid(format!(
                        "permission {} references undeclared group {}",
                        perm.name, group
                    )));
                }
            }

            let mut seen = HashSet::new();
            let mut operations = Vec::with_capacity(perm.operations.len());
            for (slot, op) in perm.operations.iter().enumerate() {
                if !seen.insert(op.name.as_str()) {
                    return Err(CoreError::invalid(format!(
                        "duplicate operation {} in permission {}",
                        op.name, perm.name
                    )));
                }
                let offset = BitOffset::from_position(slot).map_err(|_| {
                    CoreError::invalid(format!(
                        "permission {} has more than {} operations",
                        perm.name,
                        BitOffset::WIDTH / 2
                    ))
                })?;
                operations.push(Operation {
                    name: op.name.clone(),
                    label: op.label.clone(),
                    offset,
                });
            }

            categories.push(Category {
                name: perm.name.clone(),
                label: perm.label.clone(),
                group: perm.group.clone(),
                operations,
            });
        }

        Ok(Self {
            groups,
            categories,
            index,
        })
    }

    /// Parse a JSON catalog.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PermissionConfig =
            serde_json::from_str(json).map_err(|e| CoreError::Config(e.to_string()))?;
        Self::load(&config)
    }

    /// Read a JSON catalog from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN)
    }

    /// Offset of `permission.operation`.
    pub fn resolve(&self, permission: &str, operation: &str) -> Result<BitOffset> {
        self.category(permission)
            .and_then(|c| c.operation(operation))
            .map(Operation::offset)
            .ok_or_else(|| CoreError::unknown(permission, operation))
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.index.get(name).map(|&i| &self.categories[i])
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn groups(&self) -> &[PermissionGroup] {
        &self.groups
    }

    /// Operations of a category, in slot order.
    pub fn operations(&self, permission: &str) -> Result<&[Operation]> {
        self.category(permission)
            .map(Category::operations)
            .ok_or_else(|| CoreError::invalid(format!("unknown permission category: {permission}")))
    }

    /// Categories displayed under `group`. [`OTHER_GROUP`] selects the ungrouped ones.
    pub fn permissions_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Category> + 'a {
        self.categories.iter().filter(move |c| match c.group() {
            Some(g) => g == group,
            None => group == OTHER_GROUP,
        })
    }

    /// Label of a category, or its name when none is configured.
    pub fn label_for<'a>(&'a self, permission: &'a str) -> &'a str {
        self.category(permission).map(Category::label).unwrap_or(permission)
    }

    /// Label of a group; [`OTHER_GROUP`] maps to `perm.group.other`.
    pub fn group_label<'a>(&'a self, group: &'a str) -> &'a str {
        if group == OTHER_GROUP {
            return "perm.group.other";
        }
        self.groups
            .iter()
            .find(|g| g.name == group)
            .map(PermissionGroup::label)
            .unwrap_or(group)
    }
}
