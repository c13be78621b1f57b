//! Display texts of menu entries, keyed by translation key.

use std::collections::HashMap;

use crate::error::{MenuError, Result};

const DEFAULTS: &[(&str, &str)] = &[
    ("tree.tools.edit", "Edit"),
    ("tree.tools.show", "Show"),
    ("tree.tools.system", "System"),
    ("tree.tools.edit.attachment_types", "Attachment types"),
    ("tree.tools.edit.categories", "Categories"),
    ("tree.tools.edit.devices", "Devices"),
    ("tree.tools.edit.suppliers", "Suppliers"),
    ("tree.tools.edit.manufacturer", "Manufacturers"),
    ("tree.tools.edit.storelocation", "Storelocations"),
    ("tree.tools.edit.footprint", "Footprints"),
    ("tree.tools.edit.currency", "Currencies"),
    ("tree.tools.edit.measurement_unit", "Measurement units"),
    ("tree.tools.edit.part", "New part"),
    ("tree.tools.show.all_parts", "All parts"),
    ("tree.tools.show.all_attachments", "Attachments"),
    ("tree.tools.system.users", "Users"),
    ("tree.tools.system.groups", "Groups"),
    ("entity.tree.new", "New element"),
];

/// Label lookup with English defaults. Unknown keys render as the key itself.
#[derive(Debug, Clone)]
pub struct Labels {
    texts: HashMap<String, String>,
}

impl Labels {
    /// The built-in English labels.
    pub fn english() -> Self {
        Self {
            texts: DEFAULTS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// English labels overridden by a flat JSON object of key to text.
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: HashMap<String, String> =
            serde_json::from_str(json).map_err(|e| MenuError::Labels(e.to_string()))?;
        let mut labels = Self::english();
        labels.texts.extend(overrides);
        Ok(labels)
    }

    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(key.into(), text.into());
        self
    }

    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.texts.get(key).map(String::as_str).unwrap_or(key)
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::english()
    }
}
