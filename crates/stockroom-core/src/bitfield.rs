//! Bit-packed tri-state permission storage.
//!
//! Every permission category is backed by one `u32`. Each operation of the
//! category owns a two-bit slot starting at an even [`BitOffset`]:
//!
//! | bits | meaning                                   |
//! |------|-------------------------------------------|
//! | `00` | DISALLOW                                  |
//! | `01` | ALLOW                                     |
//! | `10` | INHERIT                                   |
//! | `11` | reserved, read as INHERIT, kept verbatim  |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::schema::PermissionSchema;
use crate::types::BitOffset;

/// Raw value of a category whose slots all hold INHERIT.
pub const ALL_INHERIT: u32 = 0xAAAA_AAAA;

const SLOT_MASK: u32 = 0b11;

/// Decoded content of a two-bit slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BitValue {
    Disallow = 0b00,
    Allow = 0b01,
    Inherit = 0b10,
    Reserved = 0b11,
}

impl BitValue {
    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub const fn from_bits(bits: u32) -> Self {
        match bits & SLOT_MASK {
            0b00 => BitValue::Disallow,
            0b01 => BitValue::Allow,
            0b10 => BitValue::Inherit,
            _ => BitValue::Reserved,
        }
    }

    /// Tri-state view: `Some(true)` allow, `Some(false)` disallow, `None` inherit.
    pub const fn as_permission(self) -> Option<bool> {
        match self {
            BitValue::Allow => Some(true),
            BitValue::Disallow => Some(false),
            BitValue::Inherit | BitValue::Reserved => None,
        }
    }

    pub const fn from_permission(value: Option<bool>) -> Self {
        match value {
            Some(true) => BitValue::Allow,
            Some(false) => BitValue::Disallow,
            None => BitValue::Inherit,
        }
    }
}

/// Permission values of one principal (user or group).
///
/// Holds one raw integer per known category. Category names that were not
/// registered when the set was created are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    raw: BTreeMap<String, u32>,
}

impl PermissionSet {
    /// Create a set with every slot of every schema category on INHERIT.
    pub fn for_schema(schema: &PermissionSchema) -> Self {
        Self::with_categories(schema.categories().iter().map(|c| c.name()))
    }

    /// Create a set for an explicit list of categories, all INHERIT.
    pub fn with_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            raw: categories
                .into_iter()
                .map(|name| (name.into(), ALL_INHERIT))
                .collect(),
        }
    }

    /// Known category names, sorted.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.raw.keys().map(String::as_str)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.raw.contains_key(category)
    }

    /// Read the two bits at `offset`. `0b11` comes back as [`BitValue::Reserved`].
    pub fn bit_value(&self, category: &str, offset: i64) -> Result<BitValue> {
        let offset = BitOffset::new(offset)?;
        let raw = self.raw_value(category)?;
        Ok(BitValue::from_bits(raw >> offset.get()))
    }

    /// Tri-state read. Reserved slots read as `None`.
    pub fn permission_value(&self, category: &str, offset: i64) -> Result<Option<bool>> {
        Ok(self.bit_value(category, offset)?.as_permission())
    }

    /// Overwrite the two bits at `offset`, leaving every other slot intact.
    ///
    /// This is the raw accessor, so [`BitValue::Reserved`] is accepted here.
    pub fn set_bit_value(&mut self, category: &str, offset: i64, value: BitValue) -> Result<&mut Self> {
        let offset = BitOffset::new(offset)?;
        let slot = self.slot_mut(category)?;
        let mask = SLOT_MASK << offset.get();
        *slot = (*slot & !mask) | (value.bits() << offset.get());
        Ok(self)
    }

    pub fn set_permission_value(
        &mut self,
        category: &str,
        offset: i64,
        value: Option<bool>,
    ) -> Result<&mut Self> {
        self.set_bit_value(category, offset, BitValue::from_permission(value))
    }

    pub fn raw_value(&self, category: &str) -> Result<u32> {
        self.raw
            .get(category)
            .copied()
            .ok_or_else(|| unknown_category(category))
    }

    /// Replace a whole category. Individual pairs are not validated.
    pub fn set_raw_value(&mut self, category: &str, raw: u32) -> Result<&mut Self> {
        *self.slot_mut(category)? = raw;
        Ok(self)
    }

    /// Bulk version of [`set_raw_value`](Self::set_raw_value), applied in order.
    ///
    /// Stops at the first unknown category; entries before it stay applied.
    pub fn set_raw_values<I, S>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        for (category, raw) in values {
            self.set_raw_value(category.as_ref(), raw)?;
        }
        Ok(self)
    }

    /// Bulk load from parallel name/value lists.
    pub fn set_raw_values_parallel<S: AsRef<str>>(
        &mut self,
        categories: &[S],
        values: &[u32],
    ) -> Result<&mut Self> {
        if categories.len() != values.len() {
            return Err(CoreError::invalid(format!(
                "{} category names but {} values",
                categories.len(),
                values.len()
            )));
        }
        self.set_raw_values(categories.iter().zip(values.iter().copied()))
    }

    /// All raw values, for persistence.
    pub fn raw_values(&self) -> impl Iterator<Item = (&str, u32)> {
        self.raw.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Schema-checked tri-state read of `permission.operation`.
    pub fn operation(
        &self,
        schema: &PermissionSchema,
        permission: &str,
        operation: &str,
    ) -> Result<Option<bool>> {
        let offset = schema.resolve(permission, operation)?;
        self.permission_value(permission, offset.into())
    }

    /// Schema-checked tri-state write of `permission.operation`.
    pub fn set_operation(
        &mut self,
        schema: &PermissionSchema,
        permission: &str,
        operation: &str,
        value: Option<bool>,
    ) -> Result<&mut Self> {
        let offset = schema.resolve(permission, operation)?;
        self.set_permission_value(permission, offset.into(), value)
    }

    /// Add categories the schema knows but this set lacks (all INHERIT).
    ///
    /// Used after loading a set persisted under an older schema.
    pub fn extend_from_schema(&mut self, schema: &PermissionSchema) {
        for category in schema.categories() {
            self.raw
                .entry(category.name().to_string())
                .or_insert(ALL_INHERIT);
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    fn slot_mut(&mut self, category: &str) -> Result<&mut u32> {
        self.raw
            .get_mut(category)
            .ok_or_else(|| unknown_category(category))
    }
}

fn unknown_category(category: &str) -> CoreError {
    CoreError::InvalidArgument(format!("unknown permission category: {category}"))
}
