//! Strong type definitions for Stockroom.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Identity of a structural element (footprint, category, group, ...).
///
/// Opaque ordinal, unique across all kinds held by one hierarchy.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Identity of a user account.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl UserId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a two-bit operation slot inside a category integer.
///
/// Always even and at most [`BitOffset::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct BitOffset(u8);

impl BitOffset {
    /// Width of the backing integer.
    pub const WIDTH: u32 = u32::BITS;

    /// Highest usable offset (the last pair starts at bit 30).
    pub const MAX: u8 = (Self::WIDTH - 2) as u8;

    /// Validate a raw offset.
    pub fn new(raw: i64) -> Result<Self> {
        if raw < 0 {
            return Err(CoreError::invalid(format!("bit offset {raw} is negative")));
        }
        if raw % 2 != 0 {
            return Err(CoreError::invalid(format!("bit offset {raw} is odd")));
        }
        if raw > i64::from(Self::MAX) {
            return Err(CoreError::invalid(format!(
                "bit offset {raw} exceeds the {}-bit backing integer",
                Self::WIDTH
            )));
        }
        Ok(Self(raw as u8))
    }

    /// Offset of the n-th operation slot.
    pub fn from_position(position: usize) -> Result<Self> {
        let raw = i64::try_from(position)
            .ok()
            .and_then(|p| p.checked_mul(2))
            .ok_or_else(|| CoreError::invalid(format!("operation position {position} overflows")))?;
        Self::new(raw)
    }

    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Slot index (offset / 2).
    pub const fn position(&self) -> usize {
        (self.0 / 2) as usize
    }
}

impl TryFrom<i64> for BitOffset {
    type Error = CoreError;

    fn try_from(raw: i64) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<BitOffset> for i64 {
    fn from(offset: BitOffset) -> Self {
        i64::from(offset.0)
    }
}

impl fmt::Display for BitOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminator for structural element types.
///
/// Ancestry is only defined between nodes of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    AttachmentType,
    Category,
    Device,
    Footprint,
    Manufacturer,
    MeasurementUnit,
    Storelocation,
    Supplier,
    Currency,
    Group,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::AttachmentType,
        EntityKind::Category,
        EntityKind::Device,
        EntityKind::Footprint,
        EntityKind::Manufacturer,
        EntityKind::MeasurementUnit,
        EntityKind::Storelocation,
        EntityKind::Supplier,
        EntityKind::Currency,
        EntityKind::Group,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::AttachmentType => "attachment_type",
            EntityKind::Category => "category",
            EntityKind::Device => "device",
            EntityKind::Footprint => "footprint",
            EntityKind::Manufacturer => "manufacturer",
            EntityKind::MeasurementUnit => "measurement_unit",
            EntityKind::Storelocation => "storelocation",
            EntityKind::Supplier => "supplier",
            EntityKind::Currency => "currency",
            EntityKind::Group => "group",
        }
    }

    /// Permission category guarding this kind.
    pub const fn permission(&self) -> &'static str {
        match self {
            EntityKind::AttachmentType => "attachment_types",
            EntityKind::Category => "categories",
            EntityKind::Device => "devices",
            EntityKind::Footprint => "footprints",
            EntityKind::Manufacturer => "manufacturers",
            EntityKind::MeasurementUnit => "measurement_units",
            EntityKind::Storelocation => "storelocations",
            EntityKind::Supplier => "suppliers",
            EntityKind::Currency => "currencies",
            EntityKind::Group => "groups",
        }
    }

    /// Human readable id, e.g. `G000014` for group 14 or `MU3` for unit 3.
    pub fn id_string(&self, id: NodeId) -> String {
        match self {
            EntityKind::AttachmentType => format!("AT{:04}", id.0),
            EntityKind::Category => format!("C{:05}", id.0),
            EntityKind::Device => format!("D{:05}", id.0),
            EntityKind::Footprint => format!("F{:06}", id.0),
            EntityKind::Manufacturer => format!("M{:06}", id.0),
            EntityKind::MeasurementUnit => format!("MU{}", id.0),
            EntityKind::Storelocation => format!("L{:06}", id.0),
            EntityKind::Supplier => format!("S{:06}", id.0),
            EntityKind::Currency => format!("CUR{}", id.0),
            EntityKind::Group => format!("G{:06}", id.0),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::invalid(format!("unknown entity kind: {s}")))
    }
}
