//! # Stockroom Testkit
//!
//! Testing utilities for Stockroom.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a small organisation of groups and users, and a set of
//!   structural elements, ready to seed any [`Store`](stockroom_store::Store)
//! - **Generators**: Proptest strategies for bit values, offsets, permission
//!   sets and hierarchies
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use stockroom_core::BitValue;
//! use stockroom_testkit::generators::{bit_offset, bit_value};
//!
//! proptest! {
//!     #[test]
//!     fn write_then_read(offset in bit_offset(), value in bit_value()) {
//!         let mut set = PermissionSet::with_categories(["parts"]);
//!         set.set_bit_value("parts", offset, value).unwrap();
//!         prop_assert_eq!(set.bit_value("parts", offset).unwrap(), value);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use stockroom_testkit::fixtures::PermissionFixture;
//!
//! let f = PermissionFixture::new();
//! assert!(f.resolver.is_granted(&f.alice, &f.groups, "parts", "create").unwrap());
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{ElementFixture, PermissionFixture};
