//! # Stockroom Format
//!
//! Display helpers used by page templates.
//!
//! - [`SiFormatter`] - `1500 g` as `1.5 kg`
//! - [`AmountFormatter`] - part amounts in their [`MeasurementUnit`]
//! - [`MoneyFormatter`] - prices in a [`Currency`] or the base currency
//! - [`UrlGenerator`] - entity page URLs, plus [`login_path`] and [`asset_path`]
//! - [`BbCodeConverter`] - BBCode descriptions to Markdown
//! - [`TagFinder`] - tag autocompletion
//!
//! ```rust
//! use stockroom_format::{MeasurementUnit, AmountFormatter, AmountOptions};
//!
//! let grams = MeasurementUnit::new("Mass", Some("g")).si_prefixed();
//! let text = AmountFormatter::new()
//!     .format(1500.0, Some(&grams), &AmountOptions::default())
//!     .unwrap();
//! assert_eq!(text, "1.5 kg");
//! ```

pub mod amount;
pub mod bbcode;
pub mod error;
pub mod money;
pub mod si;
pub mod tags;
pub mod url;

pub use amount::{AmountFormatter, AmountOptions, MeasurementUnit};
pub use bbcode::BbCodeConverter;
pub use error::{FormatError, Result};
pub use money::{Currency, MoneyFormatter};
pub use si::SiFormatter;
pub use tags::{TagFinder, TagSearchOptions};
pub use url::{asset_path, login_path, UrlGenerator, UrlMethod, UrlTarget};
