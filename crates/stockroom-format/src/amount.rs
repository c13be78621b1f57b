//! Part amounts in their measurement unit.

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};
use crate::si::{decimal, SiFormatter};

/// Upper bound for `decimals`; anything above is a typo, not a request.
pub const MAX_DECIMALS: usize = 12;

/// How the amount of a part is counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementUnit {
    pub name: String,
    /// Symbol appended to the amount, e.g. `m` or `g`.
    #[serde(default)]
    pub unit: Option<String>,
    /// Amounts are whole numbers.
    #[serde(default)]
    pub is_integer: bool,
    /// Use SI prefixes (`1.5 km` instead of `1500 m`).
    #[serde(default)]
    pub use_si_prefix: bool,
}

impl MeasurementUnit {
    pub fn new(name: impl Into<String>, unit: Option<&str>) -> Self {
        Self {
            name: name.into(),
            unit: unit.map(str::to_string),
            is_integer: false,
            use_si_prefix: false,
        }
    }

    pub fn integer(mut self) -> Self {
        self.is_integer = true;
        self
    }

    pub fn si_prefixed(mut self) -> Self {
        self.use_si_prefix = true;
        self
    }
}

/// Per-call overrides; unset fields come from the unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountOptions {
    pub unit: Option<String>,
    pub decimals: Option<usize>,
    pub show_prefix: Option<bool>,
    pub is_integer: Option<bool>,
}

/// Formats amounts. Without a unit the amount counts pieces.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmountFormatter {
    si: SiFormatter,
}

impl AmountFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(
        &self,
        value: f64,
        unit: Option<&MeasurementUnit>,
        options: &AmountOptions,
    ) -> Result<String> {
        if !value.is_finite() {
            return Err(FormatError::InvalidOption(format!(
                "amount must be finite, got {}",
                value
            )));
        }

        let is_integer = options
            .is_integer
            .unwrap_or_else(|| unit.map_or(true, |u| u.is_integer));
        let show_prefix = options
            .show_prefix
            .unwrap_or_else(|| unit.map_or(false, |u| u.use_si_prefix));
        let symbol = options
            .unit
            .clone()
            .or_else(|| unit.and_then(|u| u.unit.clone()))
            .unwrap_or_default();
        let decimals = match options.decimals {
            Some(d) if d > MAX_DECIMALS => {
                return Err(FormatError::InvalidOption(format!(
                    "decimals must be at most {}, got {}",
                    MAX_DECIMALS, d
                )))
            }
            Some(d) => d,
            None if is_integer => 0,
            None => 2,
        };

        let value = if is_integer { value.round() } else { value };

        if show_prefix {
            return self.si.format(value, &symbol, decimals, false);
        }

        let number = decimal(value, decimals, decimals);
        Ok(if symbol.is_empty() {
            number
        } else {
            format!("{} {}", number, symbol)
        })
    }
}
