//! Prices.

use serde::{Deserialize, Serialize};

use crate::amount::MAX_DECIMALS;
use crate::error::{FormatError, Result};
use crate::si::decimal;

/// Prices always show at least this many decimals.
const MIN_DECIMALS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code, e.g. `EUR`.
    pub iso_code: String,
    #[serde(default)]
    pub name: String,
}

impl Currency {
    pub fn new(iso_code: impl Into<String>) -> Self {
        Self {
            iso_code: iso_code.into(),
            name: String::new(),
        }
    }
}

/// Formats prices as `1.50 EUR`.
#[derive(Debug, Clone)]
pub struct MoneyFormatter {
    base_currency: String,
}

impl MoneyFormatter {
    /// `base_currency` is used for prices without a currency.
    pub fn new(base_currency: impl Into<String>) -> Self {
        Self {
            base_currency: base_currency.into(),
        }
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Rounds to `decimals` and trims trailing zeroes, keeping at least two.
    pub fn format(&self, amount: f64, currency: Option<&Currency>, decimals: usize) -> Result<String> {
        if decimals > MAX_DECIMALS {
            return Err(FormatError::InvalidOption(format!(
                "decimals must be at most {}, got {}",
                MAX_DECIMALS, decimals
            )));
        }
        if !amount.is_finite() {
            return Err(FormatError::InvalidOption(format!(
                "price must be finite, got {}",
                amount
            )));
        }
        let iso = currency.map_or(self.base_currency.as_str(), |c| c.iso_code.as_str());
        let number = decimal(amount, decimals.max(MIN_DECIMALS), MIN_DECIMALS);
        Ok(format!("{} {}", number, iso))
    }
}

impl Default for MoneyFormatter {
    fn default() -> Self {
        Self::new("EUR")
    }
}
