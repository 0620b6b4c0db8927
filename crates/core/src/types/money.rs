//! Monetary amounts in minor currency units.
//!
//! The commerce platform expresses every price as a cent amount plus an
//! ISO 4217 currency code, and its search filter grammar expects minor
//! units as well. Keeping the integer representation end to end avoids
//! floating-point drift; [`rust_decimal`] is used only at the display edge.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes supported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EUR,
    USD,
    GBP,
}

impl CurrencyCode {
    /// The currency symbol used for display.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::EUR => "\u{20ac}",
            Self::USD => "$",
            Self::GBP => "\u{a3}",
        }
    }

    /// The ISO 4217 code as a string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EUR => "EUR",
            Self::USD => "USD",
            Self::GBP => "GBP",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A monetary amount in minor units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Amount in the smallest currency unit (e.g., cents for EUR).
    pub cent_amount: i64,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a money value from a minor-unit amount.
    #[must_use]
    pub const fn from_cents(cent_amount: i64, currency_code: CurrencyCode) -> Self {
        Self {
            cent_amount,
            currency_code,
        }
    }

    /// Create a money value from a whole major-unit amount (e.g., euros).
    /// Saturates at the `i64` bounds.
    #[must_use]
    pub const fn from_major(major: i64, currency_code: CurrencyCode) -> Self {
        Self {
            cent_amount: major.saturating_mul(100),
            currency_code,
        }
    }

    /// The amount as a decimal in major units.
    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        Decimal::new(self.cent_amount, 2)
    }

    /// Format for display (e.g., `€19.99`).
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.as_decimal())
    }

    /// Checked addition; fails on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        if self.currency_code != other.currency_code {
            return None;
        }
        Some(Self {
            cent_amount: self.cent_amount.checked_add(other.cent_amount)?,
            currency_code: self.currency_code,
        })
    }

    /// Multiply by a quantity (line totals).
    #[must_use]
    pub fn checked_mul(self, quantity: i64) -> Option<Self> {
        Some(Self {
            cent_amount: self.cent_amount.checked_mul(quantity)?,
            currency_code: self.currency_code,
        })
    }
}

/// Convert a major-unit bound (as entered in a filter form) to minor units.
///
/// The platform's price filter field is a cent amount, while the UI intent
/// carries whole major units. Form input is untrusted, so an extreme bound
/// saturates instead of overflowing.
#[must_use]
pub const fn major_to_minor(major: i64) -> i64 {
    major.saturating_mul(100)
}
