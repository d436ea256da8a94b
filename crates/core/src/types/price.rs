//! Type-safe price representation using decimal arithmetic.
//!
//! The backend stores money as `numeric` columns, which arrive as JSON
//! numbers; [`rust_decimal::Decimal`] preserves their precision where `f64`
//! would not.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount in the store's single display currency.
///
/// Rows never carry a currency code, so the currency is implicit; this
/// wrapper exists for arithmetic and formatting, not multi-currency
/// support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The zero price.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a quantity (line total).
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.0)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl std::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|p| p.0).sum())
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_times_and_sum() {
        let lines = [Price::new(dec!(10)).times(2), Price::new(dec!(5)).times(1)];
        let total: Price = lines.into_iter().sum();
        assert_eq!(total.amount(), dec!(25));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::new(dec!(19.99)).display(), "$19.99");
        assert_eq!(Price::zero().display(), "$0.00");
    }

    #[test]
    fn test_deserialize_from_json_number() {
        // PostgREST serializes numeric columns as JSON numbers.
        let price: Price = serde_json::from_str("12.5").unwrap();
        assert_eq!(price.amount(), dec!(12.5));
    }
}
