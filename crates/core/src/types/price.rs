//! Listing prices.
//!
//! Amounts are kept as [`Decimal`] so that sums and comparisons never go
//! through floating point. Listings are priced in Moroccan dirhams unless
//! stated otherwise.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (dirhams, not centimes).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in the marketplace's default currency.
    #[must_use]
    pub fn mad(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::default())
    }

    /// Format for display, e.g. `1,250,000 MAD` or `99.50 MAD`.
    ///
    /// The fractional part is only shown when it is non-zero.
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{} {}",
            group_thousands(self.amount),
            self.currency_code.code()
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes accepted for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    MAD,
    EUR,
    USD,
}

impl CurrencyCode {
    /// The three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MAD => "MAD",
            Self::EUR => "EUR",
            Self::USD => "USD",
        }
    }
}

/// Render an amount with `,` between groups of three integer digits.
#[must_use]
pub fn group_thousands(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let abs = rounded.abs();

    let integer = abs.trunc();
    let fraction = abs - integer;

    let digits = integer.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if !fraction.is_zero() {
        // "0.5" -> ".50"
        let cents = (fraction * Decimal::ONE_HUNDRED).round();
        grouped.push_str(&format!(".{cents:0>2}"));
    }

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_group_thousands_small() {
        assert_eq!(group_thousands(dec("0")), "0");
        assert_eq!(group_thousands(dec("50")), "50");
        assert_eq!(group_thousands(dec("999")), "999");
    }

    #[test]
    fn test_group_thousands_large() {
        assert_eq!(group_thousands(dec("1000")), "1,000");
        assert_eq!(group_thousands(dec("1250000")), "1,250,000");
        assert_eq!(group_thousands(dec("400000000")), "400,000,000");
    }

    #[test]
    fn test_group_thousands_fraction() {
        assert_eq!(group_thousands(dec("99.5")), "99.50");
        assert_eq!(group_thousands(dec("1234.05")), "1,234.05");
        assert_eq!(group_thousands(dec("1200.00")), "1,200");
    }

    #[test]
    fn test_group_thousands_negative() {
        assert_eq!(group_thousands(dec("-1500")), "-1,500");
    }

    #[test]
    fn test_price_display() {
        let price = Price::mad(dec("8500"));
        assert_eq!(price.display(), "8,500 MAD");
        assert_eq!(price.to_string(), "8,500 MAD");
    }
}
