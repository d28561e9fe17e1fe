//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are kept in the currency's standard unit (dollars, rand) as a
//! [`Decimal`]. Payment providers want minor units (cents), so conversion
//! happens at the edge via [`Price::to_minor_units`].

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
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

    /// Round the amount to two decimal places (half away from zero).
    #[must_use]
    pub fn round_to_cents(self) -> Self {
        Self {
            amount: round_to_cents(self.amount),
            currency_code: self.currency_code,
        }
    }

    /// Convert to the currency's minor unit (e.g., cents).
    ///
    /// Returns `None` for negative amounts or amounts that overflow `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return None;
        }
        let cents = round_to_cents(self.amount).checked_mul(Decimal::ONE_HUNDRED)?;
        i64::try_from(cents.trunc()).ok()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            round_to_cents(self.amount)
        )
    }
}

/// Round a decimal amount to two places, half away from zero.
#[must_use]
pub fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    ZAR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::ZAR => "R",
        }
    }

    /// Lower-case ISO code, as Stripe expects it.
    #[must_use]
    pub const fn as_lower_str(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::ZAR => "zar",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "ZAR" => Ok(Self::ZAR),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn usd(s: &str) -> Price {
        Price::new(Decimal::from_str(s).unwrap(), CurrencyCode::USD)
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(usd("19.99").to_minor_units(), Some(1999));
        assert_eq!(usd("0").to_minor_units(), Some(0));
        assert_eq!(usd("10").to_minor_units(), Some(1000));
    }

    #[test]
    fn test_to_minor_units_rounds_half_away_from_zero() {
        assert_eq!(usd("0.005").to_minor_units(), Some(1));
        assert_eq!(usd("1.234").to_minor_units(), Some(123));
    }

    #[test]
    fn test_to_minor_units_rejects_negative() {
        assert_eq!(usd("-1.00").to_minor_units(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(usd("5.5").to_string(), "$5.50");
        let rand = Price::new(Decimal::from_str("100").unwrap(), CurrencyCode::ZAR);
        assert_eq!(rand.to_string(), "R100.00");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(CurrencyCode::from_str("usd").unwrap(), CurrencyCode::USD);
        assert_eq!(CurrencyCode::from_str("ZAR").unwrap(), CurrencyCode::ZAR);
        assert!(CurrencyCode::from_str("btc").is_err());
    }
}
