//! Money amounts in whole cents.
//!
//! Amounts arrive as JSON numbers in currency units. They are converted to
//! cents once, all arithmetic happens on integers, and results go back out
//! as JSON integers when they are whole units.

use super::errors::MoneyError;
use serde::Serialize;
use serde_json::{Number, Value};

/// Largest accepted amount, in currency units.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

/// Bail bond fee, as a percentage of the bail amount.
pub const FEE_PERCENT: i64 = 10;

/// Share of the fee that is the base fee; the rest is the service fee.
pub const BASE_FEE_PERCENT: i64 = 80;

/// A non-negative amount in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Cents(i64);

impl Cents {
    /// Convert an amount in currency units, rounding to the nearest cent.
    pub fn from_units(amount: f64) -> Result<Self, MoneyError> {
        if !amount.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        if amount < 0.0 {
            return Err(MoneyError::Negative(amount));
        }
        if amount > MAX_AMOUNT {
            return Err(MoneyError::TooLarge(amount));
        }
        // Bounded by MAX_AMOUNT, so the product fits in an i64.
        Ok(Self((amount * 100.0).round() as i64))
    }

    /// Convert a JSON value. Only numbers are accepted.
    pub fn from_json(value: &Value) -> Result<Self, MoneyError> {
        match value.as_f64() {
            Some(amount) => Self::from_units(amount),
            None => Err(MoneyError::NotANumber(value.to_string())),
        }
    }

    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(cents.max(0))
    }

    #[must_use]
    pub fn as_cents(&self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `percent` % of this amount, rounded half up to the cent.
    #[must_use]
    pub fn percent(&self, percent: i64) -> Self {
        Self((self.0 * percent + 50) / 100)
    }

    #[must_use]
    pub fn saturating_add(&self, other: Cents) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    #[must_use]
    pub fn saturating_sub(&self, other: Cents) -> Self {
        Self(self.0.saturating_sub(other.0).max(0))
    }

    /// JSON number in currency units; an integer when the amount is whole.
    #[must_use]
    pub fn to_json(&self) -> Value {
        if self.0 % 100 == 0 {
            Value::Number(Number::from(self.0 / 100))
        } else {
            Number::from_f64(self.0 as f64 / 100.0).map_or(Value::Null, Value::Number)
        }
    }
}

impl Serialize for Cents {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Fee split of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub base_fee: Cents,
    pub service_fee: Cents,
}

/// Result of a fee calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    pub bail_amount: Cents,
    pub fee_percent: i64,
    pub fee: Cents,
    pub total: Cents,
    pub breakdown: FeeBreakdown,
}

impl FeeQuote {
    /// Quote the standard fee on `bail_amount`.
    #[must_use]
    pub fn for_bail(bail_amount: Cents) -> Self {
        let fee = bail_amount.percent(FEE_PERCENT);
        let base_fee = fee.percent(BASE_FEE_PERCENT);
        Self {
            bail_amount,
            fee_percent: FEE_PERCENT,
            fee,
            total: bail_amount.saturating_add(fee),
            breakdown: FeeBreakdown {
                base_fee,
                service_fee: fee.saturating_sub(base_fee),
            },
        }
    }
}
