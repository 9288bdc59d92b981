//! Currency and rounding helpers.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BillingError;

/// ISO 4217 currency code. Determines the scale every aggregate is rounded to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, BillingError> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(BillingError::invalid_input(format!(
                "'{}' is not a three-letter currency code",
                code
            )));
        }
        Ok(Self(code))
    }

    pub fn inr() -> Self {
        Self("INR".to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of decimal places in the currency's minor unit.
    pub fn minor_units(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "UGX" => 0,
            "BHD" | "KWD" | "OMR" | "JOD" | "TND" | "IQD" | "LYD" => 3,
            _ => 2,
        }
    }

    /// Round half away from zero to the minor unit, keeping trailing zeros
    /// so `170` renders as `170.00`.
    pub fn round(&self, amount: Decimal) -> Decimal {
        round_to_scale(amount, self.minor_units())
    }

    pub fn zero(&self) -> Decimal {
        self.round(Decimal::ZERO)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::inr()
    }
}

impl TryFrom<String> for Currency {
    type Error = BillingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn round_to_scale(amount: Decimal, scale: u32) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}
