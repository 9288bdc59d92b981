//! Line item model shared by every billing context.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A priced line ready for computation. Built per call, never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub tax_rate_percent: Decimal,
}

impl LineItem {
    pub fn new(
        unit_price: Decimal,
        quantity: u32,
        discount_percent: Decimal,
        tax_rate_percent: Decimal,
    ) -> Self {
        Self {
            unit_price,
            quantity,
            discount_percent,
            tax_rate_percent,
        }
    }

    /// Untaxed, undiscounted line such as a bed-day or an ad-hoc charge.
    pub fn flat(unit_price: Decimal, quantity: u32) -> Self {
        Self::new(unit_price, quantity, Decimal::ZERO, Decimal::ZERO)
    }
}

/// Full-precision result of pricing one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePrice {
    pub line_subtotal: Decimal,
    pub line_discount: Decimal,
    pub line_taxable: Decimal,
    pub line_tax: Decimal,
    pub line_total: Decimal,
}

impl LinePrice {
    pub fn zero() -> Self {
        Self {
            line_subtotal: Decimal::ZERO,
            line_discount: Decimal::ZERO,
            line_taxable: Decimal::ZERO,
            line_tax: Decimal::ZERO,
            line_total: Decimal::ZERO,
        }
    }
}
