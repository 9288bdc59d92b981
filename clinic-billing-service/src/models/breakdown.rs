//! Computed totals: per-bill breakdown and the IPD/OPD billing summary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Non-fatal condition raised while computing a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BillingWarning {
    /// The flat discount was larger than the bill; the total was clamped to zero.
    DiscountExceedsTotal {
        requested: Decimal,
        applied: Decimal,
    },
}

/// Aggregated totals for a set of lines. Always recomputed, never patched.
///
/// `grand_total == sub_total - discount_total + tax_total - grants_or_discounts`
/// unless a [`BillingWarning::DiscountExceedsTotal`] clamp occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    pub sub_total: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub grants_or_discounts: Decimal,
    pub grand_total: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<BillingWarning>,
}

impl ChargeBreakdown {
    /// Amount before the bill-level flat discount.
    pub fn gross_total(&self) -> Decimal {
        self.sub_total - self.discount_total + self.tax_total
    }
}

/// Final bill of an IPD stay or an OPD visit, itemised by charge category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_stayed: Option<u32>,
    pub bed_charges: Decimal,
    pub service_charges: Decimal,
    pub treatment_charges: Decimal,
    pub medicine_charges: Decimal,
    pub other_charges: Decimal,
    pub breakdown: ChargeBreakdown,
    pub grants_or_discounts: Decimal,
    pub final_amount: Decimal,
}
