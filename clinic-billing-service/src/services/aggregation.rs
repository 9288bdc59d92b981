//! Aggregation of priced lines into a [`ChargeBreakdown`].
//!
//! Sums are kept at full precision and rounded once per aggregate to the
//! currency's minor unit. The GST split is derived from the rounded tax
//! total, never summed per line.

use rust_decimal::Decimal;

use super::pricing::LineItemPricer;
use crate::error::BillingError;
use crate::models::{BillingWarning, ChargeBreakdown, Currency, LineItem};

#[derive(Debug, Clone, Copy, Default)]
pub struct ChargeAggregator;

impl ChargeAggregator {
    /// Price every line in order and total them. Any invalid line fails the
    /// whole aggregate.
    pub fn aggregate(
        lines: &[LineItem],
        is_inter_state: bool,
        currency: &Currency,
    ) -> Result<ChargeBreakdown, BillingError> {
        let mut sub_total = Decimal::ZERO;
        let mut discount_total = Decimal::ZERO;
        let mut tax_total = Decimal::ZERO;

        for line in lines {
            let price = LineItemPricer::price(line)?;
            sub_total = add(sub_total, price.line_subtotal)?;
            discount_total = add(discount_total, price.line_discount)?;
            tax_total = add(tax_total, price.line_tax)?;
        }

        Ok(Self::finalize(
            currency.round(sub_total),
            currency.round(discount_total),
            currency.round(tax_total),
            is_inter_state,
            currency,
        ))
    }

    /// Sum per-category breakdowns field by field and re-derive the tax split
    /// over the combined tax. Flat discounts on the parts are ignored; the
    /// bill-level discount is applied afterwards with [`Self::apply_grants`].
    pub fn combine(
        parts: &[ChargeBreakdown],
        is_inter_state: bool,
        currency: &Currency,
    ) -> Result<ChargeBreakdown, BillingError> {
        let mut sub_total = currency.zero();
        let mut discount_total = currency.zero();
        let mut tax_total = currency.zero();

        for part in parts {
            sub_total = add(sub_total, part.sub_total)?;
            discount_total = add(discount_total, part.discount_total)?;
            tax_total = add(tax_total, part.tax_total)?;
        }

        Ok(Self::finalize(
            sub_total,
            discount_total,
            tax_total,
            is_inter_state,
            currency,
        ))
    }

    /// Subtract a flat currency amount after tax. The total is clamped at
    /// zero and a [`BillingWarning::DiscountExceedsTotal`] is attached.
    pub fn apply_grants(
        breakdown: ChargeBreakdown,
        grants_or_discounts: Decimal,
        currency: &Currency,
    ) -> Result<ChargeBreakdown, BillingError> {
        if grants_or_discounts < Decimal::ZERO {
            return Err(BillingError::invalid_input(format!(
                "grants or discounts cannot be negative (got {})",
                grants_or_discounts
            )));
        }

        let requested = currency.round(grants_or_discounts);
        let gross = breakdown.gross_total();
        let mut warnings = breakdown.warnings.clone();

        let grand_total = if requested > gross {
            warnings.push(BillingWarning::DiscountExceedsTotal {
                requested,
                applied: gross,
            });
            currency.zero()
        } else {
            currency.round(gross - requested)
        };

        Ok(ChargeBreakdown {
            grants_or_discounts: requested,
            grand_total,
            warnings,
            ..breakdown
        })
    }

    fn finalize(
        sub_total: Decimal,
        discount_total: Decimal,
        tax_total: Decimal,
        is_inter_state: bool,
        currency: &Currency,
    ) -> ChargeBreakdown {
        let (cgst, sgst, igst) = split_tax(tax_total, is_inter_state, currency);
        ChargeBreakdown {
            sub_total,
            discount_total,
            tax_total,
            cgst,
            sgst,
            igst,
            grants_or_discounts: currency.zero(),
            grand_total: currency.round(sub_total - discount_total + tax_total),
            warnings: Vec::new(),
        }
    }
}

/// Split a rounded tax total into (CGST, SGST, IGST).
///
/// Intra-state: CGST takes the rounded half and SGST the remainder, so the
/// two always add back to the total. Inter-state: all IGST.
pub fn split_tax(
    tax_total: Decimal,
    is_inter_state: bool,
    currency: &Currency,
) -> (Decimal, Decimal, Decimal) {
    if is_inter_state {
        (currency.zero(), currency.zero(), currency.round(tax_total))
    } else {
        let cgst = currency.round(tax_total / Decimal::TWO);
        let sgst = currency.round(tax_total - cgst);
        (cgst, sgst, currency.zero())
    }
}

fn add(a: Decimal, b: Decimal) -> Result<Decimal, BillingError> {
    a.checked_add(b)
        .ok_or_else(|| BillingError::invalid_input("bill total is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn inr() -> Currency {
        Currency::inr()
    }

    fn scenario_lines() -> Vec<LineItem> {
        vec![
            LineItem::new(dec!(50), 3, dec!(0), dec!(12)),
            LineItem::new(dec!(20), 1, dec!(5), dec!(18)),
            LineItem::new(dec!(200), 0, dec!(0), dec!(5)),
        ]
    }

    #[test]
    fn test_three_line_scenario() {
        let breakdown = ChargeAggregator::aggregate(&scenario_lines(), false, &inr()).unwrap();

        assert_eq!(breakdown.sub_total, dec!(170.00));
        assert_eq!(breakdown.discount_total, dec!(1.00));
        assert_eq!(breakdown.tax_total, dec!(21.42));
        assert_eq!(breakdown.cgst, dec!(10.71));
        assert_eq!(breakdown.sgst, dec!(10.71));
        assert_eq!(breakdown.igst, dec!(0));
        assert_eq!(breakdown.grand_total, dec!(190.42));
        assert!(breakdown.warnings.is_empty());
    }

    #[test]
    fn test_inter_state_is_all_igst() {
        let breakdown = ChargeAggregator::aggregate(&scenario_lines(), true, &inr()).unwrap();
        assert_eq!(breakdown.igst, dec!(21.42));
        assert_eq!(breakdown.cgst, dec!(0));
        assert_eq!(breakdown.sgst, dec!(0));
    }

    #[test]
    fn test_odd_paise_split_sums_exactly() {
        let (cgst, sgst, igst) = split_tax(dec!(0.05), false, &inr());
        assert_eq!(cgst, dec!(0.03));
        assert_eq!(sgst, dec!(0.02));
        assert_eq!(igst, dec!(0));
        assert_eq!(cgst + sgst, dec!(0.05));
    }

    #[test]
    fn test_rounds_once_at_aggregate() {
        // Each line carries 0.0045 tax; per-line rounding would give 0.00.
        let lines = vec![LineItem::new(dec!(0.05), 1, dec!(0), dec!(9)); 10];
        let breakdown = ChargeAggregator::aggregate(&lines, false, &inr()).unwrap();
        assert_eq!(breakdown.tax_total, dec!(0.05));
    }

    #[test]
    fn test_empty_lines_total_zero() {
        let breakdown = ChargeAggregator::aggregate(&[], false, &inr()).unwrap();
        assert_eq!(breakdown.grand_total, dec!(0));
        assert_eq!(breakdown.grand_total.to_string(), "0.00");
    }

    #[test]
    fn test_invalid_line_aborts_aggregate() {
        let mut lines = scenario_lines();
        lines.push(LineItem::new(dec!(10), 1, dec!(0), dec!(-18)));
        assert!(matches!(
            ChargeAggregator::aggregate(&lines, false, &inr()),
            Err(BillingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_flat_discount_applied_after_tax() {
        let breakdown = ChargeAggregator::aggregate(&scenario_lines(), false, &inr()).unwrap();
        let discounted = ChargeAggregator::apply_grants(breakdown, dec!(40.42), &inr()).unwrap();
        assert_eq!(discounted.grants_or_discounts, dec!(40.42));
        assert_eq!(discounted.grand_total, dec!(150.00));
        assert_eq!(discounted.tax_total, dec!(21.42));
    }

    #[test]
    fn test_flat_discount_clamps_to_zero() {
        let lines = vec![LineItem::flat(dec!(100), 1)];
        let breakdown = ChargeAggregator::aggregate(&lines, false, &inr()).unwrap();
        let clamped = ChargeAggregator::apply_grants(breakdown, dec!(150), &inr()).unwrap();

        assert_eq!(clamped.grand_total, dec!(0));
        assert_eq!(
            clamped.warnings,
            vec![BillingWarning::DiscountExceedsTotal {
                requested: dec!(150.00),
                applied: dec!(100.00),
            }]
        );
    }

    #[test]
    fn test_negative_grants_rejected() {
        let breakdown = ChargeAggregator::aggregate(&[], false, &inr()).unwrap();
        assert!(ChargeAggregator::apply_grants(breakdown, dec!(-1), &inr()).is_err());
    }

    #[test]
    fn test_combine_sums_categories() {
        let beds = ChargeAggregator::aggregate(&[LineItem::flat(dec!(500), 2)], false, &inr()).unwrap();
        let services = ChargeAggregator::aggregate(
            &[LineItem::new(dec!(300), 1, dec!(0), dec!(18))],
            false,
            &inr(),
        )
        .unwrap();

        let combined = ChargeAggregator::combine(&[beds, services], false, &inr()).unwrap();
        assert_eq!(combined.sub_total, dec!(1300));
        assert_eq!(combined.tax_total, dec!(54));
        assert_eq!(combined.cgst, dec!(27));
        assert_eq!(combined.sgst, dec!(27));
        assert_eq!(combined.grand_total, dec!(1354));
    }

    fn arb_line() -> impl Strategy<Value = LineItem> {
        (0u32..1_000_000, 0u32..50, 0u32..=100, prop::sample::select(vec![0u32, 5, 12, 18, 28]))
            .prop_map(|(paise, quantity, discount, tax)| {
                LineItem::new(
                    Decimal::new(paise as i64, 2),
                    quantity,
                    Decimal::from(discount),
                    Decimal::from(tax),
                )
            })
    }

    proptest! {
        #[test]
        fn prop_tax_split_sums_to_total(lines in prop::collection::vec(arb_line(), 0..20), inter in any::<bool>()) {
            let b = ChargeAggregator::aggregate(&lines, inter, &inr()).unwrap();
            prop_assert_eq!(b.cgst + b.sgst + b.igst, b.tax_total);
            if inter {
                prop_assert_eq!(b.cgst + b.sgst, Decimal::ZERO);
            } else {
                prop_assert_eq!(b.igst, Decimal::ZERO);
            }
        }

        #[test]
        fn prop_grand_total_identity(lines in prop::collection::vec(arb_line(), 0..20)) {
            let b = ChargeAggregator::aggregate(&lines, false, &inr()).unwrap();
            prop_assert_eq!(b.grand_total, b.sub_total - b.discount_total + b.tax_total);
        }

        #[test]
        fn prop_aggregate_is_idempotent(lines in prop::collection::vec(arb_line(), 0..20)) {
            let first = ChargeAggregator::aggregate(&lines, false, &inr()).unwrap();
            let second = ChargeAggregator::aggregate(&lines, false, &inr()).unwrap();
            prop_assert_eq!(first.grand_total.to_string(), second.grand_total.to_string());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_grants_never_negative(lines in prop::collection::vec(arb_line(), 0..10), grants in 0i64..100_000_000) {
            let b = ChargeAggregator::aggregate(&lines, false, &inr()).unwrap();
            let b = ChargeAggregator::apply_grants(b, Decimal::new(grants, 2), &inr()).unwrap();
            prop_assert!(b.grand_total >= Decimal::ZERO);
        }
    }
}
