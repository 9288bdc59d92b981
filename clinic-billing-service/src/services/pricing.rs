//! Single-line pricing.
//!
//! One formula is used everywhere: the percentage discount is taken off the
//! unit price before tax, then tax is charged on the discounted amount.

use rust_decimal::Decimal;

use crate::error::BillingError;
use crate::models::{LineItem, LinePrice};

/// Prices one line at full precision. Rounding happens at aggregation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineItemPricer;

impl LineItemPricer {
    /// Validate and price a line.
    ///
    /// Returns [`BillingError::InvalidInput`] for a negative price, a discount
    /// outside `[0, 100]`, a negative tax rate or an amount that overflows.
    pub fn price(item: &LineItem) -> Result<LinePrice, BillingError> {
        Self::validate(item)?;

        if item.quantity == 0 {
            return Ok(LinePrice::zero());
        }

        let quantity = Decimal::from(item.quantity);
        let unit_discount = mul(item.unit_price, item.discount_percent / Decimal::ONE_HUNDRED)?;
        let discounted_unit = item.unit_price - unit_discount;

        let line_subtotal = mul(item.unit_price, quantity)?;
        let line_discount = mul(unit_discount, quantity)?;
        let line_taxable = mul(discounted_unit, quantity)?;
        let line_tax = mul(line_taxable, item.tax_rate_percent / Decimal::ONE_HUNDRED)?;
        let line_total = line_taxable
            .checked_add(line_tax)
            .ok_or_else(overflow)?;

        Ok(LinePrice {
            line_subtotal,
            line_discount,
            line_taxable,
            line_tax,
            line_total,
        })
    }

    pub fn validate(item: &LineItem) -> Result<(), BillingError> {
        if item.unit_price < Decimal::ZERO {
            return Err(BillingError::invalid_input(format!(
                "unit price cannot be negative (got {})",
                item.unit_price
            )));
        }
        if item.discount_percent < Decimal::ZERO || item.discount_percent > Decimal::ONE_HUNDRED {
            return Err(BillingError::invalid_input(format!(
                "discount percent must be between 0 and 100 (got {})",
                item.discount_percent
            )));
        }
        if item.tax_rate_percent < Decimal::ZERO {
            return Err(BillingError::invalid_input(format!(
                "tax rate cannot be negative (got {})",
                item.tax_rate_percent
            )));
        }
        Ok(())
    }
}

fn mul(a: Decimal, b: Decimal) -> Result<Decimal, BillingError> {
    a.checked_mul(b).ok_or_else(overflow)
}

fn overflow() -> BillingError {
    BillingError::invalid_input("line amount is too large")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_discount_applied_before_tax() {
        let price = LineItemPricer::price(&LineItem::new(dec!(100), 2, dec!(10), dec!(18))).unwrap();

        assert_eq!(price.line_subtotal, dec!(200));
        assert_eq!(price.line_discount, dec!(20));
        assert_eq!(price.line_taxable, dec!(180));
        assert_eq!(price.line_tax, dec!(32.4));
        assert_eq!(price.line_total, dec!(212.4));
    }

    #[test]
    fn test_zero_quantity_prices_to_zero() {
        let price = LineItemPricer::price(&LineItem::new(dec!(200), 0, dec!(0), dec!(5))).unwrap();
        assert_eq!(price, LinePrice::zero());
    }

    #[test]
    fn test_zero_tax_rate_is_exempt() {
        let price = LineItemPricer::price(&LineItem::new(dec!(75), 4, dec!(0), dec!(0))).unwrap();
        assert_eq!(price.line_tax, dec!(0));
        assert_eq!(price.line_total, dec!(300));
    }

    #[test]
    fn test_full_discount() {
        let price = LineItemPricer::price(&LineItem::new(dec!(80), 3, dec!(100), dec!(12))).unwrap();
        assert_eq!(price.line_discount, dec!(240));
        assert_eq!(price.line_taxable, dec!(0));
        assert_eq!(price.line_total, dec!(0));
    }

    #[test]
    fn test_matches_gross_percentage_formula() {
        let item = LineItem::new(dec!(19.99), 7, dec!(12.5), dec!(5));
        let price = LineItemPricer::price(&item).unwrap();
        let gross_discount = price.line_subtotal * item.discount_percent / dec!(100);
        assert_eq!(price.line_discount, gross_discount);
    }

    #[test]
    fn test_rejects_negative_discount() {
        let err = LineItemPricer::price(&LineItem::new(dec!(10), 1, dec!(-5), dec!(18))).unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_discount_over_hundred() {
        let err = LineItemPricer::price(&LineItem::new(dec!(10), 1, dec!(101), dec!(18))).unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_negative_tax_rate() {
        let err = LineItemPricer::price(&LineItem::new(dec!(10), 1, dec!(0), dec!(-1))).unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_negative_price() {
        let err = LineItemPricer::price(&LineItem::new(dec!(-10), 1, dec!(0), dec!(0))).unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput(_)));
    }

    #[test]
    fn test_overflow_is_invalid_input() {
        let err =
            LineItemPricer::price(&LineItem::new(Decimal::MAX, u32::MAX, dec!(0), dec!(0))).unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput(_)));
    }
}
