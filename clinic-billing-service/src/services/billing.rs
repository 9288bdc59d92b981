//! The three billing computations: retail invoices, OPD visits and IPD stays.
//!
//! Referenced lines are resolved against the catalog first; any dangling id
//! aborts the computation with `NotFound` before anything is priced.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::aggregation::ChargeAggregator;
use super::catalog::Catalog;
use super::metrics::DISCOUNT_CLAMPS_TOTAL;
use crate::error::BillingError;
use crate::models::{
    Bed, BillingSummary, ChargeBreakdown, Currency, InvoiceLine, LineItem, MedicineLine,
    OtherCharge, ServiceLine,
};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Number of billable days: whole days rounded up, never less than one.
pub fn days_stayed(
    admission: DateTime<Utc>,
    discharge: DateTime<Utc>,
) -> Result<u32, BillingError> {
    if discharge < admission {
        return Err(BillingError::invalid_input(format!(
            "discharge date {} is before admission date {}",
            discharge, admission
        )));
    }

    let millis = (discharge - admission).num_milliseconds();
    let days = (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
    u32::try_from(days.max(1))
        .map_err(|_| BillingError::invalid_input("stay is too long to bill"))
}

/// Totals for already-priced invoice lines.
pub fn compute_invoice_totals(
    lines: &[LineItem],
    currency: &Currency,
    is_inter_state: bool,
) -> Result<ChargeBreakdown, BillingError> {
    ChargeAggregator::aggregate(lines, is_inter_state, currency)
}

/// Priced lines of a bill, grouped by the category they are reported under.
#[derive(Debug, Clone, Default)]
pub struct ChargeCategories {
    pub bed: Vec<LineItem>,
    pub services: Vec<LineItem>,
    pub treatments: Vec<LineItem>,
    pub medicines: Vec<LineItem>,
    pub other: Vec<LineItem>,
}

/// Aggregate each category, combine them, then apply the bill-level flat
/// discount once.
pub fn summarize(
    categories: &ChargeCategories,
    days_stayed: Option<u32>,
    grants_or_discounts: Decimal,
    currency: &Currency,
) -> Result<BillingSummary, BillingError> {
    let bed = ChargeAggregator::aggregate(&categories.bed, false, currency)?;
    let services = ChargeAggregator::aggregate(&categories.services, false, currency)?;
    let treatments = ChargeAggregator::aggregate(&categories.treatments, false, currency)?;
    let medicines = ChargeAggregator::aggregate(&categories.medicines, false, currency)?;
    let other = ChargeAggregator::aggregate(&categories.other, false, currency)?;

    let parts = [bed, services, treatments, medicines, other];
    let combined = ChargeAggregator::combine(&parts, false, currency)?;
    let breakdown = ChargeAggregator::apply_grants(combined, grants_or_discounts, currency)?;
    let [bed, services, treatments, medicines, other] = parts;

    Ok(BillingSummary {
        days_stayed,
        bed_charges: bed.gross_total(),
        service_charges: services.gross_total(),
        treatment_charges: treatments.gross_total(),
        medicine_charges: medicines.gross_total(),
        other_charges: other.gross_total(),
        grants_or_discounts: breakdown.grants_or_discounts,
        final_amount: breakdown.grand_total,
        breakdown,
    })
}

/// Resolves catalog references and runs the computations.
#[derive(Clone)]
pub struct BillingCalculator {
    catalog: Arc<dyn Catalog>,
}

impl BillingCalculator {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Totals for a retail invoice, resolving product references.
    pub async fn compute_invoice_totals(
        &self,
        tenant_id: Uuid,
        lines: &[InvoiceLine],
        currency: &Currency,
        is_inter_state: bool,
    ) -> Result<ChargeBreakdown, BillingError> {
        let priced = self.resolve_invoice_lines(tenant_id, lines).await?;
        let breakdown = compute_invoice_totals(&priced, currency, is_inter_state)?;
        Ok(breakdown)
    }

    /// Bill for a stay in `bed` from `admission` to `discharge`.
    ///
    /// The bed's current daily rate applies to every day of the stay.
    pub async fn compute_ipd_billing(
        &self,
        bed: &Bed,
        admission: DateTime<Utc>,
        discharge: DateTime<Utc>,
        grants_or_discounts: Decimal,
        currency: &Currency,
    ) -> Result<BillingSummary, BillingError> {
        let days = days_stayed(admission, discharge)?;
        let categories = ChargeCategories {
            bed: vec![LineItem::flat(bed.bed_charges, days)],
            services: self
                .resolve_services(bed.tenant_id, &bed.charges.services)
                .await?,
            treatments: self
                .resolve_services(bed.tenant_id, &bed.charges.treatments)
                .await?,
            medicines: self
                .resolve_medicines(bed.tenant_id, &bed.charges.medicines)
                .await?,
            other: Vec::new(),
        };

        let summary = summarize(&categories, Some(days), grants_or_discounts, currency)?;
        log_warnings("ipd", &summary.breakdown);
        Ok(summary)
    }

    /// Bill for an out-patient visit.
    pub async fn compute_opd_billing(
        &self,
        tenant_id: Uuid,
        treatments: &[ServiceLine],
        other_charges: &[OtherCharge],
        grants_or_discounts: Decimal,
        currency: &Currency,
    ) -> Result<BillingSummary, BillingError> {
        let categories = ChargeCategories {
            treatments: self.resolve_services(tenant_id, treatments).await?,
            other: other_charges.iter().map(other_charge_line).collect(),
            ..ChargeCategories::default()
        };

        let summary = summarize(&categories, None, grants_or_discounts, currency)?;
        log_warnings("opd", &summary.breakdown);
        Ok(summary)
    }

    /// Fail with `NotFound` unless the service is in the catalog.
    pub async fn ensure_service_exists(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
    ) -> Result<(), BillingError> {
        self.catalog
            .get_service_by_id(tenant_id, service_id)
            .await
            .map(|_| ())
    }

    pub async fn ensure_product_exists(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), BillingError> {
        self.catalog
            .get_product_by_id(tenant_id, product_id)
            .await
            .map(|_| ())
    }

    pub async fn resolve_invoice_lines(
        &self,
        tenant_id: Uuid,
        lines: &[InvoiceLine],
    ) -> Result<Vec<LineItem>, BillingError> {
        let mut priced = Vec::with_capacity(lines.len());

        for line in lines {
            let (unit_price, tax_rate) = match line.product_id {
                Some(product_id) => {
                    let product = self.catalog.get_product_by_id(tenant_id, product_id).await?;
                    (
                        line.unit_price.unwrap_or(product.price),
                        line.tax_rate_percent.unwrap_or(product.gst_rate),
                    )
                }
                None => match (line.unit_price, line.tax_rate_percent) {
                    (Some(price), Some(rate)) => (price, rate),
                    _ => {
                        return Err(BillingError::invalid_input(format!(
                            "line '{}' needs a product_id or both unit_price and tax_rate_percent",
                            line.description
                        )))
                    }
                },
            };

            priced.push(LineItem::new(
                unit_price,
                line.quantity,
                line.discount_percent,
                tax_rate,
            ));
        }

        Ok(priced)
    }

    async fn resolve_services(
        &self,
        tenant_id: Uuid,
        lines: &[ServiceLine],
    ) -> Result<Vec<LineItem>, BillingError> {
        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            let service = self
                .catalog
                .get_service_by_id(tenant_id, line.service_id)
                .await?;
            priced.push(LineItem::new(
                service.price,
                line.quantity,
                Decimal::ZERO,
                service.gst_rate,
            ));
        }
        Ok(priced)
    }

    async fn resolve_medicines(
        &self,
        tenant_id: Uuid,
        lines: &[MedicineLine],
    ) -> Result<Vec<LineItem>, BillingError> {
        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self
                .catalog
                .get_product_by_id(tenant_id, line.product_id)
                .await?;
            priced.push(LineItem::new(
                product.price,
                line.quantity,
                Decimal::ZERO,
                product.gst_rate,
            ));
        }
        Ok(priced)
    }
}

fn other_charge_line(charge: &OtherCharge) -> LineItem {
    LineItem::new(
        charge.amount,
        charge.quantity,
        charge.discount_percent,
        Decimal::ZERO,
    )
}

fn log_warnings(context: &str, breakdown: &ChargeBreakdown) {
    for warning in &breakdown.warnings {
        DISCOUNT_CLAMPS_TOTAL.with_label_values(&[context]).inc();
        warn!(context, warning = ?warning, "Flat discount exceeds bill total, clamped to zero");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_same_day_stay_is_one_day() {
        assert_eq!(days_stayed(at(2024, 1, 1, 10), at(2024, 1, 1, 18)).unwrap(), 1);
    }

    #[test]
    fn test_zero_length_stay_is_one_day() {
        assert_eq!(days_stayed(at(2024, 1, 1, 10), at(2024, 1, 1, 10)).unwrap(), 1);
    }

    #[test]
    fn test_whole_days() {
        assert_eq!(days_stayed(at(2024, 1, 1, 0), at(2024, 1, 3, 0)).unwrap(), 2);
    }

    #[test]
    fn test_partial_day_rounds_up() {
        assert_eq!(days_stayed(at(2024, 1, 1, 10), at(2024, 1, 3, 11)).unwrap(), 3);
    }

    #[test]
    fn test_discharge_before_admission_rejected() {
        let err = days_stayed(at(2024, 1, 3, 0), at(2024, 1, 1, 0)).unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput(_)));
    }

    #[test]
    fn test_summary_applies_flat_discount_once() {
        let categories = ChargeCategories {
            bed: vec![LineItem::flat(dec!(500), 2)],
            services: vec![LineItem::new(dec!(300), 1, dec!(0), dec!(18))],
            medicines: vec![LineItem::new(dec!(12.5), 10, dec!(0), dec!(12))],
            ..ChargeCategories::default()
        };

        let summary = summarize(&categories, Some(2), dec!(200), &Currency::inr()).unwrap();
        assert_eq!(summary.bed_charges, dec!(1000));
        assert_eq!(summary.service_charges, dec!(354));
        assert_eq!(summary.medicine_charges, dec!(140));
        assert_eq!(summary.breakdown.sub_total, dec!(1425));
        assert_eq!(summary.breakdown.tax_total, dec!(69));
        assert_eq!(summary.grants_or_discounts, dec!(200));
        assert_eq!(summary.final_amount, dec!(1294));
    }

    #[test]
    fn test_summary_clamps_discount() {
        let categories = ChargeCategories {
            other: vec![LineItem::flat(dec!(100), 1)],
            ..ChargeCategories::default()
        };

        let summary = summarize(&categories, None, dec!(150), &Currency::inr()).unwrap();
        assert_eq!(summary.final_amount, dec!(0));
        assert_eq!(summary.breakdown.warnings.len(), 1);
    }
}
