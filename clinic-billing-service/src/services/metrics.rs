//! Prometheus metrics for clinic-billing-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec,
    HistogramVec, IntCounter, TextEncoder,
};

/// Invoice counter by status reached (created as draft, then each transition).
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "clinic_billing_invoices_total",
        "Total number of invoice status changes by resulting status",
        &["status"] // draft, pending, paid, overdue
    )
    .expect("Failed to register invoices_total")
});

/// IPD admissions.
pub static IPD_ADMISSIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "clinic_billing_ipd_admissions_total",
        "Total number of inpatient admissions"
    )
    .expect("Failed to register ipd_admissions_total")
});

/// IPD discharges.
pub static IPD_DISCHARGES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "clinic_billing_ipd_discharges_total",
        "Total number of inpatient discharges"
    )
    .expect("Failed to register ipd_discharges_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "clinic_billing_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Flat discounts that exceeded the bill and were clamped.
pub static DISCOUNT_CLAMPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "clinic_billing_discount_clamps_total",
        "Total number of flat discounts clamped to the bill total",
        &["context"] // invoice, ipd, opd
    )
    .expect("Failed to register discount_clamps_total")
});

/// Store operation duration histogram.
pub static STORE_OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "clinic_billing_store_operation_duration_seconds",
        "Store operation duration in seconds",
        &["operation"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]
    )
    .expect("Failed to register store_operation_duration")
});

/// Finalised billed amount by billing context.
pub static BILLED_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "clinic_billing_billed_amount_total",
        "Total finalised bill amount by context and currency",
        &["context", "currency"]
    )
    .expect("Failed to register billed_amount_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&IPD_ADMISSIONS_TOTAL);
    Lazy::force(&IPD_DISCHARGES_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DISCOUNT_CLAMPS_TOTAL);
    Lazy::force(&STORE_OPERATION_DURATION);
    Lazy::force(&BILLED_AMOUNT_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

/// Add a decimal amount to [`BILLED_AMOUNT_TOTAL`].
pub fn record_billed_amount(context: &str, currency: &str, amount: rust_decimal::Decimal) {
    use rust_decimal::prelude::ToPrimitive;

    if let Some(value) = amount.to_f64().filter(|v| *v > 0.0) {
        BILLED_AMOUNT_TOTAL
            .with_label_values(&[context, currency])
            .inc_by(value);
    }
}
