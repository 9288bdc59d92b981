//! Configuration module for clinic-billing-service.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

use crate::models::Currency;

#[derive(Debug, Clone)]
pub struct ClinicBillingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub billing: BillingSettings,
}

/// Business settings for numbering and lifecycle rules.
#[derive(Debug, Clone)]
pub struct BillingSettings {
    pub default_currency: Currency,
    pub invoice_prefix: String,
    pub ipd_prefix: String,
    pub opd_prefix: String,
    /// Reject edits and deletion of paid invoices.
    pub lock_paid_invoices: bool,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            default_currency: Currency::inr(),
            invoice_prefix: "INV".to_string(),
            ipd_prefix: "IPD".to_string(),
            opd_prefix: "OPD".to_string(),
            lock_paid_invoices: true,
        }
    }
}

impl ClinicBillingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let defaults = BillingSettings::default();

        let default_currency = match env::var("BILLING_DEFAULT_CURRENCY") {
            Ok(code) => Currency::new(&code).map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("BILLING_DEFAULT_CURRENCY: {}", e))
            })?,
            Err(_) => defaults.default_currency,
        };

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "clinic-billing-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            billing: BillingSettings {
                default_currency,
                invoice_prefix: env::var("BILLING_INVOICE_PREFIX")
                    .unwrap_or(defaults.invoice_prefix),
                ipd_prefix: env::var("BILLING_IPD_PREFIX").unwrap_or(defaults.ipd_prefix),
                opd_prefix: env::var("BILLING_OPD_PREFIX").unwrap_or(defaults.opd_prefix),
                lock_paid_invoices: env::var("BILLING_LOCK_PAID_INVOICES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.lock_paid_invoices),
            },
        })
    }
}
