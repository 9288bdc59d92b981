//! Request and response bodies for the HTTP surface.
//!
//! Money travels as decimal strings (`"170.00"`); numbers are accepted on
//! input as well.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    AdmitPatient, CreateBed, CreateInvoice, CreateOpd, Currency, Invoice, InvoiceLine,
    InvoiceStatus, ListInvoicesFilter, OtherCharge, PaymentMethod, TreatmentLine, UpdateInvoice,
    UpdateOpd, UpsertProduct, UpsertService,
};

fn parse_currency(code: Option<String>) -> Result<Option<Currency>, AppError> {
    code.map(|c| Currency::new(&c))
        .transpose()
        .map_err(AppError::from)
}

// -----------------------------------------------------------------------------
// Catalog
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertServiceRequest {
    pub service_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Service name is required"))]
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub price: Decimal,
    pub gst_rate: Decimal,
}

fn default_category() -> String {
    "general".to_string()
}

impl UpsertServiceRequest {
    pub fn into_input(self, tenant_id: Uuid) -> UpsertService {
        UpsertService {
            tenant_id,
            service_id: self.service_id,
            name: self.name,
            category: self.category,
            price: self.price,
            gst_rate: self.gst_rate,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertProductRequest {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    pub price: Decimal,
    pub gst_rate: Decimal,
}

impl UpsertProductRequest {
    pub fn into_input(self, tenant_id: Uuid) -> UpsertProduct {
        UpsertProduct {
            tenant_id,
            product_id: self.product_id,
            name: self.name,
            price: self.price,
            gst_rate: self.gst_rate,
        }
    }
}

// -----------------------------------------------------------------------------
// Invoices
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct InvoicePreviewRequest {
    #[serde(default)]
    pub lines: Vec<InvoiceLine>,
    pub currency: Option<String>,
    #[serde(default)]
    pub is_inter_state: bool,
}

impl InvoicePreviewRequest {
    pub fn currency(&self) -> Result<Option<Currency>, AppError> {
        parse_currency(self.currency.clone())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,
    pub patient_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<InvoiceLine>,
    pub payment_method: Option<PaymentMethod>,
    pub currency: Option<String>,
    #[serde(default)]
    pub is_inter_state: bool,
    pub due_date: Option<NaiveDate>,
}

impl CreateInvoiceRequest {
    pub fn into_input(self, tenant_id: Uuid) -> Result<CreateInvoice, AppError> {
        Ok(CreateInvoice {
            tenant_id,
            customer_name: self.customer_name,
            patient_id: self.patient_id,
            lines: self.lines,
            payment_method: self.payment_method,
            currency: parse_currency(self.currency)?,
            is_inter_state: self.is_inter_state,
            due_date: self.due_date,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    #[validate(length(min = 1, message = "Customer name cannot be empty"))]
    pub customer_name: Option<String>,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Option<Vec<InvoiceLine>>,
    pub payment_method: Option<PaymentMethod>,
    pub is_inter_state: Option<bool>,
    pub due_date: Option<NaiveDate>,
}

impl From<UpdateInvoiceRequest> for UpdateInvoice {
    fn from(req: UpdateInvoiceRequest) -> Self {
        UpdateInvoice {
            customer_name: req.customer_name,
            lines: req.lines,
            payment_method: req.payment_method,
            is_inter_state: req.is_inter_state,
            due_date: req.due_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InvoiceStatusRequest {
    pub status: InvoiceStatus,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListInvoicesParams {
    pub status: Option<InvoiceStatus>,
    pub patient_id: Option<Uuid>,
}

impl From<ListInvoicesParams> for ListInvoicesFilter {
    fn from(params: ListInvoicesParams) -> Self {
        ListInvoicesFilter {
            status: params.status,
            patient_id: params.patient_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
    pub total: usize,
}

#[derive(Debug, Deserialize, Default)]
pub struct OverdueSweepParams {
    /// Defaults to today (UTC).
    pub as_of: Option<NaiveDate>,
}

// -----------------------------------------------------------------------------
// Beds and IPD
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBedRequest {
    #[validate(length(min = 1, message = "Bed number is required"))]
    pub bed_number: String,
    pub ward: Option<String>,
    pub bed_charges: Decimal,
}

impl CreateBedRequest {
    pub fn into_input(self, tenant_id: Uuid) -> CreateBed {
        CreateBed {
            tenant_id,
            bed_number: self.bed_number,
            ward: self.ward,
            bed_charges: self.bed_charges,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdmitRequest {
    pub patient_id: Uuid,
    pub admission_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub grants_or_discounts: Decimal,
}

impl AdmitRequest {
    pub fn into_input(self, tenant_id: Uuid, bed_id: Uuid) -> AdmitPatient {
        AdmitPatient {
            tenant_id,
            bed_id,
            patient_id: self.patient_id,
            admission_date: self.admission_date,
            grants_or_discounts: self.grants_or_discounts,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ServiceChargeRequest {
    pub service_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MedicineChargeRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Default)]
pub struct BillingPreviewParams {
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub bed_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct GrantsRequest {
    pub grants_or_discounts: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Default)]
pub struct DischargeRequest {
    pub discharge_date: Option<DateTime<Utc>>,
}

// -----------------------------------------------------------------------------
// OPD
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OpdChargesRequest {
    #[serde(default)]
    pub treatments: Vec<TreatmentLine>,
    #[serde(default)]
    pub other_charges: Vec<OtherCharge>,
    #[serde(default)]
    pub grants_or_discounts: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateOpdRequest {
    pub patient_id: Uuid,
    pub visit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub treatments: Vec<TreatmentLine>,
    #[serde(default)]
    pub other_charges: Vec<OtherCharge>,
    #[serde(default)]
    pub grants_or_discounts: Decimal,
}

impl CreateOpdRequest {
    pub fn into_input(self, tenant_id: Uuid) -> CreateOpd {
        CreateOpd {
            tenant_id,
            patient_id: self.patient_id,
            visit_date: self.visit_date,
            treatments: self.treatments,
            other_charges: self.other_charges,
            grants_or_discounts: self.grants_or_discounts,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateOpdRequest {
    pub treatments: Option<Vec<TreatmentLine>>,
    pub other_charges: Option<Vec<OtherCharge>>,
    pub grants_or_discounts: Option<Decimal>,
}

impl From<UpdateOpdRequest> for UpdateOpd {
    fn from(req: UpdateOpdRequest) -> Self {
        UpdateOpd {
            treatments: req.treatments,
            other_charges: req.other_charges,
            grants_or_discounts: req.grants_or_discounts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_invoice_request_accepts_string_and_number_money() {
        let req: CreateInvoiceRequest = serde_json::from_value(serde_json::json!({
            "customer_name": "Walk-in",
            "lines": [
                {"description": "Gauze", "unit_price": "50", "quantity": 3, "tax_rate_percent": 12},
                {"description": "Tape", "unit_price": 20, "quantity": 1, "discount_percent": "5", "tax_rate_percent": "18"}
            ]
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        assert_eq!(req.lines[0].unit_price, Some(dec!(50)));
        assert_eq!(req.lines[1].discount_percent, dec!(5));
        assert!(!req.is_inter_state);
    }

    #[test]
    fn test_negative_quantity_is_rejected_at_parse() {
        let result: Result<ServiceChargeRequest, _> = serde_json::from_value(serde_json::json!({
            "service_id": Uuid::new_v4(),
            "quantity": -1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_quantity_fails_validation() {
        let req = ServiceChargeRequest {
            service_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_invoice_fails_validation() {
        let req = CreateInvoiceRequest {
            customer_name: "Walk-in".to_string(),
            patient_id: None,
            lines: Vec::new(),
            payment_method: None,
            currency: None,
            is_inter_state: false,
            due_date: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_unknown_currency_is_bad_request() {
        let req = CreateInvoiceRequest {
            customer_name: "Walk-in".to_string(),
            patient_id: None,
            lines: Vec::new(),
            payment_method: None,
            currency: Some("rupees".to_string()),
            is_inter_state: false,
            due_date: None,
        };
        let err = req.into_input(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
