//! Retail invoice model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ChargeBreakdown, Currency};

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(InvoiceStatus::Draft),
            "pending" => Some(InvoiceStatus::Pending),
            "paid" => Some(InvoiceStatus::Paid),
            "overdue" => Some(InvoiceStatus::Overdue),
            _ => None,
        }
    }

    /// draft → pending → paid, pending → overdue → paid.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Draft, InvoiceStatus::Pending)
                | (InvoiceStatus::Pending, InvoiceStatus::Paid)
                | (InvoiceStatus::Pending, InvoiceStatus::Overdue)
                | (InvoiceStatus::Overdue, InvoiceStatus::Paid)
        )
    }
}

/// Payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Insurance,
}

/// Product line as submitted by the caller.
///
/// `unit_price` and `tax_rate_percent` fall back to the catalog product when
/// omitted; a line without `product_id` must carry both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    #[serde(default)]
    pub description: String,
    pub product_id: Option<Uuid>,
    pub unit_price: Option<Decimal>,
    pub quantity: u32,
    #[serde(default)]
    pub discount_percent: Decimal,
    pub tax_rate_percent: Option<Decimal>,
}

/// Invoice document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub customer_name: String,
    pub patient_id: Option<Uuid>,
    pub lines: Vec<InvoiceLine>,
    pub payment_method: Option<PaymentMethod>,
    pub currency: Currency,
    pub is_inter_state: bool,
    pub due_date: Option<NaiveDate>,
    pub breakdown: ChargeBreakdown,
    pub version: u64,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub paid_utc: Option<DateTime<Utc>>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub patient_id: Option<Uuid>,
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub tenant_id: Uuid,
    pub customer_name: String,
    pub patient_id: Option<Uuid>,
    pub lines: Vec<InvoiceLine>,
    pub payment_method: Option<PaymentMethod>,
    pub currency: Option<Currency>,
    pub is_inter_state: bool,
    pub due_date: Option<NaiveDate>,
}

/// Input for updating an invoice. Status is not editable here.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub customer_name: Option<String>,
    pub lines: Option<Vec<InvoiceLine>>,
    pub payment_method: Option<PaymentMethod>,
    pub is_inter_state: Option<bool>,
    pub due_date: Option<NaiveDate>,
}
