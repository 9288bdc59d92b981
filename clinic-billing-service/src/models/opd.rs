//! Out-patient (OPD) visit record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BillingSummary, PaymentStatus, TreatmentLine};

/// Ad-hoc charge entered by hand (dressing, ambulance, registration fee...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherCharge {
    pub name: String,
    pub amount: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub discount_percent: Decimal,
}

fn default_quantity() -> u32 {
    1
}

/// OPD document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpdRecord {
    pub opd_id: Uuid,
    pub tenant_id: Uuid,
    pub opd_number: String,
    pub patient_id: Uuid,
    pub visit_date: DateTime<Utc>,
    pub treatments: Vec<TreatmentLine>,
    pub other_charges: Vec<OtherCharge>,
    pub grants_or_discounts: Decimal,
    pub billing: BillingSummary,
    pub payment_status: PaymentStatus,
    pub amount_paid: Decimal,
    pub version: u64,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for recording a visit.
#[derive(Debug, Clone)]
pub struct CreateOpd {
    pub tenant_id: Uuid,
    pub patient_id: Uuid,
    pub visit_date: Option<DateTime<Utc>>,
    pub treatments: Vec<TreatmentLine>,
    pub other_charges: Vec<OtherCharge>,
    pub grants_or_discounts: Decimal,
}

/// Input for amending a visit before it is settled.
#[derive(Debug, Clone, Default)]
pub struct UpdateOpd {
    pub treatments: Option<Vec<TreatmentLine>>,
    pub other_charges: Option<Vec<OtherCharge>>,
    pub grants_or_discounts: Option<Decimal>,
}
