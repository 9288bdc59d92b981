//! In-patient (IPD) admission and its bill.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BedCharges, BillingSummary};

/// Admission status. `Discharged` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpdStatus {
    Admitted,
    Discharged,
}

impl IpdStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpdStatus::Admitted => "Admitted",
            IpdStatus::Discharged => "Discharged",
        }
    }
}

/// Settlement state of an IPD or OPD bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }

    /// Derive the status from what was paid against what is owed.
    pub fn from_amounts(amount_paid: Decimal, amount_owed: Decimal) -> Self {
        if amount_paid >= amount_owed {
            PaymentStatus::Paid
        } else if amount_paid > Decimal::ZERO {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }
}

/// One bed occupied during the admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedStay {
    pub bed_id: Uuid,
    pub daily_rate: Decimal,
    pub from_utc: DateTime<Utc>,
    pub to_utc: Option<DateTime<Utc>>,
}

/// IPD document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ipd {
    pub ipd_id: Uuid,
    pub tenant_id: Uuid,
    pub ipd_number: String,
    pub patient_id: Uuid,
    pub bed_id: Uuid,
    pub admission_date: DateTime<Utc>,
    pub discharge_date: Option<DateTime<Utc>>,
    pub status: IpdStatus,
    pub payment_status: PaymentStatus,
    pub grants_or_discounts: Decimal,
    pub amount_paid: Decimal,
    /// Frozen copy of the bed's working set, taken at discharge.
    pub charges: BedCharges,
    /// Final bill, present once discharged.
    pub billing: Option<BillingSummary>,
    pub bed_history: Vec<BedStay>,
    pub version: u64,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Ipd {
    pub fn is_discharged(&self) -> bool {
        self.status == IpdStatus::Discharged
    }
}

/// Input for admitting a patient to a bed.
#[derive(Debug, Clone)]
pub struct AdmitPatient {
    pub tenant_id: Uuid,
    pub bed_id: Uuid,
    pub patient_id: Uuid,
    pub admission_date: Option<DateTime<Utc>>,
    pub grants_or_discounts: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_status_from_amounts() {
        assert_eq!(
            PaymentStatus::from_amounts(dec!(0), dec!(100)),
            PaymentStatus::Pending
        );
        assert_eq!(
            PaymentStatus::from_amounts(dec!(40), dec!(100)),
            PaymentStatus::Partial
        );
        assert_eq!(
            PaymentStatus::from_amounts(dec!(100), dec!(100)),
            PaymentStatus::Paid
        );
        assert_eq!(
            PaymentStatus::from_amounts(dec!(120), dec!(100)),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_nothing_owed_is_paid() {
        assert_eq!(
            PaymentStatus::from_amounts(dec!(0), dec!(0)),
            PaymentStatus::Paid
        );
    }
}
