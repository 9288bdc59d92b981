//! Bed model: occupancy plus the charges accrued during the current stay.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bed occupancy status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BedStatus {
    Available,
    Occupied,
}

impl BedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BedStatus::Available => "Available",
            BedStatus::Occupied => "Occupied",
        }
    }
}

/// A catalog service applied `quantity` times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLine {
    pub service_id: Uuid,
    pub quantity: u32,
}

/// Treatments are catalog services recorded separately on the bill.
pub type TreatmentLine = ServiceLine;

/// A catalog product dispensed `quantity` times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// Working set of charges accrued while a bed is occupied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedCharges {
    #[serde(default)]
    pub services: Vec<ServiceLine>,
    #[serde(default)]
    pub treatments: Vec<TreatmentLine>,
    #[serde(default)]
    pub medicines: Vec<MedicineLine>,
}

impl BedCharges {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.treatments.is_empty() && self.medicines.is_empty()
    }
}

/// Bed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bed {
    pub bed_id: Uuid,
    pub tenant_id: Uuid,
    pub bed_number: String,
    pub ward: Option<String>,
    /// Per-day rate.
    pub bed_charges: Decimal,
    pub status: BedStatus,
    pub patient_id: Option<Uuid>,
    pub ipd_id: Option<Uuid>,
    pub occupied_since: Option<DateTime<Utc>>,
    pub charges: BedCharges,
    pub version: u64,
    pub created_utc: DateTime<Utc>,
}

impl Bed {
    /// Copy of this bed occupied by `patient_id` under `ipd_id`.
    pub fn occupied_by(&self, patient_id: Uuid, ipd_id: Uuid, since: DateTime<Utc>) -> Bed {
        Bed {
            status: BedStatus::Occupied,
            patient_id: Some(patient_id),
            ipd_id: Some(ipd_id),
            occupied_since: Some(since),
            ..self.clone()
        }
    }

    /// Copy of this bed freed, with its working set cleared.
    pub fn released(&self) -> Bed {
        Bed {
            status: BedStatus::Available,
            patient_id: None,
            ipd_id: None,
            occupied_since: None,
            charges: BedCharges::default(),
            ..self.clone()
        }
    }
}

/// Input for registering a bed.
#[derive(Debug, Clone)]
pub struct CreateBed {
    pub tenant_id: Uuid,
    pub bed_number: String,
    pub ward: Option<String>,
    pub bed_charges: Decimal,
}
