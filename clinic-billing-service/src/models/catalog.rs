//! Catalog entries that lines may reference by id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A billable clinical service (consultation, procedure, lab test...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogService {
    pub service_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub gst_rate: Decimal,
    pub updated_utc: DateTime<Utc>,
}

/// A stocked product (medicine, consumable, retail item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub product_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub gst_rate: Decimal,
    pub updated_utc: DateTime<Utc>,
}

/// Input for adding or repricing a service.
#[derive(Debug, Clone)]
pub struct UpsertService {
    pub tenant_id: Uuid,
    pub service_id: Option<Uuid>,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub gst_rate: Decimal,
}

/// Input for adding or repricing a product.
#[derive(Debug, Clone)]
pub struct UpsertProduct {
    pub tenant_id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub price: Decimal,
    pub gst_rate: Decimal,
}
