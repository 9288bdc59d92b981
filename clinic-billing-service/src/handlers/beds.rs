use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{AdmitRequest, CreateBedRequest, MedicineChargeRequest, ServiceChargeRequest};
use crate::middleware::TenantContext;
use crate::models::{MedicineLine, ServiceLine};
use crate::startup::AppState;

pub async fn create_bed(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(req): Json<CreateBedRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let bed = state
        .lifecycle
        .create_bed(req.into_input(tenant.tenant_id))
        .await?;
    Ok((StatusCode::CREATED, Json(bed)))
}

pub async fn get_bed(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(bed_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let bed = state.lifecycle.get_bed(tenant.tenant_id, bed_id).await?;
    Ok(Json(bed))
}

/// Admit a patient to the bed, opening an IPD record.
pub async fn admit_patient(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(bed_id): Path<Uuid>,
    Json(req): Json<AdmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ipd = state
        .lifecycle
        .admit_patient(req.into_input(tenant.tenant_id, bed_id))
        .await?;
    Ok((StatusCode::CREATED, Json(ipd)))
}

pub async fn add_service(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(bed_id): Path<Uuid>,
    Json(req): Json<ServiceChargeRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let bed = state
        .lifecycle
        .add_bed_service(
            tenant.tenant_id,
            bed_id,
            ServiceLine {
                service_id: req.service_id,
                quantity: req.quantity,
            },
        )
        .await?;
    Ok(Json(bed))
}

pub async fn add_treatment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(bed_id): Path<Uuid>,
    Json(req): Json<ServiceChargeRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let bed = state
        .lifecycle
        .add_bed_treatment(
            tenant.tenant_id,
            bed_id,
            ServiceLine {
                service_id: req.service_id,
                quantity: req.quantity,
            },
        )
        .await?;
    Ok(Json(bed))
}

pub async fn add_medicine(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(bed_id): Path<Uuid>,
    Json(req): Json<MedicineChargeRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let bed = state
        .lifecycle
        .add_bed_medicine(
            tenant.tenant_id,
            bed_id,
            MedicineLine {
                product_id: req.product_id,
                quantity: req.quantity,
            },
        )
        .await?;
    Ok(Json(bed))
}
