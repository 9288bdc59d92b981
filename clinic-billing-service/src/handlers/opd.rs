use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{CreateOpdRequest, OpdChargesRequest, PaymentRequest, UpdateOpdRequest};
use crate::middleware::TenantContext;
use crate::startup::AppState;

pub async fn preview_opd(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(req): Json<OpdChargesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state
        .lifecycle
        .preview_opd(
            tenant.tenant_id,
            &req.treatments,
            &req.other_charges,
            req.grants_or_discounts,
        )
        .await?;
    Ok(Json(summary))
}

pub async fn create_opd(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(req): Json<CreateOpdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let opd = state
        .lifecycle
        .create_opd(req.into_input(tenant.tenant_id))
        .await?;
    Ok((StatusCode::CREATED, Json(opd)))
}

pub async fn get_opd(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(opd_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let opd = state.lifecycle.get_opd(tenant.tenant_id, opd_id).await?;
    Ok(Json(opd))
}

pub async fn update_opd(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(opd_id): Path<Uuid>,
    Json(req): Json<UpdateOpdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let opd = state
        .lifecycle
        .update_opd(tenant.tenant_id, opd_id, req.into())
        .await?;
    Ok(Json(opd))
}

pub async fn record_payment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(opd_id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let opd = state
        .lifecycle
        .record_opd_payment(tenant.tenant_id, opd_id, req.amount)
        .await?;
    Ok(Json(opd))
}
