use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{
    BillingPreviewParams, DischargeRequest, GrantsRequest, PaymentRequest, TransferRequest,
};
use crate::middleware::TenantContext;
use crate::startup::AppState;

pub async fn get_ipd(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(ipd_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ipd = state.lifecycle.get_ipd(tenant.tenant_id, ipd_id).await?;
    Ok(Json(ipd))
}

/// Interim bill for an admitted patient, or the frozen bill after discharge.
pub async fn preview_billing(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(ipd_id): Path<Uuid>,
    Query(params): Query<BillingPreviewParams>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state
        .lifecycle
        .preview_ipd_billing(tenant.tenant_id, ipd_id, params.as_of)
        .await?;
    Ok(Json(summary))
}

pub async fn transfer_bed(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(ipd_id): Path<Uuid>,
    Json(req): Json<TransferRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ipd = state
        .lifecycle
        .transfer_bed(tenant.tenant_id, ipd_id, req.bed_id)
        .await?;
    Ok(Json(ipd))
}

pub async fn set_grants(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(ipd_id): Path<Uuid>,
    Json(req): Json<GrantsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ipd = state
        .lifecycle
        .set_ipd_grants(tenant.tenant_id, ipd_id, req.grants_or_discounts)
        .await?;
    Ok(Json(ipd))
}

pub async fn record_payment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(ipd_id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ipd = state
        .lifecycle
        .record_ipd_payment(tenant.tenant_id, ipd_id, req.amount)
        .await?;
    Ok(Json(ipd))
}

pub async fn discharge(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(ipd_id): Path<Uuid>,
    Json(req): Json<DischargeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ipd = state
        .lifecycle
        .discharge_patient(tenant.tenant_id, ipd_id, req.discharge_date)
        .await?;
    Ok(Json(ipd))
}
