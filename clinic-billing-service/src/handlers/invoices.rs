use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    CreateInvoiceRequest, InvoiceListResponse, InvoicePreviewRequest, InvoiceStatusRequest,
    ListInvoicesParams, OverdueSweepParams, UpdateInvoiceRequest,
};
use crate::middleware::TenantContext;
use crate::startup::AppState;

/// Live totals while a cashier edits lines.
pub async fn preview_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(req): Json<InvoicePreviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let currency = req.currency()?;
    let breakdown = state
        .lifecycle
        .preview_invoice(tenant.tenant_id, &req.lines, currency, req.is_inter_state)
        .await?;
    Ok(Json(breakdown))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let invoice = state
        .lifecycle
        .create_invoice(req.into_input(tenant.tenant_id)?)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(params): Query<ListInvoicesParams>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = state
        .lifecycle
        .list_invoices(tenant.tenant_id, &params.into())
        .await?;
    Ok(Json(InvoiceListResponse {
        total: invoices.len(),
        invoices,
    }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .lifecycle
        .get_invoice(tenant.tenant_id, invoice_id)
        .await?;
    Ok(Json(invoice))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
    Json(req): Json<UpdateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let invoice = state
        .lifecycle
        .update_invoice(tenant.tenant_id, invoice_id, req.into())
        .await?;
    Ok(Json(invoice))
}

pub async fn transition_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
    Json(req): Json<InvoiceStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .lifecycle
        .transition_invoice(tenant.tenant_id, invoice_id, req.status)
        .await?;
    Ok(Json(invoice))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .lifecycle
        .delete_invoice(tenant.tenant_id, invoice_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn overdue_sweep(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(params): Query<OverdueSweepParams>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = state
        .lifecycle
        .mark_overdue(tenant.tenant_id, params.as_of)
        .await?;
    Ok(Json(InvoiceListResponse {
        total: invoices.len(),
        invoices,
    }))
}
