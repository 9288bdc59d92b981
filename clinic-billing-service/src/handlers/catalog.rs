use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{UpsertProductRequest, UpsertServiceRequest};
use crate::middleware::TenantContext;
use crate::startup::AppState;

pub async fn upsert_service(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(req): Json<UpsertServiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let service = state
        .catalog
        .upsert_service(req.into_input(tenant.tenant_id))?;
    Ok((StatusCode::OK, Json(service)))
}

pub async fn upsert_product(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(req): Json<UpsertProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let product = state
        .catalog
        .upsert_product(req.into_input(tenant.tenant_id))?;
    Ok((StatusCode::OK, Json(product)))
}
