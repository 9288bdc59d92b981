//! Tenant extraction.
//!
//! Every billing route is scoped to the clinic named in `X-Tenant-ID`. The
//! gateway in front of this service authenticates the caller and sets it.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";

#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    pub tenant_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(TENANT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing {} header", TENANT_ID_HEADER))
            })?;

        let tenant_id = Uuid::parse_str(raw.trim()).map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Invalid {} header: {}", TENANT_ID_HEADER, e))
        })?;

        tracing::Span::current().record("tenant_id", tracing::field::display(tenant_id));

        Ok(TenantContext { tenant_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(header: Option<&str>) -> Result<TenantContext, AppError> {
        let mut builder = Request::builder().uri("/beds");
        if let Some(value) = header {
            builder = builder.header(TENANT_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        TenantContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_tenant() {
        let tenant = Uuid::new_v4();
        let ctx = extract(Some(&tenant.to_string())).await.unwrap();
        assert_eq!(ctx.tenant_id, tenant);
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let err = extract(None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_header_is_bad_request() {
        let err = extract(Some("clinic-7")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
