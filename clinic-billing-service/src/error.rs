//! Error taxonomy for the billing core.

use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::services::metrics::ERRORS_TOTAL;

/// Failure of a pricing computation or lifecycle transition.
///
/// Every variant aborts the whole operation; nothing is partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("{entity} {id} was modified concurrently, retry the request")]
    VersionConflict { entity: &'static str, id: Uuid },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl BillingError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        BillingError::InvalidInput(msg.into())
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        BillingError::NotFound { entity, id }
    }

    pub fn invalid_transition(entity: &str, from: &str, to: &str) -> Self {
        BillingError::InvalidStateTransition(format!(
            "{} cannot move from {} to {}",
            entity, from, to
        ))
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::InvalidInput(_) => "invalid_input",
            BillingError::NotFound { .. } => "not_found",
            BillingError::InvalidStateTransition(_) => "invalid_state_transition",
            BillingError::VersionConflict { .. } => "version_conflict",
            BillingError::Storage(_) => "storage",
        }
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();

        match err {
            BillingError::InvalidInput(_) => AppError::BadRequest(anyhow::Error::new(err)),
            BillingError::NotFound { .. } => AppError::NotFound(anyhow::Error::new(err)),
            BillingError::InvalidStateTransition(_) | BillingError::VersionConflict { .. } => {
                AppError::Conflict(anyhow::Error::new(err))
            }
            BillingError::Storage(_) => AppError::InternalError(anyhow::Error::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_maps_to_http_status() {
        let id = Uuid::new_v4();
        let cases = [
            (BillingError::invalid_input("negative rate"), StatusCode::BAD_REQUEST),
            (BillingError::not_found("service", id), StatusCode::NOT_FOUND),
            (
                BillingError::invalid_transition("ipd", "Discharged", "Discharged"),
                StatusCode::CONFLICT,
            ),
            (
                BillingError::VersionConflict { entity: "bed", id },
                StatusCode::CONFLICT,
            ),
            (
                BillingError::Storage("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_not_found_message_names_entity() {
        let id = Uuid::nil();
        let err = BillingError::not_found("product", id);
        assert_eq!(err.to_string(), format!("product {} not found", id));
    }
}
