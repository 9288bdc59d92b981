//! Application startup and lifecycle management.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ClinicBillingConfig;
use crate::handlers::{beds, catalog, health, invoices, ipd, opd};
use crate::services::{
    init_metrics, BillLifecycle, BillingStore, Clock, InMemoryCatalog, InMemoryStore, SystemClock,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ClinicBillingConfig,
    pub lifecycle: Arc<BillLifecycle>,
    pub catalog: Arc<InMemoryCatalog>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with in-memory storage and the system clock.
    pub async fn build(config: ClinicBillingConfig) -> Result<Self, AppError> {
        Self::build_with(
            config,
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryCatalog::new()),
            Arc::new(SystemClock),
        )
        .await
    }

    /// Build with explicit collaborators. Tests use this to pin the clock.
    pub async fn build_with(
        config: ClinicBillingConfig,
        store: Arc<dyn BillingStore>,
        catalog: Arc<InMemoryCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let lifecycle = Arc::new(BillLifecycle::new(
            store,
            catalog.clone(),
            clock,
            config.billing.clone(),
        ));

        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port = port,
            default_currency = %config.billing.default_currency,
            lock_paid_invoices = config.billing.lock_paid_invoices,
            "Clinic billing listener bound"
        );

        Ok(Self {
            port,
            listener,
            state: AppState {
                config,
                lifecycle,
                catalog,
            },
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = router(self.state);

        tracing::info!(
            service = "clinic-billing-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_handler))
        .route("/catalog/services", post(catalog::upsert_service))
        .route("/catalog/products", post(catalog::upsert_product))
        .route("/invoices/preview", post(invoices::preview_invoice))
        .route("/invoices/overdue-sweep", post(invoices::overdue_sweep))
        .route(
            "/invoices",
            post(invoices::create_invoice).get(invoices::list_invoices),
        )
        .route(
            "/invoices/:invoice_id",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route(
            "/invoices/:invoice_id/status",
            post(invoices::transition_invoice),
        )
        .route("/beds", post(beds::create_bed))
        .route("/beds/:bed_id", get(beds::get_bed))
        .route("/beds/:bed_id/admit", post(beds::admit_patient))
        .route("/beds/:bed_id/services", post(beds::add_service))
        .route("/beds/:bed_id/treatments", post(beds::add_treatment))
        .route("/beds/:bed_id/medicines", post(beds::add_medicine))
        .route("/ipd/:ipd_id", get(ipd::get_ipd))
        .route("/ipd/:ipd_id/billing", get(ipd::preview_billing))
        .route("/ipd/:ipd_id/transfer", post(ipd::transfer_bed))
        .route("/ipd/:ipd_id/grants", put(ipd::set_grants))
        .route("/ipd/:ipd_id/payments", post(ipd::record_payment))
        .route("/ipd/:ipd_id/discharge", post(ipd::discharge))
        .route("/opd/preview", post(opd::preview_opd))
        .route("/opd", post(opd::create_opd))
        .route("/opd/:opd_id", get(opd::get_opd).put(opd::update_opd))
        .route("/opd/:opd_id/payments", post(opd::record_payment))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
