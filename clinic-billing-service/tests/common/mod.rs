//! Common test utilities for clinic-billing-service integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use clinic_billing_service::config::{BillingSettings, ClinicBillingConfig};
use clinic_billing_service::middleware::TENANT_ID_HEADER;
use clinic_billing_service::models::{Bed, CreateBed, UpsertProduct, UpsertService};
use clinic_billing_service::services::{
    BillLifecycle, BillingStore, FixedClock, InMemoryCatalog, InMemoryStore,
};
use clinic_billing_service::startup::Application;
use rust_decimal::Decimal;
use serde_json::Value;
use service_core::config::Config as CommonConfig;
use std::sync::{Arc, Once};
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,clinic_billing_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 2024-01-01T10:00:00Z, the instant every test clock starts at.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

pub fn test_config() -> ClinicBillingConfig {
    ClinicBillingConfig {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "clinic-billing-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        billing: BillingSettings::default(),
    }
}

// -----------------------------------------------------------------------------
// In-process harness
// -----------------------------------------------------------------------------

pub struct Harness {
    pub lifecycle: BillLifecycle,
    pub catalog: Arc<InMemoryCatalog>,
    pub clock: Arc<FixedClock>,
    pub tenant_id: Uuid,
}

pub fn harness() -> Harness {
    harness_with_store(Arc::new(InMemoryStore::new()))
}

pub fn harness_with_store(store: Arc<dyn BillingStore>) -> Harness {
    init_tracing();

    let catalog = Arc::new(InMemoryCatalog::new());
    let clock = Arc::new(FixedClock::new(start_time()));
    let lifecycle = BillLifecycle::new(
        store,
        catalog.clone(),
        clock.clone(),
        BillingSettings::default(),
    );

    Harness {
        lifecycle,
        catalog,
        clock,
        tenant_id: Uuid::new_v4(),
    }
}

impl Harness {
    pub fn add_service(&self, name: &str, price: Decimal, gst_rate: Decimal) -> Uuid {
        self.catalog
            .upsert_service(UpsertService {
                tenant_id: self.tenant_id,
                service_id: None,
                name: name.to_string(),
                category: "general".to_string(),
                price,
                gst_rate,
            })
            .expect("Failed to add service")
            .service_id
    }

    pub fn add_product(&self, name: &str, price: Decimal, gst_rate: Decimal) -> Uuid {
        self.catalog
            .upsert_product(UpsertProduct {
                tenant_id: self.tenant_id,
                product_id: None,
                name: name.to_string(),
                price,
                gst_rate,
            })
            .expect("Failed to add product")
            .product_id
    }

    pub async fn add_bed(&self, bed_number: &str, daily_rate: Decimal) -> Bed {
        self.lifecycle
            .create_bed(CreateBed {
                tenant_id: self.tenant_id,
                bed_number: bed_number.to_string(),
                ward: Some("General".to_string()),
                bed_charges: daily_rate,
            })
            .await
            .expect("Failed to create bed")
    }
}

// -----------------------------------------------------------------------------
// HTTP harness
// -----------------------------------------------------------------------------

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub tenant_id: Uuid,
    pub client: reqwest::Client,
}

/// Spawn the service on a random port with a fresh tenant.
pub async fn spawn_app() -> TestApp {
    init_tracing();

    let app = Application::build(test_config())
        .await
        .expect("Failed to build application");
    let port = app.port();

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        port,
        tenant_id: Uuid::new_v4(),
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header(TENANT_ID_HEADER, self.tenant_id.to_string())
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header(TENANT_ID_HEADER, self.tenant_id.to_string())
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .header(TENANT_ID_HEADER, self.tenant_id.to_string())
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .header(TENANT_ID_HEADER, self.tenant_id.to_string())
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Read a response body as JSON, asserting the status first.
pub async fn json_body(response: reqwest::Response, expected: u16) -> Value {
    let status = response.status().as_u16();
    let body: Value = response.json().await.expect("Response was not JSON");
    assert_eq!(status, expected, "unexpected status, body: {}", body);
    body
}
