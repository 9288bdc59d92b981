//! Catalog lookup used to resolve referenced lines to a price and GST rate.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::BillingError;
use crate::models::{CatalogProduct, CatalogService, UpsertProduct, UpsertService};

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_service_by_id(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
    ) -> Result<CatalogService, BillingError>;

    async fn get_product_by_id(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<CatalogProduct, BillingError>;
}

/// Tenant-scoped catalog held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    services: DashMap<(Uuid, Uuid), CatalogService>,
    products: DashMap<(Uuid, Uuid), CatalogProduct>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub fn upsert_service(&self, input: UpsertService) -> Result<CatalogService, BillingError> {
        validate_pricing(&input.name, input.price, input.gst_rate)?;

        let service = CatalogService {
            service_id: input.service_id.unwrap_or_else(Uuid::new_v4),
            tenant_id: input.tenant_id,
            name: input.name,
            category: input.category,
            price: input.price,
            gst_rate: input.gst_rate,
            updated_utc: Utc::now(),
        };
        self.services
            .insert((service.tenant_id, service.service_id), service.clone());

        info!(service_id = %service.service_id, name = %service.name, "Catalog service saved");
        Ok(service)
    }

    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub fn upsert_product(&self, input: UpsertProduct) -> Result<CatalogProduct, BillingError> {
        validate_pricing(&input.name, input.price, input.gst_rate)?;

        let product = CatalogProduct {
            product_id: input.product_id.unwrap_or_else(Uuid::new_v4),
            tenant_id: input.tenant_id,
            name: input.name,
            price: input.price,
            gst_rate: input.gst_rate,
            updated_utc: Utc::now(),
        };
        self.products
            .insert((product.tenant_id, product.product_id), product.clone());

        info!(product_id = %product.product_id, name = %product.name, "Catalog product saved");
        Ok(product)
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get_service_by_id(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
    ) -> Result<CatalogService, BillingError> {
        self.services
            .get(&(tenant_id, service_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BillingError::not_found("service", service_id))
    }

    async fn get_product_by_id(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<CatalogProduct, BillingError> {
        self.products
            .get(&(tenant_id, product_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BillingError::not_found("product", product_id))
    }
}

fn validate_pricing(name: &str, price: Decimal, gst_rate: Decimal) -> Result<(), BillingError> {
    if name.trim().is_empty() {
        return Err(BillingError::invalid_input("catalog entry name is required"));
    }
    if price < Decimal::ZERO {
        return Err(BillingError::invalid_input("catalog price cannot be negative"));
    }
    if gst_rate < Decimal::ZERO {
        return Err(BillingError::invalid_input("GST rate cannot be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_lookup_is_tenant_scoped() {
        let catalog = InMemoryCatalog::new();
        let tenant = Uuid::new_v4();
        let service = catalog
            .upsert_service(UpsertService {
                tenant_id: tenant,
                service_id: None,
                name: "X-Ray".to_string(),
                category: "radiology".to_string(),
                price: dec!(650),
                gst_rate: dec!(12),
            })
            .unwrap();

        let found = catalog
            .get_service_by_id(tenant, service.service_id)
            .await
            .unwrap();
        assert_eq!(found.price, dec!(650));

        let other_tenant = catalog
            .get_service_by_id(Uuid::new_v4(), service.service_id)
            .await;
        assert!(matches!(other_tenant, Err(BillingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let catalog = InMemoryCatalog::new();
        let id = Uuid::new_v4();
        let err = catalog.get_product_by_id(Uuid::new_v4(), id).await.unwrap_err();
        assert_eq!(err, BillingError::not_found("product", id));
    }

    #[test]
    fn test_rejects_negative_gst() {
        let catalog = InMemoryCatalog::new();
        let result = catalog.upsert_product(UpsertProduct {
            tenant_id: Uuid::new_v4(),
            product_id: None,
            name: "Paracetamol".to_string(),
            price: dec!(2.5),
            gst_rate: dec!(-12),
        });
        assert!(matches!(result, Err(BillingError::InvalidInput(_))));
    }
}
