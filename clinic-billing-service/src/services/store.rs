//! Persistence for beds, IPDs, OPD records and invoices.
//!
//! Saves are compare-and-swap on `version`: the caller passes back the
//! version it read, the store bumps it on success and rejects the write with
//! [`BillingError::VersionConflict`] if somebody else saved in between. A new
//! entity is saved with version `0`.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::BillingError;
use crate::models::{Bed, Invoice, Ipd, ListInvoicesFilter, OpdRecord};
use crate::services::metrics::STORE_OPERATION_DURATION;

#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn health_check(&self) -> Result<(), BillingError>;

    async fn load_bed(&self, tenant_id: Uuid, bed_id: Uuid) -> Result<Bed, BillingError>;
    async fn save_bed(&self, bed: Bed) -> Result<Bed, BillingError>;

    async fn load_ipd(&self, tenant_id: Uuid, ipd_id: Uuid) -> Result<Ipd, BillingError>;
    async fn save_ipd(&self, ipd: Ipd) -> Result<Ipd, BillingError>;

    async fn load_opd(&self, tenant_id: Uuid, opd_id: Uuid) -> Result<OpdRecord, BillingError>;
    async fn save_opd(&self, opd: OpdRecord) -> Result<OpdRecord, BillingError>;

    async fn load_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Invoice, BillingError>;
    async fn save_invoice(&self, invoice: Invoice) -> Result<Invoice, BillingError>;
    /// Remove the invoice only if it is still at `expected_version`.
    async fn delete_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
        expected_version: u64,
    ) -> Result<(), BillingError>;
    async fn list_invoices(
        &self,
        tenant_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, BillingError>;

    /// Atomically increment and return the tenant's counter called `name`.
    async fn next_sequence(&self, tenant_id: Uuid, name: &str) -> Result<u64, BillingError>;
}

/// Entities guarded by optimistic concurrency.
pub trait Versioned: Clone {
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;
    fn tenant_id(&self) -> Uuid;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

macro_rules! versioned {
    ($ty:ty, $entity:literal, $id:ident) => {
        impl Versioned for $ty {
            const ENTITY: &'static str = $entity;

            fn id(&self) -> Uuid {
                self.$id
            }

            fn tenant_id(&self) -> Uuid {
                self.tenant_id
            }

            fn version(&self) -> u64 {
                self.version
            }

            fn set_version(&mut self, version: u64) {
                self.version = version;
            }
        }
    };
}

versioned!(Bed, "bed", bed_id);
versioned!(Ipd, "ipd", ipd_id);
versioned!(OpdRecord, "opd", opd_id);
versioned!(Invoice, "invoice", invoice_id);

type Key = (Uuid, Uuid);

/// Store backed by concurrent hash maps. Each key's shard lock makes the
/// version check and the write a single step.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    beds: DashMap<Key, Bed>,
    ipds: DashMap<Key, Ipd>,
    opds: DashMap<Key, OpdRecord>,
    invoices: DashMap<Key, Invoice>,
    sequences: DashMap<(Uuid, String), u64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn load<T: Versioned>(map: &DashMap<Key, T>, tenant_id: Uuid, id: Uuid) -> Result<T, BillingError> {
    map.get(&(tenant_id, id))
        .map(|entry| entry.value().clone())
        .ok_or_else(|| BillingError::not_found(T::ENTITY, id))
}

fn compare_and_swap<T: Versioned>(map: &DashMap<Key, T>, mut entity: T) -> Result<T, BillingError> {
    let key = (entity.tenant_id(), entity.id());
    let expected = entity.version();

    match map.entry(key) {
        Entry::Occupied(mut slot) => {
            if slot.get().version() != expected {
                debug!(
                    entity = T::ENTITY,
                    id = %entity.id(),
                    expected,
                    actual = slot.get().version(),
                    "Version check failed"
                );
                return Err(BillingError::VersionConflict {
                    entity: T::ENTITY,
                    id: entity.id(),
                });
            }
            entity.set_version(expected + 1);
            slot.insert(entity.clone());
        }
        Entry::Vacant(slot) => {
            if expected != 0 {
                return Err(BillingError::not_found(T::ENTITY, entity.id()));
            }
            entity.set_version(1);
            slot.insert(entity.clone());
        }
    }

    Ok(entity)
}

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), BillingError> {
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_bed(&self, tenant_id: Uuid, bed_id: Uuid) -> Result<Bed, BillingError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["load_bed"])
            .start_timer();
        let bed = load(&self.beds, tenant_id, bed_id);
        timer.observe_duration();
        bed
    }

    #[instrument(skip(self, bed), fields(bed_id = %bed.bed_id, version = bed.version))]
    async fn save_bed(&self, bed: Bed) -> Result<Bed, BillingError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["save_bed"])
            .start_timer();
        let saved = compare_and_swap(&self.beds, bed);
        timer.observe_duration();
        saved
    }

    #[instrument(skip(self))]
    async fn load_ipd(&self, tenant_id: Uuid, ipd_id: Uuid) -> Result<Ipd, BillingError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["load_ipd"])
            .start_timer();
        let ipd = load(&self.ipds, tenant_id, ipd_id);
        timer.observe_duration();
        ipd
    }

    #[instrument(skip(self, ipd), fields(ipd_id = %ipd.ipd_id, version = ipd.version))]
    async fn save_ipd(&self, ipd: Ipd) -> Result<Ipd, BillingError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["save_ipd"])
            .start_timer();
        let saved = compare_and_swap(&self.ipds, ipd);
        timer.observe_duration();
        saved
    }

    #[instrument(skip(self))]
    async fn load_opd(&self, tenant_id: Uuid, opd_id: Uuid) -> Result<OpdRecord, BillingError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["load_opd"])
            .start_timer();
        let opd = load(&self.opds, tenant_id, opd_id);
        timer.observe_duration();
        opd
    }

    #[instrument(skip(self, opd), fields(opd_id = %opd.opd_id, version = opd.version))]
    async fn save_opd(&self, opd: OpdRecord) -> Result<OpdRecord, BillingError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["save_opd"])
            .start_timer();
        let saved = compare_and_swap(&self.opds, opd);
        timer.observe_duration();
        saved
    }

    #[instrument(skip(self))]
    async fn load_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Invoice, BillingError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["load_invoice"])
            .start_timer();
        let invoice = load(&self.invoices, tenant_id, invoice_id);
        timer.observe_duration();
        invoice
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.invoice_id, version = invoice.version))]
    async fn save_invoice(&self, invoice: Invoice) -> Result<Invoice, BillingError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["save_invoice"])
            .start_timer();
        let saved = compare_and_swap(&self.invoices, invoice);
        timer.observe_duration();
        saved
    }

    #[instrument(skip(self))]
    async fn delete_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
        expected_version: u64,
    ) -> Result<(), BillingError> {
        let key = (tenant_id, invoice_id);
        if self
            .invoices
            .remove_if(&key, |_, invoice| invoice.version == expected_version)
            .is_some()
        {
            return Ok(());
        }

        if self.invoices.contains_key(&key) {
            Err(BillingError::VersionConflict {
                entity: Invoice::ENTITY,
                id: invoice_id,
            })
        } else {
            Err(BillingError::not_found(Invoice::ENTITY, invoice_id))
        }
    }

    #[instrument(skip(self, filter))]
    async fn list_invoices(
        &self,
        tenant_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, BillingError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let mut invoices: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .map(|entry| entry.value().clone())
            .filter(|invoice| filter.status.map_or(true, |s| invoice.status == s))
            .filter(|invoice| {
                filter
                    .patient_id
                    .map_or(true, |p| invoice.patient_id == Some(p))
            })
            .collect();
        invoices.sort_by(|a, b| a.invoice_number.cmp(&b.invoice_number));

        timer.observe_duration();
        Ok(invoices)
    }

    async fn next_sequence(&self, tenant_id: Uuid, name: &str) -> Result<u64, BillingError> {
        let mut counter = self
            .sequences
            .entry((tenant_id, name.to_string()))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BedCharges, BedStatus, ChargeBreakdown, Currency, InvoiceStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn new_bed(tenant_id: Uuid) -> Bed {
        Bed {
            bed_id: Uuid::new_v4(),
            tenant_id,
            bed_number: "ICU-1".to_string(),
            ward: None,
            bed_charges: dec!(2500),
            status: BedStatus::Available,
            patient_id: None,
            ipd_id: None,
            occupied_since: None,
            charges: BedCharges::default(),
            version: 0,
            created_utc: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_sets_version_one() {
        let store = InMemoryStore::new();
        let saved = store.save_bed(new_bed(Uuid::new_v4())).await.unwrap();
        assert_eq!(saved.version, 1);

        let loaded = store.load_bed(saved.tenant_id, saved.bed_id).await.unwrap();
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_stale_write_is_rejected() {
        let store = InMemoryStore::new();
        let saved = store.save_bed(new_bed(Uuid::new_v4())).await.unwrap();

        let first = saved.clone();
        let second = saved.clone();

        store.save_bed(first).await.unwrap();
        let err = store.save_bed(second).await.unwrap_err();
        assert!(matches!(err, BillingError::VersionConflict { entity: "bed", .. }));

        let loaded = store.load_bed(saved.tenant_id, saved.bed_id).await.unwrap();
        assert_eq!(loaded.version, 2);
    }

    fn new_invoice(tenant_id: Uuid) -> Invoice {
        Invoice {
            invoice_id: Uuid::new_v4(),
            tenant_id,
            invoice_number: "INV-000001".to_string(),
            status: InvoiceStatus::Draft,
            customer_name: "Walk-in".to_string(),
            patient_id: None,
            lines: Vec::new(),
            payment_method: None,
            currency: Currency::inr(),
            is_inter_state: false,
            due_date: None,
            breakdown: ChargeBreakdown {
                sub_total: dec!(0),
                discount_total: dec!(0),
                tax_total: dec!(0),
                cgst: dec!(0),
                sgst: dec!(0),
                igst: dec!(0),
                grants_or_discounts: dec!(0),
                grand_total: dec!(0),
                warnings: Vec::new(),
            },
            version: 0,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
            paid_utc: None,
        }
    }

    #[tokio::test]
    async fn test_delete_checks_version() {
        let store = InMemoryStore::new();
        let saved = store.save_invoice(new_invoice(Uuid::new_v4())).await.unwrap();

        let mut paid = saved.clone();
        paid.status = InvoiceStatus::Paid;
        store.save_invoice(paid).await.unwrap();

        let err = store
            .delete_invoice(saved.tenant_id, saved.invoice_id, saved.version)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::VersionConflict { entity: "invoice", .. }));

        let kept = store
            .load_invoice(saved.tenant_id, saved.invoice_id)
            .await
            .unwrap();
        assert_eq!(kept.status, InvoiceStatus::Paid);

        store
            .delete_invoice(saved.tenant_id, saved.invoice_id, kept.version)
            .await
            .unwrap();
        let err = store
            .delete_invoice(saved.tenant_id, saved.invoice_id, kept.version)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_load() {
        let store = InMemoryStore::new();
        let saved = store.save_bed(new_bed(Uuid::new_v4())).await.unwrap();
        let result = store.load_bed(Uuid::new_v4(), saved.bed_id).await;
        assert!(matches!(result, Err(BillingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_sequence_is_unique_under_concurrency() {
        let store = Arc::new(InMemoryStore::new());
        let tenant = Uuid::new_v4();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.next_sequence(tenant, "invoice").await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }
        assert_eq!(seen.len(), 50);
        assert_eq!(store.next_sequence(tenant, "invoice").await.unwrap(), 51);
        assert_eq!(store.next_sequence(tenant, "ipd").await.unwrap(), 1);
    }
}
