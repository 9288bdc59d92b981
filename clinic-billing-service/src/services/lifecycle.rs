//! Bill lifecycle: the only place status fields change.
//!
//! Every operation validates and prices first, then writes. Writes touching
//! several documents (admit, transfer, discharge) save the bed(s) before the
//! IPD and restore the beds if the IPD write is rejected.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::billing::BillingCalculator;
use super::catalog::Catalog;
use super::clock::Clock;
use super::metrics::{
    record_billed_amount, ERRORS_TOTAL, INVOICES_TOTAL, IPD_ADMISSIONS_TOTAL,
    IPD_DISCHARGES_TOTAL,
};
use super::store::BillingStore;
use crate::config::BillingSettings;
use crate::error::BillingError;
use crate::models::{
    AdmitPatient, Bed, BedCharges, BedStatus, BedStay, BillingSummary, ChargeBreakdown, CreateBed,
    CreateInvoice, CreateOpd, Currency, Invoice, InvoiceLine, InvoiceStatus, Ipd, IpdStatus,
    ListInvoicesFilter, MedicineLine, OpdRecord, OtherCharge, PaymentStatus, ServiceLine,
    TreatmentLine, UpdateInvoice, UpdateOpd,
};

pub struct BillLifecycle {
    store: Arc<dyn BillingStore>,
    calculator: BillingCalculator,
    clock: Arc<dyn Clock>,
    settings: BillingSettings,
}

impl BillLifecycle {
    pub fn new(
        store: Arc<dyn BillingStore>,
        catalog: Arc<dyn Catalog>,
        clock: Arc<dyn Clock>,
        settings: BillingSettings,
    ) -> Self {
        Self {
            store,
            calculator: BillingCalculator::new(catalog),
            clock,
            settings,
        }
    }

    pub fn calculator(&self) -> &BillingCalculator {
        &self.calculator
    }

    pub fn settings(&self) -> &BillingSettings {
        &self.settings
    }

    pub async fn health_check(&self) -> Result<(), BillingError> {
        self.store.health_check().await
    }

    async fn next_number(
        &self,
        tenant_id: Uuid,
        sequence: &str,
        prefix: &str,
    ) -> Result<String, BillingError> {
        let n = self.store.next_sequence(tenant_id, sequence).await?;
        Ok(format!("{}-{:06}", prefix, n))
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Live totals for lines being edited. Nothing is stored.
    #[instrument(skip(self, lines), fields(tenant_id = %tenant_id, lines = lines.len()))]
    pub async fn preview_invoice(
        &self,
        tenant_id: Uuid,
        lines: &[InvoiceLine],
        currency: Option<Currency>,
        is_inter_state: bool,
    ) -> Result<ChargeBreakdown, BillingError> {
        let currency = currency.unwrap_or_else(|| self.settings.default_currency.clone());
        self.calculator
            .compute_invoice_totals(tenant_id, lines, &currency, is_inter_state)
            .await
    }

    /// Create a draft invoice with server-side totals.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub async fn create_invoice(&self, input: CreateInvoice) -> Result<Invoice, BillingError> {
        if input.customer_name.trim().is_empty() {
            return Err(BillingError::invalid_input("customer name is required"));
        }

        let currency = input
            .currency
            .unwrap_or_else(|| self.settings.default_currency.clone());
        let breakdown = self
            .calculator
            .compute_invoice_totals(input.tenant_id, &input.lines, &currency, input.is_inter_state)
            .await?;

        let invoice_number = self
            .next_number(input.tenant_id, "invoice", &self.settings.invoice_prefix)
            .await?;
        let now = self.clock.now();

        let invoice = self
            .store
            .save_invoice(Invoice {
                invoice_id: Uuid::new_v4(),
                tenant_id: input.tenant_id,
                invoice_number,
                status: InvoiceStatus::Draft,
                customer_name: input.customer_name,
                patient_id: input.patient_id,
                lines: input.lines,
                payment_method: input.payment_method,
                currency,
                is_inter_state: input.is_inter_state,
                due_date: input.due_date,
                breakdown,
                version: 0,
                created_utc: now,
                updated_utc: now,
                paid_utc: None,
            })
            .await?;

        INVOICES_TOTAL
            .with_label_values(&[InvoiceStatus::Draft.as_str()])
            .inc();
        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            grand_total = %invoice.breakdown.grand_total,
            "Draft invoice created"
        );

        Ok(invoice)
    }

    pub async fn get_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Invoice, BillingError> {
        self.store.load_invoice(tenant_id, invoice_id).await
    }

    pub async fn list_invoices(
        &self,
        tenant_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, BillingError> {
        self.store.list_invoices(tenant_id, filter).await
    }

    /// Apply edits and recompute the breakdown from scratch.
    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    pub async fn update_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
        input: UpdateInvoice,
    ) -> Result<Invoice, BillingError> {
        let mut invoice = self.store.load_invoice(tenant_id, invoice_id).await?;
        self.ensure_invoice_editable(&invoice)?;

        if let Some(name) = input.customer_name {
            if name.trim().is_empty() {
                return Err(BillingError::invalid_input("customer name is required"));
            }
            invoice.customer_name = name;
        }
        if let Some(lines) = input.lines {
            invoice.lines = lines;
        }
        if let Some(method) = input.payment_method {
            invoice.payment_method = Some(method);
        }
        if let Some(is_inter_state) = input.is_inter_state {
            invoice.is_inter_state = is_inter_state;
        }
        if let Some(due_date) = input.due_date {
            invoice.due_date = Some(due_date);
        }

        invoice.breakdown = self
            .calculator
            .compute_invoice_totals(
                tenant_id,
                &invoice.lines,
                &invoice.currency,
                invoice.is_inter_state,
            )
            .await?;
        invoice.updated_utc = self.clock.now();

        let invoice = self.store.save_invoice(invoice).await?;
        info!(grand_total = %invoice.breakdown.grand_total, "Invoice updated");
        Ok(invoice)
    }

    /// Move an invoice along draft → pending → paid (or pending → overdue → paid).
    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    pub async fn transition_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
        next: InvoiceStatus,
    ) -> Result<Invoice, BillingError> {
        let invoice = self.store.load_invoice(tenant_id, invoice_id).await?;
        self.apply_invoice_transition(invoice, next).await
    }

    async fn apply_invoice_transition(
        &self,
        mut invoice: Invoice,
        next: InvoiceStatus,
    ) -> Result<Invoice, BillingError> {
        let current = invoice.status;
        if !current.can_transition_to(next) {
            return Err(BillingError::invalid_transition(
                "invoice",
                current.as_str(),
                next.as_str(),
            ));
        }

        let now = self.clock.now();
        invoice.status = next;
        invoice.updated_utc = now;
        if next == InvoiceStatus::Paid {
            invoice.paid_utc = Some(now);
        }

        let invoice = self.store.save_invoice(invoice).await?;

        INVOICES_TOTAL.with_label_values(&[next.as_str()]).inc();
        if next == InvoiceStatus::Paid {
            record_billed_amount(
                "invoice",
                invoice.currency.code(),
                invoice.breakdown.grand_total,
            );
        }
        info!(
            invoice_id = %invoice.invoice_id,
            from = current.as_str(),
            to = next.as_str(),
            "Invoice status changed"
        );

        Ok(invoice)
    }

    /// Mark pending invoices whose due date is before `as_of` (default
    /// today) as overdue.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn mark_overdue(
        &self,
        tenant_id: Uuid,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Invoice>, BillingError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.now().date_naive());
        let filter = ListInvoicesFilter {
            status: Some(InvoiceStatus::Pending),
            ..ListInvoicesFilter::default()
        };
        let pending = self.store.list_invoices(tenant_id, &filter).await?;

        let mut marked = Vec::new();
        for invoice in pending {
            if !invoice.due_date.is_some_and(|due| due < as_of) {
                continue;
            }
            let invoice_id = invoice.invoice_id;
            match self
                .apply_invoice_transition(invoice, InvoiceStatus::Overdue)
                .await
            {
                Ok(updated) => marked.push(updated),
                Err(BillingError::VersionConflict { .. }) => {
                    warn!(invoice_id = %invoice_id, "Invoice changed during overdue sweep, skipped");
                }
                Err(e) => return Err(e),
            }
        }

        info!(count = marked.len(), as_of = %as_of, "Overdue sweep completed");
        Ok(marked)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, tenant_id: Uuid, invoice_id: Uuid) -> Result<(), BillingError> {
        let invoice = self.store.load_invoice(tenant_id, invoice_id).await?;
        self.ensure_invoice_editable(&invoice)?;
        self.store
            .delete_invoice(tenant_id, invoice_id, invoice.version)
            .await?;
        info!("Invoice deleted");
        Ok(())
    }

    fn ensure_invoice_editable(&self, invoice: &Invoice) -> Result<(), BillingError> {
        if self.settings.lock_paid_invoices && invoice.status == InvoiceStatus::Paid {
            return Err(BillingError::InvalidStateTransition(format!(
                "invoice {} is paid and can no longer be changed",
                invoice.invoice_number
            )));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Bed Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub async fn create_bed(&self, input: CreateBed) -> Result<Bed, BillingError> {
        if input.bed_number.trim().is_empty() {
            return Err(BillingError::invalid_input("bed number is required"));
        }
        if input.bed_charges < Decimal::ZERO {
            return Err(BillingError::invalid_input("bed charges cannot be negative"));
        }

        let bed = self
            .store
            .save_bed(Bed {
                bed_id: Uuid::new_v4(),
                tenant_id: input.tenant_id,
                bed_number: input.bed_number,
                ward: input.ward,
                bed_charges: input.bed_charges,
                status: BedStatus::Available,
                patient_id: None,
                ipd_id: None,
                occupied_since: None,
                charges: BedCharges::default(),
                version: 0,
                created_utc: self.clock.now(),
            })
            .await?;

        info!(bed_id = %bed.bed_id, bed_number = %bed.bed_number, "Bed created");
        Ok(bed)
    }

    pub async fn get_bed(&self, tenant_id: Uuid, bed_id: Uuid) -> Result<Bed, BillingError> {
        self.store.load_bed(tenant_id, bed_id).await
    }

    /// Occupy an available bed and open the IPD admission.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, bed_id = %input.bed_id))]
    pub async fn admit_patient(&self, input: AdmitPatient) -> Result<Ipd, BillingError> {
        if input.grants_or_discounts < Decimal::ZERO {
            return Err(BillingError::invalid_input(
                "grants or discounts cannot be negative",
            ));
        }

        let bed = self.store.load_bed(input.tenant_id, input.bed_id).await?;
        if bed.status == BedStatus::Occupied {
            return Err(BillingError::InvalidStateTransition(format!(
                "bed {} is already occupied",
                bed.bed_number
            )));
        }

        let now = self.clock.now();
        let admission_date = input.admission_date.unwrap_or(now);
        if admission_date > now {
            return Err(BillingError::invalid_input(
                "admission date cannot be in the future",
            ));
        }
        let ipd_id = Uuid::new_v4();
        let ipd_number = self
            .next_number(input.tenant_id, "ipd", &self.settings.ipd_prefix)
            .await?;

        let mut occupied = bed.occupied_by(input.patient_id, ipd_id, admission_date);
        occupied.charges = BedCharges::default();
        let saved_bed = self.store.save_bed(occupied).await?;

        let ipd = Ipd {
            ipd_id,
            tenant_id: input.tenant_id,
            ipd_number,
            patient_id: input.patient_id,
            bed_id: bed.bed_id,
            admission_date,
            discharge_date: None,
            status: IpdStatus::Admitted,
            payment_status: PaymentStatus::Pending,
            grants_or_discounts: input.grants_or_discounts,
            amount_paid: Decimal::ZERO,
            charges: BedCharges::default(),
            billing: None,
            bed_history: vec![BedStay {
                bed_id: bed.bed_id,
                daily_rate: bed.bed_charges,
                from_utc: admission_date,
                to_utc: None,
            }],
            version: 0,
            created_utc: now,
            updated_utc: now,
        };

        let ipd = match self.store.save_ipd(ipd).await {
            Ok(ipd) => ipd,
            Err(e) => return Err(self.roll_back(e, &[(&bed, &saved_bed)]).await),
        };

        IPD_ADMISSIONS_TOTAL.inc();
        info!(
            ipd_id = %ipd.ipd_id,
            ipd_number = %ipd.ipd_number,
            patient_id = %ipd.patient_id,
            "Patient admitted"
        );

        Ok(ipd)
    }

    pub async fn add_bed_service(
        &self,
        tenant_id: Uuid,
        bed_id: Uuid,
        line: ServiceLine,
    ) -> Result<Bed, BillingError> {
        ensure_positive_quantity(line.quantity)?;
        self.calculator
            .ensure_service_exists(tenant_id, line.service_id)
            .await?;
        self.accrue(tenant_id, bed_id, |charges| charges.services.push(line))
            .await
    }

    pub async fn add_bed_treatment(
        &self,
        tenant_id: Uuid,
        bed_id: Uuid,
        line: TreatmentLine,
    ) -> Result<Bed, BillingError> {
        ensure_positive_quantity(line.quantity)?;
        self.calculator
            .ensure_service_exists(tenant_id, line.service_id)
            .await?;
        self.accrue(tenant_id, bed_id, |charges| charges.treatments.push(line))
            .await
    }

    pub async fn add_bed_medicine(
        &self,
        tenant_id: Uuid,
        bed_id: Uuid,
        line: MedicineLine,
    ) -> Result<Bed, BillingError> {
        ensure_positive_quantity(line.quantity)?;
        self.calculator
            .ensure_product_exists(tenant_id, line.product_id)
            .await?;
        self.accrue(tenant_id, bed_id, |charges| charges.medicines.push(line))
            .await
    }

    #[instrument(skip(self, add), fields(tenant_id = %tenant_id, bed_id = %bed_id))]
    async fn accrue(
        &self,
        tenant_id: Uuid,
        bed_id: Uuid,
        add: impl FnOnce(&mut BedCharges) + Send,
    ) -> Result<Bed, BillingError> {
        let mut bed = self.store.load_bed(tenant_id, bed_id).await?;
        if bed.status != BedStatus::Occupied {
            return Err(BillingError::InvalidStateTransition(format!(
                "bed {} is not occupied, charges cannot be added",
                bed.bed_number
            )));
        }

        add(&mut bed.charges);
        let bed = self.store.save_bed(bed).await?;
        info!("Bed charge added");
        Ok(bed)
    }

    /// Put back beds written by an aborted transition. A bed that cannot be
    /// restored is counted and reported in the returned error.
    async fn roll_back(&self, cause: BillingError, beds: &[(&Bed, &Bed)]) -> BillingError {
        let mut failed = Vec::new();
        for (original, written) in beds {
            if let Err(e) = self.restore_bed(original, written).await {
                failed.push(format!("bed {}: {}", original.bed_number, e));
            }
        }

        if failed.is_empty() {
            cause
        } else {
            BillingError::Storage(format!(
                "{}; bed restore failed: {}",
                cause,
                failed.join(", ")
            ))
        }
    }

    async fn restore_bed(&self, original: &Bed, written: &Bed) -> Result<(), BillingError> {
        let mut restore = original.clone();
        restore.version = written.version;
        if let Err(e) = self.store.save_bed(restore).await {
            ERRORS_TOTAL.with_label_values(&["bed_restore"]).inc();
            error!(bed_id = %original.bed_id, error = %e, "Failed to restore bed after aborted transition");
            return Err(e);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // IPD Operations
    // -------------------------------------------------------------------------

    /// Load an IPD. While admitted, `payment_status` is derived from the
    /// bill as of now.
    pub async fn get_ipd(&self, tenant_id: Uuid, ipd_id: Uuid) -> Result<Ipd, BillingError> {
        let mut ipd = self.store.load_ipd(tenant_id, ipd_id).await?;
        if !ipd.is_discharged() {
            let bed = self.store.load_bed(tenant_id, ipd.bed_id).await?;
            self.refresh_payment_status(&mut ipd, &bed).await?;
        }
        Ok(ipd)
    }

    async fn refresh_payment_status(&self, ipd: &mut Ipd, bed: &Bed) -> Result<(), BillingError> {
        let interim = self.interim_billing(ipd, bed, self.clock.now()).await?;
        ipd.payment_status = PaymentStatus::from_amounts(ipd.amount_paid, interim.final_amount);
        Ok(())
    }

    /// Interim bill as of `as_of` (default now). A discharged IPD returns its
    /// frozen bill.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, ipd_id = %ipd_id))]
    pub async fn preview_ipd_billing(
        &self,
        tenant_id: Uuid,
        ipd_id: Uuid,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<BillingSummary, BillingError> {
        let ipd = self.store.load_ipd(tenant_id, ipd_id).await?;
        if ipd.is_discharged() {
            return ipd.billing.ok_or_else(|| {
                BillingError::Storage(format!("discharged ipd {} has no billing", ipd_id))
            });
        }

        let bed = self.store.load_bed(tenant_id, ipd.bed_id).await?;
        self.interim_billing(&ipd, &bed, as_of.unwrap_or_else(|| self.clock.now()))
            .await
    }

    async fn interim_billing(
        &self,
        ipd: &Ipd,
        bed: &Bed,
        as_of: DateTime<Utc>,
    ) -> Result<BillingSummary, BillingError> {
        self.calculator
            .compute_ipd_billing(
                bed,
                ipd.admission_date,
                as_of,
                ipd.grants_or_discounts,
                &self.settings.default_currency,
            )
            .await
    }

    /// Move an admitted patient to another bed.
    ///
    /// The accrued working set moves with the patient. Billing keeps using
    /// the admission date, so the new bed's rate is charged for the whole
    /// stay; `bed_history` records each bed and its rate for audit.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, ipd_id = %ipd_id))]
    pub async fn transfer_bed(
        &self,
        tenant_id: Uuid,
        ipd_id: Uuid,
        new_bed_id: Uuid,
    ) -> Result<Ipd, BillingError> {
        let mut ipd = self.store.load_ipd(tenant_id, ipd_id).await?;
        if ipd.is_discharged() {
            return Err(BillingError::invalid_transition(
                "ipd",
                ipd.status.as_str(),
                "bed transfer",
            ));
        }
        if ipd.bed_id == new_bed_id {
            return Err(BillingError::invalid_input(
                "patient already occupies the requested bed",
            ));
        }

        let old_bed = self.store.load_bed(tenant_id, ipd.bed_id).await?;
        let new_bed = self.store.load_bed(tenant_id, new_bed_id).await?;
        ensure_held_by(&old_bed, &ipd)?;
        if new_bed.status == BedStatus::Occupied {
            return Err(BillingError::InvalidStateTransition(format!(
                "bed {} is already occupied",
                new_bed.bed_number
            )));
        }

        let now = self.clock.now();
        let mut moved = new_bed.occupied_by(ipd.patient_id, ipd_id, now);
        moved.charges = old_bed.charges.clone();
        self.refresh_payment_status(&mut ipd, &moved).await?;

        let saved_new = self.store.save_bed(moved).await?;
        let saved_old = match self.store.save_bed(old_bed.released()).await {
            Ok(bed) => bed,
            Err(e) => return Err(self.roll_back(e, &[(&new_bed, &saved_new)]).await),
        };

        if let Some(stay) = ipd.bed_history.last_mut() {
            stay.to_utc = Some(now);
        }
        ipd.bed_history.push(BedStay {
            bed_id: new_bed.bed_id,
            daily_rate: new_bed.bed_charges,
            from_utc: now,
            to_utc: None,
        });
        ipd.bed_id = new_bed.bed_id;
        ipd.updated_utc = now;

        let ipd = match self.store.save_ipd(ipd).await {
            Ok(ipd) => ipd,
            Err(e) => {
                return Err(self
                    .roll_back(e, &[(&old_bed, &saved_old), (&new_bed, &saved_new)])
                    .await)
            }
        };

        info!(
            from_bed = %old_bed.bed_id,
            to_bed = %new_bed.bed_id,
            daily_rate = %new_bed.bed_charges,
            "Patient transferred, stay re-priced at new bed rate"
        );
        Ok(ipd)
    }

    /// Replace the flat discount of an admitted patient's bill.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, ipd_id = %ipd_id))]
    pub async fn set_ipd_grants(
        &self,
        tenant_id: Uuid,
        ipd_id: Uuid,
        grants_or_discounts: Decimal,
    ) -> Result<Ipd, BillingError> {
        if grants_or_discounts < Decimal::ZERO {
            return Err(BillingError::invalid_input(
                "grants or discounts cannot be negative",
            ));
        }

        let mut ipd = self.load_admitted(tenant_id, ipd_id).await?;
        let bed = self.store.load_bed(tenant_id, ipd.bed_id).await?;

        ipd.grants_or_discounts = grants_or_discounts;
        self.refresh_payment_status(&mut ipd, &bed).await?;
        ipd.updated_utc = self.clock.now();

        self.store.save_ipd(ipd).await
    }

    /// Record an advance or part payment against an admitted patient's bill.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, ipd_id = %ipd_id))]
    pub async fn record_ipd_payment(
        &self,
        tenant_id: Uuid,
        ipd_id: Uuid,
        amount: Decimal,
    ) -> Result<Ipd, BillingError> {
        ensure_positive_amount(amount)?;

        let mut ipd = self.load_admitted(tenant_id, ipd_id).await?;
        let bed = self.store.load_bed(tenant_id, ipd.bed_id).await?;

        ipd.amount_paid = add_payment(ipd.amount_paid, amount)?;
        self.refresh_payment_status(&mut ipd, &bed).await?;
        ipd.updated_utc = self.clock.now();

        let ipd = self.store.save_ipd(ipd).await?;
        info!(
            amount = %amount,
            amount_paid = %ipd.amount_paid,
            payment_status = ipd.payment_status.as_str(),
            "IPD payment recorded"
        );
        Ok(ipd)
    }

    /// Discharge: freeze the bill, mark it paid and release the bed.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, ipd_id = %ipd_id))]
    pub async fn discharge_patient(
        &self,
        tenant_id: Uuid,
        ipd_id: Uuid,
        discharge_date: Option<DateTime<Utc>>,
    ) -> Result<Ipd, BillingError> {
        let mut ipd = self.store.load_ipd(tenant_id, ipd_id).await?;
        if ipd.is_discharged() {
            return Err(BillingError::invalid_transition(
                "ipd",
                ipd.status.as_str(),
                IpdStatus::Discharged.as_str(),
            ));
        }

        let bed = self.store.load_bed(tenant_id, ipd.bed_id).await?;
        ensure_held_by(&bed, &ipd)?;

        let discharge_date = discharge_date.unwrap_or_else(|| self.clock.now());
        let billing = self.interim_billing(&ipd, &bed, discharge_date).await?;

        let saved_bed = self.store.save_bed(bed.released()).await?;

        if let Some(stay) = ipd.bed_history.last_mut() {
            stay.to_utc = Some(discharge_date);
        }
        ipd.status = IpdStatus::Discharged;
        ipd.discharge_date = Some(discharge_date);
        ipd.payment_status = PaymentStatus::Paid;
        ipd.amount_paid = ipd.amount_paid.max(billing.final_amount);
        ipd.charges = bed.charges.clone();
        ipd.billing = Some(billing);
        ipd.updated_utc = self.clock.now();

        let ipd = match self.store.save_ipd(ipd).await {
            Ok(ipd) => ipd,
            Err(e) => return Err(self.roll_back(e, &[(&bed, &saved_bed)]).await),
        };

        let final_amount = ipd
            .billing
            .as_ref()
            .map(|b| b.final_amount)
            .unwrap_or_default();
        IPD_DISCHARGES_TOTAL.inc();
        record_billed_amount(
            "ipd",
            self.settings.default_currency.code(),
            final_amount,
        );
        info!(
            ipd_number = %ipd.ipd_number,
            bed_id = %bed.bed_id,
            final_amount = %final_amount,
            "Patient discharged, bed released"
        );

        Ok(ipd)
    }

    async fn load_admitted(&self, tenant_id: Uuid, ipd_id: Uuid) -> Result<Ipd, BillingError> {
        let ipd = self.store.load_ipd(tenant_id, ipd_id).await?;
        if ipd.is_discharged() {
            return Err(BillingError::InvalidStateTransition(format!(
                "ipd {} is discharged and its billing is frozen",
                ipd.ipd_number
            )));
        }
        Ok(ipd)
    }

    // -------------------------------------------------------------------------
    // OPD Operations
    // -------------------------------------------------------------------------

    pub async fn preview_opd(
        &self,
        tenant_id: Uuid,
        treatments: &[TreatmentLine],
        other_charges: &[OtherCharge],
        grants_or_discounts: Decimal,
    ) -> Result<BillingSummary, BillingError> {
        validate_other_charges(other_charges)?;
        self.calculator
            .compute_opd_billing(
                tenant_id,
                treatments,
                other_charges,
                grants_or_discounts,
                &self.settings.default_currency,
            )
            .await
    }

    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub async fn create_opd(&self, input: CreateOpd) -> Result<OpdRecord, BillingError> {
        let billing = self
            .preview_opd(
                input.tenant_id,
                &input.treatments,
                &input.other_charges,
                input.grants_or_discounts,
            )
            .await?;

        let opd_number = self
            .next_number(input.tenant_id, "opd", &self.settings.opd_prefix)
            .await?;
        let now = self.clock.now();
        let payment_status = PaymentStatus::from_amounts(Decimal::ZERO, billing.final_amount);

        let opd = self
            .store
            .save_opd(OpdRecord {
                opd_id: Uuid::new_v4(),
                tenant_id: input.tenant_id,
                opd_number,
                patient_id: input.patient_id,
                visit_date: input.visit_date.unwrap_or(now),
                treatments: input.treatments,
                other_charges: input.other_charges,
                grants_or_discounts: input.grants_or_discounts,
                billing,
                payment_status,
                amount_paid: Decimal::ZERO,
                version: 0,
                created_utc: now,
                updated_utc: now,
            })
            .await?;

        info!(
            opd_id = %opd.opd_id,
            opd_number = %opd.opd_number,
            final_amount = %opd.billing.final_amount,
            "OPD record created"
        );
        Ok(opd)
    }

    pub async fn get_opd(&self, tenant_id: Uuid, opd_id: Uuid) -> Result<OpdRecord, BillingError> {
        self.store.load_opd(tenant_id, opd_id).await
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, opd_id = %opd_id))]
    pub async fn update_opd(
        &self,
        tenant_id: Uuid,
        opd_id: Uuid,
        input: UpdateOpd,
    ) -> Result<OpdRecord, BillingError> {
        let mut opd = self.load_unsettled_opd(tenant_id, opd_id).await?;

        if let Some(treatments) = input.treatments {
            opd.treatments = treatments;
        }
        if let Some(other_charges) = input.other_charges {
            opd.other_charges = other_charges;
        }
        if let Some(grants) = input.grants_or_discounts {
            opd.grants_or_discounts = grants;
        }

        opd.billing = self
            .preview_opd(
                tenant_id,
                &opd.treatments,
                &opd.other_charges,
                opd.grants_or_discounts,
            )
            .await?;
        opd.payment_status = PaymentStatus::from_amounts(opd.amount_paid, opd.billing.final_amount);
        opd.updated_utc = self.clock.now();

        self.store.save_opd(opd).await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, opd_id = %opd_id))]
    pub async fn record_opd_payment(
        &self,
        tenant_id: Uuid,
        opd_id: Uuid,
        amount: Decimal,
    ) -> Result<OpdRecord, BillingError> {
        ensure_positive_amount(amount)?;

        let mut opd = self.load_unsettled_opd(tenant_id, opd_id).await?;
        opd.amount_paid = add_payment(opd.amount_paid, amount)?;
        opd.payment_status = PaymentStatus::from_amounts(opd.amount_paid, opd.billing.final_amount);
        opd.updated_utc = self.clock.now();

        let opd = self.store.save_opd(opd).await?;
        if opd.payment_status == PaymentStatus::Paid {
            record_billed_amount(
                "opd",
                self.settings.default_currency.code(),
                opd.billing.final_amount,
            );
        }
        info!(
            amount = %amount,
            payment_status = opd.payment_status.as_str(),
            "OPD payment recorded"
        );
        Ok(opd)
    }

    async fn load_unsettled_opd(
        &self,
        tenant_id: Uuid,
        opd_id: Uuid,
    ) -> Result<OpdRecord, BillingError> {
        let opd = self.store.load_opd(tenant_id, opd_id).await?;
        if opd.payment_status == PaymentStatus::Paid {
            return Err(BillingError::InvalidStateTransition(format!(
                "opd {} is paid and its billing is frozen",
                opd.opd_number
            )));
        }
        Ok(opd)
    }
}

fn ensure_held_by(bed: &Bed, ipd: &Ipd) -> Result<(), BillingError> {
    if bed.status != BedStatus::Occupied || bed.ipd_id != Some(ipd.ipd_id) {
        return Err(BillingError::InvalidStateTransition(format!(
            "bed {} is not held by ipd {}",
            bed.bed_number, ipd.ipd_number
        )));
    }
    Ok(())
}

fn ensure_positive_quantity(quantity: u32) -> Result<(), BillingError> {
    if quantity == 0 {
        return Err(BillingError::invalid_input("quantity must be at least 1"));
    }
    Ok(())
}

fn ensure_positive_amount(amount: Decimal) -> Result<(), BillingError> {
    if amount <= Decimal::ZERO {
        return Err(BillingError::invalid_input("payment amount must be positive"));
    }
    Ok(())
}

fn add_payment(paid: Decimal, amount: Decimal) -> Result<Decimal, BillingError> {
    paid.checked_add(amount)
        .ok_or_else(|| BillingError::invalid_input("payment total exceeds supported range"))
}

fn validate_other_charges(charges: &[OtherCharge]) -> Result<(), BillingError> {
    if charges.iter().any(|c| c.name.trim().is_empty()) {
        return Err(BillingError::invalid_input("other charges need a name"));
    }
    Ok(())
}
