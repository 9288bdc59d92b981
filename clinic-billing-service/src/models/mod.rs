//! Domain models for clinic-billing-service.

mod bed;
mod breakdown;
mod catalog;
mod invoice;
mod ipd;
mod line_item;
mod money;
mod opd;

pub use bed::{Bed, BedCharges, BedStatus, CreateBed, MedicineLine, ServiceLine, TreatmentLine};
pub use breakdown::{BillingSummary, BillingWarning, ChargeBreakdown};
pub use catalog::{CatalogProduct, CatalogService, UpsertProduct, UpsertService};
pub use invoice::{
    CreateInvoice, Invoice, InvoiceLine, InvoiceStatus, ListInvoicesFilter, PaymentMethod,
    UpdateInvoice,
};
pub use ipd::{AdmitPatient, BedStay, Ipd, IpdStatus, PaymentStatus};
pub use line_item::{LineItem, LinePrice};
pub use money::{round_to_scale, Currency};
pub use opd::{CreateOpd, OpdRecord, OtherCharge, UpdateOpd};
