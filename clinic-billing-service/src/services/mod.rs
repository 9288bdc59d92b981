pub mod aggregation;
pub mod billing;
pub mod catalog;
pub mod clock;
pub mod lifecycle;
pub mod metrics;
pub mod pricing;
pub mod store;

pub use aggregation::ChargeAggregator;
pub use billing::BillingCalculator;
pub use catalog::{Catalog, InMemoryCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use lifecycle::BillLifecycle;
pub use metrics::{get_metrics, init_metrics};
pub use pricing::LineItemPricer;
pub use store::{BillingStore, InMemoryStore};
