pub mod beds;
pub mod catalog;
pub mod health;
pub mod invoices;
pub mod ipd;
pub mod opd;
