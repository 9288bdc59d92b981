//! HTTP middleware shared by services.

pub mod metrics;
pub mod tracing;
