//! Clinic Billing Service - charge computation and bill lifecycle for retail
//! invoices, out-patient visits and in-patient stays.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
