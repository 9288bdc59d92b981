pub mod tenant;

pub use tenant::{TenantContext, TENANT_ID_HEADER};
