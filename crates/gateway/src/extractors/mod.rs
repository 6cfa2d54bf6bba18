//! Axum extractors for gateway handlers.
//!
//! Both read what the request gate attached to the request:
//!
//! - [`TenantContext`](crate::tenant::TenantContext) - the resolved tenant
//! - [`CurrentSession`] - the validated session on protected routes

mod session;
mod tenant;

pub use session::CurrentSession;
