//! Multi-tenant resolution.
//!
//! Each tenant is served from its own subdomain:
//!
//! - [`TenantResolver`] turns the request host into a subdomain
//! - [`TenantRegistry`] maps the subdomain to a [`TenantConfig`] through a
//!   TTL cache over a [`TenantStore`]
//! - [`TenantContext`] carries the result through the rest of the request
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use meddash_gateway::tenant::{InMemoryTenantStore, TenantConfig, TenantRegistry, TenantResolver};
//!
//! let registry = TenantRegistry::new(Arc::new(InMemoryTenantStore::with_tenants([
//!     TenantConfig::new("acme", "dashboard"),
//! ])));
//! let resolver = TenantResolver::new("dev");
//!
//! let subdomain = resolver.resolve("acme.example.com:443");
//! assert_eq!(subdomain.as_deref(), Some("acme"));
//! assert!(registry.is_valid("acme").await);
//! ```

mod config;
mod context;
mod registry;
mod resolver;

pub use config::{Branding, TenantConfig};
pub use context::{TenantContext, X_TENANT_ID, X_TENANT_SUBDOMAIN, strip_tenant_headers};
pub use registry::{DEFAULT_TENANT_TTL_SECS, InMemoryTenantStore, TenantRegistry, TenantStore};
pub use resolver::{TenantResolver, request_host};
