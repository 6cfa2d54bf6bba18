//! Per-request tenant context.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, header::HeaderName};

use super::config::TenantConfig;

/// Request header carrying the tenant identifier.
pub static X_TENANT_ID: HeaderName = HeaderName::from_static("x-tenant-id");

/// Request header carrying the tenant subdomain.
pub static X_TENANT_SUBDOMAIN: HeaderName = HeaderName::from_static("x-tenant-subdomain");

/// The tenant a request was resolved to.
///
/// Inserted into request extensions by the request gate and mirrored into the
/// [`X_TENANT_ID`] and [`X_TENANT_SUBDOMAIN`] request headers.
#[derive(Debug, Clone)]
pub struct TenantContext {
    config: Arc<TenantConfig>,
}

impl TenantContext {
    /// Creates a context for a registered tenant.
    pub fn new(config: Arc<TenantConfig>) -> Self {
        Self { config }
    }

    /// Tenant identifier.
    pub fn tenant_id(&self) -> &str {
        &self.config.id
    }

    /// Subdomain the request was addressed to.
    pub fn subdomain(&self) -> &str {
        &self.config.subdomain
    }

    /// The full tenant configuration.
    pub fn config(&self) -> &TenantConfig {
        &self.config
    }

    /// Writes the tenant headers, replacing any existing values.
    ///
    /// Values that are not valid header text are skipped.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(self.tenant_id()) {
            headers.insert(X_TENANT_ID.clone(), value);
        }
        if let Ok(value) = HeaderValue::from_str(self.subdomain()) {
            headers.insert(X_TENANT_SUBDOMAIN.clone(), value);
        }
    }
}

/// Removes client-supplied tenant headers.
pub fn strip_tenant_headers(headers: &mut HeaderMap) {
    headers.remove(&X_TENANT_ID);
    headers.remove(&X_TENANT_SUBDOMAIN);
}
