//! Tenant context extractor.
//!
//! Reads the [`TenantContext`] the request gate attached to the request.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::GatewayError;
use crate::tenant::TenantContext;

/// Extracts the resolved tenant.
///
/// Rejects with [`GatewayError::TenantNotFound`] when the gate did not attach
/// one, which only happens on public routes with an unknown host.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(tenant: TenantContext) -> String {
///     tenant.subdomain().to_string()
/// }
/// ```
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| GatewayError::tenant_not_found(""))
    }
}
