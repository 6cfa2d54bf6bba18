//! Page handlers.
//!
//! The dashboard front end renders these JSON shells; the gateway only
//! supplies tenant branding and identity.

use axum::{
    Extension, Json,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::extractors::CurrentSession;
use crate::tenant::TenantContext;

fn tenant_json(tenant: &TenantContext) -> Value {
    let config = tenant.config();
    json!({
        "id": config.id,
        "subdomain": config.subdomain,
        "branding": config.branding,
        "features": config.features,
    })
}

/// `GET /`
///
/// Public. Includes the tenant only when the host resolved to one.
pub async fn landing_handler(tenant: Option<Extension<TenantContext>>) -> Json<Value> {
    let tenant = tenant.map(|Extension(tenant)| tenant_json(&tenant));
    Json(json!({
        "app": "meddash",
        "tenant": tenant,
    }))
}

/// `GET /tenant-not-found`
pub async fn tenant_not_found_handler() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "tenant-not-found",
            "message": "This organisation is not registered."
        })),
    )
        .into_response()
}

/// Query parameters of the login page.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    /// Error code from a failed or expired session.
    pub error: Option<String>,
    /// Where to go after signing in.
    pub callback_url: Option<String>,
}

/// `GET /login`
pub async fn login_handler(tenant: TenantContext, Query(query): Query<LoginQuery>) -> Json<Value> {
    let sign_in_url = match &query.callback_url {
        Some(callback) => format!(
            "/api/auth/signin?callbackUrl={}",
            urlencoding::encode(callback)
        ),
        None => "/api/auth/signin".to_string(),
    };
    Json(json!({
        "tenant": tenant_json(&tenant),
        "signInUrl": sign_in_url,
        "error": query.error,
        "callbackUrl": query.callback_url,
    }))
}

/// `GET /dashboard` and everything below it.
pub async fn dashboard_handler(tenant: TenantContext, session: CurrentSession) -> Json<Value> {
    Json(json!({
        "tenant": tenant_json(&tenant),
        "user": session.claims,
        "expiresAt": session.expires_at,
    }))
}

/// `GET /api/session`
pub async fn session_handler(session: CurrentSession) -> Json<meddash_auth::session::SessionView> {
    Json(session.into_inner())
}

/// Fallback for unmatched routes.
pub async fn not_found_handler() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not-found",
            "message": "No such page."
        })),
    )
        .into_response()
}
