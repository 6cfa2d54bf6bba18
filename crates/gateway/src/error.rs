//! Error types for the gateway.
//!
//! Handler errors render as a JSON body with an HTTP status:
//!
//! | Error | HTTP Status | Code |
//! |-------|-------------|------|
//! | TenantNotFound | 404 | tenant-not-found |
//! | Unauthenticated | 401 | unauthenticated |
//! | BadRequest | 400 | invalid |
//! | Auth (provider failure) | 502 | identity-provider |
//! | Auth / Config / Internal | 500 | exception |
//!
//! Failures inside the `/api/auth` flow do not use this rendering; those
//! handlers redirect to `/login?error=<code>` instead.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meddash_auth::AuthError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// The primary error type for gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No registered tenant for the request host.
    #[error("no tenant is registered for '{subdomain}'")]
    TenantNotFound {
        /// The subdomain that was looked up, empty if none resolved.
        subdomain: String,
    },

    /// A protected handler ran without a session.
    #[error("authentication required")]
    Unauthenticated,

    /// Malformed client input.
    #[error("{message}")]
    BadRequest {
        /// What was wrong.
        message: String,
    },

    /// A session-layer operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Startup configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl GatewayError {
    /// Creates a tenant-not-found error.
    pub fn tenant_not_found(subdomain: impl Into<String>) -> Self {
        GatewayError::TenantNotFound {
            subdomain: subdomain.into(),
        }
    }

    /// Creates a bad-request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        GatewayError::BadRequest {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal {
            message: message.into(),
        }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::TenantNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GatewayError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            GatewayError::Auth(AuthError::Provider(_)) => StatusCode::BAD_GATEWAY,
            GatewayError::Auth(_) | GatewayError::Config(_) | GatewayError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable code for the JSON body.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::TenantNotFound { .. } => "tenant-not-found",
            GatewayError::Unauthenticated => "unauthenticated",
            GatewayError::BadRequest { .. } => "invalid",
            GatewayError::Auth(AuthError::Provider(_)) => "identity-provider",
            _ => "exception",
        }
    }

    /// Returns true for faults that should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
