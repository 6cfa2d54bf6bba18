//! Gateway route table.

use axum::{Router, routing::get};

use crate::handlers;
use crate::state::AppState;

/// Creates every gateway route.
///
/// # Routes
///
/// ## Public
/// - `GET /` - Landing
/// - `GET /health`, `/_liveness`, `/_readiness` - Health checks
/// - `GET /tenant-not-found` - Unknown tenant page
///
/// ## Tenant
/// - `GET /login` - Login page
///
/// ## Auth
/// - `GET /api/auth/signin` - Start sign-in
/// - `GET /api/auth/callback` - Provider redirect target
/// - `POST /api/auth/signout` - Sign out
/// - `GET /api/auth/signout?federated=true` - Sign out of the provider too
///
/// ## Protected
/// - `GET /dashboard`, `/dashboard/{*rest}` - Dashboard shell
/// - `GET /api/session` - Session view
///
/// The request gate is layered on by [`crate::create_app`].
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::landing_handler))
        .route("/health", get(handlers::health_handler))
        .route("/_liveness", get(handlers::liveness_handler))
        .route("/_readiness", get(handlers::readiness_handler))
        .route("/tenant-not-found", get(handlers::tenant_not_found_handler))
        .route("/login", get(handlers::login_handler))
        .route("/api/auth/signin", get(handlers::signin_handler))
        .route("/api/auth/callback", get(handlers::callback_handler))
        .route(
            "/api/auth/signout",
            get(handlers::signout_handler).post(handlers::signout_handler),
        )
        .route("/dashboard", get(handlers::dashboard_handler))
        .route("/dashboard/{*rest}", get(handlers::dashboard_handler))
        .route("/api/session", get(handlers::session_handler))
        .fallback(handlers::not_found_handler)
        .with_state(state)
}
