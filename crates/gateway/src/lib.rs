//! # meddash-gateway - Tenant-aware HTTP gateway
//!
//! Serves the multi-tenant dashboard. Every tenant lives on its own
//! subdomain; the gateway works out which tenant a request is for, guards
//! the protected pages with an OIDC session and runs the sign-in flow against
//! the tenant's identity realm.
//!
//! ## Request flow
//!
//! 1. [`tenant::TenantResolver`] extracts the subdomain from the host
//! 2. [`tenant::TenantRegistry`] looks the subdomain up (TTL cached)
//! 3. [`middleware::request_gate`] classifies the route and redirects when
//!    the tenant or the session is missing
//! 4. handlers read the result through [`tenant::TenantContext`] and
//!    [`extractors::CurrentSession`]
//!
//! Sessions themselves are managed by `meddash-auth`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use meddash_gateway::{AppState, ServerConfig, create_app};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env();
//!     let state = AppState::from_config(config.clone())?;
//!     let app = create_app(state);
//!
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod state;
pub mod tenant;

pub use config::{IdentityBackend, RouteConfig, ServerConfig};
pub use error::{GatewayError, GatewayResult};
pub use state::AppState;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application.
///
/// Routes, then the request gate, then CORS when enabled, then tracing and
/// the request timeout.
pub fn create_app(state: AppState) -> Router {
    let config = state.config().clone();
    info!(
        identity_provider = state.sessions().provider().name(),
        production = config.production,
        "Creating gateway"
    );

    let router = routing::create_routes(state.clone()).layer(
        axum::middleware::from_fn_with_state(state, middleware::request_gate),
    );

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(config.request_timeout),
        ));

    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// Call once at startup. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "meddash_gateway={level},meddash_auth={level},meddash={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
