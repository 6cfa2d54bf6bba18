//! Shared fixtures for the gateway integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, header::LOCATION};
use axum_extra::extract::cookie::Cookie;
use axum_test::{TestRequest, TestResponse, TestServer};
use url::Url;

use meddash_auth::provider::{DevIdentityProvider, OidcProvider, SharedProvider};
use meddash_auth::session::{InMemorySessionStore, SessionController};
use meddash_gateway::config::IdentityBackend;
use meddash_gateway::tenant::{Branding, InMemoryTenantStore, TenantConfig, TenantRegistry};
use meddash_gateway::{AppState, ServerConfig, create_app};

pub const ACME_HOST: &str = "acme.meddash.test";
pub const GLOBEX_HOST: &str = "globex.meddash.test";
pub const UNKNOWN_HOST: &str = "ghost.meddash.test";
pub const SESSION_COOKIE: &str = "__meddash_session";
pub const SESSION_CHUNK: &str = "__meddash_session.0";
pub const AUTH_STATE_COOKIE: &str = "__meddash_auth_state";

pub fn acme() -> TenantConfig {
    TenantConfig::new("acme", "meddash")
        .with_id("tenant-acme")
        .with_client_secret("s3cret")
        .with_branding(Branding {
            logo: "https://cdn.meddash.test/acme.svg".into(),
            primary_color: "#0055aa".into(),
            app_name: "Acme Training".into(),
        })
        .with_feature("reports", true)
}

pub fn globex() -> TenantConfig {
    TenantConfig::new("globex", "meddash").with_id("tenant-globex")
}

pub fn host(value: &'static str) -> HeaderValue {
    HeaderValue::from_static(value)
}

/// Builds state for the given provider with acme and globex registered.
pub fn state_with(provider: SharedProvider, config: ServerConfig) -> AppState {
    let registry = TenantRegistry::new(Arc::new(InMemoryTenantStore::with_tenants([
        acme(),
        globex(),
    ])));
    let sessions = SessionController::new(provider, Arc::new(InMemorySessionStore::new()));
    AppState::new(config, registry, sessions).expect("Failed to create app state")
}

/// A gateway using the in-process dev identity provider.
pub fn dev_state() -> AppState {
    let provider = DevIdentityProvider::new("dev-user")
        .with_organisation("acme-org")
        .with_roles(vec!["trainer".into()]);
    state_with(Arc::new(provider), ServerConfig::for_testing())
}

/// A gateway talking OIDC to `identity_base_url`.
pub fn keycloak_state(identity_base_url: &str) -> AppState {
    let config = ServerConfig {
        identity_backend: IdentityBackend::Keycloak,
        identity_base_url: identity_base_url.to_string(),
        ..ServerConfig::for_testing()
    };
    let provider = OidcProvider::new(Duration::from_secs(2)).expect("Failed to create provider");
    state_with(Arc::new(provider), config)
}

pub fn server(state: AppState) -> TestServer {
    TestServer::new(create_app(state)).expect("Failed to create test server")
}

pub fn router_server(router: Router) -> TestServer {
    TestServer::new(router).expect("Failed to create test server")
}

pub fn location(response: &TestResponse) -> String {
    response
        .headers()
        .get(LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// The live session chunks a response set, in order.
pub fn session_cookies(response: &TestResponse) -> Vec<Cookie<'static>> {
    let prefix = format!("{SESSION_COOKIE}.");
    let mut chunks: Vec<_> = response
        .cookies()
        .iter()
        .filter(|c| c.name().starts_with(&prefix) && !c.value().is_empty())
        .cloned()
        .collect();
    chunks.sort_by(|a, b| a.name().cmp(b.name()));
    chunks
}

/// Adds every cookie in `cookies` to `request`.
pub fn with_cookies(request: TestRequest, cookies: &[Cookie<'static>]) -> TestRequest {
    cookies
        .iter()
        .cloned()
        .fold(request, |request, cookie| request.add_cookie(cookie))
}

/// Path and query of an absolute redirect target.
pub fn local_target(location: &str) -> String {
    let url = Url::parse(location).unwrap();
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

/// The `state` parameter of an authorization redirect.
pub fn state_param(location: &str) -> String {
    Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("authorization redirect without state")
}

/// Runs the dev sign-in flow on `tenant_host` and returns the callback response.
pub async fn dev_sign_in(server: &TestServer, tenant_host: &'static str) -> TestResponse {
    let start = server
        .get("/api/auth/signin")
        .add_query_param("callbackUrl", "/dashboard/cases")
        .add_header(axum::http::header::HOST, host(tenant_host))
        .await;
    assert_eq!(start.status_code(), axum::http::StatusCode::SEE_OTHER);
    let auth_state = start.cookie(AUTH_STATE_COOKIE);

    server
        .get(&local_target(&location(&start)))
        .add_header(axum::http::header::HOST, host(tenant_host))
        .add_cookie(auth_state)
        .await
}
