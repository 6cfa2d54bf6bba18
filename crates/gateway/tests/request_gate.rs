//! Integration tests for the request gate and the sign-in flow.
//!
//! Every request is addressed by `Host` header; the tenant is the leftmost
//! label. Redirects are not followed, so each hop is asserted explicitly.

mod common;

use axum::Router;
use axum::http::{
    HeaderMap, HeaderName, StatusCode,
    header::{HOST, SET_COOKIE},
};
use axum::routing::get;
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use meddash_auth::token::encode_unsigned_jwt;
use meddash_gateway::middleware::request_gate;
use meddash_gateway::tenant::{X_TENANT_ID, X_TENANT_SUBDOMAIN};

// =============================================================================
// Route classification
// =============================================================================

mod classification {
    use super::*;

    #[tokio::test]
    async fn test_static_asset_passes_through_without_tenant() {
        let server = server(dev_state());

        let response = server
            .get("/_next/static/chunk.js")
            .add_header(HOST, host(UNKNOWN_HOST))
            .await;

        // reached the router fallback: no redirect, no tenant work
        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.maybe_cookie("tenant").is_none());
    }

    #[tokio::test]
    async fn test_public_route_on_unknown_tenant_is_not_redirected() {
        let server = server(dev_state());

        let response = server.get("/").add_header(HOST, host(UNKNOWN_HOST)).await;

        response.assert_status_ok();
        assert!(response.maybe_cookie("tenant").is_none());
        let body: Value = response.json();
        assert_eq!(body["tenant"], Value::Null);
    }

    #[tokio::test]
    async fn test_public_route_on_known_tenant_sets_cookie() {
        let server = server(dev_state());

        let response = server.get("/").add_header(HOST, host(ACME_HOST)).await;

        response.assert_status_ok();
        let cookie = response.cookie("tenant");
        assert_eq!(cookie.value(), "acme");
        assert_ne!(cookie.http_only(), Some(true));
        let body: Value = response.json();
        assert_eq!(body["tenant"]["branding"]["appName"], "Acme Training");
        assert_eq!(body["tenant"]["features"]["reports"], true);
    }

    #[tokio::test]
    async fn test_unknown_tenant_redirects_to_not_found() {
        let server = server(dev_state());

        let response = server
            .get("/login")
            .add_header(HOST, host(UNKNOWN_HOST))
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/tenant-not-found");
    }

    #[tokio::test]
    async fn test_www_host_has_no_tenant() {
        let server = server(dev_state());

        let response = server
            .get("/dashboard")
            .add_header(HOST, host("www.meddash.test"))
            .await;

        assert_eq!(location(&response), "/tenant-not-found");
    }

    #[tokio::test]
    async fn test_tenant_not_found_page() {
        let server = server(dev_state());

        let response = server
            .get("/tenant-not-found")
            .add_header(HOST, host(UNKNOWN_HOST))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"], "tenant-not-found");
    }

    #[tokio::test]
    async fn test_protected_route_without_session_redirects_to_login() {
        let server = server(dev_state());

        let response = server
            .get("/dashboard/cases")
            .add_header(HOST, host(ACME_HOST))
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?callbackUrl=%2Fdashboard%2Fcases");
        assert_eq!(response.cookie("tenant").value(), "acme");
    }

    #[tokio::test]
    async fn test_login_page_echoes_error() {
        let server = server(dev_state());

        let response = server
            .get("/login")
            .add_query_param("error", "SessionExpired")
            .add_header(HOST, host(ACME_HOST))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["error"], "SessionExpired");
        assert_eq!(body["tenant"]["subdomain"], "acme");
        assert_eq!(body["signInUrl"], "/api/auth/signin");
    }
}

// =============================================================================
// Tenant headers
// =============================================================================

mod tenant_headers {
    use super::*;

    async fn echo(headers: HeaderMap) -> axum::Json<Value> {
        let value = |name: &HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        axum::Json(json!({
            "id": value(&X_TENANT_ID),
            "subdomain": value(&X_TENANT_SUBDOMAIN),
        }))
    }

    fn echo_server() -> axum_test::TestServer {
        let state = dev_state();
        let router = Router::new()
            .route("/", get(echo))
            .route("/echo", get(echo))
            .layer(axum::middleware::from_fn_with_state(state, request_gate));
        router_server(router)
    }

    #[tokio::test]
    async fn test_gate_sets_tenant_headers() {
        let server = echo_server();

        let response = server.get("/echo").add_header(HOST, host(ACME_HOST)).await;

        let body: Value = response.json();
        assert_eq!(body["id"], "tenant-acme");
        assert_eq!(body["subdomain"], "acme");
    }

    #[tokio::test]
    async fn test_client_supplied_headers_are_replaced() {
        let server = echo_server();

        let response = server
            .get("/echo")
            .add_header(HOST, host(ACME_HOST))
            .add_header(X_TENANT_ID.clone(), host("tenant-globex"))
            .await;

        let body: Value = response.json();
        assert_eq!(body["id"], "tenant-acme");
    }

    #[tokio::test]
    async fn test_client_supplied_headers_are_removed_without_tenant() {
        let server = echo_server();

        let response = server
            .get("/")
            .add_header(HOST, host(UNKNOWN_HOST))
            .add_header(X_TENANT_ID.clone(), host("tenant-acme"))
            .add_header(X_TENANT_SUBDOMAIN.clone(), host("acme"))
            .await;

        let body: Value = response.json();
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["subdomain"], Value::Null);
    }
}

// =============================================================================
// Sign-in flow (dev identity provider)
// =============================================================================

mod dev_flow {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_then_dashboard() {
        let server = server(dev_state());

        let callback = dev_sign_in(&server, ACME_HOST).await;
        callback.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&callback), "/dashboard/cases");
        assert_eq!(callback.cookie("tenant").value(), "acme");
        let session = session_cookies(&callback);
        assert_eq!(session.len(), 1);
        assert_eq!(session[0].name(), SESSION_CHUNK);
        assert_eq!(session[0].http_only(), Some(true));

        let dashboard = with_cookies(
            server.get("/dashboard/cases").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        dashboard.assert_status_ok();
        let body: Value = dashboard.json();
        assert_eq!(body["user"]["userId"], "dev-user");
        assert_eq!(body["user"]["organisationId"], "acme-org");
        assert_eq!(body["user"]["roles"], json!(["trainer"]));
        assert_eq!(body["tenant"]["subdomain"], "acme");

        let api = with_cookies(
            server.get("/api/session").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        api.assert_status_ok();
        let view: Value = api.json();
        assert!(view["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(view["claims"]["userId"], "dev-user");
    }

    #[tokio::test]
    async fn test_callback_rejects_state_mismatch() {
        let server = server(dev_state());

        let start = server
            .get("/api/auth/signin")
            .add_header(HOST, host(ACME_HOST))
            .await;
        let auth_state = start.cookie(AUTH_STATE_COOKIE);

        let response = server
            .get("/api/auth/callback")
            .add_query_param("code", "dev")
            .add_query_param("state", "forged")
            .add_header(HOST, host(ACME_HOST))
            .add_cookie(auth_state)
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?error=OAuthCallback");
        assert!(session_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_callback_without_state_cookie() {
        let server = server(dev_state());

        let response = server
            .get("/api/auth/callback")
            .add_query_param("code", "dev")
            .add_query_param("state", "anything")
            .add_header(HOST, host(ACME_HOST))
            .await;

        assert_eq!(location(&response), "/login?error=OAuthCallback");
    }

    #[tokio::test]
    async fn test_callback_provider_error() {
        let server = server(dev_state());

        let response = server
            .get("/api/auth/callback")
            .add_query_param("error", "access_denied")
            .add_header(HOST, host(ACME_HOST))
            .await;

        assert_eq!(location(&response), "/login?error=AccessDenied");
    }

    #[tokio::test]
    async fn test_signin_for_unknown_tenant() {
        let server = server(dev_state());

        let response = server
            .get("/api/auth/signin")
            .add_header(HOST, host(UNKNOWN_HOST))
            .await;

        assert_eq!(location(&response), "/login?error=Configuration");
    }

    #[tokio::test]
    async fn test_external_callback_url_is_ignored() {
        let server = server(dev_state());

        let start = server
            .get("/api/auth/signin")
            .add_query_param("callbackUrl", "https://evil.example/phish")
            .add_header(HOST, host(ACME_HOST))
            .await;
        let auth_state = start.cookie(AUTH_STATE_COOKIE);

        let callback = server
            .get(&local_target(&location(&start)))
            .add_header(HOST, host(ACME_HOST))
            .add_cookie(auth_state)
            .await;

        assert_eq!(location(&callback), "/dashboard");
    }

    #[tokio::test]
    async fn test_session_for_other_tenant_is_ignored() {
        let server = server(dev_state());
        let session = session_cookies(&dev_sign_in(&server, ACME_HOST).await);

        let response = with_cookies(
            server.get("/dashboard").add_header(HOST, host(GLOBEX_HOST)),
            &session,
        )
        .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?callbackUrl=%2Fdashboard");
        assert_eq!(response.cookie("tenant").value(), "globex");
    }

    #[tokio::test]
    async fn test_sign_out_revokes_session() {
        let server = server(dev_state());
        let session = session_cookies(&dev_sign_in(&server, ACME_HOST).await);

        let response = with_cookies(
            server.post("/api/auth/signout").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert_eq!(response.cookie(SESSION_CHUNK).value(), "");

        // replaying the old cookie does not resurrect the session
        let replay = with_cookies(
            server.get("/dashboard").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        assert_eq!(location(&replay), "/login?callbackUrl=%2Fdashboard");
    }

    #[tokio::test]
    async fn test_federated_sign_out_redirects_to_end_session() {
        let server = server(dev_state());
        let session = session_cookies(&dev_sign_in(&server, ACME_HOST).await);

        let response = with_cookies(
            server
                .get("/api/auth/signout")
                .add_query_param("federated", "true")
                .add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "http://acme.meddash.test/login");
    }

    #[tokio::test]
    async fn test_local_sign_out_link_is_refused() {
        let server = server(dev_state());
        let session = session_cookies(&dev_sign_in(&server, ACME_HOST).await);

        let response = with_cookies(
            server.get("/api/auth/signout").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.maybe_cookie(SESSION_CHUNK).is_none());

        let dashboard = with_cookies(
            server.get("/dashboard").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        dashboard.assert_status_ok();
    }

    #[tokio::test]
    async fn test_sign_out_without_session() {
        let server = server(dev_state());

        let response = server
            .post("/api/auth/signout")
            .add_header(HOST, host(ACME_HOST))
            .await;

        assert_eq!(location(&response), "/login");
    }
}

// =============================================================================
// Sign-in flow (OIDC provider)
// =============================================================================

mod oidc_flow {
    use super::*;

    const TOKEN_PATH: &str = "/realms/acme/protocol/openid-connect/token";
    const LOGOUT_PATH: &str = "/realms/acme/protocol/openid-connect/logout";

    fn access_token() -> String {
        encode_unsigned_jwt(&json!({
            "sub": "user-42",
            "organisation_id": "org-7",
            "realm_access": { "roles": ["viewer"] },
        }))
    }

    async fn mount_code_exchange(idp: &MockServer, expires_in: u64) {
        mount_token_grant(
            idp,
            json!({
                "access_token": access_token(),
                "refresh_token": "R1",
                "id_token": "id-1",
                "expires_in": expires_in,
            }),
        )
        .await;
    }

    async fn mount_token_grant(idp: &MockServer, grant: Value) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("client_secret=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant))
            .expect(1)
            .mount(idp)
            .await;
    }

    async fn sign_in(server: &axum_test::TestServer, idp: &MockServer) -> axum_test::TestResponse {
        let start = server
            .get("/api/auth/signin")
            .add_header(HOST, host(ACME_HOST))
            .await;
        let authorize = location(&start);
        assert!(authorize.starts_with(&format!(
            "{}/realms/acme/protocol/openid-connect/auth?",
            idp.uri()
        )));
        assert!(authorize.contains("client_id=meddash"));

        server
            .get("/api/auth/callback")
            .add_query_param("code", "abc")
            .add_query_param("state", state_param(&authorize))
            .add_header(HOST, host(ACME_HOST))
            .add_cookie(start.cookie(AUTH_STATE_COOKIE))
            .await
    }

    #[tokio::test]
    async fn test_long_lived_token_serves_dashboard() {
        let idp = MockServer::start().await;
        mount_code_exchange(&idp, 3600).await;
        let server = server(keycloak_state(&idp.uri()));

        let session = session_cookies(&sign_in(&server, &idp).await);

        let response = with_cookies(
            server.get("/dashboard").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["user"]["userId"], "user-42");
    }

    #[tokio::test]
    async fn test_provider_sized_tokens_fit_in_cookies() {
        let idp = MockServer::start().await;
        mount_token_grant(
            &idp,
            json!({
                "access_token": encode_unsigned_jwt(&json!({
                    "sub": "user-42",
                    "organisation_id": "org-7",
                    "realm_access": { "roles": ["viewer"] },
                    "resource_access": { "meddash": { "roles": ["x".repeat(1400)] } },
                })),
                "refresh_token": "R".repeat(800),
                "id_token": "I".repeat(1300),
                "expires_in": 3600,
            }),
        )
        .await;
        let server = server(keycloak_state(&idp.uri()));

        let callback = sign_in(&server, &idp).await;
        callback.assert_status(StatusCode::SEE_OTHER);
        for header in callback.headers().get_all(SET_COOKIE) {
            assert!(header.len() < 4096, "Set-Cookie is {} bytes", header.len());
        }
        let session = session_cookies(&callback);
        assert!(session.len() > 1);

        let response = with_cookies(
            server.get("/dashboard").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["user"]["userId"], "user-42");
    }

    #[tokio::test]
    async fn test_failed_refresh_forces_sign_in() {
        let idp = MockServer::start().await;
        // inside the refresh grace window from the start
        mount_code_exchange(&idp, 30).await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .expect(1)
            .mount(&idp)
            .await;
        Mock::given(method("POST"))
            .and(path(LOGOUT_PATH))
            .and(body_string_contains("id_token_hint=id-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&idp)
            .await;
        let server = server(keycloak_state(&idp.uri()));

        let session = session_cookies(&sign_in(&server, &idp).await);

        let response = with_cookies(
            server.get("/dashboard").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?error=SessionExpired");
        assert_eq!(response.cookie(SESSION_CHUNK).value(), "");

        // the session is gone; no second refresh is attempted
        let replay = with_cookies(
            server.get("/dashboard").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        assert_eq!(location(&replay), "/login?callbackUrl=%2Fdashboard");
    }

    #[tokio::test]
    async fn test_successful_refresh_reissues_cookie() {
        let idp = MockServer::start().await;
        mount_code_exchange(&idp, 30).await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=R1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": encode_unsigned_jwt(&json!({"sub": "user-42", "jti": "T2"})),
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&idp)
            .await;
        let server = server(keycloak_state(&idp.uri()));

        let session = session_cookies(&sign_in(&server, &idp).await);

        let first = with_cookies(
            server.get("/api/session").add_header(HOST, host(ACME_HOST)),
            &session,
        )
        .await;
        first.assert_status_ok();
        let reissued = session_cookies(&first);
        assert!(!reissued.is_empty());
        let view: Value = first.json();
        // claims captured at sign-in survive the refresh
        assert_eq!(view["claims"]["organisationId"], "org-7");

        let second = with_cookies(
            server.get("/api/session").add_header(HOST, host(ACME_HOST)),
            &reissued,
        )
        .await;
        second.assert_status_ok();
        assert!(session_cookies(&second).is_empty());
        let second_view: Value = second.json();
        assert_eq!(second_view["accessToken"], view["accessToken"]);
    }
}

// =============================================================================
// Health
// =============================================================================

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_without_tenant() {
        let server = server(dev_state());

        let response = server.get("/health").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["identityProvider"], "dev");
    }

    #[tokio::test]
    async fn test_liveness_and_readiness() {
        let server = server(dev_state());

        server.get("/_liveness").await.assert_status_ok();

        let readiness = server.get("/_readiness").await;
        readiness.assert_status_ok();
        let body: Value = readiness.json();
        assert_eq!(body["checks"]["tenants"], 2);
    }
}
