//! Shared fixtures for the identity-provider integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meddash_auth::clock::ManualClock;
use meddash_auth::provider::{OidcProvider, RealmBinding};
use meddash_auth::session::{InMemorySessionStore, SessionController};
use meddash_auth::token::encode_unsigned_jwt;

pub const REALM: &str = "acme";
pub const CLIENT_ID: &str = "meddash";
pub const CLIENT_SECRET: &str = "s3cret";
pub const T0: i64 = 1_700_000_000;

pub const TOKEN_PATH: &str = "/realms/acme/protocol/openid-connect/token";
pub const LOGOUT_PATH: &str = "/realms/acme/protocol/openid-connect/logout";

/// Binds the test realm to a running mock server.
pub fn realm(server: &MockServer) -> RealmBinding {
    RealmBinding::for_realm(&server.uri(), REALM, CLIENT_ID, CLIENT_SECRET).unwrap()
}

/// An access token carrying the test user's identity.
pub fn access_token(label: &str) -> String {
    encode_unsigned_jwt(&json!({
        "sub": "user-42",
        "organisation_id": "org-7",
        "realm_access": { "roles": ["trainer", "viewer"] },
        "jti": label,
    }))
}

/// Token endpoint body.
pub fn token_body(access: &str, refresh: Option<&str>, expires_in: u64) -> Value {
    let mut body = json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": expires_in,
        "id_token": "id-token-1",
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
    }
    body
}

/// Mounts a successful authorization-code exchange.
pub async fn mount_code_exchange(server: &MockServer, refresh: &str, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body(
                &access_token("initial"),
                Some(refresh),
                expires_in,
            )),
        )
        .mount(server)
        .await;
}

/// A controller backed by a real OIDC binding and a manual clock.
pub fn controller(clock: &ManualClock) -> SessionController {
    SessionController::new(
        Arc::new(OidcProvider::with_http_client(reqwest::Client::new())),
        Arc::new(InMemorySessionStore::new()),
    )
    .with_clock(Arc::new(clock.clone()))
}
