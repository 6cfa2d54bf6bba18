//! Identity claims decoding from provider-issued access tokens.
//!
//! Tokens arrive over the back-channel token endpoint, straight from the
//! provider over TLS, so the payload is read without signature verification.
//! Downstream APIs verify the bearer token themselves.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use super::set::IdentityClaims;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Deserialize)]
struct RealmAccess {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct JwtPayload {
    sub: Option<String>,
    #[serde(alias = "org_id", alias = "organization_id")]
    organisation_id: Option<String>,
    realm_access: Option<RealmAccess>,
    roles: Option<Vec<String>>,
}

/// Decodes identity claims from a JWT access token.
///
/// - `sub` becomes the user id;
/// - `organisation_id` (or `org_id` / `organization_id`) the organisation;
/// - roles come from `realm_access.roles`, falling back to a top-level `roles`.
///
/// # Errors
///
/// Returns [`AuthError::Claims`] if the token is not a three-part JWT, the
/// payload is not base64url JSON, or `sub` is missing.
pub fn decode_identity_claims(jwt: &str) -> AuthResult<IdentityClaims> {
    let mut parts = jwt.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(AuthError::Claims("token is not a JWT".into())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::Claims(format!("payload is not base64url: {e}")))?;
    let payload: JwtPayload = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::Claims(format!("payload is not JSON: {e}")))?;

    let user_id = payload
        .sub
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::Claims("missing claim: sub".into()))?;

    let roles = payload
        .realm_access
        .map(|r| r.roles)
        .or(payload.roles)
        .unwrap_or_default();

    Ok(IdentityClaims {
        user_id,
        organisation_id: payload.organisation_id,
        roles,
    })
}

/// Builds an unsigned JWT carrying `payload`.
///
/// Used by the development identity provider and by tests; real providers
/// sign their tokens.
pub fn encode_unsigned_jwt(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.")
}
