//! Cookie builders and readers.
//!
//! The session record and the sign-in state travel in private (encrypted and
//! authenticated) cookies. The session record is split across numbered
//! chunks (`<name>.0`, `<name>.1`, ...) because its tokens outgrow a single
//! cookie. The tenant cookie is plain and readable by client-side code.

use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use meddash_auth::session::SessionRecord;
use serde::{Deserialize, Serialize};
use time::Duration;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

/// Name of the client-readable tenant cookie.
pub const TENANT_COOKIE_NAME: &str = "tenant";

const AUTH_STATE_COOKIE_NAME: &str = "__meddash_auth_state";
const AUTH_STATE_PATH: &str = "/api/auth";

/// Create the tenant cookie: readable by scripts, one year.
pub fn tenant_cookie(subdomain: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((TENANT_COOKIE_NAME, subdomain.to_string()))
        .http_only(false)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(365))
        .build()
}

/// Plaintext bytes per session chunk. Encrypted and base64 encoded, a chunk
/// stays well under the 4096 bytes browsers accept per cookie.
const SESSION_CHUNK_BYTES: usize = 2400;

/// Upper bound on chunks per session.
const MAX_SESSION_CHUNKS: usize = 8;

/// Name of the `index`th session chunk, e.g. `__meddash_session.0`.
pub fn session_chunk_name(name: &str, index: usize) -> String {
    format!("{name}.{index}")
}

/// Splits `value` into pieces of at most `max` bytes, on char boundaries.
fn split_chunks(value: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = value;
    while !rest.is_empty() {
        let mut end = max.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// Store `record` in the jar as numbered session chunks.
///
/// Chunks left over from a longer earlier record are removed.
pub fn write_session(
    jar: PrivateCookieJar,
    name: &str,
    record: &SessionRecord,
    max_age_days: u32,
    secure: bool,
) -> GatewayResult<PrivateCookieJar> {
    let value = serde_json::to_string(record)
        .map_err(|e| GatewayError::internal(format!("cannot encode session: {e}")))?;
    let chunks = split_chunks(&value, SESSION_CHUNK_BYTES);
    if chunks.len() > MAX_SESSION_CHUNKS {
        return Err(GatewayError::internal(format!(
            "session is {} bytes, too large for {MAX_SESSION_CHUNKS} cookies",
            value.len()
        )));
    }

    let mut jar = jar;
    for (index, chunk) in chunks.iter().enumerate() {
        jar = jar.add(
            Cookie::build((session_chunk_name(name, index), chunk.to_string()))
                .http_only(true)
                .secure(secure)
                .same_site(SameSite::Lax)
                .path("/")
                .max_age(Duration::days(i64::from(max_age_days)))
                .build(),
        );
    }
    for index in chunks.len()..MAX_SESSION_CHUNKS {
        let chunk_name = session_chunk_name(name, index);
        if jar.get(&chunk_name).is_some() {
            jar = jar.remove(removal(chunk_name));
        }
    }
    Ok(jar)
}

/// Remove every session chunk.
///
/// The first chunk is always removed, even when it did not decrypt.
pub fn clear_session(jar: PrivateCookieJar, name: &str) -> PrivateCookieJar {
    let mut jar = jar.remove(removal(session_chunk_name(name, 0)));
    for index in 1..MAX_SESSION_CHUNKS {
        let chunk_name = session_chunk_name(name, index);
        if jar.get(&chunk_name).is_some() {
            jar = jar.remove(removal(chunk_name));
        }
    }
    jar
}

fn removal(name: String) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// Reassemble and decode the session record.
///
/// Chunks that fail to decrypt are already dropped by the jar. A missing
/// chunk or a value that does not parse makes the session absent.
pub fn read_session(jar: &PrivateCookieJar, name: &str) -> Option<SessionRecord> {
    let mut value = String::new();
    for index in 0..MAX_SESSION_CHUNKS {
        match jar.get(&session_chunk_name(name, index)) {
            Some(chunk) => value.push_str(chunk.value()),
            None => break,
        }
    }
    if value.is_empty() {
        return None;
    }
    match serde_json::from_str(&value) {
        Ok(record) => Some(record),
        Err(e) => {
            debug!(error = %e, "Ignoring undecodable session cookie");
            None
        }
    }
}

/// Sign-in flow state kept between `/api/auth/signin` and the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthFlowState {
    /// Anti-forgery value echoed back by the identity provider.
    pub state: String,
    /// Where to send the user after sign-in.
    pub callback_url: String,
}

/// Create the short-lived sign-in state cookie.
pub fn auth_state_cookie(flow: &AuthFlowState, secure: bool) -> GatewayResult<Cookie<'static>> {
    let value = serde_json::to_string(flow)
        .map_err(|e| GatewayError::internal(format!("cannot encode sign-in state: {e}")))?;
    Ok(Cookie::build((AUTH_STATE_COOKIE_NAME, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(AUTH_STATE_PATH)
        .max_age(Duration::minutes(10))
        .build())
}

/// Create the removal cookie for the sign-in state.
pub fn clear_auth_state_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_STATE_COOKIE_NAME, ""))
        .path(AUTH_STATE_PATH)
        .build()
}

/// Get the sign-in state from cookies.
pub fn read_auth_state(jar: &PrivateCookieJar) -> Option<AuthFlowState> {
    jar.get(AUTH_STATE_COOKIE_NAME)
        .and_then(|c| serde_json::from_str(c.value()).ok())
}
