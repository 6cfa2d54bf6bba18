//! Session identity and the cookie payload.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::{IdentityClaims, TokenSet};

/// Opaque random session identifier.
///
/// Minted once at sign-in and never reused. Keys the server-side token store
/// and the per-session refresh lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mints a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the session cookie carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Session identifier.
    pub sid: SessionId,
    /// Subdomain of the tenant the session was minted for.
    pub tenant: String,
    /// Token set as of the last cookie issue.
    pub token: TokenSet,
    /// Unix second the cookie was last issued.
    pub issued_at: i64,
}

impl SessionRecord {
    /// Returns true if this record belongs to `subdomain`.
    pub fn is_for_tenant(&self, subdomain: &str) -> bool {
        self.tenant == subdomain
    }
}

/// The externally visible session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Bearer credential for API calls.
    pub access_token: String,
    /// Unix second the access token expires.
    pub expires_at: i64,
    /// Identity captured at sign-in.
    pub claims: IdentityClaims,
}

impl From<&TokenSet> for SessionView {
    fn from(token: &TokenSet) -> Self {
        Self {
            access_token: token.access_token().to_string(),
            expires_at: token.expires_at(),
            claims: token.claims().clone(),
        }
    }
}
