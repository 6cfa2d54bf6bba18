//! The session token set and its transition rules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sticky failure flag carried on a [`TokenSet`].
///
/// Once set, the token set must never authorize a request again; the only
/// valid transition is sign-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenError {
    /// A refresh against the identity provider failed.
    RefreshAccessTokenError,
    /// The token set is structurally incomplete (no access token or user id).
    InvalidToken,
}

impl TokenError {
    /// Returns the wire name of this error.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenError::RefreshAccessTokenError => "RefreshAccessTokenError",
            TokenError::InvalidToken => "InvalidToken",
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity claims captured at sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    /// Provider subject of the signed-in user.
    pub user_id: String,
    /// Organisation the user belongs to, if the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation_id: Option<String>,
    /// Roles in provider order.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl IdentityClaims {
    /// Creates claims for a user with no organisation and no roles.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            organisation_id: None,
            roles: Vec::new(),
        }
    }

    /// Sets the organisation id.
    #[must_use]
    pub fn with_organisation(mut self, organisation_id: impl Into<String>) -> Self {
        self.organisation_id = Some(organisation_id.into());
        self
    }

    /// Sets the roles.
    #[must_use]
    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the user holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// The credentials and identity of one signed-in session.
///
/// Fields are private so the invariants hold by construction:
///
/// - the access token and its expiry only change together, through
///   [`TokenSet::refreshed`];
/// - identity claims are fixed when the set is created and every transition
///   carries them forward;
/// - a refresh that does not rotate the refresh token keeps the old one;
/// - the error flag can be set but never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
    expires_at: i64,
    #[serde(flatten)]
    claims: IdentityClaims,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<TokenError>,
}

impl TokenSet {
    /// Creates a token set at initial sign-in.
    pub fn new(access_token: impl Into<String>, expires_at: i64, claims: IdentityClaims) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            id_token: None,
            expires_at,
            claims,
            error: None,
        }
    }

    /// Attaches a refresh token at creation time.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Attaches an id token at creation time.
    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Bearer credential for API calls.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Credential used to mint a new access token, if any.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Id token used as the logout hint, if any.
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    /// Unix second at which the access token becomes invalid.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Identity claims from sign-in.
    pub fn claims(&self) -> &IdentityClaims {
        &self.claims
    }

    /// The sticky failure flag.
    pub fn error(&self) -> Option<TokenError> {
        self.error
    }

    /// Returns true if the error flag is set.
    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }

    /// Returns true if the set carries both an access token and a user id.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.claims.user_id.is_empty()
    }

    /// Produces the successor of a successful refresh.
    ///
    /// `refresh_token` and `id_token` replace the stored values only when the
    /// provider rotated them.
    #[must_use]
    pub fn refreshed(
        &self,
        access_token: String,
        expires_at: i64,
        refresh_token: Option<String>,
        id_token: Option<String>,
    ) -> Self {
        Self {
            access_token,
            expires_at,
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            id_token: id_token.or_else(|| self.id_token.clone()),
            claims: self.claims.clone(),
            error: None,
        }
    }

    /// Returns a copy with the error flag set, everything else unchanged.
    ///
    /// An already errored set keeps its original error.
    #[must_use]
    pub fn with_error(&self, error: TokenError) -> Self {
        Self {
            error: Some(self.error.unwrap_or(error)),
            ..self.clone()
        }
    }
}
