//! Wire types for the identity provider contract.

use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// The realm-level client binding a tenant uses to talk to the provider.
///
/// `issuer` is the realm base, e.g. `https://id.example.com/realms/acme`;
/// every OIDC endpoint hangs off `{issuer}/protocol/openid-connect/`.
#[derive(Clone)]
pub struct RealmBinding {
    issuer: Url,
    client_id: String,
    client_secret: String,
}

impl RealmBinding {
    /// Creates a binding for one realm client.
    pub fn new(issuer: Url, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            issuer,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Builds `{base}/realms/{realm}` and binds the client to it.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Endpoint`] if the resulting issuer is not a URL.
    pub fn for_realm(
        base_url: &str,
        realm: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> ProviderResult<Self> {
        let issuer = Url::parse(&format!(
            "{}/realms/{}",
            base_url.trim_end_matches('/'),
            urlencoding_path(realm)
        ))?;
        Ok(Self::new(issuer, client_id, client_secret))
    }

    /// The realm issuer URL.
    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    /// OAuth2 client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// OAuth2 client secret.
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns `{issuer}/protocol/openid-connect/{name}`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Endpoint`] if the URL cannot be built.
    pub fn endpoint(&self, name: &str) -> ProviderResult<Url> {
        let base = self.issuer.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/protocol/openid-connect/{name}"))?)
    }
}

impl fmt::Debug for RealmBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealmBinding")
            .field("issuer", &self.issuer.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

fn urlencoding_path(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

/// Raw token endpoint response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEndpointResponse {
    /// The new access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// A rotated refresh token, if the provider rotates.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// A fresh id token, if issued.
    #[serde(default)]
    pub id_token: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<f64>,
}

impl TokenEndpointResponse {
    /// Validates the body into a [`TokenGrant`].
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Malformed`] when the access token is missing or
    /// empty, or `expires_in` is missing, negative or not finite.
    pub fn into_grant(self, operation: &'static str) -> ProviderResult<TokenGrant> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::Malformed {
                operation,
                reason: "missing access_token".into(),
            })?;
        let expires_in = self
            .expires_in
            .filter(|s| s.is_finite() && *s >= 0.0)
            .ok_or_else(|| ProviderError::Malformed {
                operation,
                reason: "missing or invalid expires_in".into(),
            })?;

        Ok(TokenGrant {
            access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            id_token: self.id_token.filter(|t| !t.is_empty()),
            expires_in,
        })
    }
}

/// A validated token grant.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    /// The new access token.
    pub access_token: String,
    /// A rotated refresh token, if any.
    pub refresh_token: Option<String>,
    /// A fresh id token, if any.
    pub id_token: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: f64,
}

impl TokenGrant {
    /// Absolute expiry: `floor(now + expires_in)`.
    pub fn expires_at(&self, now: i64) -> i64 {
        (now as f64 + self.expires_in).floor() as i64
    }
}
