//! Keycloak-style OpenID Connect binding.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::types::{RealmBinding, TokenEndpointResponse, TokenGrant};
use super::IdentityProvider;
use crate::error::{ProviderError, ProviderResult};

const SCOPES: &str = "openid profile email";

/// Identity provider speaking OIDC against `{issuer}/protocol/openid-connect/*`.
pub struct OidcProvider {
    http: reqwest::Client,
}

impl OidcProvider {
    /// Creates a provider whose HTTP calls time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http_client(http))
    }

    /// Uses a caller-supplied HTTP client (connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn token_request(
        &self,
        realm: &RealmBinding,
        operation: &'static str,
        params: &[(&str, &str)],
    ) -> ProviderResult<TokenGrant> {
        let response = self
            .http
            .post(realm.endpoint("token")?)
            .form(params)
            .send()
            .await?;

        let response = ensure_success(response, operation).await?;
        let body: TokenEndpointResponse = response.json().await.map_err(|e| {
            ProviderError::Malformed {
                operation,
                reason: e.to_string(),
            }
        })?;
        body.into_grant(operation)
    }
}

/// Returns the response on 2xx, or a [`ProviderError::Status`] with the body.
async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> ProviderResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        operation,
        status,
        body,
    })
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn name(&self) -> &'static str {
        "keycloak"
    }

    fn authorization_url(
        &self,
        realm: &RealmBinding,
        redirect_uri: &str,
        state: &str,
    ) -> ProviderResult<Url> {
        let mut url = realm.endpoint("auth")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", realm.client_id())
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", SCOPES)
            .append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(
        &self,
        realm: &RealmBinding,
        code: &str,
        redirect_uri: &str,
    ) -> ProviderResult<TokenGrant> {
        let params = [
            ("client_id", realm.client_id()),
            ("client_secret", realm.client_secret()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        self.token_request(realm, "code exchange", &params).await
    }

    async fn refresh(
        &self,
        realm: &RealmBinding,
        refresh_token: &str,
    ) -> ProviderResult<TokenGrant> {
        debug!(issuer = %realm.issuer(), "Refreshing access token");
        let params = [
            ("client_id", realm.client_id()),
            ("client_secret", realm.client_secret()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.token_request(realm, "token refresh", &params).await
    }

    async fn logout(&self, realm: &RealmBinding, id_token: &str) -> ProviderResult<()> {
        let params = [
            ("client_id", realm.client_id()),
            ("client_secret", realm.client_secret()),
            ("id_token_hint", id_token),
        ];
        let response = self
            .http
            .post(realm.endpoint("logout")?)
            .form(&params)
            .send()
            .await?;
        ensure_success(response, "logout").await?;
        Ok(())
    }

    fn end_session_url(
        &self,
        realm: &RealmBinding,
        id_token: &str,
        post_logout_redirect: &str,
    ) -> ProviderResult<Url> {
        let mut url = realm.endpoint("logout")?;
        url.query_pairs_mut()
            .append_pair("id_token_hint", id_token)
            .append_pair("post_logout_redirect_uri", post_logout_redirect);
        Ok(url)
    }
}
