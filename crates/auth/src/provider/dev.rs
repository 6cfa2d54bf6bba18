//! Development identity provider.
//!
//! Signs everyone in as one configurable user without leaving the process.
//! Only enable it for local work: the authorization step is skipped
//! entirely and tokens are unsigned.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use url::Url;
use uuid::Uuid;

use super::types::{RealmBinding, TokenGrant};
use super::IdentityProvider;
use crate::clock::{SharedClock, SystemClock};
use crate::error::ProviderResult;
use crate::token::encode_unsigned_jwt;

/// An in-process provider for local development.
pub struct DevIdentityProvider {
    user_id: String,
    organisation_id: Option<String>,
    roles: Vec<String>,
    token_lifetime_secs: i64,
    clock: SharedClock,
}

impl DevIdentityProvider {
    /// Creates a provider that signs in `user_id` with one-hour tokens.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            organisation_id: None,
            roles: Vec::new(),
            token_lifetime_secs: 3600,
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets the organisation claim.
    #[must_use]
    pub fn with_organisation(mut self, organisation_id: impl Into<String>) -> Self {
        self.organisation_id = Some(organisation_id.into());
        self
    }

    /// Sets the role claims.
    #[must_use]
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_token_lifetime(mut self, seconds: i64) -> Self {
        self.token_lifetime_secs = seconds;
        self
    }

    /// Uses a specific clock for the `exp` claim.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    fn mint(&self, realm: &RealmBinding) -> TokenGrant {
        let now = self.clock.unix_seconds();
        let access_token = encode_unsigned_jwt(&json!({
            "iss": realm.issuer().as_str(),
            "sub": self.user_id,
            "organisation_id": self.organisation_id,
            "realm_access": { "roles": self.roles },
            "iat": now,
            "exp": now + self.token_lifetime_secs,
        }));
        TokenGrant {
            access_token,
            refresh_token: Some(format!("dev-refresh-{}", Uuid::new_v4())),
            id_token: Some(format!("dev-id-{}", Uuid::new_v4())),
            expires_in: self.token_lifetime_secs as f64,
        }
    }
}

#[async_trait]
impl IdentityProvider for DevIdentityProvider {
    fn name(&self) -> &'static str {
        "dev"
    }

    fn authorization_url(
        &self,
        _realm: &RealmBinding,
        redirect_uri: &str,
        state: &str,
    ) -> ProviderResult<Url> {
        let mut url = Url::parse(redirect_uri)?;
        url.query_pairs_mut()
            .append_pair("code", "dev")
            .append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(
        &self,
        realm: &RealmBinding,
        _code: &str,
        _redirect_uri: &str,
    ) -> ProviderResult<TokenGrant> {
        info!(user_id = %self.user_id, "Dev identity provider sign-in");
        Ok(self.mint(realm))
    }

    async fn refresh(
        &self,
        realm: &RealmBinding,
        _refresh_token: &str,
    ) -> ProviderResult<TokenGrant> {
        Ok(self.mint(realm))
    }

    async fn logout(&self, _realm: &RealmBinding, _id_token: &str) -> ProviderResult<()> {
        Ok(())
    }

    fn end_session_url(
        &self,
        _realm: &RealmBinding,
        _id_token: &str,
        post_logout_redirect: &str,
    ) -> ProviderResult<Url> {
        Ok(Url::parse(post_logout_redirect)?)
    }
}
