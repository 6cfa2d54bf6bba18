//! Identity provider capability.
//!
//! The session layer talks to exactly one [`IdentityProvider`], chosen at
//! startup:
//!
//! - [`OidcProvider`] - a Keycloak-style OpenID Connect realm per tenant
//! - [`DevIdentityProvider`] - local development, no network
//!
//! Both implement the same capability: start sign-in
//! ([`authorization_url`](IdentityProvider::authorization_url)), finish it
//! ([`exchange_code`](IdentityProvider::exchange_code)), refresh, and the two
//! logout variants.

mod dev;
mod oidc;
mod types;

pub use dev::DevIdentityProvider;
pub use oidc::OidcProvider;
pub use types::{RealmBinding, TokenEndpointResponse, TokenGrant};

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::ProviderResult;

/// Client-side contract with an OAuth2/OIDC identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns a short name for logging.
    fn name(&self) -> &'static str;

    /// Builds the browser redirect that starts the authorization-code flow.
    fn authorization_url(
        &self,
        realm: &RealmBinding,
        redirect_uri: &str,
        state: &str,
    ) -> ProviderResult<Url>;

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        realm: &RealmBinding,
        code: &str,
        redirect_uri: &str,
    ) -> ProviderResult<TokenGrant>;

    /// Mints a new access token with `grant_type=refresh_token`.
    async fn refresh(&self, realm: &RealmBinding, refresh_token: &str)
    -> ProviderResult<TokenGrant>;

    /// Back-channel logout using the id token as hint.
    async fn logout(&self, realm: &RealmBinding, id_token: &str) -> ProviderResult<()>;

    /// Builds the browser-redirect logout URL for full single sign-out.
    fn end_session_url(
        &self,
        realm: &RealmBinding,
        id_token: &str,
        post_logout_redirect: &str,
    ) -> ProviderResult<Url>;
}

/// Shared handle to the configured provider.
pub type SharedProvider = Arc<dyn IdentityProvider>;
