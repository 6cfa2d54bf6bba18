//! Refresh decision and execution.
//!
//! [`decide`] is a pure function of the token and the current time.
//! [`TokenRefresher::refresh`] performs the provider call and folds every
//! failure into the token's sticky error flag.

use tracing::{info, warn};

use super::set::{TokenError, TokenSet};
use crate::provider::{RealmBinding, SharedProvider};

/// Seconds before expiry at which a token is already treated as stale.
///
/// Absorbs clock skew and in-flight request latency so a request is never
/// sent with a token that expires mid-flight.
pub const REFRESH_GRACE_SECS: i64 = 60;

/// What to do with a token on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshAction {
    /// Use the token as it is.
    Passthrough,
    /// Mint a new access token first.
    Refresh,
}

/// Decides whether `token` must be refreshed at Unix second `now`.
///
/// Errored tokens always pass through; only sign-out clears them. A token
/// without refresh material also passes through and simply expires.
pub fn decide(token: &TokenSet, now: i64) -> RefreshAction {
    if token.is_errored() {
        return RefreshAction::Passthrough;
    }
    if now < token.expires_at() - REFRESH_GRACE_SECS {
        return RefreshAction::Passthrough;
    }
    if token.refresh_token().is_some() {
        RefreshAction::Refresh
    } else {
        RefreshAction::Passthrough
    }
}

/// Executes refreshes against the configured identity provider.
#[derive(Clone)]
pub struct TokenRefresher {
    provider: SharedProvider,
}

impl TokenRefresher {
    /// Creates a refresher bound to `provider`.
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    /// Runs [`decide`] and refreshes when needed.
    ///
    /// Returns the token to use and whether a provider call was made.
    pub async fn ensure_fresh(
        &self,
        realm: &RealmBinding,
        token: &TokenSet,
        now: i64,
    ) -> (TokenSet, bool) {
        match decide(token, now) {
            RefreshAction::Passthrough => (token.clone(), false),
            RefreshAction::Refresh => (self.refresh(realm, token, now).await, true),
        }
    }

    /// Refreshes `token` unconditionally.
    ///
    /// On success the access token, expiry and any rotated refresh/id tokens
    /// are replaced. On any failure the input is returned with
    /// [`TokenError::RefreshAccessTokenError`] set.
    pub async fn refresh(&self, realm: &RealmBinding, token: &TokenSet, now: i64) -> TokenSet {
        let Some(refresh_token) = token.refresh_token() else {
            return token.clone();
        };

        match self.provider.refresh(realm, refresh_token).await {
            Ok(grant) => {
                let expires_at = grant.expires_at(now);
                info!(
                    user_id = %token.claims().user_id,
                    expires_at,
                    rotated = grant.refresh_token.is_some(),
                    "Access token refreshed"
                );
                token.refreshed(
                    grant.access_token,
                    expires_at,
                    grant.refresh_token,
                    grant.id_token,
                )
            }
            Err(e) => {
                warn!(
                    user_id = %token.claims().user_id,
                    provider = self.provider.name(),
                    error = %e,
                    "Access token refresh failed"
                );
                token.with_error(TokenError::RefreshAccessTokenError)
            }
        }
    }
}
