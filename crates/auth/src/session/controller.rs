//! The session controller.
//!
//! Every authenticated read goes through [`SessionController::read_session`],
//! which runs the refresh decision before any access token leaves this
//! module. Refreshes for one session id are serialized: the first reader
//! calls the provider, the rest wait and reuse the persisted result.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use super::flight::SingleFlight;
use super::record::{SessionId, SessionRecord, SessionView};
use super::store::{SessionStore, StoredSession};
use crate::clock::{SharedClock, SystemClock};
use crate::error::{AuthError, AuthResult};
use crate::provider::{RealmBinding, SharedProvider};
use crate::token::{RefreshAction, TokenError, TokenRefresher, TokenSet, decide, decode_identity_claims};

/// Cookie lifetime rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Seconds after the last issue at which a session is over.
    pub max_age_secs: i64,
    /// Seconds after which a valid read re-issues the cookie.
    pub reissue_after_secs: i64,
}

impl SessionPolicy {
    /// Builds a policy from whole days and hours.
    pub fn from_days_and_hours(max_age_days: u32, reissue_hours: u32) -> Self {
        Self {
            max_age_secs: i64::from(max_age_days) * 86_400,
            reissue_after_secs: i64::from(reissue_hours) * 3_600,
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from_days_and_hours(30, 24)
    }
}

/// Outcome of reading a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRead {
    /// The session may authorize requests.
    Valid {
        /// What callers see.
        view: SessionView,
        /// A record to write back as the new cookie, when it changed or aged.
        reissue: Option<SessionRecord>,
    },
    /// The token set is errored; the caller must sign out and re-authenticate.
    Invalid {
        /// The sticky error on the token.
        reason: TokenError,
    },
    /// The session was signed out or has passed its absolute lifetime.
    SignedOut,
}

/// Owns session token sets and their lifecycle.
pub struct SessionController {
    provider: SharedProvider,
    refresher: TokenRefresher,
    store: Arc<dyn SessionStore>,
    flights: SingleFlight<SessionId>,
    clock: SharedClock,
    policy: SessionPolicy,
}

impl SessionController {
    /// Creates a controller with the system clock and the default policy.
    pub fn new(provider: SharedProvider, store: Arc<dyn SessionStore>) -> Self {
        Self {
            refresher: TokenRefresher::new(Arc::clone(&provider)),
            provider,
            store,
            flights: SingleFlight::new(),
            clock: Arc::new(SystemClock),
            policy: SessionPolicy::default(),
        }
    }

    /// Uses `clock` for every time comparison.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Overrides the cookie lifetime rules.
    #[must_use]
    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active lifetime rules.
    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// The configured identity provider.
    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    /// Completes the authorization-code flow and creates a session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] if the code exchange fails,
    /// [`AuthError::Claims`] if the access token carries no usable identity,
    /// and [`AuthError::Store`] if the session cannot be persisted.
    pub async fn sign_in(
        &self,
        realm: &RealmBinding,
        tenant: &str,
        code: &str,
        redirect_uri: &str,
    ) -> AuthResult<SessionRecord> {
        let grant = self.provider.exchange_code(realm, code, redirect_uri).await?;
        let claims = decode_identity_claims(&grant.access_token)?;
        let now = self.clock.unix_seconds();

        let mut token = TokenSet::new(grant.access_token.clone(), grant.expires_at(now), claims);
        if let Some(refresh_token) = grant.refresh_token {
            token = token.with_refresh_token(refresh_token);
        }
        if let Some(id_token) = grant.id_token {
            token = token.with_id_token(id_token);
        }
        if !token.is_complete() {
            return Err(AuthError::Claims("access token has no subject".into()));
        }

        let sid = SessionId::generate();
        self.store
            .save(&sid, &token, now + self.policy.max_age_secs)
            .await?;

        info!(
            sid = %sid,
            tenant,
            user_id = %token.claims().user_id,
            provider = self.provider.name(),
            "Session created"
        );

        Ok(SessionRecord {
            sid,
            tenant: tenant.to_string(),
            token,
            issued_at: now,
        })
    }

    /// Reads a session, refreshing its access token first when due.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the session store fails. Provider
    /// failures never surface here; they mark the token errored instead.
    pub async fn read_session(
        &self,
        record: &SessionRecord,
        realm: &RealmBinding,
    ) -> AuthResult<SessionRead> {
        let now = self.clock.unix_seconds();
        if now >= record.issued_at + self.policy.max_age_secs {
            debug!(sid = %record.sid, "Session past absolute lifetime");
            return Ok(SessionRead::SignedOut);
        }

        let Some(mut current) = self.current_token(record).await? else {
            return Ok(SessionRead::SignedOut);
        };

        if !current.is_errored() && !current.is_complete() {
            current = current.with_error(TokenError::InvalidToken);
            self.persist(&record.sid, &current, now).await?;
        }

        if decide(&current, now) == RefreshAction::Refresh {
            match self.refresh_serialized(record, realm).await? {
                Some(token) => current = token,
                None => return Ok(SessionRead::SignedOut),
            }
        }

        if let Some(reason) = current.error() {
            debug!(sid = %record.sid, reason = %reason, "Session token errored");
            return Ok(SessionRead::Invalid { reason });
        }

        let reissue = if current != record.token
            || now - record.issued_at >= self.policy.reissue_after_secs
        {
            self.persist(&record.sid, &current, now).await?;
            Some(SessionRecord {
                sid: record.sid.clone(),
                tenant: record.tenant.clone(),
                token: current.clone(),
                issued_at: now,
            })
        } else {
            None
        };

        Ok(SessionRead::Valid {
            view: SessionView::from(&current),
            reissue,
        })
    }

    /// Returns the session view if, and only if, the session is valid.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the session store fails.
    pub async fn get_valid_session(
        &self,
        record: &SessionRecord,
        realm: &RealmBinding,
    ) -> AuthResult<Option<SessionView>> {
        match self.read_session(record, realm).await? {
            SessionRead::Valid { view, .. } => Ok(Some(view)),
            SessionRead::Invalid { .. } | SessionRead::SignedOut => Ok(None),
        }
    }

    /// Signs out locally, then notifies the provider over the back channel.
    ///
    /// The local record is invalidated before the provider is contacted; a
    /// provider failure is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] only if local invalidation fails.
    pub async fn sign_out(&self, record: &SessionRecord, realm: &RealmBinding) -> AuthResult<()> {
        let id_token = self.invalidate(record).await?;

        if let Some(id_token) = id_token {
            if let Err(e) = self.provider.logout(realm, &id_token).await {
                warn!(
                    sid = %record.sid,
                    provider = self.provider.name(),
                    error = %e,
                    "Provider logout failed; session already signed out locally"
                );
            }
        }
        Ok(())
    }

    /// Signs out locally and returns the provider's end-session redirect.
    ///
    /// Returns `None` when no id token is known for the session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if local invalidation fails and
    /// [`AuthError::Provider`] if the redirect URL cannot be built.
    pub async fn sign_out_federated(
        &self,
        record: &SessionRecord,
        realm: &RealmBinding,
        post_logout_redirect: &str,
    ) -> AuthResult<Option<Url>> {
        let id_token = self.invalidate(record).await?;
        match id_token {
            Some(id_token) => Ok(Some(self.provider.end_session_url(
                realm,
                &id_token,
                post_logout_redirect,
            )?)),
            None => Ok(None),
        }
    }

    /// Drops stored sessions and tombstones past their retention.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the store fails.
    pub async fn prune_expired(&self) -> AuthResult<usize> {
        let pruned = self.store.prune(self.clock.unix_seconds()).await?;
        if pruned > 0 {
            debug!(pruned, "Pruned expired sessions");
        }
        Ok(pruned)
    }

    /// The authoritative token for `record`, or `None` if signed out.
    ///
    /// A session id the store has never seen (e.g. after a restart) is seeded
    /// from the cookie.
    async fn current_token(&self, record: &SessionRecord) -> AuthResult<Option<TokenSet>> {
        match self.store.load(&record.sid).await? {
            Some(StoredSession::Active(token)) => Ok(Some(token)),
            Some(StoredSession::SignedOut) => Ok(None),
            None => {
                let retain_until = record.issued_at + self.policy.max_age_secs;
                if !self.store.save(&record.sid, &record.token, retain_until).await? {
                    return Ok(None);
                }
                debug!(sid = %record.sid, "Seeded session store from cookie");
                Ok(Some(record.token.clone()))
            }
        }
    }

    /// Refreshes under the session's single-flight lock.
    async fn refresh_serialized(
        &self,
        record: &SessionRecord,
        realm: &RealmBinding,
    ) -> AuthResult<Option<TokenSet>> {
        let _flight = self.flights.acquire(&record.sid).await;

        // Re-read: a task that held the lock before us may have refreshed.
        let Some(current) = self.current_token(record).await? else {
            return Ok(None);
        };
        let now = self.clock.unix_seconds();
        if decide(&current, now) == RefreshAction::Passthrough {
            return Ok(Some(current));
        }

        let refreshed = self.refresher.refresh(realm, &current, now).await;
        if !self.persist(&record.sid, &refreshed, now).await? {
            return Ok(None);
        }
        Ok(Some(refreshed))
    }

    async fn persist(&self, sid: &SessionId, token: &TokenSet, now: i64) -> AuthResult<bool> {
        self.store
            .save(sid, token, now + self.policy.max_age_secs)
            .await
    }

    /// Tombstones the session and returns the last known id token.
    async fn invalidate(&self, record: &SessionRecord) -> AuthResult<Option<String>> {
        let id_token = match self.store.load(&record.sid).await? {
            Some(StoredSession::Active(token)) => token.id_token().map(String::from),
            _ => record.token.id_token().map(String::from),
        };
        // Any copy issued before now expires by now + max_age; keep the
        // tombstone that long so no copy can seed the store again.
        let retain_until = self.clock.unix_seconds() + self.policy.max_age_secs;
        self.store.revoke(&record.sid, retain_until).await?;
        info!(sid = %record.sid, tenant = %record.tenant, "Session signed out");
        Ok(id_token)
    }
}
