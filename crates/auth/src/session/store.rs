//! Server-side persistence for session token sets.
//!
//! The store is authoritative for every session id it knows about. A refresh
//! result is saved here before it is exposed, so a concurrent reader that was
//! waiting on the refresh lock picks up the rotated token instead of spending
//! the old refresh token again. Signed-out ids are kept as tombstones until
//! every cookie issued for them has expired.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::record::SessionId;
use crate::error::AuthResult;
use crate::token::TokenSet;

/// What the store knows about a session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSession {
    /// The session is live with this token set.
    Active(TokenSet),
    /// The session was signed out.
    SignedOut,
}

/// Persistence for session token sets.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the state of `sid`, or `None` if the id was never seen.
    async fn load(&self, sid: &SessionId) -> AuthResult<Option<StoredSession>>;

    /// Stores `token` for `sid`, kept until Unix second `retain_until`.
    ///
    /// Returns `false` without writing if `sid` is signed out; a refresh that
    /// finishes after sign-out must not resurrect the session.
    async fn save(&self, sid: &SessionId, token: &TokenSet, retain_until: i64)
    -> AuthResult<bool>;

    /// Marks `sid` signed out, keeping the tombstone until `retain_until`.
    async fn revoke(&self, sid: &SessionId, retain_until: i64) -> AuthResult<()>;

    /// Drops entries whose retention ended before `now`. Returns how many.
    async fn prune(&self, now: i64) -> AuthResult<usize>;
}

#[derive(Debug, Clone)]
struct Slot {
    state: StoredSession,
    retain_until: i64,
}

/// Process-local [`SessionStore`].
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    slots: RwLock<HashMap<SessionId, Slot>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked session ids, tombstones included.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns true if no session ids are tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, sid: &SessionId) -> AuthResult<Option<StoredSession>> {
        Ok(self.slots.read().get(sid).map(|slot| slot.state.clone()))
    }

    async fn save(
        &self,
        sid: &SessionId,
        token: &TokenSet,
        retain_until: i64,
    ) -> AuthResult<bool> {
        let mut slots = self.slots.write();
        if let Some(Slot {
            state: StoredSession::SignedOut,
            ..
        }) = slots.get(sid)
        {
            debug!(sid = %sid, "Ignoring save for signed-out session");
            return Ok(false);
        }
        slots.insert(
            sid.clone(),
            Slot {
                state: StoredSession::Active(token.clone()),
                retain_until,
            },
        );
        Ok(true)
    }

    async fn revoke(&self, sid: &SessionId, retain_until: i64) -> AuthResult<()> {
        self.slots.write().insert(
            sid.clone(),
            Slot {
                state: StoredSession::SignedOut,
                retain_until,
            },
        );
        Ok(())
    }

    async fn prune(&self, now: i64) -> AuthResult<usize> {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|_, slot| slot.retain_until >= now);
        Ok(before - slots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::IdentityClaims;

    fn token(access: &str) -> TokenSet {
        TokenSet::new(access, 100, IdentityClaims::new("u-1"))
    }

    #[tokio::test]
    async fn test_unknown_session_loads_none() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.load(&SessionId::new("nope")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemorySessionStore::new();
        let sid = SessionId::new("s");
        assert!(store.save(&sid, &token("T1"), 1_000).await.unwrap());
        assert!(store.save(&sid, &token("T2"), 1_000).await.unwrap());
        assert_eq!(
            store.load(&sid).await.unwrap(),
            Some(StoredSession::Active(token("T2")))
        );
    }

    #[tokio::test]
    async fn test_revoked_session_stays_signed_out() {
        let store = InMemorySessionStore::new();
        let sid = SessionId::new("s");
        store.save(&sid, &token("T1"), 1_000).await.unwrap();
        store.revoke(&sid, 1_000).await.unwrap();

        assert!(!store.save(&sid, &token("T2"), 1_000).await.unwrap());
        assert_eq!(
            store.load(&sid).await.unwrap(),
            Some(StoredSession::SignedOut)
        );
    }

    #[tokio::test]
    async fn test_prune_drops_expired_slots() {
        let store = InMemorySessionStore::new();
        store.save(&SessionId::new("old"), &token("T"), 10).await.unwrap();
        store.revoke(&SessionId::new("gone"), 20).await.unwrap();
        store.save(&SessionId::new("live"), &token("T"), 500).await.unwrap();

        assert_eq!(store.prune(100).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.load(&SessionId::new("live")).await.unwrap().is_some());
    }
}
