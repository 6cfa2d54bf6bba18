//! Subdomain to tenant configuration, with a TTL cache in front of the store.
//!
//! Cache entries expire lazily: a stale entry is ignored on read and the
//! lookup falls through to the [`TenantStore`]. Lookups return an
//! `Arc<TenantConfig>` so a concurrent [`TenantRegistry::register`] never
//! tears a read. Unknown subdomains are not cached.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use meddash_auth::clock::{SharedClock, SystemClock};
use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::config::TenantConfig;
use crate::error::{GatewayError, GatewayResult};

/// Default cache TTL in seconds.
pub const DEFAULT_TENANT_TTL_SECS: u64 = 300;

/// Backing store for tenant configurations.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Fetches the tenant served from `subdomain`.
    async fn fetch(&self, subdomain: &str) -> GatewayResult<Option<TenantConfig>>;

    /// Inserts or replaces the tenant keyed by `config.subdomain`.
    async fn upsert(&self, config: TenantConfig) -> GatewayResult<()>;

    /// Lists all tenants.
    async fn list(&self) -> GatewayResult<Vec<TenantConfig>>;
}

/// Process-local [`TenantStore`].
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    tenants: RwLock<HashMap<String, TenantConfig>>,
}

impl InMemoryTenantStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `tenants`; later duplicates win.
    pub fn with_tenants(tenants: impl IntoIterator<Item = TenantConfig>) -> Self {
        let tenants = tenants
            .into_iter()
            .map(|t| (t.subdomain.clone(), t))
            .collect();
        Self {
            tenants: RwLock::new(tenants),
        }
    }

    /// Loads a JSON array of tenant configurations from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> GatewayResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("cannot read tenants file {}: {e}", path.display()))
        })?;
        let tenants: Vec<TenantConfig> = serde_json::from_str(&contents).map_err(|e| {
            GatewayError::Config(format!("invalid tenants file {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), count = tenants.len(), "Loaded tenants file");
        Ok(Self::with_tenants(tenants))
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn fetch(&self, subdomain: &str) -> GatewayResult<Option<TenantConfig>> {
        Ok(self.tenants.read().get(subdomain).cloned())
    }

    async fn upsert(&self, config: TenantConfig) -> GatewayResult<()> {
        self.tenants
            .write()
            .insert(config.subdomain.clone(), config);
        Ok(())
    }

    async fn list(&self) -> GatewayResult<Vec<TenantConfig>> {
        let mut tenants: Vec<_> = self.tenants.read().values().cloned().collect();
        tenants.sort_by(|a, b| a.subdomain.cmp(&b.subdomain));
        Ok(tenants)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    config: Arc<TenantConfig>,
    expires_at: i64,
}

/// Cached tenant lookups.
pub struct TenantRegistry {
    store: Arc<dyn TenantStore>,
    cache: RwLock<HashMap<String, CacheEntry>>,
    ttl_secs: i64,
    clock: SharedClock,
}

impl TenantRegistry {
    /// Creates a registry with the default TTL and the system clock.
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
            ttl_secs: DEFAULT_TENANT_TTL_SECS as i64,
            clock: Arc::new(SystemClock),
        }
    }

    /// Overrides the cache TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        self
    }

    /// Uses `clock` for expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Looks up the tenant served from `subdomain`.
    ///
    /// The match is exact and case-sensitive.
    pub async fn get(&self, subdomain: &str) -> GatewayResult<Option<Arc<TenantConfig>>> {
        let now = self.clock.unix_seconds();
        if let Some(entry) = self.cache.read().get(subdomain) {
            if now < entry.expires_at {
                return Ok(Some(Arc::clone(&entry.config)));
            }
        }

        let Some(config) = self.store.fetch(subdomain).await? else {
            debug!(subdomain, "Tenant not registered");
            return Ok(None);
        };
        Ok(Some(self.warm(config, now)))
    }

    /// Returns true if `subdomain` maps to a registered tenant.
    ///
    /// A store failure counts as invalid.
    pub async fn is_valid(&self, subdomain: &str) -> bool {
        match self.get(subdomain).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                error!(subdomain, error = %e, "Tenant lookup failed");
                false
            }
        }
    }

    /// Upserts `config` into the store and warms the cache.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BadRequest`] for an empty subdomain and
    /// propagates store failures.
    pub async fn register(&self, config: TenantConfig) -> GatewayResult<Arc<TenantConfig>> {
        if config.subdomain.is_empty() {
            return Err(GatewayError::bad_request("tenant subdomain cannot be empty"));
        }
        self.store.upsert(config.clone()).await?;
        info!(subdomain = %config.subdomain, tenant_id = %config.id, "Tenant registered");
        Ok(self.warm(config, self.clock.unix_seconds()))
    }

    /// Drops the cache entry for `subdomain`.
    pub fn invalidate(&self, subdomain: &str) {
        self.cache.write().remove(subdomain);
    }

    /// Removes expired cache entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.unix_seconds();
        let mut cache = self.cache.write();
        let before = cache.len();
        cache.retain(|_, entry| now < entry.expires_at);
        before - cache.len()
    }

    /// Number of cached entries, stale ones included.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// All tenants in the backing store.
    pub async fn list(&self) -> GatewayResult<Vec<TenantConfig>> {
        self.store.list().await
    }

    fn warm(&self, config: TenantConfig, now: i64) -> Arc<TenantConfig> {
        let config = Arc::new(config);
        self.cache.write().insert(
            config.subdomain.clone(),
            CacheEntry {
                config: Arc::clone(&config),
                expires_at: now.saturating_add(self.ttl_secs),
            },
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use meddash_auth::clock::ManualClock;

    /// Counts fetches to observe cache hits.
    struct CountingStore {
        inner: InMemoryTenantStore,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl TenantStore for CountingStore {
        async fn fetch(&self, subdomain: &str) -> GatewayResult<Option<TenantConfig>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(subdomain).await
        }

        async fn upsert(&self, config: TenantConfig) -> GatewayResult<()> {
            self.inner.upsert(config).await
        }

        async fn list(&self) -> GatewayResult<Vec<TenantConfig>> {
            self.inner.list().await
        }
    }

    fn counting(tenants: Vec<TenantConfig>) -> Arc<CountingStore> {
        Arc::new(CountingStore {
            inner: InMemoryTenantStore::with_tenants(tenants),
            fetches: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_cache_hit_within_ttl_refetch_after() {
        let store = counting(vec![TenantConfig::new("acme", "dash")]);
        let clock = ManualClock::at(1_000);
        let registry = TenantRegistry::new(store.clone())
            .with_ttl(300)
            .with_clock(Arc::new(clock.clone()));

        assert!(registry.get("acme").await.unwrap().is_some());
        clock.advance(299);
        assert!(registry.get("acme").await.unwrap().is_some());
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);

        clock.advance(1);
        assert!(registry.get("acme").await.unwrap().is_some());
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let registry =
            TenantRegistry::new(Arc::new(InMemoryTenantStore::with_tenants([TenantConfig::new(
                "acme", "dash",
            )])));
        assert!(registry.is_valid("acme").await);
        assert!(!registry.is_valid("Acme").await);
        assert!(!registry.is_valid("acme ").await);
    }

    #[tokio::test]
    async fn test_unknown_subdomain_not_cached() {
        let store = counting(vec![]);
        let registry = TenantRegistry::new(store.clone());
        assert!(registry.get("ghost").await.unwrap().is_none());
        assert!(registry.get("ghost").await.unwrap().is_none());
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(registry.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_register_warms_cache() {
        let store = counting(vec![]);
        let registry = TenantRegistry::new(store.clone());
        registry
            .register(TenantConfig::new("beta", "dash").with_feature("chat", true))
            .await
            .unwrap();

        let config = registry.get("beta").await.unwrap().unwrap();
        assert!(config.feature_enabled("chat"));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_subdomain() {
        let registry = TenantRegistry::new(Arc::new(InMemoryTenantStore::new()));
        let err = registry
            .register(TenantConfig::new("", "dash"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn test_reregister_replaces_config() {
        let registry = TenantRegistry::new(Arc::new(InMemoryTenantStore::new()));
        let first = registry
            .register(TenantConfig::new("acme", "dash"))
            .await
            .unwrap();
        registry
            .register(TenantConfig::new("acme", "dash").with_realm("acme-2"))
            .await
            .unwrap();

        // readers holding the old Arc keep a consistent snapshot
        assert_eq!(first.identity_realm, "acme");
        let current = registry.get("acme").await.unwrap().unwrap();
        assert_eq!(current.identity_realm, "acme-2");
    }

    #[tokio::test]
    async fn test_invalidate_and_purge() {
        let clock = ManualClock::at(0);
        let registry = TenantRegistry::new(Arc::new(InMemoryTenantStore::with_tenants([
            TenantConfig::new("a", "dash"),
            TenantConfig::new("b", "dash"),
        ])))
        .with_ttl(10)
        .with_clock(Arc::new(clock.clone()));

        registry.get("a").await.unwrap();
        registry.get("b").await.unwrap();
        registry.invalidate("a");
        assert_eq!(registry.cached_len(), 1);

        clock.advance(10);
        assert_eq!(registry.purge_expired(), 1);
        assert_eq!(registry.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_store_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"t1","subdomain":"acme","identityRealm":"acme","identityClientId":"dash"}}]"#
        )
        .unwrap();

        let store = InMemoryTenantStore::from_file(file.path()).unwrap();
        assert!(store.fetch("acme").await.unwrap().is_some());
    }

    #[test]
    fn test_store_from_bad_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = InMemoryTenantStore::from_file(file.path()).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
