//! Application state shared by the request gate and every handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use axum::http::{HeaderMap, Uri};
use axum_extra::extract::cookie::Key;
use meddash_auth::clock::{SharedClock, SystemClock};
use meddash_auth::provider::{DevIdentityProvider, OidcProvider, RealmBinding, SharedProvider};
use meddash_auth::session::{InMemorySessionStore, SessionController, SessionPolicy};
use tracing::{info, warn};

use crate::config::{IdentityBackend, ServerConfig};
use crate::error::{GatewayError, GatewayResult};
use crate::tenant::{InMemoryTenantStore, TenantConfig, TenantRegistry, TenantResolver};

/// Shared application state.
///
/// Cheap to clone; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    registry: Arc<TenantRegistry>,
    resolver: Arc<TenantResolver>,
    sessions: Arc<SessionController>,
    cookie_key: Key,
}

impl AppState {
    /// Assembles state from already-built components.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the cookie secret is too short.
    pub fn new(
        config: ServerConfig,
        registry: TenantRegistry,
        sessions: SessionController,
    ) -> GatewayResult<Self> {
        let cookie_key = cookie_key(config.cookie_secret.as_deref())?;
        Ok(Self {
            resolver: Arc::new(TenantResolver::new(config.dev_tenant.clone())),
            config: Arc::new(config),
            registry: Arc::new(registry),
            sessions: Arc::new(sessions),
            cookie_key,
        })
    }

    /// Builds every component from configuration with the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the tenants file is unusable or the
    /// identity provider client cannot be created.
    pub fn from_config(config: ServerConfig) -> GatewayResult<Self> {
        Self::from_config_with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`AppState::from_config`] with an explicit clock.
    pub fn from_config_with_clock(config: ServerConfig, clock: SharedClock) -> GatewayResult<Self> {
        let provider = build_provider(&config, &clock)?;
        let policy =
            SessionPolicy::from_days_and_hours(config.session_max_age_days, config.session_reissue_hours);
        let sessions = SessionController::new(provider, Arc::new(InMemorySessionStore::new()))
            .with_clock(Arc::clone(&clock))
            .with_policy(policy);

        let store = match &config.tenants_file {
            Some(path) => InMemoryTenantStore::from_file(path)?,
            None => {
                info!(subdomain = %config.dev_tenant, "No tenants file; registering dev tenant");
                InMemoryTenantStore::with_tenants([dev_tenant(&config)])
            }
        };
        let registry = TenantRegistry::new(Arc::new(store))
            .with_ttl(config.tenant_cache_ttl)
            .with_clock(clock);

        Self::new(config, registry, sessions)
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Tenant registry.
    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    /// Tenant resolver.
    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    /// Session controller.
    pub fn sessions(&self) -> &SessionController {
        &self.sessions
    }

    /// Key encrypting the private cookies.
    pub fn cookie_key(&self) -> &Key {
        &self.cookie_key
    }

    /// Name of the session cookie.
    pub fn session_cookie_name(&self) -> &str {
        &self.config.session_cookie
    }

    /// Whether cookies carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.config.production
    }

    /// Binds `tenant`'s realm under the configured identity base URL.
    pub fn realm_for(&self, tenant: &TenantConfig) -> GatewayResult<RealmBinding> {
        tenant.realm_binding(&self.config.identity_base_url)
    }

    /// Resolves and looks up the tenant a request was addressed to.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TenantNotFound`] when the host has no tenant or
    /// the tenant is not registered.
    pub async fn tenant_for_request(
        &self,
        headers: &HeaderMap,
        uri: &Uri,
    ) -> GatewayResult<Arc<TenantConfig>> {
        let subdomain = self
            .resolver
            .resolve_request(headers, uri)
            .ok_or_else(|| GatewayError::tenant_not_found(""))?;
        self.registry
            .get(&subdomain)
            .await?
            .ok_or_else(|| GatewayError::tenant_not_found(subdomain))
    }
}

// PrivateCookieJar extracts its Key from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

fn cookie_key(secret: Option<&str>) -> GatewayResult<Key> {
    match secret {
        Some(secret) => Key::try_from(secret.as_bytes())
            .map_err(|e| GatewayError::Config(format!("invalid cookie secret: {e}"))),
        None => {
            warn!("No cookie secret configured; sessions will not survive a restart");
            Ok(Key::generate())
        }
    }
}

fn build_provider(config: &ServerConfig, clock: &SharedClock) -> GatewayResult<SharedProvider> {
    match config.identity_backend {
        IdentityBackend::Keycloak => {
            let provider = OidcProvider::new(Duration::from_secs(config.identity_timeout))
                .map_err(|e| GatewayError::Config(e.to_string()))?;
            Ok(Arc::new(provider))
        }
        IdentityBackend::Dev => {
            warn!(user = %config.dev_user, "Dev identity backend enabled; every sign-in succeeds");
            Ok(Arc::new(
                DevIdentityProvider::new(config.dev_user.clone())
                    .with_organisation(format!("{}-org", config.dev_tenant))
                    .with_roles(config.dev_roles.clone())
                    .with_clock(Arc::clone(clock)),
            ))
        }
    }
}

fn dev_tenant(config: &ServerConfig) -> TenantConfig {
    TenantConfig::new(config.dev_tenant.clone(), "meddash-dashboard")
}
