//! Tenant configuration records.

use std::collections::BTreeMap;
use std::fmt;

use meddash_auth::provider::RealmBinding;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// Tenant visual identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    /// Logo URL.
    #[serde(default)]
    pub logo: String,
    /// Primary brand colour, e.g. `#0055aa`.
    #[serde(default)]
    pub primary_color: String,
    /// Product name shown to users.
    #[serde(default)]
    pub app_name: String,
}

/// Configuration of one tenant.
///
/// `subdomain` is the unique lookup key. The client secret is accepted when
/// deserializing but never serialized, so a config can be echoed to clients.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    /// Stable tenant identifier.
    pub id: String,
    /// Subdomain the tenant is served from.
    pub subdomain: String,
    /// Identity provider realm.
    pub identity_realm: String,
    /// OAuth2 client id registered in the realm.
    pub identity_client_id: String,
    /// OAuth2 client secret.
    #[serde(default, skip_serializing)]
    pub identity_client_secret: String,
    /// Visual identity.
    #[serde(default)]
    pub branding: Branding,
    /// Feature flags.
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    /// Custom domain, when the tenant has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
}

impl TenantConfig {
    /// Creates a tenant whose id and realm equal its subdomain.
    pub fn new(subdomain: impl Into<String>, client_id: impl Into<String>) -> Self {
        let subdomain = subdomain.into();
        Self {
            id: subdomain.clone(),
            identity_realm: subdomain.clone(),
            subdomain,
            identity_client_id: client_id.into(),
            identity_client_secret: String::new(),
            branding: Branding::default(),
            features: BTreeMap::new(),
            custom_domain: None,
        }
    }

    /// Sets the tenant identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the identity realm.
    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.identity_realm = realm.into();
        self
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.identity_client_secret = secret.into();
        self
    }

    /// Sets the branding.
    #[must_use]
    pub fn with_branding(mut self, branding: Branding) -> Self {
        self.branding = branding;
        self
    }

    /// Sets one feature flag.
    #[must_use]
    pub fn with_feature(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.features.insert(name.into(), enabled);
        self
    }

    /// Returns true if the named feature is enabled.
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }

    /// Binds this tenant's realm client under `identity_base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the issuer is not a valid URL.
    pub fn realm_binding(&self, identity_base_url: &str) -> GatewayResult<RealmBinding> {
        RealmBinding::for_realm(
            identity_base_url,
            &self.identity_realm,
            self.identity_client_id.clone(),
            self.identity_client_secret.clone(),
        )
        .map_err(|e| GatewayError::Config(format!("tenant '{}' realm: {e}", self.subdomain)))
    }
}

impl fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantConfig")
            .field("id", &self.id)
            .field("subdomain", &self.subdomain)
            .field("identity_realm", &self.identity_realm)
            .field("identity_client_id", &self.identity_client_id)
            .field("identity_client_secret", &"<redacted>")
            .field("branding", &self.branding)
            .field("features", &self.features)
            .field("custom_domain", &self.custom_domain)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_camel_case() {
        let config: TenantConfig = serde_json::from_value(json!({
            "id": "t-1",
            "subdomain": "acme",
            "identityRealm": "acme-realm",
            "identityClientId": "dashboard",
            "identityClientSecret": "s3cret",
            "branding": { "logo": "/acme.svg", "primaryColor": "#123456", "appName": "Acme Train" },
            "features": { "chat": true },
            "customDomain": "train.acme.com"
        }))
        .unwrap();

        assert_eq!(config.identity_realm, "acme-realm");
        assert_eq!(config.branding.app_name, "Acme Train");
        assert!(config.feature_enabled("chat"));
        assert!(!config.feature_enabled("quiz"));
        assert_eq!(config.custom_domain.as_deref(), Some("train.acme.com"));
    }

    #[test]
    fn test_secret_never_serialized() {
        let config = TenantConfig::new("acme", "dashboard").with_client_secret("s3cret");
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("identityClientSecret").is_none());
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn test_realm_binding() {
        let config = TenantConfig::new("acme", "dashboard").with_realm("acme-prod");
        let realm = config.realm_binding("https://id.example.com").unwrap();
        assert_eq!(
            realm.issuer().as_str(),
            "https://id.example.com/realms/acme-prod"
        );
        assert_eq!(realm.client_id(), "dashboard");
    }

    #[test]
    fn test_realm_binding_rejects_bad_base_url() {
        let err = TenantConfig::new("acme", "dashboard")
            .realm_binding("not a url")
            .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
