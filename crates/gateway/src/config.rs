//! Server configuration for the session gateway.
//!
//! Every field can be set by command line flag or environment variable.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_PORT` | 3000 | Server port |
//! | `GATEWAY_HOST` | 127.0.0.1 | Host to bind |
//! | `GATEWAY_LOG_LEVEL` | info | Log level |
//! | `GATEWAY_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `GATEWAY_ENABLE_CORS` | false | Enable CORS |
//! | `GATEWAY_CORS_ORIGINS` | * | Allowed origins |
//! | `GATEWAY_CORS_METHODS` | GET,POST,OPTIONS | Allowed methods |
//! | `GATEWAY_CORS_HEADERS` | Content-Type,Authorization,Accept | Allowed headers |
//! | `GATEWAY_PRODUCTION` | false | Secure cookies and https callback URLs |
//! | `GATEWAY_DEV_TENANT` | dev | Subdomain used for localhost requests |
//! | `GATEWAY_TENANTS_FILE` | - | JSON array of tenant configurations |
//! | `GATEWAY_TENANT_CACHE_TTL` | 300 | Tenant cache TTL (seconds) |
//! | `GATEWAY_IDENTITY_BACKEND` | keycloak | `keycloak` or `dev` |
//! | `GATEWAY_IDENTITY_BASE_URL` | http://localhost:8080 | Identity provider base URL |
//! | `GATEWAY_IDENTITY_TIMEOUT` | 10 | Identity provider HTTP timeout (seconds) |
//! | `GATEWAY_DEV_USER` | dev-user | Subject signed in by the dev backend |
//! | `GATEWAY_DEV_ROLES` | admin | Roles granted by the dev backend |
//! | `GATEWAY_COOKIE_SECRET` | - | At least 64 bytes; random per process if unset |
//! | `GATEWAY_SESSION_COOKIE` | __meddash_session | Session cookie name |
//! | `GATEWAY_SESSION_MAX_AGE_DAYS` | 30 | Absolute session lifetime |
//! | `GATEWAY_SESSION_REISSUE_HOURS` | 24 | Sliding cookie re-issue interval |
//! | `GATEWAY_MAINTENANCE_INTERVAL` | 60 | Seconds between cache and session purges |
//!
//! Route classification is configured through [`RouteConfig`].
//!
//! # Example
//!
//! ```rust
//! use meddash_gateway::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 4000,
//!     production: true,
//!     ..Default::default()
//! };
//! assert_eq!(config.socket_addr(), "127.0.0.1:4000");
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

/// Minimum length of the cookie secret in bytes.
pub const MIN_COOKIE_SECRET_LEN: usize = 64;

/// Which identity provider binding to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdentityBackend {
    /// Keycloak-style OpenID Connect, one realm per tenant.
    Keycloak,
    /// In-process provider for local development.
    Dev,
}

/// Server configuration for the session gateway.
#[derive(Debug, Clone, Parser)]
#[command(name = "meddash")]
#[command(about = "Multi-tenant session gateway for the Meddash dashboard")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "GATEWAY_PORT", default_value = "3000")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "GATEWAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "GATEWAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in seconds.
    #[arg(long, env = "GATEWAY_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "GATEWAY_ENABLE_CORS", default_value = "false")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "GATEWAY_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(long, env = "GATEWAY_CORS_METHODS", default_value = "GET,POST,OPTIONS")]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "GATEWAY_CORS_HEADERS",
        default_value = "Content-Type,Authorization,Accept"
    )]
    pub cors_headers: String,

    /// Production mode: `Secure` cookies and https callback URLs.
    #[arg(long, env = "GATEWAY_PRODUCTION", default_value = "false")]
    pub production: bool,

    /// Subdomain used for localhost and single-label hosts.
    #[arg(long, env = "GATEWAY_DEV_TENANT", default_value = "dev")]
    pub dev_tenant: String,

    /// JSON file holding an array of tenant configurations.
    #[arg(long, env = "GATEWAY_TENANTS_FILE")]
    pub tenants_file: Option<PathBuf>,

    /// Tenant cache TTL in seconds.
    #[arg(long, env = "GATEWAY_TENANT_CACHE_TTL", default_value = "300")]
    pub tenant_cache_ttl: u64,

    /// Identity provider binding.
    #[arg(long, env = "GATEWAY_IDENTITY_BACKEND", value_enum, default_value = "keycloak")]
    pub identity_backend: IdentityBackend,

    /// Identity provider base URL; realms live under `{base}/realms/{realm}`.
    #[arg(long, env = "GATEWAY_IDENTITY_BASE_URL", default_value = "http://localhost:8080")]
    pub identity_base_url: String,

    /// Identity provider HTTP timeout in seconds.
    #[arg(long, env = "GATEWAY_IDENTITY_TIMEOUT", default_value = "10")]
    pub identity_timeout: u64,

    /// Subject signed in by the dev identity backend.
    #[arg(long, env = "GATEWAY_DEV_USER", default_value = "dev-user")]
    pub dev_user: String,

    /// Roles granted by the dev identity backend (comma-separated).
    #[arg(long, env = "GATEWAY_DEV_ROLES", value_delimiter = ',', default_value = "admin")]
    pub dev_roles: Vec<String>,

    /// Secret for encrypting session cookies.
    #[arg(long, env = "GATEWAY_COOKIE_SECRET", hide_env_values = true)]
    pub cookie_secret: Option<String>,

    /// Session cookie name.
    #[arg(long, env = "GATEWAY_SESSION_COOKIE", default_value = "__meddash_session")]
    pub session_cookie: String,

    /// Absolute session lifetime in days.
    #[arg(long, env = "GATEWAY_SESSION_MAX_AGE_DAYS", default_value = "30")]
    pub session_max_age_days: u32,

    /// Hours after which a valid session cookie is re-issued.
    #[arg(long, env = "GATEWAY_SESSION_REISSUE_HOURS", default_value = "24")]
    pub session_reissue_hours: u32,

    /// Seconds between tenant cache and session store purges.
    #[arg(long, env = "GATEWAY_MAINTENANCE_INTERVAL", default_value = "60")]
    pub maintenance_interval: u64,

    /// Route classification.
    #[command(flatten)]
    pub routes: RouteConfig,
}

/// Which paths the request gate treats as auth, static, public or protected.
///
/// Anything not matched by one of these lists still requires a valid tenant.
#[derive(Debug, Clone, Args)]
pub struct RouteConfig {
    /// Exact paths that never redirect.
    #[arg(
        long,
        env = "GATEWAY_PUBLIC_ROUTES",
        value_delimiter = ',',
        default_values_t = default_public_routes()
    )]
    pub public_routes: Vec<String>,

    /// Path prefixes that require a signed-in session.
    #[arg(
        long,
        env = "GATEWAY_PROTECTED_PREFIXES",
        value_delimiter = ',',
        default_values_t = default_protected_prefixes()
    )]
    pub protected_prefixes: Vec<String>,

    /// Path prefixes of the identity-provider callback routes.
    #[arg(
        long,
        env = "GATEWAY_AUTH_PREFIXES",
        value_delimiter = ',',
        default_values_t = default_auth_prefixes()
    )]
    pub auth_prefixes: Vec<String>,

    /// Path prefixes served as static assets.
    #[arg(
        long,
        env = "GATEWAY_STATIC_PREFIXES",
        value_delimiter = ',',
        default_values_t = default_static_prefixes()
    )]
    pub static_prefixes: Vec<String>,

    /// File extensions served as static assets.
    #[arg(
        long,
        env = "GATEWAY_STATIC_EXTENSIONS",
        value_delimiter = ',',
        default_values_t = default_static_extensions()
    )]
    pub static_extensions: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_public_routes() -> Vec<String> {
    strings(&["/", "/health", "/_liveness", "/_readiness", "/tenant-not-found"])
}

fn default_protected_prefixes() -> Vec<String> {
    strings(&["/dashboard", "/api/session"])
}

fn default_auth_prefixes() -> Vec<String> {
    strings(&["/api/auth"])
}

fn default_static_prefixes() -> Vec<String> {
    strings(&["/_next/", "/static/", "/favicon.ico"])
}

fn default_static_extensions() -> Vec<String> {
    strings(&[
        "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "avif", "woff", "woff2", "ttf",
        "otf", "css", "js", "map",
    ])
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            public_routes: default_public_routes(),
            protected_prefixes: default_protected_prefixes(),
            auth_prefixes: default_auth_prefixes(),
            static_prefixes: default_static_prefixes(),
            static_extensions: default_static_extensions(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            request_timeout: 30,
            enable_cors: false,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,OPTIONS".to_string(),
            cors_headers: "Content-Type,Authorization,Accept".to_string(),
            production: false,
            dev_tenant: "dev".to_string(),
            tenants_file: None,
            tenant_cache_ttl: 300,
            identity_backend: IdentityBackend::Keycloak,
            identity_base_url: "http://localhost:8080".to_string(),
            identity_timeout: 10,
            dev_user: "dev-user".to_string(),
            dev_roles: vec!["admin".to_string()],
            cookie_secret: None,
            session_cookie: "__meddash_session".to_string(),
            session_max_age_days: 30,
            session_reissue_hours: 24,
            maintenance_interval: 60,
            routes: RouteConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    pub fn from_env() -> Self {
        // Try to parse from environment, falling back to defaults
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Scheme used for callback and redirect URLs.
    pub fn scheme(&self) -> &'static str {
        if self.production { "https" } else { "http" }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.dev_tenant.is_empty() {
            errors.push("Dev tenant cannot be empty".to_string());
        }

        if self.tenant_cache_ttl == 0 {
            errors.push("Tenant cache TTL cannot be 0".to_string());
        }

        if url::Url::parse(&self.identity_base_url).is_err() {
            errors.push(format!(
                "Identity base URL is not a valid URL: {}",
                self.identity_base_url
            ));
        }

        if self.identity_timeout == 0 {
            errors.push("Identity timeout cannot be 0".to_string());
        }

        match &self.cookie_secret {
            Some(secret) if secret.len() < MIN_COOKIE_SECRET_LEN => errors.push(format!(
                "Cookie secret must be at least {MIN_COOKIE_SECRET_LEN} bytes"
            )),
            None if self.production => {
                errors.push("Cookie secret is required in production".to_string())
            }
            _ => {}
        }

        if self.production && self.identity_backend == IdentityBackend::Dev {
            errors.push("Dev identity backend cannot be used in production".to_string());
        }

        if self.session_cookie.is_empty() {
            errors.push("Session cookie name cannot be empty".to_string());
        }

        if self.session_max_age_days == 0 {
            errors.push("Session max age cannot be 0".to_string());
        }

        if u64::from(self.session_reissue_hours) >= u64::from(self.session_max_age_days) * 24 {
            errors.push("Session reissue interval must be shorter than the max age".to_string());
        }

        if self.maintenance_interval == 0 {
            errors.push("Maintenance interval cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses ephemeral port 0, the dev identity backend and a fixed cookie
    /// secret.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            log_level: "debug".to_string(),
            request_timeout: 5,
            tenant_cache_ttl: 60,
            identity_backend: IdentityBackend::Dev,
            identity_timeout: 2,
            cookie_secret: Some("t".repeat(MIN_COOKIE_SECRET_LEN)),
            ..Default::default()
        }
    }
}
