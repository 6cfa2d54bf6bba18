//! Route classification for the request gate.

use std::fmt;

use crate::config::RouteConfig;

/// How the request gate treats a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Identity-provider flow; passed through untouched.
    Auth,
    /// Static asset; passed through untouched.
    Static,
    /// Never redirected; tenant attached when it resolves.
    Public,
    /// Requires a valid tenant and a valid session.
    Protected,
    /// Requires a valid tenant.
    Tenant,
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteClass::Auth => "auth",
            RouteClass::Static => "static",
            RouteClass::Public => "public",
            RouteClass::Protected => "protected",
            RouteClass::Tenant => "tenant",
        };
        f.write_str(name)
    }
}

impl RouteConfig {
    /// Classifies `path`. First match wins, in the order of [`RouteClass`].
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.auth_prefixes.iter().any(|p| under_prefix(path, p)) {
            return RouteClass::Auth;
        }
        if self.is_static_asset(path) {
            return RouteClass::Static;
        }
        if self.public_routes.iter().any(|r| r == path) {
            return RouteClass::Public;
        }
        if self.protected_prefixes.iter().any(|p| under_prefix(path, p)) {
            return RouteClass::Protected;
        }
        RouteClass::Tenant
    }

    fn is_static_asset(&self, path: &str) -> bool {
        if self.static_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return true;
        }
        let file = path.rsplit('/').next().unwrap_or_default();
        file.rsplit_once('.').is_some_and(|(stem, ext)| {
            !stem.is_empty()
                && self
                    .static_extensions
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
        })
    }
}

/// `/dashboard` matches `/dashboard` and `/dashboard/x`, not `/dashboards`.
fn under_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
