//! Hostname to tenant subdomain.
//!
//! Resolution never consults the registry; whether a subdomain is actually
//! registered is decided afterwards.

use axum::http::{HeaderMap, Uri, header::HOST};

/// Hosts that always map to the development tenant.
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// Label that means "no tenant".
const NO_TENANT_LABEL: &str = "www";

/// Maps inbound hostnames to tenant subdomains.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    dev_fallback: String,
}

impl TenantResolver {
    /// Creates a resolver that maps local hosts to `dev_fallback`.
    pub fn new(dev_fallback: impl Into<String>) -> Self {
        Self {
            dev_fallback: dev_fallback.into(),
        }
    }

    /// The development fallback subdomain.
    pub fn dev_fallback(&self) -> &str {
        &self.dev_fallback
    }

    /// Resolves `host` (optionally with a port) to a subdomain.
    ///
    /// - `acme.product.com[:port]` resolves to `acme`
    /// - `localhost`, `127.0.0.1`, `[::1]` and single-label hosts resolve to
    ///   the development fallback
    /// - `www.product.com` and an empty host resolve to `None`
    pub fn resolve(&self, host: &str) -> Option<String> {
        let hostname = strip_port(host.trim());
        if hostname.is_empty() {
            return None;
        }
        if LOOPBACK_HOSTS.contains(&hostname) {
            return Some(self.dev_fallback.clone());
        }
        // any other IPv6 literal has no subdomain
        if hostname.contains(':') {
            return None;
        }

        let mut labels = hostname.split('.');
        let first = labels.next().unwrap_or_default();
        if labels.next().is_none() {
            return Some(self.dev_fallback.clone());
        }
        if first.is_empty() || first == NO_TENANT_LABEL {
            return None;
        }
        Some(first.to_string())
    }

    /// Resolves the host of a request, preferring the `Host` header.
    pub fn resolve_request(&self, headers: &HeaderMap, uri: &Uri) -> Option<String> {
        request_host(headers, uri).and_then(|host| self.resolve(&host))
    }
}

/// The host a request was addressed to, port included.
pub fn request_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
}

/// Removes a trailing `:port`, unwrapping bracketed IPv6 literals.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split_once(']').map_or(rest, |(addr, _)| addr);
    }
    match host.rsplit_once(':') {
        // a bare IPv6 literal has more than one colon and no port
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}
