//! The per-request gate.
//!
//! Runs in this order, first match wins:
//!
//! 1. auth routes and static assets pass through untouched
//! 2. public routes resolve the tenant opportunistically and never redirect
//! 3. everything else needs a registered tenant, or is redirected to
//!    `/tenant-not-found`
//! 4. protected routes also need a valid session, or are redirected to
//!    `/login`
//!
//! Forwarded requests carry the [`TenantContext`] (and on protected routes the
//! [`SessionView`]) in their extensions, plus the tenant request headers.
//! Client-supplied tenant headers are always removed first.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use meddash_auth::session::{SessionRead, SessionRecord, SessionView};
use tracing::{debug, error, info};

use super::cookies;
use super::routes::RouteClass;
use crate::error::GatewayError;
use crate::state::AppState;
use crate::tenant::{TenantConfig, TenantContext, strip_tenant_headers};

/// Path of the tenant-not-found page.
pub const TENANT_NOT_FOUND_PATH: &str = "/tenant-not-found";

/// Path of the login page.
pub const LOGIN_PATH: &str = "/login";

/// Error code appended to the login redirect for an expired session.
pub const SESSION_EXPIRED: &str = "SessionExpired";

/// Middleware function for the request gate.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn request_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let class = state.config().routes.classify(&path);
    debug!(path = %path, class = %class, "Classified request");

    if matches!(class, RouteClass::Auth | RouteClass::Static) {
        return next.run(request).await;
    }

    strip_tenant_headers(request.headers_mut());

    let subdomain = state
        .resolver()
        .resolve_request(request.headers(), request.uri());
    let lookup = match &subdomain {
        Some(subdomain) => state.registry().get(subdomain).await,
        None => Ok(None),
    };

    if class == RouteClass::Public {
        let tenant = lookup.unwrap_or_else(|e| {
            error!(error = %e, "Tenant lookup failed on public route");
            None
        });
        return match tenant {
            Some(config) => forward_with_tenant(&state, config, request, next).await,
            None => next.run(request).await,
        };
    }

    let config = match lookup {
        Ok(Some(config)) => config,
        Ok(None) => {
            debug!(subdomain = ?subdomain, path = %path, "Tenant not found");
            return Redirect::to(TENANT_NOT_FOUND_PATH).into_response();
        }
        Err(e) => return e.into_response(),
    };

    if class == RouteClass::Tenant {
        return forward_with_tenant(&state, config, request, next).await;
    }

    let jar = PrivateCookieJar::from_headers(request.headers(), state.cookie_key().clone());
    let tenant_jar = CookieJar::new().add(cookies::tenant_cookie(
        &config.subdomain,
        state.secure_cookies(),
    ));
    let callback = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.clone(), |pq| pq.as_str().to_string());

    let Some(record) = cookies::read_session(&jar, state.session_cookie_name())
        .filter(|record| record.is_for_tenant(&config.subdomain))
    else {
        debug!(path = %path, tenant = %config.subdomain, "No session; redirecting to login");
        return (tenant_jar, login_redirect(Some(&callback), None)).into_response();
    };

    match authorize(&state, &config, &record).await {
        Ok(Authorization::Valid { view, reissue }) => {
            let jar = match reissue {
                Some(reissued) => match cookies::write_session(
                    jar,
                    state.session_cookie_name(),
                    &reissued,
                    state.config().session_max_age_days,
                    state.secure_cookies(),
                ) {
                    Ok(jar) => jar,
                    Err(e) => return e.into_response(),
                },
                None => jar,
            };
            request.extensions_mut().insert(view);
            let response = forward_with_tenant(&state, config, request, next).await;
            (jar, response).into_response()
        }
        Ok(Authorization::Expired) => {
            let jar = cookies::clear_session(jar, state.session_cookie_name());
            (tenant_jar, jar, login_redirect(None, Some(SESSION_EXPIRED))).into_response()
        }
        Ok(Authorization::SignedOut) => {
            let jar = cookies::clear_session(jar, state.session_cookie_name());
            (tenant_jar, jar, login_redirect(Some(&callback), None)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

enum Authorization {
    Valid {
        view: SessionView,
        reissue: Option<SessionRecord>,
    },
    Expired,
    SignedOut,
}

/// Reads the session; an errored session is signed out before returning.
async fn authorize(
    state: &AppState,
    config: &TenantConfig,
    record: &SessionRecord,
) -> Result<Authorization, GatewayError> {
    let realm = state.realm_for(config)?;
    match state.sessions().read_session(record, &realm).await? {
        SessionRead::Valid { view, reissue } => Ok(Authorization::Valid { view, reissue }),
        SessionRead::Invalid { reason } => {
            info!(
                sid = %record.sid,
                tenant = %config.subdomain,
                reason = %reason,
                "Session no longer valid; forcing sign-in"
            );
            state.sessions().sign_out(record, &realm).await?;
            Ok(Authorization::Expired)
        }
        SessionRead::SignedOut => Ok(Authorization::SignedOut),
    }
}

/// Attaches tenant context and forwards, setting the tenant cookie.
async fn forward_with_tenant(
    state: &AppState,
    config: Arc<TenantConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie = cookies::tenant_cookie(&config.subdomain, state.secure_cookies());
    let context = TenantContext::new(config);
    context.apply_headers(request.headers_mut());
    request.extensions_mut().insert(context);

    let response = next.run(request).await;
    (CookieJar::new().add(cookie), response).into_response()
}

/// `/login`, optionally with `callbackUrl` and `error` query parameters.
pub fn login_redirect(callback_url: Option<&str>, error: Option<&str>) -> Redirect {
    let mut params = Vec::new();
    if let Some(callback_url) = callback_url {
        params.push(format!("callbackUrl={}", urlencoding::encode(callback_url)));
    }
    if let Some(error) = error {
        params.push(format!("error={}", urlencoding::encode(error)));
    }
    if params.is_empty() {
        Redirect::to(LOGIN_PATH)
    } else {
        Redirect::to(&format!("{LOGIN_PATH}?{}", params.join("&")))
    }
}
