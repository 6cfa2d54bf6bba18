//! Identity-provider flow handlers under `/api/auth`.
//!
//! The request gate lets these through untouched, so each handler resolves
//! the tenant itself. Failures never render an error body; they redirect to
//! `/login?error=<code>`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::middleware::cookies::{self, AuthFlowState};
use crate::middleware::{LOGIN_PATH, login_redirect};
use crate::state::AppState;
use crate::tenant::{TenantConfig, request_host};

/// Path the identity provider redirects back to.
pub const CALLBACK_PATH: &str = "/api/auth/callback";

const DEFAULT_CALLBACK: &str = "/dashboard";

/// Error codes carried to the login page.
pub mod codes {
    /// The tenant or its realm could not be resolved.
    pub const CONFIGURATION: &str = "Configuration";
    /// The authorization redirect could not be built.
    pub const OAUTH_SIGNIN: &str = "OAuthSignin";
    /// State mismatch or failed code exchange.
    pub const OAUTH_CALLBACK: &str = "OAuthCallback";
    /// The provider reported an error instead of a code.
    pub const ACCESS_DENIED: &str = "AccessDenied";
}

fn login_error(code: &str) -> Redirect {
    login_redirect(None, Some(code))
}

/// Only same-origin paths are followed after sign-in.
fn sanitize_callback(callback: Option<&str>) -> String {
    match callback {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => DEFAULT_CALLBACK.to_string(),
    }
}

/// Absolute URL on the host the request arrived at.
fn absolute_url(state: &AppState, headers: &HeaderMap, uri: &Uri, path: &str) -> Option<String> {
    let host = request_host(headers, uri)?;
    Some(format!("{}://{}{}", state.config().scheme(), host, path))
}

async fn resolve_tenant(
    state: &AppState,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Arc<TenantConfig>, Redirect> {
    state.tenant_for_request(headers, uri).await.map_err(|e| {
        debug!(error = %e, "Auth route without a tenant");
        login_error(codes::CONFIGURATION)
    })
}

/// Query parameters of `/api/auth/signin`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInQuery {
    /// Where to go after signing in.
    pub callback_url: Option<String>,
}

/// `GET /api/auth/signin`
///
/// Stores a fresh anti-forgery state in a private cookie and redirects to the
/// provider's authorization endpoint.
pub async fn signin_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<SignInQuery>,
) -> Response {
    let tenant = match resolve_tenant(&state, &headers, &uri).await {
        Ok(tenant) => tenant,
        Err(redirect) => return redirect.into_response(),
    };
    let Some(redirect_uri) = absolute_url(&state, &headers, &uri, CALLBACK_PATH) else {
        return login_error(codes::CONFIGURATION).into_response();
    };

    let flow = AuthFlowState {
        state: Uuid::new_v4().to_string(),
        callback_url: sanitize_callback(query.callback_url.as_deref()),
    };

    let authorization_url = state.realm_for(&tenant).map_err(|e| e.to_string()).and_then(
        |realm| {
            state
                .sessions()
                .provider()
                .authorization_url(&realm, &redirect_uri, &flow.state)
                .map_err(|e| e.to_string())
        },
    );
    let authorization_url = match authorization_url {
        Ok(url) => url,
        Err(e) => {
            warn!(tenant = %tenant.subdomain, error = %e, "Cannot build authorization URL");
            return login_error(codes::OAUTH_SIGNIN).into_response();
        }
    };

    let cookie = match cookies::auth_state_cookie(&flow, state.secure_cookies()) {
        Ok(cookie) => cookie,
        Err(e) => return e.into_response(),
    };

    debug!(tenant = %tenant.subdomain, "Starting sign-in");
    (jar.add(cookie), Redirect::to(authorization_url.as_str())).into_response()
}

/// Query parameters of `/api/auth/callback`.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code.
    pub code: Option<String>,
    /// Echoed anti-forgery state.
    pub state: Option<String>,
    /// Provider error, instead of a code.
    pub error: Option<String>,
}

/// `GET /api/auth/callback`
///
/// Verifies the state, exchanges the code and sets the session cookie.
pub async fn callback_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let flow = cookies::read_auth_state(&jar);
    let jar = jar.remove(cookies::clear_auth_state_cookie());

    if let Some(error) = &query.error {
        info!(error = %error, "Identity provider refused sign-in");
        return (jar, login_error(codes::ACCESS_DENIED)).into_response();
    }

    let (Some(flow), Some(code), Some(returned_state)) = (flow, query.code, query.state) else {
        warn!("Sign-in callback with missing code or state");
        return (jar, login_error(codes::OAUTH_CALLBACK)).into_response();
    };
    if flow.state != returned_state {
        warn!("Sign-in callback state mismatch");
        return (jar, login_error(codes::OAUTH_CALLBACK)).into_response();
    }

    let tenant = match resolve_tenant(&state, &headers, &uri).await {
        Ok(tenant) => tenant,
        Err(redirect) => return (jar, redirect).into_response(),
    };
    let realm = match state.realm_for(&tenant) {
        Ok(realm) => realm,
        Err(e) => {
            warn!(tenant = %tenant.subdomain, error = %e, "Tenant realm misconfigured");
            return (jar, login_error(codes::CONFIGURATION)).into_response();
        }
    };
    let Some(redirect_uri) = absolute_url(&state, &headers, &uri, CALLBACK_PATH) else {
        return (jar, login_error(codes::CONFIGURATION)).into_response();
    };

    let record = match state
        .sessions()
        .sign_in(&realm, &tenant.subdomain, &code, &redirect_uri)
        .await
    {
        Ok(record) => record,
        Err(e) => {
            warn!(tenant = %tenant.subdomain, error = %e, "Sign-in failed");
            return (jar, login_error(codes::OAUTH_CALLBACK)).into_response();
        }
    };

    let jar = match cookies::write_session(
        jar,
        state.session_cookie_name(),
        &record,
        state.config().session_max_age_days,
        state.secure_cookies(),
    ) {
        Ok(jar) => jar,
        Err(e) => return e.into_response(),
    };
    let tenant_cookie = cookies::tenant_cookie(&tenant.subdomain, state.secure_cookies());

    (
        jar,
        CookieJar::new().add(tenant_cookie),
        Redirect::to(&sanitize_callback(Some(&flow.callback_url))),
    )
        .into_response()
}

/// Query parameters of `/api/auth/signout`.
#[derive(Debug, Default, Deserialize)]
pub struct SignOutQuery {
    /// Also end the provider's browser session.
    #[serde(default)]
    pub federated: bool,
}

/// `POST /api/auth/signout`, or `GET` with `federated=true`
///
/// Always clears the session cookie. With `federated=true` and a known id
/// token the browser is sent to the provider's end-session endpoint, which
/// returns it to `/login`. A plain `GET` is refused so a cross-site link
/// cannot sign the user out.
pub async fn signout_handler(
    State(state): State<AppState>,
    method: Method,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<SignOutQuery>,
) -> Response {
    if method != Method::POST && !query.federated {
        return (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST")]).into_response();
    }

    let record = cookies::read_session(&jar, state.session_cookie_name());
    let jar = cookies::clear_session(jar, state.session_cookie_name());

    let Some(record) = record else {
        return (jar, Redirect::to(LOGIN_PATH)).into_response();
    };
    let realm = match resolve_tenant(&state, &headers, &uri)
        .await
        .ok()
        .filter(|tenant| record.is_for_tenant(&tenant.subdomain))
        .map(|tenant| state.realm_for(&tenant))
    {
        Some(Ok(realm)) => realm,
        _ => {
            debug!(sid = %record.sid, "Sign-out for another tenant; clearing cookie only");
            return (jar, Redirect::to(LOGIN_PATH)).into_response();
        }
    };

    if query.federated {
        let post_logout = absolute_url(&state, &headers, &uri, LOGIN_PATH)
            .unwrap_or_else(|| LOGIN_PATH.to_string());
        return match state
            .sessions()
            .sign_out_federated(&record, &realm, &post_logout)
            .await
        {
            Ok(Some(url)) => (jar, Redirect::to(url.as_str())).into_response(),
            Ok(None) => (jar, Redirect::to(LOGIN_PATH)).into_response(),
            Err(e) => {
                warn!(sid = %record.sid, error = %e, "Federated sign-out failed");
                (jar, Redirect::to(LOGIN_PATH)).into_response()
            }
        };
    }

    if let Err(e) = state.sessions().sign_out(&record, &realm).await {
        warn!(sid = %record.sid, error = %e, "Sign-out failed");
    }
    (jar, Redirect::to(LOGIN_PATH)).into_response()
}
