//! HTTP middleware for the gateway.
//!
//! - [`gate`] - tenant resolution and route protection
//! - [`routes`] - route classification
//! - [`cookies`] - tenant, session and sign-in state cookies

pub mod cookies;
pub mod gate;
pub mod routes;

pub use gate::{LOGIN_PATH, TENANT_NOT_FOUND_PATH, login_redirect, request_gate};
pub use routes::RouteClass;
