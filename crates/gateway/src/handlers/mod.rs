//! HTTP request handlers.
//!
//! - [`health`] - health and readiness checks
//! - [`pages`] - landing, login, dashboard and session JSON
//! - [`auth`] - the identity-provider sign-in and sign-out flow

pub mod auth;
pub mod health;
pub mod pages;

pub use auth::{callback_handler, signin_handler, signout_handler};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use pages::{
    dashboard_handler, landing_handler, login_handler, not_found_handler, session_handler,
    tenant_not_found_handler,
};
