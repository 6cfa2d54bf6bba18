//! Session extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use meddash_auth::session::SessionView;

use crate::error::GatewayError;

/// The caller's session, as validated by the request gate.
///
/// Only present on protected routes. Rejects with
/// [`GatewayError::Unauthenticated`] elsewhere.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionView);

impl CurrentSession {
    /// Consumes the extractor and returns the view.
    pub fn into_inner(self) -> SessionView {
        self.0
    }
}

impl std::ops::Deref for CurrentSession {
    type Target = SessionView;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionView>()
            .cloned()
            .map(CurrentSession)
            .ok_or(GatewayError::Unauthenticated)
    }
}
