//! Error types for the session layer.
//!
//! [`ProviderError`] covers everything that can go wrong talking to the
//! identity provider. [`AuthError`] is the crate-level error returned by the
//! session controller and stores.
//!
//! Refresh failures are deliberately *not* surfaced as errors: the refresher
//! folds them into the token's sticky [`TokenError`](crate::token::TokenError)
//! flag so the session is treated as expired rather than as a server fault.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// Errors raised by an [`IdentityProvider`](crate::provider::IdentityProvider).
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("{operation} rejected by identity provider with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The provider answered 2xx but the body was unusable.
    #[error("malformed {operation} response: {reason}")]
    Malformed {
        operation: &'static str,
        reason: String,
    },

    /// An endpoint URL could not be built from the realm binding.
    #[error("invalid identity provider endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// The primary error type for session operations.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Identity provider interaction failed during sign-in.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The session persistence store failed.
    #[error("session store error: {0}")]
    Store(String),

    /// The identity claims in an issued token were unusable.
    #[error("invalid identity claims: {0}")]
    Claims(String),
}

/// Result type alias for session operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type alias for identity provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = ProviderError::Status {
            operation: "token refresh",
            status: 400,
            body: "invalid_grant".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("token refresh"));
        assert!(msg.contains("400"));
        assert!(msg.contains("invalid_grant"));
    }

    #[test]
    fn test_provider_error_converts() {
        let err: AuthError = ProviderError::Malformed {
            operation: "code exchange",
            reason: "missing access_token".to_string(),
        }
        .into();
        assert!(matches!(err, AuthError::Provider(_)));
        assert!(err.to_string().contains("missing access_token"));
    }
}
