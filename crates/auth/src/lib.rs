//! # meddash-auth - OIDC session lifecycle
//!
//! This crate owns the signed-in session of the Meddash training dashboard:
//! the token set minted at sign-in, the refresh state machine that keeps its
//! access token valid, and the controller every authenticated read goes
//! through.
//!
//! ## Features
//!
//! - **Lazy refresh**: access tokens are refreshed on read, once they are
//!   within [`REFRESH_GRACE_SECS`](token::REFRESH_GRACE_SECS) of expiry
//! - **Sticky failure**: a failed refresh marks the token errored; it never
//!   authorizes again and is never retried
//! - **Single-flight**: concurrent reads of one session issue one refresh
//! - **Provider bindings**: Keycloak-style OIDC and an in-process dev provider
//!   behind one [`IdentityProvider`](provider::IdentityProvider) trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use meddash_auth::provider::{OidcProvider, RealmBinding};
//! use meddash_auth::session::{InMemorySessionStore, SessionController, SessionRead};
//!
//! let provider = Arc::new(OidcProvider::new(Duration::from_secs(10))?);
//! let controller = SessionController::new(provider, Arc::new(InMemorySessionStore::new()));
//!
//! let realm = RealmBinding::for_realm("https://id.example.com", "acme", "dash", "secret")?;
//! let record = controller.sign_in(&realm, "acme", &code, &redirect_uri).await?;
//!
//! match controller.read_session(&record, &realm).await? {
//!     SessionRead::Valid { view, reissue } => { /* use view.access_token */ }
//!     SessionRead::Invalid { .. } => controller.sign_out(&record, &realm).await?,
//!     SessionRead::SignedOut => { /* redirect to login */ }
//! }
//! ```

#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod provider;
pub mod session;
pub mod token;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{AuthError, AuthResult, ProviderError, ProviderResult};
pub use session::{SessionController, SessionId, SessionPolicy, SessionRead, SessionRecord, SessionView};
pub use token::{IdentityClaims, TokenError, TokenSet};
