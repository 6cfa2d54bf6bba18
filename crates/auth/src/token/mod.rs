//! Session token set, claims decoding and the refresh state machine.

mod claims;
mod refresher;
mod set;

pub use claims::{decode_identity_claims, encode_unsigned_jwt};
pub use refresher::{REFRESH_GRACE_SECS, RefreshAction, TokenRefresher, decide};
pub use set::{IdentityClaims, TokenError, TokenSet};
