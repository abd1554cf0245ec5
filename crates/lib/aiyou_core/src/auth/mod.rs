//! Authentication and authorization logic.
//!
//! Provides the credential store adapters, password hashing, signed token
//! issue/verify/refresh and the permission policy that turns a verification
//! outcome into a capability set.

pub mod clock;
#[cfg(feature = "dev-auth")]
pub mod dev;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod policy;
pub mod postgres;
pub mod store;
pub mod token;

use thiserror::Error;

pub use policy::{PermissionSet, VerificationOutcome};
pub use store::{CredentialStore, StoreError, UserRecord};
pub use token::{NULL_TOKEN, TokenConfig, TokenService};

/// Authentication errors.
///
/// `Malformed`, `Invalid` and `Expired` all deny access but are kept apart so
/// callers can tell a stale session from a forged or superseded one.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    Conflict(String),

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    #[error("Token is not held by any user")]
    OrphanToken,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for the verification failures that mean "no usable identity".
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::Malformed(_) | AuthError::Invalid | AuthError::Expired
        )
    }
}
