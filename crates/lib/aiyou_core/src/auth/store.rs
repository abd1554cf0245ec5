//! Credential store adapter contract.

use async_trait::async_trait;
use thiserror::Error;

/// A user as persisted by the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub email: String,
    pub password_hash: String,
    /// The single active token; overwritten on every issue.
    pub token: Option<String>,
}

/// Errors raised by credential store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness violation on write (e.g. a concurrent sign-up won the race).
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Lookup/create/update of user records keyed by email or active token.
///
/// Implementations must enforce email uniqueness on `create` independently
/// of any prior `find_by_email` check and report it as
/// [`StoreError::Duplicate`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn create(&self, record: UserRecord) -> Result<(), StoreError>;

    /// Overwrite the user's active token. Returns `false` when no user matches.
    async fn set_token(&self, email: &str, token: &str) -> Result<bool, StoreError>;
}
