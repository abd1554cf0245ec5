//! Account flows: sign-up and password login.

use aiyou_core::auth::password::{hash_password, verify_password};
use aiyou_core::auth::{AuthError, StoreError, TokenService, UserRecord};
use tracing::{info, trace};

use crate::error::{AppError, AppResult};
use crate::models::Credentials;

/// Create a user and return their first token.
///
/// The store's uniqueness constraint backs up the pre-check, so a concurrent
/// sign-up for the same email still ends in `Conflict`.
pub async fn create_user(
    tokens: &TokenService,
    credentials: &Credentials,
    bcrypt_cost: u32,
) -> AppResult<String> {
    let email = credentials.email.as_str();
    if tokens.store().find_by_email(email).await?.is_some() {
        return Err(AuthError::Conflict(email.to_string()).into());
    }

    let password_hash = hash_password(&credentials.password, bcrypt_cost)?;
    let token = tokens.mint(email)?;
    let record = UserRecord {
        email: email.to_string(),
        password_hash,
        token: Some(token.clone()),
    };
    match tokens.store().create(record).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return Err(AuthError::Conflict(email.to_string()).into());
        }
        Err(e) => return Err(e.into()),
    }

    info!(email, "user created");
    trace!(email, token = %token, "initial token");
    Ok(token)
}

/// Check a password and issue a new token, superseding any previous one.
pub async fn authenticate(tokens: &TokenService, credentials: &Credentials) -> AppResult<String> {
    let email = credentials.email.as_str();

    #[cfg(feature = "dev-auth")]
    {
        if let Some(dev) = tokens.dev_auth()
            && dev.matches_credentials(email, &credentials.password)
        {
            tracing::warn!(email, "escape-hatch login; token not stored");
            return Ok(tokens.mint(dev.username())?);
        }
    }

    let user = tokens
        .store()
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user {email}")))?;

    if !verify_password(&credentials.password, &user.password_hash) {
        info!(email, "password mismatch");
        return Err(AuthError::CredentialError.into());
    }

    let token = tokens.issue(email).await?;
    info!(email, "user authenticated");
    Ok(token)
}
