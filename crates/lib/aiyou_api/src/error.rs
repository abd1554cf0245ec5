//! Application error types.

use std::any::Any;

use aiyou_core::auth::{AuthError, StoreError};
use aiyou_core::crag::CragError;
use aiyou_core::llm::LlmError;
use aiyou_core::retrieval::RetrievalError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ApiResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Nonstandard status for "authenticated, but not a user-tier token".
pub const NOT_A_USER_STATUS: u16 = 449;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Token missing from the store, expired, or undecodable.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Wrong password.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not a user: {0}")]
    NotAUser(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotAUser(_) => {
                StatusCode::from_u16(NOT_A_USER_STATUS).unwrap_or(StatusCode::FORBIDDEN)
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProviderFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller. Internal detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(m)
            | AppError::Unauthenticated(m)
            | AppError::Unauthorized(m)
            | AppError::Forbidden(m)
            | AppError::NotAUser(m)
            | AppError::Conflict(m)
            | AppError::NotFound(m)
            | AppError::ProviderFailure(m) => m.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

/// Message carried by a panic payload.
pub(crate) fn panic_detail(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiResponse::failure(&self, None))).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::UserNotFound(email) => AppError::NotFound(format!("No user {email}")),
            AuthError::Conflict(email) => AppError::Conflict(format!("User {email} already exists")),
            AuthError::Malformed(_) => AppError::Unauthenticated("jwt malformed".into()),
            AuthError::Invalid => AppError::Unauthenticated("invalid token".into()),
            AuthError::Expired => AppError::Unauthenticated("jwt expired".into()),
            AuthError::OrphanToken => {
                AppError::Unauthenticated("token is not held by any user".into())
            }
            AuthError::Store(StoreError::Duplicate(email)) => {
                AppError::Conflict(format!("User {email} already exists"))
            }
            AuthError::Store(StoreError::Db(e)) => AppError::Internal(e.to_string()),
            AuthError::TokenError(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::from(AuthError::from(e))
    }
}

impl From<RetrievalError> for AppError {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::EmptyText => AppError::BadRequest(e.to_string()),
            other => AppError::ProviderFailure(other.to_string()),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::ProviderFailure(e.to_string())
    }
}

impl From<CragError> for AppError {
    fn from(e: CragError) -> Self {
        AppError::ProviderFailure(e.to_string())
    }
}
