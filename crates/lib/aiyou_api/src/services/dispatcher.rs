//! Request dispatcher.
//!
//! Per request: parse, verify the token into a permission set, eagerly
//! refresh when eligible, then run the operation after checking the one
//! capability it needs. Nothing is kept between requests.

use std::panic::AssertUnwindSafe;

use aiyou_core::auth::{PermissionSet, TokenService};
use aiyou_core::crag::{RetrieveFailure, Retriever};
use aiyou_core::retrieval::RetrievalGateway;
use async_trait::async_trait;
use axum::http::StatusCode;
use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::error::{AppError, AppResult, panic_detail};
use crate::models::{ApiRequest, ApiResponse};
use crate::services::auth;
use crate::services::operation::Operation;

/// Successful payload of an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub documents: Option<Vec<String>>,
    pub token: Option<String>,
}

/// Result of one dispatched request, with the token refreshed on the way.
#[derive(Debug)]
pub struct Dispatched {
    pub result: AppResult<Reply>,
    pub refreshed_token: Option<String>,
}

impl Dispatched {
    fn failed(error: AppError) -> Self {
        Self {
            result: Err(error),
            refreshed_token: None,
        }
    }

    /// Status and envelope; the refreshed token rides along either way.
    pub fn into_response_parts(self) -> (StatusCode, ApiResponse) {
        match self.result {
            Ok(reply) => (
                StatusCode::OK,
                ApiResponse {
                    error: false,
                    message: None,
                    documents: reply.documents,
                    token: reply.token,
                    refreshed_token: self.refreshed_token,
                },
            ),
            Err(e) => (e.status(), ApiResponse::failure(&e, self.refreshed_token)),
        }
    }
}

/// Permissions resolved for a token, plus the replacement token if the
/// sliding window triggered a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub permissions: PermissionSet,
    pub refreshed_token: Option<String>,
}

#[derive(Clone)]
pub struct Dispatcher {
    tokens: TokenService,
    retrieval: RetrievalGateway,
    bcrypt_cost: u32,
}

fn require(allowed: bool, what: &str) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("token does not allow {what}")))
    }
}

impl Dispatcher {
    pub fn new(tokens: TokenService, retrieval: RetrievalGateway, bcrypt_cost: u32) -> Self {
        Self {
            tokens,
            retrieval,
            bcrypt_cost,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Verify `token` and refresh it if it is inside the refresh window.
    pub async fn authorize(&self, token: &str) -> AppResult<Authorized> {
        let outcome = self.tokens.verify(token).await?;
        let permissions = self.tokens.permissions(&outcome);
        let refreshed_token = if permissions.auto_refresh {
            let fresh = self.tokens.refresh(token).await?;
            debug!("token auto-refreshed");
            Some(fresh)
        } else {
            None
        };
        Ok(Authorized {
            permissions,
            refreshed_token,
        })
    }

    /// Parse and run a raw envelope.
    pub async fn dispatch(&self, request: ApiRequest) -> Dispatched {
        let method = request.method.clone();
        match Operation::parse(request) {
            Ok(op) => self.execute(op).await,
            Err(e) => {
                warn!(operation = %method, error = %e, "rejected request");
                Dispatched::failed(e)
            }
        }
    }

    /// Run an already-validated operation.
    pub async fn execute(&self, op: Operation) -> Dispatched {
        let name = op.name();
        let token = op.token().map(str::to_string);
        let dispatched = match token.as_deref() {
            None => Dispatched {
                result: self.run_guarded(op, PermissionSet::NULL, None).await,
                refreshed_token: None,
            },
            Some(token) => match self.authorize(token).await {
                Ok(auth) => Dispatched {
                    result: self
                        .run_guarded(op, auth.permissions, auth.refreshed_token.as_deref())
                        .await,
                    refreshed_token: auth.refreshed_token,
                },
                Err(e) => Dispatched::failed(e),
            },
        };

        if let Err(e) = &dispatched.result {
            match e {
                AppError::Internal(detail) => {
                    error!(operation = name, detail = %detail, "operation failed")
                }
                _ => warn!(operation = name, error = %e, "operation failed"),
            }
        } else {
            debug!(operation = name, "operation succeeded");
        }
        dispatched
    }

    /// A panicking operation becomes `Internal`, keeping any refreshed token.
    async fn run_guarded(
        &self,
        op: Operation,
        permissions: PermissionSet,
        refreshed_token: Option<&str>,
    ) -> AppResult<Reply> {
        match AssertUnwindSafe(self.run(op, permissions, refreshed_token))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(AppError::Internal(panic_detail(panic.as_ref()))),
        }
    }

    async fn run(
        &self,
        op: Operation,
        permissions: PermissionSet,
        refreshed_token: Option<&str>,
    ) -> AppResult<Reply> {
        match op {
            Operation::Ingest { text, source, .. } => {
                require(permissions.allow_user_calls, "ingest")?;
                self.retrieval.ingest(&text, source.as_deref()).await?;
                Ok(Reply::default())
            }
            Operation::Retrieve { text, .. } => {
                require(permissions.allow_user_calls, "retrieve")?;
                let documents = self.retrieval.retrieve(&text).await?;
                Ok(Reply {
                    documents: Some(documents),
                    token: None,
                })
            }
            Operation::Reindex { .. } => {
                require(permissions.allow_index, "index")?;
                self.retrieval.reindex().await?;
                Ok(Reply::default())
            }
            Operation::CreateUser { credentials, .. } => {
                require(permissions.allow_create, "createUser")?;
                let token = auth::create_user(&self.tokens, &credentials, self.bcrypt_cost).await?;
                Ok(Reply {
                    documents: None,
                    token: Some(token),
                })
            }
            Operation::Authenticate { credentials } => {
                let token = auth::authenticate(&self.tokens, &credentials).await?;
                Ok(Reply {
                    documents: None,
                    token: Some(token),
                })
            }
            Operation::Verify { .. } => {
                if !permissions.allow_user_calls {
                    return Err(AppError::NotAUser("token is valid but not a user token".into()));
                }
                Ok(Reply::default())
            }
            Operation::Refresh { .. } => match refreshed_token {
                Some(token) if permissions.auto_refresh => Ok(Reply {
                    documents: None,
                    token: Some(token.to_string()),
                }),
                _ => Err(AppError::Forbidden("token is not eligible for refresh".into())),
            },
        }
    }
}

/// Same capability check as `POST /api` retrieve, without the eager refresh.
/// The chat request has already refreshed the token it hands back.
#[async_trait]
impl Retriever for Dispatcher {
    async fn retrieve(&self, query: &str, token: &str) -> Result<Vec<String>, RetrieveFailure> {
        let op = Operation::Retrieve {
            token: token.to_string(),
            text: query.to_string(),
        };
        let result = match self.tokens.verify(token).await {
            Ok(outcome) => {
                let permissions = self.tokens.permissions(&outcome);
                self.run_guarded(op, permissions, None).await
            }
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(reply) => Ok(reply.documents.unwrap_or_default()),
            Err(e) => {
                warn!(operation = "retrieve", error = %e, "pipeline retrieval failed");
                Err(RetrieveFailure(e.public_message()))
            }
        }
    }
}
