//! `POST /api/chat`: server-side chat, agentic (CRAG) or plain.

use aiyou_core::auth::NULL_TOKEN;
use aiyou_core::crag::{CollectingNotifier, CragOrchestrator};
use aiyou_core::llm::plain_call;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{ChatRequest, ChatResponse};

fn failure(
    e: AppError,
    refreshed_token: Option<String>,
    notices: Vec<String>,
) -> (StatusCode, Json<ChatResponse>) {
    (
        e.status(),
        Json(ChatResponse {
            error: true,
            answer: None,
            message: Some(e.public_message()),
            notices,
            refreshed_token,
        }),
    )
}

async fn answer(
    state: &AppState,
    body: &ChatRequest,
    token: &str,
    notifier: &CollectingNotifier,
) -> AppResult<String> {
    let call_timeout = state.config.call_timeout;
    if body.agentic {
        let crag = CragOrchestrator::new(
            state.chat.clone(),
            state.tools.clone(),
            state.dispatcher.clone(),
            call_timeout,
        );
        Ok(crag.run(&body.history, &body.query, token, notifier).await?)
    } else {
        match timeout(
            call_timeout,
            plain_call(state.chat.as_ref(), &body.history, &body.query),
        )
        .await
        {
            Ok(reply) => Ok(reply?),
            Err(_) => Err(AppError::ProviderFailure(format!(
                "chat call timed out after {}s",
                call_timeout.as_secs()
            ))),
        }
    }
}

/// Requires a user-tier token. A token refreshed during authorization is
/// used for the pipeline's own retrieval and returned to the caller.
pub async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<ChatResponse>) {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return failure(AppError::BadRequest(rejection.body_text()), None, vec![]),
    };
    if body.query.trim().is_empty() {
        return failure(AppError::BadRequest("query is required".into()), None, vec![]);
    }

    let token = body
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| NULL_TOKEN.to_string());
    let auth = match state.dispatcher.authorize(&token).await {
        Ok(auth) => auth,
        Err(e) => {
            warn!(error = %e, "chat rejected");
            return failure(e, None, vec![]);
        }
    };
    if !auth.permissions.allow_user_calls {
        return failure(
            AppError::Forbidden("chat requires a user token".into()),
            auth.refreshed_token,
            vec![],
        );
    }

    let active = auth.refreshed_token.as_deref().unwrap_or(&token);
    let notifier = CollectingNotifier::new();
    let result = answer(&state, &body, active, &notifier).await;
    let notices = notifier.into_messages();

    match result {
        Ok(answer) => {
            info!(agentic = body.agentic, notices = notices.len(), "chat answered");
            (
                StatusCode::OK,
                Json(ChatResponse {
                    error: false,
                    answer: Some(answer),
                    message: None,
                    notices,
                    refreshed_token: auth.refreshed_token,
                }),
            )
        }
        Err(e) => {
            warn!(agentic = body.agentic, error = %e, "chat failed");
            failure(e, auth.refreshed_token, notices)
        }
    }
}
