//! `POST /api`: the single operation endpoint.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use crate::AppState;
use crate::error::AppError;
use crate::models::{ApiRequest, ApiResponse};

/// Dispatch one envelope. Always answers with an envelope, even when the
/// body itself does not parse.
pub async fn api_handler(
    State(state): State<AppState>,
    body: Result<Json<ApiRequest>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let e = AppError::BadRequest(rejection.body_text());
            return (e.status(), Json(ApiResponse::failure(&e, None)));
        }
    };
    let (status, response) = state.dispatcher.dispatch(request).await.into_response_parts();
    (status, Json(response))
}
