//! Hello world endpoint: bootstrap health check.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::models::HelloResponse;

/// `GET /api/hello`: core version and the active store backend.
pub async fn hello_world(State(state): State<AppState>) -> Json<HelloResponse> {
    Json(HelloResponse {
        greeting: format!("Hello from aiyou_core v{}", aiyou_core::version()),
        store_backend: state.store_backend.to_string(),
    })
}
