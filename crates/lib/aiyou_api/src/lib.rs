//! # aiyou_api
//!
//! HTTP API library for AIYou: the request dispatcher behind `POST /api`
//! and the server-side chat endpoint.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

use std::any::Any;
use std::sync::Arc;

use aiyou_core::auth::TokenService;
use aiyou_core::llm::ChatProvider;
use aiyou_core::retrieval::RetrievalGateway;
use aiyou_core::tools::ToolInvoker;
use axum::Router;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::ApiConfig;
use crate::error::{AppError, panic_detail};
use crate::handlers::{api, chat, hello};
use crate::services::dispatcher::Dispatcher;

pub const ROUTE_API: &str = "/api";
pub const ROUTE_CHAT: &str = "/api/chat";
pub const ROUTE_HELLO: &str = "/api/hello";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    /// Token verification, permissions and operation dispatch.
    pub dispatcher: Arc<Dispatcher>,
    /// Chat-completion provider for `/api/chat`.
    pub chat: Arc<dyn ChatProvider>,
    /// Tools offered to the CRAG pipeline.
    pub tools: Arc<dyn ToolInvoker>,
    /// Name of the credential/vector store backend, for the health check.
    pub store_backend: &'static str,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        tokens: TokenService,
        retrieval: RetrievalGateway,
        chat: Arc<dyn ChatProvider>,
        tools: Arc<dyn ToolInvoker>,
        store_backend: &'static str,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(tokens, retrieval, config.bcrypt_cost));
        Self {
            config,
            dispatcher,
            chat,
            tools,
            store_backend,
        }
    }
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic_detail(panic.as_ref());
    error!(detail = %detail, "handler panicked");
    AppError::Internal(detail).into_response()
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route(ROUTE_API, post(api::api_handler))
        .route(ROUTE_CHAT, post(chat::chat_handler))
        .route(ROUTE_HELLO, get(hello::hello_world))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
