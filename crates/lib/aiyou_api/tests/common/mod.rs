//! Shared harness: in-memory stores, local embedder, manual clock.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use aiyou_api::config::ApiConfig;
use aiyou_api::models::{ApiResponse, ChatResponse};
use aiyou_api::{AppState, router};
use aiyou_core::auth::clock::ManualClock;
use aiyou_core::auth::memory::MemoryCredentialStore;
use aiyou_core::auth::{TokenConfig, TokenService};
use aiyou_core::embedding::local::LocalEmbedder;
use aiyou_core::embedding::{Embedder, EmbeddingError};
use aiyou_core::llm::{ChatMessage, ChatProvider, ChatReply, LlmError};
use aiyou_core::retrieval::memory::MemoryVectorStore;
use aiyou_core::retrieval::{RetrievalConfig, RetrievalGateway};
use aiyou_core::tools::{ToolEndpoints, ToolInvoker, ToolRegistry, ToolSchema};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const START: i64 = 1_750_000_000;
pub const DIMS: usize = 16;
pub const SECRET: &[u8] = b"integration-test-secret";

/// Chat provider for tests that never reach the model.
pub struct NoChat;

#[async_trait]
impl ChatProvider for NoChat {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[ToolSchema]>,
    ) -> Result<ChatReply, LlmError> {
        Err(LlmError::Provider("no chat provider in this test".into()))
    }
}

/// Embedder that always fails, to make retrieval fail.
pub struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Provider("embedding backend offline".into()))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// Embedder that panics mid-operation.
pub struct PanickingEmbedder;

#[async_trait]
impl Embedder for PanickingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        panic!("embedding backend crashed");
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

pub struct Harness {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub users: Arc<MemoryCredentialStore>,
    pub vectors: Arc<MemoryVectorStore>,
    pub tokens: TokenService,
}

pub fn harness() -> Harness {
    harness_with(
        Arc::new(NoChat),
        Arc::new(ToolRegistry::new(ToolEndpoints::default(), Duration::from_secs(1))),
        Arc::new(LocalEmbedder::new(DIMS)),
    )
}

pub fn harness_with(
    chat: Arc<dyn ChatProvider>,
    tools: Arc<dyn ToolInvoker>,
    embedder: Arc<dyn Embedder>,
) -> Harness {
    harness_on(Arc::new(ManualClock::new(START)), chat, tools, embedder)
}

/// Like [`harness_with`], on a clock the caller also holds.
pub fn harness_on(
    clock: Arc<ManualClock>,
    chat: Arc<dyn ChatProvider>,
    tools: Arc<dyn ToolInvoker>,
    embedder: Arc<dyn Embedder>,
) -> Harness {
    let users = Arc::new(MemoryCredentialStore::new());
    let vectors = Arc::new(MemoryVectorStore::new(DIMS));

    let tokens = TokenService::new(users.clone(), SECRET, TokenConfig::default())
        .with_clock(clock.clone());
    let retrieval = RetrievalGateway::new(
        embedder,
        vectors.clone(),
        RetrievalConfig {
            top_k: 5,
            call_timeout: Duration::from_secs(5),
            ..Default::default()
        },
    );
    let config = ApiConfig {
        jwt_secret: "integration-test-secret".into(),
        call_timeout: Duration::from_secs(5),
        bcrypt_cost: 4,
        ..Default::default()
    };
    let state = AppState::new(config, tokens.clone(), retrieval, chat, tools, "memory");

    Harness {
        router: router(state),
        clock,
        users,
        vectors,
        tokens,
    }
}

async fn post<T: DeserializeOwned>(router: &Router, uri: &str, body: Value) -> (StatusCode, T) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = router.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let parsed = serde_json::from_slice(&bytes).expect("parse JSON");
    (status, parsed)
}

/// `POST /api` with `meta` sent as a JSON-encoded string.
pub async fn call(
    router: &Router,
    method: &str,
    text: Option<&str>,
    meta: Value,
) -> (StatusCode, ApiResponse) {
    post(
        router,
        "/api",
        json!({ "text": text, "method": method, "meta": meta.to_string() }),
    )
    .await
}

pub async fn chat(router: &Router, body: Value) -> (StatusCode, ChatResponse) {
    post(router, "/api/chat", body).await
}

pub fn credentials(email: &str, password: &str) -> Value {
    json!({ "credentials": { "email": email, "password": password } })
}

pub fn token_meta(token: &str) -> Value {
    json!({ "token": token })
}

/// Sign up and return the first token.
pub async fn sign_up(router: &Router, email: &str, password: &str) -> String {
    let (status, resp) = call(router, "createUser", None, credentials(email, password)).await;
    assert_eq!(status, StatusCode::OK, "sign-up failed: {resp:?}");
    resp.token.expect("token in sign-up response")
}
